//! Product and category conversions.

use serde::Deserialize;
use serde_json::Value;
use vendor_portal_core::{CategoryId, Percentage, Price, ProductId, ProductStatus};

use super::{WireNumber, first_text, from_wire, malformed, payload, timestamp};
use crate::api::types::{
    Category, CategoryRef, Product, ProductListParams, ProductPage, ShippingDetails,
};
use crate::error::ApiError;

/// Category as either a bare id or an embedded document.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireCategory {
    Id(String),
    Embedded {
        #[serde(rename = "_id", alias = "id")]
        id: Option<String>,
        name: Option<String>,
    },
}

impl WireCategory {
    fn into_ref(self) -> Option<CategoryRef> {
        let (id, name) = match self {
            Self::Id(id) => (Some(id), None),
            Self::Embedded { id, name } => (id, name),
        };
        first_text([id]).map(|id| CategoryRef {
            id: CategoryId::new(id),
            name: first_text([name]),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
struct WireShipping {
    weight: Option<WireNumber>,
    height: Option<WireNumber>,
    length: Option<WireNumber>,
    width: Option<WireNumber>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProduct {
    #[serde(rename = "_id")]
    underscore_id: Option<String>,
    product_id: Option<String>,
    id: Option<String>,
    product_name: Option<String>,
    name: Option<String>,
    sku: Option<String>,
    category: Option<WireCategory>,
    price: Option<WireNumber>,
    inventory: Option<WireNumber>,
    quantity: Option<WireNumber>,
    stock: Option<WireNumber>,
    description: Option<String>,
    status: Option<String>,
    vat: Option<WireNumber>,
    discount: Option<WireNumber>,
    shipping_details: Option<WireShipping>,
    // Flat dimensions, as the multipart form sends them
    weight: Option<WireNumber>,
    height: Option<WireNumber>,
    length: Option<WireNumber>,
    width: Option<WireNumber>,
    #[serde(alias = "featuredImage")]
    feature_image: Option<String>,
    #[serde(default)]
    images: Vec<String>,
    #[serde(alias = "dateAdded")]
    created_at: Option<String>,
    updated_at: Option<String>,
}

fn percentage(n: Option<&WireNumber>) -> Option<Percentage> {
    n.and_then(WireNumber::to_decimal)
        .and_then(|d| Percentage::parse(&d.to_string()).ok())
}

fn into_product(wire: WireProduct) -> Result<Product, ApiError> {
    let id = first_text([
        wire.underscore_id,
        wire.product_id,
        wire.id,
    ])
    .ok_or_else(|| malformed("product", "missing _id"))?;

    let shipping = wire.shipping_details.unwrap_or_default();
    let dim = |nested: Option<WireNumber>, flat: Option<WireNumber>| {
        nested.or(flat).as_ref().and_then(WireNumber::to_decimal)
    };

    Ok(Product {
        id: ProductId::new(id),
        name: first_text([wire.product_name, wire.name]).unwrap_or_default(),
        sku: first_text([wire.sku]),
        category: wire.category.and_then(WireCategory::into_ref),
        price: wire
            .price
            .as_ref()
            .and_then(WireNumber::to_decimal)
            .map(Price::new),
        stock: [wire.inventory, wire.quantity, wire.stock]
            .iter()
            .flatten()
            .find_map(WireNumber::to_i64)
            .unwrap_or(0),
        description: first_text([wire.description]),
        status: wire.status.map(ProductStatus::from).unwrap_or_default(),
        vat: percentage(wire.vat.as_ref()),
        discount: percentage(wire.discount.as_ref()),
        shipping: ShippingDetails {
            weight: dim(shipping.weight, wire.weight),
            height: dim(shipping.height, wire.height),
            length: dim(shipping.length, wire.length),
            width: dim(shipping.width, wire.width),
        },
        feature_image: first_text([wire.feature_image]),
        images: wire
            .images
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        created_at: timestamp(wire.created_at.as_deref()),
        updated_at: timestamp(wire.updated_at.as_deref()),
    })
}

/// Convert a `GET vendor/products/{id}` (or create/update) response.
///
/// # Errors
///
/// Returns `ApiError::Decode` if the payload is not a product with an id.
pub fn convert_product(body: Value) -> Result<Product, ApiError> {
    let value = match payload(body) {
        // Some responses nest the document one level deeper
        Value::Object(mut map) if map.contains_key("product") => {
            map.remove("product").unwrap_or(Value::Null)
        }
        other => other,
    };
    into_product(from_wire("product", value)?)
}

/// Convert a `GET vendor/products` response.
///
/// Items come from `data` or `products`; the total from `total`,
/// `totalCount` or `totalResults`, defaulting to the item count. Page and
/// limit default to the request's when the server omits them.
///
/// # Errors
///
/// Returns `ApiError::Decode` if the payload has no recognizable item list
/// or any item lacks an id.
pub fn convert_product_page(
    body: Value,
    params: ProductListParams,
) -> Result<ProductPage, ApiError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct WireList {
        data: Option<Value>,
        products: Option<Vec<WireProduct>>,
        total: Option<WireNumber>,
        total_count: Option<WireNumber>,
        total_results: Option<WireNumber>,
        page: Option<WireNumber>,
        limit: Option<WireNumber>,
    }

    // `data` may be the item array itself or a nested list object
    let nested = matches!(body.get("data"), Some(Value::Object(_)));
    let wire: WireList = if nested {
        from_wire("product list", payload(body))?
    } else {
        from_wire("product list", body)?
    };

    let items: Vec<WireProduct> = match (wire.data, wire.products) {
        (Some(Value::Array(items)), _) => from_wire("product list", Value::Array(items))?,
        (_, Some(items)) => items,
        (None | Some(Value::Null), None) => Vec::new(),
        (Some(_), None) => return Err(malformed("product list", "no item array")),
    };

    let items = items
        .into_iter()
        .map(into_product)
        .collect::<Result<Vec<_>, _>>()?;

    let total = [wire.total, wire.total_count, wire.total_results]
        .iter()
        .flatten()
        .find_map(WireNumber::to_u64)
        .unwrap_or_else(|| u64::try_from(items.len()).unwrap_or(u64::MAX));

    let page = wire
        .page
        .as_ref()
        .and_then(WireNumber::to_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(params.page);
    let limit = wire
        .limit
        .as_ref()
        .and_then(WireNumber::to_u64)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(params.limit);

    Ok(ProductPage {
        items,
        total,
        page,
        limit,
    })
}

/// Convert a `GET vendor/categories` response.
///
/// # Errors
///
/// Returns `ApiError::Decode` if the payload is not a list.
pub fn convert_categories(body: Value) -> Result<Vec<Category>, ApiError> {
    #[derive(Deserialize)]
    struct WireCategoryDoc {
        #[serde(rename = "_id")]
        underscore_id: Option<String>,
        id: Option<String>,
        name: Option<String>,
        #[serde(alias = "categoryName")]
        title: Option<String>,
    }

    let value = match payload(body) {
        Value::Object(mut map) if map.contains_key("categories") => {
            map.remove("categories").unwrap_or(Value::Null)
        }
        other => other,
    };
    let docs: Vec<WireCategoryDoc> = from_wire("categories", value)?;

    Ok(docs
        .into_iter()
        .filter_map(|doc| {
            let id = first_text([doc.underscore_id, doc.id])?;
            let name = first_text([doc.name, doc.title]).unwrap_or_else(|| id.clone());
            Some(Category {
                id: CategoryId::new(id),
                name,
            })
        })
        .collect())
}
