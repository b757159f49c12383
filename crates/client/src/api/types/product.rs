//! Product catalog types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};
use vendor_portal_core::{CategoryId, Percentage, Price, ProductId, ProductStatus};

use crate::gateway::{FileUpload, MultipartForm};

/// A product as the vendor sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: Option<String>,
    pub category: Option<CategoryRef>,
    pub price: Option<Price>,
    /// Units in stock.
    pub stock: i64,
    pub description: Option<String>,
    pub status: ProductStatus,
    pub vat: Option<Percentage>,
    pub discount: Option<Percentage>,
    pub shipping: ShippingDetails,
    pub feature_image: Option<String>,
    pub images: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Category reference carried on a product.
///
/// List endpoints return only the id; detail endpoints embed the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub name: Option<String>,
}

/// Package dimensions used for shipping quotes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub weight: Option<Decimal>,
    pub height: Option<Decimal>,
    pub length: Option<Decimal>,
    pub width: Option<Decimal>,
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// One page of the vendor's products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPage {
    pub items: Vec<Product>,
    /// Total number of products across all pages.
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl ProductPage {
    /// Number of pages at the current page size.
    #[must_use]
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.limit))
    }
}

/// Pagination parameters for the product list.
///
/// Every distinct pair is cached separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductListParams {
    pub page: u32,
    pub limit: u32,
}

impl Default for ProductListParams {
    fn default() -> Self {
        Self { page: 1, limit: 10 }
    }
}

// =============================================================================
// ProductDraft
// =============================================================================

/// Form input for creating or updating a product.
///
/// Numeric fields stay textual until submission so that the exact text the
/// vendor typed is what goes on the wire.
#[derive(Debug, Clone, Default, Validate)]
pub struct ProductDraft {
    #[validate(length(min = 2, message = "Product name must be at least 2 characters"))]
    pub name: String,
    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    pub description: String,
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
    #[validate(length(min = 3, message = "SKU must be at least 3 characters"))]
    pub sku: String,
    pub quantity: u32,
    #[validate(custom(function = "positive_price", message = "Price must be a valid number"))]
    pub price: String,
    #[validate(custom(function = "percentage", message = "VAT must be a valid percentage"))]
    pub vat: Option<String>,
    #[validate(custom(function = "percentage", message = "Discount must be a valid percentage"))]
    pub discount: Option<String>,
    #[validate(custom(function = "positive_number", message = "Weight must be a valid number"))]
    pub weight: Option<String>,
    #[validate(custom(function = "positive_number", message = "Height must be a valid number"))]
    pub height: Option<String>,
    #[validate(custom(function = "positive_number", message = "Length must be a valid number"))]
    pub length: Option<String>,
    #[validate(custom(function = "positive_number", message = "Width must be a valid number"))]
    pub width: Option<String>,
    /// Sent first among the `images` parts.
    pub featured_image: Option<FileUpload>,
    pub images: Vec<FileUpload>,
}

impl ProductDraft {
    /// Trim every text field and turn blank optionals into `None`.
    #[must_use]
    pub fn normalized(self) -> Self {
        fn clean(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        Self {
            name: self.name.trim().to_string(),
            description: self.description.trim().to_string(),
            category: self.category.trim().to_string(),
            sku: self.sku.trim().to_string(),
            price: self.price.trim().to_string(),
            vat: clean(self.vat),
            discount: clean(self.discount),
            weight: clean(self.weight),
            height: clean(self.height),
            length: clean(self.length),
            width: clean(self.width),
            ..self
        }
    }

    /// Build the multipart body for create or update.
    ///
    /// Optional fields are omitted when blank. Images go out under the
    /// repeated `images` name, featured image first.
    #[must_use]
    pub fn to_form(&self, status: &ProductStatus) -> MultipartForm {
        let mut form = MultipartForm::new()
            .text("productName", self.name.trim())
            .text("description", self.description.trim())
            .text("category", self.category.trim())
            .text("status", status.as_str())
            .text("sku", self.sku.trim())
            .text("quantity", self.quantity.to_string())
            .text("price", self.price.trim())
            .text_if_present("vat", self.vat.as_deref())
            .text_if_present("discount", self.discount.as_deref())
            .text_if_present("weight", self.weight.as_deref())
            .text_if_present("height", self.height.as_deref())
            .text_if_present("length", self.length.as_deref())
            .text_if_present("width", self.width.as_deref());

        for image in self.featured_image.iter().chain(&self.images) {
            form = form.file("images", image.clone());
        }
        form
    }
}

fn positive_price(value: &str) -> Result<(), ValidationError> {
    Price::parse(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("price"))
}

fn percentage(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Ok(());
    }
    Percentage::parse(value)
        .map(|_| ())
        .map_err(|_| ValidationError::new("percentage"))
}

fn positive_number(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Ok(());
    }
    match value.trim().parse::<Decimal>() {
        Ok(n) if n > Decimal::ZERO => Ok(()),
        _ => Err(ValidationError::new("positive")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn valid_draft() -> ProductDraft {
        ProductDraft {
            name: " Vitamin C Serum ".to_string(),
            description: "Brightening serum for daily use".to_string(),
            category: "cat-1".to_string(),
            sku: "VC-001".to_string(),
            quantity: 12,
            price: "19.99".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_draft_passes() {
        assert!(valid_draft().normalized().validate().is_ok());
    }

    #[test]
    fn test_price_must_be_positive() {
        let draft = ProductDraft {
            price: "0".to_string(),
            ..valid_draft()
        };
        let errors = draft.validate().unwrap_err();
        let fields = errors.field_errors();
        let price = &fields["price"][0];
        assert_eq!(
            price.message.as_deref(),
            Some("Price must be a valid number")
        );
    }

    #[test]
    fn test_optional_numbers_are_checked_when_present() {
        let draft = ProductDraft {
            vat: Some("120".to_string()),
            weight: Some("-1".to_string()),
            discount: Some("15".to_string()),
            ..valid_draft()
        };
        let errors = draft.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("vat"));
        assert!(fields.contains_key("weight"));
        assert!(!fields.contains_key("discount"));
    }

    #[test]
    fn test_form_omits_blank_optionals_and_orders_images() {
        let draft = ProductDraft {
            vat: Some(" ".to_string()),
            discount: Some("10".to_string()),
            featured_image: Some(FileUpload::new("front.png", vec![0])),
            images: vec![
                FileUpload::new("back.png", vec![1]),
                FileUpload::new("side.png", vec![2]),
            ],
            ..valid_draft()
        }
        .normalized();

        let form = draft.to_form(&ProductStatus::Draft);
        assert_eq!(form.text_value("productName"), Some("Vitamin C Serum"));
        assert_eq!(form.text_value("status"), Some("draft"));
        assert_eq!(form.text_value("quantity"), Some("12"));
        assert_eq!(form.text_value("vat"), None);
        assert_eq!(form.text_value("discount"), Some("10"));
        assert_eq!(
            form.file_names("images"),
            vec!["front.png", "back.png", "side.png"]
        );
    }

    #[test]
    fn test_total_pages() {
        let page = ProductPage {
            items: vec![],
            total: 21,
            page: 1,
            limit: 10,
        };
        assert_eq!(page.total_pages(), 3);
    }
}
