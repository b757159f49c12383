//! Product catalog reads and writes.

use tracing::{debug, instrument};
use validator::Validate;
use vendor_portal_core::{ProductId, ProductStatus};

use super::conversions::{convert_categories, convert_product, convert_product_page};
use super::types::{Category, Product, ProductDraft, ProductListParams, ProductPage};
use super::{VendorClient, unexpected_value};
use crate::cache::{CacheKey, CacheTag, CacheValue, Endpoint, Mutation, MutationKind, Query};
use crate::error::ApiError;
use crate::gateway::ApiRequest;

/// Product operations.
#[derive(Debug, Clone, Copy)]
pub struct ProductsApi<'a> {
    client: &'a VendorClient,
}

impl<'a> ProductsApi<'a> {
    pub(super) const fn new(client: &'a VendorClient) -> Self {
        Self { client }
    }

    // =========================================================================
    // Cache keys
    // =========================================================================

    #[must_use]
    pub fn list_key(params: ProductListParams) -> CacheKey {
        CacheKey::with_params(Endpoint::Products, &params)
    }

    #[must_use]
    pub fn product_key(id: &ProductId) -> CacheKey {
        CacheKey::with_params(Endpoint::Product, id)
    }

    #[must_use]
    pub fn categories_key() -> CacheKey {
        CacheKey::unit(Endpoint::Categories)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// One page of the vendor's products.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure.
    #[instrument(skip(self))]
    pub async fn list(&self, params: ProductListParams) -> Result<ProductPage, ApiError> {
        let request = ApiRequest::get("vendor/products")
            .query("page", params.page)
            .query("limit", params.limit);
        let query = Query::new(Self::list_key(params), request, move |body| {
            convert_product_page(body, params).map(CacheValue::Products)
        })
        .provides([CacheTag::Products]);

        let value = self.client.cache().read(query).await?;
        let CacheValue::Products(page) = value else {
            return Err(unexpected_value("product page", &value));
        };
        debug!(count = page.items.len(), total = page.total, "Listed products");
        Ok(page)
    }

    /// A single product.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure; a deleted product yields a 404 rejection
    /// (see [`ApiError::is_not_found`]).
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get(&self, id: &ProductId) -> Result<Product, ApiError> {
        let query = Query::new(
            Self::product_key(id),
            ApiRequest::get(format!("vendor/products/{id}")),
            |body| convert_product(body).map(CacheValue::Product),
        )
        .provides([CacheTag::Product(id.clone())]);

        let value = self.client.cache().read(query).await?;
        let CacheValue::Product(product) = value else {
            return Err(unexpected_value("product", &value));
        };
        Ok(product)
    }

    /// Categories a product can be filed under.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        let query = Query::new(
            Self::categories_key(),
            ApiRequest::get("vendor/categories"),
            |body| convert_categories(body).map(CacheValue::Categories),
        )
        .provides([CacheTag::Categories]);

        let value = self.client.cache().read(query).await?;
        let CacheValue::Categories(categories) = value else {
            return Err(unexpected_value("categories", &value));
        };
        Ok(categories)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Create a product, as a draft or published.
    ///
    /// Returns the created product when the server echoes it back.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for bad input, otherwise the gateway
    /// failure.
    #[instrument(skip(self, draft), fields(sku = %draft.sku, status = %status))]
    pub async fn create(
        &self,
        draft: ProductDraft,
        status: ProductStatus,
    ) -> Result<Option<Product>, ApiError> {
        let draft = draft.normalized();
        draft.validate()?;

        let fallback = match status {
            ProductStatus::Draft => "Failed to save product as draft",
            _ => "Failed to publish product",
        };
        let request = ApiRequest::post("vendor/products").multipart(draft.to_form(&status));

        let response = self
            .client
            .cache()
            .write(Mutation::new(MutationKind::CreateProduct, request).fallback(fallback))
            .await?;
        Ok(convert_product(response.body).ok())
    }

    /// Replace a product's fields and images.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for bad input, otherwise the gateway
    /// failure.
    #[instrument(skip(self, draft), fields(product_id = %id, status = %status))]
    pub async fn update(
        &self,
        id: &ProductId,
        draft: ProductDraft,
        status: ProductStatus,
    ) -> Result<Option<Product>, ApiError> {
        let draft = draft.normalized();
        draft.validate()?;

        let request =
            ApiRequest::put(format!("vendor/products/{id}")).multipart(draft.to_form(&status));

        let response = self
            .client
            .cache()
            .write(
                Mutation::new(MutationKind::UpdateProduct { id: id.clone() }, request)
                    .fallback("Failed to update product"),
            )
            .await?;
        Ok(convert_product(response.body).ok())
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete(&self, id: &ProductId) -> Result<(), ApiError> {
        self.client
            .cache()
            .write(
                Mutation::new(
                    MutationKind::DeleteProduct { id: id.clone() },
                    ApiRequest::delete(format!("vendor/products/{id}")),
                )
                .fallback("Failed to delete product"),
            )
            .await?;
        Ok(())
    }
}
