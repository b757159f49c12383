//! Cache keys, tags and values.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::error;
use vendor_portal_core::{AnalyticsPeriod, ProductId};

use crate::api::types::{
    Category, DashboardSummary, Product, ProductPage, Profile, SalesAnalytics,
};

/// Logical resource namespace a cached query belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Auth,
    Profile,
    Products,
    Dashboard,
}

/// A cacheable read endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Profile,
    Products,
    Product,
    Categories,
    Dashboard,
    AnalyticsSales,
}

impl Endpoint {
    #[must_use]
    pub const fn resource(self) -> Resource {
        match self {
            Self::Profile => Resource::Profile,
            Self::Products | Self::Product | Self::Categories => Resource::Products,
            Self::Dashboard | Self::AnalyticsSales => Resource::Dashboard,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "getProfile",
            Self::Products => "getProducts",
            Self::Product => "getProduct",
            Self::Categories => "getCategories",
            Self::Dashboard => "getDashboard",
            Self::AnalyticsSales => "getAnalyticsSales",
        }
    }
}

/// Key for a cached query: endpoint plus its serialized parameters.
///
/// Two reads share an entry only when every parameter matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    endpoint: Endpoint,
    params: String,
}

impl CacheKey {
    /// Key for an endpoint that takes no parameters.
    #[must_use]
    pub fn unit(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            params: String::new(),
        }
    }

    /// Key for an endpoint with parameters.
    ///
    /// Parameters serialize in field declaration order, so equal values
    /// always produce equal keys. Parameters that fail to serialize get a
    /// key of their own that no other read shares, so they are never served
    /// someone else's data.
    #[must_use]
    pub fn with_params<P: Serialize>(endpoint: Endpoint, params: &P) -> Self {
        static UNKEYED: AtomicU64 = AtomicU64::new(0);

        let params = serde_json::to_string(params).unwrap_or_else(|e| {
            error!(endpoint = endpoint.as_str(), error = %e, "Unserializable cache key params");
            // JSON never starts with '#'
            format!("#unkeyed-{}", UNKEYED.fetch_add(1, Ordering::Relaxed))
        });
        Self { endpoint, params }
    }

    #[must_use]
    pub const fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    #[must_use]
    pub fn params(&self) -> &str {
        &self.params
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            f.write_str(self.endpoint.as_str())
        } else {
            write!(f, "{}({})", self.endpoint.as_str(), self.params)
        }
    }
}

/// Dependency label attached to cached data.
///
/// Matching is exact: invalidating `Products` does not touch entries tagged
/// only `Product(id)`, so mutations list every tag they affect.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheTag {
    Profile,
    Products,
    Product(ProductId),
    Categories,
    Dashboard,
    AnalyticsSales(AnalyticsPeriod),
}

impl fmt::Display for CacheTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Profile => f.write_str("Profile"),
            Self::Products => f.write_str("Products"),
            Self::Product(id) => write!(f, "Product:{id}"),
            Self::Categories => f.write_str("Categories"),
            Self::Dashboard => f.write_str("Dashboard"),
            Self::AnalyticsSales(period) => write!(f, "AnalyticsSales:{period}"),
        }
    }
}

/// Cached values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheValue {
    Profile(Profile),
    Products(ProductPage),
    Product(Product),
    Categories(Vec<Category>),
    Dashboard(DashboardSummary),
    AnalyticsSales(SalesAnalytics),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::ProductListParams;

    #[test]
    fn test_keys_differ_by_every_param() {
        let a = CacheKey::with_params(Endpoint::Products, &ProductListParams { page: 1, limit: 10 });
        let b = CacheKey::with_params(Endpoint::Products, &ProductListParams { page: 1, limit: 20 });
        let c = CacheKey::with_params(Endpoint::Products, &ProductListParams { page: 1, limit: 10 });
        assert_ne!(a, b);
        assert_eq!(a, c);
        assert_eq!(a.to_string(), "getProducts({\"page\":1,\"limit\":10})");
    }

    #[test]
    fn test_unserializable_params_never_share_a_key() {
        struct Broken;

        impl Serialize for Broken {
            fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("not a key"))
            }
        }

        let a = CacheKey::with_params(Endpoint::Product, &Broken);
        let b = CacheKey::with_params(Endpoint::Product, &Broken);
        assert_ne!(a, b);
        assert_ne!(a, CacheKey::unit(Endpoint::Product));
        assert!(a.params().starts_with('#'));
    }

    #[test]
    fn test_tag_display() {
        assert_eq!(CacheTag::Product(ProductId::new("p1")).to_string(), "Product:p1");
        assert_eq!(
            CacheTag::AnalyticsSales(AnalyticsPeriod::Week).to_string(),
            "AnalyticsSales:week"
        );
    }

    #[test]
    fn test_endpoint_resources() {
        assert_eq!(Endpoint::Categories.resource(), Resource::Products);
        assert_eq!(Endpoint::AnalyticsSales.resource(), Resource::Dashboard);
    }
}
