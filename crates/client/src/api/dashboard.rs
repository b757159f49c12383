//! Dashboard aggregate and sales analytics.

use tracing::instrument;
use vendor_portal_core::AnalyticsPeriod;

use super::conversions::{convert_dashboard, convert_sales_analytics};
use super::types::{DashboardSummary, SalesAnalytics};
use super::{VendorClient, unexpected_value};
use crate::cache::{CacheKey, CacheTag, CacheValue, Endpoint, Query};
use crate::error::ApiError;
use crate::gateway::ApiRequest;

/// Dashboard reads.
#[derive(Debug, Clone, Copy)]
pub struct DashboardApi<'a> {
    client: &'a VendorClient,
}

impl<'a> DashboardApi<'a> {
    pub(super) const fn new(client: &'a VendorClient) -> Self {
        Self { client }
    }

    #[must_use]
    pub fn summary_key() -> CacheKey {
        CacheKey::unit(Endpoint::Dashboard)
    }

    #[must_use]
    pub fn sales_key(period: AnalyticsPeriod) -> CacheKey {
        CacheKey::with_params(Endpoint::AnalyticsSales, &period)
    }

    /// Product and order counts, low-stock rows, recent orders and revenue.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure.
    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<DashboardSummary, ApiError> {
        let query = Query::new(
            Self::summary_key(),
            ApiRequest::get("vendor/dashboard"),
            |body| convert_dashboard(body).map(CacheValue::Dashboard),
        )
        .provides([CacheTag::Dashboard]);

        let value = self.client.cache().read(query).await?;
        let CacheValue::Dashboard(summary) = value else {
            return Err(unexpected_value("dashboard", &value));
        };
        Ok(summary)
    }

    /// Sales analytics for `period`.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure.
    #[instrument(skip(self), fields(period = %period))]
    pub async fn sales(&self, period: AnalyticsPeriod) -> Result<SalesAnalytics, ApiError> {
        let query = Query::new(
            Self::sales_key(period),
            ApiRequest::get("vendor/analytics/sales").query("period", period),
            move |body| convert_sales_analytics(body, period).map(CacheValue::AnalyticsSales),
        )
        .provides([CacheTag::AnalyticsSales(period)]);

        let value = self.client.cache().read(query).await?;
        let CacheValue::AnalyticsSales(analytics) = value else {
            return Err(unexpected_value("sales analytics", &value));
        };
        Ok(analytics)
    }
}
