//! Dashboard aggregate and sales analytics.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use vendor_portal_core::{AnalyticsPeriod, OrderId, OrderStatus, Price, ProductId};

/// The dashboard home aggregate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub products: ProductCounts,
    pub low_stock: Vec<LowStockProduct>,
    pub orders: OrderCounts,
    pub recent_orders: Vec<OrderSummary>,
    pub revenue: Revenue,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCounts {
    pub total: u64,
    pub active: u64,
    pub pending: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LowStockProduct {
    pub id: Option<ProductId>,
    pub name: String,
    pub stock: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCounts {
    pub total: u64,
    pub pending: u64,
    pub processing: u64,
    pub delivered: u64,
}

/// A row in the recent orders table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
    pub id: Option<OrderId>,
    pub order_number: Option<String>,
    pub customer: Option<String>,
    pub product: Option<String>,
    pub delivery_address: Option<String>,
    pub amount: Option<Price>,
    pub status: OrderStatus,
    pub placed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revenue {
    pub total: Decimal,
    pub tax: Decimal,
    pub shipping: Decimal,
}

/// Sales analytics for one reporting window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesAnalytics {
    pub period: AnalyticsPeriod,
    pub sales: Vec<SalesPoint>,
    pub top_products: Vec<TopProduct>,
    pub conversion_rate: Option<Decimal>,
    pub user_visits: Option<u64>,
    pub conversion_chart: Vec<ChartSlice>,
    pub category_performance: Vec<ChartSlice>,
    pub age_distribution: Vec<ChartSlice>,
}

impl SalesAnalytics {
    /// Sum of all sales points.
    #[must_use]
    pub fn total_sales(&self) -> Decimal {
        self.sales.iter().map(|p| p.total).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesPoint {
    pub label: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopProduct {
    pub id: Option<ProductId>,
    pub name: String,
    pub quantity: u64,
    pub total: Decimal,
}

/// A labelled share in a breakdown chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSlice {
    pub name: String,
    pub value: Decimal,
}
