//! Dashboard aggregate and sales analytics conversions.

use serde::Deserialize;
use serde_json::Value;
use vendor_portal_core::{AnalyticsPeriod, OrderId, OrderStatus, Price, ProductId};

use super::{WireNumber, count, decimal_or_zero, first_text, from_wire, payload, timestamp};
use crate::api::types::{
    ChartSlice, DashboardSummary, LowStockProduct, OrderCounts, OrderSummary, ProductCounts,
    Revenue, SalesAnalytics, SalesPoint, TopProduct,
};
use crate::error::ApiError;

// =============================================================================
// Dashboard
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct WireProductCounts {
    total: Option<WireNumber>,
    active: Option<WireNumber>,
    pending: Option<WireNumber>,
}

#[derive(Debug, Default, Deserialize)]
struct WireOrderCounts {
    total: Option<WireNumber>,
    pending: Option<WireNumber>,
    processing: Option<WireNumber>,
    delivered: Option<WireNumber>,
}

#[derive(Debug, Default, Deserialize)]
struct WireRevenue {
    total: Option<WireNumber>,
    tax: Option<WireNumber>,
    shipping: Option<WireNumber>,
}

#[derive(Debug, Deserialize)]
struct WireLowStock {
    #[serde(rename = "_id")]
    underscore_id: Option<String>,
    name: Option<String>,
    #[serde(alias = "productName")]
    product_name: Option<String>,
    stock: Option<WireNumber>,
    quantity: Option<WireNumber>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRecentOrder {
    #[serde(rename = "_id")]
    underscore_id: Option<String>,
    order_id: Option<String>,
    order_number: Option<String>,
    customer: Option<String>,
    customer_name: Option<String>,
    product: Option<String>,
    product_name: Option<String>,
    delivery_address: Option<String>,
    address: Option<String>,
    amount: Option<WireNumber>,
    total: Option<WireNumber>,
    status: Option<String>,
    date: Option<String>,
    created_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireDashboard {
    #[serde(default)]
    products: WireProductCounts,
    #[serde(default)]
    low_stock_products: Vec<WireLowStock>,
    #[serde(default)]
    orders: WireOrderCounts,
    #[serde(default)]
    recent_orders: Vec<WireRecentOrder>,
    #[serde(default)]
    revenue: WireRevenue,
}

fn convert_recent_order(wire: WireRecentOrder) -> OrderSummary {
    let id = first_text([wire.underscore_id, wire.order_id]);
    OrderSummary {
        order_number: first_text([wire.order_number]).or_else(|| id.clone()),
        id: id.map(OrderId::new),
        customer: first_text([wire.customer, wire.customer_name]),
        product: first_text([wire.product, wire.product_name]),
        delivery_address: first_text([wire.delivery_address, wire.address]),
        amount: [wire.amount, wire.total]
            .iter()
            .flatten()
            .find_map(WireNumber::to_decimal)
            .map(Price::new),
        status: wire.status.map(OrderStatus::from).unwrap_or_default(),
        placed_at: timestamp(wire.date.as_deref()).or_else(|| timestamp(wire.created_at.as_deref())),
    }
}

/// Convert a `GET vendor/dashboard` response.
///
/// Missing sections become zeroed counts and empty lists.
///
/// # Errors
///
/// Returns `ApiError::Decode` if a present section has the wrong shape.
pub fn convert_dashboard(body: Value) -> Result<DashboardSummary, ApiError> {
    let wire: WireDashboard = match payload(body) {
        Value::Null => WireDashboard::default(),
        value => from_wire("dashboard", value)?,
    };

    Ok(DashboardSummary {
        products: ProductCounts {
            total: count(wire.products.total.as_ref()),
            active: count(wire.products.active.as_ref()),
            pending: count(wire.products.pending.as_ref()),
        },
        low_stock: wire
            .low_stock_products
            .into_iter()
            .map(|p| LowStockProduct {
                id: first_text([p.underscore_id]).map(ProductId::new),
                name: first_text([p.name, p.product_name]).unwrap_or_default(),
                stock: [p.stock, p.quantity]
                    .iter()
                    .flatten()
                    .find_map(WireNumber::to_i64)
                    .unwrap_or(0),
            })
            .collect(),
        orders: OrderCounts {
            total: count(wire.orders.total.as_ref()),
            pending: count(wire.orders.pending.as_ref()),
            processing: count(wire.orders.processing.as_ref()),
            delivered: count(wire.orders.delivered.as_ref()),
        },
        recent_orders: wire
            .recent_orders
            .into_iter()
            .map(convert_recent_order)
            .collect(),
        revenue: Revenue {
            total: decimal_or_zero(wire.revenue.total.as_ref()),
            tax: decimal_or_zero(wire.revenue.tax.as_ref()),
            shipping: decimal_or_zero(wire.revenue.shipping.as_ref()),
        },
    })
}

// =============================================================================
// Sales analytics
// =============================================================================

#[derive(Debug, Deserialize)]
struct WireSalesPoint {
    date: Option<String>,
    day: Option<String>,
    label: Option<String>,
    total: Option<WireNumber>,
    amount: Option<WireNumber>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTopProduct {
    #[serde(rename = "_id")]
    underscore_id: Option<String>,
    name: Option<String>,
    product_name: Option<String>,
    quantity: Option<WireNumber>,
    total: Option<WireNumber>,
}

#[derive(Debug, Deserialize)]
struct WireSlice {
    name: Option<String>,
    label: Option<String>,
    value: Option<WireNumber>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSales {
    #[serde(default)]
    sales_data: Vec<WireSalesPoint>,
    #[serde(default)]
    top_products: Vec<WireTopProduct>,
    conversion_rate: Option<WireNumber>,
    users_visits: Option<WireNumber>,
    #[serde(default)]
    conversion_chart: Vec<WireSlice>,
    #[serde(default)]
    category_performance: Vec<WireSlice>,
    #[serde(default)]
    age_distribution: Vec<WireSlice>,
}

fn convert_slices(slices: Vec<WireSlice>) -> Vec<ChartSlice> {
    slices
        .into_iter()
        .filter_map(|s| {
            Some(ChartSlice {
                name: first_text([s.name, s.label])?,
                value: decimal_or_zero(s.value.as_ref()),
            })
        })
        .collect()
}

/// Convert a `GET vendor/analytics/sales` response for `period`.
///
/// # Errors
///
/// Returns `ApiError::Decode` if a present section has the wrong shape.
pub fn convert_sales_analytics(
    body: Value,
    period: AnalyticsPeriod,
) -> Result<SalesAnalytics, ApiError> {
    let wire: WireSales = match payload(body) {
        Value::Null => WireSales::default(),
        value => from_wire("sales analytics", value)?,
    };

    Ok(SalesAnalytics {
        period,
        sales: wire
            .sales_data
            .into_iter()
            .map(|p| SalesPoint {
                label: first_text([p.date, p.day, p.label]).unwrap_or_default(),
                total: [p.total, p.amount]
                    .iter()
                    .flatten()
                    .find_map(WireNumber::to_decimal)
                    .unwrap_or_default(),
            })
            .collect(),
        top_products: wire
            .top_products
            .into_iter()
            .map(|p| TopProduct {
                id: first_text([p.underscore_id]).map(ProductId::new),
                name: first_text([p.name, p.product_name]).unwrap_or_default(),
                quantity: count(p.quantity.as_ref()),
                total: decimal_or_zero(p.total.as_ref()),
            })
            .collect(),
        conversion_rate: wire.conversion_rate.as_ref().and_then(WireNumber::to_decimal),
        user_visits: wire.users_visits.as_ref().and_then(WireNumber::to_u64),
        conversion_chart: convert_slices(wire.conversion_chart),
        category_performance: convert_slices(wire.category_performance),
        age_distribution: convert_slices(wire.age_distribution),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use serde_json::json;

    #[test]
    fn test_convert_dashboard() {
        let summary = convert_dashboard(json!({
            "status": 200,
            "data": {
                "products": {"total": 12, "active": 9, "pending": "3"},
                "lowStockProducts": [{"_id": "p1", "name": "Serum", "stock": 2}],
                "orders": {"total": 4, "pending": 1, "processing": 2, "delivered": 1},
                "recentOrders": [{
                    "orderId": "o-1",
                    "customerName": "Grace",
                    "productName": "Serum",
                    "address": "1 Main St",
                    "total": "42.50",
                    "status": "shipped",
                    "createdAt": "2024-02-01T12:00:00Z"
                }],
                "revenue": {"total": 1234.5, "tax": 100, "shipping": "20"}
            }
        }))
        .unwrap();

        assert_eq!(summary.products.total, 12);
        assert_eq!(summary.products.pending, 3);
        assert_eq!(summary.low_stock[0].stock, 2);
        assert_eq!(summary.orders.processing, 2);

        let order = &summary.recent_orders[0];
        assert_eq!(order.id.as_ref().unwrap().as_str(), "o-1");
        assert_eq!(order.order_number.as_deref(), Some("o-1"));
        assert_eq!(order.customer.as_deref(), Some("Grace"));
        assert_eq!(order.amount.unwrap().to_string(), "42.50");
        assert_eq!(order.status, OrderStatus::Shipped);
        assert!(order.placed_at.is_some());

        assert_eq!(summary.revenue.total, Decimal::new(12345, 1));
    }

    #[test]
    fn test_convert_dashboard_missing_sections() {
        let summary = convert_dashboard(json!({"status": 200})).unwrap();
        assert_eq!(summary, DashboardSummary::default());
    }

    #[test]
    fn test_convert_sales_analytics() {
        let analytics = convert_sales_analytics(
            json!({
                "data": {
                    "salesData": [
                        {"date": "2024-02-01", "total": 10},
                        {"day": "Tue", "amount": "15.5"}
                    ],
                    "topProducts": [{"productName": "Serum", "quantity": 4, "total": 80}],
                    "conversionRate": 2.5,
                    "usersVisits": "1200",
                    "categoryPerformance": [{"name": "Skincare", "value": 60}, {"value": 1}]
                }
            }),
            AnalyticsPeriod::Week,
        )
        .unwrap();

        assert_eq!(analytics.period, AnalyticsPeriod::Week);
        assert_eq!(analytics.sales[1].label, "Tue");
        assert_eq!(analytics.total_sales(), Decimal::new(255, 1));
        assert_eq!(analytics.top_products[0].name, "Serum");
        assert_eq!(analytics.user_visits, Some(1200));
        assert_eq!(analytics.category_performance.len(), 1);
    }
}
