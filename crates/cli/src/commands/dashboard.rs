//! Dashboard and analytics commands.

use vendor_portal_client::{DashboardSummary, SalesAnalytics, VendorClient};
use vendor_portal_core::AnalyticsPeriod;

use super::{CliError, Output, require_dashboard};

#[allow(clippy::print_stdout)]
pub async fn summary(client: &VendorClient, out: Output) -> Result<(), CliError> {
    require_dashboard(client).await?;
    let summary = client.dashboard().summary().await?;

    out.emit(&summary, |s: &DashboardSummary| {
        println!(
            "Products: {} total, {} active, {} pending",
            s.products.total, s.products.active, s.products.pending
        );
        println!(
            "Orders:   {} total, {} pending, {} processing, {} delivered",
            s.orders.total, s.orders.pending, s.orders.processing, s.orders.delivered
        );
        println!(
            "Revenue:  {} (tax {}, shipping {})",
            s.revenue.total, s.revenue.tax, s.revenue.shipping
        );

        if !s.low_stock.is_empty() {
            println!("\nLow stock:");
            for item in &s.low_stock {
                println!("  {:<32} {}", item.name, item.stock);
            }
        }

        if !s.recent_orders.is_empty() {
            println!("\nRecent orders:");
            for order in &s.recent_orders {
                println!(
                    "  {:<12} {:<24} {:>10} {}",
                    order.order_number.as_deref().unwrap_or("-"),
                    order.customer.as_deref().unwrap_or("-"),
                    order.amount.map(|a| a.to_string()).unwrap_or_default(),
                    order.status,
                );
            }
        }
    })
}

#[allow(clippy::print_stdout)]
pub async fn sales(
    client: &VendorClient,
    out: Output,
    period: AnalyticsPeriod,
) -> Result<(), CliError> {
    require_dashboard(client).await?;
    let analytics = client.dashboard().sales(period).await?;

    out.emit(&analytics, |a: &SalesAnalytics| {
        println!("Sales ({}): {}", a.period, a.total_sales());
        for point in &a.sales {
            println!("  {:<12} {}", point.label, point.total);
        }
        if let Some(rate) = a.conversion_rate {
            println!("Conversion rate: {rate}%");
        }
        if let Some(visits) = a.user_visits {
            println!("Visits: {visits}");
        }
        if !a.top_products.is_empty() {
            println!("\nTop products:");
            for product in &a.top_products {
                println!("  {:<32} {:>6} {}", product.name, product.quantity, product.total);
            }
        }
    })
}
