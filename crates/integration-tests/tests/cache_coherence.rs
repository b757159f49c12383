//! Cache coherence: coalescing, keyed pages and tag invalidation.

use std::time::Duration;

use serde_json::json;
use vendor_portal_client::api::ProductsApi;
use vendor_portal_client::{CacheEvent, ProductDraft, ProductListParams};
use vendor_portal_core::{ProductId, ProductStatus};
use vendor_portal_integration_tests::{
    TestContext, dashboard_body, product_json, product_page_body, profile_body,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

async fn mount_profile(ctx: &TestContext) {
    Mock::given(method("GET"))
        .and(path("/api/vendor/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body("active")))
        .mount(&ctx.server)
        .await;
}

fn draft() -> ProductDraft {
    ProductDraft {
        name: "Walnut Chair".to_string(),
        description: "Solid walnut dining chair".to_string(),
        category: "cat-1".to_string(),
        sku: "WAL-1".to_string(),
        quantity: 4,
        price: "89.50".to_string(),
        ..ProductDraft::default()
    }
}

#[tokio::test]
async fn test_concurrent_cold_reads_share_one_request() {
    let ctx = TestContext::signed_in("active").await;

    Mock::given(method("GET"))
        .and(path("/api/vendor/products"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(product_page_body(&[product_json("p1", "Oak Table")], 1, 1, 10))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    let products = ctx.client.products();
    let (a, b, c) = tokio::join!(
        products.list(ProductListParams::default()),
        products.list(ProductListParams::default()),
        products.list(ProductListParams::default()),
    );

    let a = a.expect("first read succeeds");
    assert_eq!(a, b.expect("second read succeeds"));
    assert_eq!(a, c.expect("third read succeeds"));
    assert_eq!(a.items.len(), 1);
    assert_eq!(a.items[0].name, "Oak Table");
}

#[tokio::test]
async fn test_page_sizes_are_cached_separately() {
    let ctx = TestContext::signed_in("active").await;

    Mock::given(method("GET"))
        .and(path("/api/vendor/products"))
        .and(query_param("limit", "10"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(product_page_body(&[product_json("p1", "Oak Table")], 25, 1, 10)),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/vendor/products"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_page_body(
            &[product_json("p1", "Oak Table"), product_json("p2", "Pine Shelf")],
            25,
            1,
            20,
        )))
        .expect(1)
        .mount(&ctx.server)
        .await;

    let products = ctx.client.products();
    let ten = products
        .list(ProductListParams { page: 1, limit: 10 })
        .await
        .expect("limit 10");
    let twenty = products
        .list(ProductListParams { page: 1, limit: 20 })
        .await
        .expect("limit 20");
    let ten_again = products
        .list(ProductListParams { page: 1, limit: 10 })
        .await
        .expect("limit 10 again");

    assert_eq!(ten.limit, 10);
    assert_eq!(ten.total_pages(), 3);
    assert_eq!(twenty.items.len(), 2);
    assert_eq!(twenty.total_pages(), 2);
    assert_eq!(ten, ten_again);
}

#[tokio::test]
async fn test_create_refetches_list_and_dashboard() {
    let ctx = TestContext::signed_in("active").await;
    mount_profile(&ctx).await;

    Mock::given(method("GET"))
        .and(path("/api/vendor/products"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(product_page_body(&[product_json("p1", "Oak Table")], 1, 1, 10)),
        )
        .up_to_n_times(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/vendor/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_page_body(
            &[product_json("p1", "Oak Table"), product_json("p2", "Walnut Chair")],
            2,
            1,
            10,
        )))
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/vendor/dashboard"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dashboard_body(1)))
        .up_to_n_times(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/vendor/dashboard"))
        .respond_with(ResponseTemplate::new(200).set_body_json(dashboard_body(2)))
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/vendor/categories"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": [{ "_id": "cat-1", "name": "Furniture" }] })),
        )
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/vendor/products"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "data": product_json("p2", "Walnut Chair") })),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    let products = ctx.client.products();
    let before = products.list(ProductListParams::default()).await.expect("list");
    let summary = ctx.client.dashboard().summary().await.expect("dashboard");
    products.categories().await.expect("categories");
    assert_eq!(before.items.len(), 1);
    assert_eq!(summary.products.total, 1);

    let created = products
        .create(draft(), ProductStatus::Published)
        .await
        .expect("create succeeds")
        .expect("server echoes the product");
    assert_eq!(created.id, ProductId::new("p2"));

    let after = products.list(ProductListParams::default()).await.expect("list");
    let summary = ctx.client.dashboard().summary().await.expect("dashboard");
    products.categories().await.expect("categories");

    assert_eq!(after.items.len(), 2);
    assert_eq!(summary.products.total, 2);
    assert_eq!(ctx.hits("GET", "vendor/products").await, 2);
    assert_eq!(ctx.hits("GET", "vendor/dashboard").await, 2);
    // Categories carry no product tag
    assert_eq!(ctx.hits("GET", "vendor/categories").await, 1);
}

#[tokio::test]
async fn test_failed_create_invalidates_nothing() {
    let ctx = TestContext::signed_in("active").await;

    Mock::given(method("GET"))
        .and(path("/api/vendor/products"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(product_page_body(&[product_json("p1", "Oak Table")], 1, 1, 10)),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/vendor/products"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({ "message": "SKU already exists" })),
        )
        .mount(&ctx.server)
        .await;

    let products = ctx.client.products();
    products.list(ProductListParams::default()).await.expect("list");

    let err = products
        .create(draft(), ProductStatus::Draft)
        .await
        .expect_err("server rejects the product");
    assert_eq!(err.to_string(), "SKU already exists");
    assert_eq!(err.status(), Some(400));

    products.list(ProductListParams::default()).await.expect("list from cache");
    assert_eq!(
        ctx.client
            .cache()
            .is_invalidated(&ProductsApi::list_key(ProductListParams::default()))
            .await,
        Some(false)
    );
}

#[tokio::test]
async fn test_failed_create_without_message_uses_fallback() {
    let ctx = TestContext::signed_in("active").await;

    Mock::given(method("POST"))
        .and(path("/api/vendor/products"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&ctx.server)
        .await;

    let products = ctx.client.products();
    let draft_err = products
        .create(draft(), ProductStatus::Draft)
        .await
        .expect_err("server error");
    let publish_err = products
        .create(draft(), ProductStatus::Published)
        .await
        .expect_err("server error");

    assert_eq!(draft_err.to_string(), "Failed to save product as draft");
    assert_eq!(publish_err.to_string(), "Failed to publish product");
}

#[tokio::test]
async fn test_subscribed_list_refetches_after_update() {
    let ctx = TestContext::signed_in("active").await;

    Mock::given(method("GET"))
        .and(path("/api/vendor/products"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(product_page_body(&[product_json("p1", "Oak Table")], 1, 1, 10)),
        )
        .up_to_n_times(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/vendor/products"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(product_page_body(&[product_json("p1", "Oak Desk")], 1, 1, 10)),
        )
        .mount(&ctx.server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/vendor/products/p1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "Product updated" })),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    let key = ProductsApi::list_key(ProductListParams::default());
    let mut subscription = ctx.client.cache().subscribe(&key);

    let products = ctx.client.products();
    products.list(ProductListParams::default()).await.expect("list");
    assert_eq!(subscription.changed().await, Some(CacheEvent::Updated(key.clone())));

    let updated = products
        .update(&ProductId::new("p1"), draft(), ProductStatus::Published)
        .await
        .expect("update succeeds");
    // The update response carries no product
    assert!(updated.is_none());

    assert_eq!(
        subscription.changed().await,
        Some(CacheEvent::Invalidated(key.clone()))
    );
    let refreshed = tokio::time::timeout(Duration::from_secs(5), subscription.changed())
        .await
        .expect("background refetch completes");
    assert_eq!(refreshed, Some(CacheEvent::Updated(key.clone())));

    // Served from the refreshed entry without another request
    let page = products.list(ProductListParams::default()).await.expect("list");
    assert_eq!(page.items[0].name, "Oak Desk");
    assert_eq!(ctx.hits("GET", "vendor/products").await, 2);
}
