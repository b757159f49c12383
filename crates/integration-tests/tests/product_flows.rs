//! Product writes as seen by later reads.

use serde_json::json;
use vendor_portal_client::api::ProductsApi;
use vendor_portal_client::{FailureKind, FileUpload, ProductDraft, ProductListParams};
use vendor_portal_core::{ProductId, ProductStatus};
use vendor_portal_integration_tests::{TestContext, product_json, product_page_body};
use wiremock::matchers::{header_exists, method, path};
use wiremock::{Mock, ResponseTemplate};

fn draft_with_images() -> ProductDraft {
    ProductDraft {
        name: "Oak Table".to_string(),
        description: "Six-seat oak dining table".to_string(),
        category: "cat-1".to_string(),
        sku: "OAK-1".to_string(),
        quantity: 3,
        price: "499.00".to_string(),
        vat: Some("7.5".to_string()),
        weight: Some("32".to_string()),
        featured_image: Some(FileUpload::new("front.png", vec![0x89, b'P', b'N', b'G'])),
        images: vec![FileUpload::new("side.jpg", vec![0xFF, 0xD8])],
        ..ProductDraft::default()
    }
}

#[tokio::test]
async fn test_create_sends_multipart_form() {
    let ctx = TestContext::signed_in("active").await;

    Mock::given(method("POST"))
        .and(path("/api/vendor/products"))
        .and(header_exists("authorization"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(json!({ "data": { "product": product_json("p9", "Oak Table") } })),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    let created = ctx
        .client
        .products()
        .create(draft_with_images(), ProductStatus::Published)
        .await
        .expect("create succeeds")
        .expect("server echoes the product");
    assert_eq!(created.id, ProductId::new("p9"));

    let requests = ctx.server.received_requests().await.expect("recording");
    let request = requests.first().expect("one request");
    let content_type = request
        .headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    assert!(content_type.starts_with("multipart/form-data"));

    let body = String::from_utf8_lossy(&request.body);
    for field in ["productName", "description", "category", "status", "sku", "quantity", "price", "vat", "weight"] {
        assert!(
            body.contains(&format!("name=\"{field}\"")),
            "missing form field {field}"
        );
    }
    assert!(body.contains("published"));
    assert!(body.contains("filename=\"front.png\""));
    assert!(body.contains("filename=\"side.jpg\""));
    // Blank optionals are not sent
    assert!(!body.contains("name=\"discount\""));
    // Featured image goes first
    let front = body.find("front.png").expect("featured image part");
    let side = body.find("side.jpg").expect("gallery image part");
    assert!(front < side);
}

#[tokio::test]
async fn test_invalid_draft_never_reaches_the_server() {
    let ctx = TestContext::signed_in("active").await;

    Mock::given(method("POST"))
        .and(path("/api/vendor/products"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&ctx.server)
        .await;

    let draft = ProductDraft {
        price: "free".to_string(),
        ..draft_with_images()
    };
    let err = ctx
        .client
        .products()
        .create(draft, ProductStatus::Draft)
        .await
        .expect_err("validation fails");
    assert_eq!(err.kind(), FailureKind::Validation);
}

#[tokio::test]
async fn test_update_refetches_detail_and_list() {
    let ctx = TestContext::signed_in("active").await;

    Mock::given(method("GET"))
        .and(path("/api/vendor/products/p1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": product_json("p1", "Oak Table") })),
        )
        .up_to_n_times(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/vendor/products/p1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": product_json("p1", "Oak Desk") })),
        )
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/vendor/products/p2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": product_json("p2", "Pine Shelf") })),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/vendor/products"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(product_page_body(&[product_json("p1", "Oak Table")], 1, 1, 10)),
        )
        .mount(&ctx.server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/vendor/products/p1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": product_json("p1", "Oak Desk") })),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    let products = ctx.client.products();
    let p1 = ProductId::new("p1");
    let p2 = ProductId::new("p2");

    assert_eq!(products.get(&p1).await.expect("p1").name, "Oak Table");
    products.get(&p2).await.expect("p2");
    products.list(ProductListParams::default()).await.expect("list");

    let draft = ProductDraft {
        name: "Oak Desk".to_string(),
        ..draft_with_images()
    };
    let updated = products
        .update(&p1, draft, ProductStatus::Published)
        .await
        .expect("update succeeds");
    assert_eq!(updated.map(|p| p.name), Some("Oak Desk".to_string()));

    assert_eq!(products.get(&p1).await.expect("p1").name, "Oak Desk");
    // Other products keep their entries
    products.get(&p2).await.expect("p2 from cache");
    products.list(ProductListParams::default()).await.expect("list");

    assert_eq!(ctx.hits("GET", "vendor/products/p1").await, 2);
    assert_eq!(ctx.hits("GET", "vendor/products").await, 2);
}

#[tokio::test]
async fn test_deleted_product_detail_is_not_found() {
    let ctx = TestContext::signed_in("active").await;

    Mock::given(method("GET"))
        .and(path("/api/vendor/products/p1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": product_json("p1", "Oak Table") })),
        )
        .up_to_n_times(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/vendor/products/p1"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "Product not found" })),
        )
        .mount(&ctx.server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/vendor/products/p1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "message": "Product deleted" })),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    let products = ctx.client.products();
    let id = ProductId::new("p1");
    products.get(&id).await.expect("product exists");

    products.delete(&id).await.expect("delete succeeds");
    assert_eq!(
        ctx.client
            .cache()
            .is_invalidated(&ProductsApi::product_key(&id))
            .await,
        Some(true)
    );

    let err = products.get(&id).await.expect_err("product is gone");
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Product not found");
    assert!(
        ctx.client
            .cache()
            .peek(&ProductsApi::product_key(&id))
            .await
            .is_none()
    );
}

#[tokio::test]
async fn test_failed_delete_uses_fallback_message() {
    let ctx = TestContext::signed_in("active").await;

    Mock::given(method("DELETE"))
        .and(path("/api/vendor/products/p1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&ctx.server)
        .await;

    let err = ctx
        .client
        .products()
        .delete(&ProductId::new("p1"))
        .await
        .expect_err("server error");
    assert_eq!(err.to_string(), "Failed to delete product");
    assert_eq!(err.kind(), FailureKind::Rejection);
}
