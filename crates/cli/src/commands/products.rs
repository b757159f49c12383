//! Product commands.

use std::path::PathBuf;

use clap::Args;
use vendor_portal_client::{Product, ProductDraft, ProductListParams, ProductPage, VendorClient};
use vendor_portal_core::{ProductId, ProductStatus};

use super::{CliError, Output, read_upload, require_dashboard};

/// Product fields shared by `create` and `update`.
#[derive(Debug, Args)]
pub struct ProductArgs {
    #[arg(long)]
    name: String,

    #[arg(long)]
    description: String,

    /// Category id (see `vendor-cli categories`)
    #[arg(long)]
    category: String,

    #[arg(long)]
    sku: String,

    #[arg(long, default_value_t = 0)]
    quantity: u32,

    #[arg(long)]
    price: String,

    /// VAT percentage
    #[arg(long)]
    vat: Option<String>,

    /// Discount percentage
    #[arg(long)]
    discount: Option<String>,

    #[arg(long)]
    weight: Option<String>,

    #[arg(long)]
    height: Option<String>,

    #[arg(long)]
    length: Option<String>,

    #[arg(long)]
    width: Option<String>,

    /// Featured image file
    #[arg(long)]
    featured_image: Option<PathBuf>,

    /// Additional image files
    #[arg(long = "image")]
    images: Vec<PathBuf>,
}

impl ProductArgs {
    async fn into_draft(self) -> Result<ProductDraft, CliError> {
        let featured_image = match &self.featured_image {
            Some(path) => Some(read_upload(path).await?),
            None => None,
        };
        let mut images = Vec::with_capacity(self.images.len());
        for path in &self.images {
            images.push(read_upload(path).await?);
        }

        Ok(ProductDraft {
            name: self.name,
            description: self.description,
            category: self.category,
            sku: self.sku,
            quantity: self.quantity,
            price: self.price,
            vat: self.vat,
            discount: self.discount,
            weight: self.weight,
            height: self.height,
            length: self.length,
            width: self.width,
            featured_image,
            images,
        })
    }
}

const fn status(publish: bool) -> ProductStatus {
    if publish {
        ProductStatus::Published
    } else {
        ProductStatus::Draft
    }
}

#[allow(clippy::print_stdout)]
pub async fn list(client: &VendorClient, out: Output, page: u32, limit: u32) -> Result<(), CliError> {
    require_dashboard(client).await?;
    let page = client
        .products()
        .list(ProductListParams { page, limit })
        .await?;

    out.emit(&page, |p: &ProductPage| {
        for product in &p.items {
            println!(
                "{:<26} {:<32} {:<12} {:>10} {:>6} {}",
                product.id,
                product.name,
                product.sku.as_deref().unwrap_or("-"),
                product.price.map(|price| price.to_string()).unwrap_or_default(),
                product.stock,
                product.status,
            );
        }
        println!(
            "Page {} of {} ({} products)",
            p.page,
            p.total_pages().max(1),
            p.total
        );
    })
}

pub async fn show(client: &VendorClient, out: Output, id: String) -> Result<(), CliError> {
    require_dashboard(client).await?;
    let product = client.products().get(&ProductId::new(id)).await?;
    print_product(out, &product)
}

pub async fn create(
    client: &VendorClient,
    out: Output,
    args: ProductArgs,
    publish: bool,
) -> Result<(), CliError> {
    require_dashboard(client).await?;
    let draft = args.into_draft().await?;

    match client.products().create(draft, status(publish)).await? {
        Some(product) => print_product(out, &product),
        None => {
            out.message(if publish {
                "Product published"
            } else {
                "Product saved as draft"
            });
            Ok(())
        }
    }
}

pub async fn update(
    client: &VendorClient,
    out: Output,
    id: String,
    args: ProductArgs,
    publish: bool,
) -> Result<(), CliError> {
    require_dashboard(client).await?;
    let draft = args.into_draft().await?;

    match client
        .products()
        .update(&ProductId::new(id), draft, status(publish))
        .await?
    {
        Some(product) => print_product(out, &product),
        None => {
            out.message("Product updated");
            Ok(())
        }
    }
}

pub async fn delete(client: &VendorClient, id: String) -> Result<(), CliError> {
    require_dashboard(client).await?;
    let id = ProductId::new(id);
    client.products().delete(&id).await?;
    tracing::info!(product_id = %id, "Product deleted");
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn categories(client: &VendorClient, out: Output) -> Result<(), CliError> {
    require_dashboard(client).await?;
    let categories = client.products().categories().await?;

    out.emit(&categories, |list| {
        for category in list {
            println!("{:<26} {}", category.id, category.name);
        }
    })
}

#[allow(clippy::print_stdout)]
fn print_product(out: Output, product: &Product) -> Result<(), CliError> {
    out.emit(product, |p| {
        println!("{} ({})", p.name, p.id);
        println!("  status:   {}", p.status);
        if let Some(sku) = &p.sku {
            println!("  sku:      {sku}");
        }
        if let Some(category) = &p.category {
            println!(
                "  category: {}",
                category.name.as_deref().unwrap_or(category.id.as_str())
            );
        }
        if let Some(price) = p.price {
            println!("  price:    {price}");
        }
        println!("  stock:    {}", p.stock);
        if let Some(vat) = p.vat {
            println!("  vat:      {vat}");
        }
        if let Some(discount) = p.discount {
            println!("  discount: {discount}");
        }
        if let Some(description) = &p.description {
            println!("\n{description}");
        }
    })
}
