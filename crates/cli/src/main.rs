//! Vendor Portal CLI - Terminal front end for the vendor dashboard.
//!
//! # Usage
//!
//! ```bash
//! # Create an account, then confirm it with the emailed code
//! vendor-cli register --first-name Ada --last-name Lovelace -e ada@example.com
//! vendor-cli verify-otp -e ada@example.com --otp 1234
//!
//! # Sign in (password from --password or VENDOR_PASSWORD)
//! vendor-cli login -e ada@example.com
//!
//! # Browse and manage products
//! vendor-cli products list --page 2 --limit 20
//! vendor-cli products create --name "Oak Table" --sku OAK-1 --price 120 ...
//!
//! # Dashboard numbers
//! vendor-cli dashboard
//! vendor-cli analytics --period week
//! ```
//!
//! # Environment Variables
//!
//! - `VENDOR_API_BASE_URL` - Base URL of the vendor REST API (required)
//! - `VENDOR_SESSION_FILE` - Where the signed-in session is persisted
//! - `SENTRY_DSN` - Enables error reporting when set
//! - `RUST_LOG` - Log filter (default: `vendor_portal_cli=info,vendor_portal_client=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Args, Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vendor_portal_core::AnalyticsPeriod;

mod commands;

use commands::products::ProductArgs;

#[derive(Parser)]
#[command(name = "vendor-cli")]
#[command(author, version, about = "Vendor portal command-line client")]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a vendor account
    Register {
        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(short, long)]
        email: String,

        #[command(flatten)]
        password: PasswordArg,
    },
    /// Confirm a registration with the emailed code
    VerifyOtp {
        #[arg(short, long)]
        email: String,

        #[arg(long)]
        otp: String,
    },
    /// Sign in
    Login {
        #[arg(short, long)]
        email: String,

        #[command(flatten)]
        password: PasswordArg,
    },
    /// Request a password reset code
    ForgotPassword {
        #[arg(short, long)]
        email: String,
    },
    /// Exchange a password reset code for a reset grant
    VerifyPasswordOtp {
        #[arg(short, long)]
        email: String,

        #[arg(long)]
        otp: String,
    },
    /// Set a new password using a reset grant
    ResetPassword {
        /// Account id from `verify-password-otp`
        #[arg(long)]
        id: String,

        /// Reset token from `verify-password-otp`
        #[arg(long)]
        token: String,

        #[command(flatten)]
        password: PasswordArg,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in vendor
    Whoami,
    /// Manage the vendor profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Manage products
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// List product categories
    Categories,
    /// Show the dashboard summary
    Dashboard,
    /// Show sales analytics
    Analytics {
        /// Reporting window (`day`, `week`, `month`, `year`)
        #[arg(short, long, default_value = "month")]
        period: AnalyticsPeriod,
    },
}

#[derive(Args)]
struct PasswordArg {
    /// Account password
    #[arg(short, long, env = "VENDOR_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Change profile fields; omitted fields stay as they are
    Update {
        #[arg(long)]
        full_name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        #[arg(long)]
        address: Option<String>,
    },
    /// Upload a new profile picture
    Picture {
        /// Image file
        path: std::path::PathBuf,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products page by page
    List {
        #[arg(long, default_value_t = 1)]
        page: u32,

        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
    /// Show one product
    Show { id: String },
    /// Create a product (as a draft unless `--publish` is given)
    Create {
        #[command(flatten)]
        product: ProductArgs,

        #[arg(long)]
        publish: bool,
    },
    /// Replace a product's fields and images
    Update {
        id: String,

        #[command(flatten)]
        product: ProductArgs,

        #[arg(long)]
        publish: bool,
    },
    /// Delete a product
    Delete { id: String },
}

/// Initialize Sentry error tracking when `SENTRY_DSN` is set.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|s| !s.is_empty())?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: std::env::var("SENTRY_ENVIRONMENT")
                .ok()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Warnings and errors become Sentry events; info and debug become breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(log_json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "vendor_portal_cli=info,vendor_portal_client=info".into());

    // Logs go to stderr so command output stays pipeable
    let json_layer = log_json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer = (!log_json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Sentry must be initialized before the subscriber
    let _sentry_guard = init_sentry();
    init_tracing(cli.log_json);

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    let out = commands::Output::new(cli.json);
    let client = commands::connect()?;

    match cli.command {
        Commands::Register {
            first_name,
            last_name,
            email,
            password,
        } => {
            commands::auth::register(&client, out, first_name, last_name, email, password.password)
                .await
        }
        Commands::VerifyOtp { email, otp } => {
            commands::auth::verify_registration_otp(&client, out, email, otp).await
        }
        Commands::Login { email, password } => {
            commands::auth::login(&client, out, email, password.password).await
        }
        Commands::ForgotPassword { email } => {
            commands::auth::forgot_password(&client, out, email).await
        }
        Commands::VerifyPasswordOtp { email, otp } => {
            commands::auth::verify_password_otp(&client, out, email, otp).await
        }
        Commands::ResetPassword {
            id,
            token,
            password,
        } => commands::auth::reset_password(&client, out, id, token, password.password).await,
        Commands::Logout => {
            commands::auth::logout(&client);
            Ok(())
        }
        Commands::Whoami => commands::profile::show(&client, out).await,
        Commands::Profile { action } => match action {
            ProfileAction::Update {
                full_name,
                email,
                phone,
                address,
            } => {
                let update = vendor_portal_client::ProfileUpdate {
                    full_name,
                    email,
                    phone,
                    address,
                };
                commands::profile::update(&client, out, update).await
            }
            ProfileAction::Picture { path } => {
                commands::profile::upload_picture(&client, out, &path).await
            }
        },
        Commands::Products { action } => match action {
            ProductsAction::List { page, limit } => {
                commands::products::list(&client, out, page, limit).await
            }
            ProductsAction::Show { id } => commands::products::show(&client, out, id).await,
            ProductsAction::Create { product, publish } => {
                commands::products::create(&client, out, product, publish).await
            }
            ProductsAction::Update {
                id,
                product,
                publish,
            } => commands::products::update(&client, out, id, product, publish).await,
            ProductsAction::Delete { id } => commands::products::delete(&client, id).await,
        },
        Commands::Categories => commands::products::categories(&client, out).await,
        Commands::Dashboard => commands::dashboard::summary(&client, out).await,
        Commands::Analytics { period } => commands::dashboard::sales(&client, out, period).await,
    }
}
