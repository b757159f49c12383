//! Command implementations.
//!
//! Each command builds on one [`VendorClient`] whose session lives in the
//! file named by `VENDOR_SESSION_FILE`, so a `login` in one invocation is
//! picked up by the next.

pub mod auth;
pub mod dashboard;
pub mod products;
pub mod profile;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use vendor_portal_client::{
    ApiError, ClientConfig, ConfigError, FileStorage, FileUpload, Navigator, Route, SessionPhase,
    VendorClient,
};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The API call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// A local file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output could not be serialized.
    #[error("Failed to format output: {0}")]
    Output(#[from] serde_json::Error),

    /// No stored session.
    #[error("Not signed in. Run `vendor-cli login` first.")]
    SignedOut,

    /// The account may not use the dashboard.
    #[error("{heading}. {message}")]
    Blocked {
        heading: &'static str,
        message: &'static str,
    },
}

/// Build the client from the environment.
pub fn connect() -> Result<VendorClient, CliError> {
    let config = ClientConfig::from_env()?;
    let storage = Arc::new(FileStorage::new(config.session_file.clone()));
    Ok(VendorClient::new(&config, storage, Arc::new(TerminalNavigator))?)
}

/// Gate for dashboard commands: requires a stored token and an approved
/// account.
pub async fn require_dashboard(client: &VendorClient) -> Result<(), CliError> {
    if !client.controller().mount_dashboard() {
        return Err(CliError::SignedOut);
    }
    client.profile().get().await?;

    match client.controller().phase() {
        SessionPhase::Blocked(reason) => Err(CliError::Blocked {
            heading: reason.heading(),
            message: reason.message(),
        }),
        SessionPhase::Anonymous | SessionPhase::Terminating => Err(CliError::SignedOut),
        SessionPhase::Authenticated => Ok(()),
    }
}

/// Read a file from disk as an upload.
pub async fn read_upload(path: &Path) -> Result<FileUpload, CliError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| CliError::File {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());
    Ok(FileUpload::new(file_name, bytes))
}

/// Navigation in a terminal means telling the user what to run next.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    #[allow(clippy::print_stderr)]
    fn navigate(&self, route: Route) {
        tracing::debug!(?route, "Navigate");
        match route {
            Route::Login => eprintln!("Signed out. Run `vendor-cli login` to sign in again."),
            Route::Otp => eprintln!("Check your email, then run `vendor-cli verify-otp`."),
            Route::Dashboard => {}
        }
    }
}

/// Where command results go.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    json: bool,
}

impl Output {
    pub const fn new(json: bool) -> Self {
        Self { json }
    }

    /// Print `value` as JSON when `--json` is set, otherwise run `human`.
    #[allow(clippy::print_stdout)]
    pub fn emit<T: Serialize>(self, value: &T, human: impl FnOnce(&T)) -> Result<(), CliError> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            human(value);
        }
        Ok(())
    }

    /// Print a status line.
    #[allow(clippy::print_stdout)]
    pub fn message(self, text: &str) {
        if self.json {
            println!("{}", serde_json::json!({ "message": text }));
        } else {
            println!("{text}");
        }
    }
}
