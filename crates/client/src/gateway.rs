//! Request gateway: the single path every API call takes.
//!
//! The gateway attaches the bearer token held by the [`SessionStore`],
//! applies the per-request timeout, and classifies the response. A 401 or 403
//! is reported to every registered [`UnauthorizedListener`] before the
//! failure is returned to the caller. The gateway itself never clears any
//! state.

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::session::SessionStore;

// =============================================================================
// Requests
// =============================================================================

/// Body of an outgoing request.
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

/// A multipart form whose part order is preserved on the wire.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

#[derive(Debug, Clone)]
enum FormPart {
    Text { name: String, value: String },
    File { name: String, file: FileUpload },
}

/// A file attached to a multipart request.
#[derive(Clone)]
pub struct FileUpload {
    /// File name reported to the server.
    pub file_name: String,
    /// MIME type, e.g. `image/png`.
    pub content_type: Option<String>,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl FileUpload {
    /// Create an upload, guessing the content type from the file extension.
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = guess_content_type(&file_name).map(str::to_string);
        Self {
            file_name,
            content_type,
            bytes,
        }
    }
}

fn guess_content_type(file_name: &str) -> Option<&'static str> {
    let ext = file_name.rsplit_once('.')?.1.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

impl MultipartForm {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text field.
    #[must_use]
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Append a text field only when `value` is present and not blank.
    #[must_use]
    pub fn text_if_present(self, name: &str, value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => self.text(name, v),
            _ => self,
        }
    }

    /// Append a file part.
    #[must_use]
    pub fn file(mut self, name: impl Into<String>, file: FileUpload) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file,
        });
        self
    }

    /// Names of all parts, in wire order.
    #[must_use]
    pub fn part_names(&self) -> Vec<&str> {
        self.parts
            .iter()
            .map(|p| match p {
                FormPart::Text { name, .. } | FormPart::File { name, .. } => name.as_str(),
            })
            .collect()
    }

    /// Value of the first text part with this name.
    #[must_use]
    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|p| match p {
            FormPart::Text { name: n, value } if n == name => Some(value.as_str()),
            _ => None,
        })
    }

    /// File names of all file parts with this name, in wire order.
    #[must_use]
    pub fn file_names(&self, name: &str) -> Vec<&str> {
        self.parts
            .iter()
            .filter_map(|p| match p {
                FormPart::File { name: n, file } if n == name => Some(file.file_name.as_str()),
                _ => None,
            })
            .collect()
    }

    fn into_reqwest(self) -> Result<reqwest::multipart::Form, ApiError> {
        let mut form = reqwest::multipart::Form::new();
        for part in self.parts {
            form = match part {
                FormPart::Text { name, value } => form.text(name, value),
                FormPart::File { name, file } => {
                    let mut part =
                        reqwest::multipart::Part::bytes(file.bytes).file_name(file.file_name);
                    if let Some(content_type) = file.content_type {
                        part = part
                            .mime_str(&content_type)
                            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
                    }
                    form.part(name, part)
                }
            };
        }
        Ok(form)
    }
}

/// An API request relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: RequestBody,
}

impl ApiRequest {
    /// Create a request with an explicit method.
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query-string parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Decode` if `body` cannot be represented as JSON.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, ApiError> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Attach a multipart body.
    #[must_use]
    pub fn multipart(mut self, form: MultipartForm) -> Self {
        self.body = RequestBody::Multipart(form);
        self
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    #[must_use]
    pub const fn body(&self) -> &RequestBody {
        &self.body
    }
}

/// A successful (2xx) response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Parsed JSON body (`Null` when the body was empty).
    pub body: Value,
}

impl ApiResponse {
    /// The `message` field of the response envelope, if any.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        server_message(&self.body)
    }
}

// =============================================================================
// Unauthorized signal
// =============================================================================

/// Raised once for every call the server answers with 401 or 403.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnauthorizedEvent {
    /// The status that triggered the event (401 or 403).
    pub status: u16,
    /// Path of the failing request, for diagnostics.
    pub path: String,
}

/// Observer notified of auth failures.
///
/// Invoked synchronously from within the failing call, before the failure is
/// returned to the caller. Implementations must not call back into the
/// gateway.
pub trait UnauthorizedListener: Send + Sync {
    fn on_unauthorized(&self, event: &UnauthorizedEvent);
}

impl<F> UnauthorizedListener for F
where
    F: Fn(&UnauthorizedEvent) + Send + Sync,
{
    fn on_unauthorized(&self, event: &UnauthorizedEvent) {
        self(event);
    }
}

// =============================================================================
// RequestGateway
// =============================================================================

/// Gateway for every call to the vendor API.
///
/// Cheap to clone; clones share the HTTP connection pool, session and
/// listener registry.
#[derive(Clone)]
pub struct RequestGateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    client: reqwest::Client,
    base_url: Url,
    session: Arc<SessionStore>,
    listeners: RwLock<Vec<Arc<dyn UnauthorizedListener>>>,
}

impl std::fmt::Debug for RequestGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGateway")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl RequestGateway {
    /// Create a gateway bound to a session store.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidRequest` if the HTTP client cannot be built.
    pub fn new(config: &ApiConfig, session: Arc<SessionStore>) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::InvalidRequest(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            inner: Arc::new(GatewayInner {
                client,
                base_url: config.base_url.clone(),
                session,
                listeners: RwLock::new(Vec::new()),
            }),
        })
    }

    /// Register an observer for 401/403 responses.
    pub fn on_unauthorized(&self, listener: Arc<dyn UnauthorizedListener>) {
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// The session store whose token this gateway attaches.
    #[must_use]
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.inner.session
    }

    /// Execute a request.
    ///
    /// # Errors
    ///
    /// - `ApiError::Rejected` for any non-2xx status (401/403 additionally
    ///   notify the unauthorized listeners)
    /// - `ApiError::Transport` when no response arrived (including timeout)
    /// - `ApiError::InvalidRequest` when the request could not be built
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self
            .inner
            .base_url
            .join(request.path.trim_start_matches('/'))?;

        let mut builder = self.inner.client.request(request.method, url);

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(token) = self.inner.session.token() {
            builder = builder.bearer_auth(token.expose_secret());
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder.json(&body),
            RequestBody::Multipart(form) => builder.multipart(form.into_reqwest()?),
        };

        let response = builder.send().await?;
        let status = response.status();

        // The status alone decides an auth failure; an unreadable body only
        // costs the server message
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let message = match response.text().await {
                Ok(text) => server_message(&parse_body(&text)),
                Err(e) => {
                    debug!(error = %e, "Could not read auth failure body");
                    None
                }
            };
            warn!(status = %status, "API rejected credentials");
            self.emit_unauthorized(&UnauthorizedEvent {
                status: status.as_u16(),
                path: request.path,
            });
            return Err(ApiError::rejected(status.as_u16(), message));
        }

        let text = response.text().await?;
        let body = parse_body(&text);

        if status.is_success() {
            debug!(status = %status, "API request succeeded");
            return Ok(ApiResponse {
                status: status.as_u16(),
                body,
            });
        }

        let message = server_message(&body);
        debug!(
            status = %status,
            message = message.as_deref().unwrap_or(""),
            "API request rejected"
        );
        Err(ApiError::rejected(status.as_u16(), message))
    }

    fn emit_unauthorized(&self, event: &UnauthorizedEvent) {
        // Snapshot so listeners run without the registry lock held
        let listeners: Vec<_> = self
            .inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for listener in listeners {
            listener.on_unauthorized(event);
        }
    }
}

/// Parse a response body, keeping non-JSON text as a string value.
fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Extract the human-readable message from an error or success envelope.
///
/// Looks at `message`, then `error`, then `data.message`.
fn server_message(body: &Value) -> Option<String> {
    let candidates = [
        body.get("message"),
        body.get("error"),
        body.get("data").and_then(|d| d.get("message")),
    ];

    candidates
        .into_iter()
        .flatten()
        .find_map(|v| v.as_str())
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
