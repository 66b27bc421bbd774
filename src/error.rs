//! Error types for the Tsuga provider.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Errors that can occur while serving provider requests.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The HTTP call to the Tsuga API failed before a response arrived.
    #[error("Client Error: {0}")]
    Client(#[from] reqwest::Error),

    /// The Tsuga API answered with a non-2xx status.
    #[error("API Error: {}", render_api_error(.status, .code.as_deref(), .message, .request_id.as_deref()))]
    Api {
        /// HTTP status code of the response.
        status: u16,
        /// Machine-readable error code, when the body could be parsed.
        code: Option<String>,
        /// Error message, or the raw body when it could not be parsed.
        message: String,
        /// Request id reported by the API.
        request_id: Option<String>,
    },

    /// A response body could not be decoded.
    #[error("Parse Error: {0}")]
    Parse(String),

    /// Resource configuration is invalid at the given attribute path.
    #[error("Invalid configuration at {path}: {detail}")]
    InvalidConfiguration {
        /// Attribute path of the offending value.
        path: String,
        /// What is wrong with it.
        detail: String,
    },

    /// The provider configuration is invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A resource operation was requested before `Configure`.
    #[error("Provider not configured: call Configure before managing resources")]
    NotConfigured,

    /// A data source lookup matched nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The requested resource type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// Invalid request from the host (for example a malformed import id).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// State or configuration could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A gRPC transport error occurred.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),
}

fn render_api_error(
    status: &u16,
    code: Option<&str>,
    message: &str,
    request_id: Option<&str>,
) -> String {
    let mut rendered = match code {
        Some(code) => format!("{code}: {message} (status {status}"),
        None => format!("{message} (status {status}"),
    };
    if let Some(id) = request_id {
        rendered.push_str(&format!(", request id {id}"));
    }
    rendered.push(')');
    rendered
}

impl ProviderError {
    /// Build an [`ProviderError::InvalidConfiguration`].
    pub fn invalid(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// Attribute path the error refers to, if any.
    pub fn attribute_path(&self) -> Option<&str> {
        match self {
            Self::InvalidConfiguration { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Convert the error into a single error diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Self::InvalidConfiguration { path, detail } => {
                Diagnostic::error("Invalid configuration")
                    .with_detail(detail.clone())
                    .with_attribute(path.clone())
            }
            Self::Client(err) => Diagnostic::error("Client Error").with_detail(err.to_string()),
            Self::Api { .. } => {
                Diagnostic::error("API Error").with_detail(self.to_string())
            }
            Self::Parse(msg) => Diagnostic::error("Parse Error").with_detail(msg.clone()),
            Self::NotFound(msg) => Diagnostic::error("Not found").with_detail(msg.clone()),
            other => Diagnostic::error(other.to_string()),
        }
    }
}

impl From<ProviderError> for tonic::Status {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Client(err) => {
                tonic::Status::unavailable(format!("Client Error: {}", err))
            }
            ProviderError::Api { status: 404, .. } => tonic::Status::not_found(err.to_string()),
            ProviderError::Api { status: 401, .. } => {
                tonic::Status::unauthenticated(err.to_string())
            }
            ProviderError::Api { status: 403, .. } => {
                tonic::Status::permission_denied(err.to_string())
            }
            ProviderError::Api { status: 409, .. } => {
                tonic::Status::already_exists(err.to_string())
            }
            ProviderError::Api { status: 429, .. } => {
                tonic::Status::resource_exhausted(err.to_string())
            }
            ProviderError::Api { .. } => tonic::Status::unknown(err.to_string()),
            ProviderError::Parse(msg) => tonic::Status::internal(format!("Parse Error: {}", msg)),
            ProviderError::InvalidConfiguration { .. } => {
                tonic::Status::invalid_argument(err.to_string())
            }
            ProviderError::Configuration(msg) => tonic::Status::failed_precondition(msg),
            ProviderError::NotConfigured => tonic::Status::failed_precondition(err.to_string()),
            ProviderError::NotFound(msg) => tonic::Status::not_found(msg),
            ProviderError::UnknownResource(msg) => tonic::Status::not_found(msg),
            ProviderError::InvalidRequest(msg) => tonic::Status::invalid_argument(msg),
            ProviderError::Serialization(err) => {
                tonic::Status::invalid_argument(format!("Serialization error: {}", err))
            }
            ProviderError::Transport(err) => {
                tonic::Status::unavailable(format!("Transport error: {}", err))
            }
        }
    }
}
