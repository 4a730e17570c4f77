//! Error types shared by the content client, normalization and generator

/// A field of a raw document that is missing or has the wrong type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("field `{}`{} must be {}", .path, document_label(.document), .expected)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `data.banner.url`
    pub path: String,
    /// What the field was expected to hold
    pub expected: &'static str,
    /// Document the field belongs to, when known
    pub document: Option<String>,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, expected: &'static str) -> Self {
        Self {
            path: path.into(),
            expected,
            document: None,
        }
    }

    /// Attach the id of the document being normalized
    pub fn in_document(mut self, id: impl Into<String>) -> Self {
        self.document = Some(id.into());
        self
    }
}

fn document_label(document: &Option<String>) -> String {
    document
        .as_ref()
        .map(|doc| format!(" of document {}", doc))
        .unwrap_or_default()
}

/// Errors produced while fetching, normalizing or rendering content
#[derive(Debug, thiserror::Error)]
pub enum BlogError {
    /// Network failure, timeout or a server-side (5xx) response
    #[error("transport error: {message}")]
    Transport { message: String, retryable: bool },

    /// Non-success HTTP status that retrying will not fix
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// The response body was not the JSON we expected
    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid document: {0}")]
    Validation(#[from] ValidationError),

    /// The requested document does not exist
    #[error("{doc_type} `{uid}` not found")]
    NotFound { doc_type: String, uid: String },

    /// `load_more` was called with no next page
    #[error("no further pages to load")]
    Exhausted,

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Template(#[from] tera::Error),
}

impl BlogError {
    /// Whether the failure is transient and the operation may be retried
    pub fn is_retryable(&self) -> bool {
        matches!(self, BlogError::Transport { retryable: true, .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, BlogError::NotFound { .. })
    }
}

impl From<reqwest::Error> for BlogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return BlogError::Decode(err.to_string());
        }
        if let Some(status) = err.status() {
            if status.is_server_error() {
                return BlogError::Transport {
                    message: err.to_string(),
                    retryable: true,
                };
            }
            return BlogError::Status {
                status: status.as_u16(),
                url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            };
        }
        BlogError::Transport {
            message: err.to_string(),
            retryable: err.is_timeout() || err.is_connect() || err.is_request(),
        }
    }
}

impl From<serde_json::Error> for BlogError {
    fn from(err: serde_json::Error) -> Self {
        BlogError::Decode(err.to_string())
    }
}

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, BlogError>;
