use thiserror::Error;

/// Errors produced while normalizing a provider response body.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed JSON for {context}: {source}")]
    MalformedJson {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected shape for {context}: {reason}")]
    UnexpectedShape {
        context: &'static str,
        reason: String,
    },
}

/// Terminal error recorded on a [`crate::FetchTask`] that finished without
/// producing a result.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Errors raised while constructing a provider query builder.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}
