use thiserror::Error;

/// Classified failure of a single agent-scoped catalog call. Every
/// variant is retryable on a later pass; none aborts processing of
/// other agents within the same pass.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("agent call timed out")]
    Timeout,

    #[error("agent unreachable: {0}")]
    Unreachable(String),

    #[error("agent returned status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("failed to decode agent response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CatalogError::Timeout
        } else if err.is_decode() {
            CatalogError::Decode(err.to_string())
        } else {
            CatalogError::Unreachable(err.to_string())
        }
    }
}
