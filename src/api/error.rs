use thiserror::Error;

/// Why a feed fetch failed. Every variant is a recoverable `FetchFailed`; the
/// screen keeps its last good list.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode posts: {reason}")]
    Decode { reason: String },
}

impl FetchError {
    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network { .. } => "network",
            FetchError::Status { .. } => "status",
            FetchError::Decode { .. } => "decode",
        }
    }
}
