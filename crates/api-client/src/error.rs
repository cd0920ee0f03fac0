/// Failures talking to the tenant API.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Connection, TLS, timeout, or body read failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Non-success status whose body could not be interpreted.
    #[error("{status}: {body}")]
    Status { status: u16, body: String },

    /// Success status with a body that is not the expected JSON.
    #[error("Malformed response from {path}: {source}")]
    Decode {
        path: String,
        source: serde_json::Error,
    },
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            Self::Decode { .. } => None,
        }
    }
}
