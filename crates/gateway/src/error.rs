/// Transport-level failures. Expected backend refusals are not errors;
/// they arrive as an [`Envelope`](crate::Envelope) with `success: false`.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The response body was not a result envelope.
    #[error("Unexpected response ({status}): {body}")]
    Decode {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// Reading a file for upload failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend could not be reached.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}
