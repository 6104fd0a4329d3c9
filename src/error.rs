// src/error.rs
// Gateway error taxonomy - the controller maps these onto the user-visible
// error policy (synthetic reply for transport failures, silence for the rest)

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// Gateway answered with a non-2xx status
    #[error("gateway returned {status}: {body}")]
    Http { status: StatusCode, body: String },

    /// Request never reached the gateway or the connection broke mid-stream
    #[error("gateway request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The caller tripped the cancellation token
    #[error("request cancelled")]
    Cancelled,
}
