//! Request Error Types
//!
//! Errors surfaced by [`IktRequest`](super::IktRequest) and the message
//! extraction used by the global error handler.

use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while dispatching a request
#[derive(Error, Debug)]
pub enum RequestError {
    /// The base URL or request URL could not be parsed
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The per-instance timeout elapsed
    #[error("timeout of {0}ms exceeded")]
    Timeout(u64),

    /// Network or protocol failure before a response arrived
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-2xx status
    #[error("Request failed with status code {status}")]
    Status { status: u16, body: Option<Value> },

    /// The response body did not have the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// The request body could not be serialized
    #[error("Failed to encode request body: {0}")]
    Encode(String),

    /// The export response carried no `filename=` in its content-disposition
    #[error("Missing filename in content-disposition header")]
    MissingFilename,

    /// A request or response interceptor rejected the call
    #[error("Interceptor error: {0}")]
    Interceptor(String),

    /// The underlying HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl RequestError {
    /// HTTP status code, when the server responded
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Status { status, .. } => Some(*status),
            RequestError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Parsed JSON body of an error response
    pub fn body(&self) -> Option<&Value> {
        match self {
            RequestError::Status { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Message shown to the user for this error.
    ///
    /// Picks the server's `msg` field, then its `detail` field, and falls
    /// back to the error's own message. Empty or non-string fields are
    /// skipped.
    pub fn user_message(&self) -> String {
        if let Some(body) = self.body() {
            for field in ["msg", "detail"] {
                let text = body
                    .get(field)
                    .and_then(Value::as_str)
                    .filter(|s| !s.trim().is_empty());
                if let Some(text) = text {
                    return text.to_string();
                }
            }
        }
        self.to_string()
    }
}
