//! Error types for the notification system.

use thiserror::Error;

/// Errors that can occur when posting to a messaging channel.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// HTTP request failed or the response body could not be decoded
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Channel is not configured
    #[error("Channel not configured: {0}")]
    NotConfigured(String),

    /// The service accepted the request but reported a logical failure
    #[error("API returned error: {0}")]
    Api(String),

    /// The service reported success without a message reference
    #[error("Response carried no message reference")]
    MissingReference,
}
