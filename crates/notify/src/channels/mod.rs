//! Messaging channel implementations.

pub mod slack;

use async_trait::async_trait;

use crate::error::ChannelError;
use crate::MessageRef;

/// A messaging channel that can group replies under a parent message.
#[async_trait]
pub trait ThreadedChannel: Send + Sync {
    /// Get the name of this channel.
    fn name(&self) -> &'static str;

    /// Check if this channel is enabled/configured.
    fn enabled(&self) -> bool;

    /// Post `text`, threaded under `thread` when given.
    ///
    /// Returns the reference of the posted message.
    async fn post(
        &self,
        text: &str,
        thread: Option<&MessageRef>,
    ) -> Result<MessageRef, ChannelError>;
}
