//! Outbound delivery seam.

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("channel request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("channel api error: {0}")]
    Api(String),
}

/// Delivers text replies to a recipient on some messaging channel.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Channel id (e.g. "whatsapp").
    fn id(&self) -> &str;
    /// Send `text` to `recipient` (a bare phone number; the channel adds its own address prefix).
    async fn send_message(&self, recipient: &str, text: &str) -> Result<(), ChannelError>;
}
