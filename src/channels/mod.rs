pub mod console;

pub use console::{ConsoleChannel, OwnerCommand};

use crate::error::TransportError;
use crate::generate::Attachment;
use async_trait::async_trait;

/// One `(user, text, attachment?)` tuple delivered by an inbound source.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub sender: String,
    pub content: String,
    pub attachment: Option<Attachment>,
}

impl InboundMessage {
    pub fn new(sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            content: content.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// Outbound half of a chat platform — implement for any messaging surface.
#[async_trait]
pub trait OutboundSink: Send + Sync {
    async fn deliver(&self, user_id: &str, text: &str) -> Result<(), TransportError>;
}
