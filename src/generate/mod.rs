pub mod http;

pub use http::HttpGenerator;

use crate::session::Turn;
use async_trait::async_trait;

/// A file attached to an inbound message, handed through to the generator.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub mime_type: String,
    pub data: Vec<u8>,
    pub filename: Option<String>,
}

/// Attachment types the bot accepts. PDF is recognized but explicitly
/// unsupported by the upstream model.
const SUPPORTED_MIME_TYPES: &[&str] = &[
    "text/plain; charset=utf-8",
    "image/jpeg",
    "image/jpg",
    "image/png",
    "audio/mp3",
    "audio/mp4",
    "video/quicktime",
    "video/mp4",
    "video/mpeg",
    "video/mov",
    "video/avi",
    "video/x-flv",
    "video/mpg",
    "video/webm",
    "video/wmv",
    "video/3gpp",
];

pub fn is_supported_mime(mime: &str) -> bool {
    SUPPORTED_MIME_TYPES.contains(&mime)
}

/// Opaque text-generation capability. No vendor wire format leaks through
/// this seam; implementations own their own transport and encoding.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        history: &[Turn],
        attachment: Option<&Attachment>,
    ) -> anyhow::Result<String>;
}
