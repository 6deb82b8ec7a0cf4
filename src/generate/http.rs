use super::{Attachment, Generator};
use crate::session::{Role, Turn};
use anyhow::Context;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Generator that posts a vendor-neutral JSON body to a configured endpoint.
///
/// The gateway applies its own deadline on top; the client-level timeout here
/// is only a backstop against a hung connection.
pub struct HttpGenerator {
    endpoint: String,
    /// Pre-computed `"Bearer <key>"` header value (avoids `format!` per request).
    cached_auth_header: Option<String>,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    history: Vec<HistoryEntry<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachment: Option<AttachmentPayload<'a>>,
}

#[derive(Debug, Serialize)]
struct HistoryEntry<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct AttachmentPayload<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    text: String,
}

impl HttpGenerator {
    pub fn new(endpoint: impl Into<String>, api_key: Option<&str>) -> Self {
        Self {
            endpoint: endpoint.into(),
            cached_auth_header: api_key.map(|k| format!("Bearer {k}")),
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .connect_timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn build_request<'a>(
        prompt: &'a str,
        history: &'a [Turn],
        attachment: Option<&'a Attachment>,
    ) -> GenerateRequest<'a> {
        let history = history
            .iter()
            .map(|turn| HistoryEntry {
                role: match turn.role {
                    Role::User => "user",
                    Role::Assistant => "assistant",
                },
                content: &turn.content,
            })
            .collect();

        GenerateRequest {
            prompt,
            history,
            attachment: attachment.map(|a| AttachmentPayload {
                mime_type: &a.mime_type,
                data: BASE64.encode(&a.data),
            }),
        }
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn generate(
        &self,
        prompt: &str,
        history: &[Turn],
        attachment: Option<&Attachment>,
    ) -> anyhow::Result<String> {
        let body = Self::build_request(prompt, history, attachment);

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(auth) = &self.cached_auth_header {
            request = request.header("Authorization", auth);
        }

        let response = request
            .send()
            .await
            .context("generation request failed")?
            .error_for_status()
            .context("generation backend returned an error status")?;

        let parsed: GenerateResponse = response
            .json()
            .await
            .context("malformed generation response")?;
        Ok(parsed.text)
    }
}
