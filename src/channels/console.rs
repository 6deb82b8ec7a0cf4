use super::{InboundMessage, OutboundSink};
use crate::error::TransportError;
use crate::gateway::ConversationGateway;
use crate::limiter::{RateLimiter, Scope};
use crate::session::SessionStore;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

/// Administrative commands, accepted only from the bot owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerCommand {
    /// `/forget <user>` — drop one user's session.
    Forget(String),
    /// `/forget-all` — drop every session.
    ForgetAll,
    /// `/stats` — session count and remaining quota.
    Stats,
}

impl OwnerCommand {
    /// Parse a `/`-prefixed line; `None` for ordinary chat text.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let mut parts = line.split_whitespace();
        match parts.next()? {
            "/forget" => Some(Self::Forget(parts.next()?.to_string())),
            "/forget-all" => Some(Self::ForgetAll),
            "/stats" => Some(Self::Stats),
            _ => None,
        }
    }

    pub fn execute(&self, store: &dyn SessionStore, limiter: &RateLimiter) -> String {
        match self {
            Self::Forget(user_id) => {
                if store.remove(user_id) {
                    format!("session for {user_id} removed")
                } else {
                    format!("no session for {user_id}")
                }
            }
            Self::ForgetAll => {
                let count = store.clear();
                format!("removed {count} sessions")
            }
            Self::Stats => {
                let remaining = if limiter.daily_limit() == 0 {
                    "unlimited".to_string()
                } else {
                    limiter.remaining(&Scope::Global).to_string()
                };
                format!(
                    "sessions: {}, requests remaining today: {remaining}",
                    store.size()
                )
            }
        }
    }
}

/// Stdin/stdout channel — runs the gateway end-to-end without any chat
/// platform attached. The operator chats as a single fixed identity.
pub struct ConsoleChannel {
    user_id: String,
}

impl ConsoleChannel {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    pub async fn run(
        &self,
        gateway: &ConversationGateway,
        store: &Arc<dyn SessionStore>,
        limiter: &Arc<RateLimiter>,
    ) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        tracing::info!(user_id = %self.user_id, "console channel ready");

        while let Some(line) = lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(command) = OwnerCommand::parse(line) {
                let reply = if gateway.is_owner(&self.user_id) {
                    command.execute(store.as_ref(), limiter)
                } else {
                    "owner commands are not available to this user".to_string()
                };
                self.deliver(&self.user_id, &reply).await?;
                continue;
            }

            let message = InboundMessage::new(self.user_id.clone(), line);
            let reply = match gateway
                .handle(&message.sender, &message.content, message.attachment.as_ref())
                .await
            {
                Ok(text) => text,
                // Request-path failures are final answers for that request.
                Err(e) => e.to_string(),
            };
            self.deliver(&self.user_id, &reply).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl OutboundSink for ConsoleChannel {
    async fn deliver(&self, user_id: &str, text: &str) -> Result<(), TransportError> {
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(format!("{text}\n").as_bytes())
            .await
            .map_err(|e| TransportError::Delivery {
                recipient: user_id.to_string(),
                message: e.to_string(),
            })?;
        stdout.flush().await.map_err(|e| TransportError::Delivery {
            recipient: user_id.to_string(),
            message: e.to_string(),
        })
    }
}
