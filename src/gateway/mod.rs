use crate::config::Config;
use crate::error::GatewayError;
use crate::generate::{Attachment, Generator, is_supported_mime};
use crate::limiter::{RateLimiter, Scope};
use crate::session::{Role, SessionStore, Turn};
use std::sync::Arc;
use std::time::Duration;

/// Stateless per-invocation orchestrator: validation → quota → history →
/// generate → append. All state lives in the store and limiter it is handed.
pub struct ConversationGateway {
    store: Arc<dyn SessionStore>,
    limiter: Arc<RateLimiter>,
    /// Separate ceiling applied per user id, if configured.
    per_user: Option<RateLimiter>,
    generator: Arc<dyn Generator>,
    max_prompt_chars: usize,
    max_history_turns: usize,
    timeout: Duration,
    bot_owner: Option<String>,
}

impl ConversationGateway {
    pub fn new(
        store: Arc<dyn SessionStore>,
        limiter: Arc<RateLimiter>,
        generator: Arc<dyn Generator>,
        config: &Config,
    ) -> Self {
        let per_user = if config.limits.per_user_limit > 0 {
            Some(RateLimiter::new(config.limits.per_user_limit))
        } else {
            None
        };

        Self {
            store,
            limiter,
            per_user,
            generator,
            max_prompt_chars: config.limits.max_prompt_chars,
            max_history_turns: config.session.max_history_turns,
            timeout: Duration::from_secs(config.generation.timeout_secs),
            bot_owner: config.bot_owner.clone(),
        }
    }

    /// Relay one inbound message and return the generated reply.
    ///
    /// Validation happens before the quota gate, so invalid input never
    /// consumes quota. History is mutated only after a successful
    /// generation, so a user retry after a failure does not duplicate the
    /// user's message.
    pub async fn handle(
        &self,
        user_id: &str,
        prompt: &str,
        attachment: Option<&Attachment>,
    ) -> Result<String, GatewayError> {
        if prompt.trim().is_empty() {
            return Err(GatewayError::EmptyPrompt);
        }
        let len = prompt.chars().count();
        if len > self.max_prompt_chars {
            return Err(GatewayError::PromptTooLong {
                len,
                max: self.max_prompt_chars,
            });
        }
        if let Some(attachment) = attachment
            && !is_supported_mime(&attachment.mime_type)
        {
            return Err(GatewayError::UnsupportedAttachment {
                mime: attachment.mime_type.clone(),
            });
        }

        if !self.is_owner(user_id) {
            // The per-user ceiling goes first: a capped user must not
            // consume bot-wide quota on a request that will be rejected.
            if let Some(per_user) = &self.per_user
                && !per_user.admit(&Scope::User(user_id.to_string()))
            {
                return Err(GatewayError::QuotaExceeded);
            }
            if !self.limiter.admit(&Scope::Global) {
                return Err(GatewayError::QuotaExceeded);
            }
        }

        self.store.get_or_create(user_id);
        let history = self.store.history(user_id, self.max_history_turns);

        let generated =
            tokio::time::timeout(self.timeout, self.generator.generate(prompt, &history, attachment))
                .await;
        let text = match generated {
            Err(_) => {
                tracing::warn!(user_id, "generation timed out");
                return Err(GatewayError::GenerationTimeout {
                    secs: self.timeout.as_secs(),
                });
            }
            Ok(Err(e)) => {
                tracing::warn!(user_id, "generation failed: {e:#}");
                return Err(GatewayError::GenerationFailed(e.to_string()));
            }
            Ok(Ok(text)) => text,
        };

        self.store.append(user_id, Turn::new(Role::User, prompt))?;
        self.store
            .append(user_id, Turn::new(Role::Assistant, text.clone()))?;
        tracing::info!(user_id, prompt_chars = len, "exchange complete");

        Ok(text)
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.bot_owner.as_deref() == Some(user_id)
    }
}
