use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `relaybot`.
///
/// Each subsystem defines its own error variant. Library callers can match on
/// these to decide recovery strategy; internal code continues to use
/// `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum RelayError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Session store ────────────────────────────────────────────────────
    #[error("session: {0}")]
    Session(#[from] SessionError),

    // ── Conversation gateway ────────────────────────────────────────────
    #[error("gateway: {0}")]
    Gateway(#[from] GatewayError),

    // ── Transport / Channel ──────────────────────────────────────────────
    #[error("transport: {0}")]
    Transport(#[from] TransportError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),
}

// ─── Session errors ─────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(String),
}

// ─── Gateway errors ─────────────────────────────────────────────────────────

/// Request-path failures surfaced to the user as a final answer for that
/// request. Validation variants are produced before any quota or history
/// mutation.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("prompt is {len} chars, maximum is {max}")]
    PromptTooLong { len: usize, max: usize },

    #[error("attachment type {mime} is not supported")]
    UnsupportedAttachment { mime: String },

    #[error("daily request limit reached, try again after the window resets")]
    QuotaExceeded,

    #[error("generation failed: {0}")]
    GenerationFailed(String),

    #[error("generation timed out after {secs}s")]
    GenerationTimeout { secs: u64 },

    #[error("session: {0}")]
    Session(#[from] SessionError),
}

// ─── Transport errors ───────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("delivery to {recipient} failed: {message}")]
    Delivery { recipient: String, message: String },
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, RelayError>;
