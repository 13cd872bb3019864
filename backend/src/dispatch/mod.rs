//! Collaborator seams at the dispatch boundary
//!
//! The engine does not render templates, resolve sequences or talk to
//! channel providers itself; it calls these traits. Live implementations
//! (SMTP/LinkedIn/SMS providers, the template service) live outside this
//! crate. What ships here is the [`StaticSequenceResolver`], which is enough
//! for proof mode, the CLI and tests.

pub mod sequence;

use thiserror::Error;

use crate::models::lead::Lead;

/// A fully rendered message, ready for a channel adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// Message identifier from the sequence step
    pub message_id: String,

    /// Subject line (email) or first line (other channels)
    pub subject: String,

    pub body: String,
}

/// Errors from a channel adapter send
///
/// All adapter failures are treated as transient by the engine and go
/// through the retry/backoff state machine.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("channel send failed: {0}")]
    SendFailed(String),

    #[error("channel send timed out after {0}s")]
    Timeout(u64),
}

/// Errors from template rendering
///
/// Render failures block dispatch permanently for the job: a job that fails
/// to render is `Blocked`, never `Sent`.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    /// Guardrail: an unfilled placeholder survived rendering
    #[error("placeholder still present after render: {0}")]
    PlaceholderPresent(String),
}

/// Per-channel message sender (email / LinkedIn / SMS provider)
///
/// `send` returns the provider-side message id. Implementations should bound
/// the call with a timeout; a stuck send must not outlive the lease.
pub trait ChannelAdapter: Send + Sync {
    fn send(&self, lead: &Lead, message: &RenderedMessage) -> Result<String, DispatchError>;
}

/// Template rendering collaborator, including the placeholder guardrail
pub trait TemplateRenderer: Send + Sync {
    fn render(&self, lead: &Lead, message_id: &str) -> Result<RenderedMessage, RenderError>;
}

/// Trivial renderer for proof mode and tests: echoes the message id
///
/// Real rendering (placeholder substitution, guardrails) is an external
/// collaborator; proof mode only needs *a* message to thread through the
/// engine.
#[derive(Debug, Default)]
pub struct EchoRenderer;

impl TemplateRenderer for EchoRenderer {
    fn render(&self, lead: &Lead, message_id: &str) -> Result<RenderedMessage, RenderError> {
        Ok(RenderedMessage {
            message_id: message_id.to_string(),
            subject: format!("[{}] for {}", message_id, lead.email),
            body: format!("rendered body of {}", message_id),
        })
    }
}
