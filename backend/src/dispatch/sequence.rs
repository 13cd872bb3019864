//! Sequence resolution
//!
//! A routing sequence defines a campaign's content cadence: which message
//! goes out at which step, on which channel, and how long to wait before the
//! next step. Authoring sequences is external; the engine only asks "what is
//! the next step for this cursor?".

use chrono::Duration;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::models::campaign::Channel;

/// One step of a routing sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceStep {
    /// Message/template identifier to render and send
    pub message_id: String,

    /// Position of this step in the sequence
    pub step_index: u32,

    /// Channel the step dispatches on
    pub channel: Channel,

    /// Wait before the lead's next step becomes due
    pub delay_until_next: Duration,
}

#[derive(Debug, Error, PartialEq)]
pub enum SequenceError {
    #[error("unknown routing sequence: {0}")]
    UnknownSequence(String),
}

/// Resolves the next step of a lead's routing sequence
///
/// `Ok(None)` means the sequence is exhausted: there is nothing left to send
/// and the engine clears the lead's `next_action_at`.
pub trait SequenceResolver: Send + Sync {
    fn next_step(
        &self,
        routing_sequence: &str,
        cursor: u32,
    ) -> Result<Option<SequenceStep>, SequenceError>;
}

/// Declarative step used to build a [`StaticSequenceResolver`]
///
/// Deserializable so CLI scenario files and FFI callers can define sequences
/// inline.
#[derive(Debug, Clone, Deserialize)]
pub struct StepSpec {
    pub message_id: String,
    pub channel: Channel,

    /// Seconds to wait after this step before the next becomes due
    pub delay_secs: i64,
}

/// In-memory resolver: sequence name -> ordered steps
#[derive(Debug, Default)]
pub struct StaticSequenceResolver {
    sequences: HashMap<String, Vec<StepSpec>>,
}

impl StaticSequenceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named sequence
    pub fn with_sequence(mut self, name: &str, steps: Vec<StepSpec>) -> Self {
        self.sequences.insert(name.to_string(), steps);
        self
    }
}

impl SequenceResolver for StaticSequenceResolver {
    fn next_step(
        &self,
        routing_sequence: &str,
        cursor: u32,
    ) -> Result<Option<SequenceStep>, SequenceError> {
        let steps = self
            .sequences
            .get(routing_sequence)
            .ok_or_else(|| SequenceError::UnknownSequence(routing_sequence.to_string()))?;
        Ok(steps.get(cursor as usize).map(|spec| SequenceStep {
            message_id: spec.message_id.clone(),
            step_index: cursor,
            channel: spec.channel,
            delay_until_next: Duration::seconds(spec.delay_secs),
        }))
    }
}
