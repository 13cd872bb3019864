//! Orchestrator Engine
//!
//! The tick function: claims the campaign lease, selects eligible leads,
//! re-checks the Safety Gate before every dispatch, consults the
//! Contactability Registry, drives the Distribution Ledger's idempotent
//! retry state machine, invokes the channel adapter (or simulates it in
//! proof mode), updates the lead state tracker and finalizes the lease with
//! a progress summary.

mod engine;

pub use engine::{Collaborators, Orchestrator, Stores, TickError, TickResult};

use thiserror::Error;

/// Default batch size for a tick
pub const DEFAULT_BATCH_SIZE: usize = 25;

/// Default lease duration in seconds
pub const DEFAULT_LEASE_SECS: i64 = 120;

/// Engine configuration
///
/// Constructed per process (or per test); there is no global engine state.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Worker identity recorded on claimed leases
    pub worker_id: String,

    /// How long a claimed lease is valid without a refresh
    pub lease_duration_secs: i64,

    /// Proof mode: dispatch always succeeds without an external call and
    /// jobs terminate as `SentProof`
    pub proof_mode: bool,
}

impl OrchestratorConfig {
    pub fn new(worker_id: &str) -> Self {
        Self {
            worker_id: worker_id.to_string(),
            lease_duration_secs: DEFAULT_LEASE_SECS,
            proof_mode: false,
        }
    }

    /// Proof-mode configuration
    pub fn proof(worker_id: &str) -> Self {
        Self {
            proof_mode: true,
            ..Self::new(worker_id)
        }
    }
}

/// Engine construction errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("worker_id must not be empty")]
    EmptyWorkerId,

    #[error("lease_duration_secs must be positive")]
    NonPositiveLease,

    #[error("a channel adapter is required unless proof_mode is set")]
    MissingAdapter,
}
