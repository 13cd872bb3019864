//! Campaign Distribution Orchestrator - Rust Engine
//!
//! Turns leads eligible for outreach into individually dispatched messages,
//! under hard safety constraints, with crash-safe exactly-once-per-step
//! semantics.
//!
//! # Architecture
//!
//! - **core**: time helpers (UTC day windows for quota accounting)
//! - **models**: domain types (Campaign, Lead, DistributionJob, Run, block lists)
//! - **store**: repository traits + in-memory reference store
//! - **safety**: Safety Gate (status / kill-switch predicate)
//! - **registry**: Contactability Registry (DNC, unsubscribe, suppression)
//! - **dispatch**: collaborator seams (channel adapter, renderer, sequences)
//! - **audit**: append-only audit trail
//! - **orchestrator**: the tick loop
//!
//! # Critical Invariants
//!
//! 1. At most one job per `(lead, message, step)` idempotency key; a lead
//!    never receives two sends for the same step
//! 2. At most one live lease per campaign (single-writer)
//! 3. Dispatch only while `status == Running && !kill_switch`, re-checked
//!    before every individual send
//! 4. `now` is always supplied by the caller; the engine never reads a clock

// Module declarations
pub mod audit;
pub mod core;
pub mod dispatch;
pub mod models;
pub mod orchestrator;
pub mod registry;
pub mod safety;
pub mod scenario;
pub mod store;

// Re-exports for convenience
pub use audit::{AuditEntry, AuditSink, InMemoryAuditLog};
pub use dispatch::{
    sequence::{SequenceResolver, SequenceStep, StaticSequenceResolver, StepSpec},
    ChannelAdapter, DispatchError, EchoRenderer, RenderError, RenderedMessage, TemplateRenderer,
};
pub use models::{
    campaign::{CampaignConfig, CampaignStatus, Channel},
    job::{DistributionJob, JobStatus},
    lead::{ConsentStatus, Lead, LeadStatus},
    run::{OrchestrationRun, RunProgress, RunStatus},
    suppression::{SuppressionEntry, SuppressionKind, UnsubscribeEntry},
};
pub use orchestrator::{
    Collaborators, Orchestrator, OrchestratorConfig, Stores, TickError, TickResult,
    DEFAULT_BATCH_SIZE,
};
pub use registry::{ContactDecision, ContactabilityRegistry};
pub use scenario::{Scenario, ScenarioError};
pub use safety::{check_campaign_safety, SafetyViolation};
pub use store::{
    memory::InMemoryStore, BlockListStore, CampaignStore, JobLedger, LeaseStore, LeadStore,
    StoreError,
};

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn campaign_orchestrator_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::orchestrator::PyOrchestrator>()?;
    Ok(())
}
