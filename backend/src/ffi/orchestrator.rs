//! PyO3 wrapper for the orchestrator
//!
//! # Example (from Python)
//!
//! ```python
//! import json
//! from campaign_orchestrator._core import Orchestrator
//!
//! scenario = {
//!     "campaign": {
//!         "status": "Running",
//!         "allowed_channels": ["Email"],
//!         "daily_send_limit": 100,
//!     },
//!     "leads": [{"email": "ada@example.com", "routing_sequence": "intro"}],
//!     "sequences": {
//!         "intro": [{"message_id": "msg_1", "channel": "Email", "delay_secs": 86400}]
//!     },
//! }
//!
//! orch = Orchestrator.from_scenario(json.dumps(scenario))
//! result = orch.tick()
//! print(result["attempts_succeeded"])
//! ```

use chrono::{DateTime, Utc};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::sync::Arc;
use uuid::Uuid;

use super::types::tick_result_to_py;
use crate::audit::InMemoryAuditLog;
use crate::dispatch::EchoRenderer;
use crate::orchestrator::{
    Collaborators, Orchestrator as RustOrchestrator, OrchestratorConfig, Stores,
    DEFAULT_BATCH_SIZE,
};
use crate::scenario::Scenario;
use crate::store::memory::InMemoryStore;

/// Python wrapper for the Rust orchestrator (proof mode)
#[pyclass(name = "Orchestrator")]
pub struct PyOrchestrator {
    inner: RustOrchestrator,
    campaign_id: Uuid,
}

#[pymethods]
impl PyOrchestrator {
    /// Build a proof-mode orchestrator from a scenario JSON string
    ///
    /// Raises ValueError when the scenario fails to parse or references an
    /// unknown sequence.
    #[staticmethod]
    fn from_scenario(scenario_json: &str) -> PyResult<Self> {
        let now = Utc::now();
        let scenario = Scenario::from_json(scenario_json)
            .map_err(|e| PyValueError::new_err(format!("invalid scenario: {}", e)))?;
        let (store, resolver, campaign_id) = scenario
            .seed(now)
            .map_err(|e| PyValueError::new_err(format!("scenario seeding failed: {}", e)))?;

        let store = Arc::new(store);
        let inner = RustOrchestrator::new(
            OrchestratorConfig::proof("ffi-worker"),
            Stores {
                campaigns: store.clone(),
                leads: store.clone(),
                ledger: store.clone(),
                leases: store.clone(),
                block_lists: store,
            },
            Collaborators {
                resolver: Arc::new(resolver),
                renderer: Arc::new(EchoRenderer),
                adapter: None,
                audit: Arc::new(InMemoryAuditLog::new()),
            },
        )
        .map_err(|e| PyValueError::new_err(format!("invalid configuration: {}", e)))?;

        Ok(PyOrchestrator { inner, campaign_id })
    }

    /// Execute one tick
    ///
    /// # Arguments
    ///
    /// * `at` - RFC 3339 timestamp to run the tick at (defaults to now)
    /// * `batch_size` - maximum leads per tick (defaults to 25)
    #[pyo3(signature = (at=None, batch_size=None))]
    fn tick(
        &self,
        py: Python<'_>,
        at: Option<&str>,
        batch_size: Option<usize>,
    ) -> PyResult<Py<PyDict>> {
        let now: DateTime<Utc> = match at {
            Some(s) => s
                .parse()
                .map_err(|e| PyValueError::new_err(format!("invalid timestamp: {}", e)))?,
            None => Utc::now(),
        };
        let result = self
            .inner
            .tick(
                self.campaign_id,
                now,
                batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            )
            .map_err(|e| PyRuntimeError::new_err(format!("tick failed: {}", e)))?;
        tick_result_to_py(py, &result)
    }

    /// The scenario's campaign id
    fn campaign_id(&self) -> String {
        self.campaign_id.to_string()
    }
}
