//! Type conversion utilities for the FFI boundary

use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::orchestrator::TickResult;

/// Convert a [`TickResult`] into a Python dict
pub fn tick_result_to_py(py: Python<'_>, result: &TickResult) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("run_id", result.run_id.map(|id| id.to_string()))?;
    dict.set_item("leads_processed", result.leads_processed)?;
    dict.set_item("jobs_created", result.jobs_created)?;
    dict.set_item("attempts_succeeded", result.attempts_succeeded)?;
    dict.set_item("attempts_failed", result.attempts_failed)?;
    dict.set_item("skipped_dnc", result.skipped_dnc)?;
    dict.set_item("skipped_unsubscribed", result.skipped_unsubscribed)?;
    dict.set_item("skipped_suppressed", result.skipped_suppressed)?;
    dict.set_item("skipped_quota", result.skipped_quota)?;
    dict.set_item("skipped_idempotent", result.skipped_idempotent)?;
    dict.set_item("halted_by_safety", result.halted_by_safety.clone())?;
    dict.set_item("errors", result.errors.clone())?;
    Ok(dict.into())
}
