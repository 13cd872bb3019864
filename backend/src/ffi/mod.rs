//! Python FFI boundary
//!
//! The admin and analytics side of the product is a Python application; this
//! module lets it embed the orchestrator directly instead of shelling out to
//! the CLI. The boundary is deliberately minimal: scenarios come in as JSON
//! strings, results go out as Python dicts.

pub mod orchestrator;
mod types;
