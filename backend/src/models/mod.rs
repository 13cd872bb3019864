//! Domain models: campaigns, leads, distribution jobs, orchestration runs
//! and block lists

pub mod campaign;
pub mod job;
pub mod lead;
pub mod run;
pub mod suppression;
