//! Background job processing

mod orchestrator;

pub use orchestrator::JobOrchestrator;
