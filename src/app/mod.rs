mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod types;

#[cfg(test)]
mod tests;

pub use orchestrator::SignbuddyOrchestrator;
pub use types::{ComponentState, ShutdownReason};
