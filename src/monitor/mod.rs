pub mod commands;
pub mod lifecycle;
pub mod registry;
pub mod store;
pub mod token;

#[cfg(test)]
pub(crate) mod testing;

pub use commands::{Actor, CommandHandler, Reply};
pub use lifecycle::{EngineError, LifecycleEngine, ResumeOutcome, StopOutcome};
pub use registry::{MonitorEntry, MonitorRegistry};
pub use store::{MonitorStore, PersistedMonitorRecord, StoreError};
