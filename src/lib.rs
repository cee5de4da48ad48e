pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::storage::LocalStorage;
pub use config::EngineConfig;
pub use core::engine::{CatalogEngine, EngineParts};
pub use core::sync_scheduler::SyncDecision;
pub use utils::error::{CatalogError, Result};
