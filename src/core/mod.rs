pub mod catalog_store;
pub mod engine;
pub mod exporter;
pub mod manifest;
pub mod service_indexer;
pub mod solution_resolver;
pub mod sync;
pub mod sync_scheduler;
pub mod tasks;
pub mod version;

pub use crate::domain::model::{
    ArchitectureRecord, BomRecord, BundleFormat, BundleHandle, BundleOptions, Catalog,
    CatalogEntry, EntryKind, EntryVersion, Environment, ManifestMetadata, ModuleDescriptor,
    ModuleVersion, ServiceStatus, ServiceSummary, SolutionRecord, StackItem, SyncReport,
};
pub use crate::domain::ports::{
    BundleBuilder, CacheService, CatalogLoader, CatalogSync, Clock, ManifestFetcher, Record,
    Repository, Storage, SystemClock,
};
pub use crate::utils::error::Result;
