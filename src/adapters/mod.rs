// Adapters layer: concrete implementations of the domain ports (http, cache, storage, persistence, bundles).

pub mod bundle;
pub mod cache;
pub mod clock;
pub mod http;
pub mod repository;
pub mod storage;
