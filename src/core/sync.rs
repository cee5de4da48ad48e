//! Import of public solutions and reference architectures from the catalog
//! into the repositories. Each entry is replaced (delete, then create), so a
//! run is idempotent and one broken manifest never stops the rest.

use crate::core::catalog_store::CatalogStore;
use crate::core::manifest::{parse_bom_yaml, parse_solution_yaml};
use crate::core::{
    ArchitectureRecord, BomRecord, CatalogEntry, CatalogSync, EntryKind, ManifestFetcher, Record,
    Repository, SolutionRecord, Storage, SyncReport,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

async fn sync_entries<'a, I, F, Fut>(kind: &str, entries: I, import: F) -> SyncReport
where
    I: Iterator<Item = &'a CatalogEntry>,
    F: Fn(&'a str) -> Fut,
    Fut: std::future::Future<Output = Result<String>>,
{
    let mut report = SyncReport::default();

    for entry in entries {
        let Some(url) = entry.metadata_url() else {
            tracing::debug!("{} {} has no metadataUrl, skipping", kind, entry.name);
            continue;
        };
        match import(url).await {
            Ok(id) => {
                tracing::debug!("Imported public {} -> {}", kind, id);
                report.imported += 1;
            }
            Err(e) => {
                tracing::warn!("⚠️ Failed to import {} {}: {}", kind, entry.name, e);
                report.failed += 1;
            }
        }
    }

    report
}

pub struct PublicSolutionSync<S: Storage> {
    store: Arc<CatalogStore<S>>,
    fetcher: Arc<dyn ManifestFetcher>,
    solutions: Arc<dyn Repository<SolutionRecord>>,
}

impl<S: Storage> PublicSolutionSync<S> {
    pub fn new(
        store: Arc<CatalogStore<S>>,
        fetcher: Arc<dyn ManifestFetcher>,
        solutions: Arc<dyn Repository<SolutionRecord>>,
    ) -> Self {
        Self {
            store,
            fetcher,
            solutions,
        }
    }

    async fn import(&self, url: &str) -> Result<String> {
        let text = self.fetcher.fetch_text(url).await?;
        let solution = parse_solution_yaml(&text, true)?;

        self.solutions.delete_by_id(&solution.id).await?;
        let created = self.solutions.create(solution).await?;
        Ok(created.id)
    }
}

#[async_trait]
impl<S: Storage> CatalogSync for PublicSolutionSync<S> {
    fn name(&self) -> &'static str {
        "public solution sync"
    }

    async fn sync(&self) -> Result<SyncReport> {
        let catalog = self.store.get_catalog().await?;
        let report = sync_entries(
            "solution",
            catalog.entries_of(EntryKind::Solution),
            |url| self.import(url),
        )
        .await;

        tracing::info!(
            "Public solutions synchronized: {} imported, {} failed",
            report.imported,
            report.failed
        );
        Ok(report)
    }
}

pub struct PublicBomSync<S: Storage> {
    store: Arc<CatalogStore<S>>,
    fetcher: Arc<dyn ManifestFetcher>,
    architectures: Arc<dyn Repository<ArchitectureRecord>>,
    boms: Arc<dyn Repository<BomRecord>>,
}

impl<S: Storage> PublicBomSync<S> {
    pub fn new(
        store: Arc<CatalogStore<S>>,
        fetcher: Arc<dyn ManifestFetcher>,
        architectures: Arc<dyn Repository<ArchitectureRecord>>,
        boms: Arc<dyn Repository<BomRecord>>,
    ) -> Self {
        Self {
            store,
            fetcher,
            architectures,
            boms,
        }
    }

    async fn import(&self, url: &str) -> Result<String> {
        let text = self.fetcher.fetch_text(url).await?;
        let (architecture, modules) = parse_bom_yaml(&text, true)?;
        let arch_id = architecture.arch_id.clone();

        self.architectures.delete_by_id(&arch_id).await?;
        for existing in self.boms.list().await? {
            if existing.arch_id == arch_id {
                self.boms.delete_by_id(&existing.record_id()).await?;
            }
        }

        self.architectures.create(architecture).await?;
        for module in modules {
            self.boms.create(module).await?;
        }
        Ok(arch_id)
    }
}

#[async_trait]
impl<S: Storage> CatalogSync for PublicBomSync<S> {
    fn name(&self) -> &'static str {
        "public bom sync"
    }

    async fn sync(&self) -> Result<SyncReport> {
        let catalog = self.store.get_catalog().await?;
        let report =
            sync_entries("bom", catalog.entries_of(EntryKind::Bom), |url| self.import(url)).await;

        tracing::info!(
            "Public BOMs synchronized: {} imported, {} failed",
            report.imported,
            report.failed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::repository::InMemoryRepository;
    use crate::adapters::storage::MemoryStorage;
    use crate::core::{Catalog, CatalogLoader, EntryVersion};
    use crate::utils::error::FetchError;
    use std::collections::HashMap;

    struct FixedLoader(Catalog);

    #[async_trait]
    impl CatalogLoader for FixedLoader {
        async fn load_catalog(&self, _urls: &[String]) -> std::result::Result<Catalog, FetchError> {
            Ok(self.0.clone())
        }
    }

    struct MapFetcher(HashMap<String, String>);

    #[async_trait]
    impl ManifestFetcher for MapFetcher {
        async fn fetch_text(&self, url: &str) -> std::result::Result<String, FetchError> {
            self.0.get(url).cloned().ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        }
    }

    fn entry(name: &str, kind: EntryKind) -> CatalogEntry {
        CatalogEntry {
            name: name.to_string(),
            kind,
            display_name: None,
            description: None,
            category: None,
            versions: vec![EntryVersion {
                version: "v1.0.0".to_string(),
                metadata_url: Some(format!("http://manifests/{}.yaml", name)),
            }],
        }
    }

    fn store(entries: Vec<CatalogEntry>) -> Arc<CatalogStore<MemoryStorage>> {
        let catalog = Catalog {
            boms: entries,
            ..Default::default()
        };
        Arc::new(CatalogStore::new(
            Arc::new(FixedLoader(catalog)),
            MemoryStorage::new(),
            vec!["http://catalog".to_string()],
        ))
    }

    fn manifests(documents: &[(&str, &str)]) -> Arc<MapFetcher> {
        Arc::new(MapFetcher(
            documents
                .iter()
                .map(|(name, body)| (format!("http://manifests/{}.yaml", name), body.to_string()))
                .collect(),
        ))
    }

    const SOLUTION: &str =
        "kind: Solution\nmetadata:\n  name: sol1\nspec:\n  stack:\n    - name: bom1\n";
    const BOM: &str = "kind: BillOfMaterial\nmetadata:\n  name: bom1\nspec:\n  modules:\n    - name: ibm-vpc\n    - name: ibm-vpc-subnets\n";

    #[tokio::test]
    async fn test_solution_sync_replaces_existing_records() {
        let solutions = Arc::new(InMemoryRepository::<SolutionRecord>::new());
        let sync = PublicSolutionSync::new(
            store(vec![
                entry("sol1", EntryKind::Solution),
                entry("broken", EntryKind::Solution),
                entry("bom1", EntryKind::Bom),
            ]),
            manifests(&[("sol1", SOLUTION), ("bom1", BOM)]),
            solutions.clone(),
        );

        let first = sync.sync().await.unwrap();
        let second = sync.sync().await.unwrap();

        assert_eq!(first, SyncReport { imported: 1, failed: 1 });
        assert_eq!(second, first);
        assert_eq!(solutions.count().await, 1);
        let stored = solutions.find_by_id("sol1").await.unwrap().unwrap();
        assert_eq!(stored.short_desc, "sol1 Solution.");
        assert!(stored.public);
    }

    #[tokio::test]
    async fn test_bom_sync_imports_architectures_and_modules() {
        let architectures = Arc::new(InMemoryRepository::<ArchitectureRecord>::new());
        let boms = Arc::new(InMemoryRepository::<BomRecord>::new());
        let sync = PublicBomSync::new(
            store(vec![entry("sol1", EntryKind::Solution), entry("bom1", EntryKind::Bom)]),
            manifests(&[("sol1", SOLUTION), ("bom1", BOM)]),
            architectures.clone(),
            boms.clone(),
        );

        sync.sync().await.unwrap();
        let report = sync.sync().await.unwrap();

        assert_eq!(report, SyncReport { imported: 1, failed: 0 });
        assert_eq!(architectures.count().await, 1);
        let modules: Vec<String> = boms
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|bom| bom.service_id)
            .collect();
        assert_eq!(modules, vec!["ibm-vpc", "ibm-vpc-subnets"]);
    }

    #[tokio::test]
    async fn test_invalid_manifest_is_counted_as_failure() {
        let architectures = Arc::new(InMemoryRepository::<ArchitectureRecord>::new());
        let boms = Arc::new(InMemoryRepository::<BomRecord>::new());
        let sync = PublicBomSync::new(
            store(vec![entry("bom1", EntryKind::Bom)]),
            manifests(&[("bom1", SOLUTION)]),
            architectures.clone(),
            boms,
        );

        let report = sync.sync().await.unwrap();
        assert_eq!(report, SyncReport { imported: 0, failed: 1 });
        assert_eq!(architectures.count().await, 0);
    }

    #[tokio::test]
    async fn test_rejected_bom_leaves_no_partial_records() {
        const REPEATED: &str = "kind: BillOfMaterial\nmetadata:\n  name: bom1\nspec:\n  modules:\n    - name: ibm-vpc\n    - name: ibm-vpc-subnets\n    - name: ibm-vpc-subnets\n";
        let architectures = Arc::new(InMemoryRepository::<ArchitectureRecord>::new());
        let boms = Arc::new(InMemoryRepository::<BomRecord>::new());
        let sync = PublicBomSync::new(
            store(vec![entry("bom1", EntryKind::Bom)]),
            manifests(&[("bom1", REPEATED)]),
            architectures.clone(),
            boms.clone(),
        );

        let report = sync.sync().await.unwrap();

        assert_eq!(report, SyncReport { imported: 0, failed: 1 });
        assert_eq!(architectures.count().await, 0);
        assert_eq!(boms.count().await, 0);
    }
}
