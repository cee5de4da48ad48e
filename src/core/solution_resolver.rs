use crate::core::catalog_store::CatalogStore;
use crate::core::{Catalog, EntryKind, ManifestFetcher, StackItem, Storage};
use crate::utils::error::{CatalogError, Result};
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type ResolveFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<String>>> + Send + 'a>>;

#[derive(Debug, Default, Deserialize)]
struct StackManifest {
    #[serde(default)]
    spec: Option<StackSpec>,
}

#[derive(Debug, Default, Deserialize)]
struct StackSpec {
    #[serde(default)]
    stack: Vec<StackItem>,
}

/// Flattens solutions into the BOM ids they are built from.
pub struct SolutionResolver<S: Storage> {
    store: Arc<CatalogStore<S>>,
    fetcher: Arc<dyn ManifestFetcher>,
}

impl<S: Storage> SolutionResolver<S> {
    pub fn new(store: Arc<CatalogStore<S>>, fetcher: Arc<dyn ManifestFetcher>) -> Self {
        Self { store, fetcher }
    }

    /// Depth-first, in stack order, without deduplication. Unknown solutions resolve to nothing.
    pub async fn resolve_solution_boms(&self, solution_id: &str) -> Result<Vec<String>> {
        let catalog = self.store.get_catalog().await?;
        let mut path = Vec::new();
        self.expand(&catalog, solution_id.to_string(), &mut path)
            .await
    }

    /// Architecture ids for a new solution: explicit ids plus the resolved solution, deduplicated and sorted.
    pub async fn plan_architectures(
        &self,
        solution_id: Option<&str>,
        explicit: &[String],
    ) -> Result<Vec<String>> {
        let mut arch_ids = explicit.to_vec();
        if let Some(solution_id) = solution_id {
            arch_ids.extend(self.resolve_solution_boms(solution_id).await?);
        }
        arch_ids.sort();
        arch_ids.dedup();
        Ok(arch_ids)
    }

    fn expand<'a>(
        &'a self,
        catalog: &'a Catalog,
        solution_id: String,
        path: &'a mut Vec<String>,
    ) -> ResolveFuture<'a> {
        Box::pin(async move {
            if path.contains(&solution_id) {
                let mut cycle = path.clone();
                cycle.push(solution_id.clone());
                tracing::error!("❌ Solution cycle: {}", cycle.join(" -> "));
                return Err(CatalogError::CycleDetected {
                    solution_id,
                    path: cycle,
                });
            }

            let Some(url) = catalog
                .solution(&solution_id)
                .and_then(|entry| entry.metadata_url())
            else {
                tracing::debug!("{} is not a known solution", solution_id);
                return Ok(Vec::new());
            };

            let stack = self.fetch_stack(&solution_id, url).await?;

            path.push(solution_id);
            let mut boms = Vec::new();
            for item in stack {
                match catalog.entry(&item.name) {
                    Some(entry) if entry.kind == EntryKind::Solution => {
                        let nested = self.expand(catalog, item.name, &mut *path).await?;
                        boms.extend(nested);
                    }
                    _ => boms.push(item.name),
                }
            }
            path.pop();

            Ok(boms)
        })
    }

    async fn fetch_stack(&self, solution_id: &str, url: &str) -> Result<Vec<StackItem>> {
        let wrap = |source: CatalogError| CatalogError::SolutionResolution {
            solution_id: solution_id.to_string(),
            source: Box::new(source),
        };

        let text = self
            .fetcher
            .fetch_text(url)
            .await
            .map_err(|e| wrap(e.into()))?;
        let manifest: StackManifest = serde_yaml_ng::from_str(&text).map_err(|e| wrap(e.into()))?;

        Ok(manifest.spec.map(|spec| spec.stack).unwrap_or_default())
    }
}
