use crate::domain::model::{
    BundleFormat, BundleHandle, BundleOptions, Catalog, CatalogEntry, EntryKind,
};
use crate::domain::ports::{BundleBuilder, ManifestFetcher};
use crate::utils::error::{CatalogError, Result};
use async_trait::async_trait;
use std::io::Write;
use std::sync::Arc;
use zip::write::{FileOptions, ZipWriter};

/// Packs the manifests of the selected catalog entries into an archive.
pub struct ManifestBundleBuilder {
    fetcher: Arc<dyn ManifestFetcher>,
}

impl ManifestBundleBuilder {
    pub fn new(fetcher: Arc<dyn ManifestFetcher>) -> Self {
        Self { fetcher }
    }

    fn readme(entries: &[CatalogEntry]) -> String {
        let mut lines = vec![
            "# Automation bundle".to_string(),
            String::new(),
            "| ID | Type | Version | Description |".to_string(),
            "| -- | ---- | ------- | ----------- |".to_string(),
        ];
        for entry in entries {
            let kind = match entry.kind {
                EntryKind::Solution => "solution",
                EntryKind::Bom => "bom",
                EntryKind::Other => "other",
            };
            let version = entry
                .versions
                .first()
                .map(|v| v.version.as_str())
                .unwrap_or("-");
            lines.push(format!(
                "| {} | {} | {} | {} |",
                entry.name,
                kind,
                version,
                entry.description.as_deref().unwrap_or("")
            ));
        }
        lines.join("\n")
    }
}

#[async_trait]
impl BundleBuilder for ManifestBundleBuilder {
    async fn build_bundle(&self, _catalog: &Catalog, entries: &[CatalogEntry]) -> Result<BundleHandle> {
        let mut files = Vec::with_capacity(entries.len() + 1);

        for entry in entries {
            let Some(url) = entry.metadata_url() else {
                tracing::warn!("{} has no metadataUrl, skipping", entry.name);
                continue;
            };
            let manifest = self.fetcher.fetch_text(url).await?;
            files.push((format!("{}/bom.yaml", entry.name), manifest.into_bytes()));
        }
        files.push(("README.md".to_string(), Self::readme(entries).into_bytes()));

        let name = entries
            .first()
            .map(|entry| entry.name.clone())
            .unwrap_or_else(|| "bundle".to_string());
        Ok(BundleHandle { name, files })
    }

    async fn write_bundle(
        &self,
        handle: &BundleHandle,
        format: BundleFormat,
        options: &BundleOptions,
    ) -> Result<Vec<u8>> {
        match format {
            BundleFormat::Zip => Self::write_zip(handle, options),
        }
    }
}

impl ManifestBundleBuilder {
    fn write_zip(handle: &BundleHandle, options: &BundleOptions) -> Result<Vec<u8>> {
        tracing::debug!("Creating ZIP file with {} files", handle.files.len());

        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (path, data) in &handle.files {
            let mut archive_path = if options.flatten {
                path.replace("/bom.yaml", ".yaml")
            } else {
                path.clone()
            };
            if let Some(base) = options.base_path.as_deref().filter(|b| !b.is_empty()) {
                archive_path = format!("{}/{}", base.trim_end_matches('/'), archive_path);
            }

            zip.start_file::<_, ()>(archive_path, FileOptions::default())?;
            zip.write_all(data)?;
        }

        let cursor = zip.finish()?;
        let bytes = cursor.into_inner();
        if bytes.is_empty() {
            return Err(CatalogError::Bundle {
                message: format!("empty archive for {}", handle.name),
            });
        }
        Ok(bytes)
    }
}
