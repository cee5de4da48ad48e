use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The merged automation catalog: every module and every BOM/solution entry
/// from the configured catalog sources, in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default)]
    pub modules: Vec<ModuleDescriptor>,
    #[serde(default)]
    pub boms: Vec<CatalogEntry>,
    #[serde(default)]
    pub aliases: Vec<ModuleAlias>,
}

impl Catalog {
    /// 依名稱查找 BOM/solution 條目（第一個符合者）
    pub fn entry(&self, name: &str) -> Option<&CatalogEntry> {
        self.boms.iter().find(|entry| entry.name == name)
    }

    pub fn solution(&self, name: &str) -> Option<&CatalogEntry> {
        self.boms
            .iter()
            .find(|entry| entry.name == name && entry.kind == EntryKind::Solution)
    }

    pub fn entries_of(&self, kind: EntryKind) -> impl Iterator<Item = &CatalogEntry> {
        self.boms.iter().filter(move |entry| entry.kind == kind)
    }

    /// Appends another source document, keeping source order.
    pub fn merge(&mut self, other: CatalogDocument) {
        self.modules.extend(other.modules);
        for category in other.categories {
            self.modules
                .extend(category.modules.into_iter().map(|mut module| {
                    if module.category.is_empty() {
                        module.category = category.category.clone();
                    }
                    module
                }));
        }
        self.boms.extend(other.boms);
        self.aliases.extend(other.aliases);
    }
}

/// One catalog source document as published at a catalog URL.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogDocument {
    #[serde(default)]
    pub modules: Vec<ModuleDescriptor>,
    #[serde(default)]
    pub categories: Vec<CatalogCategory>,
    #[serde(default)]
    pub boms: Vec<CatalogEntry>,
    #[serde(default)]
    pub aliases: Vec<ModuleAlias>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogCategory {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub modules: Vec<ModuleDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleAlias {
    pub id: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDescriptor {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub alias_ids: Vec<String>,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    #[serde(default)]
    pub versions: Vec<ModuleVersion>,
}

impl ModuleDescriptor {
    pub fn version_strings(&self) -> Vec<String> {
        self.versions
            .iter()
            .map(|v| v.version().to_string())
            .collect()
    }
}

/// Catalog sources list versions either as bare strings or as `{version: ...}` objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModuleVersion {
    Plain(String),
    Detailed { version: String },
}

impl ModuleVersion {
    pub fn version(&self) -> &str {
        match self {
            ModuleVersion::Plain(version) => version,
            ModuleVersion::Detailed { version } => version,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Bom,
    Solution,
    #[serde(other)]
    Other,
}

/// A named, versioned BOM or solution manifest listed in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub name: String,
    #[serde(rename = "type", default = "default_entry_kind")]
    pub kind: EntryKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub versions: Vec<EntryVersion>,
}

fn default_entry_kind() -> EntryKind {
    EntryKind::Bom
}

impl CatalogEntry {
    /// The manifest location of the first listed version.
    pub fn metadata_url(&self) -> Option<&str> {
        self.versions
            .first()
            .and_then(|version| version.metadata_url.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryVersion {
    #[serde(default)]
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Pending,
    Beta,
    Released,
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ServiceStatus::Pending => "pending",
            ServiceStatus::Beta => "beta",
            ServiceStatus::Released => "released",
        };
        f.write_str(label)
    }
}

/// A catalog module enriched with its lifecycle status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummary {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default)]
    pub alias_ids: Vec<String>,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub platforms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    pub versions: Vec<String>,
    pub status: ServiceStatus,
}

/// Kubernetes-style manifest header shared by BOM and solution documents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Persisted public solution, imported from a solution manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionRecord {
    pub id: String,
    pub name: String,
    pub short_desc: String,
    pub long_desc: String,
    pub public: bool,
    pub techzone: bool,
    pub platform: Option<String>,
    pub yaml: String,
}

/// Persisted reference architecture, imported from a BOM manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureRecord {
    pub arch_id: String,
    pub name: String,
    pub short_desc: String,
    pub long_desc: String,
    pub public: bool,
    pub platform: Option<String>,
    pub yaml: String,
}

/// One module of a reference architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BomRecord {
    pub arch_id: String,
    pub service_id: String,
    pub desc: String,
    pub yaml: String,
}

/// Deployment environment. Background sync only runs outside dev and test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Production,
    Staging,
    Dev,
    Test,
}

impl Environment {
    pub fn runs_background_sync(&self) -> bool {
        !matches!(self, Environment::Dev | Environment::Test)
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "staging" => Ok(Environment::Staging),
            "dev" | "development" => Ok(Environment::Dev),
            "test" => Ok(Environment::Test),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Dev => "dev",
            Environment::Test => "test",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub imported: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BundleFormat {
    #[default]
    Zip,
}

#[derive(Debug, Clone, Default)]
pub struct BundleOptions {
    pub flatten: bool,
    pub base_path: Option<String>,
}

/// Opaque result of the bundle builder, handed back to it for writing.
#[derive(Debug, Clone)]
pub struct BundleHandle {
    pub name: String,
    pub files: Vec<(String, Vec<u8>)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_document_merges_categories() {
        let yaml = r#"
categories:
  - category: network
    modules:
      - id: github.com/org/terraform-vpc
        name: vpc
        versions:
          - version: v1.2.0
          - v1.1.0
boms:
  - name: sol1
    type: solution
    versions:
      - version: v1.0.0
        metadataUrl: http://example.com/sol1.yaml
  - name: bom1
    versions: []
"#;
        let document: CatalogDocument = serde_yaml_ng::from_str(yaml).unwrap();
        let mut catalog = Catalog::default();
        catalog.merge(document);

        assert_eq!(catalog.modules.len(), 1);
        assert_eq!(catalog.modules[0].category, "network");
        assert_eq!(catalog.modules[0].version_strings(), vec!["v1.2.0", "v1.1.0"]);
        assert_eq!(catalog.entry("bom1").unwrap().kind, EntryKind::Bom);
        assert_eq!(
            catalog.solution("sol1").unwrap().metadata_url(),
            Some("http://example.com/sol1.yaml")
        );
        assert!(catalog.solution("bom1").is_none());
    }

    #[test]
    fn test_unknown_entry_type_is_other() {
        let entry: CatalogEntry =
            serde_json::from_value(serde_json::json!({"name": "x", "type": "pattern"})).unwrap();
        assert_eq!(entry.kind, EntryKind::Other);
        assert_eq!(entry.metadata_url(), None);
    }

    #[test]
    fn test_environment_gates_background_sync() {
        assert!("production".parse::<Environment>().unwrap().runs_background_sync());
        assert!("staging".parse::<Environment>().unwrap().runs_background_sync());
        assert!(!"dev".parse::<Environment>().unwrap().runs_background_sync());
        assert!(!"TEST".parse::<Environment>().unwrap().runs_background_sync());
        assert!("qa".parse::<Environment>().is_err());
    }
}
