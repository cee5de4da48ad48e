//! Converts BOM and solution manifests into the records persisted for public content.

use crate::core::{ArchitectureRecord, BomRecord, ManifestMetadata, SolutionRecord};
use crate::utils::error::{CatalogError, Result};
use regex::Regex;
use serde_yaml_ng::Value;
use std::sync::OnceLock;

const SOLUTION_KIND: &str = "Solution";

fn catalog_url_key() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^catalog[Uu](rl|RL)").expect("valid catalog url pattern"))
}

fn load(yaml: &str, what: &str) -> Result<(Value, ManifestMetadata)> {
    let value: Value = serde_yaml_ng::from_str(yaml).map_err(|e| CatalogError::ValidationError {
        message: format!("Failed to load {} yaml: {}", what, e),
    })?;
    let metadata = match value.get("metadata") {
        Some(metadata) => serde_yaml_ng::from_value::<ManifestMetadata>(metadata.clone())?,
        None => {
            return Err(CatalogError::ValidationError {
                message: format!("{} yaml has no metadata", what),
            })
        }
    };
    Ok((value, metadata))
}

/// Just the `metadata` block of any manifest.
pub fn parse_metadata(yaml: &str) -> Result<ManifestMetadata> {
    load(yaml, "manifest").map(|(_, metadata)| metadata)
}

fn is_solution(value: &Value) -> bool {
    value.get("kind").and_then(Value::as_str) == Some(SOLUTION_KIND)
}

fn without_spec_field(value: &Value, field: &str) -> Result<String> {
    let mut trimmed = value.clone();
    if let Some(spec) = trimmed.get_mut("spec").and_then(Value::as_mapping_mut) {
        spec.remove(field);
    }
    Ok(serde_yaml_ng::to_string(&trimmed)?)
}

/// BOM manifest → architecture plus one record per module.
pub fn parse_bom_yaml(yaml: &str, public: bool) -> Result<(ArchitectureRecord, Vec<BomRecord>)> {
    let (value, metadata) = load(yaml, "bom")?;
    if is_solution(&value) {
        return Err(CatalogError::ValidationError {
            message: "Must be a bom yaml, not a solution.".to_string(),
        });
    }

    let display_name = metadata
        .annotations
        .get("displayName")
        .cloned()
        .unwrap_or_else(|| metadata.name.clone());
    let name = match metadata.labels.get("code") {
        Some(code) => format!("{} - {}", code, display_name),
        None => display_name,
    };
    let description = metadata
        .annotations
        .get("description")
        .cloned()
        .unwrap_or_else(|| format!("{} Bill of Materials.", metadata.name));

    let arch = ArchitectureRecord {
        arch_id: metadata.name.clone(),
        name,
        short_desc: description.clone(),
        long_desc: description,
        public,
        platform: metadata.labels.get("platform").cloned(),
        yaml: without_spec_field(&value, "modules")?,
    };

    let modules = value
        .get("spec")
        .and_then(|spec| spec.get("modules"))
        .and_then(Value::as_sequence)
        .cloned()
        .unwrap_or_default();

    let mut boms = Vec::with_capacity(modules.len());
    for module in &modules {
        if module.is_string() {
            return Err(CatalogError::ValidationError {
                message: "BOM modules must not be of type string.".to_string(),
            });
        }
        let service_id = module
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| CatalogError::ValidationError {
                message: format!("{}: BOM module without a name", arch.arch_id),
            })?
            .to_string();
        let desc = module
            .get("alias")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| service_id.clone());

        if boms.iter().any(|bom: &BomRecord| bom.desc == desc) {
            return Err(CatalogError::ValidationError {
                message: format!(
                    "{}: module {} appears more than once; give each an alias",
                    arch.arch_id, desc
                ),
            });
        }

        boms.push(BomRecord {
            arch_id: arch.arch_id.clone(),
            service_id,
            desc,
            yaml: serde_yaml_ng::to_string(module)?,
        });
    }

    Ok((arch, boms))
}

pub fn parse_solution_yaml(yaml: &str, public: bool) -> Result<SolutionRecord> {
    let (value, metadata) = load(yaml, "solution")?;
    if !is_solution(&value) {
        return Err(CatalogError::ValidationError {
            message: "Must be a solution yaml, not a bom.".to_string(),
        });
    }

    let display_name = metadata
        .annotations
        .get("displayName")
        .cloned()
        .unwrap_or_else(|| metadata.name.clone());
    let description = metadata
        .annotations
        .get("description")
        .cloned()
        .unwrap_or_else(|| format!("{} Solution.", display_name));

    Ok(SolutionRecord {
        id: metadata.name.clone(),
        name: display_name,
        short_desc: description.clone(),
        long_desc: description,
        public,
        techzone: false,
        platform: metadata.labels.get("platform").cloned(),
        yaml: without_spec_field(&value, "stack")?,
    })
}

/// Catalog locations declared by manifests through `catalogUrl*` annotations, appended to `base_urls`.
pub fn catalog_urls_for(manifests: &[ManifestMetadata], base_urls: &[String]) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    let mut push = |url: &str| {
        let url = url.trim();
        if !url.is_empty() && !urls.iter().any(|existing| existing == url) {
            urls.push(url.to_string());
        }
    };

    base_urls.iter().for_each(|url| push(url));
    for metadata in manifests {
        for (key, value) in &metadata.annotations {
            if key == "catalogUrl" || key == "catalogURL" {
                value.split(',').for_each(&mut push);
            } else if catalog_url_key().is_match(key) {
                push(value);
            }
        }
    }

    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOM: &str = r#"
apiVersion: cloudnativetoolkit.dev/v1alpha1
kind: BillOfMaterial
metadata:
  name: 105-ibm-vpc-openshift
  labels:
    code: "105"
    platform: ibm
  annotations:
    displayName: IBM VPC OpenShift
spec:
  modules:
    - name: ibm-vpc
    - name: ibm-vpc-subnets
      alias: worker-subnets
      variables:
        - name: _count
          value: 3
"#;

    const SOLUTION: &str = r#"
apiVersion: cloudnativetoolkit.dev/v1alpha1
kind: Solution
metadata:
  name: turbonomic-ibm
  annotations:
    description: Turbonomic on IBM Cloud
    catalogUrl: https://a.example/index.yaml,https://b.example/index.yaml
    catalogUrl-extra: https://c.example/index.yaml
spec:
  version: v1.0.0
  stack:
    - name: 105-ibm-vpc-openshift
      layer: infrastructure
"#;

    #[test]
    fn test_parse_bom_yaml() {
        let (arch, boms) = parse_bom_yaml(BOM, true).unwrap();

        assert_eq!(arch.arch_id, "105-ibm-vpc-openshift");
        assert_eq!(arch.name, "105 - IBM VPC OpenShift");
        assert_eq!(arch.short_desc, "105-ibm-vpc-openshift Bill of Materials.");
        assert_eq!(arch.platform.as_deref(), Some("ibm"));
        assert!(arch.public);
        assert!(!arch.yaml.contains("ibm-vpc-subnets"));

        assert_eq!(boms.len(), 2);
        assert_eq!(boms[0].desc, "ibm-vpc");
        assert_eq!(boms[1].service_id, "ibm-vpc-subnets");
        assert_eq!(boms[1].desc, "worker-subnets");
        assert!(boms[1].yaml.contains("_count"));
    }

    #[test]
    fn test_string_modules_are_rejected() {
        let yaml = "kind: BillOfMaterial\nmetadata:\n  name: x\nspec:\n  modules:\n    - ibm-vpc\n";
        assert!(matches!(
            parse_bom_yaml(yaml, true),
            Err(CatalogError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_repeated_module_needs_alias() {
        let repeated = "kind: BillOfMaterial\nmetadata:\n  name: x\nspec:\n  modules:\n    - name: ibm-vpc-subnets\n    - name: ibm-vpc-subnets\n";
        assert!(matches!(
            parse_bom_yaml(repeated, true),
            Err(CatalogError::ValidationError { .. })
        ));

        let aliased = "kind: BillOfMaterial\nmetadata:\n  name: x\nspec:\n  modules:\n    - name: ibm-vpc-subnets\n    - name: ibm-vpc-subnets\n      alias: edge-subnets\n";
        let (_, boms) = parse_bom_yaml(aliased, true).unwrap();
        assert_eq!(boms.len(), 2);
    }

    #[test]
    fn test_parse_solution_yaml() {
        let solution = parse_solution_yaml(SOLUTION, true).unwrap();

        assert_eq!(solution.id, "turbonomic-ibm");
        assert_eq!(solution.name, "turbonomic-ibm");
        assert_eq!(solution.short_desc, "Turbonomic on IBM Cloud");
        assert!(!solution.techzone);
        assert!(!solution.yaml.contains("stack"));
        assert!(solution.yaml.contains("version: v1.0.0"));
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        assert!(parse_solution_yaml(BOM, true).is_err());
        assert!(parse_bom_yaml(SOLUTION, true).is_err());
    }

    #[test]
    fn test_catalog_urls_from_annotations() {
        let value: Value = serde_yaml_ng::from_str(SOLUTION).unwrap();
        let metadata: ManifestMetadata =
            serde_yaml_ng::from_value(value.get("metadata").unwrap().clone()).unwrap();

        let urls = catalog_urls_for(
            &[metadata],
            &["https://b.example/index.yaml".to_string()],
        );

        assert_eq!(
            urls,
            vec![
                "https://b.example/index.yaml",
                "https://a.example/index.yaml",
                "https://c.example/index.yaml",
            ]
        );
    }
}
