//! Semantic-version parsing and lifecycle classification of catalog modules.

use crate::domain::model::ServiceStatus;
use crate::utils::error::VersionParseError;
use regex::Regex;
use std::cmp::Ordering;
use std::sync::OnceLock;

const PENDING_VERSION: &str = "v0.0.0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemVer {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub raw: String,
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^v?([^.]+)\.([^.]+)\.([^.\-+]+)(?:[-+].*)?$").expect("valid version regex")
    })
}

/// 解析 `v1.2.3` 或 `1.2.3`，允許 `-beta.1` 之類的後綴
pub fn parse_semver(input: &str) -> Result<SemVer, VersionParseError> {
    let trimmed = input.trim();
    let captures = version_pattern()
        .captures(trimmed)
        .ok_or_else(|| VersionParseError {
            input: input.to_string(),
            reason: "expected major.minor.patch".to_string(),
        })?;

    let segment = |index: usize, label: &str| -> Result<u64, VersionParseError> {
        captures[index].parse::<u64>().map_err(|_| VersionParseError {
            input: input.to_string(),
            reason: format!("{} segment '{}' is not numeric", label, &captures[index]),
        })
    };

    Ok(SemVer {
        major: segment(1, "major")?,
        minor: segment(2, "minor")?,
        patch: segment(3, "patch")?,
        raw: trimmed.to_string(),
    })
}

/// Highest version first; equal triples fall back to the original string.
pub fn compare_descending(a: &SemVer, b: &SemVer) -> Ordering {
    (b.major, b.minor, b.patch)
        .cmp(&(a.major, a.minor, a.patch))
        .then_with(|| a.raw.cmp(&b.raw))
}

pub fn is_pending(versions: &[String]) -> bool {
    versions.is_empty() || (versions.len() == 1 && versions[0] == PENDING_VERSION)
}

/// Highest parseable version has major 0. Unparseable entries are ignored.
pub fn is_beta(versions: &[String]) -> bool {
    if is_pending(versions) {
        return false;
    }

    let mut parsed: Vec<SemVer> = versions
        .iter()
        .filter_map(|version| match parse_semver(version) {
            Ok(semver) => Some(semver),
            Err(e) => {
                tracing::debug!("Ignoring version while classifying: {}", e);
                None
            }
        })
        .collect();
    parsed.sort_by(compare_descending);

    parsed.first().is_some_and(|latest| latest.major == 0)
}

/// Pending, then beta, then released. First match wins.
pub fn classify(versions: &[String]) -> ServiceStatus {
    if is_pending(versions) {
        ServiceStatus::Pending
    } else if is_beta(versions) {
        ServiceStatus::Beta
    } else {
        ServiceStatus::Released
    }
}
