use thiserror::Error;

/// Failure fetching or parsing a catalog or manifest document.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} responded with status {status}")]
    Status { url: String, status: u16 },

    #[error("failed to parse document from {url}: {message}")]
    Parse { url: String, message: String },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Cache backend failure. Always recovered locally.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid semantic version '{input}': {reason}")]
pub struct VersionParseError {
    pub input: String,
    pub reason: String,
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Automation catalog unavailable: {0}")]
    CatalogUnavailable(#[source] FetchError),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("{id} not found")]
    NotFound { id: String },

    #[error("Error fetching solution {solution_id} boms: {source}")]
    SolutionResolution {
        solution_id: String,
        #[source]
        source: Box<CatalogError>,
    },

    #[error("Solution cycle detected at {solution_id}: {}", .path.join(" -> "))]
    CycleDetected {
        solution_id: String,
        path: Vec<String>,
    },

    #[error("Repository error: {message}")]
    Repository { message: String },

    #[error("Bundle generation failed: {message}")]
    Bundle { message: String },

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml_ng::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field} ({value}): {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

impl CatalogError {
    /// `true` for failures worth retrying later, `false` when there is simply nothing to show.
    pub fn is_transient(&self) -> bool {
        match self {
            CatalogError::CatalogUnavailable(_) | CatalogError::Fetch(_) => true,
            CatalogError::SolutionResolution { source, .. } => source.is_transient(),
            CatalogError::IoError(_) | CatalogError::Repository { .. } => true,
            _ => false,
        }
    }

    /// 給使用者的處理建議
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            CatalogError::CatalogUnavailable(_) | CatalogError::Fetch(_) => {
                "Check network connectivity and the configured catalog URLs, then retry"
            }
            CatalogError::NotFound { .. } => "Run the services command to list known ids",
            CatalogError::SolutionResolution { .. } => {
                "Check that the solution manifest is reachable and valid YAML"
            }
            CatalogError::CycleDetected { .. } => "Remove the circular reference from the solution stack",
            CatalogError::ConfigError { .. }
            | CatalogError::InvalidConfigValueError { .. }
            | CatalogError::MissingConfigError { .. } => "Review the configuration file and environment",
            _ => "Re-run with --verbose for details",
        }
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            CatalogError::NotFound { .. } => 4,
            CatalogError::ConfigError { .. }
            | CatalogError::InvalidConfigValueError { .. }
            | CatalogError::MissingConfigError { .. }
            | CatalogError::ValidationError { .. } => 2,
            _ if self.is_transient() => 3,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
