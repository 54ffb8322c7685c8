//! Error types for the a11ymatrix core.
//!
//! - [`ConfigError`]: invalid run configuration, fatal before any unit runs
//! - [`AdapterError`]: per-unit engine failure, classified for the retry policy
//! - [`NormalizationError`]: payload shape mismatch for one unit
//! - [`RunError`]: run-level failures surfaced by the run handle

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A configuration problem. Each variant names the offending field.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration field `{field}` must not be empty")]
    EmptyField { field: &'static str },

    #[error("field `viewports`: viewport `{name}` has non-positive dimensions {width}x{height}")]
    InvalidViewport { name: String, width: i64, height: i64 },

    #[error("field `adapters`: unknown adapter `{name}`")]
    UnknownAdapter { name: String },

    #[error("field `{field}`: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read configuration {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration {path:?}: {detail}")]
    Parse { path: PathBuf, detail: String },
}

impl ConfigError {
    /// Name of the configuration field this error refers to.
    pub fn field(&self) -> &str {
        match self {
            ConfigError::EmptyField { field } | ConfigError::InvalidValue { field, .. } => field,
            ConfigError::InvalidViewport { .. } => "viewports",
            ConfigError::UnknownAdapter { .. } => "adapters",
            ConfigError::Read { .. } | ConfigError::Parse { .. } => "file",
        }
    }
}

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    Transient,
    Permanent,
}

/// Failure reported by an adapter invocation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdapterError {
    #[error("network error: {0}")]
    Network(String),

    #[error("browser session crashed: {0}")]
    BrowserCrashed(String),

    #[error("engine process crashed: {0}")]
    ProcessCrashed(String),

    #[error("engine timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("target responded with HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("malformed URL `{0}`")]
    MalformedUrl(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("missing credential: environment variable `{0}` is not set")]
    MissingCredential(String),

    #[error("engine produced unusable output: {0}")]
    InvalidOutput(String),
}

impl AdapterError {
    /// Classify this failure for the retry policy.
    ///
    /// Connection problems, crashes, timeouts, HTTP 5xx and 429 are transient.
    /// Everything else, including HTTP 4xx, is permanent.
    pub fn class(&self) -> FailureClass {
        match self {
            AdapterError::Network(_)
            | AdapterError::BrowserCrashed(_)
            | AdapterError::ProcessCrashed(_)
            | AdapterError::Timeout { .. } => FailureClass::Transient,
            AdapterError::HttpStatus { status } if *status == 429 || *status >= 500 => {
                FailureClass::Transient
            }
            AdapterError::HttpStatus { .. }
            | AdapterError::MalformedUrl(_)
            | AdapterError::Unsupported(_)
            | AdapterError::MissingCredential(_)
            | AdapterError::InvalidOutput(_) => FailureClass::Permanent,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == FailureClass::Transient
    }

    /// Short machine-readable kind, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            AdapterError::Network(_) => "network",
            AdapterError::BrowserCrashed(_) => "browser_crashed",
            AdapterError::ProcessCrashed(_) => "process_crashed",
            AdapterError::Timeout { .. } => "timeout",
            AdapterError::HttpStatus { .. } => "http_status",
            AdapterError::MalformedUrl(_) => "malformed_url",
            AdapterError::Unsupported(_) => "unsupported",
            AdapterError::MissingCredential(_) => "missing_credential",
            AdapterError::InvalidOutput(_) => "invalid_output",
        }
    }
}

/// A raw payload did not match the shape its adapter is known to produce.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NormalizationError {
    #[error("{adapter} payload does not match the expected shape: {detail}")]
    ShapeMismatch { adapter: String, detail: String },

    #[error("{adapter} reported success without a payload")]
    Empty { adapter: String },
}

/// Run-level failures.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("invalid run configuration: {0}")]
    Configuration(#[from] ConfigError),

    #[error("run driver task failed: {0}")]
    Join(String),
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
pub type AdapterResult<T> = std::result::Result<T, AdapterError>;
pub type RunResult<T> = std::result::Result<T, RunError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_names_field() {
        let err = ConfigError::EmptyField { field: "urls" };
        assert!(err.to_string().contains("`urls`"));
        assert_eq!(err.field(), "urls");

        let err = ConfigError::InvalidViewport {
            name: "tiny".into(),
            width: 0,
            height: 600,
        };
        assert!(err.to_string().contains("tiny"));
        assert!(err.to_string().contains("0x600"));
        assert_eq!(err.field(), "viewports");

        let err = ConfigError::UnknownAdapter {
            name: "tenon".into(),
        };
        assert!(err.to_string().contains("tenon"));
        assert_eq!(err.field(), "adapters");
    }

    #[test]
    fn http_status_classification() {
        assert_eq!(
            AdapterError::HttpStatus { status: 404 }.class(),
            FailureClass::Permanent
        );
        assert_eq!(
            AdapterError::HttpStatus { status: 429 }.class(),
            FailureClass::Transient
        );
        assert_eq!(
            AdapterError::HttpStatus { status: 503 }.class(),
            FailureClass::Transient
        );
    }

    #[test]
    fn transient_and_permanent_kinds() {
        assert!(AdapterError::Network("reset".into()).is_transient());
        assert!(AdapterError::BrowserCrashed("gone".into()).is_transient());
        assert!(AdapterError::Timeout { elapsed_ms: 10 }.is_transient());
        assert!(!AdapterError::MalformedUrl("ht!tp".into()).is_transient());
        assert!(!AdapterError::Unsupported("frames".into()).is_transient());
        assert!(!AdapterError::MissingCredential("WAVE_API_KEY".into()).is_transient());
    }

    #[test]
    fn normalization_error_display() {
        let err = NormalizationError::ShapeMismatch {
            adapter: "axe".into(),
            detail: "missing field `violations`".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("axe"));
        assert!(msg.contains("violations"));
    }
}
