//! Run configuration.
//!
//! A [`RunConfig`] is loaded from a JSON or TOML file (or built in code),
//! optionally patched with [`ConfigOverrides`] from the command line, and
//! validated before any unit is scheduled. Once a run starts the scheduler
//! holds it behind an `Arc` and nothing mutates it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::error::{ConfigError, ConfigResult};
use crate::domain::model::ViewportProfile;

fn default_browsers() -> Vec<String> {
    vec!["chromium".to_string()]
}

fn default_viewports() -> Vec<ViewportProfile> {
    vec![ViewportProfile::desktop()]
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_max_retries() -> u32 {
    2
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_concurrency() -> usize {
    4
}

/// Engine-specific settings, keyed by adapter name in [`RunConfig::adapter_settings`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdapterSettings {
    /// Executable for command-driven engines.
    #[serde(default)]
    pub command: Option<String>,
    /// Argument template with `{url}`, `{standard}`, `{browser}`, `{width}` and
    /// `{height}` placeholders. Empty means the engine's default arguments.
    #[serde(default)]
    pub args: Vec<String>,
    /// API endpoint for HTTP engines.
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Name of the environment variable holding the API credential.
    #[serde(default)]
    pub credential_env: Option<String>,
    /// Engine standard, e.g. `WCAG2AA`.
    #[serde(default)]
    pub standard: Option<String>,
    #[serde(default)]
    pub options: BTreeMap<String, serde_json::Value>,
}

/// Everything needed to expand and run a test matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default = "default_browsers")]
    pub browsers: Vec<String>,
    #[serde(default = "default_viewports")]
    pub viewports: Vec<ViewportProfile>,
    #[serde(default)]
    pub adapters: Vec<String>,
    /// Per-unit budget covering every attempt and backoff (milliseconds).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retries after the first attempt for transient failures.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Parallel execution slots.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Concurrent browser sessions. Defaults to `concurrency`.
    #[serde(default)]
    pub max_sessions: Option<usize>,
    #[serde(default)]
    pub adapter_settings: BTreeMap<String, AdapterSettings>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            browsers: default_browsers(),
            viewports: default_viewports(),
            adapters: Vec::new(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            concurrency: default_concurrency(),
            max_sessions: None,
            adapter_settings: BTreeMap::new(),
        }
    }
}

/// Command-line values that replace file values when present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub urls: Vec<String>,
    pub browsers: Vec<String>,
    pub viewports: Vec<ViewportProfile>,
    pub adapters: Vec<String>,
    pub concurrency: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub max_retries: Option<u32>,
}

impl RunConfig {
    /// Load from a `.toml` or `.json` file. Other extensions are read as JSON.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        let parsed = if is_toml {
            toml::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        };
        parsed.map_err(|detail| ConfigError::Parse {
            path: path.to_path_buf(),
            detail,
        })
    }

    /// Apply command-line overrides. Non-empty lists replace file lists.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if !overrides.urls.is_empty() {
            self.urls = overrides.urls;
        }
        if !overrides.browsers.is_empty() {
            self.browsers = overrides.browsers;
        }
        if !overrides.viewports.is_empty() {
            self.viewports = overrides.viewports;
        }
        if !overrides.adapters.is_empty() {
            self.adapters = overrides.adapters;
        }
        if let Some(concurrency) = overrides.concurrency {
            self.concurrency = concurrency;
        }
        if let Some(timeout_ms) = overrides.timeout_ms {
            self.timeout_ms = timeout_ms;
        }
        if let Some(max_retries) = overrides.max_retries {
            self.max_retries = max_retries;
        }
    }

    /// Concurrent browser sessions allowed for this run.
    pub fn effective_max_sessions(&self) -> usize {
        self.max_sessions.unwrap_or(self.concurrency)
    }

    /// Settings for one adapter, or defaults when none are configured.
    pub fn settings_for(&self, adapter: &str) -> AdapterSettings {
        self.adapter_settings
            .get(adapter)
            .cloned()
            .unwrap_or_default()
    }

    /// Check the configuration against the set of registered adapter names.
    ///
    /// Fails on the first problem found; the error names the offending field.
    pub fn validate(&self, known_adapters: &BTreeSet<String>) -> ConfigResult<()> {
        if self.urls.is_empty() {
            return Err(ConfigError::EmptyField { field: "urls" });
        }
        if self.urls.iter().any(|u| u.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "urls",
                reason: "URL entries must not be blank".to_string(),
            });
        }

        if self.browsers.is_empty() {
            return Err(ConfigError::EmptyField { field: "browsers" });
        }
        if self.browsers.iter().any(|b| b.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "browsers",
                reason: "browser identifiers must not be blank".to_string(),
            });
        }

        if self.viewports.is_empty() {
            return Err(ConfigError::EmptyField { field: "viewports" });
        }
        let mut seen: BTreeMap<&str, &ViewportProfile> = BTreeMap::new();
        for vp in &self.viewports {
            if vp.width == 0 || vp.height == 0 {
                return Err(ConfigError::InvalidViewport {
                    name: vp.name.clone(),
                    width: i64::from(vp.width),
                    height: i64::from(vp.height),
                });
            }
            if let Some(prev) = seen.insert(vp.name.as_str(), vp) {
                if prev != vp {
                    return Err(ConfigError::InvalidValue {
                        field: "viewports",
                        reason: format!(
                            "viewport name `{}` is used for both {}x{} and {}x{}",
                            vp.name, prev.width, prev.height, vp.width, vp.height
                        ),
                    });
                }
            }
        }

        if self.adapters.is_empty() {
            return Err(ConfigError::EmptyField { field: "adapters" });
        }
        if let Some(unknown) = self.adapters.iter().find(|a| !known_adapters.contains(*a)) {
            return Err(ConfigError::UnknownAdapter {
                name: unknown.clone(),
            });
        }

        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_sessions == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "max_sessions",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known() -> BTreeSet<String> {
        ["axe", "wcag22-rules"].iter().map(|s| s.to_string()).collect()
    }

    fn valid() -> RunConfig {
        RunConfig {
            urls: vec!["https://a.test".into()],
            adapters: vec!["axe".into()],
            ..RunConfig::default()
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.timeout_ms, 60_000);
        assert_eq!(cfg.max_retries, 2);
        assert_eq!(cfg.backoff_base_ms, 500);
        assert_eq!(cfg.concurrency, 4);
        assert_eq!(cfg.effective_max_sessions(), 4);
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid().validate(&known()).is_ok());
    }

    #[test]
    fn empty_fields_are_named() {
        let mut cfg = valid();
        cfg.urls.clear();
        assert_eq!(cfg.validate(&known()).unwrap_err().field(), "urls");

        let mut cfg = valid();
        cfg.browsers.clear();
        assert_eq!(cfg.validate(&known()).unwrap_err().field(), "browsers");

        let mut cfg = valid();
        cfg.viewports.clear();
        assert_eq!(cfg.validate(&known()).unwrap_err().field(), "viewports");

        let mut cfg = valid();
        cfg.adapters.clear();
        assert_eq!(cfg.validate(&known()).unwrap_err().field(), "adapters");
    }

    #[test]
    fn zero_viewport_rejected() {
        let mut cfg = valid();
        cfg.viewports = vec![ViewportProfile::new("flat", 1024, 0)];
        let err = cfg.validate(&known()).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidViewport { ref name, .. } if name == "flat"));
    }

    #[test]
    fn unknown_adapter_rejected() {
        let mut cfg = valid();
        cfg.adapters.push("tenon".into());
        let err = cfg.validate(&known()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownAdapter { ref name } if name == "tenon"));
    }

    #[test]
    fn conflicting_viewport_names_rejected() {
        let mut cfg = valid();
        cfg.viewports = vec![
            ViewportProfile::new("desktop", 1280, 800),
            ViewportProfile::new("desktop", 1366, 768),
        ];
        assert_eq!(cfg.validate(&known()).unwrap_err().field(), "viewports");
    }

    #[test]
    fn zero_concurrency_rejected() {
        let mut cfg = valid();
        cfg.concurrency = 0;
        assert_eq!(cfg.validate(&known()).unwrap_err().field(), "concurrency");
    }

    #[test]
    fn load_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(
            &path,
            r#"
urls = ["https://a.test"]
browsers = ["chromium", "firefox"]
viewports = ["mobile", "desktop,1280,800"]
adapters = ["axe", "wcag22-rules"]
timeout_ms = 30000

[adapter_settings.axe]
command = "axe"
args = ["--exit"]
"#,
        )
        .unwrap();

        let cfg = RunConfig::from_path(&path).unwrap();
        assert_eq!(cfg.browsers.len(), 2);
        assert_eq!(cfg.viewports[1], ViewportProfile::new("desktop", 1280, 800));
        assert_eq!(cfg.timeout_ms, 30_000);
        assert_eq!(cfg.max_retries, 2);
        assert_eq!(cfg.settings_for("axe").command.as_deref(), Some("axe"));
        assert!(cfg.settings_for("wave").command.is_none());
        cfg.validate(&known()).unwrap();
    }

    #[test]
    fn load_json_file_and_reject_bad_viewport() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(
            &path,
            r#"{"urls": ["https://a.test"], "adapters": ["axe"], "viewports": ["tiny,-1,10"]}"#,
        )
        .unwrap();
        let err = RunConfig::from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = RunConfig::from_path(Path::new("/nonexistent/a11ymatrix.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn overrides_replace_values() {
        let mut cfg = valid();
        cfg.apply_overrides(ConfigOverrides {
            urls: vec!["https://b.test".into()],
            concurrency: Some(8),
            max_retries: Some(0),
            ..ConfigOverrides::default()
        });
        assert_eq!(cfg.urls, vec!["https://b.test".to_string()]);
        assert_eq!(cfg.adapters, vec!["axe".to_string()]);
        assert_eq!(cfg.concurrency, 8);
        assert_eq!(cfg.max_retries, 0);
    }
}
