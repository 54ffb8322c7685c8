//! Test matrix expansion.
//!
//! [`expand`] turns a validated [`RunConfig`] into the ordered, deduplicated
//! list of [`ExecutionUnit`]s for a run, and [`group_units`] partitions that
//! list into the `(url, browser, viewport)` groups that share a session.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::RunConfig;
use crate::domain::error::ConfigResult;
use crate::domain::model::{ExecutionUnit, GroupKey};

/// Units that run sequentially on one session, in expansion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitGroup {
    pub key: GroupKey,
    pub units: Vec<ExecutionUnit>,
}

/// Expand `config` into execution units.
///
/// Validation runs first and nothing is returned on failure. Duplicate
/// config entries collapse to one unit. Output order is lexicographic over
/// URL, browser, viewport name and adapter name, so identical configs always
/// schedule identically.
pub fn expand(
    config: &RunConfig,
    known_adapters: &BTreeSet<String>,
) -> ConfigResult<Vec<ExecutionUnit>> {
    config.validate(known_adapters)?;

    let mut units = BTreeSet::new();
    for url in &config.urls {
        for browser in &config.browsers {
            for viewport in &config.viewports {
                for adapter in &config.adapters {
                    units.insert(ExecutionUnit::new(
                        url.trim(),
                        browser.trim(),
                        viewport.clone(),
                        adapter.as_str(),
                    ));
                }
            }
        }
    }
    Ok(units.into_iter().collect())
}

/// Partition units into session groups, keeping expansion order inside and
/// across groups.
pub fn group_units(units: &[ExecutionUnit]) -> Vec<UnitGroup> {
    let mut groups: BTreeMap<GroupKey, Vec<ExecutionUnit>> = BTreeMap::new();
    for unit in units {
        groups.entry(unit.group_key()).or_default().push(unit.clone());
    }
    groups
        .into_iter()
        .map(|(key, mut units)| {
            units.sort();
            UnitGroup { key, units }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ConfigError;
    use crate::domain::model::ViewportProfile;

    fn known() -> BTreeSet<String> {
        ["axe", "pa11y", "wave", "wcag22-rules"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn config() -> RunConfig {
        RunConfig {
            urls: vec!["https://b.test".into(), "https://a.test".into()],
            browsers: vec!["firefox".into(), "chromium".into()],
            viewports: vec![ViewportProfile::mobile(), ViewportProfile::desktop()],
            adapters: vec!["wave".into(), "axe".into(), "pa11y".into()],
            ..RunConfig::default()
        }
    }

    #[test]
    fn produces_cartesian_product() {
        let units = expand(&config(), &known()).unwrap();
        assert_eq!(units.len(), 2 * 2 * 2 * 3);
        let unique: BTreeSet<_> = units.iter().collect();
        assert_eq!(unique.len(), units.len());
    }

    #[test]
    fn ordering_is_lexicographic_and_stable() {
        let a = expand(&config(), &known()).unwrap();
        let b = expand(&config(), &known()).unwrap();
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort();
        assert_eq!(a, sorted);
        assert_eq!(a[0].url, "https://a.test");
        assert_eq!(a[0].browser, "chromium");
        assert_eq!(a[0].viewport.name, "desktop");
        assert_eq!(a[0].adapter, "axe");
    }

    #[test]
    fn duplicates_collapse() {
        let mut cfg = config();
        cfg.urls.push("https://a.test".into());
        cfg.adapters.push("axe".into());
        let units = expand(&cfg, &known()).unwrap();
        assert_eq!(units.len(), 24);
    }

    #[test]
    fn invalid_config_returns_no_units() {
        let mut cfg = config();
        cfg.adapters.push("tenon".into());
        let err = expand(&cfg, &known()).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownAdapter { .. }));
    }

    #[test]
    fn groups_follow_url_browser_viewport() {
        let units = expand(&config(), &known()).unwrap();
        let groups = group_units(&units);
        assert_eq!(groups.len(), 8);
        for group in &groups {
            let adapters: Vec<&str> = group.units.iter().map(|u| u.adapter.as_str()).collect();
            assert_eq!(adapters, vec!["axe", "pa11y", "wave"]);
            assert!(group.units.iter().all(|u| u.group_key() == group.key));
        }
    }
}
