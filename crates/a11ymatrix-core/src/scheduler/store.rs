//! Storage for terminal unit results, one per unit tuple.

use std::collections::BTreeMap;

use tracing::warn;

use crate::domain::model::{ExecutionUnit, RawResult};

/// Terminal results keyed by unit. A re-issued unit replaces its prior result.
#[derive(Debug, Default)]
pub struct ResultStore {
    results: BTreeMap<ExecutionUnit, RawResult>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `result`, returning the result it replaced, if any.
    pub fn record(&mut self, result: RawResult) -> Option<RawResult> {
        let prior = self.results.insert(result.unit.clone(), result);
        if let Some(prior) = &prior {
            warn!(
                event = "result.replaced",
                unit = %prior.unit,
                prior_status = ?prior.status,
                "re-issued unit overwrote its prior result"
            );
        }
        prior
    }

    pub fn get(&self, unit: &ExecutionUnit) -> Option<&RawResult> {
        self.results.get(unit)
    }

    pub fn contains(&self, unit: &ExecutionUnit) -> bool {
        self.results.contains_key(unit)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// All results in unit order.
    pub fn into_results(self) -> Vec<RawResult> {
        self.results.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ResultStatus, ViewportProfile};

    fn result(adapter: &str, status: ResultStatus) -> RawResult {
        RawResult {
            unit: ExecutionUnit::new("https://a.test", "chromium", ViewportProfile::desktop(), adapter),
            status,
            payload: None,
            duration_ms: 1,
            attempts: 1,
            error: None,
        }
    }

    #[test]
    fn reissued_unit_overwrites_prior_result() {
        let mut store = ResultStore::new();
        assert!(store.record(result("axe", ResultStatus::Timeout)).is_none());
        let prior = store.record(result("axe", ResultStatus::Ok));
        assert_eq!(prior.map(|r| r.status), Some(ResultStatus::Timeout));

        let unit = result("axe", ResultStatus::Ok).unit;
        assert_eq!(store.get(&unit).map(|r| r.status), Some(ResultStatus::Ok));
        let results = store.into_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, ResultStatus::Ok);
    }

    #[test]
    fn results_come_back_in_unit_order() {
        let mut store = ResultStore::new();
        store.record(result("wave", ResultStatus::Ok));
        store.record(result("axe", ResultStatus::Ok));
        let adapters: Vec<String> = store
            .into_results()
            .into_iter()
            .map(|r| r.unit.adapter)
            .collect();
        assert_eq!(adapters, vec!["axe", "wave"]);
    }
}
