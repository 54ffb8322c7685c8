//! Rule-based adapters.
//!
//! Each adapter wraps one [`Checklist`]. It takes a snapshot through the
//! group's session, evaluates every criterion synchronously and returns the
//! report as [`RawPayload::Criteria`].

use std::sync::Arc;

use a11ymatrix_core::{Adapter, AdapterResult, Capabilities, RawPayload, UnitContext};
use async_trait::async_trait;
use tracing::debug;

use crate::checklist::Checklist;
use crate::{japanese, wcag22};

pub struct RuleBasedAdapter {
    name: String,
    checklist: Arc<Checklist>,
}

impl RuleBasedAdapter {
    pub const WCAG22: &'static str = "wcag22-rules";
    pub const JAPANESE: &'static str = "japanese-a11y";

    pub fn new(name: impl Into<String>, checklist: Checklist) -> Self {
        Self {
            name: name.into(),
            checklist: Arc::new(checklist),
        }
    }

    pub fn wcag22() -> Self {
        Self::new(Self::WCAG22, wcag22::checklist())
    }

    pub fn japanese() -> Self {
        Self::new(Self::JAPANESE, japanese::checklist())
    }

    pub fn checklist(&self) -> &Checklist {
        &self.checklist
    }
}

#[async_trait]
impl Adapter for RuleBasedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::none().with_browser_session()
    }

    async fn invoke(&self, ctx: &UnitContext) -> AdapterResult<RawPayload> {
        let snapshot = ctx.require_session()?.snapshot(&ctx.url).await?;
        let report = self.checklist.evaluate_snapshot(&snapshot);
        debug!(
            adapter = %self.name,
            url = %ctx.url,
            criteria = report.criteria.len(),
            "checklist evaluated"
        );
        Ok(RawPayload::Criteria(report))
    }
}

/// Both built-in rule-based adapters.
pub fn rule_adapters() -> Vec<Arc<dyn Adapter>> {
    vec![
        Arc::new(RuleBasedAdapter::wcag22()),
        Arc::new(RuleBasedAdapter::japanese()),
    ]
}
