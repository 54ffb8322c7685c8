//! Domain types for a11ymatrix.

pub mod error;
pub mod fingerprint;
pub mod model;
pub mod wcag;

pub use error::{
    AdapterError, AdapterResult, ConfigError, ConfigResult, FailureClass, NormalizationError,
    RunError, RunResult,
};
pub use fingerprint::{fingerprint, normalize_selector, split_selector_list};
pub use model::{
    CriteriaReport, CriterionEvaluation, CriterionIssue, CriterionOutcome, Evidence,
    ExecutionUnit, GroupKey, NormalizedIssue, Outcome, RawPayload, RawResult, ResultStatus,
    Severity, UnitError, ViewportProfile,
};
pub use wcag::{SuccessCriterion, WcagLevel};
