//! Errors raised while evaluating a criterion.
//!
//! A criterion that errors is reported as `manual_check_required` by the
//! checklist; the error never reaches the scheduler.

/// Why a criterion could not be decided automatically.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("invalid selector `{selector}`: {detail}")]
    Selector { selector: String, detail: String },

    #[error("page has no `{0}` element")]
    MissingElement(&'static str),

    #[error("{0}")]
    Undetermined(String),
}

pub type RuleResult<T> = std::result::Result<T, RuleError>;
