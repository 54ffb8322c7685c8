//! Rule-based accessibility checklists for a11ymatrix.
//!
//! Evaluates fixed criteria directly against a page snapshot, with no
//! third-party engine:
//! - `wcag22-rules`: criteria new in WCAG 2.2
//! - `japanese-a11y`: Japanese-locale checks mapped to WCAG and JIS X 8341-3

pub mod adapter;
pub mod checklist;
pub mod error;
pub mod japanese;
pub mod page;
pub mod wcag22;

pub use adapter::{rule_adapters, RuleBasedAdapter};
pub use checklist::{Checklist, Criterion, CriterionMeta, Finding};
pub use error::{RuleError, RuleResult};
pub use page::PageView;
