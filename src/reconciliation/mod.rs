//! Reconciliation module: return-file parsing and installment updates

pub mod engine;
pub mod parser;

pub use engine::{ReconciliationEngine, ReconciliationSummary, RejectionNotice};
pub use parser::{LineError, LineErrorKind, ReturnFileParser, ReturnParseOutcome};
