//! # Billing Core
//!
//! The bank collection core of a municipal installment-billing system:
//! remittance batch generation, return-file reconciliation and overdue
//! accrual.
//!
//! ## Features
//!
//! - **Fixed-width codec**: zero-padded numerics, 7-bit text, dates and
//!   integer-cent currency fields for CNAB-400 style bank files
//! - **Accrual**: one penalty/interest formula backing remittance fields,
//!   settlement screens and balance queries
//! - **Remittance generation**: bank-specific layouts (Bradesco, Itaú)
//!   behind a strategy trait, with sequencing, line-width enforcement and
//!   per-account batch locking
//! - **Return processing**: tolerant line-by-line parsing with per-line
//!   error collection
//! - **Reconciliation**: idempotent settlement application, write-off
//!   reversal and atomic batch persistence
//! - **Storage abstraction**: database-agnostic design with a trait-based
//!   store
//!
//! ## Quick Start
//!
//! ```rust
//! use billing_core::{BillingService, MemoryStorage};
//!
//! // The service wires generation, parsing and reconciliation over any
//! // InstallmentStore implementation.
//! let service = BillingService::new(MemoryStorage::new());
//! ```

pub mod accrual;
pub mod billing;
pub mod codec;
pub mod reconciliation;
pub mod remittance;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use accrual::{days_late, Accrual};
pub use billing::*;
pub use reconciliation::*;
pub use remittance::*;
pub use traits::*;
pub use types::*;
pub use utils::memory_storage::MemoryStorage;
