//! Traits for storage abstraction and extensibility

use async_trait::async_trait;
use uuid::Uuid;

use crate::types::*;

/// Storage abstraction for installments and bank accounts
///
/// The billing core never touches SQL directly; any backend (PostgreSQL,
/// MySQL, SQLite, in-memory, etc.) can plug in by implementing these
/// methods.
#[async_trait]
pub trait InstallmentStore: Send + Sync {
    /// Save a newly generated installment
    async fn save_installment(&mut self, installment: &Installment) -> BillingResult<()>;

    /// Get an installment by ID
    async fn get_installment(&self, id: &Uuid) -> BillingResult<Option<Installment>>;

    /// Look up an installment by its bank document number
    ///
    /// This is the join key used when reconciling return files.
    async fn find_by_nosso_numero(
        &self,
        nosso_numero: &str,
    ) -> BillingResult<Option<Installment>>;

    /// List unpaid installments, optionally restricted to one contract
    async fn list_open_installments(
        &self,
        contract_code: Option<&str>,
    ) -> BillingResult<Vec<Installment>>;

    /// Update an existing installment
    async fn update_installment(&mut self, installment: &Installment) -> BillingResult<()>;

    /// Apply a set of settlement mutations as one unit
    ///
    /// Either every installment in the slice is persisted or none is; a
    /// mid-batch failure must not leave the reconciliation half applied.
    async fn apply_settlements(&mut self, installments: &[Installment]) -> BillingResult<()>;

    /// Save a bank account configuration
    async fn save_bank_account(&mut self, account: &BankAccount) -> BillingResult<()>;

    /// Get a bank account configuration by ID
    async fn get_bank_account(&self, id: &Uuid) -> BillingResult<Option<BankAccount>>;
}
