//! Billing service that coordinates generation, parsing and reconciliation

use chrono::NaiveDate;
use std::path::PathBuf;

use crate::accrual::Accrual;
use crate::billing::InstallmentManager;
use crate::reconciliation::{
    LineError, ReconciliationEngine, ReconciliationSummary, ReturnFileParser, ReturnParseOutcome,
};
use crate::remittance::{layout_for, RemittanceFile, RemittanceFileWriter};
use crate::traits::InstallmentStore;
use crate::types::*;

/// Facade over the billing core
///
/// Wires the installment manager, the remittance writer and the
/// reconciliation engine over one storage backend. The bank layout is
/// selected by the account's bank code on every generation call.
pub struct BillingService<S: InstallmentStore> {
    installments: InstallmentManager<S>,
    engine: ReconciliationEngine<S>,
    storage: S,
    writer: RemittanceFileWriter,
}

impl<S: InstallmentStore + Clone> BillingService<S> {
    /// Create a new billing service with the given storage backend
    pub fn new(storage: S) -> Self {
        Self {
            installments: InstallmentManager::new(storage.clone()),
            engine: ReconciliationEngine::new(storage.clone()),
            storage,
            writer: RemittanceFileWriter::new(),
        }
    }

    /// Installment operations (registration, settlement, balances)
    pub fn installments(&self) -> &InstallmentManager<S> {
        &self.installments
    }

    /// Installment operations, mutable
    pub fn installments_mut(&mut self) -> &mut InstallmentManager<S> {
        &mut self.installments
    }

    /// Build a remittance file in memory for the given installments
    pub fn generate_remittance(
        &self,
        account: &BankAccount,
        installments: Vec<Installment>,
        generation_date: NaiveDate,
        batch_number: u32,
    ) -> BillingResult<RemittanceFile> {
        let layout = layout_for(account.bank_code)?;
        let batch = RemittanceBatch::new(account.bank_code, generation_date, installments);
        self.writer
            .generate(layout.as_ref(), account, &batch, batch_number)
    }

    /// Build a remittance file and write it under the account's
    /// configured output directory
    pub fn generate_remittance_to_disk(
        &self,
        account: &BankAccount,
        installments: Vec<Installment>,
        generation_date: NaiveDate,
        batch_number: u32,
    ) -> BillingResult<PathBuf> {
        let layout = layout_for(account.bank_code)?;
        let batch = RemittanceBatch::new(account.bank_code, generation_date, installments);
        self.writer
            .generate_to_directory(layout.as_ref(), account, &batch, batch_number)
    }

    /// Build a remittance for every open installment in the store
    pub async fn generate_remittance_for_open(
        &self,
        account: &BankAccount,
        generation_date: NaiveDate,
        batch_number: u32,
    ) -> BillingResult<RemittanceFile> {
        let open = self.storage.list_open_installments(None).await?;
        self.generate_remittance(account, open, generation_date, batch_number)
    }

    /// Parse an inbound return file
    pub fn parse_return(&self, contents: &str) -> ReturnParseOutcome {
        ReturnFileParser::parse(contents)
    }

    /// Parse an inbound return file from raw bytes
    ///
    /// Banks transmit these files as 7-bit ASCII; bytes outside that
    /// range surface as per-line errors rather than failing the file.
    pub fn parse_return_bytes(&self, bytes: &[u8]) -> ReturnParseOutcome {
        ReturnFileParser::parse(&String::from_utf8_lossy(bytes))
    }

    /// Apply parsed return records onto installments
    pub async fn reconcile(
        &mut self,
        records: &[ReturnRecord],
    ) -> BillingResult<ReconciliationSummary> {
        self.engine.reconcile(records).await
    }

    /// Parse a return file and reconcile it in one step
    ///
    /// Returns the reconciliation summary together with the per-line
    /// parse errors so the caller can report both.
    pub async fn reconcile_return_file(
        &mut self,
        contents: &str,
    ) -> BillingResult<(ReconciliationSummary, Vec<LineError>)> {
        let outcome = self.parse_return(contents);
        let summary = self.engine.reconcile(&outcome.records).await?;
        Ok((summary, outcome.errors))
    }

    /// Penalty and interest for one installment at a reference date
    pub fn accrue(
        &self,
        installment: &Installment,
        account: &BankAccount,
        reference_date: NaiveDate,
    ) -> Accrual {
        Accrual::for_installment(installment, account, reference_date)
    }
}
