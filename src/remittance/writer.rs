//! Remittance file sequencing, line-width enforcement and output
//!
//! The writer owns the per-account batch lock: two generation requests
//! for the same bank account and date would collide on sequence numbers
//! and on the output filename, so the second caller is refused while the
//! first is still building or writing.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

use crate::accrual::Accrual;
use crate::remittance::layout::BankLayout;
use crate::types::{BankAccount, BillingError, BillingResult, RemittanceBatch};
use crate::utils::validation::validate_bank_account;

/// Line terminator used by the supported bank layouts
const LINE_TERMINATOR: &str = "\r\n";

/// A generated remittance file, ready for delivery
#[derive(Debug, Clone, PartialEq)]
pub struct RemittanceFile {
    /// Deterministic filename: bank code + generation date + batch number
    pub filename: String,
    /// Full file contents, CRLF-terminated lines
    pub contents: String,
    /// Number of records in the file (header + details + trailer)
    pub line_count: usize,
}

impl RemittanceFile {
    /// File contents as bytes for delivery collaborators
    pub fn as_bytes(&self) -> &[u8] {
        self.contents.as_bytes()
    }
}

/// Guard for one in-flight batch; releases the slot when dropped
struct BatchGuard {
    registry: Arc<Mutex<HashSet<(Uuid, NaiveDate)>>>,
    key: (Uuid, NaiveDate),
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        if let Ok(mut held) = self.registry.lock() {
            held.remove(&self.key);
        }
    }
}

/// Mutual exclusion for batch generation, keyed by account and date
#[derive(Debug, Clone, Default)]
struct BatchLockRegistry {
    held: Arc<Mutex<HashSet<(Uuid, NaiveDate)>>>,
}

impl BatchLockRegistry {
    fn acquire(&self, account_id: Uuid, period: NaiveDate) -> BillingResult<BatchGuard> {
        let mut held = self
            .held
            .lock()
            .map_err(|e| BillingError::Storage(e.to_string()))?;
        if !held.insert((account_id, period)) {
            return Err(BillingError::BatchInProgress { account_id, period });
        }
        Ok(BatchGuard {
            registry: Arc::clone(&self.held),
            key: (account_id, period),
        })
    }
}

/// Orchestrates header, details and trailer into a deliverable file
#[derive(Debug, Clone, Default)]
pub struct RemittanceFileWriter {
    locks: BatchLockRegistry,
}

impl RemittanceFileWriter {
    /// Create a new writer with its own batch-lock registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the remittance file in memory
    ///
    /// Holds the batch lock for the duration of the build. Any field
    /// failure aborts the whole file: a malformed remittance must never
    /// reach a bank.
    pub fn generate(
        &self,
        layout: &dyn BankLayout,
        account: &BankAccount,
        batch: &RemittanceBatch,
        batch_number: u32,
    ) -> BillingResult<RemittanceFile> {
        let _guard = self.locks.acquire(account.id, batch.generation_date)?;
        self.build(layout, account, batch, batch_number)
    }

    /// Build the remittance file and write it under the account's
    /// configured output directory
    ///
    /// The batch lock covers both building and writing, so a concurrent
    /// request cannot overwrite the file mid-emission.
    pub fn generate_to_directory(
        &self,
        layout: &dyn BankLayout,
        account: &BankAccount,
        batch: &RemittanceBatch,
        batch_number: u32,
    ) -> BillingResult<PathBuf> {
        let _guard = self.locks.acquire(account.id, batch.generation_date)?;
        let file = self.build(layout, account, batch, batch_number)?;
        let path = write_file(&file, &account.remittance_dir)?;
        info!(
            path = %path.display(),
            lines = file.line_count,
            bank_code = batch.bank_code,
            "remittance file written"
        );
        Ok(path)
    }

    fn build(
        &self,
        layout: &dyn BankLayout,
        account: &BankAccount,
        batch: &RemittanceBatch,
        batch_number: u32,
    ) -> BillingResult<RemittanceFile> {
        validate_bank_account(account)?;

        let mut lines = Vec::with_capacity(batch.total_lines());
        lines.push(layout.build_header(account, batch)?);

        let mut sequence = 1;
        for installment in &batch.installments {
            sequence += 1;
            let accrual = Accrual::for_installment(installment, account, batch.generation_date);
            lines.push(layout.build_detail(account, batch, installment, &accrual, sequence)?);
        }

        sequence += 1;
        lines.push(layout.build_trailer(sequence)?);

        for (index, line) in lines.iter().enumerate() {
            if line.chars().count() != layout.line_width() {
                return Err(BillingError::RecordLength {
                    line_number: index + 1,
                    expected: layout.line_width(),
                    actual: line.chars().count(),
                });
            }
        }

        let mut contents = lines.join(LINE_TERMINATOR);
        contents.push_str(LINE_TERMINATOR);

        Ok(RemittanceFile {
            filename: batch_filename(batch.bank_code, batch.generation_date, batch_number),
            contents,
            line_count: lines.len(),
        })
    }
}

/// Deterministic filename: zero-padded bank code, generation date,
/// two-digit running batch number
fn batch_filename(bank_code: u16, generation_date: NaiveDate, batch_number: u32) -> String {
    format!(
        "{:03}{}{:02}.REM",
        bank_code,
        generation_date.format("%Y%m%d"),
        batch_number % 100
    )
}

fn write_file(file: &RemittanceFile, directory: &Path) -> BillingResult<PathBuf> {
    let metadata =
        std::fs::metadata(directory).map_err(|e| BillingError::DirectoryUnavailable {
            path: directory.to_path_buf(),
            reason: e.to_string(),
        })?;
    if !metadata.is_dir() {
        return Err(BillingError::DirectoryUnavailable {
            path: directory.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }

    let path = directory.join(&file.filename);
    std::fs::write(&path, file.as_bytes()).map_err(|e| BillingError::DirectoryUnavailable {
        path: directory.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::remittance::layout::{self, layout_for};
    use crate::types::{Installment, Payer};
    use bigdecimal::BigDecimal;
    use std::str::FromStr;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_payer() -> Payer {
        Payer {
            name: "João da Silva".to_string(),
            address: "Rua das Flores, 123".to_string(),
            neighborhood: "Centro".to_string(),
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
            postal_code: "01001000".to_string(),
        }
    }

    fn sample_account() -> BankAccount {
        BankAccount {
            id: Uuid::new_v4(),
            bank_code: 237,
            agency: "01234".to_string(),
            agency_digit: "5".to_string(),
            account: "0067890".to_string(),
            account_digit: "1".to_string(),
            assignor_code: "00123456789012345678".to_string(),
            assignor_name: "Prefeitura Municipal".to_string(),
            wallet_code: "009".to_string(),
            monthly_penalty_rate: BigDecimal::from(2),
            monthly_interest_rate: BigDecimal::from(1),
            remittance_dir: std::env::temp_dir(),
            return_dir: std::env::temp_dir(),
        }
    }

    fn sample_installment(nosso: &str, due: NaiveDate) -> Installment {
        Installment::new(
            "2024000001".to_string(),
            "CT-88".to_string(),
            due,
            BigDecimal::from_str("150.00").unwrap(),
            nosso.to_string(),
            sample_payer(),
        )
    }

    fn sample_batch(count: usize) -> (BankAccount, RemittanceBatch) {
        let account = sample_account();
        let installments = (0..count)
            .map(|i| sample_installment(&format!("{:011}", i + 1), ymd(2024, 1, 10)))
            .collect();
        let batch = RemittanceBatch::new(237, ymd(2024, 2, 1), installments);
        (account, batch)
    }

    #[test]
    fn test_every_line_has_the_layout_width() {
        let (account, batch) = sample_batch(3);
        let layout = layout_for(237).unwrap();
        let writer = RemittanceFileWriter::new();
        let file = writer.generate(layout.as_ref(), &account, &batch, 1).unwrap();

        for line in file.contents.trim_end().split("\r\n") {
            assert_eq!(line.chars().count(), layout::LINE_WIDTH);
        }
        assert_eq!(file.line_count, 5);
    }

    #[test]
    fn test_sequence_numbers_run_without_gaps() {
        let (account, batch) = sample_batch(4);
        let layout = layout_for(237).unwrap();
        let writer = RemittanceFileWriter::new();
        let file = writer.generate(layout.as_ref(), &account, &batch, 1).unwrap();

        let sequences: Vec<u64> = file
            .contents
            .trim_end()
            .split("\r\n")
            .map(|line| codec::decode_numeric(&line[layout::detail::SEQUENCE]).unwrap())
            .collect();
        assert_eq!(sequences, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_filename_is_deterministic() {
        assert_eq!(batch_filename(237, ymd(2024, 2, 1), 3), "2372024020103.REM");
        assert_eq!(batch_filename(341, ymd(2024, 12, 31), 7), "3412024123107.REM");
    }

    #[test]
    fn test_concurrent_generation_for_same_account_and_period_is_refused() {
        let registry = BatchLockRegistry::default();
        let account_id = Uuid::new_v4();
        let period = ymd(2024, 2, 1);

        let guard = registry.acquire(account_id, period).unwrap();
        let second = registry.acquire(account_id, period);
        assert!(matches!(
            second,
            Err(BillingError::BatchInProgress { .. })
        ));

        // a different period is unaffected
        registry.acquire(account_id, ymd(2024, 2, 2)).unwrap();

        drop(guard);
        registry.acquire(account_id, period).unwrap();
    }

    #[test]
    fn test_missing_output_directory_is_reported() {
        let (mut account, batch) = sample_batch(1);
        let dir = tempfile::tempdir().unwrap();
        account.remittance_dir = dir.path().join("no-such-subdir");
        let layout = layout_for(237).unwrap();
        let writer = RemittanceFileWriter::new();

        let err = writer
            .generate_to_directory(layout.as_ref(), &account, &batch, 1)
            .unwrap_err();
        assert!(matches!(err, BillingError::DirectoryUnavailable { .. }));
    }

    #[test]
    fn test_file_lands_in_the_configured_directory() {
        let (mut account, batch) = sample_batch(2);
        let dir = tempfile::tempdir().unwrap();
        account.remittance_dir = dir.path().to_path_buf();
        let layout = layout_for(237).unwrap();
        let writer = RemittanceFileWriter::new();

        let path = writer
            .generate_to_directory(layout.as_ref(), &account, &batch, 1)
            .unwrap();
        assert!(path.exists());
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.matches("\r\n").count(), 4);
    }

    #[test]
    fn test_oversized_face_value_aborts_the_file() {
        let (account, mut batch) = sample_batch(1);
        batch.installments[0].face_value =
            BigDecimal::from_str("999999999999999999.00").unwrap();
        let layout = layout_for(237).unwrap();
        let writer = RemittanceFileWriter::new();

        let err = writer.generate(layout.as_ref(), &account, &batch, 1).unwrap_err();
        assert!(matches!(err, BillingError::InstallmentField { .. }));
    }
}
