//! Applying return-file outcomes onto installment records
//!
//! The engine is idempotent: it checks the current installment state
//! before mutating, so reprocessing a return file (or a file with
//! duplicate lines) counts no-ops instead of double-applying payments.
//! Mutations are staged in memory and applied against the store as one
//! unit, so a mid-batch storage failure cannot leave the reconciliation
//! half done.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

use crate::traits::InstallmentStore;
use crate::types::{BillingResult, Installment, ReturnOutcome, ReturnRecord};

/// A charge the bank refused, with its motive code when informed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionNotice {
    /// Nosso número of the refused charge
    pub nosso_numero: String,
    /// Bank motive code, when the return line carried one
    pub motive_code: Option<String>,
}

/// Counts and details of one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    /// Settlements applied (paid and paid-with-discount)
    pub applied: usize,
    /// Settlements reverted by a bank write-off
    pub reversed: usize,
    /// Records whose target state already held; nothing changed
    pub no_ops: usize,
    /// Entry confirmations acknowledged
    pub confirmed: usize,
    /// Charges the bank rejected
    pub rejected: usize,
    /// Records with no matching installment
    pub unmatched: usize,
    /// Records with an unmapped occurrence code
    pub unresolved: usize,
    /// Nosso números that matched no installment
    pub unmatched_nosso_numeros: Vec<String>,
    /// Rejections, with motive codes for remediation
    pub rejections: Vec<RejectionNotice>,
}

impl ReconciliationSummary {
    /// Total installment mutations this run produced
    pub fn mutations(&self) -> usize {
        self.applied + self.reversed
    }
}

/// Applies parsed return records onto installments through the store
pub struct ReconciliationEngine<S: InstallmentStore> {
    storage: S,
}

impl<S: InstallmentStore> ReconciliationEngine<S> {
    /// Create an engine over the given storage backend
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Reconcile a batch of return records
    ///
    /// Looks up each detail by nosso número, applies the status
    /// transition table, and persists every staged mutation in a single
    /// atomic store call. Unmatched and rejected records are reported in
    /// the summary, never raised as errors.
    pub async fn reconcile(
        &mut self,
        records: &[ReturnRecord],
    ) -> BillingResult<ReconciliationSummary> {
        let mut summary = ReconciliationSummary::default();
        let mut staged: HashMap<String, Installment> = HashMap::new();

        for record in records {
            let Some(detail) = record.as_detail() else {
                continue;
            };

            match detail.outcome {
                ReturnOutcome::EntryConfirmed => {
                    summary.confirmed += 1;
                }
                ReturnOutcome::Rejected => {
                    warn!(
                        nosso_numero = detail.base_nosso_numero(),
                        motive = detail.motive_code.as_deref().unwrap_or("-"),
                        "charge rejected by the bank"
                    );
                    summary.rejected += 1;
                    summary.rejections.push(RejectionNotice {
                        nosso_numero: detail.base_nosso_numero().to_string(),
                        motive_code: detail.motive_code.clone(),
                    });
                }
                ReturnOutcome::Unknown => {
                    warn!(
                        nosso_numero = detail.base_nosso_numero(),
                        occurrence = %detail.occurrence_code,
                        "unmapped occurrence code, record left unresolved"
                    );
                    summary.unresolved += 1;
                }
                ReturnOutcome::Paid | ReturnOutcome::PaidWithDiscount => {
                    let key = detail.base_nosso_numero().to_string();
                    match self.lookup(&staged, &key).await? {
                        None => self.report_unmatched(&mut summary, key),
                        Some(installment) if installment.paid => {
                            summary.no_ops += 1;
                        }
                        Some(mut installment) => {
                            let payment_date = detail
                                .payment_date
                                .unwrap_or_else(|| chrono::Utc::now().date_naive());
                            let settlement_date = chrono::Utc::now().date_naive();
                            let paid_amount = detail
                                .paid_value
                                .clone()
                                .unwrap_or_else(|| installment.face_value.clone());

                            if let Some(fee) = &detail.bank_fee {
                                installment.bank_fee = fee.clone();
                            }
                            if let Some(interest) = &detail.interest {
                                installment.interest = interest.clone();
                            }
                            if detail.outcome == ReturnOutcome::PaidWithDiscount {
                                if let Some(discount) = &detail.discount {
                                    installment.discount = discount.clone();
                                }
                            }
                            installment.apply_settlement(
                                payment_date,
                                settlement_date,
                                paid_amount,
                            );

                            staged.insert(key, installment);
                            summary.applied += 1;
                        }
                    }
                }
                ReturnOutcome::WrittenOff => {
                    let key = detail.base_nosso_numero().to_string();
                    match self.lookup(&staged, &key).await? {
                        None => self.report_unmatched(&mut summary, key),
                        Some(installment) if !installment.paid => {
                            summary.no_ops += 1;
                        }
                        Some(mut installment) => {
                            installment.reverse_settlement();
                            staged.insert(key, installment);
                            summary.reversed += 1;
                        }
                    }
                }
            }
        }

        let updates: Vec<Installment> = staged.into_values().collect();
        if !updates.is_empty() {
            self.storage.apply_settlements(&updates).await?;
        }

        Ok(summary)
    }

    /// Current view of an installment: staged mutation first, then store
    ///
    /// Duplicate lines inside one file observe the staged state, which is
    /// what makes reprocessing a no-op instead of a double application.
    async fn lookup(
        &self,
        staged: &HashMap<String, Installment>,
        nosso_numero: &str,
    ) -> BillingResult<Option<Installment>> {
        if let Some(installment) = staged.get(nosso_numero) {
            return Ok(Some(installment.clone()));
        }
        self.storage.find_by_nosso_numero(nosso_numero).await
    }

    fn report_unmatched(&self, summary: &mut ReconciliationSummary, nosso_numero: String) {
        warn!(nosso_numero = %nosso_numero, "return record matched no installment");
        summary.unmatched += 1;
        summary.unmatched_nosso_numeros.push(nosso_numero);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Payer, ReturnDetail};
    use crate::utils::MemoryStorage;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_payer() -> Payer {
        Payer {
            name: "Maria Souza".to_string(),
            address: "Av. Central, 500".to_string(),
            neighborhood: "Jardim".to_string(),
            city: "Campinas".to_string(),
            state: "SP".to_string(),
            postal_code: "13010000".to_string(),
        }
    }

    fn open_installment(nosso: &str) -> Installment {
        Installment::new(
            "2024000010".to_string(),
            "CT-42".to_string(),
            ymd(2024, 1, 10),
            BigDecimal::from_str("200.00").unwrap(),
            nosso.to_string(),
            sample_payer(),
        )
    }

    fn paid_record(nosso: &str, paid_cents: u64) -> ReturnRecord {
        ReturnRecord::Detail(ReturnDetail {
            line_number: 2,
            nosso_numero: format!("{nosso}8"),
            contract_code: "CT-42".to_string(),
            occurrence_code: "06".to_string(),
            outcome: ReturnOutcome::Paid,
            payment_date: Some(ymd(2024, 3, 14)),
            paid_value: Some(BigDecimal::from(paid_cents) / BigDecimal::from(100)),
            bank_fee: Some(BigDecimal::from_str("1.50").unwrap()),
            discount: Some(BigDecimal::from(0)),
            interest: Some(BigDecimal::from_str("2.00").unwrap()),
            motive_code: None,
        })
    }

    fn write_off_record(nosso: &str) -> ReturnRecord {
        ReturnRecord::Detail(ReturnDetail {
            line_number: 3,
            nosso_numero: format!("{nosso}8"),
            contract_code: "CT-42".to_string(),
            occurrence_code: "09".to_string(),
            outcome: ReturnOutcome::WrittenOff,
            payment_date: None,
            paid_value: None,
            bank_fee: None,
            discount: None,
            interest: None,
            motive_code: None,
        })
    }

    #[tokio::test]
    async fn test_paid_record_settles_the_installment() {
        let mut storage = MemoryStorage::new();
        let installment = open_installment("00000000001");
        storage.save_installment(&installment).await.unwrap();

        let mut engine = ReconciliationEngine::new(storage.clone());
        let summary = engine
            .reconcile(&[paid_record("00000000001", 20_350)])
            .await
            .unwrap();

        assert_eq!(summary.applied, 1);
        assert_eq!(summary.no_ops, 0);

        let settled = storage
            .find_by_nosso_numero("00000000001")
            .await
            .unwrap()
            .unwrap();
        assert!(settled.paid);
        assert_eq!(settled.payment_date, Some(ymd(2024, 3, 14)));
        assert_eq!(
            settled.paid_amount,
            Some(BigDecimal::from_str("203.50").unwrap())
        );
        assert_eq!(settled.bank_fee, BigDecimal::from_str("1.50").unwrap());
    }

    #[tokio::test]
    async fn test_reprocessing_the_same_record_is_a_no_op() {
        let mut storage = MemoryStorage::new();
        storage
            .save_installment(&open_installment("00000000001"))
            .await
            .unwrap();

        let mut engine = ReconciliationEngine::new(storage.clone());
        let first = engine
            .reconcile(&[paid_record("00000000001", 20_000)])
            .await
            .unwrap();
        let state_after_first = storage
            .find_by_nosso_numero("00000000001")
            .await
            .unwrap()
            .unwrap();

        let second = engine
            .reconcile(&[paid_record("00000000001", 20_000)])
            .await
            .unwrap();
        let state_after_second = storage
            .find_by_nosso_numero("00000000001")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first.applied, 1);
        assert_eq!(second.applied, 0);
        assert_eq!(second.no_ops, 1);
        assert_eq!(state_after_first.paid_amount, state_after_second.paid_amount);
        assert_eq!(
            state_after_first.payment_date,
            state_after_second.payment_date
        );
    }

    #[tokio::test]
    async fn test_duplicate_lines_in_one_file_apply_once() {
        let mut storage = MemoryStorage::new();
        storage
            .save_installment(&open_installment("00000000001"))
            .await
            .unwrap();

        let mut engine = ReconciliationEngine::new(storage.clone());
        let summary = engine
            .reconcile(&[
                paid_record("00000000001", 20_000),
                paid_record("00000000001", 20_000),
            ])
            .await
            .unwrap();

        assert_eq!(summary.applied, 1);
        assert_eq!(summary.no_ops, 1);
    }

    #[tokio::test]
    async fn test_write_off_reverts_a_paid_installment() {
        let mut storage = MemoryStorage::new();
        let mut installment = open_installment("00000000001");
        installment.apply_settlement(
            ymd(2024, 3, 14),
            ymd(2024, 3, 15),
            BigDecimal::from(200),
        );
        storage.save_installment(&installment).await.unwrap();

        let mut engine = ReconciliationEngine::new(storage.clone());
        let summary = engine
            .reconcile(&[write_off_record("00000000001")])
            .await
            .unwrap();

        assert_eq!(summary.reversed, 1);
        let reverted = storage
            .find_by_nosso_numero("00000000001")
            .await
            .unwrap()
            .unwrap();
        assert!(!reverted.paid);
        assert_eq!(reverted.payment_date, None);
        assert_eq!(reverted.paid_amount, None);
    }

    #[tokio::test]
    async fn test_write_off_on_unpaid_installment_is_a_no_op() {
        let mut storage = MemoryStorage::new();
        storage
            .save_installment(&open_installment("00000000001"))
            .await
            .unwrap();

        let mut engine = ReconciliationEngine::new(storage);
        let summary = engine
            .reconcile(&[write_off_record("00000000001")])
            .await
            .unwrap();

        assert_eq!(summary.reversed, 0);
        assert_eq!(summary.no_ops, 1);
    }

    #[tokio::test]
    async fn test_unmatched_record_is_reported_not_fatal() {
        let storage = MemoryStorage::new();
        let mut engine = ReconciliationEngine::new(storage);

        let summary = engine
            .reconcile(&[paid_record("99999999999", 10_000)])
            .await
            .unwrap();

        assert_eq!(summary.applied, 0);
        assert_eq!(summary.unmatched, 1);
        assert_eq!(summary.unmatched_nosso_numeros, vec!["99999999999"]);
    }

    #[tokio::test]
    async fn test_rejection_is_counted_with_its_motive() {
        let storage = MemoryStorage::new();
        let mut engine = ReconciliationEngine::new(storage);

        let record = ReturnRecord::Detail(ReturnDetail {
            line_number: 2,
            nosso_numero: "000000000018".to_string(),
            contract_code: "CT-42".to_string(),
            occurrence_code: "03".to_string(),
            outcome: ReturnOutcome::Rejected,
            payment_date: None,
            paid_value: None,
            bank_fee: None,
            discount: None,
            interest: None,
            motive_code: Some("014".to_string()),
        });
        let summary = engine.reconcile(&[record]).await.unwrap();

        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.rejections[0].nosso_numero, "00000000001");
        assert_eq!(summary.rejections[0].motive_code.as_deref(), Some("014"));
    }
}
