//! Installment management: registration, manual settlement and balances

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::accrual::{days_late, Accrual};
use crate::traits::InstallmentStore;
use crate::types::*;
use crate::utils::validation::validate_installment;

/// Outstanding balance of one installment at a reference date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceStatement {
    /// Bank document number of the installment
    pub nosso_numero: String,
    /// Date the balance was computed for
    pub reference_date: NaiveDate,
    /// Whether the installment is already settled
    pub paid: bool,
    /// Days overdue at the reference date
    pub days_late: i64,
    /// Original face value
    pub face_value: BigDecimal,
    /// Accrued penalty at the reference date
    pub penalty: BigDecimal,
    /// Accrued interest at the reference date
    pub interest: BigDecimal,
    /// Registered discount
    pub discount: BigDecimal,
    /// Amount owed: face + penalty + interest - discount, zero when paid
    pub total_due: BigDecimal,
}

/// Manager for installment operations outside the bank flow
///
/// Manual settlement at the counter and balance screens go through here;
/// both use the same accrual calculation the remittance builder uses, so
/// the figures never diverge.
pub struct InstallmentManager<S: InstallmentStore> {
    storage: S,
}

impl<S: InstallmentStore> InstallmentManager<S> {
    /// Create a new installment manager
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Register a newly generated installment
    pub async fn register(&mut self, installment: Installment) -> BillingResult<Installment> {
        validate_installment(&installment)?;
        self.storage.save_installment(&installment).await?;
        Ok(installment)
    }

    /// Get an installment by ID
    pub async fn get(&self, id: &Uuid) -> BillingResult<Option<Installment>> {
        self.storage.get_installment(id).await
    }

    /// Get an installment by ID, failing when it does not exist
    pub async fn get_required(&self, id: &Uuid) -> BillingResult<Installment> {
        self.storage
            .get_installment(id)
            .await?
            .ok_or_else(|| BillingError::TitleNotFound(id.to_string()))
    }

    /// List unpaid installments, optionally for one contract
    pub async fn list_open(
        &self,
        contract_code: Option<&str>,
    ) -> BillingResult<Vec<Installment>> {
        self.storage.list_open_installments(contract_code).await
    }

    /// Settle an installment manually
    ///
    /// Accrues penalty and interest as of the payment date. When no
    /// explicit amount is given, the paid amount defaults to
    /// face + penalty + interest - discount.
    pub async fn settle(
        &mut self,
        id: &Uuid,
        account: &BankAccount,
        payment_date: NaiveDate,
        paid_amount: Option<BigDecimal>,
    ) -> BillingResult<Installment> {
        let mut installment = self.get_required(id).await?;
        if installment.paid {
            return Err(BillingError::AlreadySettled(*id));
        }

        let accrual = Accrual::for_installment(&installment, account, payment_date);
        installment.penalty = accrual.penalty.clone();
        installment.interest = accrual.interest.clone();

        let amount = paid_amount.unwrap_or_else(|| {
            &installment.face_value + accrual.total() - &installment.discount
        });
        let settlement_date = chrono::Utc::now().date_naive();
        installment.apply_settlement(payment_date, settlement_date, amount);

        self.storage.update_installment(&installment).await?;
        Ok(installment)
    }

    /// Reverse a settlement, returning the installment to unpaid
    pub async fn reverse(&mut self, id: &Uuid) -> BillingResult<Installment> {
        let mut installment = self.get_required(id).await?;
        if !installment.paid {
            return Err(BillingError::NotSettled(*id));
        }

        installment.reverse_settlement();
        self.storage.update_installment(&installment).await?;
        Ok(installment)
    }

    /// Outstanding balance of an installment at a reference date
    pub async fn balance(
        &self,
        id: &Uuid,
        account: &BankAccount,
        reference_date: NaiveDate,
    ) -> BillingResult<BalanceStatement> {
        let installment = self.get_required(id).await?;
        let accrual = Accrual::for_installment(&installment, account, reference_date);

        let total_due = if installment.paid {
            BigDecimal::from(0)
        } else {
            &installment.face_value + accrual.total() - &installment.discount
        };

        Ok(BalanceStatement {
            nosso_numero: installment.nosso_numero.clone(),
            reference_date,
            paid: installment.paid,
            days_late: if installment.paid {
                0
            } else {
                days_late(installment.due_date, reference_date)
            },
            face_value: installment.face_value.clone(),
            penalty: accrual.penalty,
            interest: accrual.interest,
            discount: installment.discount.clone(),
            total_due,
        })
    }
}
