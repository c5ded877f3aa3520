//! Validation utilities

use crate::types::*;

/// Validate that a bank account carries everything a remittance needs
///
/// Building starts only after this passes; a half-configured account
/// would otherwise fail deep inside field encoding with a less
/// actionable message.
pub fn validate_bank_account(account: &BankAccount) -> BillingResult<()> {
    require_digits("agency", &account.agency)?;
    require_digits("account", &account.account)?;
    require_digits("wallet code", &account.wallet_code)?;
    require_digits("assignor code", &account.assignor_code)?;

    if account.assignor_name.trim().is_empty() {
        return Err(BillingError::MissingBankConfig(
            "assignor name is empty".to_string(),
        ));
    }
    if account.bank_code == 0 {
        return Err(BillingError::MissingBankConfig(
            "bank code is not set".to_string(),
        ));
    }

    Ok(())
}

/// Validate an installment before it enters a batch or the store
pub fn validate_installment(installment: &Installment) -> BillingResult<()> {
    use bigdecimal::BigDecimal;

    if installment.face_value <= BigDecimal::from(0) {
        return Err(BillingError::Storage(format!(
            "installment {} has a non-positive face value",
            installment.nosso_numero
        )));
    }
    if installment.nosso_numero.len() != 11
        || !installment
            .nosso_numero
            .chars()
            .all(|c| c.is_ascii_digit())
    {
        return Err(BillingError::Storage(format!(
            "installment {} must carry an 11-digit document number",
            installment.nosso_numero
        )));
    }
    if installment.contract_code.trim().is_empty() {
        return Err(BillingError::Storage(
            "installment has no contract code".to_string(),
        ));
    }

    Ok(())
}

fn require_digits(field: &str, value: &str) -> BillingResult<()> {
    if value.trim().is_empty() {
        return Err(BillingError::MissingBankConfig(format!(
            "{field} is empty"
        )));
    }
    if !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(BillingError::MissingBankConfig(format!(
            "{field} '{value}' must contain only digits"
        )));
    }
    Ok(())
}
