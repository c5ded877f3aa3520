//! Bank layout strategy and shared CNAB-400 record structure
//!
//! Each supported bank implements [`BankLayout`]; the concrete
//! implementations differ in bank identity and check-digit algorithm
//! while sharing the 400-column record structure assembled here.

use chrono::NaiveDate;

use crate::accrual::Accrual;
use crate::codec::{self, DatePattern, FieldError};
use crate::types::{BankAccount, BillingError, BillingResult, Installment, RemittanceBatch};

/// Fixed record width of the supported layouts
pub const LINE_WIDTH: usize = 400;

/// Occurrence code stamped on outbound details: new entry
pub const OCCURRENCE_NEW_ENTRY: &str = "01";

/// Byte offsets of the outbound detail record fields, shared by the
/// builders and the round-trip tests
pub mod detail {
    use std::ops::Range;

    pub const AGENCY: Range<usize> = 1..6;
    pub const AGENCY_DIGIT: Range<usize> = 6..7;
    pub const ACCOUNT: Range<usize> = 7..14;
    pub const ACCOUNT_DIGIT: Range<usize> = 14..15;
    pub const WALLET: Range<usize> = 15..18;
    pub const NOSSO_NUMERO: Range<usize> = 18..30;
    pub const CONTRACT_CODE: Range<usize> = 30..40;
    pub const OCCURRENCE: Range<usize> = 40..42;
    pub const DUE_DATE: Range<usize> = 42..48;
    pub const FACE_VALUE: Range<usize> = 48..61;
    pub const BANK_CODE: Range<usize> = 61..64;
    pub const ISSUE_DATE: Range<usize> = 64..70;
    pub const INTEREST: Range<usize> = 70..83;
    pub const DISCOUNT: Range<usize> = 83..96;
    pub const PENALTY: Range<usize> = 96..109;
    pub const PAYER_NAME: Range<usize> = 109..149;
    pub const PAYER_ADDRESS: Range<usize> = 149..189;
    pub const PAYER_NEIGHBORHOOD: Range<usize> = 189..201;
    pub const PAYER_CITY: Range<usize> = 201..216;
    pub const PAYER_STATE: Range<usize> = 216..218;
    pub const PAYER_POSTAL_CODE: Range<usize> = 218..226;
    pub const SEQUENCE: Range<usize> = 394..400;
}

/// Bank-specific remittance record building
///
/// One implementation per supported bank, selected by bank code at
/// batch-build time. Implementations share the record structure and vary
/// in identity and check-digit rules.
pub trait BankLayout: std::fmt::Debug + Send + Sync {
    /// Numeric bank code this layout serves
    fn bank_code(&self) -> u16;

    /// Bank name stamped on the file header
    fn bank_name(&self) -> &'static str;

    /// Fixed record width of the layout
    fn line_width(&self) -> usize {
        LINE_WIDTH
    }

    /// Check digit the bank expects appended to the nosso número
    fn check_digit(&self, account: &BankAccount, nosso_numero: &str) -> char;

    /// Build the file header record, sequence 1
    fn build_header(
        &self,
        account: &BankAccount,
        batch: &RemittanceBatch,
    ) -> BillingResult<String> {
        assemble_header(self.bank_code(), self.bank_name(), account, batch.generation_date)
            .map_err(BillingError::from)
    }

    /// Build one detail record for an installment
    fn build_detail(
        &self,
        account: &BankAccount,
        batch: &RemittanceBatch,
        installment: &Installment,
        accrual: &Accrual,
        sequence: usize,
    ) -> BillingResult<String> {
        let digit = self.check_digit(account, &installment.nosso_numero);
        assemble_detail(
            self.bank_code(),
            account,
            installment,
            accrual,
            digit,
            batch.generation_date,
            sequence,
        )
        .map_err(|source| BillingError::InstallmentField {
            nosso_numero: installment.nosso_numero.clone(),
            source,
        })
    }

    /// Build the file trailer record with the final sequence number
    fn build_trailer(&self, sequence: usize) -> BillingResult<String> {
        assemble_trailer(sequence).map_err(BillingError::from)
    }
}

/// Select the layout for a bank code
pub fn layout_for(bank_code: u16) -> BillingResult<Box<dyn BankLayout>> {
    match bank_code {
        super::bradesco::BANK_CODE => Ok(Box::new(super::bradesco::Bradesco)),
        super::itau::BANK_CODE => Ok(Box::new(super::itau::Itau)),
        other => Err(BillingError::UnsupportedBank(other)),
    }
}

fn assemble_header(
    bank_code: u16,
    bank_name: &str,
    account: &BankAccount,
    generation_date: NaiveDate,
) -> Result<String, FieldError> {
    let mut line = String::with_capacity(LINE_WIDTH);
    line.push('0');
    line.push('1');
    line.push_str("REMESSA");
    line.push_str("01");
    line.push_str(&codec::text("COBRANCA", 15));
    line.push_str(&codec::numeric_str(&account.assignor_code, 20)?);
    line.push_str(&codec::text(&account.assignor_name, 30));
    line.push_str(&codec::numeric(u64::from(bank_code), 3)?);
    line.push_str(&codec::text(bank_name, 15));
    line.push_str(&codec::date(
        Some(generation_date),
        DatePattern::DdMmYy,
        "generation_date",
    )?);
    line.push_str(&" ".repeat(294));
    line.push_str(&codec::numeric(1, 6)?);
    Ok(line)
}

#[allow(clippy::too_many_arguments)]
fn assemble_detail(
    bank_code: u16,
    account: &BankAccount,
    installment: &Installment,
    accrual: &Accrual,
    check_digit: char,
    issue_date: NaiveDate,
    sequence: usize,
) -> Result<String, FieldError> {
    let mut line = String::with_capacity(LINE_WIDTH);
    line.push('1');
    line.push_str(&codec::numeric_str(&account.agency, 5)?);
    line.push_str(&codec::text(&account.agency_digit, 1));
    line.push_str(&codec::numeric_str(&account.account, 7)?);
    line.push_str(&codec::text(&account.account_digit, 1));
    line.push_str(&codec::numeric_str(&account.wallet_code, 3)?);
    line.push_str(&codec::numeric_str(&installment.nosso_numero, 11)?);
    line.push(check_digit);
    line.push_str(&codec::text(&installment.contract_code, 10));
    line.push_str(OCCURRENCE_NEW_ENTRY);
    line.push_str(&codec::date(
        Some(installment.due_date),
        DatePattern::DdMmYy,
        "due_date",
    )?);
    line.push_str(&codec::currency_cents(&installment.face_value, 13)?);
    line.push_str(&codec::numeric(u64::from(bank_code), 3)?);
    line.push_str(&codec::date(Some(issue_date), DatePattern::DdMmYy, "issue_date")?);
    line.push_str(&codec::currency_cents(&accrual.interest, 13)?);
    line.push_str(&codec::currency_cents(&installment.discount, 13)?);
    line.push_str(&codec::currency_cents(&accrual.penalty, 13)?);
    line.push_str(&codec::text(&installment.payer.name, 40));
    line.push_str(&codec::text(&installment.payer.address, 40));
    line.push_str(&codec::text(&installment.payer.neighborhood, 12));
    line.push_str(&codec::text(&installment.payer.city, 15));
    line.push_str(&codec::text(&installment.payer.state, 2));
    line.push_str(&codec::text(&installment.payer.postal_code, 8));
    line.push_str(&" ".repeat(168));
    line.push_str(&codec::numeric(sequence as u64, 6)?);
    Ok(line)
}

fn assemble_trailer(sequence: usize) -> Result<String, FieldError> {
    let mut line = String::with_capacity(LINE_WIDTH);
    line.push('9');
    line.push_str(&" ".repeat(393));
    line.push_str(&codec::numeric(sequence as u64, 6)?);
    Ok(line)
}
