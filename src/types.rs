//! Core types and data structures for the billing system

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::codec::FieldError;

/// Payer data carried on every remittance detail record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payer {
    /// Full payer name
    pub name: String,
    /// Street address
    pub address: String,
    /// Neighborhood / district
    pub neighborhood: String,
    /// City
    pub city: String,
    /// Two-letter state code
    pub state: String,
    /// Postal code (digits only)
    pub postal_code: String,
}

/// A billing installment (título) owed by a taxpayer
///
/// Created by the billing-generation collaborator; mutated only by manual
/// settlement or by the reconciliation engine. Installments are never
/// deleted, only reversed back to unpaid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    /// Unique identifier for the installment
    pub id: Uuid,
    /// Generated title number shown on statements
    pub title_number: String,
    /// Code of the contract this installment belongs to
    pub contract_code: String,
    /// Date the installment falls due
    pub due_date: NaiveDate,
    /// Face value of the installment
    pub face_value: BigDecimal,
    /// Whether the installment has been settled
    pub paid: bool,
    /// Date the bank registered the payment
    pub payment_date: Option<NaiveDate>,
    /// Date the payment was settled in the system
    pub settlement_date: Option<NaiveDate>,
    /// Accrued overdue penalty
    pub penalty: BigDecimal,
    /// Accrued overdue interest
    pub interest: BigDecimal,
    /// Fee charged by the bank for collection
    pub bank_fee: BigDecimal,
    /// Discount granted on settlement
    pub discount: BigDecimal,
    /// Amount effectively paid
    pub paid_amount: Option<BigDecimal>,
    /// Free-text note
    pub note: Option<String>,
    /// Bank-assigned document number, the reconciliation join key
    pub nosso_numero: String,
    /// Payer data for the remittance detail record
    pub payer: Payer,
    /// When the installment was created
    pub created_at: NaiveDateTime,
    /// When the installment was last updated
    pub updated_at: NaiveDateTime,
}

impl Installment {
    /// Create a new unpaid installment
    pub fn new(
        title_number: String,
        contract_code: String,
        due_date: NaiveDate,
        face_value: BigDecimal,
        nosso_numero: String,
        payer: Payer,
    ) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4(),
            title_number,
            contract_code,
            due_date,
            face_value,
            paid: false,
            payment_date: None,
            settlement_date: None,
            penalty: BigDecimal::from(0),
            interest: BigDecimal::from(0),
            bank_fee: BigDecimal::from(0),
            discount: BigDecimal::from(0),
            paid_amount: None,
            note: None,
            nosso_numero,
            payer,
            created_at: now,
            updated_at: now,
        }
    }

    /// Mark the installment as settled
    pub fn apply_settlement(
        &mut self,
        payment_date: NaiveDate,
        settlement_date: NaiveDate,
        paid_amount: BigDecimal,
    ) {
        self.paid = true;
        self.payment_date = Some(payment_date);
        self.settlement_date = Some(settlement_date);
        self.paid_amount = Some(paid_amount);
        self.updated_at = chrono::Utc::now().naive_utc();
    }

    /// Revert a settlement, returning the installment to unpaid
    pub fn reverse_settlement(&mut self) {
        self.paid = false;
        self.payment_date = None;
        self.settlement_date = None;
        self.paid_amount = None;
        self.penalty = BigDecimal::from(0);
        self.interest = BigDecimal::from(0);
        self.discount = BigDecimal::from(0);
        self.updated_at = chrono::Utc::now().naive_utc();
    }
}

/// Bank account configuration for a collection agreement
///
/// Read-only input to the core; immutable during one batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankAccount {
    /// Unique identifier for the account
    pub id: Uuid,
    /// Numeric bank code (e.g. 237, 341)
    pub bank_code: u16,
    /// Agency number (digits only)
    pub agency: String,
    /// Agency check digit
    pub agency_digit: String,
    /// Account number (digits only)
    pub account: String,
    /// Account check digit
    pub account_digit: String,
    /// Assignor code issued by the bank
    pub assignor_code: String,
    /// Assignor name printed on the file header
    pub assignor_name: String,
    /// Wallet / portfolio code for the collection product
    pub wallet_code: String,
    /// Monthly overdue penalty rate, percent
    pub monthly_penalty_rate: BigDecimal,
    /// Monthly overdue interest rate, percent
    pub monthly_interest_rate: BigDecimal,
    /// Directory where remittance files are written
    pub remittance_dir: PathBuf,
    /// Directory where return files are read from
    pub return_dir: PathBuf,
}

/// Ephemeral aggregate for one remittance generation run
///
/// Created per generation request and discarded after the file is
/// written; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemittanceBatch {
    /// Numeric code of the destination bank
    pub bank_code: u16,
    /// Date the batch is generated
    pub generation_date: NaiveDate,
    /// Installments to charge, in file order
    pub installments: Vec<Installment>,
}

impl RemittanceBatch {
    /// Create a batch for the given bank and date
    pub fn new(bank_code: u16, generation_date: NaiveDate, installments: Vec<Installment>) -> Self {
        Self {
            bank_code,
            generation_date,
            installments,
        }
    }

    /// Total number of lines the batch will emit (header + details + trailer)
    pub fn total_lines(&self) -> usize {
        self.installments.len() + 2
    }
}

/// Kind of a fixed-width record, taken from the first character of the line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordType {
    /// File header, first line
    Header,
    /// One charge / one charge outcome
    Detail,
    /// File trailer, last line
    Trailer,
}

/// Semantic outcome of a return-file occurrence code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReturnOutcome {
    /// The bank accepted the charge for collection
    EntryConfirmed,
    /// The charge was paid in full
    Paid,
    /// The charge was paid with a discount
    PaidWithDiscount,
    /// The charge was written off by the bank
    WrittenOff,
    /// The bank rejected the charge
    Rejected,
    /// Occurrence code with no known mapping; retained, never dropped
    Unknown,
}

impl ReturnOutcome {
    /// Map a two-digit occurrence code onto the closed outcome set
    pub fn from_occurrence_code(code: &str) -> Self {
        match code {
            "02" => ReturnOutcome::EntryConfirmed,
            "03" => ReturnOutcome::Rejected,
            "06" => ReturnOutcome::Paid,
            "08" => ReturnOutcome::PaidWithDiscount,
            "09" | "10" => ReturnOutcome::WrittenOff,
            _ => ReturnOutcome::Unknown,
        }
    }
}

/// One decoded charge outcome from a return file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnDetail {
    /// Line number in the source file, 1-based
    pub line_number: usize,
    /// Nosso número as transmitted (11 digits + bank check digit)
    pub nosso_numero: String,
    /// Contract code echoed back as "seu número"
    pub contract_code: String,
    /// Raw two-digit occurrence code
    pub occurrence_code: String,
    /// Semantic outcome of the occurrence code
    pub outcome: ReturnOutcome,
    /// Date the payment happened at the bank
    pub payment_date: Option<NaiveDate>,
    /// Amount effectively collected
    pub paid_value: Option<BigDecimal>,
    /// Collection fee charged by the bank
    pub bank_fee: Option<BigDecimal>,
    /// Discount granted at the teller
    pub discount: Option<BigDecimal>,
    /// Overdue interest collected
    pub interest: Option<BigDecimal>,
    /// Bank motive code, present when the occurrence is a rejection
    pub motive_code: Option<String>,
}

impl ReturnDetail {
    /// The 11-digit document number used to match an installment,
    /// without the bank check digit
    pub fn base_nosso_numero(&self) -> &str {
        if self.nosso_numero.len() > 11 {
            &self.nosso_numero[..11]
        } else {
            &self.nosso_numero
        }
    }
}

/// A decoded line from an inbound return file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReturnRecord {
    /// File header line
    Header {
        /// Line number in the source file, 1-based
        line_number: usize,
        /// Bank code declared on the header
        bank_code: u16,
        /// Date the bank generated the file
        generated_on: Option<NaiveDate>,
    },
    /// One charge outcome
    Detail(ReturnDetail),
    /// File trailer line
    Trailer {
        /// Line number in the source file, 1-based
        line_number: usize,
        /// Final sequence number declared on the trailer
        sequence: usize,
    },
}

impl ReturnRecord {
    /// Record kind of this line
    pub fn record_type(&self) -> RecordType {
        match self {
            ReturnRecord::Header { .. } => RecordType::Header,
            ReturnRecord::Detail(_) => RecordType::Detail,
            ReturnRecord::Trailer { .. } => RecordType::Trailer,
        }
    }

    /// The detail payload, when this line is a detail record
    pub fn as_detail(&self) -> Option<&ReturnDetail> {
        match self {
            ReturnRecord::Detail(detail) => Some(detail),
            _ => None,
        }
    }
}

/// Errors that can occur in the billing core
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    #[error("field encoding failed: {0}")]
    Field(#[from] FieldError),
    #[error("field encoding failed for installment {nosso_numero}: {source}")]
    InstallmentField {
        nosso_numero: String,
        source: FieldError,
    },
    #[error("missing bank configuration: {0}")]
    MissingBankConfig(String),
    #[error("unsupported bank code: {0}")]
    UnsupportedBank(u16),
    #[error("remittance generation already running for account {account_id} on {period}")]
    BatchInProgress { account_id: Uuid, period: NaiveDate },
    #[error("output directory unavailable: {path}: {reason}")]
    DirectoryUnavailable { path: PathBuf, reason: String },
    #[error("record {line_number} has length {actual}, expected {expected}")]
    RecordLength {
        line_number: usize,
        expected: usize,
        actual: usize,
    },
    #[error("installment not found: {0}")]
    TitleNotFound(String),
    #[error("installment {0} is already settled")]
    AlreadySettled(Uuid),
    #[error("installment {0} is not settled")]
    NotSettled(Uuid),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for billing operations
pub type BillingResult<T> = Result<T, BillingError>;
