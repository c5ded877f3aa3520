//! Return-file parsing
//!
//! A return file reports, line by line, what the bank did with each
//! charge. One bad line must never sink the file: undecodable lines are
//! collected as [`LineError`] entries keyed by line number while parsing
//! continues, so the caller always gets every record that did decode.

use tracing::debug;

use crate::codec::{self, DatePattern, FieldError};
use crate::remittance::layout::LINE_WIDTH;
use crate::types::{ReturnDetail, ReturnOutcome, ReturnRecord};

/// Byte offsets of the inbound detail record fields
mod offsets {
    use std::ops::Range;

    pub const NOSSO_NUMERO: Range<usize> = 18..30;
    pub const CONTRACT_CODE: Range<usize> = 30..40;
    pub const OCCURRENCE: Range<usize> = 40..42;
    pub const PAYMENT_DATE: Range<usize> = 42..48;
    pub const PAID_VALUE: Range<usize> = 48..61;
    pub const BANK_FEE: Range<usize> = 61..74;
    pub const DISCOUNT: Range<usize> = 74..87;
    pub const INTEREST: Range<usize> = 87..100;
    pub const MOTIVE: Range<usize> = 100..103;
    pub const SEQUENCE: Range<usize> = 394..400;

    pub const HEADER_BANK_CODE: Range<usize> = 76..79;
    pub const HEADER_GENERATION_DATE: Range<usize> = 94..100;
}

/// Reason one line of a return file could not be decoded
#[derive(Debug, thiserror::Error)]
pub enum LineErrorKind {
    #[error("record has length {actual}, expected {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("record is not 7-bit ASCII")]
    NonAscii,
    #[error("unknown record type '{0}'")]
    UnknownRecordType(char),
    #[error("{0}")]
    Decode(#[from] FieldError),
}

/// A per-line parse failure, keyed by 1-based line number
#[derive(Debug, thiserror::Error)]
#[error("line {line_number}: {kind}")]
pub struct LineError {
    pub line_number: usize,
    pub kind: LineErrorKind,
}

/// Everything a return file yielded: decoded records plus the lines
/// that failed
#[derive(Debug, Default)]
pub struct ReturnParseOutcome {
    /// Records in file order
    pub records: Vec<ReturnRecord>,
    /// Lines that could not be decoded
    pub errors: Vec<LineError>,
}

impl ReturnParseOutcome {
    /// Detail records only, in file order
    pub fn details(&self) -> impl Iterator<Item = &ReturnDetail> {
        self.records.iter().filter_map(ReturnRecord::as_detail)
    }
}

/// Parser for inbound bank return files
pub struct ReturnFileParser;

impl ReturnFileParser {
    /// Parse a whole return file
    ///
    /// Blank lines (common as a trailing artifact of transmission) are
    /// skipped. Every other line either becomes a record or a
    /// [`LineError`]; the file as a whole never fails.
    pub fn parse(contents: &str) -> ReturnParseOutcome {
        let mut outcome = ReturnParseOutcome::default();

        for (index, line) in contents.lines().enumerate() {
            let line_number = index + 1;
            if line.is_empty() {
                continue;
            }
            match Self::parse_line(line, line_number) {
                Ok(record) => outcome.records.push(record),
                Err(error) => {
                    debug!(line = line_number, error = %error, "return line rejected");
                    outcome.errors.push(error);
                }
            }
        }

        outcome
    }

    fn parse_line(line: &str, line_number: usize) -> Result<ReturnRecord, LineError> {
        let fail = |kind: LineErrorKind| LineError { line_number, kind };

        if !line.is_ascii() {
            return Err(fail(LineErrorKind::NonAscii));
        }
        if line.len() != LINE_WIDTH {
            return Err(fail(LineErrorKind::LengthMismatch {
                expected: LINE_WIDTH,
                actual: line.len(),
            }));
        }

        match line.as_bytes()[0] {
            b'0' => Self::parse_header(line, line_number).map_err(|e| fail(e.into())),
            b'1' => Self::parse_detail(line, line_number).map_err(|e| fail(e.into())),
            b'9' => Self::parse_trailer(line, line_number).map_err(|e| fail(e.into())),
            other => Err(fail(LineErrorKind::UnknownRecordType(other as char))),
        }
    }

    fn parse_header(line: &str, line_number: usize) -> Result<ReturnRecord, FieldError> {
        let bank_code = codec::decode_numeric(&line[offsets::HEADER_BANK_CODE])? as u16;
        let generated_on = codec::decode_optional_date(
            &line[offsets::HEADER_GENERATION_DATE],
            DatePattern::DdMmYy,
        )?;
        Ok(ReturnRecord::Header {
            line_number,
            bank_code,
            generated_on,
        })
    }

    fn parse_detail(line: &str, line_number: usize) -> Result<ReturnRecord, FieldError> {
        let occurrence_code = line[offsets::OCCURRENCE].to_string();
        let outcome = ReturnOutcome::from_occurrence_code(&occurrence_code);

        let motive = codec::decode_text(&line[offsets::MOTIVE]);
        let motive_code = if outcome == ReturnOutcome::Rejected && !motive.is_empty() {
            Some(motive)
        } else {
            None
        };

        Ok(ReturnRecord::Detail(ReturnDetail {
            line_number,
            nosso_numero: line[offsets::NOSSO_NUMERO].to_string(),
            contract_code: codec::decode_text(&line[offsets::CONTRACT_CODE]),
            occurrence_code,
            outcome,
            payment_date: codec::decode_optional_date(
                &line[offsets::PAYMENT_DATE],
                DatePattern::DdMmYy,
            )?,
            paid_value: Some(codec::decode_currency(&line[offsets::PAID_VALUE])?),
            bank_fee: Some(codec::decode_currency(&line[offsets::BANK_FEE])?),
            discount: Some(codec::decode_currency(&line[offsets::DISCOUNT])?),
            interest: Some(codec::decode_currency(&line[offsets::INTEREST])?),
            motive_code,
        }))
    }

    fn parse_trailer(line: &str, line_number: usize) -> Result<ReturnRecord, FieldError> {
        let sequence = codec::decode_numeric(&line[offsets::SEQUENCE])? as usize;
        Ok(ReturnRecord::Trailer {
            line_number,
            sequence,
        })
    }
}
