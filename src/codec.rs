//! Fixed-width field encoding and decoding for bank batch files
//!
//! Bank layouts are position-based: numeric fields are zero-padded and
//! right-aligned, text fields are space-padded and left-aligned, monetary
//! fields travel as unsigned integer cents. Text is reduced to 7-bit
//! (upper-cased, diacritics stripped) since bank files do not carry
//! accented characters.

use bigdecimal::rounding::RoundingMode;
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::NaiveDate;

/// Date layouts used by the supported bank formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePattern {
    /// Six digits, day-month-year (`ddmmyy`)
    DdMmYy,
    /// Eight digits, year-month-day (`yyyymmdd`)
    YyyyMmDd,
}

impl DatePattern {
    /// chrono format string for this pattern
    pub fn format_str(&self) -> &'static str {
        match self {
            DatePattern::DdMmYy => "%d%m%y",
            DatePattern::YyyyMmDd => "%Y%m%d",
        }
    }

    /// Encoded width in characters
    pub fn width(&self) -> usize {
        match self {
            DatePattern::DdMmYy => 6,
            DatePattern::YyyyMmDd => 8,
        }
    }
}

/// Field-level encoding and decoding errors
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("value '{value}' does not fit numeric field of width {width}")]
    Overflow { value: String, width: usize },
    #[error("mandatory date field '{0}' is missing")]
    MissingDate(&'static str),
    #[error("invalid numeric field '{0}'")]
    InvalidNumeric(String),
    #[error("invalid date field '{0}'")]
    InvalidDate(String),
}

/// Encode an unsigned number as zero-padded digits, right-aligned
///
/// Fails rather than truncating: a truncated numeric field would corrupt
/// monetary data silently.
pub fn numeric(value: u64, width: usize) -> Result<String, FieldError> {
    let digits = value.to_string();
    if digits.len() > width {
        return Err(FieldError::Overflow {
            value: digits,
            width,
        });
    }
    Ok(format!("{digits:0>width$}"))
}

/// Encode a digit string as a zero-padded numeric field
///
/// Non-digit characters are rejected; bank numeric fields never carry
/// letters or punctuation.
pub fn numeric_str(value: &str, width: usize) -> Result<String, FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(FieldError::InvalidNumeric(value.to_string()));
    }
    if trimmed.len() > width {
        return Err(FieldError::Overflow {
            value: trimmed.to_string(),
            width,
        });
    }
    Ok(format!("{trimmed:0>width$}"))
}

/// Encode text left-aligned, upper-cased and stripped to 7-bit,
/// space-padded or truncated to the field width
pub fn text(value: &str, width: usize) -> String {
    let mut cleaned: String = value
        .chars()
        .map(strip_diacritic)
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect::<String>()
        .to_uppercase();
    cleaned.truncate(width);
    format!("{cleaned:<width$}")
}

/// Encode a mandatory date field
pub fn date(
    value: Option<NaiveDate>,
    pattern: DatePattern,
    field: &'static str,
) -> Result<String, FieldError> {
    let value = value.ok_or(FieldError::MissingDate(field))?;
    Ok(value.format(pattern.format_str()).to_string())
}

/// Encode a monetary amount as zero-padded integer cents
///
/// Rounds half-up to the cent before encoding; the integer conversion
/// guarantees no floating drift. Negative amounts cannot be represented
/// in an unsigned bank field.
pub fn currency_cents(value: &BigDecimal, width: usize) -> Result<String, FieldError> {
    let cents = (value * BigDecimal::from(100)).with_scale_round(0, RoundingMode::HalfUp);
    let cents = cents.to_u64().ok_or_else(|| FieldError::Overflow {
        value: value.to_string(),
        width,
    })?;
    numeric(cents, width)
}

/// Decode a zero-padded numeric field
pub fn decode_numeric(raw: &str) -> Result<u64, FieldError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed
        .parse::<u64>()
        .map_err(|_| FieldError::InvalidNumeric(raw.to_string()))
}

/// Decode integer cents into a two-decimal amount
pub fn decode_currency(raw: &str) -> Result<BigDecimal, FieldError> {
    let cents = decode_numeric(raw)?;
    Ok(BigDecimal::from(cents) / BigDecimal::from(100))
}

/// Decode a date field
pub fn decode_date(raw: &str, pattern: DatePattern) -> Result<NaiveDate, FieldError> {
    NaiveDate::parse_from_str(raw, pattern.format_str())
        .map_err(|_| FieldError::InvalidDate(raw.to_string()))
}

/// Decode a date field where all zeros means "not informed"
pub fn decode_optional_date(
    raw: &str,
    pattern: DatePattern,
) -> Result<Option<NaiveDate>, FieldError> {
    if raw.chars().all(|c| c == '0') {
        return Ok(None);
    }
    decode_date(raw, pattern).map(Some)
}

/// Decode a space-padded text field, dropping the trailing padding
pub fn decode_text(raw: &str) -> String {
    raw.trim_end().to_string()
}

/// Transliterate one accented Latin-1 character to its ASCII base
fn strip_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'ç' | 'Ç' => 'C',
        'ñ' | 'Ñ' => 'N',
        _ => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_numeric_pads_to_width() {
        assert_eq!(numeric(42, 6).unwrap(), "000042");
        assert_eq!(numeric(0, 4).unwrap(), "0000");
    }

    #[test]
    fn test_numeric_rejects_overflow() {
        let err = numeric(1234567, 6).unwrap_err();
        assert!(matches!(err, FieldError::Overflow { width: 6, .. }));
    }

    #[test]
    fn test_numeric_str_rejects_non_digits() {
        assert!(numeric_str("12A4", 6).is_err());
        assert_eq!(numeric_str("123", 6).unwrap(), "000123");
    }

    #[test]
    fn test_text_uppercases_and_strips_accents() {
        assert_eq!(text("José Áurea", 12), "JOSE AUREA  ");
        assert_eq!(text("Conceição", 9), "CONCEICAO");
    }

    #[test]
    fn test_text_truncates_to_width() {
        assert_eq!(text("MUNICIPALIDADE", 5), "MUNIC");
    }

    #[test]
    fn test_date_patterns() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        assert_eq!(date(Some(d), DatePattern::DdMmYy, "due").unwrap(), "310124");
        assert_eq!(
            date(Some(d), DatePattern::YyyyMmDd, "due").unwrap(),
            "20240131"
        );
    }

    #[test]
    fn test_date_missing_is_an_error() {
        let err = date(None, DatePattern::DdMmYy, "due_date").unwrap_err();
        assert!(matches!(err, FieldError::MissingDate("due_date")));
    }

    #[test]
    fn test_currency_cents_rounds_half_up() {
        let value = BigDecimal::from_str("1234.567").unwrap();
        assert_eq!(currency_cents(&value, 13).unwrap(), "0000000123457");
        let value = BigDecimal::from_str("0.004").unwrap();
        assert_eq!(currency_cents(&value, 13).unwrap(), "0000000000000");
    }

    #[test]
    fn test_currency_cents_rejects_negative() {
        let value = BigDecimal::from(-10);
        assert!(currency_cents(&value, 13).is_err());
    }

    #[test]
    fn test_currency_round_trip_to_the_cent() {
        let value = BigDecimal::from_str("987.65").unwrap();
        let encoded = currency_cents(&value, 13).unwrap();
        assert_eq!(decode_currency(&encoded).unwrap(), value);
    }

    #[test]
    fn test_decode_optional_date_treats_zeros_as_absent() {
        assert_eq!(
            decode_optional_date("000000", DatePattern::DdMmYy).unwrap(),
            None
        );
        assert_eq!(
            decode_optional_date("150324", DatePattern::DdMmYy).unwrap(),
            Some(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
        );
    }

    #[test]
    fn test_decode_numeric_rejects_garbage() {
        assert!(decode_numeric("12x4").is_err());
        assert_eq!(decode_numeric("000042").unwrap(), 42);
    }
}
