//! Overdue penalty and interest accrual
//!
//! Every place that displays or persists penalty and interest - remittance
//! generation, manual settlement and balance queries - goes through this
//! one calculation. The business rule is a flat one-time penalty plus
//! interest that accrues linearly per day over a 30-day commercial month,
//! regardless of the actual calendar month length.

use bigdecimal::rounding::RoundingMode;
use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{BankAccount, Installment};

/// Number of whole days an installment is overdue at the reference date
///
/// Date-only arithmetic; never negative.
pub fn days_late(due_date: NaiveDate, reference_date: NaiveDate) -> i64 {
    (reference_date - due_date).num_days().max(0)
}

/// Penalty and interest accrued on one installment as of a reference date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Accrual {
    /// Flat overdue penalty
    pub penalty: BigDecimal,
    /// Prorated overdue interest
    pub interest: BigDecimal,
}

impl Accrual {
    /// An accrual of zero penalty and zero interest
    pub fn zero() -> Self {
        Self {
            penalty: BigDecimal::from(0),
            interest: BigDecimal::from(0),
        }
    }

    /// Calculate penalty and interest for one installment
    ///
    /// Rules:
    /// - already paid, or not yet past due: both outputs are zero
    /// - penalty is the full flat percentage from the first overdue day,
    ///   not prorated
    /// - interest is `face * rate% * days_late / 30`
    ///
    /// Both outputs are rounded half-up to the cent.
    pub fn calculate(
        face_value: &BigDecimal,
        penalty_rate_pct: &BigDecimal,
        interest_rate_pct: &BigDecimal,
        due_date: NaiveDate,
        reference_date: NaiveDate,
        already_paid: bool,
    ) -> Self {
        if already_paid || reference_date <= due_date {
            return Self::zero();
        }

        let days = days_late(due_date, reference_date);
        let hundred = BigDecimal::from(100);

        let penalty =
            (face_value * penalty_rate_pct / &hundred).with_scale_round(2, RoundingMode::HalfUp);

        let interest = (face_value * interest_rate_pct / &hundred * BigDecimal::from(days)
            / BigDecimal::from(30))
        .with_scale_round(2, RoundingMode::HalfUp);

        Self { penalty, interest }
    }

    /// Calculate using the rates configured on the collection account
    pub fn for_installment(
        installment: &Installment,
        account: &BankAccount,
        reference_date: NaiveDate,
    ) -> Self {
        Self::calculate(
            &installment.face_value,
            &account.monthly_penalty_rate,
            &account.monthly_interest_rate,
            installment.due_date,
            reference_date,
            installment.paid,
        )
    }

    /// Penalty plus interest
    pub fn total(&self) -> BigDecimal {
        &self.penalty + &self.interest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_full_month_late() {
        let accrual = Accrual::calculate(
            &BigDecimal::from_str("1000.00").unwrap(),
            &BigDecimal::from(2),
            &BigDecimal::from(3),
            ymd(2024, 1, 1),
            ymd(2024, 1, 31),
            false,
        );
        assert_eq!(accrual.penalty, BigDecimal::from_str("20.00").unwrap());
        assert_eq!(accrual.interest, BigDecimal::from_str("30.00").unwrap());
        assert_eq!(accrual.total(), BigDecimal::from(50));
    }

    #[test]
    fn test_on_the_due_date_nothing_accrues() {
        let accrual = Accrual::calculate(
            &BigDecimal::from_str("1000.00").unwrap(),
            &BigDecimal::from(2),
            &BigDecimal::from(3),
            ymd(2024, 1, 1),
            ymd(2024, 1, 1),
            false,
        );
        assert_eq!(accrual, Accrual::zero());
    }

    #[test]
    fn test_already_paid_accrues_nothing_regardless_of_dates() {
        let accrual = Accrual::calculate(
            &BigDecimal::from_str("1000.00").unwrap(),
            &BigDecimal::from(2),
            &BigDecimal::from(3),
            ymd(2024, 1, 1),
            ymd(2025, 6, 30),
            true,
        );
        assert_eq!(accrual, Accrual::zero());
    }

    #[test]
    fn test_penalty_is_flat_from_the_first_overdue_day() {
        let accrual = Accrual::calculate(
            &BigDecimal::from_str("1000.00").unwrap(),
            &BigDecimal::from(2),
            &BigDecimal::from(3),
            ymd(2024, 1, 1),
            ymd(2024, 1, 2),
            false,
        );
        // one day late: full penalty, one day of interest
        assert_eq!(accrual.penalty, BigDecimal::from_str("20.00").unwrap());
        assert_eq!(accrual.interest, BigDecimal::from_str("0.10").unwrap());
    }

    #[test]
    fn test_interest_prorates_over_a_30_day_month() {
        let accrual = Accrual::calculate(
            &BigDecimal::from_str("1000.00").unwrap(),
            &BigDecimal::from(2),
            &BigDecimal::from(3),
            ymd(2024, 1, 1),
            ymd(2024, 1, 16),
            false,
        );
        // 15 of 30 days: half the monthly interest
        assert_eq!(accrual.interest, BigDecimal::from_str("15.00").unwrap());
    }

    #[test]
    fn test_interest_rounds_half_up_to_the_cent() {
        let accrual = Accrual::calculate(
            &BigDecimal::from_str("333.33").unwrap(),
            &BigDecimal::from(0),
            &BigDecimal::from(1),
            ymd(2024, 1, 1),
            ymd(2024, 1, 8),
            false,
        );
        // 333.33 * 1% * 7/30 = 0.77777, rounds to 0.78
        assert_eq!(accrual.interest, BigDecimal::from_str("0.78").unwrap());
    }

    #[test]
    fn test_days_late_never_negative() {
        assert_eq!(days_late(ymd(2024, 1, 10), ymd(2024, 1, 5)), 0);
        assert_eq!(days_late(ymd(2024, 1, 1), ymd(2024, 1, 31)), 30);
    }
}
