//! Period-return math over historical snapshots.
//!
//! The calculator compares the current ledger value against the most recent
//! snapshot at or before each period's target date. Finding that snapshot is
//! the repository's job; the arithmetic lives here.

use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::Decimal;

/// Fixed look-back windows reported by the returns endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    OneDay,
    SevenDays,
    FifteenDays,
    ThirtyDays,
    SixMonths,
    OneYear,
}

impl Period {
    pub const ALL: [Period; 6] = [
        Period::OneDay,
        Period::SevenDays,
        Period::FifteenDays,
        Period::ThirtyDays,
        Period::SixMonths,
        Period::OneYear,
    ];

    /// Wire label used as the key in the returns map.
    pub fn label(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::SevenDays => "7d",
            Period::FifteenDays => "15d",
            Period::ThirtyDays => "30d",
            Period::SixMonths => "6m",
            Period::OneYear => "1y",
        }
    }

    /// The date this period looks back to from `today`. Month-based periods
    /// subtract calendar months, day-based ones subtract days.
    pub fn target_date(&self, today: NaiveDate) -> NaiveDate {
        match self {
            Period::OneDay => today - Days::new(1),
            Period::SevenDays => today - Days::new(7),
            Period::FifteenDays => today - Days::new(15),
            Period::ThirtyDays => today - Days::new(30),
            Period::SixMonths => today - Months::new(6),
            Period::OneYear => today - Months::new(12),
        }
    }
}

/// `(current - historical) / historical * 100`.
///
/// `None` when no snapshot qualified for the period or the historical value
/// is zero; the wire representation is `null`, never `0`.
pub fn period_return(current: Decimal, historical: Option<Decimal>) -> Option<Decimal> {
    let historical = historical?;
    if historical.is_zero() {
        return None;
    }
    Some((current - historical) / historical * Decimal::hundred())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_target_dates() {
        let today = date(2024, 3, 15);
        assert_eq!(Period::OneDay.target_date(today), date(2024, 3, 14));
        assert_eq!(Period::SevenDays.target_date(today), date(2024, 3, 8));
        assert_eq!(Period::FifteenDays.target_date(today), date(2024, 2, 29));
        assert_eq!(Period::ThirtyDays.target_date(today), date(2024, 2, 14));
        assert_eq!(Period::SixMonths.target_date(today), date(2023, 9, 15));
        assert_eq!(Period::OneYear.target_date(today), date(2023, 3, 15));
    }

    #[test]
    fn test_month_subtraction_clamps_to_month_end() {
        // Six months before Aug 31 is Feb 29 in a leap year.
        let today = date(2024, 8, 31);
        assert_eq!(Period::SixMonths.target_date(today), date(2024, 2, 29));
    }

    #[test]
    fn test_period_return_percentage() {
        let r = period_return(dec("1100"), Some(dec("1000"))).unwrap();
        assert_eq!(r, dec("10"));

        let r = period_return(dec("900"), Some(dec("1000"))).unwrap();
        assert_eq!(r, dec("-10"));
    }

    #[test]
    fn test_period_return_none_without_snapshot() {
        assert!(period_return(dec("1100"), None).is_none());
    }

    #[test]
    fn test_period_return_none_for_zero_base() {
        assert!(period_return(dec("1100"), Some(Decimal::zero())).is_none());
    }

    #[test]
    fn test_labels_are_unique() {
        let mut labels: Vec<_> = Period::ALL.iter().map(|p| p.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), Period::ALL.len());
    }
}
