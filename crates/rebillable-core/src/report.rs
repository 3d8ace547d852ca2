//! Monthly rebillable expense report.

use chrono::{Datelike, Month, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::expense::{ExpenseError, ExpenseRecord, RebillableExpense};

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Returns the first and last day of the month containing `day`.
    pub fn month_of(day: NaiveDate) -> Self {
        let from = day.with_day(1).unwrap_or(day);
        let next_month = if day.month() == 12 {
            NaiveDate::from_ymd_opt(day.year() + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(day.year(), day.month() + 1, 1)
        };
        let to = next_month.and_then(|d| d.pred_opt()).unwrap_or(day);
        Self { from, to }
    }

    /// Formats a bound as `Y-M-D` without zero padding.
    pub fn query_date(date: NaiveDate) -> String {
        format!("{}-{}-{}", date.year(), date.month(), date.day())
    }
}

/// Rebillable expenses for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub year: i32,
    #[serde(serialize_with = "serialize_month")]
    pub month: Month,
    /// Sorted ascending by date.
    pub expenses: Vec<RebillableExpense>,
    /// Exact sum of `expenses[*].amount`.
    pub total: Decimal,
}

impl Report {
    /// Builds a report from raw provider records.
    ///
    /// Non-rebillable records are dropped, amounts are made absolute, lines
    /// are ordered by date (ties keep provider order) and summed.
    pub fn from_records(
        year: i32,
        month: Month,
        records: &[ExpenseRecord],
    ) -> Result<Self, ExpenseError> {
        let mut expenses = Vec::new();
        for record in records {
            if let Some(expense) = RebillableExpense::from_record(record)? {
                expenses.push(expense);
            }
        }

        expenses.sort_by_key(|e| e.date);

        let total = expenses
            .iter()
            .fold(Decimal::ZERO, |acc, expense| acc + expense.amount);

        Ok(Self {
            year,
            month,
            expenses,
            total,
        })
    }

    /// Builds the report for the month containing `today`.
    pub fn for_month_of(today: NaiveDate, records: &[ExpenseRecord]) -> Result<Self, ExpenseError> {
        Self::from_records(today.year(), month_of(today), records)
    }

    /// English month name, e.g. "March".
    pub fn month_name(&self) -> &'static str {
        self.month.name()
    }

    pub fn is_empty(&self) -> bool {
        self.expenses.is_empty()
    }
}

fn month_of(day: NaiveDate) -> Month {
    Month::try_from(day.month() as u8).unwrap_or(Month::January)
}

fn serialize_month<S>(month: &Month, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(month.name())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn record(description: &str, gross: &str, dated_on: &str, rebill: bool) -> ExpenseRecord {
        ExpenseRecord {
            description: description.to_string(),
            gross_value: dec(gross),
            dated_on: dated_on.to_string(),
            attachment: None,
            rebill_to_project: rebill.then(|| "https://api.freeagent.com/v2/projects/1".to_string()),
        }
    }

    #[test]
    fn month_range_regular_month() {
        let range = DateRange::month_of(date(2024, 3, 15));
        assert_eq!(range.from, date(2024, 3, 1));
        assert_eq!(range.to, date(2024, 3, 31));
    }

    #[test]
    fn month_range_leap_february() {
        let range = DateRange::month_of(date(2024, 2, 10));
        assert_eq!(range.to, date(2024, 2, 29));
        let range = DateRange::month_of(date(2023, 2, 10));
        assert_eq!(range.to, date(2023, 2, 28));
    }

    #[test]
    fn month_range_december_rolls_year() {
        let range = DateRange::month_of(date(2024, 12, 31));
        assert_eq!(range.from, date(2024, 12, 1));
        assert_eq!(range.to, date(2024, 12, 31));
    }

    #[test]
    fn query_date_is_not_padded() {
        assert_eq!(DateRange::query_date(date(2024, 3, 5)), "2024-3-5");
        assert_eq!(DateRange::query_date(date(2024, 11, 30)), "2024-11-30");
    }

    #[test]
    fn total_is_exact_decimal_sum() {
        let records = vec![
            record("Train", "12.50", "2024-03-02", true),
            record("Taxi", "-7.25", "2024-03-03", true),
        ];
        let report = Report::from_records(2024, Month::March, &records).unwrap();

        assert_eq!(report.expenses[0].amount, dec("12.50"));
        assert_eq!(report.expenses[1].amount, dec("7.25"));
        assert_eq!(report.total, dec("19.75"));
    }

    #[test]
    fn no_float_drift_over_many_small_amounts() {
        let records: Vec<_> = (1..=10)
            .map(|d| record("Coffee", "-0.10", &format!("2024-03-{:02}", d), true))
            .collect();
        let report = Report::from_records(2024, Month::March, &records).unwrap();
        assert_eq!(report.total, dec("1.00"));
    }

    #[test]
    fn sorted_ascending_by_date() {
        let records = vec![
            record("c", "-1", "2024-03-20", true),
            record("a", "-1", "2024-03-05", true),
            record("b", "-1", "2024-03-15", true),
        ];
        let report = Report::from_records(2024, Month::March, &records).unwrap();
        let dates: Vec<_> = report.expenses.iter().map(|e| e.date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 3, 5), date(2024, 3, 15), date(2024, 3, 20)]
        );
    }

    #[test]
    fn same_day_keeps_provider_order() {
        let records = vec![
            record("first", "-1", "2024-03-05", true),
            record("second", "-1", "2024-03-05", true),
        ];
        let report = Report::from_records(2024, Month::March, &records).unwrap();
        assert_eq!(report.expenses[0].description, "first");
        assert_eq!(report.expenses[1].description, "second");
    }

    #[test]
    fn non_rebillable_records_are_excluded() {
        let records = vec![
            record("kept", "-5.00", "2024-03-05", true),
            record("dropped", "-500.00", "2024-03-06", false),
        ];
        let report = Report::from_records(2024, Month::March, &records).unwrap();
        assert_eq!(report.expenses.len(), 1);
        assert_eq!(report.expenses[0].description, "kept");
        assert_eq!(report.total, dec("5.00"));
    }

    #[test]
    fn empty_month_totals_zero() {
        let records = vec![record("dropped", "-5.00", "2024-03-05", false)];
        let report = Report::from_records(2024, Month::March, &records).unwrap();
        assert!(report.is_empty());
        assert_eq!(report.total, Decimal::ZERO);
    }

    #[test]
    fn for_month_of_uses_today() {
        let report = Report::for_month_of(date(2024, 9, 12), &[]).unwrap();
        assert_eq!(report.year, 2024);
        assert_eq!(report.month, Month::September);
        assert_eq!(report.month_name(), "September");
    }

    #[test]
    fn malformed_date_fails_the_report() {
        let records = vec![record("bad", "-5.00", "the fifth", true)];
        assert!(Report::from_records(2024, Month::March, &records).is_err());
    }
}
