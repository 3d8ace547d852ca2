//! Expense records as returned by the accounting API, and the rebillable
//! view derived from them.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Date formats accepted for `dated_on`, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d %B %Y", "%B %d, %Y", "%d %b %Y"];

/// Date-time formats accepted for `dated_on` when no plain date matches.
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Errors raised while turning an expense record into a report line.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExpenseError {
    /// The `dated_on` field could not be parsed as a date.
    #[error("unrecognised expense date '{value}' for '{description}'")]
    InvalidDate { description: String, value: String },
}

/// The listing payload: `{"expenses": [...]}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpenseList {
    #[serde(default)]
    pub expenses: Vec<ExpenseRecord>,
}

/// One expense entry from the provider.
///
/// Only the fields the report consumes are modelled; anything else in the
/// payload is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseRecord {
    /// Free-text description entered by the user.
    pub description: String,
    /// Signed gross value. Claims are usually negative.
    pub gross_value: Decimal,
    /// Date the expense was incurred, as sent by the provider.
    pub dated_on: String,
    /// Receipt attachment, if one was uploaded.
    #[serde(default)]
    pub attachment: Option<Attachment>,
    /// Project URL the expense is rebilled to.
    #[serde(default)]
    pub rebill_to_project: Option<String>,
}

/// Receipt image URLs attached to an expense.
#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    /// Full-size receipt.
    pub content_src: String,
    /// Thumbnail, when the provider generated one.
    #[serde(default)]
    pub content_src_small: Option<String>,
}

impl ExpenseRecord {
    /// Returns true if the record carries a non-blank project reference.
    pub fn is_rebillable(&self) -> bool {
        self.rebill_to_project
            .as_deref()
            .is_some_and(|project| !project.trim().is_empty())
    }
}

/// An expense that will be charged back to a client project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebillableExpense {
    pub description: String,
    /// Always non-negative.
    pub amount: Decimal,
    pub thumbnail_url: Option<String>,
    pub receipt_url: Option<String>,
    pub date: NaiveDate,
}

impl RebillableExpense {
    /// Builds the report line for a record.
    ///
    /// Returns `Ok(None)` when the record is not rebillable. Dates are only
    /// parsed for rebillable records.
    pub fn from_record(record: &ExpenseRecord) -> Result<Option<Self>, ExpenseError> {
        if !record.is_rebillable() {
            return Ok(None);
        }

        let date = parse_date(&record.dated_on).ok_or_else(|| ExpenseError::InvalidDate {
            description: record.description.clone(),
            value: record.dated_on.clone(),
        })?;

        let (thumbnail_url, receipt_url) = match &record.attachment {
            Some(attachment) => (
                Some(
                    attachment
                        .content_src_small
                        .clone()
                        .unwrap_or_else(|| attachment.content_src.clone()),
                ),
                Some(attachment.content_src.clone()),
            ),
            None => (None, None),
        };

        Ok(Some(Self {
            description: record.description.clone(),
            amount: record.gross_value.abs(),
            thumbnail_url,
            receipt_url,
            date,
        }))
    }
}

/// Parses a loosely formatted date string.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|dt| dt.date())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn record(gross: &str, dated_on: &str, project: Option<&str>) -> ExpenseRecord {
        ExpenseRecord {
            description: "Train to client".to_string(),
            gross_value: Decimal::from_str(gross).unwrap(),
            dated_on: dated_on.to_string(),
            attachment: Some(Attachment {
                content_src: "https://files.example/receipt.png".to_string(),
                content_src_small: Some("https://files.example/receipt-small.png".to_string()),
            }),
            rebill_to_project: project.map(String::from),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_common_date_shapes() {
        assert_eq!(parse_date("2024-03-05"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date(" 2024-03-05 "), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("05/03/2024"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("5 March 2024"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("March 5, 2024"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("5 Mar 2024"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("2024-03-05T10:30:00Z"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("2024-03-05T10:30:00"), Some(date(2024, 3, 5)));
        assert_eq!(parse_date("2024-03-05 10:30:00"), Some(date(2024, 3, 5)));
    }

    #[test]
    fn rejects_garbage_dates() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("2024-13-40"), None);
    }

    #[test]
    fn blank_project_is_not_rebillable() {
        assert!(!record("-1.00", "2024-03-05", None).is_rebillable());
        assert!(!record("-1.00", "2024-03-05", Some("")).is_rebillable());
        assert!(!record("-1.00", "2024-03-05", Some("   ")).is_rebillable());
        assert!(
            record("-1.00", "2024-03-05", Some("https://api.freeagent.com/v2/projects/1"))
                .is_rebillable()
        );
    }

    #[test]
    fn non_rebillable_record_is_skipped_even_with_bad_date() {
        let r = record("-1.00", "not a date", None);
        assert_eq!(RebillableExpense::from_record(&r), Ok(None));
    }

    #[test]
    fn amount_is_absolute() {
        let negative = record("-7.25", "2024-03-05", Some("p"));
        let positive = record("12.50", "2024-03-05", Some("p"));

        let a = RebillableExpense::from_record(&negative).unwrap().unwrap();
        let b = RebillableExpense::from_record(&positive).unwrap().unwrap();

        assert_eq!(a.amount, Decimal::from_str("7.25").unwrap());
        assert_eq!(b.amount, Decimal::from_str("12.50").unwrap());
    }

    #[test]
    fn attachment_urls_are_carried() {
        let r = record("-3.00", "2024-03-05", Some("p"));
        let expense = RebillableExpense::from_record(&r).unwrap().unwrap();
        assert_eq!(
            expense.thumbnail_url.as_deref(),
            Some("https://files.example/receipt-small.png")
        );
        assert_eq!(
            expense.receipt_url.as_deref(),
            Some("https://files.example/receipt.png")
        );
    }

    #[test]
    fn thumbnail_falls_back_to_full_receipt() {
        let mut r = record("-3.00", "2024-03-05", Some("p"));
        if let Some(attachment) = r.attachment.as_mut() {
            attachment.content_src_small = None;
        }
        let expense = RebillableExpense::from_record(&r).unwrap().unwrap();
        assert_eq!(expense.thumbnail_url, expense.receipt_url);
    }

    #[test]
    fn missing_attachment_keeps_record() {
        let mut r = record("-3.00", "2024-03-05", Some("p"));
        r.attachment = None;
        let expense = RebillableExpense::from_record(&r).unwrap().unwrap();
        assert!(expense.thumbnail_url.is_none());
        assert!(expense.receipt_url.is_none());
    }

    #[test]
    fn invalid_date_on_rebillable_record_is_an_error() {
        let r = record("-3.00", "sometime", Some("p"));
        let err = RebillableExpense::from_record(&r).unwrap_err();
        assert!(err.to_string().contains("sometime"));
    }

    #[test]
    fn deserializes_provider_payload() {
        let json = r#"{
            "expenses": [
                {
                    "url": "https://api.freeagent.com/v2/expenses/1",
                    "description": "Hotel",
                    "gross_value": "-120.40",
                    "dated_on": "2024-03-20",
                    "rebill_to_project": "https://api.freeagent.com/v2/projects/9",
                    "attachment": {
                        "content_src": "https://s3.example/full.png",
                        "content_src_small": "https://s3.example/small.png",
                        "file_name": "hotel.png"
                    }
                },
                {
                    "description": "Lunch",
                    "gross_value": -8.5,
                    "dated_on": "2024-03-21"
                }
            ]
        }"#;

        let list: ExpenseList = serde_json::from_str(json).unwrap();
        assert_eq!(list.expenses.len(), 2);
        assert_eq!(
            list.expenses[0].gross_value,
            Decimal::from_str("-120.40").unwrap()
        );
        assert!(list.expenses[0].is_rebillable());
        assert!(list.expenses[1].attachment.is_none());
        assert!(!list.expenses[1].is_rebillable());
    }

    #[test]
    fn missing_required_field_fails_to_deserialize() {
        let json = r#"{"expenses": [{"description": "No value", "dated_on": "2024-03-20"}]}"#;
        assert!(serde_json::from_str::<ExpenseList>(json).is_err());
    }

    #[test]
    fn empty_payload_has_no_expenses() {
        let list: ExpenseList = serde_json::from_str("{}").unwrap();
        assert!(list.expenses.is_empty());
    }
}
