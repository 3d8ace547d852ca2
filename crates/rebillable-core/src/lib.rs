//! Core types: expense records, rebillable reports, rendering
//!
//! ```text
//! ExpenseRecord ──filter/map──▶ RebillableExpense ──sort/sum──▶ Report ──▶ HTML
//! ```

pub mod expense;
pub mod render;
pub mod report;
pub mod tracing;

pub use expense::{Attachment, ExpenseError, ExpenseList, ExpenseRecord, RebillableExpense, parse_date};
pub use render::{format_amount, html_escape, render_error_page, render_report};
pub use report::{DateRange, Report};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
