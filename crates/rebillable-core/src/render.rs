//! HTML rendering for the report page.
//!
//! Rendering is pure string building: no business logic lives here, every
//! value comes from an already computed [`Report`].

use std::fmt::Write as _;

use rust_decimal::{Decimal, RoundingStrategy};

use crate::expense::RebillableExpense;
use crate::report::Report;

const STYLE: &str = "body{font-family:sans-serif;margin:2rem;color:#222}\
table{border-collapse:collapse;width:100%}\
th,td{padding:.5rem;border-bottom:1px solid #ddd;text-align:left}\
td.amount,th.amount{text-align:right}\
tfoot td{font-weight:bold;border-top:2px solid #222}\
img.receipt{max-height:64px}";

/// Escapes HTML special characters.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Formats a money amount with exactly two decimals, rounding half away
/// from zero.
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

/// Renders the full report page.
pub fn render_report(report: &Report) -> String {
    let title = format!("Rebillable expenses – {} {}", report.month_name(), report.year);

    let mut body = String::new();
    let _ = writeln!(body, "<h1>{}</h1>", html_escape(&title));

    if report.is_empty() {
        let _ = writeln!(body, "<p class=\"empty\">No rebillable expenses this month.</p>");
    }

    body.push_str("<table>\n<thead><tr><th>Date</th><th>Description</th>");
    body.push_str("<th class=\"amount\">Amount</th><th>Receipt</th></tr></thead>\n<tbody>\n");
    for expense in &report.expenses {
        body.push_str(&render_row(expense));
    }
    body.push_str("</tbody>\n");
    let _ = writeln!(
        body,
        "<tfoot><tr><td colspan=\"2\">Total</td><td class=\"amount\">{}</td><td></td></tr></tfoot>",
        format_amount(report.total)
    );
    body.push_str("</table>\n");

    page(&title, &body)
}

/// Renders a minimal error page.
pub fn render_error_page(title: &str, message: &str) -> String {
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>\n<p><a href=\"/\">Start again</a></p>\n",
        html_escape(title),
        html_escape(message)
    );
    page(title, &body)
}

fn render_row(expense: &RebillableExpense) -> String {
    let receipt = match (&expense.thumbnail_url, &expense.receipt_url) {
        (Some(thumb), Some(full)) => format!(
            "<a href=\"{}\"><img class=\"receipt\" src=\"{}\" alt=\"receipt\"></a>",
            html_escape(full),
            html_escape(thumb)
        ),
        (Some(thumb), None) => format!(
            "<img class=\"receipt\" src=\"{}\" alt=\"receipt\">",
            html_escape(thumb)
        ),
        (None, Some(full)) => format!("<a href=\"{}\">receipt</a>", html_escape(full)),
        (None, None) => "no receipt".to_string(),
    };

    format!(
        "<tr><td>{}</td><td>{}</td><td class=\"amount\">{}</td><td>{}</td></tr>\n",
        expense.date.format("%Y-%m-%d"),
        html_escape(&expense.description),
        format_amount(expense.amount),
        receipt
    )
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        html_escape(title),
        STYLE,
        body
    )
}
