//! Builds the current month's report for an authenticated visitor.

use std::sync::Arc;

use chrono::NaiveDate;
use rebillable_core::{DateRange, Report};
use rebillable_providers::{AccessToken, AccountingProvider, ProviderError, ProviderResult};
use tracing::debug;

/// Fetches expenses through an [`AccountingProvider`] and turns them into a
/// [`Report`].
#[derive(Clone)]
pub struct ReportBuilder {
    provider: Arc<dyn AccountingProvider>,
}

impl ReportBuilder {
    pub fn new(provider: Arc<dyn AccountingProvider>) -> Self {
        Self { provider }
    }

    /// Builds the report for the month containing `today`.
    ///
    /// A missing or expired token fails with an authentication error
    /// before anything is sent to the provider.
    pub async fn build_report(
        &self,
        token: Option<&AccessToken>,
        today: NaiveDate,
    ) -> ProviderResult<Report> {
        let token = match token {
            Some(token) if !token.is_expired() => token,
            Some(_) => return Err(ProviderError::authentication("access token has expired")),
            None => return Err(ProviderError::authentication("not logged in")),
        };

        let range = DateRange::month_of(today);
        debug!(
            provider = self.provider.name(),
            from = %range.from,
            to = %range.to,
            "fetching expenses"
        );

        let records = self.provider.list_expenses(token, range).await?;
        let report = Report::for_month_of(today, &records)?;

        debug!(
            fetched = records.len(),
            rebillable = report.expenses.len(),
            "report built"
        );
        Ok(report)
    }
}

impl std::fmt::Debug for ReportBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportBuilder")
            .field("provider", &self.provider.name())
            .finish()
    }
}
