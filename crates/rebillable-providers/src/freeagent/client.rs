//! FreeAgent API client.
//!
//! Issues authenticated requests against the FreeAgent v2 API and decodes
//! responses into the typed expense schema.

use rebillable_core::{DateRange, ExpenseList, ExpenseRecord};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::token::AccessToken;

use super::config::FreeAgentConfig;

/// FreeAgent API client.
#[derive(Debug)]
pub struct FreeAgentClient {
    http_client: reqwest::Client,
    expenses_url: String,
    per_page: u32,
}

impl FreeAgentClient {
    /// Creates a client for the API described by `config`.
    pub fn new(config: &FreeAgentConfig, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            expenses_url: config.expenses_url(),
            per_page: config.per_page,
        }
    }

    /// Lists expenses dated within `range`.
    ///
    /// Only the first page is requested.
    pub async fn list_expenses(
        &self,
        token: &AccessToken,
        range: DateRange,
    ) -> ProviderResult<Vec<ExpenseRecord>> {
        let response = self
            .http_client
            .get(&self.expenses_url)
            .bearer_auth(&token.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[
                ("from_date", DateRange::query_date(range.from)),
                ("to_date", DateRange::query_date(range.to)),
                ("per_page", self.per_page.to_string()),
            ])
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    "request timeout".to_string()
                } else if e.is_connect() {
                    format!("connection failed: {}", e)
                } else {
                    format!("request failed: {}", e)
                };
                ProviderError::data_fetch(message).with_source(e)
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(ProviderError::authentication(
                "access token expired or invalid",
            ));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::data_fetch(format!(
                "API error ({}): {}",
                status, body
            )));
        }

        let body = response.text().await.map_err(|e| {
            ProviderError::data_fetch(format!("failed to read response: {}", e))
        })?;

        let list: ExpenseList = serde_json::from_str(&body).map_err(|e| {
            ProviderError::data_fetch(format!("failed to parse expenses: {}", e))
        })?;

        debug!(
            "fetched {} expenses between {} and {}",
            list.expenses.len(),
            range.from,
            range.to
        );
        Ok(list.expenses)
    }
}
