//! FreeAgent implementation of [`AccountingProvider`].

use rebillable_core::{DateRange, ExpenseRecord};
use tracing::info;
use url::Url;

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{AccountingProvider, AuthorizationRequest, BoxFuture};
use crate::token::AccessToken;

use super::client::FreeAgentClient;
use super::config::FreeAgentConfig;
use super::oauth::OAuthClient;

const PROVIDER_NAME: &str = "freeagent";

/// FreeAgent accounting provider.
///
/// Holds no per-user state: tokens are passed in by the caller on every
/// request.
#[derive(Debug)]
pub struct FreeAgentProvider {
    oauth_client: OAuthClient,
    api_client: FreeAgentClient,
}

impl FreeAgentProvider {
    /// Creates a provider from a validated configuration.
    pub fn new(config: FreeAgentConfig) -> ProviderResult<Self> {
        config
            .validate()
            .map_err(|e| ProviderError::configuration(e).with_provider(PROVIDER_NAME))?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to create HTTP client: {}", e))
                    .with_source(e)
            })?;

        info!(
            "FreeAgent provider ready (api: {}, redirect: {})",
            config.api_base, config.redirect_uri
        );

        let api_client = FreeAgentClient::new(&config, http_client.clone());
        let oauth_client = OAuthClient::new(config, http_client);

        Ok(Self {
            oauth_client,
            api_client,
        })
    }
}

impl AccountingProvider for FreeAgentProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn begin_authorization(&self) -> AuthorizationRequest {
        self.oauth_client.begin_authorization()
    }

    fn complete_authorization<'a>(
        &'a self,
        expected_state: Option<&'a str>,
        callback_url: &'a Url,
    ) -> BoxFuture<'a, ProviderResult<AccessToken>> {
        Box::pin(async move {
            self.oauth_client
                .complete_authorization(expected_state, callback_url)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }

    fn list_expenses<'a>(
        &'a self,
        token: &'a AccessToken,
        range: DateRange,
    ) -> BoxFuture<'a, ProviderResult<Vec<ExpenseRecord>>> {
        Box::pin(async move {
            self.api_client
                .list_expenses(token, range)
                .await
                .map_err(|e| e.with_provider(PROVIDER_NAME))
        })
    }
}
