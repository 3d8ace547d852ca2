//! TCP listener and request serving.

use std::net::SocketAddr;
use std::sync::Arc;

use rebillable_providers::AccountingProvider;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::{AppState, build_router};
use crate::signals::ShutdownHandle;

/// The bound HTTP server.
pub struct WebServer {
    listener: TcpListener,
    state: AppState,
}

impl WebServer {
    /// Binds the configured address.
    pub async fn bind(
        config: &ServerConfig,
        provider: Arc<dyn AccountingProvider>,
    ) -> ServerResult<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        let state = AppState::new(provider, config);

        Ok(Self { listener, state })
    }

    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves requests until `shutdown` fires, then drains in-flight ones.
    pub async fn run(self, shutdown: ShutdownHandle) -> ServerResult<()> {
        info!("listening on http://{}", self.local_addr()?);

        axum::serve(self.listener, build_router(self.state))
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        info!("server stopped");
        Ok(())
    }
}
