//! VetDx diagnosis gateway.
//!
//! Submission pipeline for poultry disease diagnosis:
//!
//! ```text
//! history fields + images
//!        │
//!   validation ──► attachments ──► submission (multipart)
//!                                        │
//!                      api: session cookie → re-validate → upstream /predict
//!                                        │
//!                                   presenter
//! ```

pub mod api;
pub mod attachments;
pub mod config;
pub mod models;
pub mod presenter;
pub mod submission;
pub mod validation;

use tracing_subscriber::EnvFilter;

use crate::api::{start_gateway_server, ApiContext, ServerError};
use crate::config::GatewayConfig;

/// Initialize tracing from `RUST_LOG`, falling back to the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Run the gateway until Ctrl-C.
pub async fn run() -> Result<(), ServerError> {
    init_tracing();

    let config = GatewayConfig::from_env();
    tracing::info!(
        "{} starting v{} (dev_mode={})",
        config::APP_NAME,
        config::APP_VERSION,
        config.dev_mode
    );

    let bind_addr = config.bind_addr;
    let ctx = ApiContext::from_config(config)?;
    let server = start_gateway_server(ctx, bind_addr).await?;
    tracing::info!(addr = %server.session.server_addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
    }

    server.shutdown_and_wait().await
}
