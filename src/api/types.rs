//! Shared types for the gateway API layer.

use std::sync::Arc;

use crate::api::upstream::{DiagnosisUpstream, HttpDiagnosisUpstream, UpstreamError};
use crate::config::GatewayConfig;

/// Shared context for all API routes.
///
/// Read-only after construction: requests never coordinate with each other.
#[derive(Clone)]
pub struct ApiContext {
    pub config: Arc<GatewayConfig>,
    pub upstream: Arc<dyn DiagnosisUpstream>,
}

impl ApiContext {
    pub fn new(config: GatewayConfig, upstream: Arc<dyn DiagnosisUpstream>) -> Self {
        Self {
            config: Arc::new(config),
            upstream,
        }
    }

    /// Build a context that talks to the configured diagnosis service.
    pub fn from_config(config: GatewayConfig) -> Result<Self, UpstreamError> {
        let upstream = HttpDiagnosisUpstream::from_config(&config)?;
        Ok(Self::new(config, Arc::new(upstream)))
    }
}
