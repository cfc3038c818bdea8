use std::net::SocketAddr;

/// Application-level constants
pub const APP_NAME: &str = "VetDx Gateway";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum size of a single diagnosis image (10 MiB).
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Default upstream diagnosis service base URL.
pub const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:8000";

/// Default upstream request timeout in seconds.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 60;

/// Default listen address for the gateway.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Default request body limit (8 images at the per-image cap plus form overhead).
pub const DEFAULT_MAX_BODY_BYTES: usize = 8 * MAX_IMAGE_BYTES + 1024 * 1024;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "vetdx_gateway=info,tower_http=warn"
}

/// Runtime configuration for the gateway.
///
/// Every field can be overridden from the environment:
///
/// | Variable                       | Field                   |
/// |--------------------------------|-------------------------|
/// | `VETDX_BIND_ADDR`              | `bind_addr`             |
/// | `VETDX_UPSTREAM_URL`           | `upstream_base_url`     |
/// | `VETDX_UPSTREAM_TIMEOUT_SECS`  | `upstream_timeout_secs` |
/// | `VETDX_DEV_MODE`               | `dev_mode`              |
/// | `VETDX_MAX_BODY_BYTES`         | `max_body_bytes`        |
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    pub upstream_base_url: String,
    pub upstream_timeout_secs: u64,
    /// Expose internal error detail in 500 responses.
    pub dev_mode: bool,
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            upstream_base_url: DEFAULT_UPSTREAM_URL.to_string(),
            upstream_timeout_secs: DEFAULT_UPSTREAM_TIMEOUT_SECS,
            dev_mode: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Unparsable values are logged and replaced by the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("VETDX_BIND_ADDR") {
            match raw.trim().parse::<SocketAddr>() {
                Ok(addr) => config.bind_addr = addr,
                Err(e) => tracing::warn!(value = %raw, error = %e, "Invalid VETDX_BIND_ADDR, using default"),
            }
        }

        if let Some(raw) = lookup("VETDX_UPSTREAM_URL") {
            let url = raw.trim().trim_end_matches('/');
            if url.is_empty() {
                tracing::warn!("Empty VETDX_UPSTREAM_URL, using default");
            } else {
                config.upstream_base_url = url.to_string();
            }
        }

        if let Some(raw) = lookup("VETDX_UPSTREAM_TIMEOUT_SECS") {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.upstream_timeout_secs = secs,
                _ => tracing::warn!(value = %raw, "Invalid VETDX_UPSTREAM_TIMEOUT_SECS, using default"),
            }
        }

        if let Some(raw) = lookup("VETDX_DEV_MODE") {
            config.dev_mode = matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        if let Some(raw) = lookup("VETDX_MAX_BODY_BYTES") {
            match raw.trim().parse::<usize>() {
                Ok(bytes) if bytes > 0 => config.max_body_bytes = bytes,
                _ => tracing::warn!(value = %raw, "Invalid VETDX_MAX_BODY_BYTES, using default"),
            }
        }

        config
    }

    /// Full URL of the upstream predict endpoint.
    pub fn predict_url(&self) -> String {
        format!("{}/predict", self.upstream_base_url)
    }
}
