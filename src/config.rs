use anyhow::{Context, Result};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub jwt_secret: String,
    /// Shared secret for device HMAC proofs.
    pub device_secret: String,
    pub server_host: String,
    pub server_port: u16,
    /// Access token lifetime in seconds.
    pub access_token_ttl_secs: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_token_ttl_secs: i64,
    /// Replay window for device-signed requests, in seconds.
    pub device_auth_window_secs: i64,
    /// Per-command store timeout in seconds.
    pub store_timeout_secs: u64,
    /// Readings older than this are pruned by the retention sweep.
    pub retention_max_age_days: i64,
    /// Interval between retention sweeps, in seconds.
    pub retention_interval_secs: u64,
    pub alert_queue_capacity: usize,
    /// Push sink for CO2 alerts. Unset disables delivery (alerts are
    /// drained and logged only).
    pub push_endpoint: Option<String>,
    /// Set in production so the refresh cookie is only sent over TLS.
    pub cookie_secure: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            redis_url: required("REDIS_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            device_secret: required("DEVICE_SECRET")?,
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            access_token_ttl_secs: optional("ACCESS_TOKEN_TTL_SECS", "3600")
                .parse()
                .context("ACCESS_TOKEN_TTL_SECS must be a positive integer")?,
            refresh_token_ttl_secs: optional("REFRESH_TOKEN_TTL_SECS", "604800")
                .parse()
                .context("REFRESH_TOKEN_TTL_SECS must be a positive integer")?,
            device_auth_window_secs: optional("DEVICE_AUTH_WINDOW_SECS", "300")
                .parse()
                .context("DEVICE_AUTH_WINDOW_SECS must be a positive integer")?,
            store_timeout_secs: optional("STORE_TIMEOUT_SECS", "10")
                .parse()
                .context("STORE_TIMEOUT_SECS must be a positive integer")?,
            retention_max_age_days: optional("RETENTION_MAX_AGE_DAYS", "30")
                .parse()
                .context("RETENTION_MAX_AGE_DAYS must be a positive integer")?,
            retention_interval_secs: optional("RETENTION_INTERVAL_SECS", "2592000")
                .parse()
                .context("RETENTION_INTERVAL_SECS must be a positive integer")?,
            alert_queue_capacity: optional("ALERT_QUEUE_CAPACITY", "256")
                .parse()
                .context("ALERT_QUEUE_CAPACITY must be a positive integer")?,
            push_endpoint: std::env::var("PUSH_ENDPOINT").ok().filter(|v| !v.is_empty()),
            cookie_secure: optional("COOKIE_SECURE", "false")
                .parse()
                .context("COOKIE_SECURE must be true or false")?,
        })
    }
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required env var: {key}"))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_missing_var_errors() {
        let err = required("ENVIRO_MONITOR_TEST_UNSET_VAR").unwrap_err();
        assert!(err.to_string().contains("missing required env var"));
    }

    #[test]
    fn optional_falls_back_to_default() {
        assert_eq!(optional("ENVIRO_MONITOR_TEST_UNSET_VAR", "fallback"), "fallback");
    }
}
