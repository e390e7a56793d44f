use std::{net::SocketAddr, str::FromStr, time::Duration};

use tracing::warn;

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_BODY_LIMIT_BYTES: usize = 4096;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub request_timeout: Duration,
    pub body_limit: usize,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let bind_addr = env_parse("OTPGEN_BIND_ADDR").unwrap_or_else(default_bind_addr);
        let request_timeout = env_parse("OTPGEN_REQUEST_TIMEOUT_SECS")
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        let body_limit = env_parse("OTPGEN_BODY_LIMIT_BYTES")
            .filter(|bytes| *bytes > 0)
            .unwrap_or(DEFAULT_BODY_LIMIT_BYTES);

        ServerConfig {
            bind_addr,
            request_timeout: Duration::from_secs(request_timeout),
            body_limit,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: default_bind_addr(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            body_limit: DEFAULT_BODY_LIMIT_BYTES,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 5000))
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    let raw = env_string(key)?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparsable setting, using default");
            None
        }
    }
}
