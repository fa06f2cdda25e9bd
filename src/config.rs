//! Configuration module

use std::env;
use std::ops::RangeInclusive;
use std::time::Duration;

/// Which listeners this process runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceRole {
    Gateway,
    Decoy,
    All,
}

impl ServiceRole {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "gateway" => ServiceRole::Gateway,
            "decoy" => ServiceRole::Decoy,
            _ => ServiceRole::All,
        }
    }

    pub fn runs_gateway(&self) -> bool {
        matches!(self, ServiceRole::Gateway | ServiceRole::All)
    }

    pub fn runs_decoy(&self) -> bool {
        matches!(self, ServiceRole::Decoy | ServiceRole::All)
    }
}

/// How the gateway decides what goes to the decoy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMode {
    /// Pre-check every request; only suspicious ones are diverted
    Screen,
    /// Every request under the prefix goes to the decoy
    DivertAll,
}

impl GatewayMode {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "divert_all" | "divert-all" | "all" => GatewayMode::DivertAll,
            _ => GatewayMode::Screen,
        }
    }
}

/// Response shape returned when the relay target cannot be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackPolicy {
    /// 503 "Service Unavailable"
    Unavailable,
    /// 200 generic success
    Success,
}

impl FallbackPolicy {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "success" => FallbackPolicy::Success,
            _ => FallbackPolicy::Unavailable,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Listeners to start
    pub role: ServiceRole,

    /// Gateway listener port
    pub gateway_port: u16,

    /// Decoy listener port
    pub decoy_port: u16,

    /// Path prefix the gateway intercepts
    pub gateway_prefix: String,

    /// Screening or divert-everything
    pub gateway_mode: GatewayMode,

    /// Real API that benign traffic is passed to
    pub upstream_url: String,

    /// Decoy base URL the relay forwards to
    pub decoy_url: String,

    /// Timeout for decoy and upstream calls
    pub relay_timeout_secs: u64,

    /// Response used when the relay target fails
    pub relay_fallback: FallbackPolicy,

    /// Gateway trusts the caller's X-Forwarded-For
    pub trust_proxy: bool,

    /// Decoy trusts X-Real-IP / X-Forwarded-For set by the relay
    pub decoy_trust_forwarded: bool,

    /// Geo lookup base URL, None disables lookups
    pub geo_lookup_url: Option<String>,

    /// Timeout for geo lookups
    pub geo_timeout_secs: u64,

    /// Simulated backend latency bounds
    pub fake_delay_min_ms: u64,
    pub fake_delay_max_ms: u64,

    /// Fake login limiter: attempts per window
    pub login_rate_limit: u32,

    /// Fake login limiter window length
    pub login_rate_window_secs: u64,

    /// Postgres URL for the forensic store, None keeps events in memory
    pub database_url: Option<String>,

    /// Records kept per table by the in-memory store
    pub memory_store_capacity: usize,

    /// Key used to sign the decoy's fake JWTs
    pub decoy_token_secret: String,

    /// Emit JSON log lines
    pub json_logs: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            role: ServiceRole::All,
            gateway_port: 5000,
            decoy_port: 8080,
            gateway_prefix: "/api".to_string(),
            gateway_mode: GatewayMode::Screen,
            upstream_url: "http://127.0.0.1:3000".to_string(),
            decoy_url: "http://127.0.0.1:8080".to_string(),
            relay_timeout_secs: 10,
            relay_fallback: FallbackPolicy::Unavailable,
            trust_proxy: false,
            decoy_trust_forwarded: true,
            geo_lookup_url: Some("http://ip-api.com".to_string()),
            geo_timeout_secs: 3,
            fake_delay_min_ms: 200,
            fake_delay_max_ms: 800,
            login_rate_limit: 5,
            login_rate_window_secs: 15 * 60,
            database_url: None,
            memory_store_capacity: 10_000,
            decoy_token_secret: "phantom-decoy-signing-key-change-in-production".to_string(),
            json_logs: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            role: env::var("SERVICE_ROLE")
                .map(|v| ServiceRole::parse(&v))
                .unwrap_or(defaults.role),

            gateway_port: env::var("GATEWAY_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.gateway_port),

            decoy_port: env::var("DECOY_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.decoy_port),

            gateway_prefix: env::var("GATEWAY_PREFIX")
                .map(|p| normalize_prefix(&p))
                .unwrap_or(defaults.gateway_prefix),

            gateway_mode: env::var("GATEWAY_MODE")
                .map(|v| GatewayMode::parse(&v))
                .unwrap_or(defaults.gateway_mode),

            upstream_url: env::var("UPSTREAM_URL")
                .map(|u| trim_base_url(&u))
                .unwrap_or(defaults.upstream_url),

            decoy_url: env::var("DECOY_URL")
                .map(|u| trim_base_url(&u))
                .unwrap_or(defaults.decoy_url),

            relay_timeout_secs: env::var("RELAY_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|s| *s > 0)
                .unwrap_or(defaults.relay_timeout_secs),

            relay_fallback: env::var("RELAY_FALLBACK")
                .map(|v| FallbackPolicy::parse(&v))
                .unwrap_or(defaults.relay_fallback),

            trust_proxy: env_flag("TRUST_PROXY").unwrap_or(defaults.trust_proxy),

            decoy_trust_forwarded: env_flag("DECOY_TRUST_FORWARDED")
                .unwrap_or(defaults.decoy_trust_forwarded),

            geo_lookup_url: match env::var("GEO_LOOKUP_URL") {
                Ok(url) if url.trim().is_empty() => None,
                Ok(url) => Some(trim_base_url(&url)),
                Err(_) => defaults.geo_lookup_url,
            },

            geo_timeout_secs: env::var("GEO_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|s| *s > 0)
                .unwrap_or(defaults.geo_timeout_secs),

            fake_delay_min_ms: env::var("FAKE_DELAY_MIN_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.fake_delay_min_ms),

            fake_delay_max_ms: env::var("FAKE_DELAY_MAX_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.fake_delay_max_ms),

            login_rate_limit: env::var("LOGIN_RATE_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.login_rate_limit),

            login_rate_window_secs: env::var("LOGIN_RATE_WINDOW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|s| *s > 0)
                .unwrap_or(defaults.login_rate_window_secs),

            database_url: env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),

            memory_store_capacity: env::var("MEMORY_STORE_CAPACITY")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|s| *s > 0)
                .unwrap_or(defaults.memory_store_capacity),

            decoy_token_secret: env::var("DECOY_TOKEN_SECRET")
                .unwrap_or(defaults.decoy_token_secret),

            json_logs: env::var("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(defaults.json_logs),
        }
    }

    pub fn relay_timeout(&self) -> Duration {
        Duration::from_secs(self.relay_timeout_secs)
    }

    pub fn geo_timeout(&self) -> Duration {
        Duration::from_secs(self.geo_timeout_secs)
    }

    pub fn login_rate_window(&self) -> Duration {
        Duration::from_secs(self.login_rate_window_secs)
    }

    /// Simulated latency range; a reversed pair is swapped
    pub fn fake_delay_range(&self) -> RangeInclusive<u64> {
        let lo = self.fake_delay_min_ms.min(self.fake_delay_max_ms);
        let hi = self.fake_delay_min_ms.max(self.fake_delay_max_ms);
        lo..=hi
    }
}

fn env_flag(key: &str) -> Option<bool> {
    env::var(key).ok().map(|v| {
        matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
    })
}

/// `api/` -> `/api`, `/` -> `` (root)
fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

fn trim_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}
