use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
///
/// Loaded once at startup and passed by reference into every component;
/// nothing mutates it afterwards.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub bank_api: BankApiConfig,
    pub catalog: CatalogConfig,
    pub external_banks: Vec<ExternalBankEndpoint>,
    pub external_bank_timeout: Duration,
    pub use_sample_data: bool,
    pub use_sample_external_banks: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "8100".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let bank_api_base_url = trimmed_env("BANK_API_BASE_URL")
            .unwrap_or_else(|| "http://localhost:8080".to_string());
        let bank_api_timeout = duration_env("BANK_API_TIMEOUT_MS", Duration::from_millis(10_000));

        let catalog = CatalogConfig {
            local_base_url: trimmed_env("LOCAL_PRODUCT_CATALOG_BASE_URL")
                .unwrap_or_else(|| "http://localhost:8080".to_string()),
            bank_api_base_url: bank_api_base_url.clone(),
            additional_url: trimmed_env("ADDITIONAL_PRODUCT_CATALOG_URL"),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            bank_api: BankApiConfig {
                base_url: bank_api_base_url,
                timeout: bank_api_timeout,
            },
            catalog,
            external_banks: external_banks_from_env(),
            external_bank_timeout: duration_env("EXTERNAL_BANK_TIMEOUT_MS", bank_api_timeout),
            use_sample_data: bool_env("USE_MOCK_DATA"),
            use_sample_external_banks: bool_env("USE_MOCK_EXTERNAL_BANKS"),
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Connection settings for the internal core-banking API.
#[derive(Debug, Clone)]
pub struct BankApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

/// Prioritized product-catalog sources. Earlier sources win on conflicts.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub local_base_url: String,
    pub bank_api_base_url: String,
    pub additional_url: Option<String>,
}

impl CatalogConfig {
    /// Base URLs in priority order, deduplicated, empty entries removed.
    pub fn prioritized_sources(&self) -> Vec<String> {
        let mut sources = Vec::new();
        for candidate in [
            Some(self.local_base_url.clone()),
            Some(self.bank_api_base_url.clone()),
            self.additional_url.clone(),
        ]
        .into_iter()
        .flatten()
        {
            let trimmed = candidate.trim().to_string();
            if !trimmed.is_empty() && !sources.contains(&trimmed) {
                sources.push(trimmed);
            }
        }
        sources
    }
}

/// Static descriptor of one partner bank's open-banking deployment.
#[derive(Debug, Clone)]
pub struct ExternalBankEndpoint {
    pub code: String,
    pub display_name: String,
    pub base_url: String,
    pub token: Option<String>,
    pub consent_id: String,
    pub account_consent_id: Option<String>,
}

fn external_banks_from_env() -> Vec<ExternalBankEndpoint> {
    let known = [
        ("vbank", "Virtual Bank", "VBANK"),
        ("abank", "Awesome Bank", "ABANK"),
        ("sbank", "Smart Bank", "SBANK"),
    ];

    known
        .iter()
        .filter_map(|(code, display_name, prefix)| {
            let base_url = trimmed_env(&format!("{prefix}_API_BASE"))?;
            let consent_id = trimmed_env(&format!("{prefix}_PRODUCT_AGREEMENT_CONSENT_ID"))?;
            Some(ExternalBankEndpoint {
                code: (*code).to_string(),
                display_name: (*display_name).to_string(),
                base_url,
                token: trimmed_env(&format!("{prefix}_API_TOKEN")),
                consent_id,
                account_consent_id: trimmed_env(&format!("{prefix}_ACCOUNT_CONSENT_ID")),
            })
        })
        .collect()
}

fn trimmed_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn bool_env(key: &str) -> bool {
    env::var(key).map(|value| value == "true").unwrap_or(false)
}

fn duration_env(key: &str, fallback: Duration) -> Duration {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(fallback)
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
