//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)
//!
//! The resulting [`AppConfig`] is immutable and shared through `AppState`.

use serde::Deserialize;
use std::net::IpAddr;
use tracing_subscriber::EnvFilter;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 3000)
    pub port: u16,
    /// Public domain (e.g., "app.example.com" or "localhost:3000")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the public origin of the service
    ///
    /// # Returns
    /// Full URL like "https://app.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Session and route protection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Signing secret for session tokens (required)
    pub secret: String,
    /// Session max age in seconds (default: 2592000 = 30 days)
    pub session_max_age: i64,
    /// Name of the session cookie
    pub cookie_name: String,
    /// Path of the login chooser page
    pub login_path: String,
    /// Where authenticated users land after login
    pub dashboard_path: String,
}

/// Identity provider credentials
///
/// A provider is enabled only when both halves of its pair are present.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub google: ProviderCredentials,
    #[serde(default)]
    pub github: ProviderCredentials,
}

/// OAuth client credentials for a single provider
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProviderCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Endpoint overrides (GitHub Enterprise, self-hosted gateways)
    #[serde(default)]
    pub endpoints: ProviderEndpoints,
}

/// Optional replacements for a provider's built-in endpoint URLs
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ProviderEndpoints {
    pub authorize_url: Option<String>,
    pub token_url: Option<String>,
    pub userinfo_url: Option<String>,
    /// Address list used when the profile carries no public email (GitHub only)
    pub emails_url: Option<String>,
}

impl ProviderEndpoints {
    fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("authorize_url", &self.authorize_url),
            ("token_url", &self.token_url),
            ("userinfo_url", &self.userinfo_url),
            ("emails_url", &self.emails_url),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_deref().map(|v| (key, v)))
    }
}

impl ProviderCredentials {
    /// Returns the `(client_id, client_secret)` pair if both are set and non-blank.
    pub fn pair(&self) -> Option<(&str, &str)> {
        let id = self.client_id.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
        let secret = self
            .client_secret
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())?;
        Some((id, secret))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, e.g. "info" or "authgate=debug,tower_http=info".
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_FILTER.to_string(),
            format: "pretty".to_string(),
        }
    }
}

const DEFAULT_LOG_FILTER: &str = "authgate=info,tower_http=debug";

impl LoggingConfig {
    pub fn env_filter(&self) -> Result<EnvFilter, crate::error::AppError> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(&self.level).map_err(|e| {
            crate::error::AppError::Config(format!("logging.level is not a valid filter: {e}"))
        })
    }

    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (AUTHGATE_*)
    ///
    /// # Errors
    /// Returns error if configuration is missing or invalid. The signing
    /// secret has no default, so an unset secret refuses to start.
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.domain", "localhost:3000")?
            .set_default("server.protocol", "http")?
            .set_default("auth.session_max_age", 2_592_000)?
            .set_default("auth.cookie_name", "authgate.session-token")?
            .set_default("auth.login_path", "/auth/login")?
            .set_default("auth.dashboard_path", "/dashboard")?
            .set_default("logging.level", DEFAULT_LOG_FILTER)?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("AUTHGATE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.server.protocol.eq_ignore_ascii_case("https")
            || !is_local_server_domain(&self.server.domain)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        const RECOMMENDED_SECRET_BYTES: usize = 32;

        if self.auth.secret.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "auth.secret is required - generate one with: openssl rand -base64 32"
                    .to_string(),
            ));
        }

        if self.auth.secret.len() < RECOMMENDED_SECRET_BYTES {
            tracing::warn!(
                bytes = self.auth.secret.len(),
                "auth.secret is shorter than {} bytes",
                RECOMMENDED_SECRET_BYTES
            );
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        for (key, path) in [
            ("auth.login_path", &self.auth.login_path),
            ("auth.dashboard_path", &self.auth.dashboard_path),
        ] {
            if !path.starts_with('/') {
                return Err(crate::error::AppError::Config(format!(
                    "{key} must be an absolute path"
                )));
            }
        }

        for (name, credentials) in [
            ("google", &self.providers.google),
            ("github", &self.providers.github),
        ] {
            for (key, value) in credentials.endpoints.iter() {
                if url::Url::parse(value).is_err() {
                    return Err(crate::error::AppError::Config(format!(
                        "providers.{name}.endpoints.{key} must be an absolute URL"
                    )));
                }
            }
        }

        if !matches!(self.logging.format.to_ascii_lowercase().as_str(), "pretty" | "json") {
            return Err(crate::error::AppError::Config(
                "logging.format must be \"pretty\" or \"json\"".to_string(),
            ));
        }
        EnvFilter::try_new(&self.logging.level).map_err(|e| {
            crate::error::AppError::Config(format!("logging.level is not a valid filter: {e}"))
        })?;

        if !self.should_use_secure_cookies() {
            let host = normalized_server_host(&self.server.domain);
            tracing::warn!(
                host = %host,
                protocol = %self.server.protocol,
                "Using insecure session cookies for local development"
            );
        } else if !self.server.protocol.eq_ignore_ascii_case("https") {
            return Err(crate::error::AppError::Config(
                "server.protocol must be https for non-local server domains".to_string(),
            ));
        }

        Ok(())
    }
}

fn normalized_server_host(domain: &str) -> String {
    let trimmed = domain.trim();
    let parsed_host = url::Url::parse(&format!("http://{trimmed}"))
        .ok()
        .and_then(|url| url.host_str().map(|host| host.to_string()));
    let host = parsed_host.unwrap_or_else(|| trimmed.to_string());
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .trim_end_matches('.')
        .to_ascii_lowercase()
}

fn is_local_server_domain(domain: &str) -> bool {
    let host = normalized_server_host(domain);
    if host == "localhost" || host.ends_with(".localhost") {
        return true;
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        return ip.is_loopback() || ip.is_unspecified();
    }

    false
}
