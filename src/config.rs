//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use tower_sessions::Expiry;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Server configuration (demo binary only)
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub host: String,
    /// Port number (e.g., 8088)
    pub port: u16,
}

/// SameSite policy for the session cookie
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    Strict,
    #[default]
    Lax,
    None,
}

impl From<SameSitePolicy> for axum_extra::extract::cookie::SameSite {
    fn from(policy: SameSitePolicy) -> Self {
        use axum_extra::extract::cookie::SameSite;
        match policy {
            SameSitePolicy::Strict => SameSite::Strict,
            SameSitePolicy::Lax => SameSite::Lax,
            SameSitePolicy::None => SameSite::None,
        }
    }
}

/// Session cookie and expiry settings
///
/// `Default` yields the settings used by the process-wide
/// default store: HTTP-only, `SameSite=Lax`, 30 minute idle timeout.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session id
    pub cookie_name: String,
    pub cookie_path: String,
    pub cookie_domain: Option<String>,
    /// Only send the cookie over HTTPS
    pub cookie_secure: bool,
    /// Hide the cookie from scripts
    pub cookie_http_only: bool,
    pub cookie_same_site: SameSitePolicy,
    /// Omit Max-Age so the cookie dies with the browser session
    pub cookie_session_only: bool,
    /// Seconds of inactivity before the store forgets a session
    pub idle_timeout_seconds: u64,
    /// Bind a session to every request via the session layer
    pub bind_to_request: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "session_id".to_string(),
            cookie_path: "/".to_string(),
            cookie_domain: None,
            cookie_secure: false,
            cookie_http_only: true,
            cookie_same_site: SameSitePolicy::Lax,
            cookie_session_only: false,
            idle_timeout_seconds: 1800,
            bind_to_request: false,
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> time::Duration {
        time::Duration::seconds(i64::try_from(self.idle_timeout_seconds).unwrap_or(i64::MAX))
    }

    /// Session lifetime as understood by the session store
    ///
    /// A session-only cookie leaves expiry of the stored record to the
    /// store's own default.
    pub fn expiry(&self) -> Expiry {
        if self.cookie_session_only {
            Expiry::OnSessionEnd
        } else {
            Expiry::OnInactivity(self.idle_timeout())
        }
    }

    pub fn validate(&self) -> Result<(), crate::error::AppError> {
        if self.cookie_name.trim().is_empty() {
            return Err(crate::error::AppError::Config(
                "session.cookie_name must not be empty".to_string(),
            ));
        }

        if self.idle_timeout_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "session.idle_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        // Browsers drop SameSite=None cookies that are not Secure.
        if self.cookie_same_site == SameSitePolicy::None && !self.cookie_secure {
            return Err(crate::error::AppError::Config(
                "session.cookie_same_site=none requires session.cookie_secure=true".to_string(),
            ));
        }

        Ok(())
    }
}

/// Login flow behaviour
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Destroy the whole session once a callback has been validated
    pub logout_on_complete: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (OAUTH_BRIDGE__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8088)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("OAUTH_BRIDGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: Self = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        self.session.validate()?;

        if !self.session.cookie_secure {
            tracing::warn!(
                cookie = %self.session.cookie_name,
                "Session cookie is not marked Secure; only suitable for local development"
            );
        }

        Ok(())
    }
}
