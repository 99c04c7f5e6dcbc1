use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_MOCK_STORE_PATH: &str = ".visa-portal/mock-store.json";
const DEFAULT_DRAFT_TTL_SECS: u64 = 24 * 60 * 60;

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
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub backend: BackendConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let backend = BackendConfig::from_env()?;
        let storage = StorageConfig::from_env(environment)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            backend,
            storage,
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

/// Connection settings for the hosted database. Without a URL the service
/// runs against the in-process memory backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub remote: Option<RemoteBackendConfig>,
    pub timeout: Duration,
}

#[derive(Clone)]
pub struct RemoteBackendConfig {
    pub url: String,
    pub anon_key: String,
}

impl fmt::Debug for RemoteBackendConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteBackendConfig")
            .field("url", &self.url)
            .field("anon_key", &"<redacted>")
            .finish()
    }
}

impl BackendConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let timeout_secs = env::var("APP_BACKEND_TIMEOUT_SECS")
            .unwrap_or_else(|_| "15".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber {
                key: "APP_BACKEND_TIMEOUT_SECS",
            })?;

        let remote = match env::var("APP_BACKEND_URL") {
            Ok(url) if !url.trim().is_empty() => {
                let anon_key = env::var("APP_BACKEND_ANON_KEY")
                    .ok()
                    .filter(|key| !key.trim().is_empty())
                    .ok_or(ConfigError::MissingAnonKey)?;
                Some(RemoteBackendConfig {
                    url: url.trim().trim_end_matches('/').to_string(),
                    anon_key,
                })
            }
            _ => None,
        };

        Ok(Self {
            remote,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Local persistence for mock-mode fallback data and read caching.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub mock_store_path: Option<PathBuf>,
    pub mock_fallback: bool,
    pub cache_ttl: Duration,
    /// Wizard drafts untouched for this long are dropped.
    pub draft_ttl: Duration,
}

impl StorageConfig {
    fn from_env(environment: AppEnvironment) -> Result<Self, ConfigError> {
        let mock_store_path = match env::var("APP_MOCK_STORE_PATH") {
            Ok(path) if path.trim().is_empty() => None,
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => Some(PathBuf::from(DEFAULT_MOCK_STORE_PATH)),
        };

        let mock_fallback = match env::var("APP_MOCK_FALLBACK") {
            Ok(raw) => parse_flag(&raw).ok_or(ConfigError::InvalidFlag {
                key: "APP_MOCK_FALLBACK",
            })?,
            Err(_) => environment != AppEnvironment::Production,
        };

        let ttl_secs = env::var("APP_CACHE_TTL_SECS")
            .unwrap_or_else(|_| "60".to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber {
                key: "APP_CACHE_TTL_SECS",
            })?;

        let draft_ttl_secs = env::var("APP_DRAFT_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_DRAFT_TTL_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidNumber {
                key: "APP_DRAFT_TTL_SECS",
            })?;

        Ok(Self {
            mock_store_path,
            mock_fallback,
            cache_ttl: Duration::from_secs(ttl_secs),
            draft_ttl: Duration::from_secs(draft_ttl_secs),
        })
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mock_store_path: None,
            mock_fallback: true,
            cache_ttl: Duration::from_secs(60),
            draft_ttl: Duration::from_secs(DEFAULT_DRAFT_TTL_SECS),
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    InvalidFlag { key: &'static str },
    MissingAnonKey,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a non-negative integer")
            }
            ConfigError::InvalidFlag { key } => write!(f, "{key} must be true or false"),
            ConfigError::MissingAnonKey => {
                write!(f, "APP_BACKEND_ANON_KEY is required when APP_BACKEND_URL is set")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidFlag { .. }
            | ConfigError::MissingAnonKey => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_BACKEND_URL",
            "APP_BACKEND_ANON_KEY",
            "APP_BACKEND_TIMEOUT_SECS",
            "APP_MOCK_STORE_PATH",
            "APP_MOCK_FALLBACK",
            "APP_CACHE_TTL_SECS",
            "APP_DRAFT_TTL_SECS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert!(config.backend.remote.is_none());
        assert_eq!(config.backend.timeout, Duration::from_secs(15));
        assert!(config.storage.mock_fallback);
        assert_eq!(
            config.storage.mock_store_path,
            Some(PathBuf::from(DEFAULT_MOCK_STORE_PATH))
        );
        assert_eq!(config.storage.draft_ttl, Duration::from_secs(86_400));
    }

    #[test]
    fn draft_ttl_must_be_a_number_of_seconds() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_DRAFT_TTL_SECS", "900");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.storage.draft_ttl, Duration::from_secs(900));

        env::set_var("APP_DRAFT_TTL_SECS", "a day");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidNumber {
                key: "APP_DRAFT_TTL_SECS"
            })
        ));
        reset_env();
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn backend_url_requires_anon_key() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_BACKEND_URL", "https://db.example.test/");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::MissingAnonKey)
        ));

        env::set_var("APP_BACKEND_ANON_KEY", "anon");
        let config = AppConfig::load().expect("config loads");
        let remote = config.backend.remote.expect("remote configured");
        assert_eq!(remote.url, "https://db.example.test");
        assert!(!format!("{remote:?}").contains("anon\""));
        reset_env();
    }

    #[test]
    fn production_disables_mock_fallback_unless_requested() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        let config = AppConfig::load().expect("config loads");
        assert!(!config.storage.mock_fallback);

        env::set_var("APP_MOCK_FALLBACK", "yes");
        let config = AppConfig::load().expect("config loads");
        assert!(config.storage.mock_fallback);

        env::set_var("APP_MOCK_FALLBACK", "maybe");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidFlag { .. })
        ));
        reset_env();
    }
}
