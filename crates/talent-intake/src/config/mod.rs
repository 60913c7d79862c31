use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

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

pub const DEFAULT_CV_MAX_BYTES: u64 = 5 * 1024 * 1024;
const DEFAULT_STORAGE_PUBLIC_URL: &str = "http://127.0.0.1:3000/storage/v1/object/public";

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub intake: IntakeConfig,
    pub admin_policy: AdminPolicySource,
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

        let cv_max_bytes = match env::var("APP_CV_MAX_BYTES") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(value) if value > 0 => value,
                _ => return Err(ConfigError::InvalidCvLimit { value: raw }),
            },
            Err(_) => DEFAULT_CV_MAX_BYTES,
        };
        let storage_public_url = env::var("APP_STORAGE_PUBLIC_URL")
            .unwrap_or_else(|_| DEFAULT_STORAGE_PUBLIC_URL.to_string());

        let admin_policy = match env::var("APP_ADMIN_POLICY_PATH") {
            Ok(path) if !path.trim().is_empty() => AdminPolicySource::File(PathBuf::from(path)),
            _ => {
                let emails = env::var("APP_ADMIN_EMAILS")
                    .map(|raw| {
                        raw.split(',')
                            .map(str::trim)
                            .filter(|email| !email.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default();
                AdminPolicySource::Inline(emails)
            }
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            intake: IntakeConfig {
                cv_max_bytes,
                storage_public_url,
            },
            admin_policy,
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

/// Limits and links for the intake form's CV upload.
#[derive(Debug, Clone)]
pub struct IntakeConfig {
    pub cv_max_bytes: u64,
    pub storage_public_url: String,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            cv_max_bytes: DEFAULT_CV_MAX_BYTES,
            storage_public_url: DEFAULT_STORAGE_PUBLIC_URL.to_string(),
        }
    }
}

/// Where the admin allowlist is read from at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminPolicySource {
    File(PathBuf),
    Inline(Vec<String>),
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidCvLimit { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidCvLimit { value } => write!(
                f,
                "APP_CV_MAX_BYTES must be a positive byte count (found '{}')",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidCvLimit { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
