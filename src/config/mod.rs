use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroUsize;
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

/// Top-level configuration for the matching service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub artifacts: ArtifactConfig,
    pub matching: MatchingConfig,
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

        let artifacts = ArtifactConfig {
            model_dir: PathBuf::from(env::var("MODEL_DIR").unwrap_or_else(|_| "models".into())),
            data_dir: PathBuf::from(env::var("DATA_DIR").unwrap_or_else(|_| "data".into())),
            catalog_file: env::var("CATALOG_FILE")
                .unwrap_or_else(|_| "admission_requirements.csv".to_string()),
        };

        let matching = MatchingConfig {
            ranking_threshold: read_threshold()?,
            batch_max_items: read_positive("BATCH_MAX_ITEMS", 500)?,
            max_batch_concurrency: read_positive(
                "MAX_BATCH_CONCURRENCY",
                std::thread::available_parallelism()
                    .map(NonZeroUsize::get)
                    .unwrap_or(1),
            )?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            artifacts,
            matching,
        })
    }
}

fn read_threshold() -> Result<f64, ConfigError> {
    let Ok(raw) = env::var("RANKING_THRESHOLD") else {
        return Ok(MatchingConfig::DEFAULT_THRESHOLD);
    };
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| (0.0..=1.0).contains(value))
        .ok_or(ConfigError::InvalidThreshold { value: raw })
}

fn read_positive(variable: &'static str, default: usize) -> Result<usize, ConfigError> {
    let Ok(raw) = env::var(variable) else {
        return Ok(default);
    };
    raw.trim()
        .parse::<usize>()
        .ok()
        .filter(|value| *value >= 1)
        .ok_or(ConfigError::InvalidPositive {
            variable,
            value: raw,
        })
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Locations of the pretrained models and the requirement catalog.
#[derive(Debug, Clone)]
pub struct ArtifactConfig {
    pub model_dir: PathBuf,
    pub data_dir: PathBuf,
    pub catalog_file: String,
}

impl ArtifactConfig {
    pub fn registry_path(&self) -> PathBuf {
        self.model_dir.join("priority").join("registry.json")
    }

    pub fn ranking_dir(&self) -> PathBuf {
        self.model_dir.join("ranking")
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.data_dir.join(&self.catalog_file)
    }
}

/// Business knobs shared by the ranking engine and the batch orchestrator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchingConfig {
    pub ranking_threshold: f64,
    pub batch_max_items: usize,
    pub max_batch_concurrency: usize,
}

impl MatchingConfig {
    pub const DEFAULT_THRESHOLD: f64 = 0.5;
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            ranking_threshold: Self::DEFAULT_THRESHOLD,
            batch_max_items: 500,
            max_batch_concurrency: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidThreshold { value: String },
    InvalidPositive { variable: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidThreshold { value } => {
                write!(f, "RANKING_THRESHOLD must be a number in [0, 1], got '{value}'")
            }
            ConfigError::InvalidPositive { variable, value } => {
                write!(f, "{variable} must be an integer >= 1, got '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidThreshold { .. }
            | ConfigError::InvalidPositive { .. } => None,
        }
    }
}
