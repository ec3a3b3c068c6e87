use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashSet;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};
use validator::{Validate, ValidationError, ValidationErrors};

const CONFIG_DIR: &str = "config";
const ENV_PREFIX: &str = "APP";
const DEFAULT_ENV: &str = "development";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATABASE_URL: &str = "sqlite://inventory.db?mode=rwc";
/// Six months.
const DEFAULT_JWT_EXPIRATION_SECS: usize = 60 * 60 * 24 * 30 * 6;
const MIN_JWT_SECRET_LEN: usize = 64;
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Secrets copied from docs and sample env files.
const PLACEHOLDER_SECRETS: [&str; 4] = [
    "CHANGE_THIS_SECRET_IN_PRODUCTION",
    "your-secret-key",
    "default-secret-key",
    "inventory-dev-secret",
];
const WEAK_SECRET_FRAGMENTS: [&str; 4] = ["changeme", "password", "12345", "abcdef"];

/// Runtime settings for the ledger API.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// `sqlite://...` or `postgres://...`
    pub database_url: String,

    /// HS256 signing key for access tokens
    #[validate(custom = "validate_jwt_secret")]
    pub jwt_secret: String,

    /// Access token lifetime in seconds
    #[validate(range(min = 60))]
    pub jwt_expiration: usize,

    pub host: String,

    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// `development` relaxes CORS; anything else is treated as a deployed environment
    pub environment: String,

    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_json: bool,

    /// Apply pending schema migrations before serving
    #[serde(default)]
    pub auto_migrate: bool,

    /// Comma-separated origin allow-list
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    #[serde(default)]
    pub cors_allow_any_origin: bool,

    #[serde(default = "default_db_max_connections")]
    #[validate(range(min = 1))]
    pub db_max_connections: u32,
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Transaction listing page size when the client sends none
    #[serde(default = "default_api_page_size")]
    #[validate(range(min = 1))]
    pub api_default_page_size: u32,

    /// Cap on client-supplied transaction page sizes
    #[serde(default = "default_api_max_page_size")]
    #[validate(range(min = 1))]
    pub api_max_page_size: u32,

    /// `iss` claim written into and required on every token
    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,
}

impl AppConfig {
    pub fn new(
        database_url: String,
        jwt_secret: String,
        jwt_expiration: usize,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            api_default_page_size: default_api_page_size(),
            api_max_page_size: default_api_max_page_size(),
            auth_issuer: default_auth_issuer(),
        }
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case(DEFAULT_ENV)
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Explicitly configured CORS origins, trimmed and non-empty.
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Any origin is accepted in development or when explicitly opted in.
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Caps a client-supplied page size at `api_max_page_size`; zero is left for the
    /// query layer to reject.
    pub fn clamp_page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.api_default_page_size as u64)
            .min(self.api_max_page_size as u64)
    }

    /// Rules spanning more than one field.
    fn check_cross_field(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && self.cors_origins().is_empty() {
            errors.add(
                "cors_allowed_origins",
                invalid(
                    "cors_origins_required",
                    "outside development set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true",
                ),
            );
        }
        if self.db_min_connections > self.db_max_connections {
            errors.add(
                "db_min_connections",
                invalid(
                    "pool_bounds",
                    "db_min_connections must not exceed db_max_connections",
                ),
            );
        }
        if self.api_default_page_size > self.api_max_page_size {
            errors.add(
                "api_default_page_size",
                invalid(
                    "page_bounds",
                    "api_default_page_size must not exceed api_max_page_size",
                ),
            );
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_api_page_size() -> u32 {
    1000
}

fn default_api_max_page_size() -> u32 {
    1000
}

fn default_auth_issuer() -> String {
    "inventory-api".to_string()
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    if LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
        Ok(())
    } else {
        Err(invalid(
            "log_level",
            "log_level must be one of trace, debug, info, warn, error",
        ))
    }
}

/// Describes why `secret` is unfit for signing tokens, if it is.
fn jwt_secret_problem(secret: &str) -> Option<&'static str> {
    let secret = secret.trim();
    let lower = secret.to_ascii_lowercase();

    if secret.len() < MIN_JWT_SECRET_LEN {
        Some("jwt_secret must be at least 64 characters")
    } else if PLACEHOLDER_SECRETS
        .iter()
        .any(|placeholder| lower.contains(&placeholder.to_ascii_lowercase()))
    {
        Some("jwt_secret is a documented placeholder; generate a random one")
    } else if WEAK_SECRET_FRAGMENTS
        .iter()
        .any(|fragment| lower.contains(fragment))
    {
        Some("jwt_secret contains a guessable sequence")
    } else if secret.chars().collect::<HashSet<_>>().len() < 10 {
        Some("jwt_secret needs at least 10 distinct characters")
    } else {
        None
    }
}

fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    match jwt_secret_problem(secret) {
        Some(problem) => Err(invalid("jwt_secret", problem)),
        None => Ok(()),
    }
}

/// Installs the global fmt subscriber. `RUST_LOG` wins over `level`.
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "inventory_api={},tower_http=debug,sea_orm=warn",
            level
        ))
    });

    let installed = if json {
        fmt().with_env_filter(filter).json().try_init()
    } else {
        fmt().with_env_filter(filter).try_init()
    };

    if let Err(err) = installed {
        eprintln!("tracing subscriber already installed: {}", err);
    }
}

/// Loads and validates configuration.
///
/// Sources, later ones winning:
/// 1. Built-in defaults
/// 2. `config/default.toml`
/// 3. `config/{RUN_ENV}.toml`
/// 4. `APP__*` environment variables (e.g. `APP__DATABASE_URL`)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!(environment = %run_env, "Loading configuration");

    let config_dir = Path::new(CONFIG_DIR);
    if !config_dir.exists() {
        warn!(
            "No '{}' directory; using defaults and environment variables only",
            CONFIG_DIR
        );
    }

    let config = layered_config(config_dir, &run_env)?
        .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    finish_config(config)
}

fn layered_config(
    config_dir: &Path,
    run_env: &str,
) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    // jwt_secret has no default
    let file = |name: &str| {
        File::with_name(&config_dir.join(name).to_string_lossy()).required(false)
    };
    Ok(Config::builder()
        .set_default("database_url", DEFAULT_DATABASE_URL)?
        .set_default("jwt_expiration", DEFAULT_JWT_EXPIRATION_SECS as i64)?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", run_env)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(file("default"))
        .add_source(file(run_env)))
}

fn finish_config(config: Config) -> Result<AppConfig, AppConfigError> {
    if config.get_string("jwt_secret").is_err() {
        error!("jwt_secret is not set; export APP__JWT_SECRET with at least 64 random characters");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret".into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;
    app_config
        .validate()
        .and_then(|_| app_config.check_cross_field())
        .map_err(|e| {
            error!("Invalid configuration: {}", e);
            AppConfigError::Validation(e)
        })?;

    info!(
        environment = %app_config.environment,
        port = app_config.port,
        "Configuration loaded"
    );
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const STRONG_SECRET: &str =
        "k3Y9vQ7wLx2Rt8NzB4mH6pJ1sD5fG0aE-ledger-signing-key-for-unit-tests-only-Xy";

    fn deployed_config() -> AppConfig {
        AppConfig::new(
            "sqlite::memory:".into(),
            STRONG_SECRET.into(),
            3600,
            "127.0.0.1".into(),
            8080,
            "production".into(),
        )
    }

    fn write_file(dir: &TempDir, name: &str, content: &str) {
        let mut file = std::fs::File::create(dir.path().join(name)).unwrap();
        writeln!(file, "{}", content).unwrap();
    }

    #[test]
    fn deployed_environments_need_explicit_origins() {
        let mut cfg = deployed_config();
        assert!(cfg.check_cross_field().is_err());

        cfg.cors_allowed_origins = Some(" https://shop.example.com , ".into());
        assert!(cfg.check_cross_field().is_ok());
        assert_eq!(cfg.cors_origins(), vec!["https://shop.example.com"]);
    }

    #[test]
    fn development_accepts_any_origin() {
        let mut cfg = deployed_config();
        cfg.environment = "Development".into();
        assert!(cfg.should_allow_permissive_cors());
        assert!(cfg.check_cross_field().is_ok());
    }

    #[test]
    fn default_page_size_cannot_exceed_the_cap() {
        let mut cfg = deployed_config();
        cfg.cors_allow_any_origin = true;
        cfg.api_default_page_size = 2000;
        let errors = cfg.check_cross_field().unwrap_err();
        assert!(errors.field_errors().contains_key("api_default_page_size"));
    }

    #[test]
    fn page_size_is_clamped_to_maximum() {
        let mut cfg = deployed_config();
        cfg.api_max_page_size = 50;
        assert_eq!(cfg.clamp_page_size(Some(500)), 50);
        assert_eq!(cfg.clamp_page_size(Some(10)), 10);
        assert_eq!(cfg.clamp_page_size(Some(0)), 0);
        cfg.api_default_page_size = 25;
        assert_eq!(cfg.clamp_page_size(None), 25);
    }

    #[test]
    fn unfit_jwt_secrets_are_explained() {
        assert!(jwt_secret_problem("short").is_some());
        assert!(jwt_secret_problem(&"a".repeat(80)).is_some());
        assert!(jwt_secret_problem(&format!("password{}", STRONG_SECRET)).is_some());
        assert!(jwt_secret_problem(&format!("{}your-secret-key", STRONG_SECRET)).is_some());
        assert_eq!(jwt_secret_problem(STRONG_SECRET), None);
    }

    #[test]
    fn files_are_layered_over_defaults() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir,
            "default.toml",
            &format!(
                "jwt_secret = \"{}\"\nport = 9000\nlog_level = \"debug\"",
                STRONG_SECRET
            ),
        );
        write_file(&dir, "development.toml", "port = 9100");

        let config = layered_config(dir.path(), "development")
            .unwrap()
            .build()
            .unwrap();
        let cfg = finish_config(config).unwrap();

        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.log_level(), "debug");
        assert_eq!(cfg.jwt_expiration, DEFAULT_JWT_EXPIRATION_SECS);
        assert_eq!(cfg.database_url, DEFAULT_DATABASE_URL);
        assert!(cfg.is_development());
    }

    #[test]
    fn missing_jwt_secret_is_a_load_error() {
        let dir = TempDir::new().unwrap();
        let config = layered_config(dir.path(), "development")
            .unwrap()
            .build()
            .unwrap();
        assert!(matches!(
            finish_config(config),
            Err(AppConfigError::Load(_))
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir,
            "default.toml",
            &format!("jwt_secret = \"{}\"\nlisten_port = 1", STRONG_SECRET),
        );
        let config = layered_config(dir.path(), "development")
            .unwrap()
            .build()
            .unwrap();
        assert!(finish_config(config).is_err());
    }
}
