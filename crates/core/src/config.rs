use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub store: StoreConfig,
    pub geocoding: GeocodingConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub project_id: Option<String>,
    pub database_id: String,
    pub access_token: Option<SecretString>,
    pub base_url: String,
    pub collection: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct GeocodingConfig {
    pub postal_code_url: String,
    pub geocode_url: String,
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Firestore,
    Memory,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

/// Credentials required to talk to the Firestore REST API.
#[derive(Clone, Debug)]
pub struct FirestoreCredentials {
    pub project_id: String,
    pub database_id: String,
    pub access_token: SecretString,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub store_backend: Option<StoreBackend>,
    pub store_project_id: Option<String>,
    pub store_access_token: Option<String>,
    pub store_base_url: Option<String>,
    pub geocoding_api_key: Option<String>,
    pub server_port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
    #[error("store credentials are missing: {0}")]
    MissingCredentials(String),
}

pub const DEFAULT_FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";
pub const DEFAULT_POSTAL_CODE_URL: &str = "https://zipcloud.ibsnet.co.jp/api/search";
pub const DEFAULT_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig {
                backend: StoreBackend::Firestore,
                project_id: None,
                database_id: "(default)".to_string(),
                access_token: None,
                base_url: DEFAULT_FIRESTORE_BASE_URL.to_string(),
                collection: "customers".to_string(),
                timeout_secs: 30,
            },
            geocoding: GeocodingConfig {
                postal_code_url: DEFAULT_POSTAL_CODE_URL.to_string(),
                geocode_url: DEFAULT_GEOCODE_URL.to_string(),
                api_key: None,
                timeout_secs: 10,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Validation(format!(
                "unsupported store backend `{other}` (expected firestore|memory)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl StoreConfig {
    /// Resolves the Firestore credentials. Checked when a repository is built
    /// rather than at load, so the server can still answer address lookups and
    /// report the problem per call.
    pub fn credentials(&self) -> Result<FirestoreCredentials, ConfigError> {
        let project_id = self
            .project_id
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                ConfigError::MissingCredentials(
                    "store.project_id is required for the firestore backend".to_string(),
                )
            })?;

        let access_token = self
            .access_token
            .as_ref()
            .filter(|token| !token.expose_secret().trim().is_empty())
            .ok_or_else(|| {
                ConfigError::MissingCredentials(
                    "store.access_token is required for the firestore backend".to_string(),
                )
            })?;

        Ok(FirestoreCredentials {
            project_id: project_id.to_string(),
            database_id: self.database_id.clone(),
            access_token: access_token.clone(),
        })
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("rolodex.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(store) = patch.store {
            if let Some(backend) = store.backend {
                self.store.backend = backend;
            }
            if let Some(project_id) = store.project_id {
                self.store.project_id = Some(project_id);
            }
            if let Some(database_id) = store.database_id {
                self.store.database_id = database_id;
            }
            if let Some(store_access_token_value) = store.access_token {
                self.store.access_token = Some(secret_value(store_access_token_value));
            }
            if let Some(base_url) = store.base_url {
                self.store.base_url = base_url;
            }
            if let Some(collection) = store.collection {
                self.store.collection = collection;
            }
            if let Some(timeout_secs) = store.timeout_secs {
                self.store.timeout_secs = timeout_secs;
            }
        }

        if let Some(geocoding) = patch.geocoding {
            if let Some(postal_code_url) = geocoding.postal_code_url {
                self.geocoding.postal_code_url = postal_code_url;
            }
            if let Some(geocode_url) = geocoding.geocode_url {
                self.geocoding.geocode_url = geocode_url;
            }
            if let Some(geocoding_api_key_value) = geocoding.api_key {
                self.geocoding.api_key = Some(secret_value(geocoding_api_key_value));
            }
            if let Some(timeout_secs) = geocoding.timeout_secs {
                self.geocoding.timeout_secs = timeout_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ROLODEX_STORE_BACKEND") {
            self.store.backend = value.parse()?;
        }
        if let Some(value) = read_env("ROLODEX_STORE_PROJECT_ID") {
            self.store.project_id = Some(value);
        }
        if let Some(value) = read_env("ROLODEX_STORE_DATABASE_ID") {
            self.store.database_id = value;
        }
        if let Some(value) = read_env("ROLODEX_STORE_ACCESS_TOKEN") {
            self.store.access_token = Some(secret_value(value));
        }
        if let Some(value) = read_env("ROLODEX_STORE_BASE_URL") {
            self.store.base_url = value;
        }
        if let Some(value) = read_env("ROLODEX_STORE_COLLECTION") {
            self.store.collection = value;
        }
        if let Some(value) = read_env("ROLODEX_STORE_TIMEOUT_SECS") {
            self.store.timeout_secs = parse_u64("ROLODEX_STORE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ROLODEX_GEOCODING_POSTAL_CODE_URL") {
            self.geocoding.postal_code_url = value;
        }
        if let Some(value) = read_env("ROLODEX_GEOCODING_GEOCODE_URL") {
            self.geocoding.geocode_url = value;
        }
        if let Some(value) = read_env("ROLODEX_GEOCODING_API_KEY") {
            self.geocoding.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("ROLODEX_GEOCODING_TIMEOUT_SECS") {
            self.geocoding.timeout_secs = parse_u64("ROLODEX_GEOCODING_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ROLODEX_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("ROLODEX_SERVER_PORT") {
            self.server.port = parse_u16("ROLODEX_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("ROLODEX_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("ROLODEX_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("ROLODEX_LOGGING_LEVEL").or_else(|| read_env("ROLODEX_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ROLODEX_LOGGING_FORMAT").or_else(|| read_env("ROLODEX_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(backend) = overrides.store_backend {
            self.store.backend = backend;
        }
        if let Some(project_id) = overrides.store_project_id {
            self.store.project_id = Some(project_id);
        }
        if let Some(access_token) = overrides.store_access_token {
            self.store.access_token = Some(secret_value(access_token));
        }
        if let Some(base_url) = overrides.store_base_url {
            self.store.base_url = base_url;
        }
        if let Some(api_key) = overrides.geocoding_api_key {
            self.geocoding.api_key = Some(secret_value(api_key));
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_store(&self.store)?;
        validate_geocoding(&self.geocoding)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("rolodex.toml"), PathBuf::from("config/rolodex.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_store(store: &StoreConfig) -> Result<(), ConfigError> {
    if !is_http_url(&store.base_url) {
        return Err(ConfigError::Validation(
            "store.base_url must start with http:// or https://".to_string(),
        ));
    }

    if store.database_id.trim().is_empty() {
        return Err(ConfigError::Validation("store.database_id must not be empty".to_string()));
    }

    let collection = store.collection.trim();
    if collection.is_empty() || collection.contains('/') {
        return Err(ConfigError::Validation(
            "store.collection must be a single non-empty collection id".to_string(),
        ));
    }

    if store.timeout_secs == 0 || store.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "store.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_geocoding(geocoding: &GeocodingConfig) -> Result<(), ConfigError> {
    if !is_http_url(&geocoding.postal_code_url) {
        return Err(ConfigError::Validation(
            "geocoding.postal_code_url must start with http:// or https://".to_string(),
        ));
    }

    if !is_http_url(&geocoding.geocode_url) {
        return Err(ConfigError::Validation(
            "geocoding.geocode_url must start with http:// or https://".to_string(),
        ));
    }

    if geocoding.timeout_secs == 0 || geocoding.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "geocoding.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    store: Option<StorePatch>,
    geocoding: Option<GeocodingPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct StorePatch {
    backend: Option<StoreBackend>,
    project_id: Option<String>,
    database_id: Option<String>,
    access_token: Option<String>,
    base_url: Option<String>,
    collection: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct GeocodingPatch {
    postal_code_url: Option<String>,
    geocode_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat, StoreBackend};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const ROLODEX_VARS: &[&str] = &[
        "ROLODEX_STORE_BACKEND",
        "ROLODEX_STORE_PROJECT_ID",
        "ROLODEX_STORE_ACCESS_TOKEN",
        "ROLODEX_STORE_TIMEOUT_SECS",
        "ROLODEX_GEOCODING_API_KEY",
        "ROLODEX_SERVER_PORT",
        "ROLODEX_LOG_LEVEL",
        "ROLODEX_LOG_FORMAT",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_load_without_credentials() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ROLODEX_VARS);

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(config.store.backend == StoreBackend::Firestore, "firestore is the default")?;
        ensure(config.store.collection == "customers", "default collection is customers")?;
        ensure(config.store.database_id == "(default)", "default database id")?;
        ensure(config.server.port == 8080, "default port is 8080")?;
        ensure(
            matches!(config.store.credentials(), Err(ConfigError::MissingCredentials(_))),
            "credentials should be reported missing",
        )
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_ROLODEX_ACCESS_TOKEN", "ya29.from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("rolodex.toml");
            fs::write(
                &path,
                r#"
[store]
project_id = "crm-demo"
access_token = "${TEST_ROLODEX_ACCESS_TOKEN}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;
            let credentials =
                config.store.credentials().map_err(|err| format!("credentials: {err}"))?;

            ensure(credentials.project_id == "crm-demo", "project id should come from file")?;
            ensure(
                credentials.access_token.expose_secret() == "ya29.from-env",
                "access token should be interpolated from environment",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_ROLODEX_ACCESS_TOKEN"]);
        result
    }

    #[test]
    fn unterminated_interpolation_is_rejected() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("rolodex.toml");
        fs::write(&path, "[store]\nproject_id = \"${UNTERMINATED\"\n")
            .map_err(|err| err.to_string())?;

        let result =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() });
        ensure(
            matches!(result, Err(ConfigError::UnterminatedInterpolation)),
            "unterminated ${ should fail",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ROLODEX_LOG_LEVEL", "warn");
        env::set_var("ROLODEX_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["ROLODEX_LOG_LEVEL", "ROLODEX_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ROLODEX_STORE_PROJECT_ID", "from-env");
        env::set_var("ROLODEX_SERVER_PORT", "9090");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("rolodex.toml");
            fs::write(
                &path,
                r#"
[store]
project_id = "from-file"
access_token = "token-from-file"
collection = "contacts"

[server]
port = 7070

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    server_port: Some(6060),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.server.port == 6060, "override port should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(
                config.store.project_id.as_deref() == Some("from-env"),
                "env project id should win over file",
            )?;
            ensure(config.store.collection == "contacts", "file collection should win over default")?;
            Ok(())
        })();

        clear_vars(&["ROLODEX_STORE_PROJECT_ID", "ROLODEX_SERVER_PORT"]);
        result
    }

    #[test]
    fn invalid_numeric_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ROLODEX_STORE_TIMEOUT_SECS", "soon");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected invalid override to fail".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::InvalidEnvOverride { ref key, .. } if key == "ROLODEX_STORE_TIMEOUT_SECS"
                ),
                "error should name the offending variable",
            )
        })();

        clear_vars(&["ROLODEX_STORE_TIMEOUT_SECS"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(ROLODEX_VARS);

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                store_base_url: Some("firestore.googleapis.com".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };
        ensure(
            matches!(error, ConfigError::Validation(ref message) if message.contains("store.base_url")),
            "validation failure should mention store.base_url",
        )
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ROLODEX_STORE_ACCESS_TOKEN", "ya29.secret-value");
        env::set_var("ROLODEX_GEOCODING_API_KEY", "AIza-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("ya29.secret-value"), "debug output leaks the access token")?;
            ensure(!debug.contains("AIza-secret-value"), "debug output leaks the api key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["ROLODEX_STORE_ACCESS_TOKEN", "ROLODEX_GEOCODING_API_KEY"]);
        result
    }

    #[test]
    fn memory_backend_is_selectable_from_env() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("ROLODEX_STORE_BACKEND", "memory");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            ensure(config.store.backend == StoreBackend::Memory, "backend should be memory")
        })();

        clear_vars(&["ROLODEX_STORE_BACKEND"]);
        result
    }
}
