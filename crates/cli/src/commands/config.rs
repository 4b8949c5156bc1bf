use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use rolodex_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

/// One reported setting: dotted key, rendered value and the env vars that
/// can set it.
struct Entry {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines =
        vec!["effective config (source precedence: env > file > default):".to_string()];
    for entry in entries(&config) {
        let source = field_source(
            entry.key,
            entry.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(format!("- {} = {} (source: {source})", entry.key, entry.value));
    }

    lines.join("\n")
}

fn entries(config: &AppConfig) -> Vec<Entry> {
    let store = &config.store;
    let geocoding = &config.geocoding;
    let server = &config.server;
    let logging = &config.logging;

    vec![
        Entry {
            key: "store.backend",
            value: format!("{:?}", store.backend).to_lowercase(),
            env_keys: &["ROLODEX_STORE_BACKEND"],
        },
        Entry {
            key: "store.project_id",
            value: store.project_id.clone().unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["ROLODEX_STORE_PROJECT_ID"],
        },
        Entry {
            key: "store.database_id",
            value: store.database_id.clone(),
            env_keys: &["ROLODEX_STORE_DATABASE_ID"],
        },
        Entry {
            key: "store.access_token",
            value: redact_secret(store.access_token.as_ref()),
            env_keys: &["ROLODEX_STORE_ACCESS_TOKEN"],
        },
        Entry {
            key: "store.base_url",
            value: store.base_url.clone(),
            env_keys: &["ROLODEX_STORE_BASE_URL"],
        },
        Entry {
            key: "store.collection",
            value: store.collection.clone(),
            env_keys: &["ROLODEX_STORE_COLLECTION"],
        },
        Entry {
            key: "store.timeout_secs",
            value: store.timeout_secs.to_string(),
            env_keys: &["ROLODEX_STORE_TIMEOUT_SECS"],
        },
        Entry {
            key: "geocoding.postal_code_url",
            value: geocoding.postal_code_url.clone(),
            env_keys: &["ROLODEX_GEOCODING_POSTAL_CODE_URL"],
        },
        Entry {
            key: "geocoding.geocode_url",
            value: geocoding.geocode_url.clone(),
            env_keys: &["ROLODEX_GEOCODING_GEOCODE_URL"],
        },
        Entry {
            key: "geocoding.api_key",
            value: redact_secret(geocoding.api_key.as_ref()),
            env_keys: &["ROLODEX_GEOCODING_API_KEY"],
        },
        Entry {
            key: "geocoding.timeout_secs",
            value: geocoding.timeout_secs.to_string(),
            env_keys: &["ROLODEX_GEOCODING_TIMEOUT_SECS"],
        },
        Entry {
            key: "server.bind_address",
            value: server.bind_address.clone(),
            env_keys: &["ROLODEX_SERVER_BIND_ADDRESS"],
        },
        Entry {
            key: "server.port",
            value: server.port.to_string(),
            env_keys: &["ROLODEX_SERVER_PORT"],
        },
        Entry {
            key: "server.graceful_shutdown_secs",
            value: server.graceful_shutdown_secs.to_string(),
            env_keys: &["ROLODEX_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        },
        Entry {
            key: "logging.level",
            value: logging.level.clone(),
            env_keys: &["ROLODEX_LOGGING_LEVEL", "ROLODEX_LOG_LEVEL"],
        },
        Entry {
            key: "logging.format",
            value: format!("{:?}", logging.format).to_lowercase(),
            env_keys: &["ROLODEX_LOGGING_FORMAT", "ROLODEX_LOG_FORMAT"],
        },
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("rolodex.toml"), PathBuf::from("config/rolodex.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn redact_secret(secret: Option<&SecretString>) -> String {
    match secret.map(|value| value.expose_secret().trim().is_empty()) {
        None => "<unset>".to_string(),
        Some(true) => "<empty>".to_string(),
        Some(false) => "<redacted>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use toml::Value;

    use super::{contains_path, redact_secret};

    #[test]
    fn secrets_never_render_their_value() {
        let token = SecretString::from("ya29.super-secret".to_string());

        assert_eq!(redact_secret(Some(&token)), "<redacted>");
        assert_eq!(redact_secret(Some(&SecretString::from(" ".to_string()))), "<empty>");
        assert_eq!(redact_secret(None), "<unset>");
    }

    #[test]
    fn dotted_paths_are_resolved_in_toml_documents() {
        let doc: Value = "[store]\nproject_id = \"demo\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "store.project_id"));
        assert!(!contains_path(&doc, "store.access_token"));
        assert!(!contains_path(&doc, "server.port"));
    }
}
