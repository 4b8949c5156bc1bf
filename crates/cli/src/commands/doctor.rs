use rolodex_core::config::{AppConfig, LoadOptions, StoreBackend};
use rolodex_db::customer_repository;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::commands::{runtime, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

impl DoctorCheck {
    fn skipped(name: &'static str, reason: &str) -> Self {
        Self { name, status: CheckStatus::Skipped, details: format!("skipped because {reason}") }
    }
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

/// Runs every readiness check. Skipped checks do not fail the report; exit
/// code 1 means at least one check failed.
pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            let credentials = check_store_credentials(&config);
            let credentials_ok = credentials.status == CheckStatus::Pass;
            checks.push(credentials);
            checks.push(if credentials_ok {
                check_store_connectivity(&config)
            } else {
                DoctorCheck::skipped("store_connectivity", "store credentials are missing")
            });
            checks.push(check_geocoding_key(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["store_credentials", "store_connectivity", "geocoding_api_key"] {
                checks.push(DoctorCheck::skipped(name, "configuration did not load"));
            }
        }
    }

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_store_credentials(config: &AppConfig) -> DoctorCheck {
    let name = "store_credentials";
    if config.store.backend == StoreBackend::Memory {
        return DoctorCheck {
            name,
            status: CheckStatus::Pass,
            details: "memory backend needs no credentials".to_string(),
        };
    }

    match config.store.credentials() {
        Ok(credentials) => DoctorCheck {
            name,
            status: CheckStatus::Pass,
            details: format!(
                "project `{}`, database `{}`",
                credentials.project_id, credentials.database_id
            ),
        },
        Err(error) => DoctorCheck { name, status: CheckStatus::Fail, details: error.to_string() },
    }
}

fn check_store_connectivity(config: &AppConfig) -> DoctorCheck {
    let name = "store_connectivity";
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(details) => return DoctorCheck { name, status: CheckStatus::Fail, details },
    };

    let result = runtime.block_on(async {
        let repository = customer_repository(&config.store)
            .map_err(|error| format!("failed to build store client: {error}"))?;
        repository.ping().await.map_err(|error| format!("store query failed: {error}"))?;
        Ok::<String, String>(repository.collection().to_string())
    });

    match result {
        Ok(collection) => DoctorCheck {
            name,
            status: CheckStatus::Pass,
            details: format!("queried collection `{collection}`"),
        },
        Err(details) => DoctorCheck { name, status: CheckStatus::Fail, details },
    }
}

fn check_geocoding_key(config: &AppConfig) -> DoctorCheck {
    let configured = config
        .geocoding
        .api_key
        .as_ref()
        .is_some_and(|key| !key.expose_secret().trim().is_empty());
    if configured {
        DoctorCheck {
            name: "geocoding_api_key",
            status: CheckStatus::Pass,
            details: "api key configured; reverse zip lookups enabled".to_string(),
        }
    } else {
        DoctorCheck::skipped("geocoding_api_key", "no api key is set; reverse zip lookups are off")
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
