//! Environment variable names used by this crate and the helpers that
//! turn them into a [`DispatcherConfig`].
//!
//! These are purely helpers; drivers and the dispatcher never read the
//! environment themselves.

use crate::config::{
    DispatcherConfig, EnvironmentInfo, PostgresConfig, PubSubConfig, DEFAULT_SERVICE,
    DEFAULT_TABLE, DEFAULT_TOPIC,
};

/// Overrides the default service name.
pub const LOG_SERVICE_NAME_ENV: &str = "LOG_SERVICE_NAME";

/// Deployment stage; `prod`, `production`, `qas` and `qa` are production-like.
pub const STAGE_ENV: &str = "ENV";

/// Set by Cloud Run.
pub const CLOUD_RUN_SERVICE_ENV: &str = "K_SERVICE";
/// Set by App Engine.
pub const APP_ENGINE_SERVICE_ENV: &str = "GAE_SERVICE";
/// Set by Cloud Functions.
pub const CLOUD_FUNCTION_TARGET_ENV: &str = "FUNCTION_TARGET";

/// Postgres connection URL.
pub const DB_URL_ENV: &str = "DB_URL";
/// Postgres audit table name.
pub const DB_TABLE_ENV: &str = "DB_TABLE";

/// Google Cloud project id, with a legacy alias.
pub const PROJECT_ENV: &str = "GOOGLE_CLOUD_PROJECT";
pub const PROJECT_ALIAS_ENV: &str = "GCP_PROJECT";
/// Pub/Sub topic name.
pub const TOPIC_ENV: &str = "PUBSUB_TOPIC_NAME";
/// Publishing switch; only the exact value `true` enables publishing.
pub const PUBLISH_ENABLED_ENV: &str = "SDKTRACKING_PUBLISH";
/// Local emulator address.
pub const EMULATOR_HOST_ENV: &str = "PUBSUB_EMULATOR_HOST";
/// Static OAuth access token for publishing.
pub const ACCESS_TOKEN_ENV: &str = "PUBSUB_ACCESS_TOKEN";

/// Disables ANSI colors in diagnostics when set.
pub const NO_COLOR_ENV: &str = "NO_COLOR";
/// Forces ANSI colors in diagnostics when set.
pub const FORCE_COLOR_ENV: &str = "FORCE_COLOR";
/// `tracing` filter directive for diagnostics output.
pub const DIAGNOSTICS_FILTER_ENV: &str = "TRACE_LOG_DIAGNOSTICS";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read a variable, treating empty values as unset.
fn non_empty(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

impl EnvironmentInfo {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let hosted_in_cloud = [
            CLOUD_RUN_SERVICE_ENV,
            APP_ENGINE_SERVICE_ENV,
            CLOUD_FUNCTION_TARGET_ENV,
        ]
        .iter()
        .any(|key| non_empty(&lookup, key).is_some());

        let stage = lookup(STAGE_ENV).unwrap_or_default().to_ascii_lowercase();
        let production_like = matches!(stage.as_str(), "prod" | "production" | "qas" | "qa");

        Self {
            hosted_in_cloud,
            production_like,
        }
    }
}

impl PostgresConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            db_url: non_empty(&lookup, DB_URL_ENV),
            table: non_empty(&lookup, DB_TABLE_ENV).unwrap_or_else(|| DEFAULT_TABLE.to_string()),
        }
    }
}

impl PubSubConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            project_id: non_empty(&lookup, PROJECT_ENV)
                .or_else(|| non_empty(&lookup, PROJECT_ALIAS_ENV)),
            topic_name: non_empty(&lookup, TOPIC_ENV).unwrap_or_else(|| DEFAULT_TOPIC.to_string()),
            publish_enabled: lookup(PUBLISH_ENABLED_ENV).map_or(true, |v| v == "true"),
            emulator_host: non_empty(&lookup, EMULATOR_HOST_ENV),
            access_token: non_empty(&lookup, ACCESS_TOKEN_ENV),
        }
    }
}

impl DispatcherConfig {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            service: non_empty(&lookup, LOG_SERVICE_NAME_ENV)
                .unwrap_or_else(|| DEFAULT_SERVICE.to_string()),
            environment: EnvironmentInfo::from_lookup(&lookup),
            postgres: PostgresConfig::from_lookup(&lookup),
            pubsub: PubSubConfig::from_lookup(&lookup),
        }
    }
}
