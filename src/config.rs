//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Runtime configuration for the triage service.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    /// Base URL of the evaluations backend (no trailing slash).
    pub api_base_url: String,
    /// Port the board REST/WebSocket server listens on.
    pub port: u16,
    /// How often the board re-fetches evaluations.
    pub refresh_interval: Duration,
    /// Timeout applied to every backend request.
    pub http_timeout: Duration,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".to_string(),
            port: 8080,
            refresh_interval: Duration::from_secs(30),
            http_timeout: Duration::from_secs(15),
        }
    }
}

impl TriageConfig {
    /// Load configuration from `INTAKE_TRIAGE_*` environment variables.
    ///
    /// `INTAKE_TRIAGE_API_URL` is required; the rest fall back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = lookup("INTAKE_TRIAGE_API_URL")
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("INTAKE_TRIAGE_API_URL".into()))?;

        let port = parse_or(&lookup, "INTAKE_TRIAGE_PORT", defaults.port)?;
        let refresh_secs = parse_or(
            &lookup,
            "INTAKE_TRIAGE_REFRESH_SECS",
            defaults.refresh_interval.as_secs(),
        )?;
        let timeout_secs = parse_or(
            &lookup,
            "INTAKE_TRIAGE_HTTP_TIMEOUT_SECS",
            defaults.http_timeout.as_secs(),
        )?;

        if refresh_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "INTAKE_TRIAGE_REFRESH_SECS".into(),
                message: "must be greater than zero".into(),
            });
        }
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "INTAKE_TRIAGE_HTTP_TIMEOUT_SECS".into(),
                message: "must be greater than zero".into(),
            });
        }

        Ok(Self {
            api_base_url,
            port,
            refresh_interval: Duration::from_secs(refresh_secs),
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}
