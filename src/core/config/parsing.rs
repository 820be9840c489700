use std::{env, str::FromStr};

use super::types::{ConfigError, Environment};

const DEFAULT_CORS_ORIGINS: &[&str] = &["http://localhost:5173", "http://localhost:8080"];

pub(super) fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

pub(super) fn env_or_default(key: &str, default: &str) -> String {
    env_optional(key).unwrap_or_else(|| default.to_string())
}

/// Parses `key` as `T`, falling back to `default` when unset or blank.
pub(super) fn env_parse<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env_optional(key) {
        Some(value) => parse_value(key, value),
        None => Ok(default),
    }
}

/// Like [`env_parse`] for intervals and budgets, where zero would stall polling.
pub(super) fn env_positive(key: &'static str, default: u64) -> Result<u64, ConfigError> {
    match env_parse(key, default)? {
        0 => Err(ConfigError::InvalidValue { field: key, value: "0".to_string() }),
        value => Ok(value),
    }
}

pub(super) fn env_flag(key: &str) -> bool {
    env_optional(key).is_some_and(|value| parse_bool(&value))
}

fn parse_value<T: FromStr>(field: &'static str, value: String) -> Result<T, ConfigError> {
    value.parse::<T>().map_err(|_| ConfigError::InvalidValue { field, value })
}

/// Accepts a JSON array or a comma separated list.
pub(super) fn parse_cors_origins(value: Option<String>) -> Result<Vec<String>, ConfigError> {
    let raw = value.unwrap_or_default();
    let origins: Vec<String> = if raw.trim_start().starts_with('[') {
        serde_json::from_str(&raw).map_err(|_| ConfigError::InvalidCors(raw.clone()))?
    } else {
        raw.split(',').map(str::trim).filter(|item| !item.is_empty()).map(String::from).collect()
    };

    if origins.is_empty() {
        return Ok(DEFAULT_CORS_ORIGINS.iter().map(|item| item.to_string()).collect());
    }
    Ok(origins)
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

pub(super) fn parse_environment(value: Option<String>) -> Environment {
    match value.map(|item| item.to_lowercase()).as_deref() {
        Some("production" | "prod") => Environment::Production,
        Some("staging") => Environment::Staging,
        Some("test" | "testing") => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cors_origins_accept_json_and_csv() {
        let json = parse_cors_origins(Some("[\"http://a\",\"http://b\"]".to_string()));
        let csv = parse_cors_origins(Some("http://a, http://b,".to_string()));

        assert_eq!(json.expect("json"), vec!["http://a", "http://b"]);
        assert_eq!(csv.expect("csv"), vec!["http://a", "http://b"]);
    }

    #[test]
    fn cors_origins_fall_back_when_blank() {
        assert_eq!(parse_cors_origins(None).expect("unset").len(), DEFAULT_CORS_ORIGINS.len());
        assert_eq!(parse_cors_origins(Some("[]".to_string())).expect("empty").len(), 2);
        assert!(parse_cors_origins(Some("[\"http://a\"".to_string())).is_err());
    }

    #[test]
    fn flags_ignore_case() {
        assert!(parse_bool("ON"));
        assert!(parse_bool("Yes"));
        assert!(!parse_bool("off"));
        assert!(!parse_bool("0"));
    }

    #[test]
    fn environment_aliases() {
        assert_eq!(parse_environment(Some("PROD".to_string())), Environment::Production);
        assert_eq!(parse_environment(Some("testing".to_string())), Environment::Test);
        assert_eq!(parse_environment(Some("qa".to_string())), Environment::Development);
        assert_eq!(parse_environment(None), Environment::Development);
    }

    #[test]
    fn parse_errors_name_the_variable() {
        let err = parse_value::<u64>("STATUS_RATE_LIMIT", "many".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for STATUS_RATE_LIMIT: many");
    }
}
