//! TOML configuration for the CLI.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Lower bound for the sync window: "now", an RFC 3339 instant, or
    /// a plain date taken as UTC midnight. Defaults to "now".
    pub start_from: Option<String>,
    pub calendar: CalendarConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CalendarConfig {
    /// Destination calendar id, e.g. "abc123@group.calendar.google.com".
    pub google_id: String,
    /// Path to the source .ics file.
    pub source: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Account name the stored session was saved under.
    pub account: String,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("could not read config at {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("invalid config at {}", path.display()))?;
        Ok(config)
    }

    /// Resolves `start_from` into a concrete instant.
    pub fn start_boundary(&self) -> Result<DateTime<Utc>> {
        let value = self.start_from.as_deref().unwrap_or("now");
        parse_boundary(value)
    }
}

fn parse_boundary(value: &str) -> Result<DateTime<Utc>> {
    if value.eq_ignore_ascii_case("now") {
        return Ok(Utc::now());
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()).unwrap_or_default());
    }
    bail!("start_from must be \"now\", an RFC 3339 instant, or YYYY-MM-DD, got {value:?}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_a_full_config() {
        let config: Config = toml::from_str(
            r#"
            start_from = "2024-01-01"

            [calendar]
            google_id = "abc@group.calendar.google.com"
            source = "schedule.ics"

            [auth]
            account = "alice@example.com"
            "#,
        )
        .unwrap();
        assert_eq!(config.calendar.source, "schedule.ics");
        assert_eq!(
            config.start_boundary().unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn start_from_defaults_to_now() {
        let config: Config = toml::from_str(
            r#"
            [calendar]
            google_id = "abc@group.calendar.google.com"
            source = "schedule.ics"

            [auth]
            account = "alice@example.com"
            "#,
        )
        .unwrap();
        let before = Utc::now();
        let boundary = config.start_boundary().unwrap();
        assert!(boundary >= before && boundary <= Utc::now());
    }

    #[test]
    fn accepts_rfc3339_with_offset() {
        let boundary = parse_boundary("2024-03-01T10:00:00+03:00").unwrap();
        assert_eq!(boundary, Utc.with_ymd_and_hms(2024, 3, 1, 7, 0, 0).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_boundary("tomorrow").is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<Config, _> = toml::from_str(
            r#"
            start_form = "now"

            [calendar]
            google_id = "abc"
            source = "s.ics"

            [auth]
            account = "a"
            "#,
        );
        assert!(result.is_err());
    }
}
