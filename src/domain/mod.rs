pub mod changelog;
pub mod commit;
pub mod normalize;
pub mod prompt;
pub mod repository;

use chrono::{DateTime, SecondsFormat, Utc};

/// RFC 3339 in UTC with whole seconds and a `Z` suffix, e.g. `2024-01-01T00:00:00Z`.
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|err| format!("expected an RFC 3339 timestamp like 2024-01-01T00:00:00Z: {err}"))
}
