use chrono::{DateTime, SecondsFormat, Utc};

/// The kind of value a whitelisted field holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueKind {
    /// Opaque text compared byte for byte.
    #[default]
    Text,
    /// An RFC 3339 instant, normalized to UTC before comparison.
    Timestamp,
}

/// Render an instant in the canonical form used by predicates.
///
/// Canonical timestamps share one width and zone, so comparing them as
/// strings orders them chronologically.
pub fn render_timestamp(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a client-supplied RFC 3339 instant into its canonical form.
pub fn normalize_timestamp(value: &str) -> Result<String, chrono::ParseError> {
    let instant = DateTime::parse_from_rfc3339(value.trim())?;
    Ok(render_timestamp(&instant.with_timezone(&Utc)))
}
