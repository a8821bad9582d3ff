use crate::error::{GraderError, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

const LOCAL_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

/// Parses a due date given either as RFC 3339 or as local wall-clock time in
/// the IANA zone `timezone`.
pub fn parse_due(raw: &str, timezone: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }

    let tz: Tz = timezone
        .parse()
        .map_err(|e| GraderError::InvalidScoreInput(format!("unknown time zone {timezone}: {e}")))?;

    let naive = LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| {
            GraderError::InvalidScoreInput(format!(
                "due date `{raw}` is not RFC 3339 or YYYY-MM-DD HH:MM[:SS]"
            ))
        })?;

    // Ambiguous wall-clock times (DST fall-back) resolve to the later instant.
    tz.from_local_datetime(&naive)
        .latest()
        .map(|local| local.with_timezone(&Utc))
        .ok_or_else(|| {
            GraderError::InvalidScoreInput(format!(
                "due date `{raw}` does not exist in {timezone}"
            ))
        })
}

/// Parses a timestamp reported by the CI provider.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|e| GraderError::InvalidScoreInput(format!("bad timestamp `{raw}`: {e}")))
}
