//! Reconciling `start`/`end` parameters into one inclusive interval

use crate::error::{LogbookError, Result};
use crate::query::params::{ParameterKey, SearchParameters};
use crate::query::time::parse_instant;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Inclusive search interval, always `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Also match entries with any event inside the interval
    pub include_events: bool,
}

/// Resolve the zone requested with `tz`, falling back to `default_zone`
pub fn resolve_zone(parameters: &SearchParameters, default_zone: Tz) -> Result<Tz> {
    match parameters
        .values(ParameterKey::TimeZone)
        .map(str::trim)
        .find(|zone| !zone.is_empty())
    {
        Some(name) => name
            .parse::<Tz>()
            .map_err(|_| LogbookError::MalformedQuery(format!("unknown time zone '{}'", name))),
        None => Ok(default_zone),
    }
}

/// Resolve every `start`/`end` value against `now`.
///
/// The earliest start and the latest end win. Without any start the range
/// opens at the epoch; without any end it closes at `now`.
pub fn resolve_range(
    parameters: &SearchParameters,
    now: DateTime<Utc>,
    default_zone: Tz,
) -> Result<TemporalRange> {
    let zone = resolve_zone(parameters, default_zone)?;
    let now = truncate_millis(now);

    let start = resolve_all(parameters, ParameterKey::Start, now, zone)?
        .into_iter()
        .min()
        .unwrap_or(DateTime::UNIX_EPOCH);
    let end = resolve_all(parameters, ParameterKey::End, now, zone)?
        .into_iter()
        .max()
        .unwrap_or(now);

    if start > end {
        return Err(LogbookError::InvalidTimeRange {
            start,
            end,
            parameters: parameters.clone(),
        });
    }

    Ok(TemporalRange {
        start,
        end,
        include_events: parameters.contains(ParameterKey::IncludeEvents),
    })
}

fn resolve_all(
    parameters: &SearchParameters,
    key: ParameterKey,
    now: DateTime<Utc>,
    zone: Tz,
) -> Result<Vec<DateTime<Utc>>> {
    parameters
        .values(key)
        .filter(|value| !value.trim().is_empty())
        .map(|value| parse_instant(value, now, zone).map(truncate_millis))
        .collect()
}

fn truncate_millis(instant: DateTime<Utc>) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(instant.timestamp_millis())
        .single()
        .unwrap_or(instant)
}
