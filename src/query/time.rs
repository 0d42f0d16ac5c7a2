//! Absolute and relative timestamp parsing for `start`/`end` values

use crate::error::{LogbookError, Result};
use chrono::{DateTime, Days, Duration, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

/// Offset-less formats, interpreted in the request's zone
const LOCAL_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Formats carrying an explicit offset
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%.f%z"];

static AMOUNT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)?\s*([a-z]+)").expect("relative time pattern is valid")
});

/// An amount of time to step back from "now".
///
/// Calendar units (months, days) are kept apart from the exact part so that
/// "1 month" means one calendar month, not thirty days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemporalAmount {
    pub months: u32,
    pub days: u64,
    pub millis: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Millis,
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
    Years,
}

impl Unit {
    fn parse(word: &str) -> Option<Self> {
        let unit = match word.to_ascii_lowercase().as_str() {
            "ms" | "milli" | "millis" | "millisecond" | "milliseconds" => Unit::Millis,
            "s" | "sec" | "secs" | "second" | "seconds" => Unit::Seconds,
            "m" | "min" | "mins" | "minute" | "minutes" => Unit::Minutes,
            "h" | "hr" | "hrs" | "hour" | "hours" => Unit::Hours,
            "d" | "day" | "days" => Unit::Days,
            "w" | "week" | "weeks" => Unit::Weeks,
            "mo" | "mon" | "mons" | "month" | "months" => Unit::Months,
            "y" | "yr" | "yrs" | "year" | "years" => Unit::Years,
            _ => return None,
        };
        Some(unit)
    }
}

impl TemporalAmount {
    /// Add `amount` of `unit`, rolling any fraction into the next finer unit
    fn add(&mut self, unit: Unit, amount: f64) {
        let whole = amount.trunc();
        let fraction = amount - whole;
        match unit {
            Unit::Years => {
                self.months = self.months.saturating_add((whole as u32).saturating_mul(12));
                if fraction > 0.0 {
                    self.add(Unit::Months, fraction * 12.0);
                }
            }
            Unit::Months => {
                self.months = self.months.saturating_add(whole as u32);
                if fraction > 0.0 {
                    self.add(Unit::Days, fraction * 30.0);
                }
            }
            Unit::Weeks => self.add(Unit::Days, amount * 7.0),
            Unit::Days => {
                self.days = self.days.saturating_add(whole as u64);
                if fraction > 0.0 {
                    self.add(Unit::Hours, fraction * 24.0);
                }
            }
            Unit::Hours => self.add_millis(amount * 3_600_000.0),
            Unit::Minutes => self.add_millis(amount * 60_000.0),
            Unit::Seconds => self.add_millis(amount * 1_000.0),
            Unit::Millis => self.add_millis(amount),
        }
    }

    fn add_millis(&mut self, millis: f64) {
        self.millis = self.millis.saturating_add(millis.round() as i64);
    }

    /// `now` minus this amount, `None` when it falls outside the calendar
    pub fn before(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        now.checked_sub_months(Months::new(self.months))?
            .checked_sub_days(Days::new(self.days))?
            .checked_sub_signed(Duration::try_milliseconds(self.millis)?)
    }
}

/// Parse a relative expression such as `2 hours`, `1.5d`, `3 weeks ago` or `now`
pub fn parse_relative(text: &str) -> Option<TemporalAmount> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("now") {
        return Some(TemporalAmount::default());
    }

    let mut amount = TemporalAmount::default();
    let mut matched_unit = false;
    let mut last_end = 0;
    for captures in AMOUNT_PATTERN.captures_iter(text) {
        let whole = captures.get(0)?;
        if !is_separator(&text[last_end..whole.start()]) {
            return None;
        }
        last_end = whole.end();

        let number = captures.get(1);
        let word = captures.get(2)?.as_str();
        if number.is_none() && word.eq_ignore_ascii_case("ago") {
            continue;
        }
        let unit = Unit::parse(word)?;
        let value = match number {
            Some(n) => n.as_str().parse::<f64>().ok()?,
            None => 1.0,
        };
        amount.add(unit, value);
        matched_unit = true;
    }

    if matched_unit && is_separator(&text[last_end..]) {
        Some(amount)
    } else {
        None
    }
}

fn is_separator(gap: &str) -> bool {
    gap.chars().all(|c| c.is_whitespace() || c == ',')
}

/// Parse an absolute timestamp; offset-less text is read in `zone`
pub fn parse_absolute(text: &str, zone: Tz) -> Result<Option<DateTime<Utc>>> {
    let text = text.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(Some(parsed.with_timezone(&Utc)));
    }
    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(text, format) {
            return Ok(Some(parsed.with_timezone(&Utc)));
        }
    }

    let naive = LOCAL_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        });

    match naive {
        Some(naive) => zone
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| Some(local.with_timezone(&Utc)))
            .ok_or_else(|| {
                LogbookError::MalformedQuery(format!(
                    "time '{}' does not exist in zone {}",
                    text, zone
                ))
            }),
        None => Ok(None),
    }
}

/// Resolve a `start`/`end` value to an instant
pub fn parse_instant(text: &str, now: DateTime<Utc>, zone: Tz) -> Result<DateTime<Utc>> {
    if let Some(instant) = parse_absolute(text, zone)? {
        return Ok(instant);
    }
    parse_relative(text)
        .and_then(|amount| amount.before(now))
        .ok_or_else(|| LogbookError::MalformedQuery(format!("unable to parse time '{}'", text)))
}
