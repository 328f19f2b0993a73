//! Time values that cross the wire or drive the reconnect handshake.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// Client-clock time of the most recent successfully processed server event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EventTime {
    #[default]
    Never,
    At(i64),
}

impl EventTime {
    pub fn as_millis(self) -> Option<i64> {
        match self {
            EventTime::Never => None,
            EventTime::At(ms) => Some(ms),
        }
    }

    /// Moves forward to `now_ms`; a reading older than the current one is
    /// ignored so a stepped-back clock never rewinds the backfill anchor.
    pub fn advance(&mut self, now_ms: i64) -> bool {
        match *self {
            EventTime::At(current) if current >= now_ms => false,
            _ => {
                *self = EventTime::At(now_ms);
                true
            }
        }
    }
}

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Parses a server timestamp into epoch milliseconds. Timestamps without an
/// offset are read as UTC.
pub fn parse_server_timestamp(raw: &str) -> Option<i64> {
    parse_server_datetime(raw).map(|dt| dt.timestamp_millis())
}

pub fn parse_server_datetime(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    None
}

/// Offset from the team's puzzle start at which a hint becomes visible.
///
/// Kept verbatim for display. Ordering uses the parsed duration when the text
/// reads as one (`"0:05:00"`, `"1 day, 2:00:00"`, or plain seconds) and
/// falls back to the raw text otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct HintTime(String);

impl HintTime {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_millis(&self) -> Option<u64> {
        parse_duration_ms(&self.0)
    }
}

impl fmt::Display for HintTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Ord for HintTime {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.as_millis(), other.as_millis()) {
            (Some(left), Some(right)) => left.cmp(&right).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for HintTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawHintTime {
    Text(String),
    Seconds(serde_json::Number),
}

impl<'de> Deserialize<'de> for HintTime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match RawHintTime::deserialize(deserializer)? {
            RawHintTime::Text(text) => HintTime(text),
            RawHintTime::Seconds(number) => HintTime(number.to_string()),
        })
    }
}

/// Reads `[N day[s], ]H:MM:SS[.ffffff]` or a bare number of seconds.
pub fn parse_duration_ms(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    if let Ok(seconds) = raw.parse::<f64>() {
        if seconds.is_finite() && seconds >= 0.0 {
            return Some((seconds * 1000.0).round() as u64);
        }
        return None;
    }

    let (days, clock) = match raw.split_once(',') {
        Some((days, rest)) => {
            let days = days.trim();
            let count = days
                .strip_suffix("days")
                .or_else(|| days.strip_suffix("day"))?
                .trim()
                .parse::<u64>()
                .ok()?;
            (count, rest.trim())
        }
        None => (0, raw),
    };

    let mut parts = clock.split(':');
    let hours = parts.next()?.trim().parse::<u64>().ok()?;
    let minutes = parts.next()?.trim().parse::<u64>().ok()?;
    let seconds = parts.next()?.trim().parse::<f64>().ok()?;
    if parts.next().is_some() || !seconds.is_finite() || seconds < 0.0 {
        return None;
    }

    let whole = days
        .checked_mul(86_400_000)?
        .checked_add(hours.checked_mul(3_600_000)?)?
        .checked_add(minutes.checked_mul(60_000)?)?;
    whole.checked_add((seconds * 1000.0).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_time_only_moves_forward() {
        let mut time = EventTime::Never;
        assert!(time.advance(1_000));
        assert!(!time.advance(900));
        assert_eq!(time, EventTime::At(1_000));
        assert!(time.advance(1_500));
        assert_eq!(time.as_millis(), Some(1_500));
    }

    #[test]
    fn parses_common_server_timestamps() {
        let expected = Some(1_700_000_000_000);
        assert_eq!(parse_server_timestamp("2023-11-14T22:13:20Z"), expected);
        assert_eq!(parse_server_timestamp("2023-11-14T22:13:20.000+00:00"), expected);
        assert_eq!(parse_server_timestamp("2023-11-14 22:13:20+00:00"), expected);
        assert_eq!(parse_server_timestamp("2023-11-14 23:13:20+01"), expected);
        assert_eq!(parse_server_timestamp("2023-11-14 22:13:20"), expected);
        assert_eq!(parse_server_timestamp("yesterday"), None);
    }

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration_ms("0:05:00"), Some(300_000));
        assert_eq!(parse_duration_ms("1 day, 2:00:00"), Some(93_600_000));
        assert_eq!(parse_duration_ms("2 days, 0:00:00.5"), Some(172_800_500));
        assert_eq!(parse_duration_ms("90"), Some(90_000));
        assert_eq!(parse_duration_ms("soon"), None);
        assert_eq!(parse_duration_ms("-5"), None);
    }

    #[test]
    fn hint_times_order_by_duration_then_text() {
        let mut times = vec![
            HintTime::new("1:00:00"),
            HintTime::new("later"),
            HintTime::new("0:10:00"),
            HintTime::new("1 day, 0:00:00"),
        ];
        times.sort();
        let ordered: Vec<&str> = times.iter().map(HintTime::as_str).collect();
        assert_eq!(ordered, ["0:10:00", "1:00:00", "1 day, 0:00:00", "later"]);
    }
}
