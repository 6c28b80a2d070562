//! Raw inputs → [`CanonicalSession`].
//!
//! Two outcomes are kept apart: `Err(NormalizeError)` for payloads that cannot
//! be read at all, and `Ok(Normalized::Insufficient(_))` for readable inputs
//! that simply lack the data needed for a score.
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use log::debug;
use serde_json::Value;

use crate::error::NormalizeError;
use crate::models::{DeviceHeader, DeviceLogFile, StravaActivity, StreamSet};
use crate::types::{CanonicalSession, SessionHeader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insufficient {
    /// `DeviceLog` or `DeviceLog.Samples` missing.
    MissingStructure,
    NotARun,
    /// One of the time / watts / heartrate streams missing or empty.
    MissingStreams,
    NoPowerSamples,
    NoBeatIntervals,
}

impl Insufficient {
    pub fn reason(&self) -> &'static str {
        match self {
            Insufficient::MissingStructure => "missing_structure",
            Insufficient::NotARun => "not_a_run",
            Insufficient::MissingStreams => "missing_streams",
            Insufficient::NoPowerSamples => "no_power_samples",
            Insufficient::NoBeatIntervals => "no_beat_intervals",
        }
    }
}

impl fmt::Display for Insufficient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Session(CanonicalSession),
    Insufficient(Insufficient),
}

impl Normalized {
    pub fn into_session(self) -> Option<CanonicalSession> {
        match self {
            Normalized::Session(s) => Some(s),
            Normalized::Insufficient(_) => None,
        }
    }

    /// Final validity gate shared by both input variants.
    fn checked(session: CanonicalSession) -> Self {
        if session.power_samples.is_empty() {
            return Normalized::Insufficient(Insufficient::NoPowerSamples);
        }
        if session.beat_intervals_ms.is_empty() {
            return Normalized::Insufficient(Insufficient::NoBeatIntervals);
        }
        Normalized::Session(session)
    }
}

/// Accepts RFC 3339, or a naive ISO-8601 date-time read as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, NormalizeError> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(NormalizeError::Timestamp(raw.to_string()))
}

fn device_header(h: Option<&DeviceHeader>) -> Result<SessionHeader, NormalizeError> {
    let mut header = SessionHeader::default();
    let Some(h) = h else { return Ok(header) };

    if let Some(raw) = h.date_time.as_deref() {
        header.timestamp = parse_timestamp(raw)?;
    }
    header.ascent_m = h.ascent.unwrap_or(0.0);
    header.distance_m = h.distance.unwrap_or(0.0);
    header.duration_s = h.duration.unwrap_or(1.0);
    Ok(header)
}

/// Normalizes a device-exported JSON log given as text.
pub fn normalize_device_log_str(json: &str) -> Result<Normalized, NormalizeError> {
    let de = &mut serde_json::Deserializer::from_str(json);
    let file: DeviceLogFile = serde_path_to_error::deserialize(de)?;
    normalize_device_log(file)
}

/// Same as [`normalize_device_log_str`] for an already parsed document.
pub fn normalize_device_log_value(value: Value) -> Result<Normalized, NormalizeError> {
    let file: DeviceLogFile = serde_path_to_error::deserialize(value)?;
    normalize_device_log(file)
}

pub fn normalize_device_log(file: DeviceLogFile) -> Result<Normalized, NormalizeError> {
    let Some(device) = file.device_log else {
        return Ok(Normalized::Insufficient(Insufficient::MissingStructure));
    };
    let Some(samples) = device.samples else {
        return Ok(Normalized::Insufficient(Insufficient::MissingStructure));
    };

    let header = device_header(device.header.as_ref())?;
    let power: Vec<f64> = samples.iter().filter_map(|s| s.power).collect();
    let rr: Vec<f64> = device
        .rr
        .map(|b| b.data.into_iter().flatten().collect())
        .unwrap_or_default();

    debug!(
        "device log: {} samples, {} with power, {} raw R-R",
        samples.len(),
        power.len(),
        rr.len()
    );

    Ok(Normalized::checked(CanonicalSession::new(header, power, rr)))
}

/// Synthetic R-R intervals from a bpm series:
/// `interval[i] = 60000 / avg(bpm[i-1], bpm[i])` for `i in 1..n`.
/// Pairs with a missing or non-positive average are dropped.
pub fn intervals_from_bpm(bpm: &[Option<f64>]) -> Vec<f64> {
    bpm.windows(2)
        .filter_map(|w| match (w[0], w[1]) {
            (Some(a), Some(b)) => {
                let avg = (a + b) / 2.0;
                (avg > 0.0).then(|| 1000.0 * 60.0 / avg)
            }
            _ => None,
        })
        .collect()
}

/// Normalizes an activity summary plus its time / watts / heartrate streams.
/// Streams of unequal length are cut to the shortest one.
pub fn normalize_activity(activity: &StravaActivity, streams: &StreamSet) -> Normalized {
    if !activity.is_run() {
        return Normalized::Insufficient(Insufficient::NotARun);
    }

    let (time, watts, hr) = match (&streams.time, &streams.watts, &streams.heartrate) {
        (Some(t), Some(w), Some(h)) if !t.data.is_empty() && !w.data.is_empty() && !h.data.is_empty() => {
            (&t.data, &w.data, &h.data)
        }
        _ => return Normalized::Insufficient(Insufficient::MissingStreams),
    };

    let n = time.len().min(watts.len()).min(hr.len());
    if n != time.len() || n != watts.len() || n != hr.len() {
        debug!(
            "activity {}: stream lengths time={} watts={} hr={}, using {n}",
            activity.id,
            time.len(),
            watts.len(),
            hr.len()
        );
    }

    let power: Vec<f64> = watts[..n].iter().flatten().copied().collect();
    let rr = intervals_from_bpm(&hr[..n]);

    let header = SessionHeader {
        timestamp: activity.start_date.unwrap_or_else(Utc::now),
        ascent_m: activity.total_elevation_gain.unwrap_or(0.0),
        distance_m: activity.distance.map(|d| d.meters()).unwrap_or(0.0),
        duration_s: activity.elapsed_time.to_seconds(),
    };

    Normalized::checked(CanonicalSession::new(header, power, rr))
}
