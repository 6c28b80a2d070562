//! Raw input shapes, before normalization.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ──────────────────────────────────────────────────────────────────────────────
// Device-exported JSON log
// ──────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceLogFile {
    #[serde(rename = "DeviceLog", default)]
    pub device_log: Option<DeviceLog>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceLog {
    #[serde(rename = "Header", default)]
    pub header: Option<DeviceHeader>,
    #[serde(rename = "Samples", default)]
    pub samples: Option<Vec<DeviceSample>>,
    #[serde(rename = "R-R", default)]
    pub rr: Option<RrBlock>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceHeader {
    #[serde(rename = "DateTime", default)]
    pub date_time: Option<String>,
    #[serde(rename = "Ascent", default)]
    pub ascent: Option<f64>,   // meter
    #[serde(rename = "Distance", default)]
    pub distance: Option<f64>, // meter
    #[serde(rename = "Duration", default)]
    pub duration: Option<f64>, // seconds
}

/// One tick. Only `Power` is read; other keys are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceSample {
    #[serde(rename = "Power", default)]
    pub power: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RrBlock {
    /// Raw intervals (ms). Zero, negative and null entries are sensor artifacts.
    #[serde(rename = "Data", default)]
    pub data: Vec<Option<f64>>,
}

// ──────────────────────────────────────────────────────────────────────────────
// Activity-tracking service (Strava) summary + streams
// ──────────────────────────────────────────────────────────────────────────────

/// Elapsed time as the service (or a client library) may represent it.
/// Resolution order: plain seconds, `total_seconds`, `seconds`, otherwise 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElapsedTime {
    Seconds(f64),
    TotalSeconds { total_seconds: f64 },
    SecondsField { seconds: f64 },
    Unrecognized(Value),
}

impl Default for ElapsedTime {
    fn default() -> Self {
        ElapsedTime::Unrecognized(Value::Null)
    }
}

impl ElapsedTime {
    pub fn to_seconds(&self) -> f64 {
        match self {
            ElapsedTime::Seconds(s) => *s,
            ElapsedTime::TotalSeconds { total_seconds } => *total_seconds,
            ElapsedTime::SecondsField { seconds } => *seconds,
            ElapsedTime::Unrecognized(_) => 0.0,
        }
    }
}

/// Distance in meters, either bare or wrapped in a quantity object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Distance {
    Meters(f64),
    Quantity {
        #[serde(alias = "value")]
        num: f64,
    },
}

impl Distance {
    pub fn meters(&self) -> f64 {
        match self {
            Distance::Meters(m) => *m,
            Distance::Quantity { num } => *num,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StravaActivity {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub activity_type: String,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub elapsed_time: ElapsedTime,
    #[serde(default)]
    pub distance: Option<Distance>,
    #[serde(default)]
    pub total_elevation_gain: Option<f64>,
}

impl StravaActivity {
    pub fn is_run(&self) -> bool {
        self.activity_type == "Run"
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    #[serde(default)]
    pub data: Vec<Option<f64>>,
}

impl Stream {
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        Self { data: values.into_iter().map(Some).collect() }
    }
}

/// Streams keyed by type (`key_by_type=true`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamSet {
    #[serde(default)]
    pub time: Option<Stream>,
    #[serde(default)]
    pub watts: Option<Stream>,
    #[serde(default)]
    pub heartrate: Option<Stream>,
}
