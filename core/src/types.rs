use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::round::RoundTo;

/// Athlete parameters, constant across a scoring run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AthleteParameters {
    pub weight_kg: f64,   // kg
    pub hr_rest: u32,     // bpm
    pub hr_max: u32,      // bpm
    pub base_offset: f64, // subtracted from the efficiency ratio
}

impl Default for AthleteParameters {
    fn default() -> Self {
        Self {
            weight_kg: 74.0,
            hr_rest: 60,
            hr_max: 185,
            base_offset: 2.0,
        }
    }
}

impl AthleteParameters {
    /// Heart-rate-reserve range (hr_max - hr_rest). May be zero or negative.
    pub fn hrr_range(&self) -> f64 {
        f64::from(self.hr_max) - f64::from(self.hr_rest)
    }

    /// Range checks for parameters coming from config files or the command line.
    /// The score engine itself never calls this; it guards its divisions instead.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.weight_kg.is_finite() && self.weight_kg > 0.0) {
            return Err(format!("weight_kg must be > 0 (got {})", self.weight_kg));
        }
        if self.hr_max <= self.hr_rest {
            return Err(format!(
                "hr_max must be greater than hr_rest (got hr_max={}, hr_rest={})",
                self.hr_max, self.hr_rest
            ));
        }
        if !(self.base_offset.is_finite() && self.base_offset >= 0.0) {
            return Err(format!("base_offset must be >= 0 (got {})", self.base_offset));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionHeader {
    pub timestamp: DateTime<Utc>,
    pub ascent_m: f64,   // meter
    pub distance_m: f64, // meter
    pub duration_s: f64, // seconds
}

impl Default for SessionHeader {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
            ascent_m: 0.0,
            distance_m: 0.0,
            duration_s: 1.0,
        }
    }
}

/// One session in the shape the score engine consumes.
///
/// `beat_intervals_ms` are R-R intervals: their running sum is elapsed time,
/// not a sample count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalSession {
    pub header: SessionHeader,
    pub power_samples: Vec<f64>,
    pub beat_intervals_ms: Vec<f64>,
}

impl CanonicalSession {
    /// Builds a session, dropping non-positive beat intervals (sensor sentinels).
    pub fn new(header: SessionHeader, power_samples: Vec<f64>, beat_intervals_ms: Vec<f64>) -> Self {
        let beat_intervals_ms = beat_intervals_ms.into_iter().filter(|r| *r > 0.0).collect();
        Self {
            header,
            power_samples,
            beat_intervals_ms,
        }
    }

    /// Strictly positive beat intervals, in order.
    pub fn positive_intervals(&self) -> Vec<f64> {
        self.beat_intervals_ms.iter().copied().filter(|r| *r > 0.0).collect()
    }
}

/// Unrounded intermediate values of one scoring run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub timestamp: DateTime<Utc>,
    pub grade: f64,
    pub avg_power: f64,
    pub watt_adjusted: f64,
    pub avg_hr: f64,
    pub hrr_fraction: f64,
    pub first_half: HalfEfficiency,
    pub second_half: HalfEfficiency,
    pub decoupling: f64,
    pub w_per_kg: f64,
    pub efficiency_ratio: f64,
    pub decoupling_penalty: f64,
    pub score: f64,
    pub duration_s: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HalfEfficiency {
    pub power: f64,
    pub hr: f64,
    pub ef: f64,
}

/// Rounded, presentation-ready result for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub timestamp: DateTime<Utc>,
    pub watt_adjusted: f64,  // 1 dp
    pub hr_avg_bpm: f64,     // 1 dp
    pub hrr_pct: f64,        // percent, 1 dp
    pub decoupling_pct: f64, // percent, 2 dp
    pub score: f64,          // 3 dp
    pub duration_min: f64,   // 1 dp
}

impl From<&ScoreBreakdown> for ScoreResult {
    fn from(b: &ScoreBreakdown) -> Self {
        Self {
            timestamp: b.timestamp,
            watt_adjusted: b.watt_adjusted.round_to(1),
            hr_avg_bpm: b.avg_hr.round_to(1),
            hrr_pct: (b.hrr_fraction * 100.0).round_to(1),
            decoupling_pct: (b.decoupling * 100.0).round_to(2),
            score: b.score.round_to(3),
            duration_min: (b.duration_s / 60.0).round_to(1),
        }
    }
}
