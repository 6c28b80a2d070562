//! Many inputs through normalize + score, one outcome per input.
use log::{info, warn};
use ordered_float::OrderedFloat;
use rayon::prelude::*;
use serde::Serialize;

use crate::models::{StravaActivity, StreamSet};
use crate::normalize::{normalize_activity, normalize_device_log_str, Normalized};
use crate::score::score_session;
use crate::telemetry;
use crate::types::{AthleteParameters, ScoreResult};

/// Reference score of the peer group.
pub const PEER_MEDIAN_SCORE: f64 = 1.40;

#[derive(Debug, Clone)]
pub enum SessionInput {
    /// Device-exported JSON text, labelled (usually with its file name).
    DeviceLog { label: String, json: String },
    Activity { activity: StravaActivity, streams: StreamSet },
}

impl SessionInput {
    pub fn label(&self) -> String {
        match self {
            SessionInput::DeviceLog { label, .. } => label.clone(),
            SessionInput::Activity { activity, .. } if !activity.name.is_empty() => activity.name.clone(),
            SessionInput::Activity { activity, .. } => format!("activity {}", activity.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredRow {
    pub label: String,
    #[serde(flatten)]
    pub result: ScoreResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedInput {
    pub label: String,
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedInput {
    pub label: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    /// Sorted by session timestamp.
    pub rows: Vec<ScoredRow>,
    pub skipped: Vec<SkippedInput>,
    pub failed: Vec<FailedInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub sessions: usize,
    pub mean_score: f64,
    pub mean_decoupling_pct: f64,
    pub mean_watt_adjusted: f64,
    pub mean_hrr_pct: f64,
    pub best_label: String,
    pub best_score: f64,
    pub above_peer_median: bool,
}

enum Outcome {
    Scored(ScoredRow),
    Skipped(SkippedInput),
    Failed(FailedInput),
}

fn process_one(input: &SessionInput, params: &AthleteParameters) -> Outcome {
    let label = input.label();
    let normalized = match input {
        SessionInput::DeviceLog { json, .. } => match normalize_device_log_str(json) {
            Ok(n) => n,
            Err(e) => return Outcome::Failed(FailedInput { label, error: e.to_string() }),
        },
        SessionInput::Activity { activity, streams } => normalize_activity(activity, streams),
    };

    let session = match normalized {
        Normalized::Session(s) => s,
        Normalized::Insufficient(why) => {
            return Outcome::Skipped(SkippedInput { label, reason: why.reason() });
        }
    };

    match score_session(&session, params) {
        Some(result) => Outcome::Scored(ScoredRow { label, result }),
        None => Outcome::Skipped(SkippedInput { label, reason: "not_scorable" }),
    }
}

/// Scores every input in parallel. Skipped and failed inputs are collected,
/// never abort the batch.
pub fn run_batch(inputs: &[SessionInput], params: &AthleteParameters) -> BatchReport {
    let outcomes: Vec<Outcome> = inputs.par_iter().map(|i| process_one(i, params)).collect();

    let mut report = BatchReport::default();
    for outcome in outcomes {
        match outcome {
            Outcome::Scored(row) => report.push_scored(row),
            Outcome::Skipped(s) => report.push_skipped(s),
            Outcome::Failed(f) => report.push_failed(f),
        }
    }
    report.rows.sort_by_key(|r| r.result.timestamp);

    info!(
        "batch: {} scored, {} skipped, {} failed",
        report.rows.len(),
        report.skipped.len(),
        report.failed.len()
    );
    report
}

impl BatchReport {
    fn push_scored(&mut self, row: ScoredRow) {
        if let Some(m) = telemetry::global() {
            m.record_scored();
        }
        self.rows.push(row);
    }

    fn push_skipped(&mut self, s: SkippedInput) {
        warn!("skipped {}: insufficient data ({})", s.label, s.reason);
        if let Some(m) = telemetry::global() {
            m.record_skipped(s.reason);
        }
        self.skipped.push(s);
    }

    fn push_failed(&mut self, f: FailedInput) {
        warn!("failed {}: {}", f.label, f.error);
        if let Some(m) = telemetry::global() {
            m.record_failed();
        }
        self.failed.push(f);
    }

    /// Records an input that never reached the normalizer (e.g. a failed fetch).
    pub fn record_failure(&mut self, label: impl Into<String>, error: impl ToString) {
        self.push_failed(FailedInput { label: label.into(), error: error.to_string() });
    }

    /// Simple means over the scored rows. `None` when nothing was scored.
    pub fn summary(&self) -> Option<BatchSummary> {
        let n = self.rows.len();
        if n == 0 {
            return None;
        }
        let mean_of = |f: fn(&ScoreResult) -> f64| self.rows.iter().map(|r| f(&r.result)).sum::<f64>() / n as f64;

        let mean_score = mean_of(|r| r.score);
        let best = self.rows.iter().max_by_key(|r| OrderedFloat(r.result.score))?;

        Some(BatchSummary {
            sessions: n,
            mean_score,
            mean_decoupling_pct: mean_of(|r| r.decoupling_pct),
            mean_watt_adjusted: mean_of(|r| r.watt_adjusted),
            mean_hrr_pct: mean_of(|r| r.hrr_pct),
            best_label: best.label.clone(),
            best_score: best.result.score,
            above_peer_median: mean_score > PEER_MEDIAN_SCORE,
        })
    }
}
