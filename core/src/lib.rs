//! SCORE 2.0: aerobic efficiency and decoupling for running sessions.
//!
//! raw input → [`normalize`] → [`CanonicalSession`] → [`score`] → [`ScoreResult`]

pub mod batch;
pub mod error;
pub mod metrics;
pub mod models;
pub mod normalize;
pub mod report;
pub mod round;
pub mod score;
pub mod storage;
pub mod strava;
pub mod telemetry;
pub mod types;

pub use batch::{run_batch, BatchReport, BatchSummary, SessionInput, PEER_MEDIAN_SCORE};
pub use error::{NormalizeError, StorageError, StravaError};
pub use models::{Distance, ElapsedTime, Stream, StreamSet, StravaActivity};
pub use normalize::{
    normalize_activity, normalize_device_log_str, normalize_device_log_value, Insufficient, Normalized,
};
pub use round::RoundTo;
pub use score::{analyze, score_session};
pub use storage::{load_profile, save_profile, AthleteProfile};
pub use types::{AthleteParameters, CanonicalSession, ScoreBreakdown, ScoreResult, SessionHeader};
