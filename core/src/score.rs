use log::debug;

use crate::metrics::{
    avg_hr_from_intervals, decoupling, efficiency_factor, mean, split_intervals_by_time,
    split_power_by_count,
};
use crate::types::{AthleteParameters, CanonicalSession, HalfEfficiency, ScoreBreakdown, ScoreResult};

/// Average gradient, 0 without distance.
pub fn grade(ascent_m: f64, distance_m: f64) -> f64 {
    if distance_m > 0.0 { ascent_m / distance_m } else { 0.0 }
}

/// Fraction of the heart-rate reserve used. Not clamped to [0, 1].
pub fn hrr_fraction(avg_hr: f64, params: &AthleteParameters) -> f64 {
    let range = params.hrr_range();
    if range > 0.0 {
        (avg_hr - f64::from(params.hr_rest)) / range
    } else {
        0.0
    }
}

/// (W/kg) per unit of %HRR.
pub fn efficiency_ratio(w_per_kg: f64, hrr_fraction: f64) -> f64 {
    if hrr_fraction > 0.0 { w_per_kg / hrr_fraction } else { 0.0 }
}

/// Decoupling scaled by 1/sqrt(hours); the same drift costs more in a short session.
pub fn decoupling_penalty(decoupling: f64, duration_s: f64) -> f64 {
    let t_hours = duration_s / 3600.0;
    if t_hours > 0.0 { decoupling / t_hours.sqrt() } else { 0.0 }
}

/// SCORE 2.0. Unbounded; a penalty above 1 flips the sign.
pub fn combine_score(efficiency_ratio: f64, base_offset: f64, penalty: f64) -> f64 {
    (efficiency_ratio - base_offset) * (1.0 - penalty)
}

/// First/second half EF. HR is split by elapsed time, power by sample count.
fn half_split(power: &[f64], intervals_ms: &[f64], avg_hr: f64) -> (HalfEfficiency, HalfEfficiency) {
    let (rr_a, rr_b) = split_intervals_by_time(intervals_ms);
    let hr_a = avg_hr_from_intervals(&rr_a).unwrap_or(avg_hr);
    let hr_b = avg_hr_from_intervals(&rr_b).unwrap_or(avg_hr);

    let (p_a, p_b) = split_power_by_count(power);
    let p_a = mean(p_a).unwrap_or(0.0);
    let p_b = mean(p_b).unwrap_or(0.0);

    (
        HalfEfficiency { power: p_a, hr: hr_a, ef: efficiency_factor(p_a, hr_a) },
        HalfEfficiency { power: p_b, hr: hr_b, ef: efficiency_factor(p_b, hr_b) },
    )
}

/// Runs the full score computation, keeping every intermediate value.
/// `None` when the session has no power samples or no positive beat intervals.
pub fn analyze(session: &CanonicalSession, params: &AthleteParameters) -> Option<ScoreBreakdown> {
    let header = &session.header;
    let intervals = session.positive_intervals();

    // 1️⃣ Power, adjusted for average gradient
    let avg_power = mean(&session.power_samples)?;
    let grade = grade(header.ascent_m, header.distance_m);
    let watt_adjusted = avg_power * (1.0 + grade);

    // 2️⃣ HR from R-R and %HRR
    let avg_hr = avg_hr_from_intervals(&intervals)?;
    let hrr_fraction = hrr_fraction(avg_hr, params);

    // 3️⃣ Half-split decoupling
    let (first_half, second_half) = half_split(&session.power_samples, &intervals, avg_hr);
    let decoupling = decoupling(first_half.ef, second_half.ef);

    // 4️⃣ Score
    let w_per_kg = if params.weight_kg > 0.0 { watt_adjusted / params.weight_kg } else { 0.0 };
    let efficiency_ratio = efficiency_ratio(w_per_kg, hrr_fraction);
    let decoupling_penalty = decoupling_penalty(decoupling, header.duration_s);
    let score = combine_score(efficiency_ratio, params.base_offset, decoupling_penalty);

    debug!(
        "score: power={avg_power:.1}W grade={grade:.4} hr={avg_hr:.1} hrr={hrr_fraction:.3} \
         ef1={:.4} ef2={:.4} dec={decoupling:.4} er={efficiency_ratio:.3} pen={decoupling_penalty:.4} => {score:.3}",
        first_half.ef, second_half.ef
    );

    Some(ScoreBreakdown {
        timestamp: header.timestamp,
        grade,
        avg_power,
        watt_adjusted,
        avg_hr,
        hrr_fraction,
        first_half,
        second_half,
        decoupling,
        w_per_kg,
        efficiency_ratio,
        decoupling_penalty,
        score,
        duration_s: header.duration_s,
    })
}

/// Scores one session. Pure: identical inputs give bit-identical output.
pub fn score_session(session: &CanonicalSession, params: &AthleteParameters) -> Option<ScoreResult> {
    analyze(session, params).map(|b| ScoreResult::from(&b))
}
