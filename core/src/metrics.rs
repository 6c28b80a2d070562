/// Arithmetic mean. `None` for an empty slice.
pub fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() { return None; }
    Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

/// Average HR (bpm) from R-R intervals: 60000 / mean interval.
/// Uses the mean interval, not the mean of per-beat rates.
pub fn avg_hr_from_intervals(intervals_ms: &[f64]) -> Option<f64> {
    match mean(intervals_ms) {
        Some(m) if m > 0.0 => Some(60_000.0 / m),
        _ => None,
    }
}

/// Splits R-R intervals at half the elapsed time.
///
/// An interval goes to the first half while the running clock, before adding
/// that interval, is still below the midpoint.
pub fn split_intervals_by_time(intervals_ms: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mid_time_ms = intervals_ms.iter().sum::<f64>() / 2.0;
    let mut clock_ms = 0.0;
    let mut first = Vec::new();
    let mut second = Vec::new();

    for &r in intervals_ms {
        if clock_ms < mid_time_ms {
            first.push(r);
        } else {
            second.push(r);
        }
        clock_ms += r;
    }
    (first, second)
}

/// Splits power samples at `len / 2` (sample count, not time).
pub fn split_power_by_count(power: &[f64]) -> (&[f64], &[f64]) {
    power.split_at(power.len() / 2)
}

/// EF = power / HR, 0 when HR is not positive.
pub fn efficiency_factor(power: f64, hr: f64) -> f64 {
    if hr > 0.0 { power / hr } else { 0.0 }
}

/// Relative EF drop from the first to the second half. Positive = drift.
pub fn decoupling(ef_first: f64, ef_second: f64) -> f64 {
    if ef_first > 0.0 { (ef_first - ef_second) / ef_first } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
    }

    #[test]
    fn hr_uses_mean_interval_not_mean_rate() {
        // 60000/500 = 120, 60000/1000 = 60 -> mean rate would be 90
        let hr = avg_hr_from_intervals(&[500.0, 1000.0]).unwrap();
        assert!((hr - 80.0).abs() < 1e-9);
    }

    #[test]
    fn time_split_checks_clock_before_adding() {
        // total 2000, mid 1000: clocks 0, 900, 1000 -> [900, 100] | [1000]
        let (a, b) = split_intervals_by_time(&[900.0, 100.0, 1000.0]);
        assert_eq!(a, vec![900.0, 100.0]);
        assert_eq!(b, vec![1000.0]);
    }

    #[test]
    fn single_interval_lands_in_first_half() {
        let (a, b) = split_intervals_by_time(&[800.0]);
        assert_eq!(a.len(), 1);
        assert!(b.is_empty());
    }

    #[test]
    fn power_split_floors_midpoint() {
        let p = [1.0, 2.0, 3.0, 4.0, 5.0];
        let (a, b) = split_power_by_count(&p);
        assert_eq!(a, &[1.0, 2.0]);
        assert_eq!(b, &[3.0, 4.0, 5.0]);
    }

    #[test]
    fn guarded_ratios() {
        assert_eq!(efficiency_factor(200.0, 0.0), 0.0);
        assert_eq!(decoupling(0.0, 1.5), 0.0);
        assert!((decoupling(2.0, 1.5) - 0.25).abs() < 1e-12);
        assert!(decoupling(1.5, 2.0) < 0.0);
    }
}
