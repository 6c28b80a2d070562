use std::io::Write;

use serde::Serialize;

use crate::batch::{BatchReport, BatchSummary, ScoredRow, PEER_MEDIAN_SCORE};

/// Flat CSV record; csv cannot serialize `#[serde(flatten)]`.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    label: &'a str,
    timestamp: String,
    watt_adjusted: f64,
    hr_avg_bpm: f64,
    hrr_pct: f64,
    decoupling_pct: f64,
    score: f64,
    duration_min: f64,
}

impl<'a> From<&'a ScoredRow> for CsvRow<'a> {
    fn from(row: &'a ScoredRow) -> Self {
        let r = &row.result;
        Self {
            label: &row.label,
            timestamp: r.timestamp.to_rfc3339(),
            watt_adjusted: r.watt_adjusted,
            hr_avg_bpm: r.hr_avg_bpm,
            hrr_pct: r.hrr_pct,
            decoupling_pct: r.decoupling_pct,
            score: r.score,
            duration_min: r.duration_min,
        }
    }
}

/// Writes one CSV line per scored session, with header.
pub fn write_csv<W: Write>(rows: &[ScoredRow], writer: W) -> Result<(), csv::Error> {
    let mut w = csv::Writer::from_writer(writer);
    for row in rows {
        w.serialize(CsvRow::from(row))?;
    }
    w.flush()?;
    Ok(())
}

/// Headline metrics plus the peer-median comparison.
pub fn render_summary(s: &BatchSummary) -> String {
    let mut out = String::new();
    out.push_str(&format!("Sessions:          {}\n", s.sessions));
    out.push_str(&format!("Mean score:        {:.2}\n", s.mean_score));
    out.push_str(&format!("Mean decoupling:   {:.2}%\n", s.mean_decoupling_pct));
    out.push_str(&format!("Mean watt adj:     {:.0} W\n", s.mean_watt_adjusted));
    out.push_str(&format!("Mean %HRR:         {:.1}%\n", s.mean_hrr_pct));
    out.push_str(&format!("Best session:      {} ({:.3})\n", s.best_label, s.best_score));
    if s.above_peer_median {
        out.push_str(&format!(
            "Mean score {:.2} is above the peer median ({PEER_MEDIAN_SCORE:.2}).\n",
            s.mean_score
        ));
    } else {
        out.push_str(&format!(
            "Mean score {:.2} is below the peer median ({PEER_MEDIAN_SCORE:.2}); work on the aerobic base.\n",
            s.mean_score
        ));
    }
    out
}

/// Plain-text session table for the terminal.
pub fn render_table(report: &BatchReport) -> String {
    let mut out = format!(
        "{:<28} {:<20} {:>8} {:>7} {:>8}\n",
        "session", "date", "score", "%HRR", "dec %"
    );
    for row in &report.rows {
        let r = &row.result;
        out.push_str(&format!(
            "{:<28} {:<20} {:>8.3} {:>7.1} {:>8.2}\n",
            truncate(&row.label, 28),
            r.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            r.score,
            r.hrr_pct,
            r.decoupling_pct
        ));
    }
    for s in &report.skipped {
        out.push_str(&format!("skipped {}: insufficient data ({})\n", s.label, s.reason));
    }
    for f in &report.failed {
        out.push_str(&format!("failed {}: {}\n", f.label, f.error));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max - 1).chain(std::iter::once('…')).collect()
    }
}
