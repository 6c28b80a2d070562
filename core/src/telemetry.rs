use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Session counters for one process.
pub struct Metrics {
    registry: Registry,
    scored: IntCounter,
    skipped: IntCounterVec,
    failed: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("corsascore".to_string()), None)?;

        let scored = IntCounter::new("sessions_scored_total", "Sessions that produced a score")?;
        let skipped = IntCounterVec::new(
            Opts::new("sessions_skipped_total", "Sessions skipped for insufficient data"),
            &["reason"],
        )?;
        let failed = IntCounter::new("sessions_failed_total", "Inputs rejected as malformed")?;

        registry.register(Box::new(scored.clone()))?;
        registry.register(Box::new(skipped.clone()))?;
        registry.register(Box::new(failed.clone()))?;

        Ok(Self { registry, scored, skipped, failed })
    }

    pub fn record_scored(&self) {
        self.scored.inc();
    }

    pub fn record_skipped(&self, reason: &str) {
        self.skipped.with_label_values(&[reason]).inc();
    }

    pub fn record_failed(&self) {
        self.failed.inc();
    }

    pub fn scored_total(&self) -> u64 {
        self.scored.get()
    }

    pub fn skipped_total(&self, reason: &str) -> u64 {
        self.skipped.with_label_values(&[reason]).get()
    }

    pub fn failed_total(&self) -> u64 {
        self.failed.get()
    }

    /// Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        if TextEncoder::new().encode(&self.registry.gather(), &mut buf).is_err() {
            return String::new();
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

static METRICS: Lazy<Option<Metrics>> = Lazy::new(|| match Metrics::new() {
    Ok(m) => Some(m),
    Err(e) => {
        log::warn!("metrics disabled: {e}");
        None
    }
});

/// Process-wide counters; `None` only if registration failed.
pub fn global() -> Option<&'static Metrics> {
    METRICS.as_ref()
}
