use prometheus::{Counter, CounterVec, Encoder, Histogram, HistogramOpts, IntGauge, Opts, Registry, TextEncoder};
use lazy_static::lazy_static;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Ingestion metrics
    pub static ref LOG_EVENTS_TOTAL: Counter = Counter::new(
        "log_events_received_total",
        "Total log notifications received from the subscription"
    ).unwrap();

    pub static ref MALFORMED_MESSAGES_TOTAL: Counter = Counter::new(
        "malformed_ws_messages_total",
        "Inbound WebSocket frames that could not be parsed"
    ).unwrap();

    // Health metrics
    pub static ref WEBSOCKET_STATUS: IntGauge = IntGauge::new(
        "websocket_subscribed",
        "Subscription status (1=subscribed, 0=disconnected)"
    ).unwrap();

    pub static ref WEBSOCKET_RECONNECTS: Counter = Counter::new(
        "websocket_reconnects_total",
        "Number of scheduled reconnects"
    ).unwrap();

    pub static ref HEARTBEAT_TIMEOUTS: Counter = Counter::new(
        "heartbeat_timeouts_total",
        "Heartbeat probes that went unanswered"
    ).unwrap();

    // Pipeline metrics
    pub static ref SIGNATURES_PROCESSED: CounterVec = CounterVec::new(
        Opts::new("signatures_processed_total", "Queue items processed per launch-pad"),
        &["launch_pad"]
    ).unwrap();

    pub static ref MIGRATIONS_MATCHED: CounterVec = CounterVec::new(
        Opts::new("migrations_matched_total", "Signatures the classifier turned into a mint"),
        &["launch_pad"]
    ).unwrap();

    pub static ref DEDUP_SKIPS: Counter = Counter::new(
        "dedup_skips_total",
        "Mints skipped because an alert was already sent"
    ).unwrap();

    pub static ref ALERTS_SENT: CounterVec = CounterVec::new(
        Opts::new("alerts_sent_total", "Profiles handed to the notification sink"),
        &["launch_pad"]
    ).unwrap();

    pub static ref DISPATCH_FAILURES: Counter = Counter::new(
        "dispatch_failures_total",
        "Alerts the notification sink rejected"
    ).unwrap();

    pub static ref PROCESSOR_ERRORS: Counter = Counter::new(
        "queue_processor_errors_total",
        "Queue items whose processor returned an error or panicked"
    ).unwrap();

    // Enrichment metrics
    pub static ref PROVIDER_FAILURES: CounterVec = CounterVec::new(
        Opts::new("provider_failures_total", "Provider calls that failed"),
        &["provider"]
    ).unwrap();

    pub static ref PAIR_RETRY_EXHAUSTED: Counter = Counter::new(
        "pair_retry_exhausted_total",
        "Mints for which no trading pair was found after all retries"
    ).unwrap();

    pub static ref ENRICHMENT_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "enrichment_latency_secs",
            "Time spent resolving a full token profile"
        ).buckets(vec![1.0, 5.0, 30.0, 60.0, 300.0, 900.0])
    ).unwrap();
}

pub fn init_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(LOG_EVENTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(MALFORMED_MESSAGES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(WEBSOCKET_STATUS.clone()))?;
    REGISTRY.register(Box::new(WEBSOCKET_RECONNECTS.clone()))?;
    REGISTRY.register(Box::new(HEARTBEAT_TIMEOUTS.clone()))?;
    REGISTRY.register(Box::new(SIGNATURES_PROCESSED.clone()))?;
    REGISTRY.register(Box::new(MIGRATIONS_MATCHED.clone()))?;
    REGISTRY.register(Box::new(DEDUP_SKIPS.clone()))?;
    REGISTRY.register(Box::new(ALERTS_SENT.clone()))?;
    REGISTRY.register(Box::new(DISPATCH_FAILURES.clone()))?;
    REGISTRY.register(Box::new(PROCESSOR_ERRORS.clone()))?;
    REGISTRY.register(Box::new(PROVIDER_FAILURES.clone()))?;
    REGISTRY.register(Box::new(PAIR_RETRY_EXHAUSTED.clone()))?;
    REGISTRY.register(Box::new(ENRICHMENT_LATENCY.clone()))?;
    Ok(())
}

/// Renders the registry in the Prometheus text exposition format.
pub fn gather_text() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        return format!("# encode error: {}\n", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_text_contains_registered_metrics() {
        // Registration is global; a second call from another test would fail, so tolerate it.
        let _ = init_metrics();
        LOG_EVENTS_TOTAL.inc();
        let text = gather_text();
        assert!(text.contains("log_events_received_total"));
    }
}
