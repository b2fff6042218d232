use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

// Prometheus metrics (default registry)
pub static LENS_REQUESTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("chainsocial_lens_requests_total", "GraphQL requests sent to Lens endpoints")
        .expect("register lens_requests_total")
});

pub static LENS_FAILOVERS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "chainsocial_lens_failovers_total",
        "Lens requests that moved on to the next endpoint"
    )
    .expect("register lens_failovers_total")
});

pub static LENS_VARIANT_FALLBACKS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "chainsocial_lens_variant_fallbacks_total",
        "Query variants that failed and fell through to the next one",
        &["operation"]
    )
    .expect("register lens_variant_fallbacks_total")
});

pub static STORE_WRITES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("chainsocial_store_writes_total", "Persisted JSON store writes")
        .expect("register store_writes_total")
});

pub static RATE_LIMITED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("chainsocial_rate_limited_total", "Actions rejected by the rate limiter")
        .expect("register rate_limited_total")
});

/// Force registration so every series shows up before first use.
pub fn init_metrics() {
    Lazy::force(&LENS_REQUESTS_TOTAL);
    Lazy::force(&LENS_FAILOVERS_TOTAL);
    Lazy::force(&LENS_VARIANT_FALLBACKS_TOTAL);
    Lazy::force(&STORE_WRITES_TOTAL);
    Lazy::force(&RATE_LIMITED_TOTAL);
}

/// Render the default registry in the Prometheus text format.
pub fn gather_metrics() -> Result<String, String> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).map_err(|e| e.to_string())?;
    String::from_utf8(buffer).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gathered_text_contains_registered_series() {
        init_metrics();
        LENS_REQUESTS_TOTAL.inc();
        let text = gather_metrics().unwrap();
        assert!(text.contains("chainsocial_lens_requests_total"));
    }
}
