use once_cell::sync::OnceCell;
use opentelemetry::metrics::Histogram;
use opentelemetry::{global, KeyValue};
use std::time::Instant;

use crate::telemetry::INSTRUMENTATION;

static OP_HIST: OnceCell<Histogram<f64>> = OnceCell::new();
static HOP_LATENCY: OnceCell<Histogram<f64>> = OnceCell::new();
static HOP_SLIPPAGE: OnceCell<Histogram<f64>> = OnceCell::new();

fn op_histogram() -> &'static Histogram<f64> {
    OP_HIST.get_or_init(|| {
        global::meter(INSTRUMENTATION)
            .f64_histogram("op_duration_seconds")
            .with_description("operation duration")
            .build()
    })
}

pub fn time<F, T>(op: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let start = Instant::now();
    let out = f();
    let sec = start.elapsed().as_secs_f64();
    op_histogram().record(sec, &[KeyValue::new("op", op.to_string())]);
    out
}

/// |teórico - observado| / teórico; `None` sem referência teórica.
pub fn hop_slippage(theoretical: u64, observed: u64) -> Option<f64> {
    (theoretical > 0).then(|| theoretical.abs_diff(observed) as f64 / theoretical as f64)
}

/// Únicos instrumentos de hop do crate: `hop_latency_ms` e `hop_slippage_rel`.
pub fn record_hop(side: &str, latency_ms: f64, theoretical: u64, observed: u64) {
    let latency = HOP_LATENCY.get_or_init(|| {
        global::meter(INSTRUMENTATION)
            .f64_histogram("hop_latency_ms")
            .with_unit("ms")
            .with_description("latência de um hop (cotação, envio, observação)")
            .build()
    });
    let slippage = HOP_SLIPPAGE.get_or_init(|| {
        global::meter(INSTRUMENTATION)
            .f64_histogram("hop_slippage_rel")
            .with_unit("1")
            .with_description("desvio relativo entre saída teórica e observada")
            .build()
    });
    let attrs = [KeyValue::new("side", side.to_string())];
    latency.record(latency_ms, &attrs);
    if let Some(rel) = hop_slippage(theoretical, observed) {
        slippage.record(rel, &attrs);
    }
}
