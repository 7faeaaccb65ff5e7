use tracing_subscriber::EnvFilter;

pub fn filter_from_env() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Subscriber só de console, para binários e testes sem coletor OTLP.
/// Ignora o erro se já houver um subscriber global.
pub fn init_fmt() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_from_env())
        .with_target(false)
        .try_init();
}
