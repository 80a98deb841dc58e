use tracing::Span;
use tracing_subscriber::{fmt, EnvFilter};

/// Installs the process-wide JSON subscriber. Filtering follows `RUST_LOG`, falling back to
/// `info` when it is unset.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).json().init();
}

/// key: subscriptions-logging -> per-component scope handed to constructors
pub fn component_span(component: &'static str) -> Span {
    tracing::info_span!("component", name = component)
}
