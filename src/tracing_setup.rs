//! Global tracing subscriber setup.
use eyre::Result;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. JSON output is the default; `pretty`
/// switches to a human-readable console format for local runs. The filter
/// comes from `RUST_LOG`, falling back to `info`.
pub fn init(pretty: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = Registry::default().with(filter);

    if pretty {
        registry
            .with(tracing_subscriber::fmt::layer().pretty().with_target(true))
            .init();
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(true)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .init();
    }

    tracing::info!(pretty, "logging initialized");
    Ok(())
}
