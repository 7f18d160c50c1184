//! Common logging and telemetry initializer
//!
//! TODO: wire up metrics once the `opentelemetry` metrics pipeline stabilizes.

use eyre::Result;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_tree::HierarchicalLayer;

#[cfg(feature = "telemetry")]
use opentelemetry::trace::TracerProvider;

/// Initialise the global tracing subscriber.
///
/// `use_tree` enables the hierarchical span-tree formatter (handy on a terminal);
/// `use_file` turns on an hourly-rotating append log under the given directory.
/// `use_telemetry` is a no-op unless built with the `telemetry` feature.
#[tracing::instrument]
pub fn init_logging(
    name: &'static str,
    use_telemetry: bool,
    use_tree: bool,
    use_file: Option<String>,
) -> Result<()> {
    let filter = EnvFilter::from_default_env();

    let tree = if use_tree {
        Some(
            HierarchicalLayer::new(2)
                .with_ansi(true)
                .with_span_retrace(true)
                .with_span_modes(true)
                .with_targets(true)
                .with_verbose_entry(true)
                .with_verbose_exit(true)
                .with_bracketed_fields(true),
        )
    } else {
        None
    };

    #[cfg(feature = "telemetry")]
    let otlp = if use_telemetry {
        let exporter = opentelemetry_otlp::new_exporter().tonic();
        let provider = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .install_batch(opentelemetry_sdk::runtime::Tokio)?;
        let tracer = provider.tracer(name);
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };
    #[cfg(not(feature = "telemetry"))]
    let _ = use_telemetry;
    #[cfg(not(feature = "telemetry"))]
    let otlp: Option<tracing_subscriber::layer::Identity> = None;

    let file = use_file.map(|dir| {
        let file_appender = tracing_appender::rolling::hourly(dir, name);
        tracing_subscriber::fmt::layer().with_writer(file_appender)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tree)
        .with(otlp)
        .with(file)
        .init();

    Ok(())
}

#[tracing::instrument]
pub fn close_logging() {
    #[cfg(feature = "telemetry")]
    opentelemetry::global::shutdown_tracer_provider();
}
