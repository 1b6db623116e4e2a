use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use ::tracing::Span;

/// Initialize the tracing system
///
/// Honors `RUST_LOG` and falls back to `info`. Output goes to stderr without
/// ANSI colors so build logs stay readable when captured.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Create the span a task artifact session runs under
pub fn task_state_span(task: &str) -> Span {
    ::tracing::info_span!("task_state", task = %task)
}
