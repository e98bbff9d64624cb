//! Logging bootstrap for shelf binaries.

use anyhow::Context;
use shelf_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `telemetry.log_level` when set. Calling this again
/// after a subscriber is installed is a no-op.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let env_filter = build_filter(&settings.log_level)?;

    let fmt_layer = match settings.log_format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer().with_target(true).boxed(),
    };

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        tracing::debug!(target: "shelf-telemetry", "subscriber already installed");
    }

    tracing::info!(
        target: "shelf-telemetry",
        format = ?settings.log_format,
        "telemetry initialized"
    );
    Ok(())
}

fn build_filter(default_level: &str) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level)
            .with_context(|| format!("invalid log level '{}'", default_level)),
    }
}
