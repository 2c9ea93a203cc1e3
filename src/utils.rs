use std::time::Duration;

use indicatif::ProgressStyle;

/// Upper-cases the first character of `token`.
pub(crate) fn capitalize(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Compact human readable duration, e.g. `1.20s` or `350.00ms`.
pub(crate) fn format_duration(duration: Duration) -> String {
    format!("{duration:.2?}")
}

/// Progress bar shown for a long running process with a known length.
pub(crate) fn get_style_process() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .expect("invalid progress bar template")
        .progress_chars("=>-")
}

/// Spinner for a long running process of unknown length.
pub(crate) fn get_style_spinner() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.blue} [{elapsed}] {msg}")
        .expect("invalid spinner template")
}

/// Installs a `tracing` subscriber which prints log lines above the
/// progress bars instead of tearing through them.
///
/// The filter is read from `RUST_LOG` and defaults to `info`.
#[cfg(feature = "logging")]
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_indicatif::IndicatifLayer;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, fmt};

    let indicatif_layer = IndicatifLayer::new();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
        .with(indicatif_layer)
        .try_init()?;

    Ok(())
}
