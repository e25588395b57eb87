use indicatif::ProgressStyle;
use indicatif::style::TemplateError;

#[cfg(feature = "logging")]
use crate::config::LogConfig;

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. With `progress`
/// enabled, log lines are routed through an indicatif layer, so that the
/// progress bars attached to the controller spans stay intact.
#[cfg(feature = "logging")]
pub fn init_logging(config: &LogConfig, progress: bool) -> anyhow::Result<()> {
    use tracing_indicatif::IndicatifLayer;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;
    let registry = tracing_subscriber::registry().with(filter);

    if progress {
        let indicatif_layer = IndicatifLayer::new();
        registry
            .with(fmt::layer().with_writer(indicatif_layer.get_stderr_writer()))
            .with(indicatif_layer)
            .try_init()?;
    } else if config.json {
        registry.with(fmt::layer().json()).try_init()?;
    } else {
        registry.with(fmt::layer()).try_init()?;
    }

    Ok(())
}

pub(crate) fn get_style_root() -> Result<ProgressStyle, TemplateError> {
    Ok(ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
        .progress_chars("=>-"))
}

pub(crate) fn get_style_task() -> Result<ProgressStyle, TemplateError> {
    ProgressStyle::default_spinner().template("{spinner:.blue} {msg}")
}

/// Parses a protobuf duration as rendered by the LCD, e.g. `"1814400s"`.
pub(crate) fn parse_seconds(value: &str) -> Option<f64> {
    value.strip_suffix('s').unwrap_or(value).parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_seconds("1814400s"), Some(1814400.0));
        assert_eq!(parse_seconds("600.5s"), Some(600.5));
        assert_eq!(parse_seconds("42"), Some(42.0));
        assert_eq!(parse_seconds("forever"), None);
    }

    #[test]
    fn test_styles() {
        assert!(get_style_root().is_ok());
        assert!(get_style_task().is_ok());
    }
}
