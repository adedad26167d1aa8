//! Logging configuration and initialization.
//!
//! Structured logging with level presets, per-target overrides via CLI
//! flags, text or JSON output, and an environment variable fallback
//! (RUST_LOG).

use std::collections::HashMap;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: '{}'. Use 'text' or 'json'.", s)),
        }
    }
}

/// Logging preset levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogPreset {
    /// Default: lifecycle events only, quiet ingest.
    #[default]
    Production,
    /// More operational detail across all targets.
    Verbose,
    /// Detailed info for troubleshooting, including per-line feeds.
    Debug,
    /// Everything.
    Trace,
    /// Warnings and errors only.
    Quiet,
}

/// Logging configuration built from CLI arguments.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub preset: LogPreset,
    /// Per-target level overrides (e.g., "monitor" -> DEBUG).
    pub overrides: HashMap<String, Level>,
    pub format: LogFormat,
}

impl LogConfig {
    /// Create a new LogConfig from CLI arguments.
    pub fn from_cli(
        verbose: bool,
        debug: bool,
        trace: bool,
        quiet: bool,
        log_overrides: Vec<String>,
        format: LogFormat,
    ) -> Self {
        let preset = if quiet {
            LogPreset::Quiet
        } else if trace {
            LogPreset::Trace
        } else if debug {
            LogPreset::Debug
        } else if verbose {
            LogPreset::Verbose
        } else {
            LogPreset::Production
        };

        // Parse overrides (format: "target=level", comma-separable).
        let mut overrides = HashMap::new();
        for override_str in log_overrides {
            for part in override_str.split(',') {
                if let Some((target, level_str)) = part.split_once('=') {
                    let target = target.trim();
                    let level_str = level_str.trim();

                    // Normalize target: "monitor" -> "renderwatch::monitor".
                    let full_target = if target.starts_with("renderwatch") {
                        target.to_string()
                    } else {
                        format!("renderwatch::{}", target)
                    };

                    if let Ok(level) = parse_level(level_str) {
                        overrides.insert(full_target, level);
                    }
                }
            }
        }

        Self {
            preset,
            overrides,
            format,
        }
    }

    /// Build an EnvFilter from this configuration.
    pub fn build_filter(&self) -> EnvFilter {
        // RUST_LOG wins when set.
        if let Ok(env_filter) = EnvFilter::try_from_default_env() {
            return env_filter;
        }

        let mut directives: Vec<String> = match self.preset {
            LogPreset::Production => vec![
                "renderwatch::cli=info".into(),
                "renderwatch::monitor=info".into(),
                "renderwatch::ingest=warn".into(),
            ],
            LogPreset::Verbose => vec!["renderwatch=info".into()],
            LogPreset::Debug => vec!["renderwatch=debug".into()],
            LogPreset::Trace => vec!["renderwatch=trace".into()],
            LogPreset::Quiet => vec!["renderwatch=warn".into()],
        };

        // Overrides take precedence.
        for (target, level) in &self.overrides {
            directives.push(format!("{}={}", target, level_to_str(*level)));
        }

        let filter_str = directives.join(",");
        EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

fn parse_level(s: &str) -> Result<Level, ()> {
    match s.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" | "warning" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => Err(()),
    }
}

fn level_to_str(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Initialize the tracing subscriber with the given configuration.
pub fn init(config: &LogConfig) {
    let filter = config.build_filter();

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_writer(std::io::stderr)
                        .with_file(false)
                        .with_line_number(false),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_writer(std::io::stderr)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("invalid".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_preset_priority() {
        // Quiet wins over everything.
        let config = LogConfig::from_cli(true, true, true, true, vec![], LogFormat::Text);
        assert_eq!(config.preset, LogPreset::Quiet);

        // Trace wins over debug and verbose.
        let config = LogConfig::from_cli(true, true, true, false, vec![], LogFormat::Text);
        assert_eq!(config.preset, LogPreset::Trace);

        // Default is production.
        let config = LogConfig::from_cli(false, false, false, false, vec![], LogFormat::Text);
        assert_eq!(config.preset, LogPreset::Production);
    }

    #[test]
    fn test_override_parsing() {
        let config = LogConfig::from_cli(
            false,
            false,
            false,
            false,
            vec!["monitor=debug".into(), "ingest=trace,cli=info".into()],
            LogFormat::Text,
        );

        assert_eq!(
            config.overrides.get("renderwatch::monitor"),
            Some(&Level::DEBUG)
        );
        assert_eq!(
            config.overrides.get("renderwatch::ingest"),
            Some(&Level::TRACE)
        );
        assert_eq!(config.overrides.get("renderwatch::cli"), Some(&Level::INFO));
    }

    #[test]
    fn test_full_target_passthrough() {
        let config = LogConfig::from_cli(
            false,
            false,
            false,
            false,
            vec!["renderwatch::monitor=debug".into()],
            LogFormat::Text,
        );
        assert_eq!(
            config.overrides.get("renderwatch::monitor"),
            Some(&Level::DEBUG)
        );
    }
}
