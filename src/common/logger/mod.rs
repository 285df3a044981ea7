use std::{fs, path::Path};

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub mod formatter;
pub mod writer;

pub use formatter::*;
pub use writer::*;

use crate::configs::Config;

/// Builds the filter directive string: base level, noisy dependencies pinned to
/// `warn`, then whatever extra directives the config carries.
pub fn filter_directives(config: &Config) -> String {
    let level = config
        .logging
        .as_ref()
        .and_then(|l| l.level.as_deref())
        .unwrap_or("info");

    let filters = config
        .logging
        .as_ref()
        .and_then(|l| l.filters.as_deref())
        .unwrap_or("");

    if filters.is_empty() {
        format!("{},hyper=warn,reqwest=warn", level)
    } else {
        format!("{},hyper=warn,reqwest=warn,{}", level, filters)
    }
}

pub fn init(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(config)));

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .event_format(ExtractFormatter::new(true))
        .with_ansi(true);

    let file_layer = config
        .logging
        .as_ref()
        .and_then(|logging| logging.file.as_ref())
        .map(|file_config| {
            if let Some(parent) = Path::new(&file_config.path).parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    eprintln!("Failed to create log directory: {}", e);
                }
            }

            let writer = LineBoundedWriter::new(file_config.path.clone(), file_config.max_lines);
            fmt::layer()
                .with_writer(writer)
                .event_format(ExtractFormatter::new(false))
                .with_ansi(false)
        });

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configs::LoggingConfig;

    #[test]
    fn directives_default_to_info() {
        let config = Config::default();
        assert_eq!(filter_directives(&config), "info,hyper=warn,reqwest=warn");
    }

    #[test]
    fn directives_append_configured_filters() {
        let config = Config {
            logging: Some(LoggingConfig {
                level: Some("debug".into()),
                filters: Some("tubex::sources=trace".into()),
                file: None,
            }),
            ..Default::default()
        };
        assert_eq!(
            filter_directives(&config),
            "debug,hyper=warn,reqwest=warn,tubex::sources=trace"
        );
    }
}
