//! Configuration for the CTS runner

use serde::{Deserialize, Serialize};

/// Main runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Suite queried when no query is given
    #[serde(default = "default_suite")]
    pub suite: String,

    /// Report configuration
    #[serde(default)]
    pub report: ReportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            suite: default_suite(),
            report: ReportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Report configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// JSON indentation width, 0 for compact output
    #[serde(default = "default_indent")]
    pub indent: usize,

    /// Write the report here instead of stdout
    #[serde(default)]
    pub output: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
            output: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_suite() -> String {
    "cts".to_string()
}

fn default_indent() -> usize {
    2
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl RunnerConfig {
    /// Load configuration from file
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&RunnerConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        // CTS_REPORT__INDENT=4, CTS_LOGGING__LEVEL=debug
        builder = builder.add_source(
            config::Environment::with_prefix("CTS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// The query that selects the whole configured suite.
    pub fn default_query(&self) -> String {
        format!("{}:", self.suite)
    }
}
