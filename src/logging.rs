// ==========================================
// Logging setup
// ==========================================
// tracing-subscriber writing to stderr, so stdout stays
// free for the JSON the binaries print
// RUST_LOG filters, LOG_FORMAT picks text or json
// ==========================================

use tracing_subscriber::{fmt, EnvFilter};

/// Used when RUST_LOG is unset or unparsable
const DEFAULT_DIRECTIVE: &str = "warn,blood_bank_allocation=info,import_collections=info";

/// Output layout of the global subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Case-insensitive; unknown values yield None
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Some(LogFormat::Text),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }

    /// LOG_FORMAT, falling back to text
    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .ok()
            .and_then(|raw| Self::parse(&raw))
            .unwrap_or_default()
    }
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Installs the global subscriber in the format named by LOG_FORMAT
///
/// # Example
/// ```no_run
/// blood_bank_allocation::logging::init();
/// tracing::info!("ready");
/// ```
pub fn init() {
    init_with(LogFormat::from_env());
}

/// Installs the global subscriber; later calls are ignored
pub fn init_with(format: LogFormat) {
    let installed = match format {
        LogFormat::Text => fmt()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_line_number(true)
            .try_init(),
        LogFormat::Json => fmt()
            .json()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .try_init(),
    };

    if installed.is_err() {
        tracing::debug!("global subscriber already installed");
    }
}
