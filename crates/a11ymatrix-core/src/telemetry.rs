//! Log subscriber setup for the `a11ymatrix` binary.
//!
//! Logs always go to stderr; stdout carries reports. `RUST_LOG` overrides the
//! built-in directives, which keep the HTTP stack and the HTML parser quiet
//! unless asked for.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Dependencies that log per request or per parsed node.
const QUIET_TARGETS: &[(&str, Level)] = &[
    ("hyper", Level::WARN),
    ("hyper_util", Level::WARN),
    ("reqwest", Level::WARN),
    ("rustls", Level::WARN),
    ("html5ever", Level::ERROR),
    ("selectors", Level::WARN),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// Newline-delimited JSON, one object per event.
    Json,
}

impl LogFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Filter directives used when `RUST_LOG` is unset. Quiet targets never get
/// more verbose than `level`.
pub fn default_directives(level: Level) -> String {
    let mut directives = vec![level.as_str().to_ascii_lowercase()];
    for (target, cap) in QUIET_TARGETS {
        let effective = if *cap < level { *cap } else { level };
        directives.push(format!("{target}={}", effective.as_str().to_ascii_lowercase()));
    }
    directives.join(",")
}

fn stderr_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    let layer = fmt::layer().with_target(false).with_writer(std::io::stderr);
    match format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

/// Install the global subscriber. Returns `false` when one was already set,
/// in which case the call has no effect.
pub fn init_tracing(json: bool, level: Level) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));
    tracing_subscriber::registry()
        .with(stderr_layer(LogFormat::from_json_flag(json)))
        .with(filter)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_targets_are_capped() {
        let debug = default_directives(Level::DEBUG);
        assert!(debug.starts_with("debug,"));
        assert!(debug.contains("hyper=warn"));
        assert!(debug.contains("html5ever=error"));

        let error = default_directives(Level::ERROR);
        assert!(error.contains("reqwest=error"));
        assert!(!error.contains("=warn"));
    }

    #[test]
    fn second_init_is_rejected() {
        init_tracing(false, Level::WARN);
        assert!(!init_tracing(true, Level::DEBUG));
        tracing::info!("after init");
    }
}
