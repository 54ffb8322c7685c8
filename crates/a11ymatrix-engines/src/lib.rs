//! a11ymatrix engines
//!
//! Adapters for third-party accessibility engines and the static page
//! provider used for session-based adapters:
//!
//! - `axe`, `pa11y`, `htmlcs`, `lighthouse`: external commands printing JSON
//! - `wave`: WebAIM WAVE API
//! - `w3c`: Nu HTML Checker
//! - `w3c-css`: W3C CSS validator
//! - [`HttpPageProvider`]: fetches pages for rule-based checklists

pub mod command;
pub mod http;
pub mod provider;
pub mod w3c;
pub mod wave;

use std::sync::Arc;

use a11ymatrix_core::{Adapter, AdapterResult, RunConfig};
use reqwest::Client;

pub use command::{CommandAdapter, CommandOutput, CommandSpec};
pub use provider::{HttpPageProvider, HttpPageSession};
pub use w3c::{CssValidatorAdapter, W3cAdapter};
pub use wave::WaveAdapter;

/// Names of the engines this crate provides.
pub const ENGINE_NAMES: [&str; 7] = [
    "axe",
    "htmlcs",
    "lighthouse",
    "pa11y",
    "w3c",
    "w3c-css",
    "wave",
];

/// Every engine adapter, configured from the run's adapter settings.
pub fn engine_adapters(config: &RunConfig) -> AdapterResult<Vec<Arc<dyn Adapter>>> {
    Ok(engine_adapters_with_client(config, http::default_client()?))
}

/// Same as [`engine_adapters`], with HTTP engines sharing `client`.
pub fn engine_adapters_with_client(config: &RunConfig, client: Client) -> Vec<Arc<dyn Adapter>> {
    vec![
        Arc::new(CommandAdapter::axe(&config.settings_for("axe"))),
        Arc::new(CommandAdapter::htmlcs(&config.settings_for("htmlcs"))),
        Arc::new(CommandAdapter::lighthouse(&config.settings_for("lighthouse"))),
        Arc::new(CommandAdapter::pa11y(&config.settings_for("pa11y"))),
        Arc::new(W3cAdapter::with_client(
            client.clone(),
            &config.settings_for("w3c"),
        )),
        Arc::new(CssValidatorAdapter::with_client(
            client.clone(),
            &config.settings_for("w3c-css"),
        )),
        Arc::new(WaveAdapter::with_client(client, &config.settings_for("wave"))),
    ]
}
