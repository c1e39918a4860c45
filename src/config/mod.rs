//! Analysis Configuration Module
//!
//! Provides per-survey configuration loaded from TOML files, so that channel
//! quality, fitting, geometry and turning-point parameters are tunable without
//! recompiling.
//!
//! ## Loading Order
//!
//! 1. `DASKIT_CONFIG` environment variable (path to TOML file)
//! 2. `das_config.toml` in the current working directory
//! 3. Built-in defaults (see [`defaults`])
//!
//! ## Usage
//!
//! Call `config::init()` once at startup, then `config::get()` anywhere:
//!
//! ```ignore
//! config::init(DasConfig::load());
//!
//! let thresh = config::get().quality.thresh;
//! ```
//!
//! Library entry points never require initialisation: option structs fall
//! back to [`defaults`] when the global config has not been set.

mod das_config;
pub mod defaults;
pub mod validation;

pub use das_config::*;

use std::sync::OnceLock;

/// Global analysis configuration, initialized once at startup.
static DAS_CONFIG: OnceLock<DasConfig> = OnceLock::new();

/// Initialize the global analysis configuration.
///
/// Subsequent calls are ignored with a warning.
pub fn init(config: DasConfig) {
    if DAS_CONFIG.set(config).is_err() {
        tracing::warn!("config::init() called more than once, ignoring");
    }
}

/// Get the global analysis configuration, if initialized.
pub fn try_get() -> Option<&'static DasConfig> {
    DAS_CONFIG.get()
}

/// Get a reference to the global analysis configuration.
///
/// Panics if `init()` has not been called. Prefer [`try_get`] in library code.
#[allow(clippy::expect_used)]
pub fn get() -> &'static DasConfig {
    DAS_CONFIG
        .get()
        .expect("config::get() called before config::init()")
}

/// Check whether the config has been initialized.
pub fn is_initialized() -> bool {
    DAS_CONFIG.get().is_some()
}
