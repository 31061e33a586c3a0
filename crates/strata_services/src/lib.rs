//! Strata Services Layer
//!
//! Settings loading and scripted observer input for the runtime.

pub mod input;
pub mod settings;

use std::path::Path;
use tracing::info;

pub use input::WalkPath;
pub use settings::{Settings, SettingsError};

/// Load settings from `path`, or fall back to defaults when none is given.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, SettingsError> {
    match path {
        Some(path) => {
            let settings = Settings::load(path)?;
            info!(path = %path.display(), "settings loaded");
            Ok(settings)
        }
        None => {
            info!("no settings file, using defaults");
            Ok(Settings::default())
        }
    }
}
