//! Settings management
//!
//! One JSON document configures both sides. Every field has a default, so
//! a partial file (or none at all) is valid.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use strata_core::time::MIN_INTERVAL;
use strata_core::FieldParams;
use strata_net::{CellConfig, ReconcilerConfig, SchedulerConfig};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub streaming: StreamingSettings,
    pub field: FieldParams,
    pub presentation: PresentationSettings,
    pub session: SessionSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingSettings {
    pub world_size_x: i32,
    pub world_size_z: i32,
    pub active_radius: f32,
    pub sync_interval_ms: u64,
    pub cleanup_interval_ms: u64,
    pub cell_size: f32,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        let scheduler = SchedulerConfig::default();
        Self {
            world_size_x: scheduler.world_size_x,
            world_size_z: scheduler.world_size_z,
            active_radius: scheduler.active_radius,
            sync_interval_ms: scheduler.sync_interval.as_millis() as u64,
            cleanup_interval_ms: scheduler.cleanup_interval.as_millis() as u64,
            cell_size: scheduler.cell.cell_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationSettings {
    pub height_scale: f32,
}

impl Default for PresentationSettings {
    fn default() -> Self {
        Self {
            height_scale: ReconcilerConfig::default().height_scale,
        }
    }
}

/// Demo session driven by the runtime binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Fixed world seed; a random one is drawn when absent.
    pub seed: Option<i32>,
    pub observers: usize,
    pub position_interval_ms: u64,
    pub walk_radius: f32,
    /// Radians per second along the walk circle.
    pub walk_speed: f32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            seed: None,
            observers: 2,
            position_interval_ms: 50,
            walk_radius: 20.0,
            walk_speed: 0.5,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let text = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "loading settings");
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let streaming = &self.streaming;
        if streaming.world_size_x < 0 || streaming.world_size_z < 0 {
            return Err(invalid("streaming.world_size", "must not be negative"));
        }
        if !streaming.active_radius.is_finite() || streaming.active_radius <= 0.0 {
            return Err(invalid("streaming.active_radius", "must be a finite positive number"));
        }
        if streaming.cell_size.is_nan() || streaming.cell_size <= 0.0 {
            return Err(invalid("streaming.cell_size", "must be positive"));
        }
        let min_ms = MIN_INTERVAL.as_millis() as u64;
        if streaming.sync_interval_ms < min_ms || streaming.cleanup_interval_ms < min_ms {
            return Err(invalid("streaming.interval", format!("must be at least {min_ms} ms")));
        }
        if self.field.detail_scale.is_nan() || self.field.detail_scale <= 0.0 {
            return Err(invalid("field.detail_scale", "must be positive"));
        }
        if !(0.0..=1.0).contains(&self.field.roughness) {
            return Err(invalid("field.roughness", "must be within 0..=1"));
        }
        if self.session.position_interval_ms == 0 {
            return Err(invalid("session.position_interval_ms", "must be positive"));
        }
        Ok(())
    }

    pub fn cell_config(&self) -> CellConfig {
        CellConfig {
            cell_size: self.streaming.cell_size,
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            world_size_x: self.streaming.world_size_x,
            world_size_z: self.streaming.world_size_z,
            active_radius: self.streaming.active_radius,
            sync_interval: Duration::from_millis(self.streaming.sync_interval_ms),
            cleanup_interval: Duration::from_millis(self.streaming.cleanup_interval_ms),
            cell: self.cell_config(),
        }
    }

    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            field: self.field,
            cell: self.cell_config(),
            height_scale: self.presentation.height_scale,
        }
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> SettingsError {
    SettingsError::Invalid {
        field,
        reason: reason.into(),
    }
}
