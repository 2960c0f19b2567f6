use crate::config::{
    IdFormat, BUFFER_MAX, BUFFER_MIN, DEFAULT_BUFFER_LENGTH, DEFAULT_PLOT_HEIGHT,
    DEFAULT_REFRESH_RATE, DEFAULT_SAMPLE_WINDOW, PLOT_HEIGHT_MAX,
};
use canbus::BusConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub interface: String,
    pub channel: String,
    pub bitrate: u32,
    pub buffer_length: usize,
    pub sample_window: usize,
    pub refresh_rate: f64,
    pub plot_height: u32,
    #[serde(default)]
    pub id_format: IdFormat,
}

impl Default for Settings {
    fn default() -> Self {
        let bus = BusConfig::default();
        Self {
            interface: bus.interface,
            channel: bus.channel,
            bitrate: bus.bitrate,
            buffer_length: DEFAULT_BUFFER_LENGTH,
            sample_window: DEFAULT_SAMPLE_WINDOW,
            refresh_rate: DEFAULT_REFRESH_RATE,
            plot_height: DEFAULT_PLOT_HEIGHT,
            id_format: IdFormat::default(),
        }
    }
}

impl Settings {
    pub fn bus_config(&self) -> BusConfig {
        BusConfig {
            interface: self.interface.clone(),
            channel: self.channel.clone(),
            bitrate: self.bitrate,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Invalid(String),
}

pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if !(BUFFER_MIN < settings.buffer_length && settings.buffer_length < BUFFER_MAX) {
        return Err(SettingsError::Invalid(format!(
            "buffer_length must be greater than {BUFFER_MIN} and less than {BUFFER_MAX}"
        )));
    }
    if !(BUFFER_MIN < settings.sample_window && settings.sample_window < BUFFER_MAX) {
        return Err(SettingsError::Invalid(format!(
            "sample_window must be greater than {BUFFER_MIN} and less than {BUFFER_MAX}"
        )));
    }
    if settings.plot_height == 0 || settings.plot_height > PLOT_HEIGHT_MAX {
        return Err(SettingsError::Invalid(format!(
            "plot_height must be within 1..={PLOT_HEIGHT_MAX}"
        )));
    }
    if !(settings.refresh_rate > 0.0) {
        return Err(SettingsError::Invalid(
            "refresh_rate must be positive".to_string(),
        ));
    }
    Ok(())
}

pub fn load_settings_file(path: &Path) -> Result<Settings, SettingsError> {
    let data = std::fs::read(path)?;
    let settings: Settings = serde_json::from_slice(&data)?;
    validate_settings(&settings)?;
    Ok(settings)
}

pub fn save_settings_file(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let data = serde_json::to_vec_pretty(settings)?;
    std::fs::write(path, data)?;
    Ok(())
}
