use crate::settings::Settings;
use canbus::CanId;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::time::Duration;

pub const BUFFER_MIN: usize = 10;
pub const BUFFER_MAX: usize = 2500;
pub const DEFAULT_BUFFER_LENGTH: usize = 100;
pub const DEFAULT_SAMPLE_WINDOW: usize = 100;
pub const DEFAULT_REFRESH_RATE: f64 = 0.05;
pub const DEFAULT_PLOT_HEIGHT: u32 = 100;
pub const PLOT_HEIGHT_MAX: u32 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdFormat {
    #[default]
    Hex,
    Decimal,
}

impl IdFormat {
    pub fn label(self, id: CanId) -> String {
        match self {
            IdFormat::Hex => format!("{id:#x}"),
            IdFormat::Decimal => id.to_string(),
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            IdFormat::Hex => 0,
            IdFormat::Decimal => 1,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => IdFormat::Decimal,
            _ => IdFormat::Hex,
        }
    }
}

/// Runtime configuration shared between the controller, the bus listener and
/// the sync loop. A set of independently replaceable values, not a lock
/// around the loop.
#[derive(Debug)]
pub struct SharedConfig {
    buffer_length: AtomicUsize,
    sample_window: AtomicUsize,
    plot_height: AtomicU32,
    id_format: AtomicU8,
    refresh_micros: AtomicU64,
}

impl SharedConfig {
    pub fn new(settings: &Settings) -> Self {
        Self {
            buffer_length: AtomicUsize::new(settings.buffer_length),
            sample_window: AtomicUsize::new(settings.sample_window),
            plot_height: AtomicU32::new(settings.plot_height),
            id_format: AtomicU8::new(settings.id_format.as_u8()),
            refresh_micros: AtomicU64::new((settings.refresh_rate * 1_000_000.0) as u64),
        }
    }

    pub fn buffer_length(&self) -> usize {
        self.buffer_length.load(Ordering::Relaxed)
    }

    pub fn set_buffer_length(&self, length: usize) {
        self.buffer_length.store(length, Ordering::Relaxed);
    }

    pub fn sample_window(&self) -> usize {
        self.sample_window.load(Ordering::Relaxed)
    }

    pub fn set_sample_window(&self, window: usize) {
        self.sample_window.store(window, Ordering::Relaxed);
    }

    pub fn plot_height(&self) -> u32 {
        self.plot_height.load(Ordering::Relaxed)
    }

    pub fn set_plot_height(&self, height: u32) {
        self.plot_height.store(height, Ordering::Relaxed);
    }

    pub fn id_format(&self) -> IdFormat {
        IdFormat::from_u8(self.id_format.load(Ordering::Relaxed))
    }

    pub fn set_id_format(&self, format: IdFormat) {
        self.id_format.store(format.as_u8(), Ordering::Relaxed);
    }

    pub fn refresh_period(&self) -> Duration {
        Duration::from_micros(self.refresh_micros.load(Ordering::Relaxed))
    }

    pub fn set_refresh_period(&self, period: Duration) {
        self.refresh_micros
            .store(period.as_micros() as u64, Ordering::Relaxed);
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}
