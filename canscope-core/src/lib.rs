pub mod config;
pub mod error;
pub mod recorder;
pub mod ring;
pub mod settings;
pub mod store;

pub use config::{
    IdFormat, SharedConfig, BUFFER_MAX, BUFFER_MIN, DEFAULT_BUFFER_LENGTH, DEFAULT_PLOT_HEIGHT,
    DEFAULT_REFRESH_RATE, DEFAULT_SAMPLE_WINDOW, PLOT_HEIGHT_MAX,
};
pub use error::ScopeError;
pub use recorder::{decode_payload, Recorder};
pub use ring::{RingBuffer, Sample};
pub use settings::{
    load_settings_file, save_settings_file, validate_settings, Settings, SettingsError,
};
pub use store::{PlotRow, PlotStore, PresentError, Presenter, RowHandle, Series};
