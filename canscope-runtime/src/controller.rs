use crate::sync_loop::SyncWorker;
use canbus::{open_bus, BusConfig, CanBus, CanId};
use canscope_core::{
    IdFormat, PlotStore, Presenter, Recorder, ScopeError, Settings, SharedConfig, BUFFER_MAX,
    BUFFER_MIN, PLOT_HEIGHT_MAX,
};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const REFRESH_MIN: Duration = Duration::from_millis(1);
const REFRESH_MAX: Duration = Duration::from_secs(10);

fn check_buffer_bounds(value: usize) -> Result<(), ScopeError> {
    if BUFFER_MIN < value && value < BUFFER_MAX {
        Ok(())
    } else {
        Err(ScopeError::OutOfRange {
            value,
            min: BUFFER_MIN,
            max: BUFFER_MAX,
        })
    }
}

/// Orchestrates the recorder, the plot store and the sync loop. Starting is
/// strict (fails while already running); stopping is idempotent and bounded.
pub struct Controller {
    recorder: Arc<Recorder>,
    store: Arc<Mutex<PlotStore>>,
    config: Arc<SharedConfig>,
    worker: Option<SyncWorker>,
}

impl Controller {
    pub fn new(presenter: Box<dyn Presenter>, settings: &Settings) -> Self {
        let config = Arc::new(SharedConfig::new(settings));
        let recorder = Arc::new(Recorder::new(Arc::clone(&config)));
        let store = Arc::new(Mutex::new(PlotStore::new(
            presenter,
            settings.plot_height,
            settings.id_format,
        )));
        Self {
            recorder,
            store,
            config,
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Open the configured bus and hand it to the recorder. Only valid while
    /// stopped.
    pub fn apply_settings(&mut self, bus: &BusConfig) -> Result<(), ScopeError> {
        if self.is_running() {
            return Err(ScopeError::InvalidState(
                "settings can only be applied while stopped",
            ));
        }
        let bus = open_bus(bus)?;
        self.recorder.set_bus(bus)
    }

    /// Inject an already-open bus (tests, demo traffic). Same precondition
    /// as `apply_settings`.
    pub fn set_bus(&mut self, bus: Box<dyn CanBus>) -> Result<(), ScopeError> {
        if self.is_running() {
            return Err(ScopeError::InvalidState(
                "bus can only be changed while stopped",
            ));
        }
        self.recorder.set_bus(bus)
    }

    pub fn start(&mut self) -> Result<(), ScopeError> {
        if self.is_running() {
            return Err(ScopeError::InvalidState("already running"));
        }
        self.recorder.start()?;
        self.worker = Some(SyncWorker::spawn(
            Arc::clone(&self.recorder),
            Arc::clone(&self.store),
            Arc::clone(&self.config),
        ));
        Ok(())
    }

    pub fn stop(&mut self) {
        self.recorder.stop();
        if let Some(worker) = self.worker.take() {
            worker.stop();
        }
    }

    /// Resizes every live buffer; visible windows follow on the next tick.
    pub fn set_buffer_length(&self, length: usize) -> Result<(), ScopeError> {
        check_buffer_bounds(length)?;
        self.config.set_buffer_length(length);
        self.recorder.resize_all(length);
        Ok(())
    }

    /// Takes effect on the next tick; no repopulate needed.
    pub fn set_sample_window(&self, window: usize) -> Result<(), ScopeError> {
        check_buffer_bounds(window)?;
        self.config.set_sample_window(window);
        Ok(())
    }

    pub fn set_plot_height(&self, height: u32) -> Result<(), ScopeError> {
        if height == 0 || height > PLOT_HEIGHT_MAX {
            return Err(ScopeError::OutOfRange {
                value: height as usize,
                min: 1,
                max: PLOT_HEIGHT_MAX as usize,
            });
        }
        self.config.set_plot_height(height);
        self.lock_store().set_height(height);
        Ok(())
    }

    /// Relabels existing rows and rebuilds them from a fresh snapshot so the
    /// new labels are visible immediately, running or not.
    pub fn set_id_format(&self, format: IdFormat) {
        self.config.set_id_format(format);
        let snapshot = self.recorder.snapshot();
        let mut store = self.lock_store();
        store.set_id_format(format);
        store.repopulate(&snapshot, self.config.sample_window());
    }

    pub fn set_refresh_period(&self, period: Duration) -> Result<(), ScopeError> {
        if period < REFRESH_MIN || period > REFRESH_MAX {
            return Err(ScopeError::OutOfRange {
                value: period.as_millis() as usize,
                min: REFRESH_MIN.as_millis() as usize,
                max: REFRESH_MAX.as_millis() as usize,
            });
        }
        self.config.set_refresh_period(period);
        Ok(())
    }

    /// Drops all recorded data and every row.
    pub fn clear(&self) {
        self.recorder.clear_data();
        self.lock_store().clear();
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn row_ids(&self) -> Vec<CanId> {
        self.lock_store().ids()
    }

    fn lock_store(&self) -> MutexGuard<'_, PlotStore> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }
}
