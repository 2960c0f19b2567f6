use canscope_core::{PlotStore, Recorder, SharedConfig};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

#[derive(Debug, Clone, Copy)]
pub enum ControlMessage {
    Stop,
}

/// Handle to one running sync loop. Each run gets a fresh channel, so a stop
/// request never leaks into the next run.
pub(crate) struct SyncWorker {
    control_tx: Sender<ControlMessage>,
    handle: Option<JoinHandle<()>>,
}

impl SyncWorker {
    pub(crate) fn spawn(
        recorder: Arc<Recorder>,
        store: Arc<Mutex<PlotStore>>,
        config: Arc<SharedConfig>,
    ) -> Self {
        let (control_tx, control_rx) = mpsc::channel();
        let handle = thread::spawn(move || run_sync_loop(control_rx, recorder, store, config));
        Self {
            control_tx,
            handle: Some(handle),
        }
    }

    /// Bounded: the loop observes the stop request within one refresh period
    /// plus the iteration in flight.
    pub(crate) fn stop(mut self) {
        let _ = self.control_tx.send(ControlMessage::Stop);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_sync_loop(
    control_rx: Receiver<ControlMessage>,
    recorder: Arc<Recorder>,
    store: Arc<Mutex<PlotStore>>,
    config: Arc<SharedConfig>,
) {
    loop {
        match control_rx.recv_timeout(config.refresh_period()) {
            Ok(ControlMessage::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let snapshot = recorder.snapshot();
        let window_len = config.sample_window();
        let mut store = store.lock().unwrap_or_else(|e| e.into_inner());
        let membership_changed = store.len() != snapshot.len()
            || snapshot.keys().any(|id| !store.contains(*id));
        if membership_changed {
            // Rebuild all rows so the display stays sorted by id.
            store.repopulate(&snapshot, window_len);
            continue;
        }
        for (id, buffer) in &snapshot {
            if let Err(err) = store.update(*id, &buffer.window(window_len)) {
                log::warn!("row {id:#x} update failed: {err}");
            }
        }
    }
}
