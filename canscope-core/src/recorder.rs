use crate::config::SharedConfig;
use crate::error::ScopeError;
use crate::ring::{RingBuffer, Sample};
use canbus::{CanBus, CanId, Frame, Notifier};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Payloads longer than this cannot be read as a single unsigned magnitude.
const MAX_PAYLOAD_BYTES: usize = 8;

/// Interpret payload bytes as an unsigned big-endian magnitude. `None` for
/// payloads too long to represent; an empty payload decodes to zero.
pub fn decode_payload(data: &[u8]) -> Option<Sample> {
    if data.len() > MAX_PAYLOAD_BYTES {
        return None;
    }
    Some(
        data.iter()
            .fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte)),
    )
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Owns the per-id ring buffers and the bus subscription. `start`/`stop` are
/// lenient: starting while active and stopping while inactive are no-ops.
pub struct Recorder {
    buffers: Arc<Mutex<HashMap<CanId, RingBuffer>>>,
    config: Arc<SharedConfig>,
    bus: Mutex<Option<Arc<dyn CanBus>>>,
    notifier: Mutex<Option<Notifier>>,
    active: AtomicBool,
}

impl Recorder {
    pub fn new(config: Arc<SharedConfig>) -> Self {
        Self {
            buffers: Arc::new(Mutex::new(HashMap::new())),
            config,
            bus: Mutex::new(None),
            notifier: Mutex::new(None),
            active: AtomicBool::new(false),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub fn set_bus(&self, bus: Box<dyn CanBus>) -> Result<(), ScopeError> {
        if self.is_active() {
            return Err(ScopeError::InvalidState(
                "bus can only be changed while inactive",
            ));
        }
        *lock(&self.bus) = Some(Arc::from(bus));
        Ok(())
    }

    pub fn start(&self) -> Result<(), ScopeError> {
        if self.is_active() {
            return Ok(());
        }
        let bus = lock(&self.bus)
            .as_ref()
            .map(Arc::clone)
            .ok_or(ScopeError::InvalidState("bus must be set before starting"))?;

        let buffers = Arc::clone(&self.buffers);
        let config = Arc::clone(&self.config);
        let listener = Box::new(move |frame: Frame| {
            let Some(value) = decode_payload(&frame.data) else {
                log::warn!(
                    "dropping frame {:#x}: {}-byte payload exceeds magnitude width",
                    frame.id,
                    frame.data.len()
                );
                return;
            };
            lock(&buffers)
                .entry(frame.id)
                .or_insert_with(|| RingBuffer::new(config.buffer_length()))
                .append(value);
        });

        *lock(&self.notifier) = Some(Notifier::spawn(bus, listener));
        self.active.store(true, Ordering::Relaxed);
        Ok(())
    }

    pub fn stop(&self) {
        if !self.is_active() {
            return;
        }
        if let Some(notifier) = lock(&self.notifier).take() {
            notifier.stop();
        }
        self.active.store(false, Ordering::Relaxed);
    }

    /// Point-in-time copy of the id → buffer map. The lock is scoped to the
    /// clone; appends landing afterwards are simply not in this copy.
    pub fn snapshot(&self) -> HashMap<CanId, RingBuffer> {
        lock(&self.buffers).clone()
    }

    pub fn clear_data(&self) {
        lock(&self.buffers).clear();
    }

    /// Rebuild every buffer at the new logical capacity. Bounds are the
    /// caller's responsibility.
    pub fn resize_all(&self, capacity: usize) {
        for buffer in lock(&self.buffers).values_mut() {
            buffer.resize(capacity);
        }
    }
}
