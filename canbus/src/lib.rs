use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub type CanId = u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: CanId,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(id: CanId, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            data: data.into(),
        }
    }
}

pub const INTERFACES: [&str; 1] = ["virtual"];
pub const BITRATES: [u32; 5] = [33_333, 125_000, 250_000, 500_000, 1_000_000];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    pub interface: String,
    pub channel: String,
    pub bitrate: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            interface: "virtual".to_string(),
            channel: "can0".to_string(),
            bitrate: 500_000,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum BusError {
    #[error("unsupported interface '{0}'")]
    UnsupportedInterface(String),
    #[error("send failed")]
    SendFailed,
    #[error("receive failed")]
    RecvFailed,
}

pub trait CanBus: Send + Sync {
    fn send(&self, frame: &Frame) -> Result<(), BusError>;
    fn recv(&self, timeout: Duration) -> Result<Option<Frame>, BusError>;
}

type ChannelPeers = Vec<(usize, Sender<Frame>)>;

fn registry() -> MutexGuard<'static, HashMap<String, ChannelPeers>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, ChannelPeers>>> = OnceLock::new();
    REGISTRY
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

/// In-process bus: frames sent on one instance are delivered to every other
/// instance open on the same channel, never back to the sender.
pub struct VirtualBus {
    id: usize,
    channel: String,
    receiver: Mutex<Receiver<Frame>>,
}

impl VirtualBus {
    pub fn open(channel: &str) -> Self {
        static NEXT_ID: AtomicUsize = AtomicUsize::new(1);
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel();
        registry()
            .entry(channel.to_string())
            .or_default()
            .push((id, sender));
        Self {
            id,
            channel: channel.to_string(),
            receiver: Mutex::new(receiver),
        }
    }
}

impl CanBus for VirtualBus {
    fn send(&self, frame: &Frame) -> Result<(), BusError> {
        let mut channels = registry();
        let peers = channels
            .get_mut(&self.channel)
            .ok_or(BusError::SendFailed)?;
        // Prune peers whose receiver side is gone.
        peers.retain(|(peer_id, tx)| *peer_id == self.id || tx.send(frame.clone()).is_ok());
        Ok(())
    }

    fn recv(&self, timeout: Duration) -> Result<Option<Frame>, BusError> {
        let receiver = self.receiver.lock().unwrap_or_else(|e| e.into_inner());
        match receiver.recv_timeout(timeout) {
            Ok(frame) => Ok(Some(frame)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(BusError::RecvFailed),
        }
    }
}

impl Drop for VirtualBus {
    fn drop(&mut self) {
        let mut channels = registry();
        if let Some(peers) = channels.get_mut(&self.channel) {
            peers.retain(|(peer_id, _)| *peer_id != self.id);
            if peers.is_empty() {
                channels.remove(&self.channel);
            }
        }
    }
}

pub fn open_bus(config: &BusConfig) -> Result<Box<dyn CanBus>, BusError> {
    match config.interface.as_str() {
        "virtual" => Ok(Box::new(VirtualBus::open(&config.channel))),
        other => Err(BusError::UnsupportedInterface(other.to_string())),
    }
}

const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Background listener: polls the bus and hands every received frame to the
/// callback until stopped or the bus errors out.
pub struct Notifier {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Notifier {
    pub fn spawn(bus: Arc<dyn CanBus>, mut listener: Box<dyn FnMut(Frame) + Send>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);
        let handle = thread::spawn(move || {
            while !thread_stop.load(Ordering::Relaxed) {
                match bus.recv(POLL_TIMEOUT) {
                    Ok(Some(frame)) => listener(frame),
                    Ok(None) => {}
                    Err(err) => {
                        log::warn!("bus receive failed, listener exiting: {err}");
                        break;
                    }
                }
            }
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        self.shutdown();
    }
}

pub fn random_frame<R: Rng>(rng: &mut R) -> Frame {
    let id = rng.gen_range(1..=25);
    let len = rng.gen_range(1..=8);
    let data = (0..len).map(|_| rng.gen()).collect();
    Frame { id, data }
}
