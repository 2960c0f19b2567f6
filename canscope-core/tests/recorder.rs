use canbus::{CanBus, Frame, VirtualBus};
use canscope_core::{decode_payload, Recorder, SharedConfig};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn new_recorder() -> Recorder {
    Recorder::new(Arc::new(SharedConfig::default()))
}

fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(1);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn decode_is_big_endian() {
    assert_eq!(decode_payload(&[0x01, 0x02]), Some(258));
    assert_eq!(decode_payload(&[]), Some(0));
    assert_eq!(decode_payload(&[0xff; 8]), Some(u64::MAX));
    assert_eq!(decode_payload(&[0; 9]), None);
}

#[test]
fn start_without_bus_fails_and_leaves_state_unchanged() {
    let recorder = new_recorder();
    assert!(recorder.start().is_err());
    assert!(!recorder.is_active());
}

#[test]
fn start_stop_lifecycle_is_lenient() {
    let recorder = new_recorder();
    recorder
        .set_bus(Box::new(VirtualBus::open("t-rec-life")))
        .unwrap();

    recorder.start().unwrap();
    assert!(recorder.is_active());
    recorder.start().unwrap();
    assert!(recorder.is_active());

    recorder.stop();
    assert!(!recorder.is_active());
    recorder.stop();

    recorder.start().unwrap();
    assert!(recorder.is_active());
    recorder.stop();
}

#[test]
fn set_bus_while_active_fails() {
    let recorder = new_recorder();
    recorder
        .set_bus(Box::new(VirtualBus::open("t-rec-setbus")))
        .unwrap();
    recorder.start().unwrap();
    assert!(recorder
        .set_bus(Box::new(VirtualBus::open("t-rec-setbus")))
        .is_err());
    recorder.stop();
}

#[test]
fn frames_are_recorded_per_id() {
    let recorder = new_recorder();
    recorder
        .set_bus(Box::new(VirtualBus::open("t-rec-data")))
        .unwrap();
    let tx = VirtualBus::open("t-rec-data");
    recorder.start().unwrap();

    tx.send(&Frame::new(0x12, vec![0x01, 0x02])).unwrap();
    assert!(wait_for(|| recorder.snapshot().contains_key(&0x12)));

    let snapshot = recorder.snapshot();
    let buffer = &snapshot[&0x12];
    assert_eq!(buffer.len(), 100);
    assert_eq!(buffer.latest(), Some(258));
    recorder.stop();
}

#[test]
fn snapshot_contains_only_observed_ids() {
    let recorder = new_recorder();
    recorder
        .set_bus(Box::new(VirtualBus::open("t-rec-keys")))
        .unwrap();
    let tx = VirtualBus::open("t-rec-keys");
    recorder.start().unwrap();

    assert!(recorder.snapshot().is_empty());
    tx.send(&Frame::new(5, vec![1])).unwrap();
    tx.send(&Frame::new(9, vec![2])).unwrap();
    assert!(wait_for(|| recorder.snapshot().len() == 2));

    let mut ids: Vec<u32> = recorder.snapshot().keys().copied().collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![5, 9]);
    recorder.stop();
}

#[test]
fn oversized_payload_is_dropped() {
    let recorder = new_recorder();
    recorder
        .set_bus(Box::new(VirtualBus::open("t-rec-oversize")))
        .unwrap();
    let tx = VirtualBus::open("t-rec-oversize");
    recorder.start().unwrap();

    tx.send(&Frame::new(1, vec![0; 9])).unwrap();
    tx.send(&Frame::new(2, vec![4])).unwrap();
    assert!(wait_for(|| recorder.snapshot().contains_key(&2)));

    let snapshot = recorder.snapshot();
    assert!(!snapshot.contains_key(&1));
    recorder.stop();
}

#[test]
fn clear_data_empties_all_buffers() {
    let recorder = new_recorder();
    recorder
        .set_bus(Box::new(VirtualBus::open("t-rec-clear")))
        .unwrap();
    let tx = VirtualBus::open("t-rec-clear");
    recorder.start().unwrap();

    tx.send(&Frame::new(3, vec![1])).unwrap();
    assert!(wait_for(|| !recorder.snapshot().is_empty()));
    recorder.clear_data();
    assert!(recorder.snapshot().is_empty());
    recorder.stop();
}

#[test]
fn resize_all_applies_to_every_buffer() {
    let recorder = new_recorder();
    recorder
        .set_bus(Box::new(VirtualBus::open("t-rec-resize")))
        .unwrap();
    let tx = VirtualBus::open("t-rec-resize");
    recorder.start().unwrap();

    tx.send(&Frame::new(1, vec![1])).unwrap();
    tx.send(&Frame::new(2, vec![2])).unwrap();
    assert!(wait_for(|| recorder.snapshot().len() == 2));

    recorder.resize_all(20);
    let snapshot = recorder.snapshot();
    assert!(snapshot.values().all(|buffer| buffer.capacity() == 20));
    recorder.stop();
}
