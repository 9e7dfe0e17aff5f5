//! End-to-end synchronization scenarios against an in-memory transport.

mod common;

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use bl_devices::{BeltConveyor, DisplayNumberActuator, Emitter, RetroreflectiveSensor, WeightSensor};
use bl_registry::{ConnectionState, Factory, RegistryError, Station};
use common::{Recorder, WAIT};

fn connected_factory() -> (Arc<Factory>, Recorder) {
    let recorder = Recorder::default();
    let factory = Factory::new();
    factory.attach(recorder.clone()).unwrap();
    (factory, recorder)
}

#[test]
fn emitter_and_entry_sensor_round_trip() {
    let (factory, recorder) = connected_factory();
    let emitter = Emitter::new(&factory, "Emitter");
    let at_entry = RetroreflectiveSensor::new(&factory, "At Entry");
    factory.publish_changes().unwrap();
    assert_eq!(recorder.last().as_deref(), Some(r#"{"Emitter":false}"#));

    emitter.set_on(true);
    factory.publish_changes().unwrap();
    assert_eq!(recorder.last().as_deref(), Some(r#"{"Emitter":true}"#));

    let (tx, rx) = mpsc::channel();
    let waiter = {
        let at_entry = at_entry.clone();
        thread::spawn(move || tx.send(at_entry.wait_for_change()).unwrap())
    };

    assert_eq!(factory.handle_inbound(r#"{"At Entry":true}"#).unwrap(), 1);
    assert!(at_entry.beam_detected());
    assert_eq!(rx.recv_timeout(WAIT), Ok(true));
    waiter.join().unwrap();
}

#[test]
fn repeated_identical_inbound_produces_no_change() {
    let (factory, _recorder) = connected_factory();
    let at_entry = RetroreflectiveSensor::new(&factory, "At Entry");

    assert_eq!(factory.handle_inbound(r#"{"At Entry":true}"#).unwrap(), 1);
    let seen = factory.change_count();
    assert_eq!(factory.handle_inbound(r#"{"At Entry":true}"#).unwrap(), 0);
    assert_eq!(factory.change_count(), seen);

    // The first change was never consumed; the second delivery adds nothing.
    assert!(at_entry.sensor().has_changed());
    at_entry.wait_for_change();
    assert!(!at_entry.sensor().has_changed());
}

#[test]
fn second_publish_without_changes_is_empty_object() {
    let (factory, recorder) = connected_factory();
    let belt = BeltConveyor::new(&factory, "Belt");
    belt.set_speed(1.5);
    factory.publish_changes().unwrap();
    factory.publish_changes().unwrap();
    assert_eq!(recorder.sent(), [r#"{"Belt":1.5}"#, "{}"]);
}

#[test]
fn publish_order_follows_registration() {
    let (factory, recorder) = connected_factory();
    let zeta = Emitter::new(&factory, "Zeta");
    let alpha = DisplayNumberActuator::new(&factory, "Alpha");
    factory.publish_changes().unwrap();
    alpha.set_number(3);
    zeta.set_on(true);
    factory.publish_changes().unwrap();
    assert_eq!(recorder.last().as_deref(), Some(r#"{"Zeta":true,"Alpha":3}"#));
}

#[test]
fn publish_all_sends_clean_actuators() {
    let (factory, recorder) = connected_factory();
    let _emitter = Emitter::new(&factory, "Emitter");
    let _belt = BeltConveyor::new(&factory, "Belt");
    factory.publish_changes().unwrap();
    factory.publish_all().unwrap();
    assert_eq!(recorder.last().as_deref(), Some(r#"{"Emitter":false,"Belt":0.0}"#));
}

#[test]
fn mismatched_and_unknown_keys_are_skipped() {
    let (factory, _recorder) = connected_factory();
    let weight = WeightSensor::new(&factory, "Weight");
    let at_exit = RetroreflectiveSensor::new(&factory, "At Exit");

    let changed = factory
        .handle_inbound(r#"{"Weight":"heavy","At Exit":true,"Unknown":1}"#)
        .unwrap();
    assert_eq!(changed, 1);
    assert_eq!(weight.weight(), 0.0);
    assert!(at_exit.beam_detected());
}

#[test]
fn malformed_inbound_is_discarded_whole() {
    let (factory, _recorder) = connected_factory();
    let at_entry = RetroreflectiveSensor::new(&factory, "At Entry");
    let seen = factory.change_count();

    assert!(matches!(
        factory.handle_inbound(r#"{"At Entry":true"#),
        Err(RegistryError::Link(_))
    ));
    assert!(matches!(
        factory.handle_inbound("[true]"),
        Err(RegistryError::Link(_))
    ));
    assert!(!at_entry.beam_detected());
    assert_eq!(factory.change_count(), seen);
}

#[test]
fn any_change_wait_ignores_batches_without_changes() {
    let (factory, _recorder) = connected_factory();
    let _at_entry = RetroreflectiveSensor::new(&factory, "At Entry");
    let seen = factory.change_count();

    let (tx, rx) = mpsc::channel();
    let waiter = {
        let factory = factory.clone();
        thread::spawn(move || tx.send(factory.wait_for_change_after(seen)).unwrap())
    };

    factory.handle_inbound(r#"{"At Entry":false}"#).unwrap();
    factory.handle_inbound(r#"{"Something Else":true}"#).unwrap();
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

    factory.handle_inbound(r#"{"At Entry":true}"#).unwrap();
    assert_eq!(rx.recv_timeout(WAIT), Ok(seen + 1));
    waiter.join().unwrap();
}

#[test]
fn one_notification_per_batch() {
    let (factory, _recorder) = connected_factory();
    let _a = RetroreflectiveSensor::new(&factory, "A");
    let _b = RetroreflectiveSensor::new(&factory, "B");
    let before = factory.change_count();
    assert_eq!(factory.handle_inbound(r#"{"A":true,"B":true}"#).unwrap(), 2);
    assert_eq!(factory.change_count(), before + 1);
}

#[test]
fn stations_flush_independently_and_share_sensors() {
    let (factory, recorder) = connected_factory();
    let pallet = Station::new(&factory, "Pallet");
    let boxes = Station::new(&factory, "Box");
    let pallet_emitter = Emitter::new(&pallet, "Pallet Emitter");
    let box_emitter = Emitter::new(&boxes, "Box Emitter");
    let box_sensor = RetroreflectiveSensor::new(&boxes, "Box At Entry");

    assert_eq!(pallet.actuator_count(), 1);
    assert_eq!(boxes.actuator_count(), 1);
    assert_eq!(factory.actuator_count(), 0);
    assert_eq!(factory.sensor_count(), 1);

    pallet.publish_changes().unwrap();
    boxes.publish_changes().unwrap();
    pallet_emitter.set_on(true);
    box_emitter.set_on(true);

    pallet.publish_changes().unwrap();
    assert_eq!(recorder.last().as_deref(), Some(r#"{"Pallet Emitter":true}"#));
    assert!(box_emitter.actuator().is_dirty());

    boxes.publish_changes().unwrap();
    assert_eq!(recorder.last().as_deref(), Some(r#"{"Box Emitter":true}"#));

    // Factory-level publish knows nothing about station actuators.
    factory.publish_changes().unwrap();
    assert_eq!(recorder.last().as_deref(), Some("{}"));

    factory.handle_inbound(r#"{"Box At Entry":true}"#).unwrap();
    assert!(box_sensor.beam_detected());
}

#[test]
fn station_wait_for_any_change_follows_factory_stream() {
    let (factory, _recorder) = connected_factory();
    let pallet = Arc::new(Station::new(&factory, "Pallet"));
    let boxes = Station::new(&factory, "Box");
    let _box_sensor = RetroreflectiveSensor::new(&boxes, "Box At Entry");

    let (tx, rx) = mpsc::channel();
    let waiter = {
        let pallet = pallet.clone();
        thread::spawn(move || {
            pallet.wait_for_any_change();
            tx.send(()).unwrap();
        })
    };

    // Keep toggling until the waiter, wherever it started, sees a change.
    let mut released = false;
    for step in 0..100 {
        let message = format!(r#"{{"Box At Entry":{}}}"#, step % 2 == 0);
        factory.handle_inbound(&message).unwrap();
        if rx.recv_timeout(Duration::from_millis(50)).is_ok() {
            released = true;
            break;
        }
    }
    assert!(released);
    waiter.join().unwrap();
}

#[test]
fn full_snapshot_request_blocks_until_first_batch() {
    let (factory, recorder) = connected_factory();
    let at_entry = RetroreflectiveSensor::new(&factory, "At Entry");
    let _at_exit = RetroreflectiveSensor::new(&factory, "At Exit");

    let (tx, rx) = mpsc::channel();
    let requester = {
        let factory = factory.clone();
        thread::spawn(move || tx.send(factory.request_full_snapshot().is_ok()).unwrap())
    };

    assert!(recorder.wait_for(r#"{"Send Sensor Data":true}"#));
    assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());

    // A reply equal to the zero defaults still counts as the first batch.
    factory
        .handle_inbound(r#"{"At Entry":false,"At Exit":false}"#)
        .unwrap();
    assert_eq!(rx.recv_timeout(WAIT), Ok(true));
    requester.join().unwrap();
    assert!(!at_entry.beam_detected());
}

#[test]
fn send_failure_is_returned_and_marks_link_lost() {
    let (factory, recorder) = connected_factory();
    let emitter = Emitter::new(&factory, "Emitter");
    recorder.fail_next_sends();
    emitter.set_on(true);

    assert!(matches!(
        factory.publish_changes(),
        Err(RegistryError::Link(_))
    ));
    assert!(factory.is_link_lost());
    assert_eq!(factory.connection_state(), ConnectionState::Connected);
}

#[test]
fn attach_twice_is_rejected() {
    let (factory, _recorder) = connected_factory();
    assert!(matches!(
        factory.attach(Recorder::default()),
        Err(RegistryError::AlreadyConnected)
    ));
}

#[test]
fn duplicate_names_are_kept() {
    let (factory, _recorder) = connected_factory();
    let first = RetroreflectiveSensor::new(&factory, "At Entry");
    let second = RetroreflectiveSensor::new(&factory, "At Entry");
    assert_eq!(factory.sensor_count(), 2);
    assert_eq!(factory.handle_inbound(r#"{"At Entry":true}"#).unwrap(), 2);
    assert!(first.beam_detected() && second.beam_detected());
}
