use std::num::NonZeroUsize;
use std::thread;

use feedbackcam_engine::{
    BiasNudge, ControlEvent, ControlSink, DisplaceBias, MessageKind, ParameterMapper, ParameterState,
    SharedMapper,
};

const EPS: f32 = 1e-6;

fn mapper(capacity: usize) -> ParameterMapper {
    ParameterMapper::new(NonZeroUsize::new(capacity).unwrap(), 16, 17)
}

fn cc(control: u8, value: u8) -> ControlEvent {
    ControlEvent::control_change(control, value)
}

#[test]
fn queue_stays_bounded_for_any_submit_sequence() {
    for capacity in [1usize, 2, 5, 64] {
        let mut m = mapper(capacity);
        for i in 0..200u32 {
            let kind = match i % 4 {
                0 => MessageKind::ControlChange,
                1 => MessageKind::PlainMessage,
                2 => MessageKind::SystemExclusive,
                _ => MessageKind::Other,
            };
            m.submit(ControlEvent::new(kind, 0, (i % 128) as u8, (i % 128) as u8));
            assert!(m.queue().len() <= capacity);
        }
    }
}

#[test]
fn overflow_drops_only_the_oldest_event() {
    let capacity = 64;
    let mut m = mapper(capacity);
    for i in 0..capacity {
        m.submit(cc(i as u8, 1));
    }
    m.submit(cc(100, 2));

    let controls: Vec<u8> = m.queue().iter().map(|e| e.control).collect();
    assert_eq!(controls.len(), capacity);
    assert!(!controls.contains(&0));
    for i in 1..capacity {
        assert!(controls.contains(&(i as u8)));
    }
    assert_eq!(*controls.last().unwrap(), 100);
}

#[test]
fn unipolar_127_maps_to_one() {
    let mut m = mapper(64);
    m.submit(cc(16, 127));
    assert!((m.drain_and_apply().unipolar - 1.0).abs() < EPS);
}

#[test]
fn bipolar_0_maps_to_minus_one() {
    let mut m = mapper(64);
    m.submit(cc(17, 0));
    assert!((m.drain_and_apply().bipolar + 1.0).abs() < EPS);
}

#[test]
fn drain_is_idempotent_without_new_events() {
    let mut m = mapper(64);
    m.submit(cc(16, 40));
    m.submit(cc(17, 90));
    let first = m.drain_and_apply();
    let second = m.drain_and_apply();
    assert_eq!(first, second);
    assert_eq!(m.queue().len(), 2);
}

#[test]
fn later_event_in_queue_wins() {
    let mut m = mapper(64);
    m.submit(cc(16, 0));
    m.submit(cc(16, 127));
    assert!((m.drain_and_apply().unipolar - 1.0).abs() < EPS);
}

#[test]
fn unrecognized_controls_and_kinds_leave_state_alone() {
    let mut m = mapper(64);
    m.submit(cc(16, 64));
    m.submit(cc(17, 20));
    let before = m.drain_and_apply();

    m.submit(cc(99, 50));
    m.submit(ControlEvent::new(MessageKind::PlainMessage, 0, 16, 0));
    m.submit(ControlEvent::new(MessageKind::SystemExclusive, 0, 17, 127));
    assert_eq!(m.drain_and_apply(), before);
}

#[test]
fn eviction_scenario_with_capacity_two() {
    let mut m = mapper(2);
    m.submit(cc(16, 0)); // A
    m.submit(cc(17, 63)); // B
    m.submit(cc(16, 127)); // C

    let resident: Vec<(u8, u8)> = m.queue().iter().map(|e| (e.control, e.value)).collect();
    assert_eq!(resident, vec![(17, 63), (16, 127)]);

    let s = m.drain_and_apply();
    assert!((s.unipolar - 1.0).abs() < EPS);
    assert!(s.bipolar.abs() < EPS);
}

#[test]
fn state_survives_eviction_of_its_source_event() {
    let mut m = mapper(1);
    m.submit(cc(16, 127));
    assert!((m.drain_and_apply().unipolar - 1.0).abs() < EPS);

    m.submit(cc(99, 0));
    let s = m.drain_and_apply();
    assert!((s.unipolar - 1.0).abs() < EPS);
}

#[test]
fn value_reflects_latest_resident_event_not_latest_received() {
    let mut m = mapper(2);
    m.submit(cc(16, 127));
    m.submit(cc(16, 0));
    m.submit(cc(99, 0));
    // (16, 0) is still resident and is the last match.
    assert!(m.drain_and_apply().unipolar.abs() < EPS);
}

#[test]
fn shared_mapper_accepts_events_from_another_thread() {
    let shared = SharedMapper::new(mapper(64));
    let sink: Box<dyn ControlSink> = Box::new(shared.clone());

    let handle = thread::spawn(move || {
        for v in 0..=127u8 {
            sink.on_control_event(cc(16, v));
        }
        sink.on_control_event(cc(17, 0));
    });
    handle.join().unwrap();

    assert_eq!(shared.queue_len(), 64);
    let s = shared.drain_and_apply();
    assert!((s.unipolar - 1.0).abs() < EPS);
    assert!((s.bipolar + 1.0).abs() < EPS);
    assert_eq!(shared.state(), s);
}

#[test]
fn midi_bytes_flow_through_to_displacement() {
    let mut m = mapper(64);
    for msg in [&[0xB0u8, 16, 127][..], &[0xB5, 17, 0], &[0xF8], &[0x90, 16, 0]] {
        if let Some(ev) = ControlEvent::from_midi(msg) {
            m.submit(ev);
        }
    }
    let params = m.drain_and_apply();
    assert_eq!(
        params,
        ParameterState {
            unipolar: 1.0,
            bipolar: -1.0
        }
    );

    let mut bias = DisplaceBias::default();
    bias.nudge(BiasNudge::YUp);
    let d = bias.displacement(&params);
    assert!((d.x - 0.01).abs() < EPS);
    assert!((d.y - (0.0001 - 0.01)).abs() < EPS);
}
