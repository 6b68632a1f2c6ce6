//! CC → parameter mapping.
//!
//! The MIDI thread only ever calls [`ControlSink::on_control_event`]; the render
//! loop calls [`SharedMapper::drain_and_apply`] once per frame and gets a copy of
//! the current [`ParameterState`]. Both go through the same mutex.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::MidiConfig;
use crate::midi::ControlEvent;
use crate::queue::EventQueue;

pub const DEFAULT_UNIPOLAR_CC: u8 = 16;
pub const DEFAULT_BIPOLAR_CC: u8 = 17;

/// The two derived control values handed to the renderer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParameterState {
    /// `value / 127`, nominally 0..1.
    pub unipolar: f32,
    /// `(value - 63) / 63`, nominally -1..1 (127 lands at ~1.016).
    pub bipolar: f32,
}

/// `value / 127`. Not clamped: the 7-bit range is trusted from upstream.
pub fn unipolar_from_cc(value: u8) -> f32 {
    value as f32 / 127.0
}

/// `(value - 63) / 63`.
///
/// The divisor is 63 on both sides of the center, so 0 maps to -1.0 and 127 maps to
/// 64/63 (about 1.016). Kept as-is so existing controller setups respond identically.
pub fn bipolar_from_cc(value: u8) -> f32 {
    (value as f32 - 63.0) / 63.0
}

/// Owns the bounded event queue and the derived parameter state.
#[derive(Debug, Clone)]
pub struct ParameterMapper {
    queue: EventQueue,
    unipolar_cc: u8,
    bipolar_cc: u8,
    state: ParameterState,
    evicted: u64,
}

impl ParameterMapper {
    pub fn new(capacity: NonZeroUsize, unipolar_cc: u8, bipolar_cc: u8) -> Self {
        Self {
            queue: EventQueue::new(capacity),
            unipolar_cc,
            bipolar_cc,
            state: ParameterState::default(),
            evicted: 0,
        }
    }

    pub fn from_config(cfg: &MidiConfig) -> Self {
        Self::new(cfg.capacity(), cfg.unipolar_cc, cfg.bipolar_cc)
    }

    /// Append an event. Overflow silently drops the oldest events.
    pub fn submit(&mut self, event: ControlEvent) {
        self.evicted += self.queue.push(event) as u64;
    }

    /// Re-derive both parameters from every event still in the queue, oldest first.
    ///
    /// The queue is left intact, so calling this again without new events yields the
    /// same state. For each control the last matching CC in the queue wins.
    pub fn drain_and_apply(&mut self) -> ParameterState {
        for ev in self.queue.iter() {
            if !ev.is_control_change() {
                continue;
            }
            if ev.control == self.unipolar_cc {
                self.state.unipolar = unipolar_from_cc(ev.value);
            } else if ev.control == self.bipolar_cc {
                self.state.bipolar = bipolar_from_cc(ev.value);
            }
        }
        self.state
    }

    /// Last derived state, without touching the queue.
    pub fn state(&self) -> ParameterState {
        self.state
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Events dropped by the capacity bound since construction.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }

    pub fn unipolar_cc(&self) -> u8 {
        self.unipolar_cc
    }

    pub fn bipolar_cc(&self) -> u8 {
        self.bipolar_cc
    }
}

impl Default for ParameterMapper {
    fn default() -> Self {
        Self::from_config(&MidiConfig::default())
    }
}

/// Something that accepts control events pushed from a MIDI callback.
pub trait ControlSink: Send + Sync {
    fn on_control_event(&self, event: ControlEvent);
}

/// Cloneable, thread-safe handle to a [`ParameterMapper`].
#[derive(Debug, Clone, Default)]
pub struct SharedMapper {
    inner: Arc<Mutex<ParameterMapper>>,
}

impl SharedMapper {
    pub fn new(mapper: ParameterMapper) -> Self {
        Self {
            inner: Arc::new(Mutex::new(mapper)),
        }
    }

    // A panic while holding the lock cannot leave the queue in a broken state, so
    // poisoning is ignored and both operations stay infallible.
    fn lock(&self) -> MutexGuard<'_, ParameterMapper> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn submit(&self, event: ControlEvent) {
        self.lock().submit(event);
    }

    pub fn drain_and_apply(&self) -> ParameterState {
        self.lock().drain_and_apply()
    }

    pub fn state(&self) -> ParameterState {
        self.lock().state()
    }

    pub fn queue_len(&self) -> usize {
        self.lock().queue().len()
    }

    pub fn evicted(&self) -> u64 {
        self.lock().evicted()
    }
}

impl ControlSink for SharedMapper {
    fn on_control_event(&self, event: ControlEvent) {
        self.submit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::MessageKind;

    fn mapper(capacity: usize) -> ParameterMapper {
        ParameterMapper::new(
            NonZeroUsize::new(capacity).unwrap(),
            DEFAULT_UNIPOLAR_CC,
            DEFAULT_BIPOLAR_CC,
        )
    }

    #[test]
    fn unipolar_full_scale() {
        let mut m = mapper(64);
        m.submit(ControlEvent::control_change(16, 127));
        assert!((m.drain_and_apply().unipolar - 1.0).abs() < 1e-6);
    }

    #[test]
    fn bipolar_bottom_and_center() {
        let mut m = mapper(64);
        m.submit(ControlEvent::control_change(17, 0));
        assert!((m.drain_and_apply().bipolar + 1.0).abs() < 1e-6);

        m.submit(ControlEvent::control_change(17, 63));
        assert!(m.drain_and_apply().bipolar.abs() < 1e-6);
    }

    #[test]
    fn bipolar_top_overshoots() {
        assert!((bipolar_from_cc(127) - 64.0 / 63.0).abs() < 1e-6);
        assert!(bipolar_from_cc(127) > 1.0);
    }

    #[test]
    fn non_cc_kinds_are_ignored() {
        let mut m = mapper(64);
        m.submit(ControlEvent::control_change(16, 64));
        let before = m.drain_and_apply();

        for kind in [MessageKind::PlainMessage, MessageKind::SystemExclusive, MessageKind::Other] {
            m.submit(ControlEvent::new(kind, 0, 16, 127));
            m.submit(ControlEvent::new(kind, 0, 17, 127));
        }
        assert_eq!(m.drain_and_apply(), before);
    }

    #[test]
    fn state_starts_at_zero() {
        let mut m = mapper(8);
        assert_eq!(m.state(), ParameterState::default());
        assert_eq!(m.drain_and_apply(), ParameterState { unipolar: 0.0, bipolar: 0.0 });
    }

    #[test]
    fn custom_cc_assignment() {
        let mut m = ParameterMapper::new(NonZeroUsize::new(4).unwrap(), 1, 2);
        m.submit(ControlEvent::control_change(16, 127));
        m.submit(ControlEvent::control_change(1, 127));
        let s = m.drain_and_apply();
        assert!((s.unipolar - 1.0).abs() < 1e-6);
        assert_eq!(m.unipolar_cc(), 1);
        assert_eq!(m.bipolar_cc(), 2);
    }

    #[test]
    fn eviction_count_accumulates() {
        let mut m = mapper(2);
        for v in 0..5u8 {
            m.submit(ControlEvent::control_change(16, v));
        }
        assert_eq!(m.queue().len(), 2);
        assert_eq!(m.evicted(), 3);
    }

    #[test]
    fn shared_mapper_survives_a_poisoned_lock() {
        let shared = SharedMapper::new(mapper(4));

        let held = shared.clone();
        let res = std::thread::spawn(move || {
            let _guard = held.inner.lock().unwrap();
            panic!("panic while holding the mapper lock");
        })
        .join();
        assert!(res.is_err());
        assert!(shared.inner.is_poisoned());

        shared.submit(ControlEvent::control_change(16, 127));
        let s = shared.drain_and_apply();
        assert!((s.unipolar - 1.0).abs() < 1e-6);
        assert_eq!(shared.queue_len(), 1);
        assert_eq!(shared.state(), s);
    }

    #[test]
    fn same_cc_for_both_favours_unipolar() {
        let mut m = ParameterMapper::new(NonZeroUsize::new(4).unwrap(), 20, 20);
        m.submit(ControlEvent::control_change(20, 127));
        let s = m.drain_and_apply();
        assert!((s.unipolar - 1.0).abs() < 1e-6);
        assert_eq!(s.bipolar, 0.0);
    }
}
