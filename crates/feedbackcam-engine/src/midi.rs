//! MIDI control events.
//!
//! The MIDI backend hands us raw byte messages; this module turns them into
//! [`ControlEvent`]s, the only shape the rest of the engine sees.

/// Coarse classification of an incoming MIDI message.
///
/// Only [`MessageKind::ControlChange`] events drive parameters. Everything else
/// still travels through the queue so the verbose monitor can show it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Channel voice message other than a control change (notes, pitch bend, ...).
    PlainMessage,
    /// Continuous controller change (status `0xBn`).
    ControlChange,
    /// System exclusive dump (status `0xF0`).
    SystemExclusive,
    /// System common / realtime (timing clock, active sense, ...).
    Other,
}

impl MessageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::PlainMessage => "plain",
            MessageKind::ControlChange => "cc",
            MessageKind::SystemExclusive => "sysex",
            MessageKind::Other => "other",
        }
    }
}

const STATUS_CONTROL_CHANGE: u8 = 0xB0;
const STATUS_SYSEX: u8 = 0xF0;

/// One received hardware message, immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlEvent {
    pub kind: MessageKind,
    /// 0..15 for channel messages, 0 otherwise.
    pub channel: u8,
    /// Controller number for CC messages; first data byte for other channel messages.
    pub control: u8,
    /// 0..127 as delivered by the device. Not clamped.
    pub value: u8,
}

impl ControlEvent {
    pub fn new(kind: MessageKind, channel: u8, control: u8, value: u8) -> Self {
        Self {
            kind,
            channel,
            control,
            value,
        }
    }

    /// Control change on channel 0.
    pub fn control_change(control: u8, value: u8) -> Self {
        Self::new(MessageKind::ControlChange, 0, control, value)
    }

    /// Classify a raw MIDI message (status byte first).
    ///
    /// Returns `None` for an empty slice. Data bytes are passed through as-is.
    pub fn from_midi(bytes: &[u8]) -> Option<Self> {
        let status = *bytes.first()?;
        let data1 = bytes.get(1).copied().unwrap_or(0);
        let data2 = bytes.get(2).copied().unwrap_or(0);

        let ev = if status < STATUS_SYSEX {
            let channel = status & 0x0F;
            if status & 0xF0 == STATUS_CONTROL_CHANGE && bytes.len() == 3 {
                Self::new(MessageKind::ControlChange, channel, data1, data2)
            } else {
                Self::new(MessageKind::PlainMessage, channel, data1, data2)
            }
        } else if status == STATUS_SYSEX {
            Self::new(MessageKind::SystemExclusive, 0, 0, 0)
        } else {
            Self::new(MessageKind::Other, 0, 0, 0)
        };

        Some(ev)
    }

    pub fn is_control_change(&self) -> bool {
        self.kind == MessageKind::ControlChange
    }
}
