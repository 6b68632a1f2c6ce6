//! Core of feedbackcam: MIDI control events, the bounded event queue, the CC → parameter
//! mapper, and the displacement uniforms the renderer consumes.
//!
//! Nothing in here touches GL, windows, or MIDI ports. The binary owns those and talks to
//! this crate through [`mapper::ControlSink`] (MIDI in) and
//! [`displace::DisplaceBias::displacement`] (uniforms out).

pub mod assets;
pub mod config;
pub mod displace;
pub mod error;
pub mod mapper;
pub mod midi;
pub mod queue;

pub use displace::{BiasNudge, DisplaceBias, Displacement};
pub use error::EngineError;
pub use mapper::{ControlSink, ParameterMapper, ParameterState, SharedMapper};
pub use midi::{ControlEvent, MessageKind};
pub use queue::EventQueue;
