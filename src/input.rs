//! Keyboard bindings.
//!
//! `s`/`x` nudge the x displacement bias up/down, `d`/`c` the y bias. Bindings match on
//! the produced character (not the physical key) and auto-repeat keeps nudging.

use feedbackcam_engine::BiasNudge;
use winit::keyboard::{Key, NamedKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Nudge(BiasNudge),
    Quit,
}

pub fn nudge_for_char(c: &str) -> Option<BiasNudge> {
    match c {
        "s" => Some(BiasNudge::XUp),
        "x" => Some(BiasNudge::XDown),
        "d" => Some(BiasNudge::YUp),
        "c" => Some(BiasNudge::YDown),
        _ => None,
    }
}

pub fn action_for_key(key: &Key) -> Option<KeyAction> {
    match key {
        Key::Character(s) => nudge_for_char(s.as_str()).map(KeyAction::Nudge),
        Key::Named(NamedKey::Escape) => Some(KeyAction::Quit),
        _ => None,
    }
}
