//! Feedback displacement uniforms.
//!
//! `x = x_bias + scale * unipolar`, `y = y_bias + scale * bipolar`. The biases are
//! nudged from the keyboard in fixed steps; the MIDI-derived part rides on top.

use crate::config::KeysConfig;
use crate::mapper::ParameterState;

pub const DEFAULT_BIAS_STEP: f32 = 0.0001;
pub const DEFAULT_DISPLACE_SCALE: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BiasNudge {
    XUp,
    XDown,
    YUp,
    YDown,
}

/// What the feedback shader receives as `fb0_xdisplace` / `fb0_ydisplace`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Displacement {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplaceBias {
    pub x_bias: f32,
    pub y_bias: f32,
    step: f32,
    scale: f32,
}

impl DisplaceBias {
    pub fn new(step: f32, scale: f32) -> Self {
        Self {
            x_bias: 0.0,
            y_bias: 0.0,
            step,
            scale,
        }
    }

    pub fn from_config(cfg: &KeysConfig) -> Self {
        Self::new(cfg.bias_step, cfg.displace_scale)
    }

    pub fn nudge(&mut self, n: BiasNudge) {
        match n {
            BiasNudge::XUp => self.x_bias += self.step,
            BiasNudge::XDown => self.x_bias -= self.step,
            BiasNudge::YUp => self.y_bias += self.step,
            BiasNudge::YDown => self.y_bias -= self.step,
        }
    }

    pub fn displacement(&self, params: &ParameterState) -> Displacement {
        Displacement {
            x: self.x_bias + self.scale * params.unipolar,
            y: self.y_bias + self.scale * params.bipolar,
        }
    }
}

impl Default for DisplaceBias {
    fn default() -> Self {
        Self::new(DEFAULT_BIAS_STEP, DEFAULT_DISPLACE_SCALE)
    }
}
