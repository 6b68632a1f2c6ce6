//! Video frame sources.
//!
//! The renderer only needs tightly packed RGBA8 frames of a fixed size. Camera capture
//! plugs in behind `FrameSource`; the built-in `TestPattern` keeps the feedback loop fed
//! when no capture backend is wired up.

pub trait FrameSource {
    /// Frame size in pixels. Constant for the lifetime of the source.
    fn size(&self) -> (u32, u32);

    /// Produce the frame for time `t` (seconds since start).
    ///
    /// `None` means "no new frame"; the previous upload stays bound.
    fn next_frame(&mut self, t: f32) -> Option<&[u8]>;
}

// SMPTE-ish bar colors.
const BARS: [[u8; 3]; 8] = [
    [235, 235, 235],
    [235, 235, 16],
    [16, 235, 235],
    [16, 235, 16],
    [235, 16, 235],
    [235, 16, 16],
    [16, 16, 235],
    [16, 16, 16],
];

/// Scrolling color bars with a vertical fade.
#[derive(Debug)]
pub struct TestPattern {
    width: u32,
    height: u32,
    speed: f32,
    buf: Vec<u8>,
}

impl TestPattern {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            speed: 40.0,
            buf: vec![0; (width as usize) * (height as usize) * 4],
        }
    }
}

impl FrameSource for TestPattern {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn next_frame(&mut self, t: f32) -> Option<&[u8]> {
        let w = self.width;
        let h = self.height;
        let bar_w = (w / BARS.len() as u32).max(1);
        let shift = (t.max(0.0) * self.speed) as u32;

        for y in 0..h {
            // 255 at the top down to ~128 at the bottom
            let fade = 255 - (y * 127 / h);
            for x in 0..w {
                let bar = (((x + shift) / bar_w) as usize) % BARS.len();
                let [r, g, b] = BARS[bar];
                let i = ((y * w + x) as usize) * 4;
                self.buf[i] = (r as u32 * fade / 255) as u8;
                self.buf[i + 1] = (g as u32 * fade / 255) as u8;
                self.buf[i + 2] = (b as u32 * fade / 255) as u8;
                self.buf[i + 3] = 255;
            }
        }

        Some(&self.buf)
    }
}
