//! Fixed-rate frame pacing for the render loop.
//!
//! The event loop sleeps until `next_deadline()` and asks `tick()` whether a frame is
//! due. Frames missed while the loop was busy are dropped, not replayed: a late tick
//! renders once and the schedule restarts from `now`.

use std::time::{Duration, Instant};

// Weight of the newest interval in the smoothed frame time.
const FPS_SMOOTHING: f32 = 0.1;

#[derive(Debug)]
pub struct FrameClock {
    fps: f32,
    period: Duration,
    deadline: Instant,
    frame_count: u64,
    last_render: Option<Instant>,
    smoothed: Option<Duration>,
}

impl FrameClock {
    pub fn new(fps: f32) -> Self {
        Self::with_start(fps, Instant::now())
    }

    pub fn with_start(fps: f32, now: Instant) -> Self {
        let fps = fps.max(1.0);
        let period = Duration::from_secs_f32(1.0 / fps);
        Self {
            fps,
            period,
            deadline: now + period,
            frame_count: 0,
            last_render: None,
            smoothed: None,
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn frame_duration(&self) -> Duration {
        self.period
    }

    pub fn next_deadline(&self) -> Instant {
        self.deadline
    }

    /// Smoothed render rate; 0 until two frames were rendered.
    pub fn average_fps(&self) -> f32 {
        match self.smoothed {
            Some(d) if !d.is_zero() => 1.0 / d.as_secs_f32(),
            _ => 0.0,
        }
    }

    /// `true` when a frame is due at `now`.
    pub fn tick(&mut self, now: Instant) -> bool {
        if now < self.deadline {
            return false;
        }

        self.deadline += self.period;
        if self.deadline <= now {
            self.deadline = now + self.period;
        }
        self.frame_count += 1;

        if let Some(prev) = self.last_render {
            let dt = now.saturating_duration_since(prev);
            self.smoothed = Some(match self.smoothed {
                Some(avg) => avg.mul_f32(1.0 - FPS_SMOOTHING) + dt.mul_f32(FPS_SMOOTHING),
                None => dt,
            });
        }
        self.last_render = Some(now);
        true
    }
}

/// Lets something through at most once per `period`.
#[derive(Debug)]
pub struct Throttle {
    period: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(period: Duration) -> Self {
        Self { period, last: None }
    }

    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(t) if now.saturating_duration_since(t) < self.period => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}
