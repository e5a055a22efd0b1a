//! Explicit frame loop.
//!
//! The shell (a window event loop, a test, a batch renderer) owns timing and input and
//! drives a [`Sketch`] one frame at a time through a [`FrameLoop`].

use std::time::{Duration, Instant};

use crate::error::Result;
use crate::surface::Surface;

/// Mouse and keyboard state for one frame, filled in by the shell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    pub mouse: [f32; 2],
    /// Mouse position during the previous frame.
    pub previous_mouse: [f32; 2],
    pub mouse_pressed: bool,
    pub key: Option<char>,
    pub key_pressed: bool,
}

/// Per-frame information handed to [`Sketch::draw`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameState {
    /// Zero-based index of the frame.
    pub frame: u64,
    /// Time since the previous frame, after clamping.
    pub delta: Duration,
    /// Sum of all clamped deltas.
    pub elapsed: Duration,
    pub input: InputSnapshot,
}

impl FrameState {
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }
}

/// Measures frame deltas, clamped to `min_delta..=max_delta` so a stalled frame does not make
/// animations jump.
#[derive(Debug, Clone)]
pub struct FrameClock {
    min_delta: Duration,
    max_delta: Duration,
    last: Option<Instant>,
    frame: u64,
    elapsed: Duration,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(Duration::ZERO, Duration::from_millis(100))
    }
}

impl FrameClock {
    pub fn new(min_delta: Duration, max_delta: Duration) -> Self {
        Self {
            min_delta,
            max_delta: max_delta.max(min_delta),
            last: None,
            frame: 0,
            elapsed: Duration::ZERO,
        }
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Advances to the frame starting at `now`. The first frame has a zero delta.
    pub fn tick(&mut self, now: Instant, input: InputSnapshot) -> FrameState {
        let delta = self
            .last
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last = Some(now);
        self.advance(delta, input)
    }

    /// Advances by a fixed delta, independent of wall-clock time.
    pub fn advance(&mut self, delta: Duration, input: InputSnapshot) -> FrameState {
        let delta = if self.frame == 0 && delta.is_zero() {
            delta
        } else {
            delta.clamp(self.min_delta, self.max_delta)
        };
        self.elapsed += delta;
        let state = FrameState {
            frame: self.frame,
            delta,
            elapsed: self.elapsed,
            input,
        };
        self.frame += 1;
        state
    }
}

pub trait Sketch {
    /// Runs once, inside the first frame, before the first `draw`.
    fn setup(&mut self, _surface: &mut Surface) -> Result<()> {
        Ok(())
    }

    fn draw(&mut self, surface: &mut Surface, frame: &FrameState) -> Result<()>;
}

/// Drives a sketch: runs `setup` once, then one `draw` per [`FrameLoop::step`], each wrapped
/// in `begin_draw`/`end_draw`.
#[derive(Debug, Default)]
pub struct FrameLoop {
    clock: FrameClock,
    input: InputSnapshot,
    set_up: bool,
}

impl FrameLoop {
    pub fn new(clock: FrameClock) -> Self {
        Self {
            clock,
            input: InputSnapshot::default(),
            set_up: false,
        }
    }

    pub fn clock(&self) -> &FrameClock {
        &self.clock
    }

    /// Input reported to the next frame.
    pub fn set_input(&mut self, input: InputSnapshot) {
        let previous = self.input.mouse;
        self.input = InputSnapshot {
            previous_mouse: previous,
            ..input
        };
    }

    /// Renders one frame timed by the wall clock.
    pub fn step<S: Sketch + ?Sized>(&mut self, sketch: &mut S, surface: &mut Surface) -> Result<FrameState> {
        let frame = self.clock.tick(Instant::now(), self.input.clone());
        self.render(sketch, surface, frame)
    }

    /// Renders one frame with a fixed delta.
    pub fn step_by<S: Sketch + ?Sized>(
        &mut self,
        sketch: &mut S,
        surface: &mut Surface,
        delta: Duration,
    ) -> Result<FrameState> {
        let frame = self.clock.advance(delta, self.input.clone());
        self.render(sketch, surface, frame)
    }

    fn render<S: Sketch + ?Sized>(
        &mut self,
        sketch: &mut S,
        surface: &mut Surface,
        frame: FrameState,
    ) -> Result<FrameState> {
        let first = !self.set_up;
        self.set_up = true;
        surface.draw(|s| {
            if first {
                sketch.setup(s)?;
            }
            sketch.draw(s, &frame)
        })?;
        Ok(frame)
    }
}

/// Runs `setup` and then `frames` draw calls back to back on `surface`.
pub fn run_frames<S: Sketch + ?Sized>(sketch: &mut S, surface: &mut Surface, frames: u64) -> Result<()> {
    let mut frame_loop = FrameLoop::default();
    for _ in 0..frames {
        frame_loop.step(sketch, surface)?;
    }
    Ok(())
}
