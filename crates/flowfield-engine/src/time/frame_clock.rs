use std::time::{Duration, Instant};

/// Frame timing snapshot.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, after clamping.
    pub dt: f32,

    /// Seconds since the clock started, summed from clamped deltas while
    /// running. Time spent paused is not counted.
    pub elapsed: f32,

    /// Monotonic timestamp taken at the tick.
    pub now: Instant,

    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Frame clock producing `FrameTime` snapshots.
///
/// One clock per window. Delta time is clamped so a stall (debugger, minimized
/// window) cannot hand the simulation a huge step. A paused clock keeps
/// ticking frames but reports `dt = 0` and holds `elapsed`.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    elapsed: Duration,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
    paused: bool,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    /// Creates a clock with custom delta-time clamps.
    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self {
            last: Instant::now(),
            elapsed: Duration::ZERO,
            frame_index: 0,
            dt_min,
            dt_max,
            paused: false,
        }
    }

    /// Resets the delta baseline without touching `elapsed`.
    ///
    /// Call after resuming from suspension.
    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    /// Restarts `elapsed` from zero.
    pub fn restart(&mut self) {
        self.last = Instant::now();
        self.elapsed = Duration::ZERO;
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Advances the clock and returns a new `FrameTime`.
    pub fn tick(&mut self) -> FrameTime {
        let now = Instant::now();
        let raw = now.saturating_duration_since(self.last);
        self.last = now;
        self.advance(raw, now)
    }

    fn advance(&mut self, raw: Duration, now: Instant) -> FrameTime {
        let dt = if self.paused {
            Duration::ZERO
        } else {
            raw.clamp(self.dt_min, self.dt_max)
        };
        self.elapsed += dt;

        let ft = FrameTime {
            dt: dt.as_secs_f32(),
            elapsed: self.elapsed.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };

        self.frame_index = self.frame_index.wrapping_add(1);
        ft
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}
