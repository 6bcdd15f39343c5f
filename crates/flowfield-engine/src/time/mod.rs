//! Frame timing.
//!
//! One `FrameClock` per window; `tick()` once per presented frame yields the
//! `dt`/`elapsed` pair the simulation parameters are advanced with.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
