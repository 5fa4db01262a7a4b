//! Load shape: how many virtual clients should be running, and how fast they may issue
//!
//! This module provides:
//! - `RampProfile` for turning ramp peaks into a concurrency curve over elapsed time
//! - `RateLimiter` for the global requests-per-second ceiling shared by all clients

mod limiter;
mod ramp;

pub use limiter::RateLimiter;
pub use ramp::{DEFAULT_HOLD, DEFAULT_RISE, RampProfile, Stage};
