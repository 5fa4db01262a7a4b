//! Virtual client pool
//!
//! This module provides:
//! - `ClientPool` reconciling the live client count with a ramp profile
//! - Per-client loop of rate grant, scenario iteration, recording and think time

mod client;
mod manager;

pub use manager::{ClientPool, ConcurrencySample, PoolReport, PoolSettings};
