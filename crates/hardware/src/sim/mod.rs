//! Simulation driver and image loading.
//!
//! Provides the run loop that ticks a `Soc` until its core finishes or a tick limit is hit,
//! and helpers for loading binary images into memory slaves.

/// Image loading into memory slaves.
pub mod loader;

/// Tick-driven run loop.
pub mod simulator;

pub use simulator::{RunSummary, Simulator, StopReason};
