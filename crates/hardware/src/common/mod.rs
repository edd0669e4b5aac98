//! Common types and constants shared across the bus model.
//!
//! This module provides the building blocks used by every other component:
//! 1. **Constants:** Bus geometry and the debug window layout.
//! 2. **Errors:** Configuration and image loading failures.

/// Bus and DSU layout constants.
pub mod constants;

/// Error types for configuration and loading.
pub mod error;

pub use constants::{BUS_DATA_BYTES, LANE_MASK};
pub use error::{ConfigError, LoadError};
