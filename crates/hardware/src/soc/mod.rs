//! System-on-Chip (SoC) Components.
//!
//! This module organizes the components that make up the simulated bus system:
//! the transaction schema, the validated bus map with its address decoder, the
//! arbiter, the bus slaves, and the builder that assembles them around a core.

/// SoC assembly and the lock-step tick.
pub mod builder;

/// Static address decoder.
pub mod decoder;

/// Bus slave implementations.
pub mod devices;

/// Bus arbiter and diagnostics.
pub mod interconnect;

/// Validated bus map and descriptors.
pub mod map;

/// Slave trait definition.
pub mod traits;

/// Bus transaction schema.
pub mod transaction;

pub use builder::Soc;
