//! Configuration and loading errors.
//!
//! Run-time bus conditions (unmapped access, adapter busy, response timeout) are never
//! errors: they are reported through status fields so every tick produces a defined output.
//! The types here cover the two places where failing is the right answer:
//! 1. **Configuration validation:** Overlapping windows, misaligned bases, bad tables.
//! 2. **Image loading:** Writing a binary into a slave that cannot hold it.

use std::path::PathBuf;
use thiserror::Error;

/// Reasons a bus configuration is rejected before the SoC is built.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Two enabled slaves decode at least one common address.
    #[error("slave windows '{first}' and '{second}' overlap")]
    Overlap {
        /// Name of the slave listed first.
        first: String,
        /// Name of the slave listed second.
        second: String,
    },

    /// The base address has bits set outside the decode mask.
    #[error("slave '{name}' base {base:#x} is not aligned to mask {mask:#x}")]
    MisalignedBase {
        /// Slave name.
        name: String,
        /// Configured base address.
        base: u64,
        /// Configured decode mask.
        mask: u64,
    },

    /// Only a 64-bit data bus is modelled.
    #[error("unsupported bus data width: {0} bits (only 64 is supported)")]
    UnsupportedDataWidth(u32),

    /// More masters than an 8-bit bus id can address.
    #[error("too many masters: {0}")]
    TooManyMasters(usize),

    /// More slaves than an 8-bit bus id can address.
    #[error("too many slaves: {0}")]
    TooManySlaves(usize),

    /// Two bus entries share a name.
    #[error("duplicate bus entry name '{0}'")]
    DuplicateName(String),

    /// The DSU CSR table lists the same id or name twice.
    #[error("duplicate CSR '{name}' ({id:#x}) in the debug table")]
    DuplicateCsr {
        /// CSR name.
        name: String,
        /// CSR id.
        id: u16,
    },

    /// A CSR id does not fit the 12-bit CSR address space.
    #[error("CSR '{name}' id {id:#x} is outside the 12-bit CSR space")]
    CsrOutOfRange {
        /// CSR name.
        name: String,
        /// CSR id.
        id: u16,
    },

    /// A memory slave has a size that does not fit its decode window.
    #[error("slave '{name}' size {size:#x} does not fit its window of {window:#x} bytes")]
    SizeExceedsWindow {
        /// Slave name.
        name: String,
        /// Requested backing size.
        size: u64,
        /// Window size implied by the mask.
        window: u64,
    },

    /// The DSU window cannot hold its register map.
    #[error("DSU slave '{name}' window of {window:#x} bytes is smaller than {required:#x}")]
    DsuWindowTooSmall {
        /// Slave name.
        name: String,
        /// Window size implied by the mask.
        window: u64,
        /// Size of the DSU register map.
        required: u64,
    },

    /// The registry window cannot hold the descriptor block of the whole bus.
    #[error("PnP slave '{name}' window of {window:#x} bytes is smaller than its {required:#x}-byte block")]
    PnpWindowTooSmall {
        /// Slave name.
        name: String,
        /// Window size implied by the mask.
        window: u64,
        /// Size of the rendered registry block.
        required: u64,
    },

    /// A master the SoC drives itself is missing from the master table.
    #[error("required master '{0}' is not configured")]
    MissingMaster(String),

    /// More than one debug support unit on the bus.
    #[error("only one DSU slave may be configured")]
    MultipleDsu,

    /// More than one plug-and-play registry on the bus.
    #[error("only one PnP registry slave may be configured")]
    MultiplePnp,

    /// The JSON document could not be parsed.
    #[error("invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("cannot read configuration '{path}': {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Reasons a binary image cannot be placed into a slave.
#[derive(Debug, Error)]
pub enum LoadError {
    /// No slave with this name exists.
    #[error("no slave named '{0}'")]
    UnknownSlave(String),

    /// The slave has no backing storage (e.g. the DSU).
    #[error("slave '{0}' does not accept images")]
    NotLoadable(String),

    /// Peripherals can only be attached to `External` slots.
    #[error("slave '{0}' is not an external slot")]
    NotExternal(String),

    /// An image argument is not of the form `slave:offset:path`.
    #[error("invalid image spec '{0}' (expected slave:offset:path)")]
    InvalidSpec(String),

    /// The image file could not be read.
    #[error("cannot read image '{path}': {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The image does not fit at the requested offset.
    #[error("image of {len} bytes at offset {offset:#x} exceeds '{name}' ({size} bytes)")]
    TooLarge {
        /// Slave name.
        name: String,
        /// Offset inside the slave.
        offset: u64,
        /// Image length.
        len: usize,
        /// Slave backing size.
        size: usize,
    },
}
