//! Configuration system for the bus model.
//!
//! This module defines all configuration structures used to parameterize the SoC. It provides:
//! 1. **Defaults:** A reference memory map (boot ROM, SRAM, GPIO, UART, DSU, PnP registry).
//! 2. **Structures:** Hierarchical config for general, bus, adapter and debug settings.
//! 3. **Validation:** `Config::validate` produces the single `BusMap` both the address
//!    decoder and the plug-and-play registry are generated from.
//!
//! Configuration is supplied as JSON (`Config::from_json`, `Config::load`) or built with
//! `Config::default()`. Every field has a default so partial documents are accepted.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::error::ConfigError;
use crate::soc::map::BusMap;

/// Default configuration constants.
mod defaults {
    /// Vendor id published for every built-in bus entry.
    pub const VENDOR_ID: u16 = 0x00F1;

    /// Bus data width in bits.
    pub const DATA_WIDTH_BITS: u32 = 64;

    /// Simulation stops after this many ticks unless the core finishes first.
    pub const MAX_TICKS: u64 = 100_000;

    /// Ticks the adapter waits for a response before giving up on a transaction.
    pub const RESPONSE_TIMEOUT: u64 = 64;

    /// Hardware id published at offset 0 of the registry.
    pub const HW_ID: u32 = 0x2016_0323;

    /// Firmware id published at offset 4 of the registry.
    pub const FW_ID: u32 = 0x2016_0401;

    /// Boot ROM window: 8 KiB at 0.
    pub const BOOTROM_BASE: u64 = 0x0000_0000;
    pub const BOOTROM_MASK: u64 = 0xFFFF_E000;
    pub const BOOTROM_SIZE: u64 = 8 * 1024;

    /// Internal SRAM window: 512 KiB at 0x1000_0000.
    pub const SRAM_BASE: u64 = 0x1000_0000;
    pub const SRAM_MASK: u64 = 0xFFF8_0000;
    pub const SRAM_SIZE: u64 = 512 * 1024;

    /// GPIO window, an external peripheral slot.
    pub const GPIO_BASE: u64 = 0x8000_0000;
    /// UART window, an external peripheral slot (disabled by default).
    pub const UART_BASE: u64 = 0x8000_1000;
    /// 4 KiB peripheral window mask.
    pub const PERIPH_MASK: u64 = 0xFFFF_F000;

    /// Debug support unit window: 128 KiB.
    pub const DSU_BASE: u64 = 0x8008_0000;
    pub const DSU_MASK: u64 = 0xFFFE_0000;

    /// Plug-and-play registry window: last 4 KiB of the 32-bit space.
    pub const PNP_BASE: u64 = 0xFFFF_F000;
    pub const PNP_MASK: u64 = 0xFFFF_F000;

    pub const DID_CPU_DATA: u16 = 0x0501;
    pub const DID_CPU_INSTR: u16 = 0x0502;
    pub const DID_DEBUG_HOST: u16 = 0x0505;
    pub const DID_ROM: u16 = 0x0071;
    pub const DID_SRAM: u16 = 0x0073;
    pub const DID_PNP: u16 = 0x0074;
    pub const DID_GPIO: u16 = 0x0076;
    pub const DID_UART: u16 = 0x007A;
    pub const DID_DSU: u16 = 0x0080;
}

/// What sits behind a slave window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum SlaveKind {
    /// Read/write memory with byte-masked writes.
    #[default]
    Sram,
    /// Read-only memory; bus writes are ignored, images are loaded out of band.
    Rom,
    /// Debug support unit.
    Dsu,
    /// Plug-and-play descriptor registry.
    #[serde(alias = "PNP")]
    Pnp,
    /// Slot for a peripheral attached at run time with `Soc::attach`.
    External,
}

/// How the memory access adapter treats a new request while one is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub enum OverlapPolicy {
    /// Refuse the new request and report the adapter as busy.
    #[default]
    Reject,
    /// Accept the new request and overwrite the in-flight context.
    ///
    /// The earlier response is then unpacked with the newer request's lane and width.
    Overwrite,
}

/// Root configuration structure.
///
/// # Examples
///
/// ```
/// use rvsoc_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.bus.data_width_bits, 64);
/// assert!(config.validate().is_ok());
/// ```
///
/// Partial JSON keeps the defaults for everything not mentioned:
///
/// ```
/// use rvsoc_core::config::{Config, OverlapPolicy};
///
/// let json = r#"{ "adapter": { "policy": "Overwrite" } }"#;
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.adapter.policy, OverlapPolicy::Overwrite);
/// assert_eq!(config.bus.slaves.len(), 6);
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// General simulation settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Masters, slaves and bus geometry.
    #[serde(default)]
    pub bus: BusConfig,
    /// Memory access adapter behaviour.
    #[serde(default)]
    pub adapter: AdapterConfig,
    /// Debug support unit and registry identifiers.
    #[serde(default)]
    pub dsu: DsuConfig,
}

impl Config {
    /// Parses a configuration from a JSON document.
    ///
    /// # Arguments
    ///
    /// * `json` - The JSON text.
    ///
    /// # Returns
    ///
    /// The parsed configuration. It is not validated; call [`Config::validate`].
    ///
    /// # Errors
    ///
    /// `ConfigError::Parse` when the text is not a valid configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    ///
    /// # Errors
    ///
    /// `ConfigError::Io` when the file cannot be read, `ConfigError::Parse` when it does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Validates the configuration and builds the bus map.
    ///
    /// # Returns
    ///
    /// The immutable `BusMap` that the address decoder and the plug-and-play registry
    /// are both generated from, or the first configuration error found.
    ///
    /// # Errors
    ///
    /// See [`BusMap::from_config`].
    pub fn validate(&self) -> Result<BusMap, ConfigError> {
        BusMap::from_config(self)
    }
}

/// General simulation settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Log every grant and response at trace level.
    #[serde(default)]
    pub trace: bool,
    /// Upper bound on simulated ticks for `Simulator::run`.
    #[serde(default = "GeneralConfig::default_max_ticks")]
    pub max_ticks: u64,
}

impl GeneralConfig {
    const fn default_max_ticks() -> u64 {
        defaults::MAX_TICKS
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            trace: false,
            max_ticks: defaults::MAX_TICKS,
        }
    }
}

/// Bus geometry and the master/slave tables.
///
/// Entry order defines bus ids: the first master is master 0 (highest arbitration
/// priority), the first slave is slave 0.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BusConfig {
    /// Data bus width in bits; must be 64.
    #[serde(default = "BusConfig::default_data_width")]
    pub data_width_bits: u32,
    /// Bus masters in priority order.
    #[serde(default = "BusConfig::default_masters")]
    pub masters: Vec<MasterConfig>,
    /// Bus slaves.
    #[serde(default = "BusConfig::default_slaves")]
    pub slaves: Vec<SlaveConfig>,
}

impl BusConfig {
    const fn default_data_width() -> u32 {
        defaults::DATA_WIDTH_BITS
    }

    fn default_masters() -> Vec<MasterConfig> {
        vec![
            MasterConfig::new("cpu-data", defaults::DID_CPU_DATA),
            MasterConfig::new("cpu-instr", defaults::DID_CPU_INSTR),
            MasterConfig::new("debug-host", defaults::DID_DEBUG_HOST),
        ]
    }

    fn default_slaves() -> Vec<SlaveConfig> {
        vec![
            SlaveConfig {
                size: Some(defaults::BOOTROM_SIZE),
                ..SlaveConfig::new(
                    "bootrom",
                    SlaveKind::Rom,
                    defaults::BOOTROM_BASE,
                    defaults::BOOTROM_MASK,
                    defaults::DID_ROM,
                )
            },
            SlaveConfig {
                size: Some(defaults::SRAM_SIZE),
                ..SlaveConfig::new(
                    "sram",
                    SlaveKind::Sram,
                    defaults::SRAM_BASE,
                    defaults::SRAM_MASK,
                    defaults::DID_SRAM,
                )
            },
            SlaveConfig::new(
                "gpio",
                SlaveKind::External,
                defaults::GPIO_BASE,
                defaults::PERIPH_MASK,
                defaults::DID_GPIO,
            ),
            SlaveConfig {
                enabled: false,
                ..SlaveConfig::new(
                    "uart",
                    SlaveKind::External,
                    defaults::UART_BASE,
                    defaults::PERIPH_MASK,
                    defaults::DID_UART,
                )
            },
            SlaveConfig::new(
                "dsu",
                SlaveKind::Dsu,
                defaults::DSU_BASE,
                defaults::DSU_MASK,
                defaults::DID_DSU,
            ),
            SlaveConfig::new(
                "pnp",
                SlaveKind::Pnp,
                defaults::PNP_BASE,
                defaults::PNP_MASK,
                defaults::DID_PNP,
            ),
        ]
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            data_width_bits: defaults::DATA_WIDTH_BITS,
            masters: Self::default_masters(),
            slaves: Self::default_slaves(),
        }
    }
}

/// One bus master entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MasterConfig {
    /// Unique name.
    pub name: String,
    /// Disabled masters keep their bus id but never get a grant.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Vendor identifier published in the registry.
    #[serde(default = "default_vendor")]
    pub vendor: u16,
    /// Device identifier published in the registry.
    #[serde(default)]
    pub device: u16,
}

impl MasterConfig {
    /// Creates an enabled master with the default vendor id.
    pub fn new(name: &str, device: u16) -> Self {
        Self {
            name: name.to_string(),
            enabled: true,
            vendor: defaults::VENDOR_ID,
            device,
        }
    }
}

/// One bus slave entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SlaveConfig {
    /// Unique name.
    pub name: String,
    /// What implements the window.
    #[serde(default)]
    pub kind: SlaveKind,
    /// Window base address; must have no bits set outside `mask`.
    pub base: u64,
    /// Decode mask: an address `a` hits when `a & mask == base & mask`.
    pub mask: u64,
    /// Disabled slaves are published in the registry but never decoded.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Backing size in bytes for `Sram`/`Rom`; defaults to the whole window.
    #[serde(default)]
    pub size: Option<u64>,
    /// Vendor identifier published in the registry.
    #[serde(default = "default_vendor")]
    pub vendor: u16,
    /// Device identifier published in the registry.
    #[serde(default)]
    pub device: u16,
}

impl SlaveConfig {
    /// Creates an enabled slave entry with the default vendor id.
    pub fn new(name: &str, kind: SlaveKind, base: u64, mask: u64, device: u16) -> Self {
        Self {
            name: name.to_string(),
            kind,
            base,
            mask,
            enabled: true,
            size: None,
            vendor: defaults::VENDOR_ID,
            device,
        }
    }
}

/// Memory access adapter settings.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct AdapterConfig {
    /// Behaviour when a request arrives while another is in flight.
    #[serde(default)]
    pub policy: OverlapPolicy,
    /// Ticks to wait for a response before retiring the context as timed out.
    #[serde(default = "AdapterConfig::default_timeout")]
    pub response_timeout: u64,
}

impl AdapterConfig {
    const fn default_timeout() -> u64 {
        defaults::RESPONSE_TIMEOUT
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            policy: OverlapPolicy::Reject,
            response_timeout: defaults::RESPONSE_TIMEOUT,
        }
    }
}

/// One entry of the sparse CSR table exposed by the DSU.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CsrEntry {
    /// Tool-facing CSR name.
    pub name: String,
    /// 12-bit CSR id; the DSU exposes it at `id * 8` in the CSR region.
    pub id: u16,
}

impl CsrEntry {
    fn new(name: &str, id: u16) -> Self {
        Self {
            name: name.to_string(),
            id,
        }
    }
}

/// Debug support unit settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DsuConfig {
    /// CSRs visible through the debug window. Ids outside this table read as zero.
    #[serde(default = "DsuConfig::default_csrs")]
    pub csrs: Vec<CsrEntry>,
    /// Hardware id published by the registry.
    #[serde(default = "DsuConfig::default_hw_id")]
    pub hw_id: u32,
    /// Firmware id published by the registry.
    #[serde(default = "DsuConfig::default_fw_id")]
    pub fw_id: u32,
}

impl DsuConfig {
    fn default_csrs() -> Vec<CsrEntry> {
        vec![
            CsrEntry::new("misa", 0xF10),
            CsrEntry::new("mvendorid", 0xF11),
            CsrEntry::new("marchid", 0xF12),
            CsrEntry::new("mimplementationid", 0xF13),
            CsrEntry::new("mhartid", 0xF14),
            CsrEntry::new("mstatus", 0x300),
            CsrEntry::new("mie", 0x304),
            CsrEntry::new("mtvec", 0x305),
            CsrEntry::new("mscratch", 0x340),
            CsrEntry::new("mepc", 0x341),
            CsrEntry::new("mcause", 0x342),
            CsrEntry::new("mbadaddr", 0x343),
            CsrEntry::new("mip", 0x344),
            CsrEntry::new("mtime", 0x701),
        ]
    }

    const fn default_hw_id() -> u32 {
        defaults::HW_ID
    }

    const fn default_fw_id() -> u32 {
        defaults::FW_ID
    }

    /// Looks up a CSR id by its tool-facing name.
    pub fn csr_id(&self, name: &str) -> Option<u16> {
        self.csrs.iter().find(|c| c.name == name).map(|c| c.id)
    }
}

impl Default for DsuConfig {
    fn default() -> Self {
        Self {
            csrs: Self::default_csrs(),
            hw_id: defaults::HW_ID,
            fw_id: defaults::FW_ID,
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_vendor() -> u16 {
    defaults::VENDOR_ID
}
