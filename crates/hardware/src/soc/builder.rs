//! System-on-Chip construction and top-level `Soc` type.
//!
//! This module builds the complete bus system from configuration. It performs:
//! 1. **Validation:** Freezes the configuration into one `BusMap`.
//! 2. **Slave setup:** Instantiates SRAM/ROM, the DSU, the plug-and-play registry and
//!    "none" placeholders for disabled windows and empty `External` slots.
//! 3. **Master setup:** Wires one memory access adapter per CPU channel and an optional
//!    debug-host port.
//! 4. **Lock-step tick:** Advances core, adapters, arbiter and slaves once per cycle and
//!    applies DSU writes and soft reset between ticks.

use tracing::{debug, info};

use crate::common::error::{ConfigError, LoadError};
use crate::config::{Config, SlaveKind};
use crate::core::{ChannelInputs, Core, CoreInputs, CpuResponse, Issue, MemoryAccessAdapter};
use crate::soc::devices::{DebugWrite, Dsu, NoneSlave, PnpRegistry, Slave, Sram};
use crate::soc::interconnect::{Arbiter, BusDiagnostics, Grant, MasterPort};
use crate::soc::map::BusMap;
use crate::soc::transaction::{BusRequest, BusResponse, MasterId};

/// Name of the master driven by the data-channel adapter.
pub const CPU_DATA_MASTER: &str = "cpu-data";

/// Name of the master driven by the instruction-channel adapter.
pub const CPU_INSTR_MASTER: &str = "cpu-instr";

/// Name of the master used for host accesses (optional).
pub const DEBUG_HOST_MASTER: &str = "debug-host";

/// Per-channel state carried from one tick to the next.
#[derive(Debug)]
struct Channel {
    adapter: MemoryAccessAdapter,
    response: Option<CpuResponse>,
    issue: Option<Issue>,
}

impl Channel {
    const fn new(adapter: MemoryAccessAdapter) -> Self {
        Self {
            adapter,
            response: None,
            issue: None,
        }
    }

    fn inputs(&self) -> ChannelInputs {
        ChannelInputs {
            response: self.response,
            ready: self.adapter.ready(),
            issue: self.issue,
        }
    }

    fn reset(&mut self) {
        self.adapter.reset();
        self.response = None;
        self.issue = None;
    }
}

/// Debug-host master port: one request latch and the last response.
#[derive(Debug, Default)]
struct HostPort {
    master: Option<MasterId>,
    pending: Option<BusRequest>,
    response: Option<BusResponse>,
    refused: bool,
}

/// Top-level system instance: the bus, its slaves, the core and its adapters.
pub struct Soc {
    map: BusMap,
    arbiter: Arbiter,
    core: Box<dyn Core>,
    data: Channel,
    instr: Channel,
    host: HostPort,
    response_timeout: u64,
    soft_resets: u64,
}

impl std::fmt::Debug for Soc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Soc")
            .field("arbiter", &self.arbiter)
            .field("data", &self.data)
            .field("instr", &self.instr)
            .field("host", &self.host)
            .field("soft_resets", &self.soft_resets)
            .finish_non_exhaustive()
    }
}

impl Soc {
    /// Builds a new system from configuration around `core`.
    ///
    /// # Arguments
    ///
    /// * `config` - Bus, adapter and DSU configuration.
    /// * `core` - The core driving the `cpu-data` and `cpu-instr` masters.
    ///
    /// # Returns
    ///
    /// A fully constructed `Soc`, or the configuration error that prevented it.
    ///
    /// # Errors
    ///
    /// Any validation error of the bus map, or `ConfigError::MissingMaster` when the
    /// `cpu-data` or `cpu-instr` master is not configured.
    pub fn new(config: &Config, core: Box<dyn Core>) -> Result<Self, ConfigError> {
        let map = config.validate()?;
        let master = |name: &str| {
            map.master(name)
                .map(|m| m.id)
                .ok_or_else(|| ConfigError::MissingMaster(name.to_string()))
        };
        let data_master = master(CPU_DATA_MASTER)?;
        let instr_master = master(CPU_INSTR_MASTER)?;
        let host_master = map.master(DEBUG_HOST_MASTER).map(|m| m.id);

        let slaves = map
            .slaves()
            .iter()
            .map(|s| -> Box<dyn Slave> {
                if !s.enabled {
                    return Box::new(NoneSlave::new(&s.name));
                }
                let size = usize::try_from(s.size).unwrap_or(usize::MAX);
                match s.kind {
                    SlaveKind::Sram => Box::new(Sram::new(&s.name, size)),
                    SlaveKind::Rom => Box::new(Sram::rom(&s.name, size)),
                    SlaveKind::Dsu => {
                        Box::new(Dsu::new(&s.name, map.csrs(), map.masters().len()))
                    }
                    SlaveKind::Pnp => Box::new(PnpRegistry::new(&s.name, &map)),
                    SlaveKind::External => Box::new(NoneSlave::new(&s.name)),
                }
            })
            .collect();
        let arbiter = Arbiter::new(&map, slaves);

        info!(
            masters = map.masters().len(),
            slaves = map.slaves().len(),
            policy = ?config.adapter.policy,
            "soc built"
        );

        Ok(Self {
            arbiter,
            core,
            data: Channel::new(MemoryAccessAdapter::new(data_master, &config.adapter)),
            instr: Channel::new(MemoryAccessAdapter::new(instr_master, &config.adapter)),
            host: HostPort {
                master: host_master,
                ..HostPort::default()
            },
            response_timeout: config.adapter.response_timeout,
            soft_resets: 0,
            map,
        })
    }

    /// Advances the whole system by one tick.
    ///
    /// Order within a tick: the DSU view is refreshed, the core runs on last tick's
    /// responses, the adapters latch its requests, the arbiter grants and answers, the
    /// adapters unpack the responses, and finally host writes and soft reset are applied.
    pub fn tick(&mut self) {
        let diagnostics = self.arbiter.diagnostics().clone();
        let enabled = match self.arbiter.find_dsu() {
            Some(dsu) => {
                dsu.refresh(self.core.as_ref(), &diagnostics);
                dsu.core_enabled()
            }
            None => true,
        };

        let inputs = CoreInputs {
            instr: self.instr.inputs(),
            data: self.data.inputs(),
            ext_irq: self.arbiter.irq_pending(),
            enabled,
        };
        let outputs = self.core.tick(&inputs);
        self.data.response = None;
        self.instr.response = None;
        self.data.issue = outputs.data.map(|req| self.data.adapter.issue(&req));
        self.instr.issue = outputs.instr.map(|req| self.instr.adapter.issue(&req));

        let mut requests = vec![None; self.arbiter.master_count()];
        let drive = |requests: &mut [Option<BusRequest>], id: MasterId, req: Option<BusRequest>| {
            if let Some(slot) = requests.get_mut(id.index()) {
                *slot = req;
            }
        };
        drive(&mut requests, self.data.adapter.master(), self.data.adapter.bus_request());
        drive(&mut requests, self.instr.adapter.master(), self.instr.adapter.bus_request());
        if let Some(id) = self.host.master {
            drive(&mut requests, id, self.host.pending);
        }

        let ports = self.arbiter.tick(&requests);
        let port = |id: MasterId| ports.get(id.index()).copied().unwrap_or(MasterPort::IDLE);

        self.data.response = self.data.adapter.complete(&port(self.data.adapter.master()));
        self.instr.response = self.instr.adapter.complete(&port(self.instr.adapter.master()));
        if let Some(id) = self.host.master {
            let p = port(id);
            match p.grant {
                Grant::Granted(_) => self.host.pending = None,
                Grant::Unmapped | Grant::Disabled => {
                    self.host.pending = None;
                    self.host.refused = true;
                }
                Grant::Wait | Grant::Idle => {}
            }
            if p.response.is_some() {
                self.host.response = p.response;
            }
        }

        self.apply_debug();
    }

    /// Applies queued DSU writes to the core and handles the soft reset strobe.
    fn apply_debug(&mut self) {
        let Some(dsu) = self.arbiter.find_dsu() else {
            return;
        };
        let writes = dsu.take_writes();
        let soft_reset = dsu.take_soft_reset();
        for write in writes {
            debug!(?write, "applying host write");
            match write {
                DebugWrite::Gpr { index, value } => self.core.write_gpr(index, value),
                DebugWrite::Csr { id, value } => self.core.write_csr(id, value),
                DebugWrite::Pc(pc) => self.core.set_pc(pc),
            }
        }
        if soft_reset {
            self.soft_reset();
        }
    }

    /// Resets the CPU/bus domain: core, adapters and transaction routing.
    ///
    /// Utilization counters, the miss latch and the DSU survive.
    pub fn soft_reset(&mut self) {
        info!(tick = self.arbiter.ticks(), "soft reset");
        self.core.reset();
        self.data.reset();
        self.instr.reset();
        self.arbiter.soft_reset();
        self.host.pending = None;
        self.host.response = None;
        self.soft_resets += 1;
    }

    /// Returns every component to its power-on state, diagnostics and memory included.
    pub fn reset(&mut self) {
        info!("full reset");
        self.core.reset();
        self.data.reset();
        self.instr.reset();
        self.arbiter.reset();
        self.host = HostPort {
            master: self.host.master,
            ..HostPort::default()
        };
        self.soft_resets = 0;
    }

    /// Plugs a peripheral into an `External` slot.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the slot in the bus map.
    /// * `slave` - The peripheral implementation.
    ///
    /// # Returns
    ///
    /// The implementation previously occupying the slot.
    ///
    /// # Errors
    ///
    /// `LoadError::UnknownSlave` for a name not in the map, `LoadError::NotExternal` when
    /// the slot is not of kind `External`.
    pub fn attach(&mut self, name: &str, slave: Box<dyn Slave>) -> Result<Box<dyn Slave>, LoadError> {
        let desc = self
            .map
            .slave(name)
            .ok_or_else(|| LoadError::UnknownSlave(name.to_string()))?;
        if desc.kind != SlaveKind::External {
            return Err(LoadError::NotExternal(name.to_string()));
        }
        let id = desc.id;
        info!(slot = name, slave = slave.name(), "peripheral attached");
        self.arbiter
            .replace_slave(id, slave)
            .ok_or_else(|| LoadError::UnknownSlave(name.to_string()))
    }

    /// Loads an image into a memory slave at a window-relative offset.
    ///
    /// # Errors
    ///
    /// `LoadError::UnknownSlave`, `LoadError::NotLoadable` for a slave that is not SRAM or
    /// ROM, or `LoadError::TooLarge`.
    pub fn load_image(&mut self, name: &str, offset: u64, image: &[u8]) -> Result<(), LoadError> {
        let id = self
            .map
            .slave(name)
            .map(|s| s.id)
            .ok_or_else(|| LoadError::UnknownSlave(name.to_string()))?;
        let sram = self
            .arbiter
            .slave_mut(id)
            .and_then(|s| s.as_sram_mut())
            .ok_or_else(|| LoadError::NotLoadable(name.to_string()))?;
        sram.load(offset, image)?;
        info!(slave = name, offset, len = image.len(), "image loaded");
        Ok(())
    }

    /// Drives one debug-host transaction to completion, ticking the system meanwhile.
    ///
    /// # Returns
    ///
    /// The bus response, or `None` when there is no debug-host master, the address is
    /// unmapped, a soft reset dropped the transaction, or no response arrived within the
    /// adapter timeout.
    pub fn host_access(&mut self, req: BusRequest) -> Option<BusResponse> {
        let master = self.host.master?;
        self.host.pending = Some(BusRequest { master, ..req });
        self.host.response = None;
        self.host.refused = false;
        let resets = self.soft_resets;
        for _ in 0..=self.response_timeout.saturating_add(1) {
            self.tick();
            if let Some(resp) = self.host.response.take() {
                return Some(resp);
            }
            if self.host.refused || self.soft_resets != resets {
                return None;
            }
        }
        self.host.pending = None;
        None
    }

    /// Reads a doubleword through the debug-host master.
    pub fn host_read(&mut self, addr: u64) -> Option<u64> {
        let master = self.host.master?;
        self.host_access(BusRequest::read(master, addr))
            .filter(|r| r.valid)
            .map(|r| r.data)
    }

    /// Writes a doubleword through the debug-host master; `true` when a slave accepted it.
    pub fn host_write(&mut self, addr: u64, data: u64) -> bool {
        let Some(master) = self.host.master else {
            return false;
        };
        self.host_access(BusRequest::write(master, addr, data))
            .is_some_and(|r| r.valid)
    }

    /// The validated bus map.
    pub const fn map(&self) -> &BusMap {
        &self.map
    }

    /// The arbiter.
    pub const fn arbiter(&self) -> &Arbiter {
        &self.arbiter
    }

    /// Arbiter diagnostics.
    pub const fn diagnostics(&self) -> &BusDiagnostics {
        self.arbiter.diagnostics()
    }

    /// The core.
    pub fn core(&self) -> &dyn Core {
        self.core.as_ref()
    }

    /// The data-channel adapter.
    pub const fn data_adapter(&self) -> &MemoryAccessAdapter {
        &self.data.adapter
    }

    /// The instruction-channel adapter.
    pub const fn instr_adapter(&self) -> &MemoryAccessAdapter {
        &self.instr.adapter
    }

    /// The debug support unit, if configured.
    pub fn dsu(&mut self) -> Option<&mut Dsu> {
        self.arbiter.find_dsu()
    }

    /// Soft resets seen since the last full reset.
    pub const fn soft_resets(&self) -> u64 {
        self.soft_resets
    }

    /// Ticks since the last full reset.
    pub const fn ticks(&self) -> u64 {
        self.arbiter.ticks()
    }
}
