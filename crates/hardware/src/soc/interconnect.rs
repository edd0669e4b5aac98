//! System interconnect: the bus arbiter.
//!
//! This module implements the shared bus between masters and slaves. Each tick it:
//! 1. **Delivers responses:** Transactions granted on the previous tick are answered and
//!    routed to their master from remembered grant state, never by re-decoding.
//! 2. **Arbitrates:** Every asserted request is decoded; each slave accepts at most one
//!    transaction per tick, lower master ids winning. Losers see `Grant::Wait` and must
//!    keep asserting.
//! 3. **Counts:** The granted master's read or write utilization counter is incremented.
//! 4. **Reports misses:** An address no enabled slave claims sets the miss flag and latches
//!    the address. The requester gets no response and must time out on its own.
//!
//! The arbiter exclusively owns the grant state and the diagnostics. Everything else reads
//! a copy through [`Arbiter::diagnostics`].

use tracing::{debug, trace, warn};

use crate::soc::decoder::AddressDecoder;
use crate::soc::devices::{Dsu, Slave};
use crate::soc::map::BusMap;
use crate::soc::transaction::{
    BusRequest, BusResponse, Direction, MasterId, SlaveId, SlaveRequest, SlaveResponse,
    Transaction,
};

/// Bus cycles a master spent holding a grant, split by direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Utilization {
    /// Ticks granted for reads.
    pub read_ticks: u64,
    /// Ticks granted for writes.
    pub write_ticks: u64,
}

impl Utilization {
    /// Total granted ticks.
    pub const fn total(&self) -> u64 {
        self.read_ticks + self.write_ticks
    }
}

/// Diagnostics owned by the arbiter and mirrored read-only by the DSU.
///
/// These survive soft reset; only a full reset clears them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BusDiagnostics {
    /// Set by the first unmapped access, stays set until full reset.
    pub miss: bool,
    /// Address of the most recent unmapped access.
    pub miss_addr: u64,
    /// Total unmapped accesses.
    pub miss_count: u64,
    /// Per-master utilization, indexed by master id.
    pub utilization: Vec<Utilization>,
    /// Requests that lost arbitration and had to wait a tick.
    pub contention_waits: u64,
}

impl BusDiagnostics {
    /// Zeroed diagnostics for `masters` masters.
    pub fn new(masters: usize) -> Self {
        Self {
            utilization: vec![Utilization::default(); masters],
            ..Self::default()
        }
    }
}

/// Outcome of a master's request for one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Grant {
    /// The master did not assert a request.
    Idle,
    /// The request was accepted; the response arrives next tick.
    Granted(SlaveId),
    /// The target slave was taken by a higher-priority master; re-assert next tick.
    Wait,
    /// No enabled slave claims the address. The request is consumed and never answered.
    Unmapped,
    /// The master is disabled in the bus map; its requests are refused.
    Disabled,
}

/// Everything a master sees on the bus for one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MasterPort {
    /// Fate of this tick's request.
    pub grant: Grant,
    /// Response to the transaction granted on the previous tick, if any.
    pub response: Option<BusResponse>,
}

impl MasterPort {
    /// No grant, no response.
    pub const IDLE: Self = Self {
        grant: Grant::Idle,
        response: None,
    };
}

/// A granted transaction waiting for delivery, with the slave's answer.
#[derive(Clone, Copy, Debug)]
struct InFlight {
    txn: Transaction,
    answer: SlaveResponse,
}

/// Fixed-priority bus arbiter.
///
/// Holds the decoder, the slave implementations (boxed for dynamic dispatch), one grant
/// slot per slave and the diagnostics counters.
pub struct Arbiter {
    decoder: AddressDecoder,
    slaves: Vec<Box<dyn Slave>>,
    master_enabled: Vec<bool>,
    in_flight: Vec<Option<InFlight>>,
    diagnostics: BusDiagnostics,
    ticks: u64,
}

impl std::fmt::Debug for Arbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arbiter")
            .field("slaves", &self.slaves.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("ticks", &self.ticks)
            .field("diagnostics", &self.diagnostics)
            .finish_non_exhaustive()
    }
}

impl Arbiter {
    /// Creates an arbiter for `map` with one slave implementation per configured slave.
    ///
    /// # Arguments
    ///
    /// * `map` - The validated bus map; its decoder is built here.
    /// * `slaves` - Slave implementations in slave-id order (`slaves.len()` must equal the
    ///   number of configured slaves; missing ones never decode, extra ones are unreachable).
    pub fn new(map: &BusMap, slaves: Vec<Box<dyn Slave>>) -> Self {
        let masters = map.masters().len();
        let in_flight = vec![None; slaves.len()];
        Self {
            decoder: map.decoder(),
            slaves,
            master_enabled: map.masters().iter().map(|m| m.enabled).collect(),
            in_flight,
            diagnostics: BusDiagnostics::new(masters),
            ticks: 0,
        }
    }

    /// Number of masters this arbiter arbitrates between.
    pub fn master_count(&self) -> usize {
        self.master_enabled.len()
    }

    /// The address decoder.
    pub const fn decoder(&self) -> &AddressDecoder {
        &self.decoder
    }

    /// Current diagnostics.
    pub const fn diagnostics(&self) -> &BusDiagnostics {
        &self.diagnostics
    }

    /// Ticks since the last full reset.
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Returns `true` when slave `id` holds a transaction awaiting delivery.
    pub fn is_busy(&self, id: SlaveId) -> bool {
        self.in_flight
            .get(id.index())
            .is_some_and(Option::is_some)
    }

    /// Advances the bus by one tick.
    ///
    /// # Arguments
    ///
    /// * `requests` - One entry per master, indexed by master id; `None` when the master
    ///   does not assert a request. Entries beyond the configured masters are ignored.
    ///
    /// # Returns
    ///
    /// One `MasterPort` per configured master.
    pub fn tick(&mut self, requests: &[Option<BusRequest>]) -> Vec<MasterPort> {
        let mut ports = vec![MasterPort::IDLE; self.master_count()];

        for slot in &mut self.in_flight {
            if let Some(InFlight { txn, answer }) = slot.take() {
                if let Some(port) = ports.get_mut(txn.master.index()) {
                    port.response = Some(BusResponse {
                        master: txn.master,
                        slave: txn.slave,
                        addr: txn.addr,
                        data: answer.data,
                        valid: answer.valid,
                        tag: txn.tag,
                    });
                }
            }
        }

        let mut taken: Vec<Option<MasterId>> = vec![None; self.slaves.len()];
        let mut granted = 0usize;
        for (m, req) in requests.iter().enumerate().take(ports.len()) {
            let Some(req) = req else {
                continue;
            };
            let master = MasterId(m as u8);
            if !self.master_enabled[m] {
                debug!(%master, "request from disabled master refused");
                ports[m].grant = Grant::Disabled;
                continue;
            }
            let Some(entry) = self.decoder.entry(req.addr).copied() else {
                self.record_miss(master, req.addr);
                ports[m].grant = Grant::Unmapped;
                continue;
            };
            let s = entry.slave.index();
            if s >= self.slaves.len() {
                self.record_miss(master, req.addr);
                ports[m].grant = Grant::Unmapped;
                continue;
            }
            if let Some(winner) = taken[s] {
                debug!(%master, %winner, slave = %entry.slave, "lost arbitration");
                self.diagnostics.contention_waits += 1;
                ports[m].grant = Grant::Wait;
                continue;
            }
            taken[s] = Some(master);

            let txn = Transaction::new(req, entry.slave);
            let answer = self.slaves[s].access(&SlaveRequest {
                offset: entry.offset(req.addr),
                direction: req.direction,
                byte_mask: req.byte_mask,
                data: req.data,
            });
            self.in_flight[s] = Some(InFlight { txn, answer });

            let util = &mut self.diagnostics.utilization[m];
            match req.direction {
                Direction::Read => util.read_ticks += 1,
                Direction::Write => util.write_ticks += 1,
            }
            debug!(
                %master,
                slave = %entry.slave,
                addr = req.addr,
                write = matches!(req.direction, Direction::Write),
                "grant"
            );
            ports[m].grant = Grant::Granted(entry.slave);
            granted += 1;
        }

        for slave in &mut self.slaves {
            slave.tick();
        }
        self.ticks += 1;
        trace!(tick = self.ticks, granted, "bus tick");
        ports
    }

    fn record_miss(&mut self, master: MasterId, addr: u64) {
        warn!(%master, addr = addr, "unmapped bus access");
        self.diagnostics.miss = true;
        self.diagnostics.miss_addr = addr;
        self.diagnostics.miss_count += 1;
    }

    /// Clears the transaction routing state (soft-reset domain).
    ///
    /// Utilization counters and the miss latch are left untouched.
    pub fn soft_reset(&mut self) {
        for slot in &mut self.in_flight {
            *slot = None;
        }
        for slave in &mut self.slaves {
            slave.soft_reset();
        }
    }

    /// Returns the whole bus to its power-on state, counters included.
    pub fn reset(&mut self) {
        for slot in &mut self.in_flight {
            *slot = None;
        }
        for slave in &mut self.slaves {
            slave.reset();
        }
        self.diagnostics = BusDiagnostics::new(self.master_count());
        self.ticks = 0;
    }

    /// Level of the OR of all slave interrupt lines.
    pub fn irq_pending(&self) -> bool {
        self.slaves.iter().any(|s| s.irq())
    }

    /// Mutable access to slave `id`.
    pub fn slave_mut(&mut self, id: SlaveId) -> Option<&mut (dyn Slave + 'static)> {
        self.slaves.get_mut(id.index()).map(|s| &mut **s)
    }

    /// Replaces the implementation behind slave `id`, returning the previous one.
    ///
    /// Any transaction in flight to the old implementation is dropped.
    pub fn replace_slave(&mut self, id: SlaveId, slave: Box<dyn Slave>) -> Option<Box<dyn Slave>> {
        let slot = self.slaves.get_mut(id.index())?;
        self.in_flight[id.index()] = None;
        Some(std::mem::replace(slot, slave))
    }

    /// Finds the debug support unit, if one is on the bus.
    pub fn find_dsu(&mut self) -> Option<&mut Dsu> {
        self.slaves.iter_mut().find_map(|s| s.as_dsu_mut())
    }
}
