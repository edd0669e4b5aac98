//! Memory access adapter.
//!
//! Sits between one CPU channel and the bus and converts between the two views of memory:
//! 1. **Packing:** A byte/half/word/double access becomes a doubleword-aligned bus address,
//!    a byte mask positioned at `addr & 7` and lane-replicated write data. Any access that
//!    fits inside one doubleword is accepted, naturally aligned or not.
//! 2. **Context:** The low address bits and width of the accepted request are remembered
//!    until its response comes back.
//! 3. **Unpacking:** The returned doubleword is shifted down to the remembered lane and
//!    truncated to the remembered width.
//! 4. **Timeout:** A transaction the bus never answers (unmapped address) is retired after
//!    a configurable number of ticks with a `timed_out` response.
//!
//! Only one transaction is in flight at a time. Under `OverlapPolicy::Reject` a new request
//! while busy is refused with `Issue::Busy`; under `OverlapPolicy::Overwrite` it replaces the
//! saved context, and whichever response arrives next is unpacked with the newer lane and
//! width.

use tracing::{debug, warn};

use crate::common::constants::{BUS_DATA_BYTES, LANE_MASK};
use crate::config::{AdapterConfig, OverlapPolicy};
use crate::core::{CpuRequest, CpuResponse};
use crate::soc::interconnect::{Grant, MasterPort};
use crate::soc::transaction::{AccessWidth, BusRequest, ByteMask, Direction, MasterId};

/// Outcome of handing a request to the adapter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Issue {
    /// The request was latched and will be driven onto the bus.
    Accepted,
    /// A transaction is in flight and the policy refuses overlap.
    Busy,
    /// The access would cross a doubleword boundary; nothing was issued.
    Misaligned,
}

/// Counters kept by one adapter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AdapterStats {
    /// Requests accepted.
    pub accepted: u64,
    /// Responses delivered to the CPU (timeouts included).
    pub completed: u64,
    /// Requests refused because the adapter was busy.
    pub rejected: u64,
    /// Requests refused as misaligned.
    pub misaligned: u64,
    /// Transactions retired without a response.
    pub timeouts: u64,
    /// In-flight contexts overwritten under `OverlapPolicy::Overwrite`.
    pub overwrites: u64,
}

/// Saved state of the accepted request, needed to unpack its response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Context {
    addr: u64,
    width: AccessWidth,
    direction: Direction,
}

impl Context {
    const fn lane(&self) -> u64 {
        self.addr & LANE_MASK
    }
}

/// Width-adapting bridge for one CPU channel.
#[derive(Clone, Debug)]
pub struct MemoryAccessAdapter {
    master: MasterId,
    policy: OverlapPolicy,
    timeout: u64,
    context: Option<Context>,
    /// Request latched for the bus, not yet granted.
    pending: Option<BusRequest>,
    /// Transactions granted (or consumed as unmapped) and not yet answered.
    outstanding: u32,
    age: u64,
    next_tag: u64,
    stats: AdapterStats,
}

impl MemoryAccessAdapter {
    /// Creates an adapter driving the bus as `master`.
    pub const fn new(master: MasterId, config: &AdapterConfig) -> Self {
        Self {
            master,
            policy: config.policy,
            timeout: config.response_timeout,
            context: None,
            pending: None,
            outstanding: 0,
            age: 0,
            next_tag: 0,
            stats: AdapterStats {
                accepted: 0,
                completed: 0,
                rejected: 0,
                misaligned: 0,
                timeouts: 0,
                overwrites: 0,
            },
        }
    }

    /// Bus master this adapter drives.
    pub const fn master(&self) -> MasterId {
        self.master
    }

    /// Returns `true` while a request is latched or a transaction is unanswered.
    pub const fn is_busy(&self) -> bool {
        self.pending.is_some() || self.outstanding > 0
    }

    /// Returns `true` when `issue` would accept a request.
    pub const fn ready(&self) -> bool {
        match self.policy {
            OverlapPolicy::Reject => !self.is_busy(),
            OverlapPolicy::Overwrite => true,
        }
    }

    /// Adapter counters.
    pub const fn stats(&self) -> &AdapterStats {
        &self.stats
    }

    /// Hands a CPU access to the adapter.
    ///
    /// # Arguments
    ///
    /// * `req` - The access; it must not cross a doubleword boundary.
    ///
    /// # Returns
    ///
    /// Whether the request was latched for the bus.
    pub fn issue(&mut self, req: &CpuRequest) -> Issue {
        if (req.addr & LANE_MASK) + req.width.bytes() > BUS_DATA_BYTES {
            debug!(master = %self.master, addr = req.addr, "misaligned access refused");
            self.stats.misaligned += 1;
            return Issue::Misaligned;
        }
        if self.is_busy() {
            match self.policy {
                OverlapPolicy::Reject => {
                    warn!(master = %self.master, addr = req.addr, "adapter busy, request rejected");
                    self.stats.rejected += 1;
                    return Issue::Busy;
                }
                OverlapPolicy::Overwrite => {
                    debug!(master = %self.master, addr = req.addr, "in-flight context overwritten");
                    self.stats.overwrites += 1;
                }
            }
        }

        let tag = self.next_tag;
        self.next_tag = self.next_tag.wrapping_add(1);
        self.pending = Some(pack(self.master, req).with_tag(tag));
        self.context = Some(Context {
            addr: req.addr,
            width: req.width,
            direction: req.direction,
        });
        self.stats.accepted += 1;
        Issue::Accepted
    }

    /// Request to drive onto the bus this tick. It stays asserted until granted.
    pub const fn bus_request(&self) -> Option<BusRequest> {
        self.pending
    }

    /// Processes this tick's bus port and produces the CPU response, if one completed.
    pub fn complete(&mut self, port: &MasterPort) -> Option<CpuResponse> {
        let mut just_granted = false;
        match port.grant {
            Grant::Granted(_) | Grant::Unmapped | Grant::Disabled => {
                if self.pending.take().is_some() {
                    self.outstanding += 1;
                    self.age = 0;
                    just_granted = true;
                }
            }
            Grant::Wait | Grant::Idle => {}
        }

        if let Some(resp) = port.response {
            self.outstanding = self.outstanding.saturating_sub(1);
            self.age = 0;
            let ctx = match self.policy {
                OverlapPolicy::Overwrite => self.context,
                OverlapPolicy::Reject => self.context.take(),
            }?;
            if self.outstanding == 0 && self.pending.is_none() {
                self.context = None;
            }
            self.stats.completed += 1;
            let data = match ctx.direction {
                Direction::Read => extract(resp.data, ctx.addr, ctx.width),
                Direction::Write => 0,
            };
            return Some(CpuResponse {
                valid: resp.valid,
                addr: ctx.addr,
                data,
                timed_out: false,
            });
        }

        if self.outstanding > 0 && !just_granted {
            self.age += 1;
            if self.age >= self.timeout {
                let ctx = self.context.take();
                warn!(
                    master = %self.master,
                    addr = ctx.map_or(0, |c| c.addr),
                    ticks = self.age,
                    "response timeout"
                );
                self.outstanding = 0;
                self.age = 0;
                self.stats.timeouts += 1;
                self.stats.completed += 1;
                return Some(CpuResponse {
                    valid: false,
                    addr: ctx.map_or(0, |c| c.addr),
                    data: 0,
                    timed_out: true,
                });
            }
        }
        None
    }

    /// Clears the in-flight context and the pending request latch.
    ///
    /// Counters are kept.
    pub fn reset(&mut self) {
        self.context = None;
        self.pending = None;
        self.outstanding = 0;
        self.age = 0;
    }

    /// Returns the sub-doubleword lane of the saved context.
    pub fn saved_lane(&self) -> Option<u64> {
        self.context.map(|c| c.lane())
    }
}

/// Packs a CPU access into a bus request: aligned address, positioned mask, replicated data.
///
/// The enabled lanes always carry the value itself, so an access off its natural alignment
/// (a halfword at `addr & 7 == 1`) stores its bytes in order.
pub const fn pack(master: MasterId, req: &CpuRequest) -> BusRequest {
    let byte_mask = ByteMask::positioned(req.width, req.addr);
    let data = match req.direction {
        Direction::Write => {
            let placed = (req.data & req.width.value_mask()) << (8 * (req.addr & LANE_MASK));
            byte_mask.merge(req.width.replicate(req.data), placed)
        }
        Direction::Read => 0,
    };
    BusRequest {
        master,
        addr: req.addr & !LANE_MASK,
        direction: req.direction,
        width: req.width,
        byte_mask,
        data,
        tag: 0,
    }
}

/// Extracts a `width` value at the lane of `addr` from a returned doubleword.
#[inline(always)]
pub const fn extract(doubleword: u64, addr: u64, width: AccessWidth) -> u64 {
    (doubleword >> (8 * (addr & LANE_MASK))) & width.value_mask()
}
