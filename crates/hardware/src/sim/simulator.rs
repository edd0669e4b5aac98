//! Simulator: owns the SoC and drives it tick by tick.

use tracing::{info, trace};

use crate::common::error::ConfigError;
use crate::config::Config;
use crate::core::Core;
use crate::soc::Soc;
use crate::stats::SimStats;

/// Why a run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The core reported it was finished and both adapters were idle.
    Finished,
    /// The tick limit was reached first.
    TickLimit,
}

/// Outcome of `Simulator::run`.
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Ticks executed by this run.
    pub ticks: u64,
    /// Why the run ended.
    pub reason: StopReason,
    /// Statistics captured at the end of the run.
    pub stats: SimStats,
}

/// Top-level simulator: a `Soc` plus the run limit.
#[derive(Debug)]
pub struct Simulator {
    soc: Soc,
    max_ticks: u64,
}

impl Simulator {
    /// Builds the SoC from `config` around `core`.
    ///
    /// # Errors
    ///
    /// See [`Soc::new`].
    pub fn new(config: &Config, core: Box<dyn Core>) -> Result<Self, ConfigError> {
        Ok(Self::from_soc(Soc::new(config, core)?, config.general.max_ticks))
    }

    /// Wraps an already built SoC.
    pub const fn from_soc(soc: Soc, max_ticks: u64) -> Self {
        Self { soc, max_ticks }
    }

    /// The simulated system.
    pub const fn soc(&self) -> &Soc {
        &self.soc
    }

    /// Mutable access to the simulated system (image loading, attaching peripherals).
    pub const fn soc_mut(&mut self) -> &mut Soc {
        &mut self.soc
    }

    /// Returns `true` once the core is done and no transaction is outstanding.
    pub fn finished(&self) -> bool {
        self.soc.core().finished()
            && !self.soc.data_adapter().is_busy()
            && !self.soc.instr_adapter().is_busy()
    }

    /// Advances the simulator by one clock tick.
    pub fn tick(&mut self) {
        self.soc.tick();
        trace!(tick = self.soc.ticks(), "sim tick");
    }

    /// Runs until the core finishes or `max_ticks` ticks have elapsed.
    pub fn run(&mut self) -> RunSummary {
        let mut stats = SimStats::start();
        let mut ticks = 0;
        let reason = loop {
            if self.finished() {
                break StopReason::Finished;
            }
            if ticks >= self.max_ticks {
                break StopReason::TickLimit;
            }
            self.tick();
            ticks += 1;
        };
        stats.capture(&self.soc);
        info!(ticks, ?reason, "run complete");
        RunSummary {
            ticks,
            reason,
            stats,
        }
    }
}
