//! Simulation statistics collection and reporting.
//!
//! This module summarises a run of the bus model. It provides:
//! 1. **Summary:** Ticks, core steps, host time and simulated frequency.
//! 2. **Bus:** Per-master read/write utilization with percentages, contention waits and
//!    unmapped accesses.
//! 3. **Adapters:** Accepted, completed, rejected, misaligned and timed-out requests per
//!    CPU channel.
//! 4. **Debug:** Soft resets asserted through the DSU.

use std::fmt::{self, Write as _};
use std::time::Instant;

use crate::core::adapter::AdapterStats;
use crate::soc::Soc;

/// Section names for selective stats output.
///
/// Valid section identifiers: `"summary"`, `"bus"`, `"adapter"`, `"debug"`.
/// Pass an empty slice to `print_sections` to print all sections.
pub const STATS_SECTIONS: &[&str] = &["summary", "bus", "adapter", "debug"];

/// Utilization of one bus master.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MasterStats {
    /// Master name.
    pub name: String,
    /// Ticks holding a read grant.
    pub read_ticks: u64,
    /// Ticks holding a write grant.
    pub write_ticks: u64,
}

/// Statistics of one run, captured from a `Soc`.
#[derive(Clone, Debug)]
pub struct SimStats {
    start_time: Instant,
    /// Total ticks elapsed.
    pub ticks: u64,
    /// Steps retired by the core.
    pub steps: u64,
    /// Per-master utilization in bus-id order.
    pub masters: Vec<MasterStats>,
    /// Requests that lost arbitration for one tick.
    pub contention_waits: u64,
    /// Unmapped accesses.
    pub misses: u64,
    /// Last unmapped address, if any access missed.
    pub miss_addr: Option<u64>,
    /// Data-channel adapter counters.
    pub data: AdapterStats,
    /// Instruction-channel adapter counters.
    pub instr: AdapterStats,
    /// Soft resets asserted through the DSU.
    pub soft_resets: u64,
}

impl Default for SimStats {
    fn default() -> Self {
        Self {
            start_time: Instant::now(),
            ticks: 0,
            steps: 0,
            masters: Vec::new(),
            contention_waits: 0,
            misses: 0,
            miss_addr: None,
            data: AdapterStats::default(),
            instr: AdapterStats::default(),
            soft_resets: 0,
        }
    }
}

impl SimStats {
    /// Starts the host-time clock for a run.
    pub fn start() -> Self {
        Self::default()
    }

    /// Captures the counters of `soc`, keeping this run's start time.
    pub fn capture(&mut self, soc: &Soc) {
        let diag = soc.diagnostics();
        self.ticks = soc.ticks();
        self.steps = soc.core().steps();
        self.masters = soc
            .map()
            .masters()
            .iter()
            .zip(&diag.utilization)
            .map(|(m, u)| MasterStats {
                name: m.name.clone(),
                read_ticks: u.read_ticks,
                write_ticks: u.write_ticks,
            })
            .collect();
        self.contention_waits = diag.contention_waits;
        self.misses = diag.miss_count;
        self.miss_addr = diag.miss.then_some(diag.miss_addr);
        self.data = *soc.data_adapter().stats();
        self.instr = *soc.instr_adapter().stats();
        self.soft_resets = soc.soft_resets();
    }

    /// Renders the requested sections.
    ///
    /// # Arguments
    ///
    /// * `sections` - Section names from `STATS_SECTIONS`, or empty for all.
    pub fn render_sections(&self, sections: &[String]) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_sections(&mut out, sections);
        out
    }

    fn write_sections(&self, out: &mut String, sections: &[String]) -> fmt::Result {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let seconds = self.start_time.elapsed().as_secs_f64().max(f64::MIN_POSITIVE);
        let ticks = self.ticks.max(1) as f64;

        writeln!(out, "==========================================================")?;
        writeln!(out, "RVSOC BUS SIMULATION STATISTICS")?;
        writeln!(out, "==========================================================")?;
        if want("summary") {
            writeln!(out, "host_seconds             {seconds:.4} s")?;
            writeln!(out, "sim_ticks                {}", self.ticks)?;
            writeln!(out, "sim_freq                 {:.2} kHz", self.ticks as f64 / seconds / 1000.0)?;
            writeln!(out, "core_steps               {}", self.steps)?;
            writeln!(out, "----------------------------------------------------------")?;
        }
        if want("bus") {
            writeln!(out, "BUS UTILIZATION")?;
            for m in &self.masters {
                writeln!(
                    out,
                    "  {:<12} read: {:<10} ({:>6.2}%) | write: {:<10} ({:>6.2}%)",
                    m.name,
                    m.read_ticks,
                    m.read_ticks as f64 / ticks * 100.0,
                    m.write_ticks,
                    m.write_ticks as f64 / ticks * 100.0
                )?;
            }
            writeln!(out, "  contention.waits       {}", self.contention_waits)?;
            writeln!(out, "  unmapped.accesses      {}", self.misses)?;
            if let Some(addr) = self.miss_addr {
                writeln!(out, "  unmapped.last_addr     {addr:#010x}")?;
            }
            writeln!(out, "----------------------------------------------------------")?;
        }
        if want("adapter") {
            writeln!(out, "MEMORY ACCESS ADAPTERS")?;
            for (name, s) in [("data", &self.data), ("instr", &self.instr)] {
                writeln!(
                    out,
                    "  {name:<6} accepted: {:<8} completed: {:<8} rejected: {:<6} misaligned: {:<6} timeouts: {}",
                    s.accepted, s.completed, s.rejected, s.misaligned, s.timeouts
                )?;
            }
            writeln!(out, "----------------------------------------------------------")?;
        }
        if want("debug") {
            writeln!(out, "DEBUG")?;
            writeln!(out, "  soft_resets            {}", self.soft_resets)?;
        }
        writeln!(out, "==========================================================")
    }

    /// Prints only the requested statistics sections to stdout.
    ///
    /// Each element of `sections` should be one of `"summary"`, `"bus"`, `"adapter"` or
    /// `"debug"`. Pass an empty slice to print all sections (same as `print()`).
    pub fn print_sections(&self, sections: &[String]) {
        print!("{}", self.render_sections(sections));
    }

    /// Prints all statistics sections to stdout.
    ///
    /// Equivalent to `print_sections(&[])`.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}
