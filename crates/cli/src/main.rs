//! RISC-V SoC bus model CLI.
//!
//! This binary provides a single entry point for the bus model. It performs:
//! 1. **Trace run:** Replay a memory-operation trace through the SoC and print statistics.
//! 2. **Map listing:** Print the validated bus map the decoder is built from.
//! 3. **Registry walk:** Discover the bus through the plug-and-play registry, as a host would.
//! 4. **Config dump:** Print the default configuration as JSON, ready for editing.

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rvsoc_core::config::Config;
use rvsoc_core::core::ReplayCore;
use rvsoc_core::core::replay::ReplayTrace;
use rvsoc_core::sim::loader::{self, ImageSpec};
use rvsoc_core::sim::{Simulator, StopReason};
use rvsoc_core::soc::Soc;
use rvsoc_core::soc::devices::{PnpKind, PnpTable};

#[derive(Parser, Debug)]
#[command(
    name = "rvsoc",
    author,
    version,
    about = "RISC-V SoC memory bus model",
    long_about = "Replay memory traces through a lock-step model of a shared 64-bit bus.\n\nConfiguration is JSON (see `rvsoc config`); every field has a default.\n\nExamples:\n  rvsoc run --trace trace.json\n  rvsoc run --config soc.json --trace trace.json --image bootrom:0:boot.bin\n  rvsoc pnp --config soc.json"
)]
struct Cli {
    /// Log filter used when `RUST_LOG` is unset (e.g. `info`, `rvsoc_core=debug`).
    #[arg(long, global = true, default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replay a trace until it finishes or the tick limit is reached.
    Run {
        /// JSON configuration file (defaults when omitted).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// JSON replay trace.
        #[arg(short, long)]
        trace: PathBuf,

        /// Override `general.max_ticks`.
        #[arg(long)]
        ticks: Option<u64>,

        /// Image to preload, as `slave:offset:path`. May be repeated.
        #[arg(long = "image", value_name = "SLAVE:OFFSET:PATH")]
        images: Vec<String>,

        /// Statistics sections to print (summary, bus, adapter, debug); all when omitted.
        #[arg(long, value_delimiter = ',')]
        stats: Vec<String>,
    },

    /// Print the validated bus map.
    Map {
        /// JSON configuration file (defaults when omitted).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Walk the plug-and-play registry over the bus and print what a host discovers.
    Pnp {
        /// JSON configuration file (defaults when omitted).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the default configuration as JSON.
    Config,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log);

    match cli.command {
        Commands::Run {
            config,
            trace,
            ticks,
            images,
            stats,
        } => cmd_run(config.as_deref(), &trace, ticks, &images, &stats),
        Commands::Map { config } => cmd_map(config.as_deref()),
        Commands::Pnp { config } => cmd_pnp(config.as_deref()),
        Commands::Config => cmd_config(),
    }
}

/// Installs the stderr log subscriber; `RUST_LOG` wins over `--log`.
fn init_logging(default: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Loads the configuration at `path`, or the defaults. Exits on error.
fn load_config(path: Option<&Path>) -> Config {
    let Some(path) = path else {
        return Config::default();
    };
    Config::load(path).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    })
}

/// Builds a SoC around an idle core for the inspection commands. Exits on error.
fn inspection_soc(config: &Config) -> Soc {
    Soc::new(config, Box::new(ReplayCore::idle())).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    })
}

/// Replays `trace_path`, then prints the statistics and the final register state.
///
/// Exits with code 2 when the tick limit is reached before the trace completes.
fn cmd_run(
    config: Option<&Path>,
    trace_path: &Path,
    ticks: Option<u64>,
    images: &[String],
    sections: &[String],
) {
    let mut config = load_config(config);
    if let Some(ticks) = ticks {
        config.general.max_ticks = ticks;
    }
    let trace = ReplayTrace::load(trace_path).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });

    let mut sim = Simulator::new(&config, Box::new(ReplayCore::new(trace, 0))).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });

    for arg in images {
        let loaded = arg
            .parse::<ImageSpec>()
            .and_then(|spec| loader::load_image(sim.soc_mut(), &spec).map(|n| (spec, n)));
        match loaded {
            Ok((spec, n)) => println!("[*] Loaded {n} bytes into {} at {:#x}", spec.slave, spec.offset),
            Err(e) => {
                eprintln!("Error: {e}");
                process::exit(1);
            }
        }
    }

    info!(trace = %trace_path.display(), max_ticks = config.general.max_ticks, "starting run");
    let summary = sim.run();
    match summary.reason {
        StopReason::Finished => println!("[*] Trace finished after {} ticks", summary.ticks),
        StopReason::TickLimit => println!("[!] Tick limit reached after {} ticks", summary.ticks),
    }
    println!();
    summary.stats.print_sections(sections);

    let core = sim.soc().core();
    println!("pc = {:#018x}", core.pc());
    for i in (0..32).step_by(4) {
        println!(
            "x{:<2}={:#018x} x{:<2}={:#018x} x{:<2}={:#018x} x{:<2}={:#018x}",
            i,
            core.read_gpr(i),
            i + 1,
            core.read_gpr(i + 1),
            i + 2,
            core.read_gpr(i + 2),
            i + 3,
            core.read_gpr(i + 3)
        );
    }

    if summary.reason == StopReason::TickLimit {
        process::exit(2);
    }
}

/// Prints every configured master and slave with its bus id.
fn cmd_map(config: Option<&Path>) {
    let config = load_config(config);
    let map = config.validate().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });

    println!("MASTERS");
    for m in map.masters() {
        println!(
            "  {:<3} {:<14} {:<8} vendor={:#06x} device={:#06x}",
            m.id.0,
            m.name,
            if m.enabled { "enabled" } else { "disabled" },
            m.vendor,
            m.device
        );
    }
    println!("SLAVES");
    for s in map.slaves() {
        let kind = format!("{:?}", s.kind);
        println!(
            "  {:<3} {:<14} {:<8} {:<9} base={:#010x} mask={:#010x} size={:#x}",
            s.id.0,
            s.name,
            if s.enabled { "enabled" } else { "disabled" },
            kind,
            s.base,
            s.mask,
            s.window_size()
        );
    }
}

/// Discovers the bus by reading the registry through the debug-host master.
fn cmd_pnp(config: Option<&Path>) {
    let config = load_config(config);
    let mut soc = inspection_soc(&config);
    let Some(base) = soc
        .map()
        .slaves()
        .iter()
        .find(|s| s.enabled && s.kind == rvsoc_core::config::SlaveKind::Pnp)
        .map(|s| s.base)
    else {
        eprintln!("Error: no enabled plug-and-play registry in the bus map");
        process::exit(1);
    };

    let mut failed = false;
    let mut raw = Vec::new();
    let table = PnpTable::walk(|offset| {
        let value = soc.host_read(base + offset).unwrap_or_else(|| {
            failed = true;
            0
        });
        raw.push((offset, value));
        value
    });
    if failed {
        eprintln!("Error: registry not readable through the debug-host master");
        process::exit(1);
    }

    raw.sort_unstable();
    raw.dedup();
    for (offset, value) in &raw {
        println!("{:#010x}: {value:016x}", base + offset);
    }
    println!();
    println!(
        "hw_id={:#010x} fw_id={:#010x} masters={} slaves={} data={}b addr={}b",
        table.hw_id, table.fw_id, table.masters, table.slaves, table.data_width, table.addr_width
    );
    for e in &table.entries {
        let state = if e.enabled { "" } else { " (disabled)" };
        match e.kind {
            PnpKind::Master => println!(
                "  master {:<3} vendor={:#06x} device={:#06x}{state}",
                e.bus_id, e.vendor, e.device
            ),
            PnpKind::Slave { base, mask } => println!(
                "  slave  {:<3} vendor={:#06x} device={:#06x} base={base:#010x} mask={mask:#010x}{state}",
                e.bus_id, e.vendor, e.device
            ),
        }
    }
}

/// Prints the default configuration.
fn cmd_config() {
    match serde_json::to_string_pretty(&Config::default()) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }
}
