use rvsoc_core::config::{AdapterConfig, Config, MasterConfig, SlaveConfig, SlaveKind};
use rvsoc_core::core::{CpuRequest, CpuResponse, Issue, MemoryAccessAdapter, ReplayCore};
use rvsoc_core::soc::Soc;
use rvsoc_core::soc::devices::{NoneSlave, Slave, Sram};
use rvsoc_core::soc::interconnect::Arbiter;
use rvsoc_core::soc::map::BusMap;
use rvsoc_core::soc::transaction::MasterId;

/// SRAM window of the two-slave reference map.
pub const SRAM_BASE: u64 = 0x1000_0000;
pub const SRAM_MASK: u64 = 0xFFF8_0000;
pub const SRAM_SIZE: u64 = 4096;

/// GPIO window of the two-slave reference map.
pub const GPIO_BASE: u64 = 0x8000_0000;
pub const GPIO_MASK: u64 = 0xFFFF_F000;

/// Installs a test-friendly tracing subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The two-slave map: SRAM (slave 0) and an external GPIO slot (slave 1).
pub fn two_slave_config(masters: &[&str]) -> Config {
    let mut config = Config::default();
    config.bus.masters = masters
        .iter()
        .enumerate()
        .map(|(i, name)| MasterConfig::new(name, 0x500 + i as u16))
        .collect();
    config.bus.slaves = vec![
        SlaveConfig {
            size: Some(SRAM_SIZE),
            ..SlaveConfig::new("sram", SlaveKind::Sram, SRAM_BASE, SRAM_MASK, 0x73)
        },
        SlaveConfig::new("gpio", SlaveKind::External, GPIO_BASE, GPIO_MASK, 0x76),
    ];
    config
}

/// Builds an arbiter with SRAM/ROM slaves backed by memory and every other slot empty.
pub fn arbiter_for(config: &Config) -> (BusMap, Arbiter) {
    let map = config.validate().unwrap();
    let slaves = map
        .slaves()
        .iter()
        .map(|s| -> Box<dyn Slave> {
            match s.kind {
                SlaveKind::Sram => Box::new(Sram::new(&s.name, s.size as usize)),
                SlaveKind::Rom => Box::new(Sram::rom(&s.name, s.size as usize)),
                _ => Box::new(NoneSlave::new(&s.name)),
            }
        })
        .collect();
    let arbiter = Arbiter::new(&map, slaves);
    (map, arbiter)
}

/// One adapter in front of a one-master bus.
#[derive(Debug)]
pub struct AdapterBench {
    pub arbiter: Arbiter,
    pub adapter: MemoryAccessAdapter,
}

impl AdapterBench {
    pub fn new(adapter: AdapterConfig) -> Self {
        let (_, arbiter) = arbiter_for(&two_slave_config(&["cpu-data"]));
        Self {
            arbiter,
            adapter: MemoryAccessAdapter::new(MasterId(0), &adapter),
        }
    }

    /// Runs one bus tick for the adapter.
    pub fn step(&mut self) -> Option<CpuResponse> {
        let ports = self.arbiter.tick(&[self.adapter.bus_request()]);
        self.adapter.complete(&ports[0])
    }

    /// Issues `req` and ticks until its response arrives.
    pub fn run(&mut self, req: CpuRequest) -> CpuResponse {
        assert_eq!(self.adapter.issue(&req), Issue::Accepted);
        for _ in 0..1000 {
            if let Some(resp) = self.step() {
                return resp;
            }
        }
        panic!("no response for {req:?}");
    }
}

/// A default-map SoC around an idle replay core.
pub fn default_soc() -> Soc {
    Soc::new(&Config::default(), Box::new(ReplayCore::idle())).unwrap()
}

/// Base address of the DSU window in `soc`.
pub fn dsu_base(soc: &Soc) -> u64 {
    soc.map().slave("dsu").unwrap().base
}

/// Base address of the registry window in `soc`.
pub fn pnp_base(soc: &Soc) -> u64 {
    soc.map().slave("pnp").unwrap().base
}
