//! Hardware and OS details of the machine running the tool.
//!
//! Plex only reports its own identity, so `--system` pairs it with what
//! `sysinfo` can see locally.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use sysinfo::{Disks, Networks, System, MINIMUM_CPU_UPDATE_INTERVAL};
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct LocalMachine {
    pub hostname: String,
    pub os: String,
    pub os_version: String,
    pub architecture: String,
    pub cpu: CpuInfo,
    pub memory: MemoryInfo,
    pub disks: Vec<DiskUsage>,
    pub interfaces: Vec<NetworkInterface>,
}

#[derive(Debug, Clone, Default)]
pub struct CpuInfo {
    pub brand: Option<String>,
    pub physical_cores: Option<usize>,
    pub logical_cores: usize,
    pub usage_percent: f32,
    pub per_core_percent: Vec<f32>,
    /// Current frequency of the first core.
    pub frequency_mhz: Option<u64>,
}

/// Byte counts for RAM and swap.
#[derive(Debug, Clone, Default)]
pub struct MemoryInfo {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub swap_total: u64,
    pub swap_used: u64,
}

impl MemoryInfo {
    pub fn percent(&self) -> f64 {
        percent(self.used, self.total)
    }

    pub fn swap_percent(&self) -> f64 {
        percent(self.swap_used, self.swap_total)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DiskUsage {
    pub device: String,
    pub mount_point: PathBuf,
    pub file_system: String,
    pub total: u64,
    pub available: u64,
}

impl DiskUsage {
    pub fn used(&self) -> u64 {
        self.total.saturating_sub(self.available)
    }

    pub fn percent(&self) -> f64 {
        percent(self.used(), self.total)
    }
}

#[derive(Debug, Clone)]
pub struct NetworkInterface {
    pub name: String,
    pub address: Ipv4Addr,
    pub prefix: u8,
}

impl NetworkInterface {
    pub fn netmask(&self) -> Ipv4Addr {
        let bits = u32::MAX
            .checked_shl(32 - u32::from(self.prefix.min(32)))
            .unwrap_or(0);
        Ipv4Addr::from(bits)
    }
}

impl LocalMachine {
    /// Samples the local machine. CPU usage needs two readings, so this waits
    /// one sysinfo update interval.
    pub async fn detect() -> Self {
        let mut system = System::new_all();
        tokio::time::sleep(MINIMUM_CPU_UPDATE_INTERVAL).await;
        system.refresh_cpu_usage();

        let cpus = system.cpus();
        let cpu = CpuInfo {
            brand: cpus
                .first()
                .map(|c| c.brand().trim().to_string())
                .filter(|b| !b.is_empty()),
            physical_cores: system.physical_core_count(),
            logical_cores: cpus.len(),
            usage_percent: system.global_cpu_usage(),
            per_core_percent: cpus.iter().map(|c| c.cpu_usage()).collect(),
            frequency_mhz: cpus.first().map(|c| c.frequency()).filter(|&f| f > 0),
        };

        let memory = MemoryInfo {
            total: system.total_memory(),
            available: system.available_memory(),
            used: system.used_memory(),
            swap_total: system.total_swap(),
            swap_used: system.used_swap(),
        };

        let disks = Disks::new_with_refreshed_list()
            .list()
            .iter()
            .map(|disk| DiskUsage {
                device: disk.name().to_string_lossy().into_owned(),
                mount_point: disk.mount_point().to_path_buf(),
                file_system: disk.file_system().to_string_lossy().into_owned(),
                total: disk.total_space(),
                available: disk.available_space(),
            })
            .collect();

        let mut interfaces: Vec<NetworkInterface> = Networks::new_with_refreshed_list()
            .list()
            .iter()
            .flat_map(|(name, data)| {
                data.ip_networks().iter().filter_map(move |net| match net.addr {
                    IpAddr::V4(address) => Some(NetworkInterface {
                        name: name.clone(),
                        address,
                        prefix: net.prefix,
                    }),
                    IpAddr::V6(_) => None,
                })
            })
            .collect();
        interfaces.sort_by(|a, b| a.name.cmp(&b.name).then(a.address.cmp(&b.address)));

        let machine = Self {
            hostname: System::host_name().unwrap_or_else(|| "N/A".to_string()),
            os: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            os_version: System::os_version().unwrap_or_default(),
            architecture: std::env::consts::ARCH.to_string(),
            cpu,
            memory,
            disks,
            interfaces,
        };
        debug!(
            "Detected {} ({} cpus, {} disks, {} IPv4 addresses)",
            machine.hostname,
            machine.cpu.logical_cores,
            machine.disks.len(),
            machine.interfaces.len()
        );
        machine
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
