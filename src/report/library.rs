use super::{banner, footer, heavy_rule, section};
use crate::core::{LibraryUsage, MediaItem, MediaKind, ServerInfo};
use crate::sources::LocalMachine;
use crate::utils::{format_bytes, format_count};
use std::collections::BTreeMap;
use std::fmt;

/// Index of available libraries, shown when no library is selected.
pub struct LibrariesView<'a> {
    pub libraries: &'a [LibraryUsage],
}

impl fmt::Display for LibrariesView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        banner(f, "AVAILABLE PLEX LIBRARIES")?;
        for usage in self.libraries {
            writeln!(f)?;
            writeln!(f, "{}", usage.section.title)?;
            writeln!(f, "  Type: {}", usage.section.library_type.as_str())?;
            writeln!(f, "  Items: {}", format_count(usage.items_count))?;
        }
        writeln!(f)?;
        heavy_rule(f)?;
        writeln!(f)?;
        writeln!(f, "To analyze a library, run:")?;
        writeln!(f, "  plex-info --library \"Library Name\"")?;
        writeln!(f)?;
        writeln!(f, "Examples:")?;
        writeln!(f, "  plex-info --library \"Movies\"")?;
        writeln!(f, "  plex-info --library \"TV Shows\" --list-missing")?;
        writeln!(f, "  plex-info --system")?;
        writeln!(f)
    }
}

/// Per-item listing with subtitle details.
pub struct ListingView<'a> {
    pub items: &'a [MediaItem],
}

impl fmt::Display for ListingView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let with_subs = self.items.iter().filter(|i| i.has_subtitles()).count();

        banner(f, "LIBRARY ITEMS WITH SUBTITLE DETAILS")?;
        writeln!(f, "Total items: {}", self.items.len())?;
        writeln!(f, "Items with subtitles: {}", with_subs)?;
        writeln!(f, "Items without subtitles: {}", self.items.len() - with_subs)?;
        heavy_rule(f)?;

        let movies: Vec<&MediaItem> = self
            .items
            .iter()
            .filter(|i| i.kind == MediaKind::Movie)
            .collect();
        let episodes: Vec<&MediaItem> = self
            .items
            .iter()
            .filter(|i| i.kind == MediaKind::Episode)
            .collect();

        if !movies.is_empty() {
            writeln!(f)?;
            writeln!(f, "MOVIES ({} items)", movies.len())?;
            super::light_rule(f)?;
            for (idx, item) in movies.iter().enumerate() {
                writeln!(f)?;
                writeln!(f, "{}. {}", idx + 1, item.title)?;
                item_details(f, item, "   ")?;
            }
        }

        if !episodes.is_empty() {
            writeln!(f)?;
            writeln!(f)?;
            writeln!(f, "TV EPISODES ({} items)", episodes.len())?;
            super::light_rule(f)?;

            let mut shows: BTreeMap<&str, Vec<&MediaItem>> = BTreeMap::new();
            for episode in episodes {
                shows.entry(episode.base_title()).or_default().push(episode);
            }
            for (show, mut eps) in shows {
                eps.sort_by(|a, b| a.title.cmp(&b.title));
                writeln!(f)?;
                writeln!(f, "{} ({} episodes)", show, eps.len())?;
                for ep in eps {
                    writeln!(f)?;
                    writeln!(f, "  {}", ep.title)?;
                    item_details(f, ep, "    ")?;
                }
            }
        }

        footer(f)
    }
}

fn item_details(f: &mut fmt::Formatter<'_>, item: &MediaItem, indent: &str) -> fmt::Result {
    writeln!(f, "{}Rating Key: {}", indent, item.rating_key)?;
    writeln!(
        f,
        "{}File Path: {}",
        indent,
        item.file_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    )?;
    if let Some(url) = &item.web_url {
        writeln!(f, "{}URL: {}", indent, url)?;
    }
    let size = if item.size_bytes > 0 {
        format_bytes(item.size_bytes)
    } else {
        "Unknown".to_string()
    };
    writeln!(f, "{}File Size: {}", indent, size)?;
    writeln!(
        f,
        "{}Quality: {} | Video: {} | Audio: {}",
        indent, item.resolution, item.video_codec, item.audio_codec
    )?;
    writeln!(
        f,
        "{}Watched: {} (Views: {})",
        indent,
        if item.watched() { "✓ Yes" } else { "✗ No" },
        item.view_count
    )?;
    if let Some(last) = item.last_viewed_at {
        writeln!(f, "{}Last Viewed: {}", indent, last.format("%Y-%m-%d %H:%M:%S"))?;
    }

    if !item.has_subtitles() {
        return writeln!(f, "{}Subtitles: NO", indent);
    }

    writeln!(f, "{}Subtitles: YES", indent)?;
    writeln!(
        f,
        "{}Languages: {}",
        indent,
        item.subtitle_languages().join(", ").to_uppercase()
    )?;
    writeln!(f, "{}Streams:", indent)?;
    for stream in &item.subtitle_streams {
        writeln!(
            f,
            "{}  • {} ({}) - {}{}{}{}",
            indent,
            stream.language,
            stream.language_code.to_uppercase(),
            stream.format,
            stream
                .title
                .as_deref()
                .map(|t| format!(" - {}", t))
                .unwrap_or_default(),
            if stream.forced { " [FORCED]" } else { "" },
            if stream.external { " [EXTERNAL]" } else { " [EMBEDDED]" },
        )?;
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SystemInfo {
    pub server: ServerInfo,
    pub libraries: Vec<LibraryUsage>,
    pub local: LocalMachine,
}

pub struct SystemView<'a> {
    pub info: &'a SystemInfo,
}

impl fmt::Display for SystemView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = self.info;
        let na = |v: &Option<String>| v.clone().unwrap_or_else(|| "N/A".to_string());

        banner(f, "PLEX SERVER INFORMATION")?;

        section(f, "REMOTE PLEX SERVER")?;
        writeln!(f, "Server Name: {}", info.server.friendly_name)?;
        writeln!(f, "Version: {}", na(&info.server.version))?;
        writeln!(
            f,
            "Platform: {} {}",
            na(&info.server.platform),
            info.server.platform_version.as_deref().unwrap_or("")
        )?;
        writeln!(f, "Machine ID: {}", na(&info.server.machine_identifier))?;

        if !info.libraries.is_empty() {
            section(f, "PLEX LIBRARIES (on remote server)")?;
            for usage in &info.libraries {
                let noun = usage.section.library_type.item_noun();
                let mut label = noun.to_string();
                if let Some(first) = label.get_mut(0..1) {
                    first.make_ascii_uppercase();
                }
                writeln!(f)?;
                writeln!(
                    f,
                    "{} ({})",
                    usage.section.title,
                    usage.section.library_type.as_str()
                )?;
                writeln!(f, "  {}: {}", label, format_count(usage.items_count))?;
                writeln!(f, "  Total Size: {}", format_bytes(usage.total_size))?;
            }

            writeln!(f)?;
            writeln!(f, "Total across all libraries:")?;
            writeln!(
                f,
                "  Items: {}",
                format_count(info.libraries.iter().map(|l| l.items_count).sum())
            )?;
            writeln!(
                f,
                "  Size: {}",
                format_bytes(info.libraries.iter().map(|l| l.total_size).sum())
            )?;
        }

        local_machine(f, &info.local)?;

        writeln!(f)?;
        heavy_rule(f)?;
        writeln!(f, "NOTE: System stats (CPU, RAM, Disk) shown above are for the LOCAL")?;
        writeln!(f, "machine running this tool, NOT the remote Plex server.")?;
        writeln!(f, "Plex API does not expose remote server hardware information.")?;
        heavy_rule(f)?;
        writeln!(f)
    }
}

fn local_machine(f: &mut fmt::Formatter<'_>, local: &LocalMachine) -> fmt::Result {
    section(f, "LOCAL CLIENT MACHINE (where this tool is running)")?;
    writeln!(f, "Hostname: {}", local.hostname)?;
    writeln!(f, "OS: {} {}", local.os, local.os_version)?;
    writeln!(f, "Architecture: {}", local.architecture)?;

    let cpu = &local.cpu;
    writeln!(f)?;
    writeln!(f, "CPU:")?;
    if let Some(brand) = &cpu.brand {
        writeln!(f, "  Model: {}", brand)?;
    }
    let physical = cpu
        .physical_cores
        .map(|n| n.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    writeln!(f, "  Physical Cores: {}", physical)?;
    writeln!(f, "  Logical Cores: {}", cpu.logical_cores)?;
    writeln!(f, "  Usage: {:.1}%", cpu.usage_percent)?;
    if !cpu.per_core_percent.is_empty() {
        let per_core: Vec<String> = cpu
            .per_core_percent
            .iter()
            .map(|p| format!("{:.1}%", p))
            .collect();
        writeln!(f, "  Per Core: {}", per_core.join(", "))?;
    }
    if let Some(mhz) = cpu.frequency_mhz {
        writeln!(f, "  Frequency: {:.2} MHz", mhz as f64)?;
    }

    let memory = &local.memory;
    writeln!(f)?;
    writeln!(f, "Memory:")?;
    writeln!(f, "  Total: {}", format_bytes(memory.total))?;
    writeln!(f, "  Available: {}", format_bytes(memory.available))?;
    writeln!(f, "  Used: {} ({:.1}%)", format_bytes(memory.used), memory.percent())?;
    writeln!(f)?;
    writeln!(f, "Swap:")?;
    writeln!(f, "  Total: {}", format_bytes(memory.swap_total))?;
    let swap_used = format_bytes(memory.swap_used);
    writeln!(f, "  Used: {} ({:.1}%)", swap_used, memory.swap_percent())?;

    if !local.disks.is_empty() {
        writeln!(f)?;
        writeln!(f, "Disks:")?;
        for disk in &local.disks {
            writeln!(f)?;
            writeln!(f, "  {} ({})", disk.mount_point.display(), disk.device)?;
            writeln!(f, "    Filesystem: {}", disk.file_system)?;
            writeln!(f, "    Total: {}", format_bytes(disk.total))?;
            writeln!(f, "    Used: {} ({:.1}%)", format_bytes(disk.used()), disk.percent())?;
            writeln!(f, "    Free: {}", format_bytes(disk.available))?;
        }
    }

    if !local.interfaces.is_empty() {
        writeln!(f)?;
        writeln!(f, "Network Interfaces:")?;
        for iface in &local.interfaces {
            let netmask = iface.netmask();
            writeln!(f, "  {}: {} (netmask {})", iface.name, iface.address, netmask)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregator::tests::item;
    use crate::core::{LibrarySection, LibraryType, Resolution};
    use crate::sources::host::{CpuInfo, DiskUsage, MemoryInfo, NetworkInterface};
    use std::net::Ipv4Addr;

    #[test]
    fn test_listing_groups_episodes_by_show() {
        let movie = item("1", Resolution::Hd1080, "H264");
        let mut ep2 = item("3", Resolution::Hd720, "H264");
        ep2.kind = MediaKind::Episode;
        ep2.show_title = Some("Lost".to_string());
        ep2.title = "Lost - S01E02 - Tabula Rasa".to_string();
        ep2.subtitle_streams.clear();
        let mut ep1 = ep2.clone();
        ep1.rating_key = "2".to_string();
        ep1.title = "Lost - S01E01 - Pilot".to_string();

        let items = vec![movie, ep2, ep1];
        let text = ListingView { items: &items }.to_string();

        assert!(
            text.contains("Total items: 3\nItems with subtitles: 1\nItems without subtitles: 2\n")
        );
        assert!(text.contains("MOVIES (1 items)"));
        assert!(text.contains("1. Movie 1\n   Rating Key: 1\n   File Path: Unknown\n"));
        assert!(text.contains("   Languages: EN\n"));
        assert!(text.contains("     • English (EN) - srt [EXTERNAL]\n"));
        assert!(text.contains("TV EPISODES (2 items)"));
        assert!(text.contains("Lost (2 episodes)"));
        let pilot = text.find("Lost - S01E01 - Pilot").unwrap();
        let second = text.find("Lost - S01E02 - Tabula Rasa").unwrap();
        assert!(pilot < second);
        assert!(text.contains("    Subtitles: NO\n"));
    }

    #[test]
    fn test_empty_listing() {
        let text = ListingView { items: &[] }.to_string();
        assert!(
            text.contains("Total items: 0\nItems with subtitles: 0\nItems without subtitles: 0\n")
        );
        assert!(!text.contains("MOVIES"));
    }

    #[test]
    fn test_system_totals() {
        let usage = |title: &str, library_type, items, size| LibraryUsage {
            section: LibrarySection {
                key: title.to_string(),
                title: title.to_string(),
                library_type,
            },
            items_count: items,
            total_size: size,
        };
        let info = SystemInfo {
            server: ServerInfo {
                friendly_name: "nas".to_string(),
                version: Some("1.40.0".to_string()),
                ..Default::default()
            },
            libraries: vec![
                usage("Movies", LibraryType::Movie, 1200, 1024 * 1024),
                usage("TV Shows", LibraryType::Show, 800, 1024 * 1024),
            ],
            local: LocalMachine {
                hostname: "laptop".to_string(),
                ..Default::default()
            },
        };
        let text = SystemView { info: &info }.to_string();

        assert!(text.contains("Server Name: nas\nVersion: 1.40.0\n"));
        assert!(text.contains("Machine ID: N/A\n"));
        assert!(text.contains("Movies (movie)\n  Movies: 1,200\n"));
        assert!(text.contains("TV Shows (show)\n  Episodes: 800\n"));
        assert!(text.contains("  Items: 2,000\n  Size: 2.00 MB\n"));
        assert!(text.contains("Hostname: laptop\n"));
        assert!(!text.contains("Disks:"));
        assert!(!text.contains("Network Interfaces:"));
    }

    #[test]
    fn test_system_local_machine_details() {
        let gib = 1024 * 1024 * 1024;
        let info = SystemInfo {
            server: ServerInfo {
                friendly_name: "nas".to_string(),
                ..Default::default()
            },
            libraries: Vec::new(),
            local: LocalMachine {
                hostname: "laptop".to_string(),
                os: "Ubuntu".to_string(),
                os_version: "24.04".to_string(),
                architecture: "x86_64".to_string(),
                cpu: CpuInfo {
                    brand: Some("AMD Ryzen 7 5800X".to_string()),
                    physical_cores: Some(2),
                    logical_cores: 4,
                    usage_percent: 12.5,
                    per_core_percent: vec![10.0, 20.0, 5.0, 15.0],
                    frequency_mhz: Some(3800),
                },
                memory: MemoryInfo {
                    total: 16 * gib,
                    available: 12 * gib,
                    used: 4 * gib,
                    swap_total: 2 * gib,
                    swap_used: 0,
                },
                disks: vec![DiskUsage {
                    device: "/dev/nvme0n1p2".to_string(),
                    mount_point: "/".into(),
                    file_system: "ext4".to_string(),
                    total: 100 * gib,
                    available: 40 * gib,
                }],
                interfaces: vec![NetworkInterface {
                    name: "eth0".to_string(),
                    address: Ipv4Addr::new(192, 168, 1, 20),
                    prefix: 24,
                }],
            },
        };
        let text = SystemView { info: &info }.to_string();

        assert!(text.contains("Hostname: laptop\nOS: Ubuntu 24.04\nArchitecture: x86_64\n"));
        assert!(text.contains("  Model: AMD Ryzen 7 5800X\n"));
        assert!(text.contains("  Physical Cores: 2\n  Logical Cores: 4\n  Usage: 12.5%\n"));
        assert!(text.contains("  Per Core: 10.0%, 20.0%, 5.0%, 15.0%\n"));
        assert!(text.contains("  Frequency: 3800.00 MHz\n"));
        assert!(text.contains("  Total: 16.00 GB\n  Available: 12.00 GB\n"));
        assert!(text.contains("  Used: 4.00 GB (25.0%)\n"));
        assert!(text.contains("Swap:\n  Total: 2.00 GB\n  Used: 0.00 B (0.0%)\n"));
        assert!(text.contains("  / (/dev/nvme0n1p2)\n    Filesystem: ext4\n"));
        assert!(text.contains("    Used: 60.00 GB (60.0%)\n    Free: 40.00 GB\n"));
        assert!(text.contains("  eth0: 192.168.1.20 (netmask 255.255.255.0)\n"));
        assert!(text.contains("NOT the remote Plex server."));
    }
}
