//! Parsers turning ASA CLI output into normalized getter data.
//!
//! All parsers are tolerant of extra lines and `\r\n` line endings.
//! Only missing data that makes the result meaningless is reported as
//! [`CoreError::Parse`]; everything else falls back to defaults.

use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;
use crate::types::{Interface, InterfaceIp, Interfaces, InterfacesIp};

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

pub const SHOW_VERSION: &str = "show version";
pub const SHOW_INTERFACE: &str = "show interface";
pub const SHOW_DOMAIN_NAME: &str = "show running-config domain-name";

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Software Version (\S+)").expect("valid regex"));

static UPTIME_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(\S+) up ((?:\d+ \w+\s*)+)$").expect("valid regex")
});

static UPTIME_UNIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+)\s+(year|week|day|hour|minute|min|second|sec)s?\b").expect("valid regex")
});

static HARDWARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Hardware:\s+([^,\r\n]+)").expect("valid regex"));

static SERIAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Serial Number:\s*(\S+)").expect("valid regex"));

static DOMAIN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^domain-name\s+(\S+)").expect("valid regex"));

static INTERFACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^Interface (\S+) "([^"]*)", is ([a-z ]+?), line protocol is (\w+)"#)
        .expect("valid regex")
});

static BANDWIDTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"BW (\d+) (Gbps|Mbps|Kbps)").expect("valid regex"));

static DESCRIPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*Description:\s?(.*)$").expect("valid regex"));

static MAC_MTU_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"MAC address ([0-9A-Fa-f]{4}\.[0-9A-Fa-f]{4}\.[0-9A-Fa-f]{4}), MTU (\d+|not set)")
        .expect("valid regex")
});

static IP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*IP address (\d+\.\d+\.\d+\.\d+), subnet mask (\d+\.\d+\.\d+\.\d+)")
        .expect("valid regex")
});

// ---------------------------------------------------------------------------
// show version
// ---------------------------------------------------------------------------

/// Fields extracted from `show version`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionInfo {
    pub hostname: String,
    pub os_version: String,
    pub model: String,
    pub serial_number: String,
    /// Uptime in seconds.
    pub uptime: u64,
}

/// Parse `show version`.
///
/// The software version line is mandatory; hostname, model, serial and
/// uptime default to empty / zero when absent.
pub fn parse_show_version(text: &str) -> Result<VersionInfo, CoreError> {
    let os_version = VERSION_RE
        .captures(text)
        .map(|c| c[1].to_string())
        .ok_or_else(|| CoreError::Parse {
            command: SHOW_VERSION,
            reason: "software version line not found".into(),
        })?;

    let (hostname, uptime) = UPTIME_LINE_RE
        .captures(text)
        .map(|c| (c[1].to_string(), parse_uptime(&c[2])))
        .unwrap_or_default();

    let model = HARDWARE_RE
        .captures(text)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default();

    let serial_number = SERIAL_RE
        .captures(text)
        .map(|c| c[1].to_string())
        .unwrap_or_default();

    Ok(VersionInfo {
        hostname,
        os_version,
        model,
        serial_number,
        uptime,
    })
}

/// Convert an ASA uptime phrase (`1 year 2 days 3 hours 4 mins 5 secs`)
/// to seconds. Unknown words are ignored; the total saturates at `u64::MAX`.
pub fn parse_uptime(text: &str) -> u64 {
    UPTIME_UNIT_RE
        .captures_iter(text)
        .filter_map(|c| {
            let value: u64 = c[1].parse().ok()?;
            let unit = match &c[2] {
                "year" => 365 * 86_400,
                "week" => 7 * 86_400,
                "day" => 86_400,
                "hour" => 3_600,
                "minute" | "min" => 60,
                _ => 1,
            };
            Some(value.saturating_mul(unit))
        })
        .fold(0u64, u64::saturating_add)
}

// ---------------------------------------------------------------------------
// show running-config domain-name
// ---------------------------------------------------------------------------

pub fn parse_domain_name(text: &str) -> Option<String> {
    DOMAIN_RE.captures(text).map(|c| c[1].to_string())
}

// ---------------------------------------------------------------------------
// show interface
// ---------------------------------------------------------------------------

/// Parse `show interface` into per-interface operational state.
pub fn parse_show_interface(text: &str) -> Interfaces {
    interface_blocks(text)
        .into_iter()
        .map(|block| {
            let mut iface = Interface {
                nameif: block.nameif.to_string(),
                is_enabled: block.admin_state != "administratively down",
                is_up: block.admin_state == "up" && block.protocol == "up",
                ..Default::default()
            };

            for line in &block.body {
                if let Some(c) = BANDWIDTH_RE.captures(line) {
                    let value: u64 = c[1].parse().unwrap_or(0);
                    iface.speed = match &c[2] {
                        "Gbps" => value * 1_000,
                        "Kbps" => value / 1_000,
                        _ => value,
                    };
                }
                if let Some(c) = DESCRIPTION_RE.captures(line) {
                    iface.description = c[1].trim().to_string();
                }
                if let Some(c) = MAC_MTU_RE.captures(line) {
                    iface.mac_address = normalize_mac(&c[1]);
                    iface.mtu = c[2].parse().unwrap_or(0);
                }
            }

            (block.name.to_string(), iface)
        })
        .collect()
}

/// Parse IPv4 addressing from `show interface`.
///
/// Interfaces whose address is `unassigned` are omitted.
pub fn parse_interface_ips(text: &str) -> Result<InterfacesIp, CoreError> {
    let mut result = InterfacesIp::new();

    for block in interface_blocks(text) {
        let mut ips = InterfaceIp::default();
        for line in &block.body {
            if let Some(c) = IP_RE.captures(line) {
                let prefix = mask_to_prefix(&c[2])?;
                ips.ipv4.insert(c[1].to_string(), prefix);
            }
        }
        if !ips.ipv4.is_empty() {
            result.insert(block.name.to_string(), ips);
        }
    }

    Ok(result)
}

/// Convert a dotted subnet mask to a prefix length.
pub fn mask_to_prefix(mask: &str) -> Result<u8, CoreError> {
    let addr: Ipv4Addr = mask.parse().map_err(|_| CoreError::Parse {
        command: SHOW_INTERFACE,
        reason: format!("invalid subnet mask '{mask}'"),
    })?;
    let bits = u32::from(addr);
    let inverted = !bits;
    if inverted & inverted.wrapping_add(1) != 0 {
        return Err(CoreError::Parse {
            command: SHOW_INTERFACE,
            reason: format!("non-contiguous subnet mask '{mask}'"),
        });
    }
    Ok(bits.count_ones() as u8)
}

/// `5000.0001.000a` -> `50:00:00:01:00:0A`.
pub fn normalize_mac(dotted: &str) -> String {
    let hex: String = dotted.chars().filter(|c| *c != '.').collect();
    hex.as_bytes()
        .chunks(2)
        .map(|pair| String::from_utf8_lossy(pair).to_ascii_uppercase())
        .collect::<Vec<_>>()
        .join(":")
}

struct InterfaceBlock<'a> {
    name: &'a str,
    nameif: &'a str,
    admin_state: &'a str,
    protocol: &'a str,
    body: Vec<&'a str>,
}

fn interface_blocks(text: &str) -> Vec<InterfaceBlock<'_>> {
    let mut blocks: Vec<InterfaceBlock<'_>> = Vec::new();

    for line in text.lines() {
        if let Some(c) = INTERFACE_RE.captures(line) {
            let (Some(name), Some(nameif), Some(admin), Some(proto)) =
                (c.get(1), c.get(2), c.get(3), c.get(4))
            else {
                continue;
            };
            blocks.push(InterfaceBlock {
                name: name.as_str(),
                nameif: nameif.as_str(),
                admin_state: admin.as_str(),
                protocol: proto.as_str(),
                body: Vec::new(),
            });
        } else if let Some(block) = blocks.last_mut() {
            block.body.push(line);
        }
    }

    blocks
}

// ---------------------------------------------------------------------------
// Error detection
// ---------------------------------------------------------------------------

/// Whether command output reports a rejected command.
pub fn is_invalid_output(text: &str) -> bool {
    text.contains("% Invalid") || text.contains("ERROR: %")
}

/// Whether configuration-mode output reports a failure.
pub fn is_config_error(text: &str) -> bool {
    is_invalid_output(text) || text.lines().any(|l| l.trim_start().starts_with("ERROR:"))
}
