//! Normalized data returned by driver getters and configuration calls.
//!
//! Field names follow the NAPALM getter conventions so JSON output from
//! this driver lines up with other vendors' drivers.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Configuration retrieval
// ---------------------------------------------------------------------------

/// Which configuration(s) `get_config` should fetch from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigRetrieval {
    #[default]
    All,
    Running,
    Startup,
    Candidate,
}

impl ConfigRetrieval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Running => "running",
            Self::Startup => "startup",
            Self::Candidate => "candidate",
        }
    }

    /// Whether `show running-config` must be issued.
    pub fn includes_running(&self) -> bool {
        matches!(self, Self::All | Self::Running)
    }

    /// Whether `show startup-config` must be issued.
    pub fn includes_startup(&self) -> bool {
        matches!(self, Self::All | Self::Startup)
    }
}

impl fmt::Display for ConfigRetrieval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigRetrieval {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "running" => Ok(Self::Running),
            "startup" => Ok(Self::Startup),
            "candidate" => Ok(Self::Candidate),
            other => Err(CoreError::Validation(format!(
                "Invalid retrieve value '{other}'. Must be one of: all, running, startup, candidate"
            ))),
        }
    }
}

/// Startup, running and candidate configuration text.
///
/// The ASA has no device-side candidate configuration, so `candidate`
/// is always empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigSet {
    pub startup: String,
    pub running: String,
    pub candidate: String,
}

// ---------------------------------------------------------------------------
// Candidate configuration
// ---------------------------------------------------------------------------

/// How a loaded candidate is meant to be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    /// Candidate is the complete desired configuration.
    Replace,
    /// Candidate holds lines to be added on top of the running config.
    Merge,
}

/// Candidate configuration held in driver memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub kind: CandidateKind,
    pub text: String,
}

impl Candidate {
    pub fn new(kind: CandidateKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Lines that would be sent in configuration mode.
    ///
    /// Blank lines and `!` comment lines are skipped; trailing whitespace
    /// is removed but indentation is kept for sub-mode commands.
    pub fn config_lines(&self) -> impl Iterator<Item = &str> {
        self.text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('!'))
    }
}

// ---------------------------------------------------------------------------
// Getters
// ---------------------------------------------------------------------------

/// Basic device facts (`get_facts`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facts {
    pub hostname: String,
    pub fqdn: String,
    pub vendor: String,
    pub model: String,
    pub os_version: String,
    pub serial_number: String,
    /// Uptime in seconds.
    pub uptime: u64,
    pub interface_list: Vec<String>,
}

/// Operational state of one interface (`get_interfaces`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interface {
    /// The ASA `nameif`, empty when the interface is unnamed.
    pub nameif: String,
    pub is_up: bool,
    pub is_enabled: bool,
    pub description: String,
    pub mac_address: String,
    pub mtu: u32,
    /// Bandwidth in Mbps.
    pub speed: u64,
}

/// IPv4 addressing of one interface (`get_interfaces_ip`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceIp {
    /// Address mapped to prefix length.
    pub ipv4: BTreeMap<String, u8>,
}

pub type Interfaces = BTreeMap<String, Interface>;
pub type InterfacesIp = BTreeMap<String, InterfaceIp>;
