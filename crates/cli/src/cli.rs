use std::path::PathBuf;

use clap::{Parser, Subcommand};

use asa_core::types::ConfigRetrieval;

use crate::config::DeviceConfig;

#[derive(Debug, Parser)]
#[command(name = "asa", version, about = "Query and configure Cisco ASA firewalls")]
pub struct Cli {
    #[command(flatten)]
    pub device: DeviceConfig,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print startup and/or running configuration as JSON.
    GetConfig {
        /// all, running, startup or candidate.
        #[arg(long, default_value = "all")]
        retrieve: ConfigRetrieval,
    },
    /// Diff a candidate file against the running configuration.
    Compare {
        #[arg(long)]
        file: PathBuf,
        /// Treat the file as lines to merge instead of a full replacement.
        #[arg(long)]
        merge: bool,
        /// Print changed top-level sections as JSON instead of a line diff.
        #[arg(long)]
        summary: bool,
    },
    /// Apply a merge candidate file and save it to startup configuration.
    Commit {
        #[arg(long)]
        file: PathBuf,
    },
    /// Print device facts as JSON.
    Facts,
    /// Print interface state as JSON.
    Interfaces,
    /// Print interface IPv4 addressing as JSON.
    InterfacesIp,
    /// Connect and report whether the session is usable.
    Alive,
}
