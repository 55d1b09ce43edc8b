//! Domain types, errors, CLI-output parsers and configuration diffing
//! shared by the Cisco ASA session and driver crates.

pub mod diff;
pub mod error;
pub mod parse;
pub mod types;
