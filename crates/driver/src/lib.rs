//! Network automation driver for Cisco ASA firewalls.
//!
//! [`AsaDriver`] implements the [`NetworkDriver`] interface: session
//! management, configuration retrieval, in-memory candidate
//! configuration (load / compare / discard / commit) and read-only
//! getters normalized across vendors.

pub mod args;
pub mod asa;
pub mod driver;
pub mod error;

pub use args::OptionalArgs;
pub use asa::AsaDriver;
pub use driver::{CandidateSource, LoadOutcome, NetworkDriver};
pub use error::DriverError;
