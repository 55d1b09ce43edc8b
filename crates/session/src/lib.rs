//! Interactive CLI sessions to Cisco ASA devices.
//!
//! Provides SSH and Telnet transports, prompt-driven command execution
//! (enable mode, paging, context switching), file-system autodetection
//! and connection retry with exponential backoff.

pub mod device;
pub mod retry;
pub mod session;
pub mod ssh;
pub mod telnet;
pub mod transport;

pub use device::CliDevice;
pub use session::{CliSession, SessionError};
pub use transport::{ConnectParams, Transport, TransportError, TransportKind};
