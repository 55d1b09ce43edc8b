//! The command-level seam between the driver and a device session.

use async_trait::async_trait;

use crate::session::SessionError;

/// A device that executes CLI commands and returns their text output.
///
/// [`CliSession`](crate::session::CliSession) is the real implementation;
/// tests substitute a fake that answers from recorded output files.
#[async_trait]
pub trait CliDevice: Send {
    /// Run one command and return its output without echo or prompt.
    async fn send_command(&mut self, command: &str) -> Result<String, SessionError>;

    /// Enter privileged mode and prepare the terminal for scripting.
    async fn enable(&mut self, secret: &str) -> Result<(), SessionError>;

    /// Detect the default writable file system (e.g. `disk0:`).
    async fn autodetect_fs(&mut self) -> Result<String, SessionError>;

    /// Whether the connection is still usable.
    fn is_alive(&self) -> bool;

    /// Log out and close the connection. Safe to call more than once.
    async fn disconnect(&mut self) -> Result<(), SessionError>;
}
