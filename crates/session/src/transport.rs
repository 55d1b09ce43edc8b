//! Byte-level transports carrying an interactive CLI.
//!
//! A [`Transport`] moves raw bytes to and from the device shell. Prompt
//! handling and command framing live one layer up in
//! [`CliSession`](crate::session::CliSession).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;

use crate::ssh::SshTransport;
use crate::telnet::TelnetTransport;

/// Default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default Telnet port.
pub const DEFAULT_TELNET_PORT: u16 = 23;

/// A bidirectional byte stream to a device shell.
#[async_trait]
pub trait Transport: Send {
    /// Write all of `data` to the device.
    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Read whatever the device has sent, waiting at most `poll`.
    ///
    /// Returns an empty buffer when nothing arrived in time.
    async fn read(&mut self, poll: Duration) -> Result<Vec<u8>, TransportError>;

    /// Whether the underlying connection is still open.
    fn is_active(&self) -> bool;

    /// Close the connection. Closing twice is a no-op.
    async fn close(&mut self) -> Result<(), TransportError>;
}

// ---------------------------------------------------------------------------
// Transport selection
// ---------------------------------------------------------------------------

/// Supported transport protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    #[default]
    Ssh,
    Telnet,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ssh => "ssh",
            Self::Telnet => "telnet",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            Self::Ssh => DEFAULT_SSH_PORT,
            Self::Telnet => DEFAULT_TELNET_PORT,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ssh" => Ok(Self::Ssh),
            "telnet" => Ok(Self::Telnet),
            other => Err(TransportError::Unsupported(other.to_string())),
        }
    }
}

/// Everything needed to open a transport to one device.
#[derive(Clone)]
pub struct ConnectParams {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub kind: TransportKind,
    /// Upper bound for connecting and for each blocking protocol step.
    pub timeout: Duration,
}

impl ConnectParams {
    /// Parameters using the default port of `kind`.
    pub fn new(
        host: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        kind: TransportKind,
        timeout: Duration,
    ) -> Self {
        Self {
            host: host.into(),
            port: kind.default_port(),
            username: username.into(),
            password: password.into(),
            kind,
            timeout,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("kind", &self.kind)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Open a transport of the requested kind.
pub async fn connect(params: &ConnectParams) -> Result<Box<dyn Transport>, TransportError> {
    tracing::debug!(
        host = %params.host,
        port = params.port,
        transport = %params.kind,
        "Opening transport",
    );

    match params.kind {
        TransportKind::Ssh => Ok(Box::new(SshTransport::connect(params).await?)),
        TransportKind::Telnet => Ok(Box::new(
            TelnetTransport::connect(&params.address(), params.timeout).await?,
        )),
    }
}

/// Errors raised by transports.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("Connection error: {0}")]
    Connect(String),

    /// The device rejected the credentials.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// An I/O error on an established connection.
    #[error("I/O error: {0}")]
    Io(String),

    /// The peer closed the connection.
    #[error("Connection closed by peer")]
    Closed,

    /// Unknown transport name.
    #[error("Unsupported transport '{0}'. Must be one of: ssh, telnet")]
    Unsupported(String),
}

impl TransportError {
    /// Whether retrying the connection could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Io(_) | Self::Closed)
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
