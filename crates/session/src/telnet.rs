//! Telnet transport.
//!
//! Used for the ASA serial console exposed by the lab VM
//! (`telnet://127.0.0.1:52001`) and for devices without SSH enabled.
//! Option negotiation is minimal: the server may echo and suppress
//! go-ahead, everything else is refused.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::transport::{Transport, TransportError};

const READ_CHUNK: usize = 4096;

// Telnet protocol bytes (RFC 854 / 857 / 858).
const IAC: u8 = 255;
const DONT: u8 = 254;
const DO: u8 = 253;
const WONT: u8 = 252;
const WILL: u8 = 251;
const SB: u8 = 250;
const SE: u8 = 240;
const OPT_ECHO: u8 = 1;
const OPT_SGA: u8 = 3;

/// Raw TCP stream with a Telnet option filter on the read side.
pub struct TelnetTransport {
    stream: Option<TcpStream>,
    filter: TelnetFilter,
}

impl TelnetTransport {
    /// Connect to `address` (`host:port`) within `timeout`.
    pub async fn connect(address: &str, timeout: Duration) -> Result<Self, TransportError> {
        let stream = tokio::time::timeout(timeout, TcpStream::connect(address))
            .await
            .map_err(|_| TransportError::Connect(format!("Timed out connecting to {address}")))?
            .map_err(|e| TransportError::Connect(format!("Failed to connect to {address}: {e}")))?;
        stream.set_nodelay(true)?;

        tracing::info!(address, "Telnet connection established");

        Ok(Self {
            stream: Some(stream),
            filter: TelnetFilter::default(),
        })
    }
}

#[async_trait]
impl Transport for TelnetTransport {
    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        stream.write_all(&encode_outgoing(data)).await?;
        Ok(())
    }

    async fn read(&mut self, poll: Duration) -> Result<Vec<u8>, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        let mut buf = [0u8; READ_CHUNK];

        let n = match tokio::time::timeout(poll, stream.read(&mut buf)).await {
            Err(_) => return Ok(Vec::new()),
            Ok(Ok(0)) => {
                self.stream = None;
                return Err(TransportError::Closed);
            }
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(e.into()),
        };

        let (data, replies) = self.filter.feed(&buf[..n]);
        if !replies.is_empty() {
            stream.write_all(&replies).await?;
        }
        Ok(data)
    }

    fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut stream) = self.stream.take() {
            stream.shutdown().await?;
        }
        Ok(())
    }
}

/// Escape IAC bytes and send bare `\n` as `\r\n`.
fn encode_outgoing(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + 2);
    let mut prev = 0u8;
    for &b in data {
        match b {
            IAC => out.extend_from_slice(&[IAC, IAC]),
            b'\n' if prev != b'\r' => out.extend_from_slice(b"\r\n"),
            _ => out.push(b),
        }
        prev = b;
    }
    out
}

// ---------------------------------------------------------------------------
// Option filter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum FilterState {
    #[default]
    Data,
    /// Previous payload byte was CR.
    Cr,
    Iac,
    Negotiate(u8),
    Sub,
    SubIac,
}

/// Streaming Telnet command filter.
///
/// State is kept between calls so sequences split across reads are
/// handled.
#[derive(Debug, Default)]
pub struct TelnetFilter {
    state: FilterState,
}

impl TelnetFilter {
    /// Strip Telnet commands from `input`.
    ///
    /// Returns the payload bytes and the negotiation replies to send back.
    pub fn feed(&mut self, input: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let mut data = Vec::with_capacity(input.len());
        let mut replies = Vec::new();

        for &b in input {
            self.state = match self.state {
                FilterState::Data => data_byte(b, &mut data),
                // CR NUL is a bare carriage return.
                FilterState::Cr if b == 0 => FilterState::Data,
                FilterState::Cr => data_byte(b, &mut data),
                FilterState::Iac => match b {
                    IAC => {
                        data.push(IAC);
                        FilterState::Data
                    }
                    DO | DONT | WILL | WONT => FilterState::Negotiate(b),
                    SB => FilterState::Sub,
                    _ => FilterState::Data,
                },
                FilterState::Negotiate(command) => {
                    if let Some(reply) = negotiate(command, b) {
                        replies.extend_from_slice(&[IAC, reply, b]);
                    }
                    FilterState::Data
                }
                FilterState::Sub => match b {
                    IAC => FilterState::SubIac,
                    _ => FilterState::Sub,
                },
                FilterState::SubIac => match b {
                    SE => FilterState::Data,
                    _ => FilterState::Sub,
                },
            };
        }

        (data, replies)
    }
}

/// Handle one byte outside any command sequence.
fn data_byte(b: u8, data: &mut Vec<u8>) -> FilterState {
    match b {
        IAC => FilterState::Iac,
        b'\r' => {
            data.push(b);
            FilterState::Cr
        }
        _ => {
            data.push(b);
            FilterState::Data
        }
    }
}

/// Reply verb for a server request, or `None` when no reply is due.
fn negotiate(command: u8, option: u8) -> Option<u8> {
    match command {
        DO if option == OPT_SGA => Some(WILL),
        DO => Some(WONT),
        WILL if option == OPT_ECHO || option == OPT_SGA => Some(DO),
        WILL => Some(DONT),
        _ => None,
    }
}
