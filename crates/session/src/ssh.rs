//! SSH transport built on libssh2.
//!
//! libssh2 is blocking, so every call is moved onto tokio's blocking
//! pool. The channel sits behind a mutex shared with those tasks.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ssh2::{Channel, Session};

use crate::transport::{ConnectParams, Transport, TransportError};

const READ_CHUNK: usize = 8192;

/// Wide terminal so long config lines are not wrapped by the device.
const PTY_COLUMNS: u32 = 511;
const PTY_ROWS: u32 = 24;
const PTY_TERM: &str = "vt100";

/// Interactive shell channel over an authenticated SSH session.
pub struct SshTransport {
    session: Session,
    channel: Arc<Mutex<Channel>>,
    timeout: Duration,
    active: bool,
}

impl SshTransport {
    /// Connect, authenticate with a password and open an interactive shell.
    pub async fn connect(params: &ConnectParams) -> Result<Self, TransportError> {
        let params = params.clone();
        let address = params.address();

        let transport = tokio::task::spawn_blocking(move || Self::connect_blocking(&params))
            .await
            .map_err(|e| TransportError::Connect(format!("SSH connect task failed: {e}")))??;

        tracing::info!(address = %address, "SSH session established");
        Ok(transport)
    }

    fn connect_blocking(params: &ConnectParams) -> Result<Self, TransportError> {
        let address = params.address();
        let socket_addr = address
            .to_socket_addrs()
            .map_err(|e| TransportError::Connect(format!("Cannot resolve {address}: {e}")))?
            .next()
            .ok_or_else(|| TransportError::Connect(format!("No address found for {address}")))?;

        let tcp = TcpStream::connect_timeout(&socket_addr, params.timeout)
            .map_err(|e| TransportError::Connect(format!("Failed to connect to {address}: {e}")))?;

        let mut session =
            Session::new().map_err(|e| TransportError::Connect(format!("SSH init failed: {e}")))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(millis(params.timeout));
        session.handshake().map_err(|e| {
            TransportError::Connect(format!("SSH handshake with {address} failed: {e}"))
        })?;

        session
            .userauth_password(&params.username, &params.password)
            .map_err(|e| TransportError::Auth(format!("{}@{address}: {e}", params.username)))?;
        if !session.authenticated() {
            return Err(TransportError::Auth(format!(
                "{}@{address}: password rejected",
                params.username
            )));
        }

        let mut channel = session
            .channel_session()
            .map_err(|e| TransportError::Connect(format!("Failed to open SSH channel: {e}")))?;
        channel
            .request_pty(PTY_TERM, None, Some((PTY_COLUMNS, PTY_ROWS, 0, 0)))
            .map_err(|e| TransportError::Connect(format!("PTY request refused: {e}")))?;
        channel
            .shell()
            .map_err(|e| TransportError::Connect(format!("Shell request refused: {e}")))?;

        Ok(Self {
            session,
            channel: Arc::new(Mutex::new(channel)),
            timeout: params.timeout,
            active: true,
        })
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if !self.active {
            return Err(TransportError::Closed);
        }
        let session = self.session.clone();
        let channel = Arc::clone(&self.channel);
        let timeout = self.timeout;
        let data = data.to_vec();

        tokio::task::spawn_blocking(move || -> Result<(), TransportError> {
            let mut channel = lock(&channel)?;
            session.set_timeout(millis(timeout));
            channel.write_all(&data)?;
            channel.flush()?;
            Ok(())
        })
        .await
        .map_err(|e| TransportError::Io(format!("SSH write task failed: {e}")))?
    }

    async fn read(&mut self, poll: Duration) -> Result<Vec<u8>, TransportError> {
        if !self.active {
            return Err(TransportError::Closed);
        }
        let session = self.session.clone();
        let channel = Arc::clone(&self.channel);

        let result = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, TransportError> {
            let mut channel = lock(&channel)?;
            session.set_timeout(millis(poll));
            let mut buf = vec![0u8; READ_CHUNK];
            match channel.read(&mut buf) {
                Ok(0) if channel.eof() => Err(TransportError::Closed),
                Ok(n) => {
                    buf.truncate(n);
                    Ok(buf)
                }
                Err(e) if is_poll_timeout(&e) => Ok(Vec::new()),
                Err(e) => Err(TransportError::Io(e.to_string())),
            }
        })
        .await
        .map_err(|e| TransportError::Io(format!("SSH read task failed: {e}")))?;

        if matches!(result, Err(TransportError::Closed)) {
            self.active = false;
        }
        result
    }

    fn is_active(&self) -> bool {
        self.active
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if !self.active {
            return Ok(());
        }
        self.active = false;

        let session = self.session.clone();
        let channel = Arc::clone(&self.channel);
        let timeout = self.timeout;

        tokio::task::spawn_blocking(move || -> Result<(), TransportError> {
            session.set_timeout(millis(timeout));
            if let Ok(mut channel) = channel.lock() {
                let _ = channel.send_eof();
                let _ = channel.close();
            }
            session
                .disconnect(None, "closed by client", None)
                .map_err(|e| TransportError::Io(format!("SSH disconnect failed: {e}")))
        })
        .await
        .map_err(|e| TransportError::Io(format!("SSH close task failed: {e}")))?
    }
}

fn lock(channel: &Mutex<Channel>) -> Result<std::sync::MutexGuard<'_, Channel>, TransportError> {
    channel
        .lock()
        .map_err(|_| TransportError::Io("SSH channel lock poisoned".into()))
}

/// libssh2 reports an expired session timeout as `TimedOut` and a
/// non-blocking miss as `WouldBlock`.
fn is_poll_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

fn millis(duration: Duration) -> u32 {
    duration.as_millis().clamp(1, u32::MAX as u128) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use crate::transport::TransportKind;

    #[test]
    fn millis_clamps() {
        assert_eq!(millis(Duration::ZERO), 1);
        assert_eq!(millis(Duration::from_secs(2)), 2_000);
        assert_eq!(millis(Duration::from_secs(u64::MAX / 1_000)), u32::MAX);
    }

    #[test]
    fn poll_timeouts_are_recognised() {
        assert!(is_poll_timeout(&io::Error::from(io::ErrorKind::TimedOut)));
        assert!(is_poll_timeout(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(!is_poll_timeout(&io::Error::from(io::ErrorKind::BrokenPipe)));
    }

    #[tokio::test]
    async fn unresolvable_host_is_connect_error() {
        let params = ConnectParams::new(
            "host.invalid",
            "admin",
            "admin",
            TransportKind::Ssh,
            Duration::from_secs(1),
        );
        assert_matches!(
            SshTransport::connect(&params).await.err(),
            Some(TransportError::Connect(_))
        );
    }
}
