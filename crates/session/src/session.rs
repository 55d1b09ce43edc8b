//! Prompt-driven interactive CLI session.
//!
//! [`CliSession`] turns a raw [`Transport`] into a command/response
//! channel: it answers login prompts, learns the device prompt, enters
//! privileged mode, turns off paging, and frames each command's output
//! by waiting for the prompt to come back.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use tokio::time::Instant;

use crate::device::CliDevice;
use crate::retry::{connect_with_retry, RetryConfig};
use crate::transport::{ConnectParams, Transport, TransportError};

/// Pager stop emitted when paging is still enabled.
pub const PAGER_PROMPT: &str = "<--- More --->";

/// Command that disables paging for the current terminal session.
pub const DISABLE_PAGING: &str = "terminal pager 0";

/// How long a single transport read waits for data.
const DEFAULT_POLL: Duration = Duration::from_millis(100);

/// Upper bound on username/password exchanges before giving up.
const LOGIN_ROUNDS: usize = 4;

// `host>`, `host#`, `host/ctx#`, `host/pri/act(config-if)#`
static PROMPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][\w.\-/]*(?:\([\w.\-/ ]+\))?[>#]$").expect("valid regex")
});

static ANSI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("valid regex"));

static FILE_SYSTEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Directory of ([A-Za-z0-9]+:)").expect("valid regex"));

/// An interactive shell on one device.
pub struct CliSession {
    transport: Box<dyn Transport>,
    base_prompt: String,
    privileged: bool,
    paging_disabled: bool,
    timeout: Duration,
    poll: Duration,
    connected: bool,
}

impl CliSession {
    /// Wrap an already-open transport.
    ///
    /// `timeout` bounds how long any single command may take to return
    /// to the prompt.
    pub fn new(transport: Box<dyn Transport>, timeout: Duration) -> Self {
        Self {
            transport,
            base_prompt: String::new(),
            privileged: false,
            paging_disabled: false,
            timeout,
            poll: DEFAULT_POLL,
            connected: true,
        }
    }

    pub fn with_poll_interval(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    /// Connect (with retry), log in and learn the prompt.
    pub async fn open(params: &ConnectParams, retry: &RetryConfig) -> Result<Self, SessionError> {
        let transport = connect_with_retry(params, retry).await?;
        let mut session = Self::new(transport, params.timeout);
        session.establish(&params.username, &params.password).await?;
        Ok(session)
    }

    /// Prompt without mode suffix, e.g. `ciscoasa/admin`.
    pub fn base_prompt(&self) -> &str {
        &self.base_prompt
    }

    pub fn is_privileged(&self) -> bool {
        self.privileged
    }

    /// Wake the shell, answer any login prompts and learn the base prompt.
    pub async fn establish(&mut self, username: &str, password: &str) -> Result<(), SessionError> {
        self.write_line("").await?;

        for _ in 0..LOGIN_ROUNDS {
            let output = self
                .read_until(
                    |out| login_prompt(out).is_some() || trailing_prompt(out).is_some(),
                    "login",
                )
                .await?;

            if let Some(prompt) = trailing_prompt(&output) {
                self.update_prompt(prompt);
                tracing::info!(prompt = %self.base_prompt, "CLI session established");
                return Ok(());
            }

            match login_prompt(&output) {
                Some(LoginPrompt::Username) => self.write_line(username).await?,
                Some(LoginPrompt::Password) => self.write_line(password).await?,
                None => {}
            }
        }

        Err(SessionError::Login(format!(
            "credentials for '{username}' were not accepted"
        )))
    }

    // ---- private helpers ----

    fn ensure_connected(&self) -> Result<(), SessionError> {
        if self.connected {
            Ok(())
        } else {
            Err(SessionError::NotConnected)
        }
    }

    async fn write_line(&mut self, line: &str) -> Result<(), SessionError> {
        self.transport.write(format!("{line}\n").as_bytes()).await?;
        Ok(())
    }

    /// Accumulate output until `done` accepts it, answering pager stops.
    async fn read_until<F>(&mut self, done: F, context: &str) -> Result<String, SessionError>
    where
        F: Fn(&str) -> bool,
    {
        let deadline = Instant::now() + self.timeout;
        let mut output = String::new();

        loop {
            let chunk = self.transport.read(self.poll).await?;
            if !chunk.is_empty() {
                output.push_str(&String::from_utf8_lossy(&chunk));
                if output.contains(PAGER_PROMPT) {
                    output = output.replace(PAGER_PROMPT, "");
                    self.transport.write(b" ").await?;
                    continue;
                }
                if done(&output) {
                    return Ok(output);
                }
            }
            if Instant::now() >= deadline {
                return Err(SessionError::Timeout {
                    command: context.to_string(),
                    waited: self.timeout,
                });
            }
        }
    }

    fn update_prompt(&mut self, prompt: &str) {
        self.privileged = prompt.ends_with('#');
        let base = base_prompt_of(prompt);
        if base != self.base_prompt {
            tracing::debug!(old = %self.base_prompt, new = %base, "Prompt changed");
            self.base_prompt = base;
        }
    }
}

#[async_trait]
impl CliDevice for CliSession {
    async fn send_command(&mut self, command: &str) -> Result<String, SessionError> {
        self.ensure_connected()?;
        tracing::debug!(command, "Sending command");

        self.write_line(command).await?;
        let raw = self
            .read_until(|out| trailing_prompt(out).is_some(), command)
            .await?;
        if let Some(prompt) = trailing_prompt(&raw) {
            self.update_prompt(prompt);
        }

        Ok(strip_command_output(&raw, command))
    }

    async fn enable(&mut self, secret: &str) -> Result<(), SessionError> {
        self.ensure_connected()?;

        if !self.privileged {
            let waiting = |out: &str| is_password_prompt(out) || trailing_prompt(out).is_some();

            self.write_line("enable").await?;
            let mut output = self.read_until(waiting, "enable").await?;
            if is_password_prompt(&output) {
                self.write_line(secret).await?;
                output = self.read_until(waiting, "enable").await?;
            }
            if is_password_prompt(&output) {
                return Err(SessionError::EnableFailed("enable secret rejected".into()));
            }
            if let Some(prompt) = trailing_prompt(&output) {
                self.update_prompt(prompt);
            }
            if !self.privileged {
                return Err(SessionError::EnableFailed(format!(
                    "still at unprivileged prompt '{}>'",
                    self.base_prompt
                )));
            }
            tracing::info!(prompt = %self.base_prompt, "Entered privileged mode");
        }

        if !self.paging_disabled {
            self.send_command(DISABLE_PAGING).await?;
            self.paging_disabled = true;
        }
        Ok(())
    }

    async fn autodetect_fs(&mut self) -> Result<String, SessionError> {
        let output = self.send_command("dir").await?;
        FILE_SYSTEM_RE
            .captures(&output)
            .map(|c| c[1].to_string())
            .ok_or_else(|| {
                SessionError::FileSystemDetection(
                    output.lines().next().unwrap_or_default().to_string(),
                )
            })
    }

    fn is_alive(&self) -> bool {
        self.connected && self.transport.is_active()
    }

    async fn disconnect(&mut self) -> Result<(), SessionError> {
        if !self.connected {
            return Ok(());
        }
        self.connected = false;

        if self.transport.is_active() {
            // The device may drop the connection before acknowledging.
            let _ = self.write_line("exit").await;
        }
        self.transport.close().await?;

        tracing::info!(prompt = %self.base_prompt, "CLI session closed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Output handling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginPrompt {
    Username,
    Password,
}

fn last_line(output: &str) -> &str {
    output
        .trim_end()
        .rsplit(['\n', '\r'])
        .next()
        .unwrap_or_default()
        .trim()
}

fn trailing_prompt(output: &str) -> Option<&str> {
    let line = last_line(output);
    PROMPT_RE.is_match(line).then_some(line)
}

fn login_prompt(output: &str) -> Option<LoginPrompt> {
    let line = last_line(output).to_ascii_lowercase();
    if line.ends_with("username:") || line.ends_with("login:") {
        Some(LoginPrompt::Username)
    } else if line.ends_with("password:") {
        Some(LoginPrompt::Password)
    } else {
        None
    }
}

fn is_password_prompt(output: &str) -> bool {
    login_prompt(output) == Some(LoginPrompt::Password)
}

/// `ciscoasa/admin(config-if)#` -> `ciscoasa/admin`.
fn base_prompt_of(prompt: &str) -> String {
    let without_mode = prompt.trim_end_matches(['#', '>']);
    without_mode
        .split('(')
        .next()
        .unwrap_or(without_mode)
        .to_string()
}

/// Apply terminal control characters: backspaces erase, ANSI sequences
/// are dropped, CRLF becomes LF and a bare CR keeps the text after it.
pub fn clean_output(raw: &str) -> String {
    let mut erased = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch == '\x08' {
            erased.pop();
        } else {
            erased.push(ch);
        }
    }

    let without_ansi = ANSI_RE.replace_all(&erased, "");
    without_ansi
        .replace("\r\n", "\n")
        .split('\n')
        .map(|line| line.rsplit('\r').find(|s| !s.is_empty()).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove the command echo and trailing prompt from raw output.
fn strip_command_output(raw: &str, command: &str) -> String {
    let cleaned = clean_output(raw);
    let mut lines: Vec<&str> = cleaned.lines().collect();

    if lines
        .last()
        .is_some_and(|line| PROMPT_RE.is_match(line.trim()))
    {
        lines.pop();
    }

    let command = command.trim();
    if !command.is_empty()
        && lines
            .first()
            .is_some_and(|line| line.trim_end().ends_with(command))
    {
        lines.remove(0);
    }

    let start = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .unwrap_or(lines.len());

    lines[start..].join("\n").trim_end().to_string()
}

/// Errors raised by a CLI session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The underlying transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The prompt did not return in time.
    #[error("Timed out after {waited:?} waiting for the prompt after '{command}'")]
    Timeout { command: String, waited: Duration },

    /// Interactive login was rejected.
    #[error("Login failed: {0}")]
    Login(String),

    /// Privileged mode could not be entered.
    #[error("Failed to enter enable mode: {0}")]
    EnableFailed(String),

    /// `dir` output did not name a file system.
    #[error("Could not detect file system from 'dir' output: {0}")]
    FileSystemDetection(String),

    /// The session has been disconnected.
    #[error("Session is not connected")]
    NotConnected,
}
