//! SSH transport for [`RemoteExecutor`].

use std::io::Read;
use std::net::TcpStream;
use std::time::Duration;

use ssh2::Session;
use tracing::debug;

use crate::error::{Error, Result};
use crate::remote::{CommandOutput, RemoteExecutor};

/// Default SSH port.
pub const SSH_PORT: u16 = 22;

/// Connect/read timeout applied to the TCP stream.
const STREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// An authenticated SSH session to one ESXi host.
///
/// The host key is not verified.
pub struct SshExecutor {
    session: Session,
}

impl SshExecutor {
    /// Open a session to `host` and authenticate with a password.
    pub fn connect(host: &str, user: &str, password: &str) -> Result<Self> {
        Self::connect_port(host, SSH_PORT, user, password)
    }

    /// Open a session to `host:port` and authenticate with a password.
    pub fn connect_port(host: &str, port: u16, user: &str, password: &str) -> Result<Self> {
        debug!(host, port, user, "connecting");
        let stream = TcpStream::connect((host, port))
            .map_err(|e| Error::ssh(format!("unable to connect to {}:{}: {}", host, port, e)))?;
        stream.set_read_timeout(Some(STREAM_TIMEOUT)).ok();
        stream.set_write_timeout(Some(STREAM_TIMEOUT)).ok();

        let mut session = Session::new()?;
        session.set_tcp_stream(stream);
        session
            .handshake()
            .map_err(|e| Error::ssh(format!("SSH handshake failed: {}", e)))?;
        session
            .userauth_password(user, password)
            .map_err(|e| Error::ssh(format!("authentication failed for {}: {}", user, e)))?;

        if !session.authenticated() {
            return Err(Error::ssh(format!("authentication failed for {}", user)));
        }

        Ok(Self { session })
    }

    fn run(&mut self, command: &str, pty: bool) -> Result<CommandOutput> {
        debug!(command, pty, "exec");
        let mut channel = self.session.channel_session()?;
        if pty {
            channel.request_pty("xterm", None, None)?;
        }
        channel.exec(command)?;

        let mut stdout = String::new();
        channel
            .read_to_string(&mut stdout)
            .map_err(|e| Error::ssh(format!("failed to read output: {}", e)))?;
        let mut stderr = String::new();
        channel
            .stderr()
            .read_to_string(&mut stderr)
            .map_err(|e| Error::ssh(format!("failed to read error output: {}", e)))?;
        channel.wait_close()?;

        Ok(CommandOutput::from_text(&stdout, &stderr))
    }
}

impl RemoteExecutor for SshExecutor {
    fn execute(&mut self, command: &str) -> Result<CommandOutput> {
        self.run(command, false)
    }

    fn execute_with_pty(&mut self, command: &str) -> Result<CommandOutput> {
        self.run(command, true)
    }
}
