use openssh::{KnownHosts, SessionBuilder};
use openssh_sftp_client::{Sftp, SftpOptions};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::client::SftpClient;
use crate::error::{Error, Result};
use crate::remote_fs::{OpensshFs, SessionFs};
use crate::russh_fs::RusshFs;
use crate::russh_session::{self, RusshHandle};
use crate::types::{AuthMethod, CommandOutput, ConnectOverrides, ConnectionConfig, SftpClientConfig};
use crate::utils::{check_connection, strip_styles};

/// SSH client library carrying a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    /// The system ssh client, driven through `openssh`
    Openssh,
    /// The in-process `russh` client
    Russh,
}

impl Backend {
    /// The system ssh client cannot be handed a password, russh can
    fn for_auth(auth: &AuthMethod) -> Self {
        match auth {
            AuthMethod::Password => Backend::Russh,
            AuthMethod::KeyFile(_) | AuthMethod::Default => Backend::Openssh,
        }
    }
}

enum Transport {
    Openssh(Arc<openssh::Session>),
    Russh(RusshHandle),
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Openssh(session) => f.debug_tuple("Openssh").field(session).finish(),
            Transport::Russh(_) => f.debug_tuple("Russh").finish_non_exhaustive(),
        }
    }
}

/// Connection to one remote host: an SSH session plus the SFTP client on top of it
///
/// The session and the SFTP handle are owned exclusively by this value.
/// [`Connection::close`] releases both; dropping the connection releases them
/// as well.
#[derive(Debug)]
pub struct Connection {
    config: ConnectionConfig,
    client_config: SftpClientConfig,
    transport: Option<Transport>,
    sftp: Option<SftpClient>,
    echo_text: Vec<String>,
}

impl Connection {
    /// Creates an unconnected facade for `config`
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_client_config(config, SftpClientConfig::default())
    }

    /// Same as `new`, with a custom SFTP transfer configuration
    pub fn with_client_config(config: ConnectionConfig, client_config: SftpClientConfig) -> Self {
        Self {
            config,
            client_config,
            transport: None,
            sftp: None,
            echo_text: Vec::new(),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Establishes the SSH session and the SFTP client
    ///
    /// Host, port, user and password from `overrides` win over the stored
    /// config when they are set and non-empty. An existing connection is
    /// closed first.
    ///
    /// A key file (or no credentials at all) logs in through the system ssh
    /// client; a password without a key file logs in through russh.
    ///
    /// Extra options:
    ///
    /// * `connect_timeout` - seconds
    /// * `server_alive_interval` - seconds
    /// * `known_hosts` - `"strict"`, `"add"` (default) or `"accept"`
    /// * `compression` - bool, system ssh client only
    /// * `config_file` - ssh config file path, system ssh client only
    /// * `control_dir` - directory for the control socket, system ssh client only
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - An extra option has a value of the wrong type
    /// - The SSH session cannot be established
    /// - The server rejects the password
    /// - The SFTP subsystem cannot be initialized
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mut conn = Connection::new(ConnectionConfig::new("example.com", "deploy"));
    /// conn.connect(ConnectOverrides::default().port(2222).password("s3cret")).await?;
    /// ```
    pub async fn connect(&mut self, overrides: ConnectOverrides) -> Result<()> {
        if self.transport.is_some() {
            debug!("Reconnecting, closing the current session first");
            self.close().await;
        }

        let resolved = self.config.resolve(&overrides);
        let options = TransportOptions::parse(resolved.options())?;
        let auth = resolved.auth_method();
        let backend = Backend::for_auth(&auth);
        info!(
            "Connecting to {:?}@{:?}:{} via {:?}",
            resolved.user(),
            resolved.host(),
            resolved.port(),
            backend,
        );

        let (transport, fs) = match (backend, resolved.password()) {
            (Backend::Russh, Some(password)) => {
                let handle = russh_session::connect_with_password(&resolved, password, &options).await?;
                let fs = RusshFs::open(&handle).await?;
                (Transport::Russh(handle), SessionFs::Russh(fs))
            }
            _ => {
                let mut builder = SessionBuilder::default();
                builder.user(resolved.user().to_string()).port(resolved.port());
                if let AuthMethod::KeyFile(key_path) = auth {
                    builder.keyfile(key_path);
                }
                options.apply(&mut builder);

                let session = Arc::new(builder.connect(resolved.host()).await?);

                debug!("Creating sftp client from session");
                let sftp = Sftp::from_clonable_session_with_check_connection(
                    session.clone(),
                    SftpOptions::default(),
                    check_connection, /* if the ssh connection is dropped this sftp client can notice and fail the ongoing operation */
                )
                .await?;
                debug!("sftp client created successfully");
                let fs = OpensshFs::new(sftp, self.client_config.clone());
                (Transport::Openssh(session), SessionFs::Openssh(fs))
            }
        };

        self.sftp = Some(SftpClient::new(fs));
        self.transport = Some(transport);
        Ok(())
    }

    /// Releases the SFTP client and the SSH session
    ///
    /// Errors while closing are logged and otherwise ignored.
    pub async fn close(&mut self) {
        if let Some(sftp) = self.sftp.take() {
            if let Err(e) = sftp.close().await {
                warn!("Ignoring error while closing sftp client: {}", e);
            }
        }

        match self.transport.take() {
            Some(Transport::Openssh(session)) => match Arc::try_unwrap(session) {
                Ok(session) => {
                    info!("Closing ssh session");
                    if let Err(e) = session.close().await {
                        warn!("Ignoring error while closing ssh session: {}", e);
                    }
                }
                Err(_) => {
                    warn!("ssh session still referenced, it will be released when dropped");
                }
            },
            Some(Transport::Russh(handle)) => {
                info!("Closing ssh session");
                if let Err(e) = russh_session::disconnect(handle).await {
                    warn!("Ignoring error while closing ssh session: {}", e);
                }
            }
            None => {}
        }
    }

    /// Checks if the SSH session is still active
    ///
    /// A session found dead is released.
    pub async fn is_connected(&mut self) -> bool {
        let alive = match self.transport.as_ref() {
            Some(Transport::Openssh(session)) => session.check().await.is_ok(),
            Some(Transport::Russh(handle)) => !handle.is_closed(),
            None => return false,
        };
        if !alive {
            warn!("Underlying ssh session is dead so setting status to disconnected");
            self.sftp = None;
            self.transport = None;
        }
        alive
    }

    /// The SFTP client of the current connection
    pub fn sftp(&self) -> Result<&SftpClient> {
        self.sftp.as_ref().ok_or(Error::NotConnected)
    }

    /// Runs a shell command on the remote host
    ///
    /// The command's stdout, stripped of terminal escapes, is appended to
    /// the echo buffer. A non-zero exit status is not an error.
    pub async fn run(&mut self, cmd: &str) -> Result<CommandOutput> {
        debug!("Running {:?}", cmd);
        let output = match self.transport.as_ref().ok_or(Error::NotConnected)? {
            Transport::Openssh(session) => {
                let output = session.raw_command(cmd).output().await?;
                CommandOutput::from_raw(&output.stdout, &output.stderr, output.status.code())
            }
            Transport::Russh(handle) => russh_session::exec(handle, cmd).await?,
        };
        self.append_buffer(&output.stdout);
        Ok(output)
    }

    pub async fn reboot(&mut self) -> Result<CommandOutput> {
        self.run("sudo reboot").await
    }

    pub async fn poweroff(&mut self) -> Result<CommandOutput> {
        self.run("sudo poweroff").await
    }

    pub async fn shutdown(&mut self) -> Result<CommandOutput> {
        self.poweroff().await
    }

    /// Pings `host` from the remote side, `args` goes before the host
    pub async fn ping(&mut self, host: &str, args: &str) -> Result<CommandOutput> {
        self.run(&ping_command(host, args)).await
    }

    /// Output of every command run on this connection, oldest first
    pub fn echo_text(&self) -> &[String] {
        &self.echo_text
    }

    fn append_buffer(&mut self, text: &str) -> &str {
        self.echo_text.push(strip_styles(text));
        self.echo_text.last().map(String::as_str).unwrap_or_default()
    }
}

fn ping_command(host: &str, args: &str) -> String {
    let args = args.trim();
    if args.is_empty() {
        format!("ping {host}")
    } else {
        format!("ping {args} {host}")
    }
}

/// How an unknown server host key is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HostKeyCheck {
    /// Refuse hosts missing from known_hosts
    Strict,
    /// Record unknown hosts in known_hosts
    Add,
    /// Accept any host key
    Accept,
}

impl HostKeyCheck {
    fn to_openssh(self) -> KnownHosts {
        match self {
            HostKeyCheck::Strict => KnownHosts::Strict,
            HostKeyCheck::Add => KnownHosts::Add,
            HostKeyCheck::Accept => KnownHosts::Accept,
        }
    }
}

/// Extra connection options, parsed from the config's option map
#[derive(Debug, Default)]
pub(crate) struct TransportOptions {
    pub(crate) connect_timeout: Option<Duration>,
    pub(crate) server_alive_interval: Option<Duration>,
    pub(crate) known_hosts: Option<HostKeyCheck>,
    compression: Option<bool>,
    config_file: Option<PathBuf>,
    control_dir: Option<PathBuf>,
}

impl TransportOptions {
    fn parse(options: &HashMap<String, serde_json::Value>) -> Result<Self> {
        let mut parsed = TransportOptions::default();
        for (key, value) in options {
            match key.as_str() {
                "connect_timeout" => parsed.connect_timeout = Some(seconds(key, value)?),
                "server_alive_interval" => parsed.server_alive_interval = Some(seconds(key, value)?),
                "known_hosts" => {
                    parsed.known_hosts = Some(match text(key, value)? {
                        "strict" => HostKeyCheck::Strict,
                        "add" => HostKeyCheck::Add,
                        "accept" => HostKeyCheck::Accept,
                        other => return Err(invalid(key, format!("unknown policy {other:?}"))),
                    })
                }
                "compression" => {
                    parsed.compression =
                        Some(value.as_bool().ok_or_else(|| invalid(key, "expected a bool"))?)
                }
                "config_file" => parsed.config_file = Some(PathBuf::from(text(key, value)?)),
                "control_dir" => parsed.control_dir = Some(PathBuf::from(text(key, value)?)),
                _ => warn!("Ignoring unknown connection option {:?}", key),
            }
        }
        Ok(parsed)
    }

    fn apply(self, builder: &mut SessionBuilder) {
        if let Some(timeout) = self.connect_timeout {
            builder.connect_timeout(timeout);
        }
        if let Some(interval) = self.server_alive_interval {
            builder.server_alive_interval(interval);
        }
        if let Some(known_hosts) = self.known_hosts {
            builder.known_hosts_check(known_hosts.to_openssh());
        }
        if let Some(compression) = self.compression {
            builder.compression(compression);
        }
        if let Some(config_file) = self.config_file {
            builder.config_file(config_file);
        }
        if let Some(control_dir) = self.control_dir {
            builder.control_directory(control_dir);
        }
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> Error {
    Error::InvalidOption {
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn text<'v>(key: &str, value: &'v serde_json::Value) -> Result<&'v str> {
    value.as_str().ok_or_else(|| invalid(key, "expected a string"))
}

fn seconds(key: &str, value: &serde_json::Value) -> Result<Duration> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .map(Duration::from_secs)
        .ok_or_else(|| invalid(key, "expected a number of seconds"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(value: serde_json::Value) -> HashMap<String, serde_json::Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_known_transport_options() {
        let parsed = TransportOptions::parse(&options(json!({
            "connect_timeout": 30,
            "server_alive_interval": "15",
            "known_hosts": "add",
            "compression": true,
            "control_dir": "/tmp/ssh_control",
            "something_else": 1,
        })))
        .unwrap();

        assert_eq!(parsed.connect_timeout, Some(Duration::from_secs(30)));
        assert_eq!(parsed.server_alive_interval, Some(Duration::from_secs(15)));
        assert_eq!(parsed.known_hosts, Some(HostKeyCheck::Add));
        assert_eq!(parsed.compression, Some(true));
        assert_eq!(parsed.control_dir, Some(PathBuf::from("/tmp/ssh_control")));
        assert_eq!(parsed.config_file, None);
    }

    #[test]
    fn rejects_badly_typed_options() {
        let err = TransportOptions::parse(&options(json!({"compression": "yes"}))).unwrap_err();
        assert!(matches!(err, Error::InvalidOption { ref key, .. } if key == "compression"));

        let err = TransportOptions::parse(&options(json!({"known_hosts": "maybe"}))).unwrap_err();
        assert!(err.to_string().contains("known_hosts"));

        assert!(TransportOptions::parse(&options(json!({"connect_timeout": -1}))).is_err());
    }

    #[test]
    fn ping_command_layout() {
        assert_eq!(ping_command("10.0.0.1", ""), "ping 10.0.0.1");
        assert_eq!(ping_command("10.0.0.1", "-c 3"), "ping -c 3 10.0.0.1");
    }

    #[test]
    fn unconnected_facade_reports_not_connected() {
        let mut conn = Connection::new(ConnectionConfig::new("example.com", "deploy"));
        assert!(matches!(conn.sftp(), Err(Error::NotConnected)));
        assert!(!tokio_test::block_on(conn.is_connected()));
        assert!(matches!(
            tokio_test::block_on(conn.run("uptime")),
            Err(Error::NotConnected)
        ));
        tokio_test::block_on(conn.close());
        assert!(conn.echo_text().is_empty());
    }

    #[test]
    fn password_login_selects_russh() {
        let config = ConnectionConfig::new("example.com", "deploy").with_password("hunter2");
        assert_eq!(Backend::for_auth(&config.auth_method()), Backend::Russh);

        let config = config.with_key_path("/home/deploy/.ssh/id_ed25519");
        assert_eq!(Backend::for_auth(&config.auth_method()), Backend::Openssh);

        let config = ConnectionConfig::new("example.com", "deploy");
        assert_eq!(Backend::for_auth(&config.auth_method()), Backend::Openssh);
    }

    #[tokio::test]
    async fn password_login_attempts_russh_connection() {
        // nothing listens on port 1, so the attempt fails at the TCP connect
        let config = ConnectionConfig::new("127.0.0.1", "deploy")
            .with_port(1)
            .with_option("connect_timeout", 5);
        let mut conn = Connection::new(config);

        let err = conn
            .connect(ConnectOverrides::default().password("hunter2"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Russh(_) | Error::Io(_)), "{err:?}");
        assert!(!err.to_string().contains("hunter2"));
        assert!(conn.sftp().is_err());
        assert!(!conn.is_connected().await);
    }

    #[test]
    fn echo_buffer_keeps_stripped_output() {
        let mut conn = Connection::new(ConnectionConfig::new("example.com", "deploy"));
        assert_eq!(conn.append_buffer("\x1b[32mup 3 days\x1b[0m\n"), "up 3 days\n");
        conn.append_buffer("second");
        assert_eq!(conn.echo_text(), ["up 3 days\n", "second"]);
    }
}
