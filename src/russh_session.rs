use russh::keys::known_hosts::{check_known_hosts, learn_known_hosts};
use russh::keys::ssh_key;
use russh::{ChannelMsg, Disconnect, client};
use secrecy::{ExposeSecret, SecretString};
use std::io;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::session::{HostKeyCheck, TransportOptions};
use crate::types::{CommandOutput, ConnectionConfig};

/// Host key verification against the user's `~/.ssh/known_hosts`
pub(crate) struct HostKeyPolicy {
    host: String,
    port: u16,
    check: HostKeyCheck,
}

impl client::Handler for HostKeyPolicy {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &ssh_key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        if self.check == HostKeyCheck::Accept {
            return Ok(true);
        }
        if check_known_hosts(&self.host, self.port, server_public_key)? {
            debug!("Host key verified for {}:{}", self.host, self.port);
            return Ok(true);
        }
        match self.check {
            HostKeyCheck::Add => {
                warn!("Learning new host key for {}:{}", self.host, self.port);
                learn_known_hosts(&self.host, self.port, server_public_key)?;
                Ok(true)
            }
            _ => {
                warn!("Unknown host key for {}:{}, refusing", self.host, self.port);
                Ok(false)
            }
        }
    }
}

pub(crate) type RusshHandle = client::Handle<HostKeyPolicy>;

/// Opens an SSH session and logs in with `password`
pub(crate) async fn connect_with_password(
    config: &ConnectionConfig,
    password: &SecretString,
    options: &TransportOptions,
) -> Result<RusshHandle> {
    let ssh_config = Arc::new(client::Config {
        keepalive_interval: options.server_alive_interval,
        ..Default::default()
    });
    let handler = HostKeyPolicy {
        host: config.host().to_string(),
        port: config.port(),
        check: options.known_hosts.unwrap_or(HostKeyCheck::Add),
    };

    let connecting = client::connect(ssh_config, (config.host(), config.port()), handler);
    let mut handle = match options.connect_timeout {
        Some(limit) => tokio::time::timeout(limit, connecting).await.map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connecting to {}:{} timed out", config.host(), config.port()),
            )
        })??,
        None => connecting.await?,
    };

    let auth = handle
        .authenticate_password(config.user(), password.expose_secret())
        .await?;
    if !auth.success() {
        return Err(Error::AuthenticationFailed {
            user: config.user().to_string(),
            host: config.host().to_string(),
        });
    }
    info!("Password login accepted for {:?}@{:?}", config.user(), config.host());
    Ok(handle)
}

/// Runs `cmd` on its own exec channel and collects its output
pub(crate) async fn exec(handle: &RusshHandle, cmd: &str) -> Result<CommandOutput> {
    let mut channel = handle.channel_open_session().await?;
    channel.exec(true, cmd).await?;

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut exit_status = None;
    // exit-status may arrive after EOF, so read until the channel closes
    while let Some(msg) = channel.wait().await {
        match msg {
            ChannelMsg::Data { data } => stdout.extend_from_slice(&data),
            ChannelMsg::ExtendedData { data, ext: 1 } => stderr.extend_from_slice(&data),
            ChannelMsg::ExitStatus { exit_status: code } => exit_status = i32::try_from(code).ok(),
            ChannelMsg::Close => break,
            _ => {}
        }
    }
    Ok(CommandOutput::from_raw(&stdout, &stderr, exit_status))
}

/// Says goodbye to the server, dropping the session
pub(crate) async fn disconnect(handle: RusshHandle) -> Result<()> {
    handle
        .disconnect(Disconnect::ByApplication, "", "English")
        .await?;
    Ok(())
}
