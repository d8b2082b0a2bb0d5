// demos/advanced_usage.rs
// Run with: cargo run --example advanced_usage -- hosts/web1.json

use std::path::Path;
use topssh::{
    ConnectOverrides, Connection, ConnectionConfig, Error, RemoteFs, SessionFs, SftpClientConfig,
    TransferResult,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // Example 1: Load the host from a JSON file
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "host.json".to_string());
    let config = ConnectionConfig::from_json_file(&config_path)?;
    println!("Loaded {config:?}");

    // Example 2: Bigger transfer buffers, a port override and an optional
    // password from the environment at connect time
    let mut conn = Connection::with_client_config(config, SftpClientConfig::new(256 * 1024));
    let mut overrides = ConnectOverrides::default().port(2222);
    if let Ok(password) = std::env::var("TOPSSH_PASSWORD") {
        overrides = overrides.password(password);
    }
    if let Err(e) = conn.connect(overrides).await {
        match e {
            Error::AuthenticationFailed { user, host } => {
                eprintln!("❌ {user}@{host} rejected the password");
                return Ok(());
            }
            other => return Err(other.into()),
        }
    }

    let result = example_session(&mut conn).await;
    conn.close().await;
    result
}

async fn example_session(conn: &mut Connection) -> anyhow::Result<()> {
    // Example 3: Remote commands and the echo buffer
    let output = conn.run("uname -a").await?;
    println!("exit {:?}: {}", output.exit_status, output.stdout.trim());
    conn.ping("127.0.0.1", "-c 1").await?;
    for (i, text) in conn.echo_text().iter().enumerate() {
        println!("--- command {i} ---\n{text}");
    }

    let client = conn.sftp()?;

    // Example 4: Write text, check its size, read it back, then delete it
    let result = client.upload_text("generated by advanced_usage\n", "/tmp//topssh-demo.txt").await;
    if let TransferResult::Failed { detail, .. } = &result {
        eprintln!("❌ {detail}");
        return Ok(());
    }
    println!("size: {} bytes", client.file_size("/tmp/topssh-demo.txt").await?);
    println!("lines: {:?}", client.download_lines("/tmp/topssh-demo.txt").await?);
    println!("{}", client.delete("/tmp/topssh-demo.txt").await.detail());

    // Example 5: put/get with directory targets
    println!("{}", client.put(Path::new("Cargo.toml"), "/tmp", true).await.detail());
    println!("{}", client.get("/tmp/Cargo.toml", Some(Path::new("."))).await.detail());

    // Example 6: Operations without a helper go to the handle directly
    let entries = client.inner().list_dir("/tmp").await?;
    println!("/tmp has {} entries", entries.len());
    match client.inner() {
        SessionFs::Openssh(fs) => {
            let metadata = fs.sftp().fs().metadata("/tmp").await?;
            println!("/tmp size reported by the server: {:?}", metadata.len());
        }
        SessionFs::Russh(fs) => {
            let home = fs.sftp().canonicalize(".").await?;
            println!("remote home directory: {home}");
        }
    }

    Ok(())
}
