// demos/basic_usage.rs
// Run with: cargo run --example basic_usage

use std::collections::HashMap;
use std::path::Path;
use topssh::{ConnectOverrides, Connection, ConnectionConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    // 1. Describe the host
    let config = ConnectionConfig::new("example.com", "your_username")
        .with_key_path("/home/user/.ssh/id_rsa")
        .with_option("connect_timeout", 60)
        .with_option("control_dir", "/tmp/ssh_control");

    // 2. Connect
    let mut conn = Connection::new(config);
    conn.connect(ConnectOverrides::default()).await?;
    println!("✅ Connected to SSH server");

    let result = run(&conn).await;

    // 3. Cleanup, also when something above failed
    conn.close().await;
    println!("✅ All done!");
    result
}

async fn run(conn: &Connection) -> anyhow::Result<()> {
    let client = conn.sftp()?;

    // Walk a remote tree, two levels deep
    println!("\n📂 Walking /remote/directory...");
    let tree = client.walk_files("/remote/directory", 2).await?;
    for dir in &tree.dirs {
        println!("  d {dir}");
    }
    for file in &tree.files {
        println!("  - {file}");
    }

    // Upload a few files, renaming one of them
    println!("\n⬆️  Uploading files...");
    let renames = HashMap::from([("document.pdf".to_string(), "document-v2.pdf".to_string())]);
    let results = client
        .upload_files(
            &["/local/path/document.pdf", "/local/path/notes.txt"],
            "/remote/path",
            &renames,
        )
        .await;
    for result in &results {
        let mark = if result.is_success() { "✅" } else { "❌" };
        println!("{mark} {}", result.detail());
    }

    // Download a file
    println!("\n⬇️  Downloading file...");
    let result = client
        .download("/remote/path/config.json", Path::new("/local/path/config.json"))
        .await;
    println!("{}", result.detail());

    // Read a remote text file
    for line in client.download_lines("/etc/os-release").await? {
        println!("  {line}");
    }

    Ok(())
}
