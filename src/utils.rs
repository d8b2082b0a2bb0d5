use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);

/// CSI sequences, OSC sequences and two-byte escapes
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-_]").unwrap()
});

/// Routine to check the underlying SSH connection is active or not for the SFTP client.
/// This function runs in a loop, checking the connection every 10 seconds.
/// It will continue indefinitely until the connection fails.
pub(crate) fn check_connection<'session>(
    session: &'session openssh::Session,
) -> std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<(), openssh::Error>> + Send + Sync + 'session>,
> {
    Box::pin(async move {
        loop {
            tokio::time::sleep(KEEPALIVE_INTERVAL).await;
            session.check().await?;
        }
        #[allow(unreachable_code)]
        Ok(())
    })
}

/// Removes terminal color and cursor escape sequences from command output
///
/// ```
/// assert_eq!(topssh::strip_styles("\x1b[1;32mok\x1b[0m"), "ok");
/// ```
pub fn strip_styles(text: &str) -> String {
    ANSI_ESCAPE.replace_all(text, "").into_owned()
}
