mod common;

use common::MemoryFs;
use std::collections::HashMap;
use std::fs;
use tempfile::TempDir;
use topssh::{Error, LOCAL_FILE_NOT_EXISTS, SftpClient, TransferResult};

fn remote() -> MemoryFs {
    MemoryFs::new().dir("/remote").dir("/remote/sub")
}

#[tokio::test]
async fn test_upload_nonexistent_file_makes_no_remote_call() {
    let client = SftpClient::new(remote());

    let result = client
        .upload_file("/this/file/does/not/exist.txt".as_ref(), "/remote", None)
        .await;

    assert!(!result.is_success());
    assert_eq!(result.detail(), LOCAL_FILE_NOT_EXISTS);
    assert_eq!(client.inner().calls(), 0);
}

#[tokio::test]
async fn test_upload_file_joins_directory_and_name() {
    let local = TempDir::new().unwrap();
    let file = local.path().join("report.csv");
    fs::write(&file, "a,b\n1,2\n").unwrap();
    let client = SftpClient::new(remote());

    let result = client.upload_file(&file, "/remote/", None).await;
    match result {
        TransferResult::Completed(progress) => {
            assert_eq!(progress.dest_file, "/remote/report.csv");
            assert_eq!(progress.file_size, 8);
        }
        TransferResult::Failed { detail, .. } => panic!("upload failed: {detail}"),
    }
    assert_eq!(client.inner().content("/remote/report.csv").unwrap(), b"a,b\n1,2\n");

    let result = client.upload_file(&file, "remote//sub", Some("renamed.csv")).await;
    assert!(result.is_success());
    assert!(client.inner().content("/remote/sub/renamed.csv").is_some());
}

#[tokio::test]
async fn test_upload_error_becomes_failed_result() {
    let local = TempDir::new().unwrap();
    let file = local.path().join("a.txt");
    fs::write(&file, "a").unwrap();
    let client = SftpClient::new(remote());

    let result = client.upload_file(&file, "/missing/dir", None).await;
    assert!(!result.is_success());
    assert!(result.detail().contains("/missing/dir"), "{}", result.detail());
}

#[tokio::test]
async fn test_upload_files_applies_rename_map() {
    let local = TempDir::new().unwrap();
    let a = local.path().join("a.txt");
    let c = local.path().join("c.txt");
    fs::write(&a, "from a").unwrap();
    fs::write(&c, "from c").unwrap();
    let renames = HashMap::from([("a.txt".to_string(), "b.txt".to_string())]);
    let client = SftpClient::new(remote());

    let results = client.upload_files(&[&a, &c], "/remote", &renames).await;

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(TransferResult::is_success));
    assert_eq!(client.inner().content("/remote/b.txt").unwrap(), b"from a");
    assert_eq!(client.inner().content("/remote/c.txt").unwrap(), b"from c");
    assert!(client.inner().content("/remote/a.txt").is_none());
}

#[tokio::test]
async fn test_upload_files_keeps_earlier_uploads_on_failure() {
    let local = TempDir::new().unwrap();
    let a = local.path().join("a.txt");
    fs::write(&a, "a").unwrap();
    let missing = local.path().join("missing.txt");
    let client = SftpClient::new(remote());

    let results = client
        .upload_files(&[a.clone(), missing], "/remote", &HashMap::new())
        .await;

    assert!(results[0].is_success());
    assert_eq!(results[1].detail(), LOCAL_FILE_NOT_EXISTS);
    assert!(client.inner().content("/remote/a.txt").is_some());
}

#[tokio::test]
async fn test_put_with_and_without_target_dir() {
    let local = TempDir::new().unwrap();
    let file = local.path().join("app.conf");
    fs::write(&file, "port=80").unwrap();
    let client = SftpClient::new(remote());

    assert!(client.put(&file, "/remote/sub", true).await.is_success());
    assert!(client.inner().content("/remote/sub/app.conf").is_some());

    assert!(client.put(&file, "//remote/other.conf", false).await.is_success());
    assert_eq!(client.inner().content("/remote/other.conf").unwrap(), b"port=80");
}

#[tokio::test]
async fn test_upload_text_writes_utf8() {
    let client = SftpClient::new(remote());

    let result = client.upload_text("héllo\nwörld\n", "remote//greeting.txt").await;
    assert!(result.is_success());
    assert_eq!(
        client.inner().content("/remote/greeting.txt").unwrap(),
        "héllo\nwörld\n".as_bytes()
    );

    assert!(!client.upload_text("x", "/nowhere/x.txt").await.is_success());
}

#[tokio::test]
async fn test_download_to_local_path() {
    let local = TempDir::new().unwrap();
    let client = SftpClient::new(remote().file("/remote/data.bin", &[1, 2, 3, 4]));
    let target = local.path().join("data.bin");

    let result = client.download("/remote//data.bin", &target).await;
    assert!(result.is_success());
    assert_eq!(fs::read(&target).unwrap(), [1, 2, 3, 4]);
}

#[tokio::test]
async fn test_download_does_not_create_local_parents() {
    let local = TempDir::new().unwrap();
    let client = SftpClient::new(remote().file("/remote/data.bin", b"x"));
    let target = local.path().join("no/such/dir/data.bin");

    let result = client.download("/remote/data.bin", &target).await;
    assert!(!result.is_success());
    assert!(!target.exists());
}

#[tokio::test]
async fn test_download_missing_remote_file_fails() {
    let local = TempDir::new().unwrap();
    let client = SftpClient::new(remote());

    let result = client.download("/remote/ghost", &local.path().join("ghost")).await;
    assert!(matches!(result, TransferResult::Failed { ref src_file, .. } if src_file == "/remote/ghost"));
}

#[tokio::test]
async fn test_get_into_local_directory_uses_remote_name() {
    let local = TempDir::new().unwrap();
    let client = SftpClient::new(remote().file("/remote/sub/notes.md", b"# notes"));

    let result = client.get("/remote/sub/notes.md", Some(local.path())).await;
    assert!(result.is_success());
    assert_eq!(fs::read(local.path().join("notes.md")).unwrap(), b"# notes");

    let explicit = local.path().join("copy.md");
    assert!(client.get("/remote/sub/notes.md", Some(explicit.as_path())).await.is_success());
    assert!(explicit.exists());
}

#[tokio::test]
async fn test_download_lines_drops_invalid_utf8() {
    let client = SftpClient::new(remote().file("/remote/log.txt", b"first\r\nsec\xffond\nthird"));

    let lines = client.download_lines("/remote/log.txt").await.unwrap();
    assert_eq!(lines, ["first", "second", "third"]);
}

#[tokio::test]
async fn test_download_lines_propagates_errors() {
    let client = SftpClient::new(remote());
    assert!(client.download_lines("/remote/missing.txt").await.is_err());
}

#[tokio::test]
async fn test_file_size() {
    let client = SftpClient::new(remote().file("/remote/blob", &[0; 1234]));

    assert_eq!(client.file_size("remote/blob").await.unwrap(), 1234);
    let err = client.file_size("/remote/none").await.unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[tokio::test]
async fn test_delete() {
    let client = SftpClient::new(remote().file("/remote/old.log", b"old"));

    let result = client.delete("/remote/old.log").await;
    assert!(result.is_success());
    assert_eq!(result.detail(), "/remote/old.log removed");
    assert!(client.inner().content("/remote/old.log").is_none());

    let result = client.delete("/remote/old.log").await;
    assert!(!result.is_success());
}

#[tokio::test]
async fn test_close_consumes_client() {
    let client = SftpClient::new(remote());
    client.close().await.unwrap();
}
