//! External collaborators of the conversion engine: export file reading,
//! atomic output writes and the HTTP bookmark sink.

use std::path::{Path, PathBuf};

use anyhow::Context;
use bmb_adapters::{parse_export_str, ParsedEntry};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

pub mod sink;

pub use sink::{
    classify_response, classify_transport_error, push_payloads, retry_after, BookmarkSink,
    CreatedBookmark, HttpBookmarkSink, PushConfig, PushFailure, PushReport, PushStage,
    RetryDisposition, RetryPolicy, SinkConfig, SinkError,
};

pub const CRATE_NAME: &str = "bmb-storage";

/// Reads an export file and splits it into per-entry parse results.
/// A file that is not an entry collection at all fails with `MalformedInput`.
pub fn read_export_file(path: impl AsRef<Path>) -> anyhow::Result<Vec<ParsedEntry>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_export_str(&text).with_context(|| format!("parsing {}", path.display()))
}

#[derive(Debug, Clone)]
pub struct StoredOutput {
    pub content_hash: String,
    pub path: PathBuf,
    pub byte_size: usize,
    /// The destination already held identical bytes; nothing was written.
    pub unchanged: bool,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Pretty-printed JSON with a trailing newline; non-ASCII text is written as UTF-8.
pub fn render_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(value).context("serializing output")?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Serializes `value` and writes it to `path` through a temp file + rename,
/// creating parent directories as needed.
pub async fn write_json_output<T: Serialize + ?Sized>(
    path: impl AsRef<Path>,
    value: &T,
) -> anyhow::Result<StoredOutput> {
    let bytes = render_json(value)?;
    write_bytes_atomic(path.as_ref(), &bytes).await
}

pub async fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> anyhow::Result<StoredOutput> {
    let content_hash = sha256_hex(bytes);
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent)
        .await
        .with_context(|| format!("creating output directory {}", parent.display()))?;

    if fs::try_exists(path)
        .await
        .with_context(|| format!("checking output path {}", path.display()))?
    {
        let existing = fs::read(path)
            .await
            .with_context(|| format!("reading existing output {}", path.display()))?;
        if sha256_hex(&existing) == content_hash {
            return Ok(StoredOutput {
                content_hash,
                path: path.to_path_buf(),
                byte_size: bytes.len(),
                unchanged: true,
            });
        }
    }

    let temp_path = parent.join(format!(".{}.{}.tmp", Uuid::new_v4(), bytes.len()));
    let mut file = fs::OpenOptions::new()
        .create_new(true)
        .write(true)
        .open(&temp_path)
        .await
        .with_context(|| format!("opening temp output file {}", temp_path.display()))?;
    file.write_all(bytes)
        .await
        .with_context(|| format!("writing temp output file {}", temp_path.display()))?;
    file.flush()
        .await
        .with_context(|| format!("flushing temp output file {}", temp_path.display()))?;
    drop(file);

    if let Err(err) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(err).with_context(|| {
            format!(
                "atomically renaming temp output {} -> {}",
                temp_path.display(),
                path.display()
            )
        });
    }

    Ok(StoredOutput {
        content_hash,
        path: path.to_path_buf(),
        byte_size: bytes.len(),
        unchanged: false,
    })
}
