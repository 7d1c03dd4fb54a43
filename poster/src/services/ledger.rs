//! File-backed exclusion ledger
//!
//! Plain UTF-8 text, one image identifier per line, append-only. A missing file is an
//! empty ledger. Unreadable lines are skipped rather than failing the read: the
//! ledger only guards against repeats.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use shared::{run_debug, run_warn, ImageId, RunId};

use crate::error::{PosterError, PosterResult};
use crate::traits::Ledger;

/// Ledger persisted as a newline-delimited text file
pub struct FileLedger {
    path: PathBuf,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, operation: &str, source: std::io::Error) -> PosterError {
        PosterError::Ledger {
            operation: operation.to_string(),
            path: self.path.clone(),
            source,
        }
    }

    /// All valid entries in chronological order
    pub async fn entries(&self) -> PosterResult<Vec<ImageId>> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(self.io_error("read", e)),
        };

        let mut entries = Vec::new();
        let mut skipped = 0usize;
        for (idx, line) in raw.split(|b| *b == b'\n').enumerate() {
            match parse_line(line) {
                LineParse::Entry(id) => entries.push(id),
                LineParse::Blank => {}
                LineParse::Malformed(reason) => {
                    skipped += 1;
                    run_warn!(
                        RunId::current(),
                        "⚠️ Skipping ledger line {} in {}: {}",
                        idx + 1,
                        self.path.display(),
                        reason
                    );
                }
            }
        }

        run_debug!(
            RunId::current(),
            "📒 Read {} ledger entries ({} skipped) from {}",
            entries.len(),
            skipped,
            self.path.display()
        );
        Ok(entries)
    }

    /// Whether the file is non-empty and lacks a trailing newline
    async fn needs_separator(&self) -> PosterResult<bool> {
        let mut file = match fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(self.io_error("open", e)),
        };

        let len = file
            .metadata()
            .await
            .map_err(|e| self.io_error("stat", e))?
            .len();
        if len == 0 {
            return Ok(false);
        }

        file.seek(std::io::SeekFrom::End(-1))
            .await
            .map_err(|e| self.io_error("seek", e))?;
        let mut last = [0u8; 1];
        file.read_exact(&mut last)
            .await
            .map_err(|e| self.io_error("read", e))?;
        Ok(last[0] != b'\n')
    }
}

enum LineParse {
    Entry(ImageId),
    Blank,
    Malformed(&'static str),
}

fn parse_line(line: &[u8]) -> LineParse {
    let Ok(text) = std::str::from_utf8(line) else {
        return LineParse::Malformed("not valid UTF-8");
    };
    // Tolerate CRLF files edited by hand
    let text = text.strip_suffix('\r').unwrap_or(text).trim();
    if text.is_empty() {
        return LineParse::Blank;
    }
    if text.chars().any(char::is_control) {
        return LineParse::Malformed("contains control characters");
    }
    LineParse::Entry(ImageId::new(text))
}

/// Reject identifiers that could not be read back as a single ledger line
pub fn validate_entry(id: &ImageId) -> PosterResult<()> {
    let text = id.as_str();
    if text.trim().is_empty() || text.trim() != text || text.chars().any(char::is_control) {
        return Err(PosterError::InvalidLedgerEntry {
            entry: text.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl Ledger for FileLedger {
    async fn recent(&self, n: usize) -> PosterResult<HashSet<ImageId>> {
        let entries = self.entries().await?;
        let start = entries.len().saturating_sub(n);
        Ok(entries.into_iter().skip(start).collect())
    }

    async fn append(&self, id: &ImageId) -> PosterResult<()> {
        validate_entry(id)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.io_error("create_dir", e))?;
            }
        }

        let mut line = String::with_capacity(id.as_str().len() + 2);
        if self.needs_separator().await? {
            line.push('\n');
        }
        line.push_str(id.as_str());
        line.push('\n');

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.io_error("open", e))?;

        // One write per entry
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| self.io_error("append", e))?;
        file.flush().await.map_err(|e| self.io_error("flush", e))?;
        file.sync_all().await.map_err(|e| self.io_error("sync", e))?;

        run_debug!(
            RunId::current(),
            "📝 Appended {} to ledger {}",
            id,
            self.path.display()
        );
        Ok(())
    }
}
