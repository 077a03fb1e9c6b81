//! Durable JSON-lines journal behind the audit log.
//!
//! One `AuditEntry` per line, appended and flushed with `sync_data` before
//! `record` returns. On open, every existing line is parsed and the chain
//! re-verified; a journal that fails verification is refused rather than
//! extended.
//!
//! A failed append is rolled back by truncating the file to its length
//! before the write, so a torn line never sits in front of the next entry.
//! If the truncation itself fails the journal refuses every later append.

use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufRead, BufReader, Write},
    path::{Path, PathBuf},
};

use tracing::{error, info, warn};

use unbound_contracts::error::{GatewayError, GatewayResult};

use crate::{chain::verify_chain, entry::AuditEntry};

pub struct Journal {
    path: PathBuf,
    pub(crate) file: File,

    /// Set when a failed append could not be rolled back.
    failed: bool,

    /// Write only this many bytes of the next line, then fail.
    #[cfg(test)]
    pub(crate) fail_after: Option<usize>,
}

fn storage_error(path: &Path, what: &str, err: impl std::fmt::Display) -> GatewayError {
    GatewayError::StorageUnavailable {
        reason: format!("audit journal {}: {}: {}", path.display(), what, err),
    }
}

impl Journal {
    /// Open (or create) the journal at `path` and return it together with
    /// the entries already written to it.
    pub fn open(path: impl AsRef<Path>) -> GatewayResult<(Self, Vec<AuditEntry>)> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| storage_error(&path, "create directory", e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(&path)
            .map_err(|e| storage_error(&path, "open", e))?;

        let mut entries = Vec::new();
        for (index, line) in BufReader::new(&file).lines().enumerate() {
            let line = line.map_err(|e| storage_error(&path, "read", e))?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: AuditEntry = serde_json::from_str(&line)
                .map_err(|e| storage_error(&path, &format!("line {}", index + 1), e))?;
            entries.push(entry);
        }

        if !verify_chain(&entries) {
            return Err(GatewayError::StorageUnavailable {
                reason: format!("audit journal {} failed integrity verification", path.display()),
            });
        }

        info!(path = %path.display(), entries = entries.len(), "audit journal opened");
        let journal = Self {
            path,
            file,
            failed: false,
            #[cfg(test)]
            fail_after: None,
        };
        Ok((journal, entries))
    }

    /// Append `entry` and flush it to stable storage.
    ///
    /// On error the file is truncated back to where it was, so the journal
    /// holds either the whole line or none of it.
    pub fn append(&mut self, entry: &AuditEntry) -> GatewayResult<()> {
        if self.failed {
            return Err(GatewayError::StorageUnavailable {
                reason: format!(
                    "audit journal {} is unusable after a failed rollback",
                    self.path.display()
                ),
            });
        }

        let mut line =
            serde_json::to_vec(entry).map_err(|e| storage_error(&self.path, "serialize", e))?;
        line.push(b'\n');

        let start = self
            .file
            .metadata()
            .map_err(|e| storage_error(&self.path, "stat", e))?
            .len();

        if let Err(e) = self.write_line(&line) {
            match self.file.set_len(start).and_then(|()| self.file.sync_data()) {
                Ok(()) => {
                    warn!(path = %self.path.display(), length = start, "audit journal append rolled back");
                }
                Err(rollback) => {
                    self.failed = true;
                    error!(
                        path = %self.path.display(),
                        error = %rollback,
                        "audit journal rollback failed; refusing further appends"
                    );
                }
            }
            return Err(storage_error(&self.path, "append", e));
        }
        Ok(())
    }

    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        #[cfg(test)]
        {
            if let Some(limit) = self.fail_after.take() {
                self.file.write_all(&line[..limit.min(line.len())])?;
                return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
            }
        }

        self.file.write_all(line)?;
        self.file.sync_data()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
