//! `KEY=VALUE` env file persistence.
//!
//! The file is read whole, the target line is replaced (or appended), and the
//! result is written back. Every other line keeps its bytes and relative order.
//!
//! # Write modes
//!
//! - [`WriteMode::Atomic`]: a temporary file is created next to the target,
//!   flushed, given the original permissions and renamed over it. Readers see
//!   either the old or the new file. If any step fails the temporary file is
//!   removed when it goes out of scope.
//! - [`WriteMode::InPlace`]: the target is truncated and rewritten. A reader
//!   racing the write can observe a partial file. This mode exists for targets
//!   that cannot be renamed over, such as single-file bind mounts.
//!
//! Neither mode locks against other writers.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::SecretString;
use crate::config::{TargetConfig, WriteMode};
use crate::errors::{Result, SyncError};
use crate::sync::SecretSink;

/// What an upsert did to the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// An existing line for the key now carries the new value
    Replaced,
    /// No line for the key existed; one was added at the end
    Appended,
    /// The file already held exactly this line; nothing was written
    Unchanged,
}

impl std::fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpsertOutcome::Replaced => write!(f, "replaced"),
            UpsertOutcome::Appended => write!(f, "appended"),
            UpsertOutcome::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Result of rewriting file contents in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upsert {
    pub contents: String,
    pub outcome: UpsertOutcome,
    /// Extra `KEY=` lines dropped so that exactly one remains
    pub duplicates_removed: usize,
}

/// Sets `key` to `value` in `contents`.
///
/// The first line starting with `KEY=` is replaced and keeps its own line
/// ending (`\n` or `\r\n`); later lines for the same key are dropped. If no
/// line matches, `KEY=VALUE` is appended with the file's last line ending,
/// preceded by one when the last existing line is unterminated.
pub fn upsert_entry(contents: &str, key: &str, value: &str) -> Upsert {
    let prefix = format!("{}=", key);
    let mut output = String::with_capacity(contents.len() + prefix.len() + value.len() + 1);
    let mut found = false;
    let mut duplicates_removed = 0;

    for line in contents.split_inclusive('\n') {
        if !line.starts_with(&prefix) {
            output.push_str(line);
            continue;
        }
        if found {
            duplicates_removed += 1;
            continue;
        }
        found = true;
        let ending = if line.ends_with("\r\n") { "\r\n" } else { "\n" };
        output.push_str(&prefix);
        output.push_str(value);
        output.push_str(ending);
    }

    if !found {
        let ending = last_line_ending(contents);
        if !output.is_empty() && !output.ends_with('\n') {
            output.push_str(ending);
        }
        output.push_str(&prefix);
        output.push_str(value);
        output.push_str(ending);
    }

    let outcome = if output == contents {
        UpsertOutcome::Unchanged
    } else if found {
        UpsertOutcome::Replaced
    } else {
        UpsertOutcome::Appended
    };

    Upsert { contents: output, outcome, duplicates_removed }
}

/// Ending of the last terminated line, `\n` when there is none
fn last_line_ending(contents: &str) -> &'static str {
    match contents.rfind('\n') {
        Some(idx) if contents[..idx].ends_with('\r') => "\r\n",
        _ => "\n",
    }
}

/// Key names (never values) of the assignments in `contents`
fn entry_keys(contents: &str) -> Vec<&str> {
    contents
        .lines()
        .map(str::trim_start)
        .filter(|line| !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, _)| key.trim())
        .filter(|key| !key.is_empty())
        .collect()
}

/// One key in one env file
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
    key: String,
    mode: WriteMode,
}

impl EnvFile {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>, mode: WriteMode) -> Self {
        Self { path: path.into(), key: key.into(), mode }
    }

    pub fn from_config(target: &TargetConfig) -> Self {
        Self::new(target.env_file.clone(), target.secret_key.clone(), target.write_mode)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Writes `KEY=<secret>` into the file, leaving every other line untouched
    pub fn upsert(&self, secret: &SecretString) -> Result<UpsertOutcome> {
        let value = secret.expose_secret();
        if value.contains(|c: char| c == '\n' || c == '\r') {
            return Err(SyncError::persistence(
                &self.path,
                "Refusing to write a secret containing a line break",
                io::Error::new(io::ErrorKind::InvalidData, "line break in value"),
            ));
        }

        info!(path = %self.path.display(), key = %self.key, "Updating env file");

        // Symlinks are followed so the link target is what gets replaced
        let target = fs::canonicalize(&self.path)
            .map_err(|e| SyncError::persistence(&self.path, "Failed to resolve env file", e))?;
        if target != self.path {
            debug!(path = %self.path.display(), target = %target.display(), "Resolved env file");
        }

        let current = fs::read_to_string(&target)
            .map_err(|e| SyncError::persistence(&target, "Failed to read env file", e))?;
        debug!(
            path = %self.path.display(),
            lines = current.lines().count(),
            keys = ?entry_keys(&current),
            "Current env file entries"
        );

        let upsert = upsert_entry(&current, &self.key, value);
        if upsert.duplicates_removed > 0 {
            debug!(
                key = %self.key,
                removed = upsert.duplicates_removed,
                "Dropped duplicate lines for key"
            );
        }

        if upsert.outcome == UpsertOutcome::Unchanged {
            info!(path = %self.path.display(), "Env file already up to date");
            return Ok(UpsertOutcome::Unchanged);
        }

        match self.mode {
            WriteMode::Atomic => write_atomic(&target, &upsert.contents)?,
            WriteMode::InPlace => write_in_place(&target, &upsert.contents)?,
        }

        info!(
            path = %self.path.display(),
            outcome = %upsert.outcome,
            mode = %self.mode,
            "Updated env file successfully"
        );
        Ok(upsert.outcome)
    }
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let fail = |context: &str, e: io::Error| SyncError::persistence(path, context, e);

    // Dropped (and deleted) on any early return below
    let mut tmp = tempfile::Builder::new()
        .prefix(".secret-sync-")
        .tempfile_in(dir)
        .map_err(|e| fail("Failed to create temporary file", e))?;

    tmp.write_all(contents.as_bytes()).map_err(|e| fail("Failed to write temporary file", e))?;
    tmp.as_file().sync_all().map_err(|e| fail("Failed to flush temporary file", e))?;

    let permissions =
        fs::metadata(path).map_err(|e| fail("Failed to read env file metadata", e))?.permissions();
    fs::set_permissions(tmp.path(), permissions)
        .map_err(|e| fail("Failed to copy env file permissions", e))?;

    tmp.persist(path).map_err(|e| fail("Failed to rename temporary file over env file", e.error))?;
    Ok(())
}

fn write_in_place(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents)
        .map_err(|e| SyncError::persistence(path, "Failed to write env file", e))
}

impl SecretSink for EnvFile {
    fn write_secret(&self, secret: &SecretString) -> Result<UpsertOutcome> {
        self.upsert(secret)
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
