use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use serde_json::Value;
use speedsift_protocol::{lock_ledger, ResourceKind, ResourceLedger, ServerDirectory, ServerEntry};

use crate::error::{ResolverError, Result};

const SNAPSHOT_FILE: &str = "servers.json";

/// The directory snapshot for one run.
///
/// Built by invoking the directory-listing collaborator exactly once; the raw
/// payload is persisted into the run workspace so later queries (and operator
/// inspection) never re-fetch. Immutable after construction.
#[derive(Debug)]
pub struct DirectoryCache {
    directory: ServerDirectory,
    snapshot_path: Option<PathBuf>,
}

impl DirectoryCache {
    /// Invoke the listing collaborator, persist its payload under
    /// `workspace`, and parse it into a directory.
    ///
    /// The snapshot file is registered in the ledger *before* the write so a
    /// failure mid-write still leaves a cleanable artifact. Empty output, a
    /// non-success exit, or a directory with no servers are all fatal: no
    /// query can be resolved without a directory.
    pub fn fetch(
        list_command: &mut Command,
        workspace: &Path,
        ledger: &Mutex<ResourceLedger>,
    ) -> Result<Self> {
        log::info!("Fetching server directory");
        let output = list_command.output().map_err(|err| {
            ResolverError::DirectoryFetch(format!("could not invoke directory listing: {err}"))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ResolverError::DirectoryFetch(format!(
                "directory listing exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let payload = String::from_utf8_lossy(&output.stdout).into_owned();
        if payload.trim().is_empty() {
            return Err(ResolverError::DirectoryFetch(
                "directory listing produced no output".to_string(),
            ));
        }

        let snapshot_path = workspace.join(SNAPSHOT_FILE);
        lock_ledger(ledger).register(
            ResourceKind::TempWorkspace,
            snapshot_path.display().to_string(),
        );
        fs::write(&snapshot_path, payload.as_bytes())?;

        let directory = parse_directory(&payload)?;
        if directory.is_empty() {
            return Err(ResolverError::DirectoryFetch(
                "directory contains no servers".to_string(),
            ));
        }

        log::info!(
            "Cached {} servers at {}",
            directory.len(),
            snapshot_path.display()
        );
        Ok(Self {
            directory,
            snapshot_path: Some(snapshot_path),
        })
    }

    /// Load a previously captured snapshot file instead of fetching.
    pub fn load(snapshot: &Path) -> Result<Self> {
        let payload = fs::read_to_string(snapshot)?;
        let directory = parse_directory(&payload)?;
        if directory.is_empty() {
            return Err(ResolverError::DirectoryFetch(format!(
                "snapshot {} contains no servers",
                snapshot.display()
            )));
        }
        Ok(Self {
            directory,
            snapshot_path: None,
        })
    }

    pub fn directory(&self) -> &ServerDirectory {
        &self.directory
    }

    pub fn snapshot_path(&self) -> Option<&Path> {
        self.snapshot_path.as_deref()
    }
}

/// Parse a directory payload.
///
/// Accepts both shapes seen in the wild: a bare JSON array of entries and an
/// object wrapping a `servers` array. Unknown per-entry fields are ignored;
/// entries without an id are rejected by deserialization.
pub fn parse_directory(payload: &str) -> Result<ServerDirectory> {
    let value: Value = serde_json::from_str(payload)?;
    let entries: Vec<ServerEntry> = match value {
        Value::Array(_) => serde_json::from_value(value)?,
        Value::Object(mut map) => match map.remove("servers") {
            Some(servers) => serde_json::from_value(servers)?,
            None => {
                return Err(ResolverError::DirectoryFetch(
                    "directory payload has no 'servers' array".to_string(),
                ))
            }
        },
        _ => {
            return Err(ResolverError::DirectoryFetch(
                "directory payload is neither an array nor an object".to_string(),
            ))
        }
    };
    Ok(ServerDirectory::new(entries))
}
