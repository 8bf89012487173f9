use std::fs;
use std::path::Path;

use speedsift_protocol::ResourceKind;

use crate::pkg::PackageManager;

/// Undo every drained ledger entry, best-effort and total.
///
/// Entries arrive in reverse-of-creation order (newest first), so files
/// inside a workspace are handled before the workspace itself. A failing
/// removal or uninstall is logged and the remaining entries are still
/// processed; teardown never aborts partway.
pub fn teardown(
    entries: Vec<(ResourceKind, String)>,
    pkg: Option<&PackageManager>,
    keep_workspace: bool,
) {
    if entries.is_empty() {
        return;
    }
    log::info!("Cleaning up {} artifact(s)", entries.len());

    for (kind, identifier) in entries {
        match kind {
            ResourceKind::TempWorkspace => {
                if keep_workspace {
                    log::info!("keeping {identifier} (workspace retention requested)");
                    continue;
                }
                remove_path(Path::new(&identifier));
            }
            ResourceKind::InstalledDependency => match pkg {
                Some(pkg) => {
                    if let Err(err) = pkg.uninstall(&identifier) {
                        log::warn!("could not uninstall {identifier}: {err}");
                    }
                }
                None => log::warn!("no package manager available to uninstall {identifier}"),
            },
        }
    }
}

fn remove_path(path: &Path) {
    // Earlier entries may already have taken a parent directory with them.
    if !path.exists() {
        return;
    }
    let result = if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    match result {
        Ok(()) => log::debug!("removed {}", path.display()),
        Err(err) => log::warn!("could not remove {}: {err}", path.display()),
    }
}
