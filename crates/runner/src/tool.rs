use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;

use speedsift_protocol::{lock_ledger, ResourceKind, ResourceLedger};

use crate::error::{Result, RunnerError};
use crate::pkg::PackageManager;

/// Default program name of the resolution-capable benchmark tool.
pub const PRIMARY_TOOL: &str = "speedtest";
/// Default program name of the fallback tool (undirected runs only).
pub const SECONDARY_TOOL: &str = "speedtest-cli";
/// Package installed when the fallback tool has to be acquired.
pub const SECONDARY_PACKAGE: &str = "speedtest-cli";

/// The tool selected for this run, tagged with its capability profile.
///
/// Downstream logic branches on `supports_resolution()` and never re-probes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolHandle {
    /// Accepts an explicit server id and emits structured output.
    Primary { program: PathBuf },
    /// No server-selection capability; one undirected measurement per run.
    Secondary { program: PathBuf },
}

impl ToolHandle {
    pub fn supports_resolution(&self) -> bool {
        matches!(self, ToolHandle::Primary { .. })
    }

    pub fn program(&self) -> &Path {
        match self {
            ToolHandle::Primary { program } | ToolHandle::Secondary { program } => program,
        }
    }

    /// The directory-listing invocation: accept-terms flags plus structured
    /// output. Only the primary tool can list servers.
    pub fn list_command(&self) -> Option<Command> {
        match self {
            ToolHandle::Primary { program } => {
                let mut cmd = Command::new(program);
                cmd.args(["--accept-license", "--accept-gdpr", "-f", "json", "-L"]);
                Some(cmd)
            }
            ToolHandle::Secondary { .. } => None,
        }
    }

    /// The measurement invocation. A directed run names the server; the
    /// fallback tool only knows the undirected simple form.
    pub fn benchmark_command(&self, server_id: Option<&str>) -> Command {
        match self {
            ToolHandle::Primary { program } => {
                let mut cmd = Command::new(program);
                cmd.args(["--accept-license", "--accept-gdpr", "-f", "json"]);
                if let Some(id) = server_id {
                    cmd.args(["-s", id]);
                }
                cmd
            }
            ToolHandle::Secondary { program } => {
                let mut cmd = Command::new(program);
                cmd.arg("--simple");
                cmd
            }
        }
    }
}

/// Cheap, side-effect-free compatibility probe.
fn probe(program: &Path) -> bool {
    Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

/// Program-name overrides, primarily for tests and unusual installs.
#[derive(Debug, Clone, Default)]
pub struct ToolOverrides {
    pub primary: Option<PathBuf>,
    pub secondary: Option<PathBuf>,
}

/// Decide, once, which tool this run uses.
///
/// Exactly one probe of the primary tool. On probe failure the fallback is
/// used: as-is when already present, otherwise installed through the
/// package-manager collaborator (and registered in the ledger so teardown
/// uninstalls it). Both failing is fatal.
pub fn select_tool(
    pkg: Option<&PackageManager>,
    ledger: &Mutex<ResourceLedger>,
    overrides: &ToolOverrides,
) -> Result<ToolHandle> {
    let primary = overrides
        .primary
        .clone()
        .unwrap_or_else(|| PathBuf::from(PRIMARY_TOOL));
    if probe(&primary) {
        log::info!("using primary tool {}", primary.display());
        return Ok(ToolHandle::Primary { program: primary });
    }
    log::warn!(
        "primary tool {} failed its probe; switching to the fallback tool",
        primary.display()
    );

    let secondary = overrides
        .secondary
        .clone()
        .unwrap_or_else(|| PathBuf::from(SECONDARY_TOOL));
    if probe(&secondary) {
        log::info!("using fallback tool {}", secondary.display());
        return Ok(ToolHandle::Secondary { program: secondary });
    }

    let Some(pkg) = pkg else {
        return Err(RunnerError::NoUsableTool(
            "primary probe failed and no package manager is available to install the fallback"
                .to_string(),
        ));
    };
    pkg.install(SECONDARY_PACKAGE)
        .map_err(|err| RunnerError::NoUsableTool(format!("fallback install failed: {err}")))?;
    lock_ledger(ledger).register(ResourceKind::InstalledDependency, SECONDARY_PACKAGE);

    if probe(&secondary) {
        log::info!("using fallback tool {}", secondary.display());
        Ok(ToolHandle::Secondary { program: secondary })
    } else {
        Err(RunnerError::NoUsableTool(
            "fallback tool failed its probe after install".to_string(),
        ))
    }
}
