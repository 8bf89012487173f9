use thiserror::Error;

pub type Result<T> = std::result::Result<T, RunnerError>;

#[derive(Error, Debug)]
pub enum RunnerError {
    /// Neither the primary tool nor an installable fallback passed its probe.
    #[error("No usable benchmark tool: {0}")]
    NoUsableTool(String),

    #[error("{manager} {action} {package} exited with {status}")]
    PackageCommand {
        manager: &'static str,
        action: &'static str,
        package: String,
        status: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
