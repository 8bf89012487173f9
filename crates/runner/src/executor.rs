use serde::Deserialize;
use speedsift_protocol::{BenchmarkSummary, ExecutionOutcome};

use crate::tool::ToolHandle;

/// Run one measurement.
///
/// `None` with a resolution-capable tool means resolution found nothing:
/// `NoCandidate` is returned without spawning anything and the run goes on to
/// the next query. A non-success exit from a started tool is
/// `ServerUnreachable` (recovered); a tool that cannot start at all is
/// `ToolFailure` (fatal upstream). The tool's exit status is the sole signal;
/// no timeout is imposed here, the external tool bounds itself.
pub fn execute(tool: &ToolHandle, server_id: Option<&str>) -> ExecutionOutcome {
    if tool.supports_resolution() && server_id.is_none() {
        return ExecutionOutcome::NoCandidate;
    }

    let mut command = tool.benchmark_command(server_id);
    let output = match command.output() {
        Ok(output) => output,
        Err(err) => {
            log::error!(
                "benchmark tool {} could not start: {err}",
                tool.program().display()
            );
            return ExecutionOutcome::ToolFailure;
        }
    };

    if output.status.success() {
        let summary = if tool.supports_resolution() {
            parse_summary(&String::from_utf8_lossy(&output.stdout))
        } else {
            None
        };
        ExecutionOutcome::Success(summary)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        log::warn!(
            "benchmark exited with {}: {}",
            output.status,
            stderr.trim()
        );
        ExecutionOutcome::ServerUnreachable
    }
}

#[derive(Deserialize)]
struct RawResult {
    ping: Option<RawPing>,
    download: Option<RawTransfer>,
    upload: Option<RawTransfer>,
}

#[derive(Deserialize)]
struct RawPing {
    latency: Option<f64>,
}

#[derive(Deserialize)]
struct RawTransfer {
    /// Bytes per second.
    bandwidth: Option<f64>,
}

/// Best-effort extraction of the primary tool's result figures.
///
/// The tool emits one JSON object per line in some configurations, so the
/// last line that parses and carries at least one figure wins. Anything
/// unparseable simply yields no summary; the outcome is unaffected.
fn parse_summary(stdout: &str) -> Option<BenchmarkSummary> {
    for line in stdout.lines().rev() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(raw) = serde_json::from_str::<RawResult>(line) else {
            continue;
        };
        let summary = BenchmarkSummary {
            latency_ms: raw.ping.and_then(|p| p.latency),
            download_mbps: raw.download.and_then(|t| t.bandwidth).map(to_mbps),
            upload_mbps: raw.upload.and_then(|t| t.bandwidth).map(to_mbps),
        };
        if summary.latency_ms.is_some()
            || summary.download_mbps.is_some()
            || summary.upload_mbps.is_some()
        {
            return Some(summary);
        }
    }
    None
}

fn to_mbps(bytes_per_second: f64) -> f64 {
    bytes_per_second * 8.0 / 1_000_000.0
}
