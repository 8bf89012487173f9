use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

pub mod ledger;

pub use ledger::{lock_ledger, ResourceKind, ResourceLedger};

/// One benchmark server advertised by the directory service.
///
/// Only `id` is guaranteed to be present. Every free-text field may be absent
/// and an absent field must never make an entry unmatchable on its own.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerEntry {
    #[serde(deserialize_with = "server_id")]
    pub id: String,
    #[serde(default)]
    pub sponsor: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// Directory services disagree on whether ids are JSON numbers or strings.
/// Both normalize to the opaque string form used everywhere downstream.
fn server_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Num(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}

/// An ordered snapshot of every server the directory service advertised,
/// fetched once per run and immutable afterwards.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerDirectory(Vec<ServerEntry>);

impl ServerDirectory {
    pub fn new(entries: Vec<ServerEntry>) -> Self {
        Self(entries)
    }

    pub fn entries(&self) -> &[ServerEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A caller-supplied hint describing which server to exercise.
///
/// An empty `keyword` or `location` matches vacuously (every entry contains
/// the empty substring); plan validation warns about it instead of the
/// resolver guarding against it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Query {
    pub keyword: String,
    pub location: String,
    pub label: String,
}

impl Query {
    pub fn new(
        keyword: impl Into<String>,
        location: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            keyword: keyword.into(),
            location: location.into(),
            label: label.into(),
        }
    }
}

/// How query text is matched against a directory entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Keyword AND location must both appear in the combined
    /// sponsor/name/location haystack. The default.
    #[serde(rename = "and")]
    #[default]
    CombinedAnd,
    /// Alternative semantics kept from an older lineage of this pipeline:
    /// keyword against sponsor OR name, location against the location field.
    #[serde(rename = "or")]
    FieldOr,
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and" | "combined" => Ok(MatchMode::CombinedAnd),
            "or" | "fields" => Ok(MatchMode::FieldOr),
            other => Err(format!("unknown match mode '{other}' (expected 'and' or 'or')")),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::CombinedAnd => write!(f, "and"),
            MatchMode::FieldOr => write!(f, "or"),
        }
    }
}

/// Outcome of resolving one query against one directory snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionResult {
    Matched { server_id: String },
    NoMatch,
}

/// Latency and bandwidth figures reported by the primary tool, kept only for
/// the per-query status line. Bandwidth is already converted to Mbps.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BenchmarkSummary {
    pub latency_ms: Option<f64>,
    pub download_mbps: Option<f64>,
    pub upload_mbps: Option<f64>,
}

impl fmt::Display for BenchmarkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ms) = self.latency_ms {
            parts.push(format!("latency {ms:.1} ms"));
        }
        if let Some(down) = self.download_mbps {
            parts.push(format!("down {down:.1} Mbps"));
        }
        if let Some(up) = self.upload_mbps {
            parts.push(format!("up {up:.1} Mbps"));
        }
        if parts.is_empty() {
            write!(f, "no figures reported")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Result of one benchmark execution, reported to the orchestrator and never
/// retried automatically.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// The tool ran to completion. The summary is best-effort: present when
    /// the primary tool produced parseable structured output.
    Success(Option<BenchmarkSummary>),
    /// The tool started but exited non-zero. Recovered: the run continues.
    ServerUnreachable,
    /// Resolution produced no candidate; nothing was spawned. Recovered.
    NoCandidate,
    /// The tool binary could not start at all. Fatal to the run.
    ToolFailure,
}

impl ExecutionOutcome {
    /// Fatal outcomes abort the remaining query loop (teardown still runs).
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExecutionOutcome::ToolFailure)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn server_entry_accepts_numeric_and_string_ids() {
        let numeric: ServerEntry = serde_json::from_str(r#"{"id": 4713}"#).unwrap();
        let text: ServerEntry = serde_json::from_str(r#"{"id": "4713"}"#).unwrap();
        assert_eq!(numeric.id, "4713");
        assert_eq!(numeric, text);
    }

    #[test]
    fn server_entry_tolerates_absent_and_null_fields() {
        let entry: ServerEntry =
            serde_json::from_str(r#"{"id": "9", "sponsor": null, "location": "Guangzhou"}"#)
                .unwrap();
        assert_eq!(entry.sponsor, None);
        assert_eq!(entry.name, None);
        assert_eq!(entry.location.as_deref(), Some("Guangzhou"));
    }

    #[test]
    fn match_mode_parses_both_spellings() {
        assert_eq!("and".parse::<MatchMode>().unwrap(), MatchMode::CombinedAnd);
        assert_eq!("OR".parse::<MatchMode>().unwrap(), MatchMode::FieldOr);
        assert!("fuzzy".parse::<MatchMode>().is_err());
    }

    #[test]
    fn summary_formats_present_figures_only() {
        let summary = BenchmarkSummary {
            latency_ms: Some(7.5),
            download_mbps: Some(812.0),
            upload_mbps: None,
        };
        assert_eq!(summary.to_string(), "latency 7.5 ms, down 812.0 Mbps");
        assert_eq!(BenchmarkSummary::default().to_string(), "no figures reported");
    }
}
