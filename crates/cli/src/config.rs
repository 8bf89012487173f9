use std::fs;
use std::path::Path;

use anyhow::{bail, Context as AnyhowContext, Result};
use serde::Deserialize;
use speedsift_protocol::{MatchMode, Query};

/// Plan shipped with the binary, used when no `--plan` file is given.
pub const BUILTIN_PLAN: &str = include_str!("../../../plans/default.toml");

/// The ordered set of measurements one run performs. Read once at startup,
/// never mutated.
#[derive(Debug, Clone, Deserialize)]
pub struct TestPlan {
    /// Plan-level matching semantics; the CLI flag wins over this.
    #[serde(default)]
    pub match_mode: Option<MatchMode>,
    #[serde(default)]
    pub groups: Vec<QueryGroup>,
}

/// A named section of the plan, e.g. regional ISPs vs international nodes.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryGroup {
    pub name: String,
    #[serde(default)]
    pub tests: Vec<QuerySpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QuerySpec {
    pub keyword: String,
    pub location: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl QuerySpec {
    pub fn to_query(&self) -> Query {
        let label = self
            .label
            .clone()
            .unwrap_or_else(|| format!("{} {}", self.keyword, self.location));
        Query::new(&self.keyword, &self.location, label)
    }
}

impl TestPlan {
    pub fn query_count(&self) -> usize {
        self.groups.iter().map(|g| g.tests.len()).sum()
    }
}

pub fn load_plan(path: Option<&Path>) -> Result<TestPlan> {
    let (raw, origin) = match path {
        Some(p) => (
            fs::read_to_string(p)
                .with_context(|| format!("Failed to read test plan {}", p.display()))?,
            p.display().to_string(),
        ),
        None => (BUILTIN_PLAN.to_string(), "built-in plan".to_string()),
    };
    let plan: TestPlan =
        toml::from_str(&raw).with_context(|| format!("Invalid test plan: {origin}"))?;
    if plan.query_count() == 0 {
        bail!("Test plan contains no queries: {origin}");
    }
    Ok(plan)
}

/// Non-fatal plan lint. An empty keyword or location is legal but matches
/// every server, which is rarely what the author meant.
pub fn validate(plan: &TestPlan) -> Vec<String> {
    let mut warnings = Vec::new();
    for group in &plan.groups {
        for spec in &group.tests {
            let label = spec.to_query().label;
            if spec.keyword.trim().is_empty() {
                warnings.push(format!(
                    "'{label}' ({}): empty keyword matches every server",
                    group.name
                ));
            }
            if spec.location.trim().is_empty() {
                warnings.push(format!(
                    "'{label}' ({}): empty location matches every server",
                    group.name
                ));
            }
        }
    }
    warnings
}
