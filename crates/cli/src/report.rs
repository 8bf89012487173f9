use speedsift_protocol::{ExecutionOutcome, Query, ResolutionResult, ServerEntry};

/// Per-run counts for the final summary line.
#[derive(Debug, Default)]
pub struct RunTally {
    pub succeeded: usize,
    pub unreachable: usize,
    pub unmatched: usize,
}

impl RunTally {
    pub fn record(&mut self, outcome: &ExecutionOutcome) {
        match outcome {
            ExecutionOutcome::Success(_) => self.succeeded += 1,
            ExecutionOutcome::ServerUnreachable => self.unreachable += 1,
            ExecutionOutcome::NoCandidate => self.unmatched += 1,
            ExecutionOutcome::ToolFailure => {}
        }
    }
}

pub fn group(name: &str) {
    println!("== {name} ==");
}

pub fn searching(query: &Query) {
    println!(
        "[{}] searching for '{}' near '{}'",
        query.label, query.keyword, query.location
    );
}

pub fn found(query: &Query, server_id: &str) {
    println!("[{}] matched server {server_id}; running benchmark", query.label);
}

pub fn no_match(query: &Query) {
    println!("[{}] warning: no server matched", query.label);
}

pub fn outcome(query: &Query, outcome: &ExecutionOutcome) {
    match outcome {
        ExecutionOutcome::Success(Some(summary)) => println!("[{}] ok: {summary}", query.label),
        ExecutionOutcome::Success(None) => println!("[{}] ok", query.label),
        ExecutionOutcome::ServerUnreachable => {
            println!("[{}] warning: server unreachable; continuing", query.label)
        }
        ExecutionOutcome::NoCandidate => println!("[{}] skipped: no candidate server", query.label),
        ExecutionOutcome::ToolFailure => {
            println!("[{}] error: benchmark tool could not start", query.label)
        }
    }
}

pub fn resolution(query: &Query, resolution: &ResolutionResult) {
    match resolution {
        ResolutionResult::Matched { server_id } => println!("[{}] -> {server_id}", query.label),
        ResolutionResult::NoMatch => println!("[{}] -> no match", query.label),
    }
}

pub fn server_entry(entry: &ServerEntry) {
    let field = |value: &Option<String>| value.as_deref().unwrap_or("-").to_string();
    println!(
        "{:>8}  {:<24} {:<24} {:<16} {}",
        entry.id,
        field(&entry.sponsor),
        field(&entry.name),
        field(&entry.location),
        field(&entry.country)
    );
}

/// Degraded mode: the fallback tool cannot resolve servers, so the configured
/// queries are skipped outright, never retried against it.
pub fn degraded(skipped: usize) {
    println!("fallback tool selected: skipping {skipped} configured queries");
    println!("running one undirected measurement instead");
}

pub fn undirected_outcome(outcome: &ExecutionOutcome) {
    match outcome {
        ExecutionOutcome::Success(_) => println!("undirected measurement: ok"),
        ExecutionOutcome::ServerUnreachable => {
            println!("undirected measurement: warning: measurement failed")
        }
        ExecutionOutcome::ToolFailure => {
            println!("undirected measurement: error: fallback tool could not start")
        }
        ExecutionOutcome::NoCandidate => {}
    }
}

pub fn summary(tally: &RunTally) {
    println!(
        "done: {} succeeded, {} unreachable, {} unmatched",
        tally.succeeded, tally.unreachable, tally.unmatched
    );
}

pub fn degraded_summary(outcome: &ExecutionOutcome) {
    let status = if outcome.is_success() { "completed" } else { "failed" };
    println!("done (degraded): undirected measurement {status}");
}
