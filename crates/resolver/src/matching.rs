use speedsift_protocol::{MatchMode, Query, ResolutionResult, ServerDirectory, ServerEntry};

/// Resolve a query against a directory snapshot.
///
/// Matching is a case-insensitive *literal* substring test; query text is
/// never interpreted as a pattern. Entries are scanned in directory order and
/// the first qualifying one wins, so the result is deterministic for a given
/// snapshot. An empty keyword or location matches every entry (the empty
/// substring is contained in anything); callers that consider that a mistake
/// must validate before resolving.
pub fn resolve(directory: &ServerDirectory, query: &Query, mode: MatchMode) -> ResolutionResult {
    let keyword = query.keyword.to_lowercase();
    let location = query.location.to_lowercase();

    let qualifies: fn(&ServerEntry, &str, &str) -> bool = match mode {
        MatchMode::CombinedAnd => combined_and,
        MatchMode::FieldOr => field_or,
    };

    for entry in directory.entries() {
        if qualifies(entry, &keyword, &location) {
            log::debug!("query '{}' matched server {}", query.label, entry.id);
            return ResolutionResult::Matched {
                server_id: entry.id.clone(),
            };
        }
    }
    ResolutionResult::NoMatch
}

/// Default semantics: both needles must appear in the combined haystack.
fn combined_and(entry: &ServerEntry, keyword: &str, location: &str) -> bool {
    let haystack = combined_haystack(entry);
    haystack.contains(keyword) && haystack.contains(location)
}

/// Alternative semantics carried over from an older lineage of this pipeline:
/// keyword against sponsor OR name, location against the location field only.
fn field_or(entry: &ServerEntry, keyword: &str, location: &str) -> bool {
    let keyword_hit = contains_fold(entry.sponsor.as_deref(), keyword)
        || contains_fold(entry.name.as_deref(), keyword);
    keyword_hit && contains_fold(entry.location.as_deref(), location)
}

/// Join the free-text fields in fixed order, absent fields contributing
/// nothing. The result is already case-folded.
fn combined_haystack(entry: &ServerEntry) -> String {
    [&entry.sponsor, &entry.name, &entry.location]
        .into_iter()
        .filter_map(|field| field.as_deref())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn contains_fold(field: Option<&str>, needle: &str) -> bool {
    match field {
        Some(text) => text.to_lowercase().contains(needle),
        // An absent field still satisfies an empty needle: vacuous match.
        None => needle.is_empty(),
    }
}
