use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// What kind of ephemeral artifact a ledger entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// A filesystem path created for this run; removed recursively.
    TempWorkspace,
    /// A package installed opportunistically; uninstalled by the same
    /// package-manager family that installed it.
    InstalledDependency,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::TempWorkspace => write!(f, "workspace"),
            ResourceKind::InstalledDependency => write!(f, "package"),
        }
    }
}

/// Run-scoped record of every ephemeral artifact that teardown must undo.
///
/// Append-only while the run is in flight; drained exactly once, in
/// reverse-of-creation order. Draining empties the ledger, so a second drain
/// (the normal-exit path racing a signal handler) observes nothing to do.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    entries: Vec<(ResourceKind, String)>,
}

impl ResourceLedger {
    pub const fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn register(&mut self, kind: ResourceKind, identifier: impl Into<String>) {
        let identifier = identifier.into();
        log::debug!("ledger: registered {kind} {identifier}");
        self.entries.push((kind, identifier));
    }

    /// Consume every entry, newest first.
    pub fn drain(&mut self) -> Vec<(ResourceKind, String)> {
        let mut drained = std::mem::take(&mut self.entries);
        drained.reverse();
        drained
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lock the shared ledger, recovering from poisoning.
///
/// The ledger is touched from the interrupt handler; a panic elsewhere must
/// not leave the final teardown unable to read it.
pub fn lock_ledger(ledger: &Mutex<ResourceLedger>) -> MutexGuard<'_, ResourceLedger> {
    match ledger.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn drain_returns_entries_in_reverse_creation_order() {
        let mut ledger = ResourceLedger::new();
        ledger.register(ResourceKind::TempWorkspace, "/tmp/run");
        ledger.register(ResourceKind::InstalledDependency, "speedtest-cli");
        ledger.register(ResourceKind::TempWorkspace, "/tmp/run/servers.json");

        let drained = ledger.drain();
        assert_eq!(
            drained,
            vec![
                (ResourceKind::TempWorkspace, "/tmp/run/servers.json".to_string()),
                (ResourceKind::InstalledDependency, "speedtest-cli".to_string()),
                (ResourceKind::TempWorkspace, "/tmp/run".to_string()),
            ]
        );
    }

    #[test]
    fn second_drain_observes_empty_ledger() {
        let mut ledger = ResourceLedger::new();
        ledger.register(ResourceKind::TempWorkspace, "/tmp/run");

        assert_eq!(ledger.drain().len(), 1);
        assert!(ledger.is_empty());
        assert!(ledger.drain().is_empty());
    }

    #[test]
    fn lock_ledger_recovers_from_poisoning() {
        let ledger = Mutex::new(ResourceLedger::new());
        lock_ledger(&ledger).register(ResourceKind::TempWorkspace, "/tmp/a");

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = ledger.lock().unwrap();
            panic!("poison the mutex");
        }));
        assert!(result.is_err());

        assert_eq!(lock_ledger(&ledger).len(), 1);
    }
}
