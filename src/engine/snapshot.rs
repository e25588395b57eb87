use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::core::{Dynamic, FetcherName};

/// The typed, request-scoped store of completed fetcher outputs.
///
/// Every fetcher writes its output here exactly once, under its own
/// [`FetcherName`]. Generators read from it once the controller has finished
/// the whole graph. Cloning a `Snapshot` is cheap, all clones share the same
/// underlying store.
#[derive(Clone, Default)]
pub struct Snapshot {
    entries: Arc<RwLock<HashMap<FetcherName, Dynamic>>>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the output of a fetcher.
    ///
    /// Safe to call concurrently for distinct names. The controller guarantees
    /// that each name is written at most once per request.
    pub fn insert(&self, name: FetcherName, value: Dynamic) {
        let previous = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, value);

        debug_assert!(previous.is_none(), "fetcher '{name}' stored twice");
    }

    /// Returns the output stored under `name`, if there is one and it is of
    /// type `T`. A value of any other type is reported as absent.
    pub fn get<T>(&self, name: FetcherName) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let value = self.get_dynamic(name)?;
        value.downcast::<T>().ok()
    }

    pub(crate) fn get_dynamic(&self, name: FetcherName) -> Option<Dynamic> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&name)
            .cloned()
    }

    pub fn contains(&self, name: FetcherName) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<_> = entries.keys().collect();
        names.sort();

        f.debug_struct("Snapshot").field("entries", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn test_get_absent() {
        let snapshot = Snapshot::new();
        assert!(snapshot.get::<u64>(FetcherName::Validators).is_none());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_get_typed() {
        let snapshot = Snapshot::new();
        let value: BTreeMap<String, u64> = [("chainA".to_string(), 5)].into();
        snapshot.insert(FetcherName::Unbonds, Arc::new(value.clone()));

        let stored = snapshot
            .get::<BTreeMap<String, u64>>(FetcherName::Unbonds)
            .unwrap();

        assert_eq!(*stored, value);
        assert!(snapshot.contains(FetcherName::Unbonds));
    }

    #[test]
    fn test_wrong_type_is_absent() {
        let snapshot = Snapshot::new();
        snapshot.insert(FetcherName::Inflation, Arc::new(42u64));

        // Both a missing entry and a mismatched type look the same to a reader.
        assert!(snapshot.get::<String>(FetcherName::Inflation).is_none());
        assert!(snapshot.get::<String>(FetcherName::Supply).is_none());
        assert_eq!(*snapshot.get::<u64>(FetcherName::Inflation).unwrap(), 42);
    }

    #[test]
    fn test_clones_share_entries() {
        let snapshot = Snapshot::new();
        let clone = snapshot.clone();
        clone.insert(FetcherName::Price, Arc::new(1.5f64));

        assert_eq!(*snapshot.get::<f64>(FetcherName::Price).unwrap(), 1.5);
    }

    #[test]
    fn test_concurrent_inserts() {
        let snapshot = Snapshot::new();
        let names = [
            FetcherName::SlashingParams,
            FetcherName::StakingParams,
            FetcherName::Validators,
            FetcherName::Unbonds,
            FetcherName::Delegations,
            FetcherName::Commission,
            FetcherName::Wallets,
            FetcherName::NodeInfo,
        ];

        std::thread::scope(|s| {
            for (i, name) in names.iter().enumerate() {
                let snapshot = snapshot.clone();
                s.spawn(move || snapshot.insert(*name, Arc::new(i)));
            }
        });

        assert_eq!(snapshot.len(), names.len());
        for (i, name) in names.iter().enumerate() {
            assert_eq!(*snapshot.get::<usize>(*name).unwrap(), i);
        }
    }
}
