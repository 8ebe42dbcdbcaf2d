use super::RateLimitStorage;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// In-memory storage backed by a sharded concurrent map.
///
/// Each `update` holds the shard lock for its key only while the closure runs.
pub struct MemoryStorage<T> {
    data: Arc<DashMap<String, T>>,
}

impl<T> MemoryStorage<T> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(DashMap::new()),
        }
    }
}

impl<T> Default for MemoryStorage<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RateLimitStorage<T> for MemoryStorage<T>
where
    T: Clone + Send + Sync,
{
    fn get(&self, key: &str) -> Option<T> {
        self.data.get(key).map(|entry| entry.value().clone())
    }

    fn update<R, F>(&self, key: &str, f: F) -> R
    where
        F: FnOnce(Option<&T>) -> (T, R),
    {
        match self.data.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let (next, out) = f(Some(entry.get()));
                entry.insert(next);
                out
            }
            Entry::Vacant(entry) => {
                let (next, out) = f(None);
                entry.insert(next);
                out
            }
        }
    }

    fn retain<F>(&self, mut keep: F) -> usize
    where
        F: FnMut(&T) -> bool,
    {
        let before = self.data.len();
        self.data.retain(|_, state| keep(state));
        before.saturating_sub(self.data.len())
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_sees_previous_value() {
        let storage: MemoryStorage<u32> = MemoryStorage::new();

        let first = storage.update("a", |prev| (prev.copied().unwrap_or(0) + 1, prev.is_none()));
        let second = storage.update("a", |prev| (prev.copied().unwrap_or(0) + 1, prev.is_none()));

        assert!(first);
        assert!(!second);
        assert_eq!(storage.get("a"), Some(2));
    }

    #[test]
    fn retain_reports_removed_entries() {
        let storage: MemoryStorage<u32> = MemoryStorage::new();
        for (key, value) in [("a", 1), ("b", 5), ("c", 9)] {
            storage.update(key, |_| (value, ()));
        }

        let removed = storage.retain(|value| *value > 4);

        assert_eq!(removed, 1);
        assert_eq!(storage.len(), 2);
        assert_eq!(storage.get("a"), None);
    }
}
