use std::collections::HashMap;

use tokio::sync::RwLock;

pub type Entries = HashMap<String, String>;

#[derive(Debug, Default)]
pub struct Store {
    store: RwLock<Entries>,
}

impl Store {
    pub fn new() -> Self {
        let store = RwLock::new(HashMap::new());
        Store { store }
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let store = self.store.read().await;
        (*store).get(key).cloned()
    }

    pub async fn set(&self, key: &str, value: &str) -> Option<String> {
        let mut store = self.store.write().await;
        (*store).insert(key.into(), value.into())
    }

    pub async fn delete(&self, key: &str) -> Option<String> {
        let mut store = self.store.write().await;
        (*store).remove(key)
    }

    pub async fn snapshot(&self) -> Entries {
        let store = self.store.read().await;
        (*store).clone()
    }

    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }

    /// Merges `entries` in, overwriting keys already present.
    pub async fn import(&self, entries: Entries) {
        let mut store = self.store.write().await;
        (*store).extend(entries);
    }

    pub async fn replace(&self, entries: Entries) {
        let mut store = self.store.write().await;
        *store = entries;
    }

    pub async fn clear(&self) {
        self.store.write().await.clear();
    }

    /// Removes and returns every entry whose key does not satisfy `keep`.
    pub async fn extract<F>(&self, keep: F) -> Entries
    where
        F: Fn(&str) -> bool,
    {
        let mut store = self.store.write().await;
        let (kept, extracted) = std::mem::take(&mut *store)
            .into_iter()
            .partition(|(key, _)| keep(key));
        *store = kept;
        extracted
    }

    /// Moves every entry into `target` and leaves this store empty.
    pub async fn drain_into(&self, target: &Store) {
        let mut source = self.store.write().await;
        let mut target = target.store.write().await;
        (*target).extend((*source).drain());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(pairs: &[(&str, &str)]) -> Entries {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = Store::new();
        assert_eq!(store.set("a", "1").await, None);
        assert_eq!(store.set("a", "2").await, Some("1".into()));
        assert_eq!(store.get("a").await, Some("2".into()));
        assert_eq!(store.delete("a").await, Some("2".into()));
        assert_eq!(store.delete("a").await, None);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_import_is_idempotent() {
        let store = Store::new();
        store.set("x", "0").await;
        let batch = entries(&[("a", "1"), ("b", "2")]);

        store.import(batch.clone()).await;
        let once = store.snapshot().await;
        store.import(batch).await;

        assert_eq!(store.snapshot().await, once);
        assert_eq!(once.len(), 3);
    }

    #[tokio::test]
    async fn test_extract_partitions_entries() {
        let store = Store::new();
        store
            .replace(entries(&[("a", "1"), ("b", "2"), ("c", "3")]))
            .await;

        let extracted = store.extract(|key| key != "b").await;

        assert_eq!(extracted, entries(&[("b", "2")]));
        assert_eq!(store.snapshot().await, entries(&[("a", "1"), ("c", "3")]));
    }

    #[tokio::test]
    async fn test_drain_into_moves_everything() {
        let pending = Store::new();
        let store = Store::new();
        pending.replace(entries(&[("a", "1"), ("b", "2")])).await;
        store.replace(entries(&[("b", "old"), ("c", "3")])).await;

        pending.drain_into(&store).await;
        pending.drain_into(&store).await;

        assert!(pending.is_empty().await);
        assert_eq!(
            store.snapshot().await,
            entries(&[("a", "1"), ("b", "2"), ("c", "3")])
        );
    }
}
