use log::{debug, warn};

use crate::error::{Error, Result};
use crate::hash::{generate_id_hash, in_range, Identifier};

use super::client::PeerClient;
use super::node::Node;
use super::store::Entries;

impl Node {
    pub async fn put(&self, key: &str, value: &str) -> Result<()> {
        let owner = self.find_successor(&generate_id_hash(key)).await?;
        debug!("Storing {} on {}", key, owner.addr);
        let mut client = self.connect(&owner).await?;
        client.local_put(key, value).await
    }

    pub async fn get(&self, key: &str) -> Result<String> {
        let owner = self.find_successor(&generate_id_hash(key)).await?;
        debug!("Reading {} from {}", key, owner.addr);
        let mut client = self.connect(&owner).await?;
        client.local_get(key).await
    }

    pub async fn delete(&self, key: &str) -> Result<()> {
        let owner = self.find_successor(&generate_id_hash(key)).await?;
        debug!("Deleting {} from {}", key, owner.addr);
        let mut client = self.connect(&owner).await?;
        client.local_delete(key).await
    }

    async fn successor_client(&self) -> Result<PeerClient> {
        self.fix_successor_list().await?;
        let successor = self.successor()?;
        self.connect(&successor).await
    }

    /// Writes into the store, then mirrors the write into the successor's
    /// pending buffer. The mirror is best effort.
    pub async fn local_put(&self, key: &str, value: &str) -> Result<()> {
        self.store.set(key, value).await;

        let replicated = match self.successor_client().await {
            Ok(mut client) => client.push_pending_entry(key, value).await,
            Err(err) => Err(err),
        };
        if let Err(err) = replicated {
            warn!("#{} could not replicate {}: {}", self.id(), key, err);
        }
        Ok(())
    }

    pub async fn local_get(&self, key: &str) -> Result<String> {
        self.store
            .get(key)
            .await
            .ok_or_else(|| Error::KeyNotFound(key.to_owned()))
    }

    pub async fn local_delete(&self, key: &str) -> Result<()> {
        if self.store.delete(key).await.is_none() {
            return Err(Error::KeyNotFound(key.to_owned()));
        }

        let replicated = match self.successor_client().await {
            Ok(mut client) => client.delete_pending_entry(key).await,
            Err(err) => Err(err),
        };
        if let Err(err) = replicated {
            warn!("#{} could not replicate deletion of {}: {}", self.id(), key, err);
        }
        Ok(())
    }

    /// Carves out the entries a node joining right before us with identifier
    /// `id` now owns: every key outside `(id, self.id]`.
    pub async fn extract_data(&self, id: &Identifier) -> Entries {
        let me = self.id().clone();
        self.store
            .extract(|key| in_range(id, &generate_id_hash(key), &me))
            .await
    }

    /// Merges `entries` into the store, then pushes the grown store to the
    /// successor as its replica. The push is best effort.
    pub async fn import_data(&self, entries: Entries) {
        self.store.import(entries).await;

        if let Err(err) = self.replicate_store().await {
            warn!("#{} could not replicate imported keys: {}", self.id(), err);
        }
    }

    async fn replicate_store(&self) -> Result<()> {
        self.fix_successor_list().await?;
        let successor = self.successor()?;
        if successor.same_node(self.me()) {
            return Ok(());
        }
        let mut client = self.connect(&successor).await?;
        client.set_pending_buffer(self.store.snapshot().await).await
    }

    pub async fn get_all_data(&self) -> Entries {
        self.store.snapshot().await
    }

    pub async fn set_pending_buffer(&self, entries: Entries) {
        self.pending.replace(entries).await;
    }

    pub async fn push_pending_entry(&self, key: &str, value: &str) {
        self.pending.set(key, value).await;
    }

    pub async fn delete_pending_entry(&self, key: &str) {
        self.pending.delete(key).await;
    }

    pub async fn merge_pending_into_store(&self) {
        self.pending.drain_into(&self.store).await;
    }
}
