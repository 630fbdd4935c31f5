use log::{info, warn};

use crate::config::M;
use crate::error::{Error, Result};

use super::client::PeerClient;
use super::node::Node;

impl Node {
    /// Forms a ring of one.
    pub fn create(&self) -> Result<()> {
        self.routing()?.reset_to(self.me());
        self.set_joined(true);
        info!("#{} created a new ring on {}", self.id(), self.addr());
        Ok(())
    }

    /// Enters the ring known to `bootstrap` and pulls the keys this node now owns
    /// from its successor. Fingers filled before a failure are kept.
    pub async fn join(&self, bootstrap: &str) -> Result<()> {
        info!("#{} joining through {}", self.id(), bootstrap);

        let mut client = PeerClient::connect(bootstrap, &self.config).await?;
        let successor = client.find_successor(self.id()).await?;
        self.update_successor(&successor).await?;

        for i in 0..M {
            let finger = self.find_successor(&self.id().offset(i)).await?;
            self.routing()?.finger[i] = finger;
        }

        let successor = self.successor()?;
        let mut client = self.connect(&successor).await?;
        let inherited = client.extract_data(self.id()).await?;
        info!(
            "#{} inherited {} keys from {}",
            self.id(),
            inherited.len(),
            successor.addr
        );
        self.store.replace(inherited.clone()).await;

        if let Err(err) = client.set_pending_buffer(inherited).await {
            warn!(
                "#{} could not replicate inherited keys to {}: {}",
                self.id(),
                successor.addr,
                err
            );
        }

        self.set_joined(true);
        Ok(())
    }

    /// Leaves the ring cooperatively: the successor takes over the store and the
    /// pending buffer, and both neighbours are pointed at each other. The
    /// listening endpoint is closed whatever the outcome.
    pub async fn quit(&self) -> Result<()> {
        if !self.halt() {
            return Err(Error::NotRunning);
        }
        info!("#{} leaving the ring", self.id());

        let result = self.hand_off().await;
        self.stop();
        result
    }

    async fn hand_off(&self) -> Result<()> {
        self.fix_successor_list().await?;
        let successor = self.successor()?;

        if successor.same_node(self.me()) {
            self.store.clear().await;
            self.pending.clear().await;
            self.set_joined(false);
            return Ok(());
        }

        let mut client = self.connect(&successor).await?;
        client.import_data(self.store.snapshot().await).await?;
        client
            .set_pending_buffer(self.pending.snapshot().await)
            .await?;

        let predecessor = self.predecessor()?;
        if let Some(pred) = predecessor.filter(|pred| !pred.same_node(self.me())) {
            let mut pred_client = self.connect(&pred).await?;
            pred_client.update_successor(&successor).await?;
            client.update_predecessor(&pred).await?;
        }

        self.store.clear().await;
        self.pending.clear().await;
        self.set_joined(false);
        info!("#{} handed its keys to {}", self.id(), successor.addr);
        Ok(())
    }
}
