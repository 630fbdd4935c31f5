use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::config::M;
use crate::error::{Error, Result};
use crate::hash::{in_open_range, in_range};
use crate::NodeRef;

use super::node::Node;

impl Node {
    /// Makes the first reachable entry of the successor list its head. A
    /// successor adopted from deeper in the list is notified of this node once
    /// it had a maintenance cycle to drop its dead predecessor.
    pub async fn fix_successor_list(&self) -> Result<()> {
        let successors = self.successor_list()?;

        for (i, successor) in successors.iter().enumerate() {
            if !self.ping(&successor.addr).await {
                continue;
            }
            if i > 0 {
                info!(
                    "Successor {} of #{} failed, falling back to {}",
                    successors[0].addr,
                    self.id(),
                    successor.addr
                );
                let promoted = self.routing()?.promote_successor(successor);
                if !promoted {
                    debug!("Successor list of #{} changed during repair", self.id());
                    return Ok(());
                }

                tokio::time::sleep(self.config.successor_grace()).await;
                let mut client = self.connect(successor).await?;
                client.notify(self.me()).await?;
            }
            return Ok(());
        }

        error!(
            "All successors of #{} failed: {:?}",
            self.id(),
            successors.iter().map(|s| &s.addr).collect::<Vec<_>>()
        );
        Err(Error::RingPartitioned)
    }

    /// Adopts the successor's predecessor when it sits between the two of us,
    /// then tells the successor about this node.
    pub async fn stabilize(&self) -> Result<()> {
        self.fix_successor_list().await?;

        let successor = self.successor()?;
        let mut client = self.connect(&successor).await?;
        if let Some(candidate) = client.get_predecessor().await? {
            if in_open_range(self.id(), &candidate.id, &successor.id)
                && self.ping(&candidate.addr).await
            {
                debug!(
                    "#{} tightens its successor from {} to {}",
                    self.id(),
                    successor.addr,
                    candidate.addr
                );
                self.update_successor(&candidate).await?;
            }
        }

        let successor = self.successor()?;
        let mut client = self.connect(&successor).await?;
        client.notify(self.me()).await
    }

    /// `candidate` believes it is our predecessor. On adoption its whole store
    /// is pulled into the pending buffer as a replica.
    pub async fn notify(&self, candidate: &NodeRef) -> Result<()> {
        let predecessor = self.predecessor()?;

        if let Some(pred) = &predecessor {
            if !pred.same_node(self.me()) && !self.ping(&pred.addr).await {
                warn!(
                    "Predecessor {} of #{} unreachable, leaving {} for the next check",
                    pred.addr,
                    self.id(),
                    candidate.addr
                );
                return Err(Error::Connection(pred.addr.clone()));
            }
        }

        let adopt = match &predecessor {
            None => true,
            Some(pred) => in_open_range(&pred.id, &candidate.id, self.id()),
        };
        if !adopt {
            return Ok(());
        }

        {
            let mut routing = self.routing()?;
            if routing.predecessor != predecessor {
                debug!("Predecessor of #{} moved during notify", self.id());
                return Ok(());
            }
            routing.predecessor = Some(candidate.clone());
        }
        info!("#{} adopted {} as predecessor", self.id(), candidate.addr);

        let mut client = self.connect(candidate).await?;
        let replica = client.get_all_data().await?;
        self.pending.replace(replica).await;
        Ok(())
    }

    /// Absorbs the replica of a dead predecessor into the store and re-replicates
    /// the grown store to the successor.
    pub async fn check_predecessor(&self) -> Result<()> {
        let predecessor = match self.predecessor()? {
            Some(pred) => pred,
            None => return Ok(()),
        };
        if predecessor.same_node(self.me()) || self.ping(&predecessor.addr).await {
            return Ok(());
        }

        warn!(
            "Predecessor {} of #{} failed, absorbing its keys",
            predecessor.addr,
            self.id()
        );
        self.merge_pending_into_store().await;

        self.fix_successor_list().await?;
        let successor = self.successor()?;
        let mut client = self.connect(&successor).await?;
        client.set_pending_buffer(self.store.snapshot().await).await?;

        self.routing()?.drop_predecessor(&predecessor);
        Ok(())
    }

    /// Hands the predecessor the entries that should follow its own head.
    pub async fn maintain_successor_list(&self) -> Result<()> {
        let (predecessor, tail) = {
            let routing = self.routing()?;
            (routing.predecessor.clone(), routing.successor_tail())
        };

        match predecessor {
            Some(pred) if !pred.same_node(self.me()) => {
                let mut client = self.connect(&pred).await?;
                client.set_successor_tail(&tail).await
            }
            _ => Ok(()),
        }
    }

    /// Installs `successor` as the head of the successor list and pre-positions
    /// this node's keys in its pending buffer.
    pub async fn update_successor(&self, successor: &NodeRef) -> Result<()> {
        if !self.routing()?.push_successor(successor.clone()) {
            return Ok(());
        }
        info!("#{} adopted {} as successor", self.id(), successor.addr);

        let mut client = self.connect(successor).await?;
        client.set_pending_buffer(self.store.snapshot().await).await
    }

    /// Refreshes the next stale finger. Following fingers whose start still
    /// falls before the found successor share it and are refreshed with it.
    pub async fn fix_fingers(&self) -> Result<()> {
        let next = self.routing()?.next_finger % M;
        let successor = self.find_successor(&self.id().offset(next)).await?;

        let mut routing = self.routing()?;
        let mut i = next;
        while i < M && (i == next || in_range(self.id(), &self.id().offset(i), &successor.id)) {
            routing.finger[i] = successor.clone();
            i += 1;
        }
        routing.next_finger = i % M;
        Ok(())
    }

    pub fn update_predecessor(&self, predecessor: NodeRef) -> Result<()> {
        info!("#{} assigned {} as predecessor", self.id(), predecessor.addr);
        self.routing()?.predecessor = Some(predecessor);
        Ok(())
    }

    pub fn set_successor_tail(&self, tail: Vec<NodeRef>) -> Result<()> {
        self.routing()?.set_successor_tail(tail);
        Ok(())
    }

    pub(super) async fn maintain(self: Arc<Self>) {
        debug!("Maintenance of #{} started", self.id());
        while self.is_running() {
            if self.is_joined() {
                if let Err(err) = self.check_predecessor().await {
                    warn!("[maintain] #{} check_predecessor: {}", self.id(), err);
                }
                if let Err(err) = self.stabilize().await {
                    warn!("[maintain] #{} stabilize: {}", self.id(), err);
                }
                if let Err(err) = self.maintain_successor_list().await {
                    warn!("[maintain] #{} maintain_successor_list: {}", self.id(), err);
                }
                if let Err(err) = self.fix_fingers().await {
                    warn!("[maintain] #{} fix_fingers: {}", self.id(), err);
                }
            }
            tokio::time::sleep(self.config.maintain_interval).await;
        }
        debug!("Maintenance of #{} stopped", self.id());
    }
}
