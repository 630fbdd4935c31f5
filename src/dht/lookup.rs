use std::collections::HashSet;

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::hash::{in_open_range, in_range, Identifier};
use crate::NodeRef;

use super::node::Node;

impl Node {
    /// Resolves the ring member owning `id`, hopping through remote nodes as needed.
    pub async fn find_successor(&self, id: &Identifier) -> Result<NodeRef> {
        self.fix_successor_list().await?;

        let successor = self.successor()?;
        if !self.ping(&successor.addr).await {
            warn!(
                "Successor {} of #{} unreachable during lookup",
                successor.addr,
                self.id()
            );
            return Err(Error::Routing(id.to_string()));
        }

        if in_range(self.id(), id, &successor.id) {
            return Ok(successor);
        }

        let next = match self.closest_preceding_node(id).await? {
            Some(node) => node,
            None if in_range(self.id(), &successor.id, id) => successor,
            None => {
                warn!("#{} is unable to find successor of #{}", self.id(), id);
                return Err(Error::Routing(id.to_string()));
            }
        };

        debug!("Forwarding lookup of #{} to {}", id, next.addr);
        let mut client = self.connect(&next).await?;
        client.find_successor(id).await
    }

    /// Scans the finger table from the farthest entry down for a live node
    /// strictly between this node and `id`. Dead entries are pointed back at
    /// this node so later scans skip them until they are repaired.
    pub async fn closest_preceding_node(&self, id: &Identifier) -> Result<Option<NodeRef>> {
        let finger = self.routing()?.finger.clone();
        let mut failed: HashSet<String> = HashSet::new();

        for (i, entry) in finger.iter().enumerate().rev() {
            if failed.contains(&entry.addr) {
                self.routing()?.replace_finger(i, entry, self.me());
                continue;
            }
            if !in_open_range(self.id(), &entry.id, id) {
                continue;
            }
            if self.ping(&entry.addr).await {
                return Ok(Some(entry.clone()));
            }

            warn!("Finger {} ({}) of #{} is dead", i, entry.addr, self.id());
            failed.insert(entry.addr.clone());
            self.routing()?.replace_finger(i, entry, self.me());
        }

        Ok(None)
    }
}
