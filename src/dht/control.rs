use std::sync::Arc;

use log::{error, warn};

use crate::error::Error;

use super::client;
use super::node::Node;

/// The operations a host harness drives a ring member with. Every outcome is
/// reduced to "did it work"; details only reach the log.
#[tonic::async_trait]
pub trait DhtControl {
    async fn run(&self) -> bool;
    async fn create(&self) -> bool;
    async fn join(&self, addr: &str) -> bool;
    async fn quit(&self) -> bool;
    /// Leaves without telling anyone; peers only notice through failed probes.
    async fn force_quit(&self);
    async fn ping(&self, addr: &str) -> bool;
    async fn put(&self, key: &str, value: &str) -> bool;
    async fn get(&self, key: &str) -> Option<String>;
    async fn delete(&self, key: &str) -> bool;
}

fn report(op: &str, node: &Node, err: Error) -> bool {
    match err {
        Error::KeyNotFound(key) => warn!("{} on {}: key {} not found", op, node.addr(), key),
        err => error!("{} on {} failed: {}", op, node.addr(), err),
    }
    false
}

#[tonic::async_trait]
impl DhtControl for Arc<Node> {
    async fn run(&self) -> bool {
        Node::run(self)
            .await
            .map_or_else(|err| report("run", self, err), |_| true)
    }

    async fn create(&self) -> bool {
        Node::create(self).map_or_else(|err| report("create", self, err), |_| true)
    }

    async fn join(&self, addr: &str) -> bool {
        Node::join(self, addr)
            .await
            .map_or_else(|err| report("join", self, err), |_| true)
    }

    async fn quit(&self) -> bool {
        Node::quit(self)
            .await
            .map_or_else(|err| report("quit", self, err), |_| true)
    }

    async fn force_quit(&self) {
        if !self.is_running() {
            return;
        }
        warn!("#{} forced off the ring", self.id());
        self.stop();
    }

    async fn ping(&self, addr: &str) -> bool {
        client::ping(addr, self.config()).await
    }

    async fn put(&self, key: &str, value: &str) -> bool {
        Node::put(self, key, value)
            .await
            .map_or_else(|err| report("put", self, err), |_| true)
    }

    async fn get(&self, key: &str) -> Option<String> {
        match Node::get(self, key).await {
            Ok(value) => Some(value),
            Err(err) => {
                report("get", self, err);
                None
            }
        }
    }

    async fn delete(&self, key: &str) -> bool {
        Node::delete(self, key)
            .await
            .map_or_else(|err| report("delete", self, err), |_| true)
    }
}
