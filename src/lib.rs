pub mod config;
pub mod error;
pub mod hash;

pub mod rpc;

pub mod dht;

use hash::Identifier;

/// A handle on a ring member: where to reach it and where it sits on the ring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRef {
    pub id: Identifier,
    pub addr: String,
}

impl NodeRef {
    pub fn new(addr: impl Into<String>) -> Self {
        let addr = addr.into();
        NodeRef {
            id: hash::generate_id_hash(&addr),
            addr,
        }
    }

    pub fn same_node(&self, other: &NodeRef) -> bool {
        self.addr == other.addr
    }
}
