pub mod dht {
    tonic::include_proto!("dht");
}

use crate::error::{Error, Result};
use crate::hash::Identifier;
use crate::NodeRef;

impl From<&Identifier> for dht::Id {
    fn from(id: &Identifier) -> Self {
        dht::Id {
            value: id.to_bytes(),
        }
    }
}

impl TryFrom<dht::Id> for Identifier {
    type Error = Error;

    fn try_from(id: dht::Id) -> Result<Self> {
        Identifier::from_bytes(&id.value)
    }
}

impl From<&NodeRef> for dht::Peer {
    fn from(node: &NodeRef) -> Self {
        dht::Peer {
            id: node.id.to_bytes(),
            addr: node.addr.clone(),
        }
    }
}

impl TryFrom<dht::Peer> for NodeRef {
    type Error = Error;

    fn try_from(peer: dht::Peer) -> Result<Self> {
        if peer.addr.is_empty() {
            return Err(Error::Parse("peer without address".into()));
        }
        Ok(NodeRef {
            id: Identifier::from_bytes(&peer.id)?,
            addr: peer.addr,
        })
    }
}

impl From<&[NodeRef]> for dht::Peers {
    fn from(nodes: &[NodeRef]) -> Self {
        dht::Peers {
            peers: nodes.iter().map(dht::Peer::from).collect(),
        }
    }
}

impl TryFrom<dht::Peers> for Vec<NodeRef> {
    type Error = Error;

    fn try_from(peers: dht::Peers) -> Result<Self> {
        peers.peers.into_iter().map(NodeRef::try_from).collect()
    }
}

#[test]
fn test_peer_conversion() -> Result<()> {
    let node = NodeRef::new("127.0.0.1:4000");
    let peer = dht::Peer::from(&node);
    assert_eq!(NodeRef::try_from(peer)?, node);

    let empty = dht::Peer {
        id: vec![],
        addr: String::new(),
    };
    assert!(NodeRef::try_from(empty).is_err());
    Ok(())
}
