use std::sync::Arc;

use log::debug;
use tonic::{Request, Response, Status};

use crate::hash::Identifier;
use crate::rpc::dht::dht_node_server::DhtNode;
use crate::rpc::dht::{Entries, Entry, Id, Key, Peer, Peers, Predecessor, Value};
use crate::NodeRef;

use super::node::Node;

/// Serves the peer-facing remote calls of a [`Node`].
#[derive(Debug, Clone)]
pub struct DhtNodeService {
    node: Arc<Node>,
}

impl DhtNodeService {
    pub fn new(node: Arc<Node>) -> Self {
        DhtNodeService { node }
    }
}

#[tonic::async_trait]
impl DhtNode for DhtNodeService {
    async fn find_successor(
        &self,
        request: Request<Id>,
    ) -> std::result::Result<Response<Peer>, Status> {
        let id = Identifier::try_from(request.into_inner())?;
        let successor = self.node.find_successor(&id).await?;

        Ok(Response::new(Peer::from(&successor)))
    }

    async fn get_predecessor(
        &self,
        _request: Request<()>,
    ) -> std::result::Result<Response<Predecessor>, Status> {
        let peer = self.node.predecessor()?.as_ref().map(Peer::from);

        Ok(Response::new(Predecessor { peer }))
    }

    async fn notify(&self, request: Request<Peer>) -> std::result::Result<Response<()>, Status> {
        let candidate = NodeRef::try_from(request.into_inner())?;
        self.node.notify(&candidate).await?;

        Ok(Response::new(()))
    }

    async fn update_successor(
        &self,
        request: Request<Peer>,
    ) -> std::result::Result<Response<()>, Status> {
        let successor = NodeRef::try_from(request.into_inner())?;
        self.node.update_successor(&successor).await?;

        Ok(Response::new(()))
    }

    async fn update_predecessor(
        &self,
        request: Request<Peer>,
    ) -> std::result::Result<Response<()>, Status> {
        let predecessor = NodeRef::try_from(request.into_inner())?;
        self.node.update_predecessor(predecessor)?;

        Ok(Response::new(()))
    }

    async fn set_successor_tail(
        &self,
        request: Request<Peers>,
    ) -> std::result::Result<Response<()>, Status> {
        let tail = Vec::<NodeRef>::try_from(request.into_inner())?;
        self.node.set_successor_tail(tail)?;

        Ok(Response::new(()))
    }

    async fn local_put(&self, request: Request<Entry>) -> std::result::Result<Response<()>, Status> {
        let Entry { key, value } = request.into_inner();
        debug!("Got put request for key {}", key);
        self.node.local_put(&key, &value).await?;

        Ok(Response::new(()))
    }

    async fn local_get(&self, request: Request<Key>) -> std::result::Result<Response<Value>, Status> {
        let key = request.into_inner().key;
        debug!("Got get request for key {}", key);
        let value = self.node.local_get(&key).await?;

        Ok(Response::new(Value { value }))
    }

    async fn local_delete(&self, request: Request<Key>) -> std::result::Result<Response<()>, Status> {
        let key = request.into_inner().key;
        debug!("Got delete request for key {}", key);
        self.node.local_delete(&key).await?;

        Ok(Response::new(()))
    }

    async fn extract_data(&self, request: Request<Id>) -> std::result::Result<Response<Entries>, Status> {
        let id = Identifier::try_from(request.into_inner())?;
        let entries = self.node.extract_data(&id).await;
        debug!("Handing {} keys over to #{}", entries.len(), id);

        Ok(Response::new(Entries { entries }))
    }

    async fn import_data(&self, request: Request<Entries>) -> std::result::Result<Response<()>, Status> {
        self.node.import_data(request.into_inner().entries).await;

        Ok(Response::new(()))
    }

    async fn get_all_data(&self, _request: Request<()>) -> std::result::Result<Response<Entries>, Status> {
        let entries = self.node.get_all_data().await;

        Ok(Response::new(Entries { entries }))
    }

    async fn set_pending_buffer(
        &self,
        request: Request<Entries>,
    ) -> std::result::Result<Response<()>, Status> {
        self.node
            .set_pending_buffer(request.into_inner().entries)
            .await;

        Ok(Response::new(()))
    }

    async fn push_pending_entry(
        &self,
        request: Request<Entry>,
    ) -> std::result::Result<Response<()>, Status> {
        let Entry { key, value } = request.into_inner();
        self.node.push_pending_entry(&key, &value).await;

        Ok(Response::new(()))
    }

    async fn delete_pending_entry(
        &self,
        request: Request<Key>,
    ) -> std::result::Result<Response<()>, Status> {
        self.node.delete_pending_entry(&request.into_inner().key).await;

        Ok(Response::new(()))
    }
}
