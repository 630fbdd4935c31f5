use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{error, info};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;

use crate::config::{NodeConfig, M};
use crate::error::{Error, Result};
use crate::hash::Identifier;
use crate::rpc::dht::dht_node_server::DhtNodeServer;
use crate::NodeRef;

use super::client::{self, PeerClient};
use super::routing::Routing;
use super::service::DhtNodeService;
use super::store::Store;

/// A ring member. Routing state, the key/value store and the pending buffer
/// are three independent lock domains.
#[derive(Debug)]
pub struct Node {
    me: NodeRef,
    pub(super) config: NodeConfig,

    routing: Mutex<Routing>,
    pub(super) store: Store,
    pub(super) pending: Store,

    running: AtomicBool,
    joined: AtomicBool,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
}

impl Node {
    pub fn new(addr: impl Into<String>, config: NodeConfig) -> Self {
        let me = NodeRef::new(addr);
        let routing = Mutex::new(Routing::new(&me));

        Node {
            me,
            config,
            routing,
            store: Store::new(),
            pending: Store::new(),
            running: AtomicBool::new(false),
            joined: AtomicBool::new(false),
            shutdown: Mutex::new(None),
        }
    }

    pub fn me(&self) -> &NodeRef {
        &self.me
    }

    pub fn id(&self) -> &Identifier {
        &self.me.id
    }

    pub fn addr(&self) -> &str {
        &self.me.addr
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_joined(&self) -> bool {
        self.joined.load(Ordering::SeqCst)
    }

    pub(super) fn set_joined(&self, joined: bool) {
        self.joined.store(joined, Ordering::SeqCst);
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn pending(&self) -> &Store {
        &self.pending
    }

    pub(super) fn routing(&self) -> Result<MutexGuard<'_, Routing>> {
        Ok(self.routing.lock()?)
    }

    pub fn successor(&self) -> Result<NodeRef> {
        self.routing()?
            .successor()
            .cloned()
            .ok_or(Error::RingPartitioned)
    }

    pub fn successor_list(&self) -> Result<Vec<NodeRef>> {
        Ok(self.routing()?.successors.clone())
    }

    pub fn predecessor(&self) -> Result<Option<NodeRef>> {
        Ok(self.routing()?.predecessor.clone())
    }

    pub fn finger(&self, i: usize) -> Result<NodeRef> {
        self.routing()?
            .finger
            .get(i)
            .cloned()
            .ok_or_else(|| Error::Internal(format!("finger index {} out of {}", i, M)))
    }

    pub async fn ping(&self, addr: &str) -> bool {
        client::ping(addr, &self.config).await
    }

    pub(super) async fn connect(&self, node: &NodeRef) -> Result<PeerClient> {
        PeerClient::connect(&node.addr, &self.config).await
    }

    fn listen_addr(&self) -> Result<String> {
        let port = self
            .addr()
            .rsplit(':')
            .next()
            .and_then(|port| port.parse::<u16>().ok())
            .ok_or_else(|| Error::Initialization(format!("no port in address {}", self.addr())))?;
        Ok(format!("0.0.0.0:{}", port))
    }

    /// Opens the listening endpoint and starts the maintenance loop.
    pub async fn run(self: &Arc<Self>) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::Initialization(format!(
                "{} is already running",
                self.addr()
            )));
        }

        let listener = match self.bind().await {
            Ok(listener) => listener,
            Err(err) => {
                self.running.store(false, Ordering::SeqCst);
                error!("Failed to start node on {}: {}", self.addr(), err);
                return Err(err);
            }
        };

        let (tx, rx) = oneshot::channel::<()>();
        *self.shutdown.lock()? = Some(tx);

        let service = DhtNodeService::new(self.clone());
        let addr = self.addr().to_owned();
        tokio::spawn(async move {
            let result = Server::builder()
                .add_service(DhtNodeServer::new(service))
                .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                    rx.await.ok();
                })
                .await;
            match result {
                Ok(()) => info!("Stopped serving on {}", addr),
                Err(err) => error!("Server on {} failed: {}", addr, err),
            }
        });

        tokio::spawn(self.clone().maintain());

        info!("Node #{} serving on {}", self.id(), self.addr());
        Ok(())
    }

    async fn bind(&self) -> Result<TcpListener> {
        let listen_addr = self.listen_addr()?;
        TcpListener::bind(&listen_addr)
            .await
            .map_err(|err| Error::Initialization(format!("bind {}: {}", listen_addr, err)))
    }

    /// Stops the maintenance loop and closes the listening endpoint. Calls
    /// already in flight may still complete.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let shutdown = match self.shutdown.lock() {
            Ok(mut shutdown) => shutdown.take(),
            Err(err) => {
                error!("Shutdown handle of {} poisoned: {}", self.addr(), err);
                None
            }
        };
        if let Some(tx) = shutdown {
            let _ = tx.send(());
        }
    }

    /// Marks the node as stopped for the maintenance loop without closing the endpoint.
    pub(super) fn halt(&self) -> bool {
        self.running.swap(false, Ordering::SeqCst)
    }
}
