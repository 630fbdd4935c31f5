use std::future::Future;
use std::time::Duration;

use log::debug;
use tokio::net::TcpStream;
use tonic::transport::{Channel, Endpoint};
use tonic::Request;

use crate::config::NodeConfig;
use crate::error::{Error, Result};
use crate::hash::Identifier;
use crate::rpc::dht::dht_node_client::DhtNodeClient;
use crate::rpc::dht::{Entries as EntriesMsg, Entry, Id, Key, Peer, Peers};
use crate::NodeRef;

use super::store::Entries;

/// Runs `op` up to `attempts` times, sleeping `backoff` between failed attempts,
/// and returns the last error once the budget is spent.
pub async fn retry<T, F, Fut>(attempts: usize, backoff: Duration, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_err = Error::Internal("retry budget of zero attempts".into());
    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                debug!("Attempt {}/{} failed: {}", attempt, attempts, err);
                last_err = err;
                if attempt < attempts {
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
    Err(last_err)
}

fn endpoint(addr: &str, connect_timeout: Duration, rpc_timeout: Duration) -> Result<Endpoint> {
    let endpoint = Endpoint::from_shared(format!("http://{}", addr))
        .map_err(|_| Error::Parse(format!("invalid peer address {}", addr)))?;
    Ok(endpoint.connect_timeout(connect_timeout).timeout(rpc_timeout))
}

/// Liveness probe: a peer is alive if a TCP connection to it can be opened
/// within `ping_timeout` in one of `retry_attempts` tries.
pub async fn ping(addr: &str, config: &NodeConfig) -> bool {
    if addr.is_empty() {
        return false;
    }
    for _ in 0..config.retry_attempts {
        match tokio::time::timeout(config.ping_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => return true,
            _ => continue,
        }
    }
    debug!("Ping to {} failed", addr);
    false
}

/// A connection to a remote ring member.
#[derive(Debug, Clone)]
pub struct PeerClient {
    addr: String,
    client: DhtNodeClient<Channel>,
}

impl PeerClient {
    pub async fn connect(addr: &str, config: &NodeConfig) -> Result<Self> {
        let endpoint = endpoint(addr, config.ping_timeout * 2, config.rpc_timeout)?;
        let endpoint = &endpoint;
        let channel = retry(config.retry_attempts, config.retry_backoff, || async move {
            Ok::<_, Error>(endpoint.connect().await?)
        })
        .await
        .map_err(|_| Error::Connection(addr.to_owned()))?;

        Ok(PeerClient {
            addr: addr.to_owned(),
            client: DhtNodeClient::new(channel),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub async fn find_successor(&mut self, id: &Identifier) -> Result<NodeRef> {
        let response = self.client.find_successor(Id::from(id)).await?;
        NodeRef::try_from(response.into_inner())
    }

    pub async fn get_predecessor(&mut self) -> Result<Option<NodeRef>> {
        let response = self.client.get_predecessor(Request::new(())).await?;
        response
            .into_inner()
            .peer
            .map(NodeRef::try_from)
            .transpose()
    }

    pub async fn notify(&mut self, node: &NodeRef) -> Result<()> {
        self.client.notify(Peer::from(node)).await?;
        Ok(())
    }

    pub async fn update_successor(&mut self, node: &NodeRef) -> Result<()> {
        self.client.update_successor(Peer::from(node)).await?;
        Ok(())
    }

    pub async fn update_predecessor(&mut self, node: &NodeRef) -> Result<()> {
        self.client.update_predecessor(Peer::from(node)).await?;
        Ok(())
    }

    pub async fn set_successor_tail(&mut self, tail: &[NodeRef]) -> Result<()> {
        self.client.set_successor_tail(Peers::from(tail)).await?;
        Ok(())
    }

    pub async fn local_put(&mut self, key: &str, value: &str) -> Result<()> {
        let entry = Entry {
            key: key.to_owned(),
            value: value.to_owned(),
        };
        self.client.local_put(entry).await?;
        Ok(())
    }

    pub async fn local_get(&mut self, key: &str) -> Result<String> {
        let response = self.client.local_get(Key { key: key.to_owned() }).await?;
        Ok(response.into_inner().value)
    }

    pub async fn local_delete(&mut self, key: &str) -> Result<()> {
        self.client.local_delete(Key { key: key.to_owned() }).await?;
        Ok(())
    }

    pub async fn extract_data(&mut self, id: &Identifier) -> Result<Entries> {
        let response = self.client.extract_data(Id::from(id)).await?;
        Ok(response.into_inner().entries)
    }

    pub async fn import_data(&mut self, entries: Entries) -> Result<()> {
        self.client.import_data(EntriesMsg { entries }).await?;
        Ok(())
    }

    pub async fn get_all_data(&mut self) -> Result<Entries> {
        let response = self.client.get_all_data(Request::new(())).await?;
        Ok(response.into_inner().entries)
    }

    pub async fn set_pending_buffer(&mut self, entries: Entries) -> Result<()> {
        self.client.set_pending_buffer(EntriesMsg { entries }).await?;
        Ok(())
    }

    pub async fn push_pending_entry(&mut self, key: &str, value: &str) -> Result<()> {
        let entry = Entry {
            key: key.to_owned(),
            value: value.to_owned(),
        };
        self.client.push_pending_entry(entry).await?;
        Ok(())
    }

    pub async fn delete_pending_entry(&mut self, key: &str) -> Result<()> {
        self.client
            .delete_pending_entry(Key { key: key.to_owned() })
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    use super::*;

    #[tokio::test]
    async fn test_retry_stops_at_first_success() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let value = retry(5, Duration::from_millis(1), || async move {
            match calls.fetch_add(1, Ordering::SeqCst) {
                0 | 1 => Err(Error::Connection("peer".into())),
                n => Ok(n),
            }
        })
        .await;

        assert_eq!(value.ok(), Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_returns_last_error() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let started = Instant::now();
        let result: Result<()> = retry(3, Duration::from_millis(20), || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Err(Error::Remote(format!("attempt {}", n)))
        })
        .await;

        assert!(matches!(result, Err(Error::Remote(msg)) if msg == "attempt 2"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_ping_closed_port_fails() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let config = NodeConfig::default();

        assert!(ping(&addr, &config).await);
        drop(listener);
        assert!(!ping(&addr, &config).await);
    }

    #[tokio::test]
    async fn test_connect_to_dead_peer_is_connection_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        let config = NodeConfig {
            retry_backoff: Duration::from_millis(1),
            ..NodeConfig::default()
        };

        match PeerClient::connect(&addr, &config).await {
            Err(Error::Connection(peer)) => assert_eq!(peer, addr),
            other => panic!("expected a connection error, got {:?}", other.map(|c| c.addr().to_owned())),
        }
    }
}
