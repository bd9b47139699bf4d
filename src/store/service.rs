//! Store service
//!
//! Exposes an `InMemoryStore` over TCP so that the coordinator and every
//! external client can run as separate processes. The service:
//! - Accepts any number of client connections, one task each
//! - Checks the protocol version on the first message
//! - Applies each request to the backing store and answers it
//!
//! `AwaitZero` requests block on the store's condvar, so they are moved to
//! the blocking thread pool instead of stalling the connection's worker.

use super::memory::InMemoryStore;
use super::protocol::*;
use super::{SharedStore, StoreError, StoreResult};
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// TCP front end for a shared in-memory store
pub struct StoreService {
    listener: TcpListener,

    /// Backing store shared by all connections
    store: Arc<InMemoryStore>,

    /// Node identifier (hostname)
    node_id: String,
}

impl StoreService {
    /// Bind the service to `addr` (e.g. `0.0.0.0:9999`, or port 0 for any)
    pub async fn bind(addr: &str, store: Arc<InMemoryStore>) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind store service to {}", addr))?;

        Ok(Self {
            listener,
            store,
            node_id: get_node_id(),
        })
    }

    /// Address the service is actually listening on
    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener
            .local_addr()
            .context("Failed to read store service address")
    }

    /// Handle to the backing store
    pub fn store(&self) -> Arc<InMemoryStore> {
        Arc::clone(&self.store)
    }

    /// Accept connections until the task is dropped
    pub async fn run(self) -> Result<()> {
        info!(
            node = %self.node_id,
            addr = %self.local_addr()?,
            "Store service listening"
        );

        loop {
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .context("Failed to accept connection")?;

            debug!(%peer, "Client connected");
            let store = Arc::clone(&self.store);
            tokio::spawn(async move {
                match handle_connection(stream, store).await {
                    Ok(()) => debug!(%peer, "Client disconnected"),
                    Err(e) => warn!(%peer, error = %e, "Client connection failed"),
                }
            });
        }
    }
}

/// Serve one client until it hangs up
async fn handle_connection(mut stream: TcpStream, store: Arc<InMemoryStore>) -> StoreResult<()> {
    match read_frame::<Request>(&mut stream).await? {
        Request::Hello { protocol_version } if protocol_version == PROTOCOL_VERSION => {
            write_frame(
                &mut stream,
                &Response::Welcome {
                    protocol_version: PROTOCOL_VERSION,
                },
            )
            .await?;
        }
        Request::Hello { protocol_version } => {
            let err = StoreError::ProtocolMismatch {
                local: PROTOCOL_VERSION,
                remote: protocol_version,
            };
            write_frame(&mut stream, &Response::from_error(&err)).await?;
            return Err(err);
        }
        other => {
            let err = StoreError::Remote(format!("expected HELLO, got {:?}", other));
            write_frame(&mut stream, &Response::from_error(&err)).await?;
            return Err(err);
        }
    }

    loop {
        let request = match read_frame::<Request>(&mut stream).await {
            Ok(request) => request,
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Err(e) => return Err(e),
        };

        let response = dispatch(&store, request).await;
        write_frame(&mut stream, &response).await?;
    }
}

/// Apply one request to the store
async fn dispatch(store: &Arc<InMemoryStore>, request: Request) -> Response {
    let result = match request {
        Request::Hello { .. } => Err(StoreError::Remote("duplicate HELLO".to_string())),
        Request::PutIfAbsent { map, key, value } => {
            store.put_if_absent(&map, &key, &value).map(Response::Inserted)
        }
        Request::InitCounter { name, count } => {
            store.try_init_counter(&name, count).map(Response::Inserted)
        }
        Request::CountDown { name } => store.count_down(&name).map(Response::Count),
        Request::GetCount { name } => store.count(&name).map(Response::Count),
        Request::AwaitZero { name, timeout_ms } => {
            let store = Arc::clone(store);
            tokio::task::spawn_blocking(move || {
                store.await_zero(&name, Duration::from_millis(timeout_ms))
            })
            .await
            .map_err(|e| StoreError::Remote(format!("wait task failed: {}", e)))
            .and_then(|reached| reached)
            .map(Response::Reached)
        }
        Request::Append { list, item } => store.append(&list, item).map(|()| Response::Ack),
        Request::Snapshot { list } => store.snapshot(&list).map(Response::Items),
    };

    result.unwrap_or_else(|e| Response::from_error(&e))
}

/// Host name of this node, or "unknown"
pub(crate) fn get_node_id() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
