//! Remote shared store client
//!
//! Blocking client for a `StoreService`. One TCP connection per client,
//! guarded by a mutex, so concurrent calls through the same `RemoteStore`
//! are serialized. A coordinator blocked in `await_zero` holds the
//! connection for at most the requested timeout.
//!
//! A call that fails mid-exchange (I/O error, read timeout, bad frame) may
//! leave a late response on the socket, so the connection is dropped and
//! every later call fails with `StoreError::Remote`. Reconnect to recover.

use super::protocol::*;
use super::{SharedStore, StoreError, StoreResult};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Mutex;
use std::time::Duration;

/// Extra read-timeout slack on top of a server-side wait
const AWAIT_SLACK: Duration = Duration::from_secs(5);

/// Shared store reached over TCP
#[derive(Debug)]
pub struct RemoteStore {
    /// `None` once an exchange failed and the stream can no longer be trusted
    stream: Mutex<Option<TcpStream>>,

    /// Address string as given to `connect`, for diagnostics
    address: String,
}

impl RemoteStore {
    /// Connect to a store service and perform the version handshake
    pub fn connect(address: &str) -> StoreResult<Self> {
        let addr = address
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| StoreError::Remote(format!("no address resolved for {}", address)))?;

        let mut stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;

        write_frame_blocking(
            &mut stream,
            &Request::Hello {
                protocol_version: PROTOCOL_VERSION,
            },
        )?;
        match read_frame_blocking::<Response, _>(&mut stream)? {
            Response::Welcome { protocol_version } if protocol_version == PROTOCOL_VERSION => {}
            Response::Welcome { protocol_version } => {
                return Err(StoreError::ProtocolMismatch {
                    local: PROTOCOL_VERSION,
                    remote: protocol_version,
                })
            }
            Response::Error { kind, message } => return Err(error_from_response(kind, message)),
            other => {
                return Err(StoreError::Remote(format!("expected WELCOME, got {:?}", other)))
            }
        }

        Ok(Self {
            stream: Mutex::new(Some(stream)),
            address: address.to_string(),
        })
    }

    /// Address this client was connected with
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Send one request and read its response
    fn call(&self, request: &Request, read_timeout: Option<Duration>) -> StoreResult<Response> {
        let mut guard = self
            .stream
            .lock()
            .map_err(|_| StoreError::Remote("connection lock poisoned".to_string()))?;
        let stream = guard.as_mut().ok_or_else(|| {
            StoreError::Remote(format!(
                "connection to {} was closed after an earlier failure",
                self.address
            ))
        })?;

        let result = exchange(stream, request, read_timeout);
        if matches!(result, Err(StoreError::Io(_)) | Err(StoreError::Codec(_))) {
            *guard = None;
        }

        match result? {
            Response::Error { kind, message } => Err(error_from_response(kind, message)),
            response => Ok(response),
        }
    }
}

/// Write one request and read one response frame
fn exchange(
    stream: &mut TcpStream,
    request: &Request,
    read_timeout: Option<Duration>,
) -> StoreResult<Response> {
    stream.set_read_timeout(read_timeout)?;
    write_frame_blocking(stream, request)?;
    read_frame_blocking(stream)
}

fn unexpected(response: Response) -> StoreError {
    StoreError::Remote(format!("unexpected response: {:?}", response))
}

impl SharedStore for RemoteStore {
    fn put_if_absent(&self, map: &str, key: &str, value: &[u8]) -> StoreResult<bool> {
        let request = Request::PutIfAbsent {
            map: map.to_string(),
            key: key.to_string(),
            value: value.to_vec(),
        };
        match self.call(&request, None)? {
            Response::Inserted(inserted) => Ok(inserted),
            other => Err(unexpected(other)),
        }
    }

    fn try_init_counter(&self, name: &str, count: u64) -> StoreResult<bool> {
        let request = Request::InitCounter {
            name: name.to_string(),
            count,
        };
        match self.call(&request, None)? {
            Response::Inserted(inserted) => Ok(inserted),
            other => Err(unexpected(other)),
        }
    }

    fn count_down(&self, name: &str) -> StoreResult<u64> {
        match self.call(&Request::CountDown { name: name.to_string() }, None)? {
            Response::Count(remaining) => Ok(remaining),
            other => Err(unexpected(other)),
        }
    }

    fn count(&self, name: &str) -> StoreResult<u64> {
        match self.call(&Request::GetCount { name: name.to_string() }, None)? {
            Response::Count(count) => Ok(count),
            other => Err(unexpected(other)),
        }
    }

    fn await_zero(&self, name: &str, timeout: Duration) -> StoreResult<bool> {
        let request = Request::AwaitZero {
            name: name.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        };
        match self.call(&request, Some(timeout + AWAIT_SLACK))? {
            Response::Reached(reached) => Ok(reached),
            other => Err(unexpected(other)),
        }
    }

    fn append(&self, list: &str, item: Vec<u8>) -> StoreResult<()> {
        let request = Request::Append {
            list: list.to_string(),
            item,
        };
        match self.call(&request, None)? {
            Response::Ack => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    fn snapshot(&self, list: &str) -> StoreResult<Vec<Vec<u8>>> {
        match self.call(&Request::Snapshot { list: list.to_string() }, None)? {
            Response::Items(items) => Ok(items),
            other => Err(unexpected(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, StoreService};
    use std::net::SocketAddr;
    use std::sync::{mpsc, Arc};
    use std::thread;

    /// Start a service on a background runtime and return its address
    fn spawn_service() -> (SocketAddr, Arc<InMemoryStore>) {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async move {
                let service = StoreService::bind("127.0.0.1:0", Arc::new(InMemoryStore::new()))
                    .await
                    .unwrap();
                tx.send((service.local_addr().unwrap(), service.store())).unwrap();
                service.run().await.unwrap();
            });
        });
        rx.recv().unwrap()
    }

    #[test]
    fn test_remote_matches_backing_store() {
        let (addr, backing) = spawn_service();
        let store = RemoteStore::connect(&addr.to_string()).unwrap();
        assert_eq!(store.address(), addr.to_string());

        assert!(store.put_if_absent("flags", "run", b"1").unwrap());
        assert!(!store.put_if_absent("flags", "run", b"1").unwrap());

        assert!(store.try_init_counter("run", 2).unwrap());
        assert!(!store.try_init_counter("run", 5).unwrap());
        assert_eq!(store.count_down("run").unwrap(), 1);
        assert_eq!(backing.count("run").unwrap(), 1);

        store.append("results", vec![7, 8]).unwrap();
        assert_eq!(store.snapshot("results").unwrap(), vec![vec![7, 8]]);
        assert!(store.snapshot("empty").unwrap().is_empty());
    }

    #[test]
    fn test_remote_unknown_counter() {
        let (addr, _backing) = spawn_service();
        let store = RemoteStore::connect(&addr.to_string()).unwrap();

        assert!(matches!(store.count("missing"), Err(StoreError::UnknownCounter(name)) if name == "missing"));
    }

    #[test]
    fn test_remote_await_zero_wakes_on_other_client() {
        let (addr, _backing) = spawn_service();
        let coordinator = RemoteStore::connect(&addr.to_string()).unwrap();
        coordinator.try_init_counter("run", 1).unwrap();

        let worker_addr = addr.to_string();
        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            let store = RemoteStore::connect(&worker_addr).unwrap();
            store.count_down("run").unwrap()
        });

        assert!(coordinator.await_zero("run", Duration::from_secs(10)).unwrap());
        assert_eq!(worker.join().unwrap(), 0);
    }

    #[test]
    fn test_remote_await_zero_timeout() {
        let (addr, _backing) = spawn_service();
        let store = RemoteStore::connect(&addr.to_string()).unwrap();
        store.try_init_counter("run", 1).unwrap();

        assert!(!store.await_zero("run", Duration::from_millis(20)).unwrap());
        assert_eq!(store.count("run").unwrap(), 1);
    }

    #[test]
    fn test_failed_exchange_closes_connection() {
        use std::io::Write;
        use std::net::TcpListener;

        // Handshakes, then answers the first request with a bad length prefix
        // followed by a well-formed frame that must never be read as a reply
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let _: Request = read_frame_blocking(&mut stream).unwrap();
            write_frame_blocking(
                &mut stream,
                &Response::Welcome {
                    protocol_version: PROTOCOL_VERSION,
                },
            )
            .unwrap();

            let _: Request = read_frame_blocking(&mut stream).unwrap();
            stream
                .write_all(&((MAX_FRAME_LEN + 1) as u32).to_le_bytes())
                .unwrap();
            write_frame_blocking(&mut stream, &Response::Count(7)).unwrap();
        });

        let store = RemoteStore::connect(&addr.to_string()).unwrap();
        assert!(matches!(store.count("run"), Err(StoreError::Codec(_))));
        assert!(matches!(store.count("run"), Err(StoreError::Remote(_))));

        server.join().unwrap();
    }
}
