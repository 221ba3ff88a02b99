// src/store/memcache.rs

//! `LockStore` backed by one or more memcached servers.

use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, trace};

use super::protocol::{self, Reply};
use super::{AddOutcome, DeleteOutcome, LockStore, StoreError, StoreFuture, validate_key};

/// memcached client holding just enough protocol for the lock.
///
/// Every operation opens its own connection, sends one command and reads
/// one reply line.
#[derive(Debug, Clone)]
pub struct MemcacheStore {
    servers: Vec<String>,
    timeout: Duration,
}

impl MemcacheStore {
    pub fn new(servers: Vec<String>, timeout: Duration) -> Self {
        Self { servers, timeout }
    }

    pub fn servers(&self) -> &[String] {
        &self.servers
    }

    /// Pick the server responsible for `key`.
    ///
    /// Hashing the key over the endpoint list means every host configured
    /// with the same list contends on the same server.
    pub fn server_for(&self, key: &str) -> Result<&str, StoreError> {
        match self.servers.len() {
            0 => Err(StoreError::NoServers),
            1 => Ok(&self.servers[0]),
            n => {
                let digest = blake3::hash(key.as_bytes());
                let mut head = [0u8; 8];
                head.copy_from_slice(&digest.as_bytes()[..8]);
                let idx = (u64::from_le_bytes(head) % n as u64) as usize;
                Ok(&self.servers[idx])
            }
        }
    }

    async fn roundtrip(
        &self,
        server: &str,
        op: &'static str,
        request: &[u8],
    ) -> Result<Reply, StoreError> {
        let stream = timeout(self.timeout, TcpStream::connect(server))
            .await
            .map_err(|_| StoreError::Timeout {
                server: server.to_string(),
                op: "connect",
                timeout: self.timeout,
            })?
            .map_err(|source| StoreError::Connect {
                server: server.to_string(),
                source,
            })?;

        let exchange = async {
            let mut stream = BufReader::new(stream);
            stream.get_mut().write_all(request).await?;
            stream.get_mut().flush().await?;

            let mut line = Vec::new();
            if stream.read_until(b'\n', &mut line).await? == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed before reply",
                ));
            }
            Ok(line)
        };

        let line = timeout(self.timeout, exchange)
            .await
            .map_err(|_| StoreError::Timeout {
                server: server.to_string(),
                op,
                timeout: self.timeout,
            })?
            .map_err(|source| StoreError::Io {
                server: server.to_string(),
                op,
                source,
            })?;

        trace!(
            server,
            op,
            reply = String::from_utf8_lossy(&line).trim_end(),
            "memcache reply"
        );
        Ok(protocol::parse_reply(&line))
    }
}

fn unexpected(server: &str, op: &'static str, reply: Reply) -> StoreError {
    match reply {
        Reply::Error(message) => StoreError::Server {
            server: server.to_string(),
            op,
            message,
        },
        other => StoreError::Protocol {
            server: server.to_string(),
            op,
            response: format!("{other:?}"),
        },
    }
}

impl LockStore for MemcacheStore {
    fn add<'a>(&'a self, key: &'a str, value: &'a [u8]) -> StoreFuture<'a, AddOutcome> {
        Box::pin(async move {
            validate_key(key)?;
            let server = self.server_for(key)?;
            debug!(key, server, "memcache add");

            match self.roundtrip(server, "add", &protocol::encode_add(key, value)).await? {
                Reply::Stored => Ok(AddOutcome::Created),
                Reply::NotStored => Ok(AddOutcome::AlreadyExists),
                other => Err(unexpected(server, "add", other)),
            }
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> StoreFuture<'a, DeleteOutcome> {
        Box::pin(async move {
            validate_key(key)?;
            let server = self.server_for(key)?;
            debug!(key, server, "memcache delete");

            match self.roundtrip(server, "delete", &protocol::encode_delete(key)).await? {
                Reply::Deleted => Ok(DeleteOutcome::Deleted),
                Reply::NotFound => Ok(DeleteOutcome::NotFound),
                other => Err(unexpected(server, "delete", other)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(servers: &[&str]) -> MemcacheStore {
        MemcacheStore::new(
            servers.iter().map(|s| s.to_string()).collect(),
            Duration::from_millis(100),
        )
    }

    #[test]
    fn server_selection_is_stable() {
        let s = store(&["a:11211", "b:11211", "c:11211"]);
        let first = s.server_for("mutex-default").unwrap().to_string();
        for _ in 0..10 {
            assert_eq!(s.server_for("mutex-default").unwrap(), first);
        }
    }

    #[test]
    fn single_server_always_selected() {
        let s = store(&["only:11211"]);
        assert_eq!(s.server_for("anything").unwrap(), "only:11211");
    }

    #[test]
    fn no_servers_is_an_error() {
        let s = store(&[]);
        assert!(matches!(s.server_for("k"), Err(StoreError::NoServers)));
    }
}
