use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// How the fake server answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behaviour {
    /// Real add/delete semantics.
    Normal,
    /// Answer every command with `SERVER_ERROR out of memory`.
    ServerError,
    /// Answer every command with a line memcached would never send.
    Garbage,
    /// Answer every command with a line that is not valid UTF-8.
    NotUtf8,
    /// Read commands but never answer.
    Silent,
}

/// Tiny in-process memcached that understands `add` and `delete`.
///
/// The server task is aborted when the value is dropped.
pub struct FakeMemcached {
    addr: SocketAddr,
    items: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    handle: JoinHandle<()>,
}

impl FakeMemcached {
    pub async fn start() -> Self {
        Self::start_with(Behaviour::Normal).await
    }

    pub async fn start_with(behaviour: Behaviour) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake memcached");
        let addr = listener.local_addr().expect("fake memcached address");
        let items: Arc<Mutex<HashMap<String, Vec<u8>>>> = Arc::default();

        let shared = Arc::clone(&items);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let items = Arc::clone(&shared);
                tokio::spawn(async move {
                    let _ = serve(stream, items, behaviour).await;
                });
            }
        });

        Self {
            addr,
            items,
            handle,
        }
    }

    /// `host:port` string suitable for the server list.
    pub fn endpoint(&self) -> String {
        self.addr.to_string()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.items.lock().unwrap().contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.items.lock().unwrap().get(key).cloned()
    }

    pub fn insert(&self, key: &str, value: &[u8]) {
        self.items
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
    }

    pub fn remove(&self, key: &str) {
        self.items.lock().unwrap().remove(key);
    }
}

impl Drop for FakeMemcached {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// An address nothing listens on.
pub async fn unused_endpoint() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("address");
    drop(listener);
    addr.to_string()
}

async fn serve(
    stream: TcpStream,
    items: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    behaviour: Behaviour,
) -> std::io::Result<()> {
    let mut stream = BufReader::new(stream);

    loop {
        let mut line = String::new();
        if stream.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        let parts: Vec<&str> = line.split_whitespace().collect();

        // Consume the data block of an `add` whatever we answer.
        let mut data = Vec::new();
        if parts.first() == Some(&"add") {
            let len: usize = parts.get(4).and_then(|n| n.parse().ok()).unwrap_or(0);
            data.resize(len + 2, 0);
            stream.read_exact(&mut data).await?;
            data.truncate(len);
        }

        let reply: &[u8] = match behaviour {
            Behaviour::Silent => continue,
            Behaviour::ServerError => b"SERVER_ERROR out of memory\r\n",
            Behaviour::Garbage => b"HELLO THERE\r\n",
            Behaviour::NotUtf8 => b"STO\xff\xfeRED\r\n",
            Behaviour::Normal => {
                let mut items = items.lock().unwrap();
                match parts.as_slice() {
                    ["add", key, ..] => {
                        if items.contains_key(*key) {
                            b"NOT_STORED\r\n"
                        } else {
                            items.insert(key.to_string(), data);
                            b"STORED\r\n"
                        }
                    }
                    ["delete", key] => {
                        if items.remove(*key).is_some() {
                            b"DELETED\r\n"
                        } else {
                            b"NOT_FOUND\r\n"
                        }
                    }
                    _ => b"ERROR\r\n",
                }
            }
        };

        stream.get_mut().write_all(reply).await?;
    }
}
