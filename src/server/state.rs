use std::collections::HashMap;
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;

pub type ClientId = u64;

/// Connected client sockets, kept so shutdown can unblock their sessions.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: Arc<Mutex<HashMap<ClientId, (SocketAddr, TcpStream)>>>,
    next_id: Arc<AtomicU64>,
}

impl ClientRegistry {
    fn clients(&self) -> MutexGuard<'_, HashMap<ClientId, (SocketAddr, TcpStream)>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Track a clone of `stream`. The session keeps the original.
    pub fn register(&self, stream: &TcpStream, peer: SocketAddr) -> Result<ClientId> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.clients().insert(id, (peer, stream.try_clone()?));
        tracing::debug!(client = id, %peer, "Client connected");
        Ok(id)
    }

    /// Remove `id` when the returned value is dropped, also during unwinding.
    pub fn registration(&self, id: ClientId) -> Registration {
        Registration {
            clients: self.clone(),
            id,
        }
    }

    pub fn remove(&self, id: ClientId) {
        if let Some((peer, _)) = self.clients().remove(&id) {
            tracing::debug!(client = id, %peer, "Client disconnected");
        }
    }

    pub fn len(&self) -> usize {
        self.clients().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shut down every tracked socket so blocked reads return.
    pub fn shutdown_all(&self) {
        for (id, (peer, stream)) in self.clients().drain() {
            if let Err(err) = stream.shutdown(Shutdown::Both) {
                tracing::debug!(client = id, %peer, "Socket already closed: {err}");
            }
        }
    }
}

/// Keeps a client registered for as long as its session runs.
pub struct Registration {
    clients: ClientRegistry,
    id: ClientId,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.clients.remove(self.id);
    }
}
