//! TCP front end: accepts clients and runs their sessions on the configured
//! execution strategy.

pub mod config;
pub mod protocol;
pub mod session;
mod state;
pub mod utils;

use std::future::Future;
use std::io::BufReader;
use std::mem;
use std::net::SocketAddr;
use std::thread::{self, JoinHandle};

use tokio::net::TcpListener;

use crate::error::Result;
use crate::work::{LeaderFollowers, Task};

pub use config::{Mode, ServerConfig};
pub use state::{ClientId, ClientRegistry, Registration};

enum Strategy {
    /// One thread per connection.
    Pipeline { sessions: Vec<JoinHandle<()>> },
    /// Every connection is one task on a shared pool.
    LeaderFollowers(LeaderFollowers),
}

impl Strategy {
    fn new(config: &ServerConfig) -> Result<Self> {
        Ok(match config.mode {
            Mode::Pipeline => Strategy::Pipeline {
                sessions: Vec::new(),
            },
            Mode::LeaderFollowers => Strategy::LeaderFollowers(LeaderFollowers::new(config.threads)?),
        })
    }

    fn dispatch(
        &mut self,
        id: ClientId,
        stream: std::net::TcpStream,
        peer: SocketAddr,
        clients: ClientRegistry,
    ) -> Result<()> {
        match self {
            Strategy::Pipeline { sessions } => {
                sessions.retain(|session| !session.is_finished());
                let session = thread::Builder::new()
                    .name(format!("session-{id}"))
                    .spawn(move || run_session(id, stream, peer, Mode::Pipeline, clients))?;
                sessions.push(session);
            }
            Strategy::LeaderFollowers(pool) => {
                pool.add_task(Task::new(move || {
                    run_session(id, stream, peer, Mode::LeaderFollowers, clients);
                    Ok(format!("session {id} with {peer} closed"))
                }))?;
            }
        }
        Ok(())
    }

    /// Wait for every session to finish. Blocking.
    fn stop(mut self) {
        match &mut self {
            Strategy::Pipeline { sessions } => {
                for session in mem::take(sessions) {
                    if session.join().is_err() {
                        tracing::error!("Session thread panicked");
                    }
                }
            }
            Strategy::LeaderFollowers(pool) => pool.stop(),
        }
    }
}

fn run_session(
    id: ClientId,
    stream: std::net::TcpStream,
    peer: SocketAddr,
    mode: Mode,
    clients: ClientRegistry,
) {
    let _registration = clients.registration(id);
    tracing::info!(client = id, %peer, %mode, "Session started");
    let result = stream
        .try_clone()
        .map_err(crate::error::Error::from)
        .and_then(|reader| session::serve(BufReader::new(reader), &stream, mode));
    match result {
        Ok(()) => tracing::info!(client = id, %peer, "Session finished"),
        Err(err) => tracing::warn!(client = id, %peer, "Session ended: {err}"),
    }
}

pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
}

impl Server {
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(config.address()).await?;
        tracing::info!(
            mode = %config.mode,
            threads = config.threads,
            "listening on {}",
            listener.local_addr()?
        );
        Ok(Self { listener, config })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Accept clients until `shutdown` resolves, then close every client
    /// connection and wait for the sessions to finish.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let Self { listener, config } = self;
        let clients = ClientRegistry::default();
        let mut strategy = Strategy::new(&config)?;
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        if let Err(err) = accept(&mut strategy, &clients, stream, peer) {
                            tracing::warn!(%peer, "Failed to start session: {err}");
                        }
                    }
                    Err(err) => tracing::warn!("Failed to accept connection: {err}"),
                },
            }
        }
        drop(listener);

        tracing::info!(clients = clients.len(), "Stopping server");
        clients.shutdown_all();
        tokio::task::spawn_blocking(move || strategy.stop())
            .await
            .map_err(anyhow::Error::from)?;
        tracing::info!("Server stopped");
        Ok(())
    }
}

fn accept(
    strategy: &mut Strategy,
    clients: &ClientRegistry,
    stream: tokio::net::TcpStream,
    peer: SocketAddr,
) -> Result<()> {
    let stream = stream.into_std()?;
    stream.set_nonblocking(false)?;
    let id = clients.register(&stream, peer)?;

    if let Err(err) = strategy.dispatch(id, stream, peer, clients.clone()) {
        clients.remove(id);
        return Err(err);
    }
    Ok(())
}
