use crate::distributed::catcher::PageCatcher;
use crate::distributed::sync::SyncPoint;
use crate::distributed::wire::{read_frame, write_frame, Message};
use crate::distributed::NodeAddress;
use crate::Result;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::{JoinHandle, JoinSet};

/// TCP endpoint of a node, serving catch and sync requests
///
/// Binding and serving are separate steps so a node can learn its port
/// (when binding to port 0) before building its [`SyncPoint`].
pub struct NodeServer {
    listener: TcpListener,
    addr: NodeAddress,
}

impl NodeServer {
    pub async fn bind(addr: NodeAddress) -> Result<Self> {
        let listener = TcpListener::bind(addr.socket_addr()).await?;
        let addr = NodeAddress::from(listener.local_addr()?);
        tracing::info!("Node listening on {}", addr);
        Ok(Self { listener, addr })
    }

    pub fn local_addr(&self) -> NodeAddress {
        self.addr
    }

    /// Starts accepting connections in the background
    pub fn spawn(self, catcher: Arc<PageCatcher>, sync: Arc<SyncPoint>) -> ServerHandle {
        let addr = self.addr;
        let listener = self.listener;
        let task = tokio::spawn(async move {
            let mut connections = JoinSet::new();
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        tracing::trace!("Connection from {}", peer);
                        let catcher = catcher.clone();
                        let sync = sync.clone();
                        connections.spawn(async move {
                            if let Err(e) = serve_connection(stream, &catcher, &sync).await {
                                tracing::debug!("Connection from {} ended: {}", peer, e);
                            }
                        });
                    }
                    Err(e) => tracing::warn!("Accept failed on {}: {}", addr, e),
                }
                // reap finished connections
                while connections.try_join_next().is_some() {}
            }
        });
        ServerHandle { addr, task }
    }
}

/// Running server; stops accepting when shut down or dropped
pub struct ServerHandle {
    addr: NodeAddress,
    task: JoinHandle<()>,
}

impl ServerHandle {
    pub fn addr(&self) -> NodeAddress {
        self.addr
    }

    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve_connection(
    mut stream: TcpStream,
    catcher: &PageCatcher,
    sync: &SyncPoint,
) -> Result<()> {
    stream.set_nodelay(true)?;
    while let Some(request) = read_frame(&mut stream).await? {
        let reply = match request {
            Message::Catch { page } => match catcher.catch(&page) {
                Ok(()) => Message::Ack,
                Err(e) => Message::Error {
                    message: e.to_string(),
                },
            },
            Message::Sync { round, from } => {
                tracing::trace!("Sync round {} from {}", round, from);
                sync.receive(round, from);
                Message::Ack
            }
            other => Message::Error {
                message: format!("unexpected request {:?}", other),
            },
        };
        write_frame(&mut stream, &reply).await?;
    }
    Ok(())
}
