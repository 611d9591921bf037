//! Several frontier engines sharing one logical frontier
//!
//! Each node owns the pages its [`PageRouter`] maps to it:
//! - [`DistributedPageStore`] ships pages owned elsewhere to the owner's
//!   [`PageCatcher`] and keeps its own pages locally
//! - [`NodeServer`] exposes the catcher and the [`SyncPoint`] over TCP
//! - [`SyncPoint`] is an all-to-all barrier aligning cycle boundaries
//! - [`Cluster`] bundles the pieces a crawl cycle needs
//!
//! Messages are length-prefixed JSON frames, see [`wire`].

mod catcher;
mod client;
mod cluster;
mod server;
mod store;
mod sync;
pub mod wire;

pub use catcher::{CatcherState, PageCatcher};
pub use client::PeerClient;
pub use cluster::Cluster;
pub use server::{NodeServer, ServerHandle};
pub use store::DistributedPageStore;
pub use sync::SyncPoint;

use crate::page::Page;
use crate::UrlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

/// Address of one frontier engine instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeAddress {
    pub ip: IpAddr,
    pub port: u16,
}

impl NodeAddress {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

impl From<SocketAddr> for NodeAddress {
    fn from(addr: SocketAddr) -> Self {
        Self::new(addr.ip(), addr.port())
    }
}

impl FromStr for NodeAddress {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<SocketAddr>()
            .map(Self::from)
            .map_err(|e| UrlError::Malformed(format!("node address '{}': {}", s, e)))
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.socket_addr())
    }
}

/// Decides which node owns a page
pub trait PageRouter: Send + Sync {
    /// Index into the node list
    fn route(&self, page: &Page) -> usize;
}

/// Routes by URL hash modulo the node count
#[derive(Debug, Clone, Copy)]
pub struct HashRouter {
    nodes: usize,
}

impl HashRouter {
    pub fn new(nodes: usize) -> Self {
        Self {
            nodes: nodes.max(1),
        }
    }
}

impl PageRouter for HashRouter {
    fn route(&self, page: &Page) -> usize {
        (page.url_hash.prefix_u64() % self.nodes as u64) as usize
    }
}
