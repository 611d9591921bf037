use crate::distributed::catcher::PageCatcher;
use crate::distributed::client::PeerClient;
use crate::distributed::wire::Message;
use crate::distributed::{NodeAddress, PageRouter};
use crate::page::Page;
use crate::store::{PageSink, PageStore};
use crate::{FrontierError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A local store that forwards pages owned by other nodes
///
/// Pages routed to this node are written locally. Pages routed elsewhere are
/// shipped to the owner's catcher; if that fails the page is kept locally
/// with `is_local` cleared rather than lost.
pub struct DistributedPageStore {
    local: Arc<PageStore>,
    catcher: Arc<PageCatcher>,
    router: Arc<dyn PageRouter>,
    me: usize,
    /// One client per node, `None` at this node's own index
    peers: Vec<Option<PeerClient>>,
    shipped: AtomicU64,
    fallbacks: AtomicU64,
}

impl DistributedPageStore {
    /// Wraps `local`, which must already be open for writing
    ///
    /// `nodes` is the cluster in router order and must contain `me`.
    pub fn new(
        local: Arc<PageStore>,
        catcher: Arc<PageCatcher>,
        router: Arc<dyn PageRouter>,
        me: NodeAddress,
        nodes: &[NodeAddress],
        timeout: Duration,
    ) -> Result<Self> {
        let index = nodes.iter().position(|n| *n == me).ok_or_else(|| {
            FrontierError::Config(crate::ConfigError::Validation(format!(
                "node {} is not in the cluster list",
                me
            )))
        })?;
        let peers = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (i != index).then(|| PeerClient::new(*node, timeout)))
            .collect();

        Ok(Self {
            local,
            catcher,
            router,
            me: index,
            peers,
            shipped: AtomicU64::new(0),
            fallbacks: AtomicU64::new(0),
        })
    }

    pub fn local(&self) -> &PageStore {
        &self.local
    }

    /// Pages successfully handed to other nodes
    pub fn shipped(&self) -> u64 {
        self.shipped.load(Ordering::SeqCst)
    }

    /// Pages kept locally because their owner was unreachable
    pub fn fallbacks(&self) -> u64 {
        self.fallbacks.load(Ordering::SeqCst)
    }

    /// Merges caught pages into the local store, then closes it
    ///
    /// Call only after every node has passed the cycle's sync point, so no
    /// more pages for this cycle are in flight.
    pub fn close(&self) -> Result<()> {
        let caught = self.catcher.swap()?;
        let mut merged = 0u64;
        for page in caught.iter()? {
            self.local.add_page(&page?)?;
            merged += 1;
        }
        caught.destroy()?;
        self.local.close()?;
        tracing::info!(
            "Closed distributed store: {} caught pages merged, {} shipped, {} kept after transport failure",
            merged,
            self.shipped(),
            self.fallbacks()
        );
        Ok(())
    }
}

#[async_trait]
impl PageSink for DistributedPageStore {
    async fn add_page(&self, mut page: Page) -> Result<()> {
        page.is_local = true;
        let owner = self.router.route(&page);

        let peer = match self.peers.get(owner) {
            Some(Some(peer)) if owner != self.me => peer,
            _ => {
                self.local.add_page(&page)?;
                return Ok(());
            }
        };

        let message = Message::Catch { page };
        match peer.expect_ack(&message).await {
            Ok(()) => {
                self.shipped.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                let Message::Catch { mut page } = message else {
                    return Err(e);
                };
                tracing::warn!("Keeping {} locally, {} unreachable: {}", page.url, peer.addr(), e);
                page.is_local = false;
                self.fallbacks.fetch_add(1, Ordering::Relaxed);
                self.local.add_page(&page)?;
                Ok(())
            }
        }
    }
}
