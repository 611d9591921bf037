use crate::config::DistributedConfig;
use crate::distributed::catcher::PageCatcher;
use crate::distributed::server::{NodeServer, ServerHandle};
use crate::distributed::store::DistributedPageStore;
use crate::distributed::sync::SyncPoint;
use crate::distributed::{HashRouter, NodeAddress, PageRouter};
use crate::store::PageStore;
use crate::{ConfigError, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// This node's view of the cluster
///
/// Holds the running catcher and the sync point; the cycle driver uses it to
/// wrap each raw store and to align cycle boundaries.
pub struct Cluster {
    me: NodeAddress,
    nodes: Vec<NodeAddress>,
    timeout: Duration,
    catcher: Arc<PageCatcher>,
    sync: Arc<SyncPoint>,
    router: Arc<dyn PageRouter>,
}

impl Cluster {
    /// Starts a catcher under `catcher_dir` for node `me` of `nodes`
    pub fn new(
        me: NodeAddress,
        nodes: Vec<NodeAddress>,
        catcher_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Result<Self> {
        if !nodes.contains(&me) {
            return Err(ConfigError::Validation(format!(
                "node {} is not in the cluster list",
                me
            ))
            .into());
        }

        let catcher = Arc::new(PageCatcher::new(catcher_dir));
        catcher.start()?;
        let sync = Arc::new(SyncPoint::new(me, nodes.clone(), timeout));
        let router: Arc<dyn PageRouter> = Arc::new(HashRouter::new(nodes.len()));

        Ok(Self {
            me,
            nodes,
            timeout,
            catcher,
            sync,
            router,
        })
    }

    /// Binds the configured listen address and starts serving
    pub async fn bind(
        config: &DistributedConfig,
        catcher_dir: impl Into<PathBuf>,
    ) -> Result<(Self, ServerHandle)> {
        let me: NodeAddress = config.listen.parse()?;
        let nodes = config
            .nodes
            .iter()
            .map(|n| n.parse::<NodeAddress>())
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let server = NodeServer::bind(me).await?;
        let cluster = Self::new(
            me,
            nodes,
            catcher_dir,
            Duration::from_secs(config.sync_timeout_secs),
        )?;
        let handle = cluster.serve(server);
        Ok((cluster, handle))
    }

    /// Serves this node's catcher and sync point on `server`
    pub fn serve(&self, server: NodeServer) -> ServerHandle {
        server.spawn(self.catcher.clone(), self.sync.clone())
    }

    pub fn me(&self) -> NodeAddress {
        self.me
    }

    pub fn nodes(&self) -> &[NodeAddress] {
        &self.nodes
    }

    pub fn catcher(&self) -> &PageCatcher {
        &self.catcher
    }

    /// Wraps a raw store open for writing
    pub fn wrap(&self, local: Arc<PageStore>) -> Result<DistributedPageStore> {
        DistributedPageStore::new(
            local,
            self.catcher.clone(),
            self.router.clone(),
            self.me,
            &self.nodes,
            self.timeout,
        )
    }

    /// Waits until every node has finished `round`
    pub async fn sync(&self, round: u64) -> Result<()> {
        self.sync.sync(round).await
    }

    /// Stops the catcher, discarding anything caught after the last cycle
    pub fn shutdown(&self) -> Result<()> {
        if let Some(leftover) = self.catcher.stop()? {
            if leftover.size() > 0 {
                tracing::warn!(
                    "Discarding {} pages caught after the last cycle",
                    leftover.size()
                );
            }
            leftover.destroy()?;
        }
        Ok(())
    }
}
