use crate::distributed::client::PeerClient;
use crate::distributed::wire::Message;
use crate::distributed::NodeAddress;
use crate::{FrontierError, Result};
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Delay between attempts to reach a peer that is not up yet
const RESEND_DELAY: Duration = Duration::from_millis(200);

/// All-to-all barrier between nodes
///
/// Each call to [`sync`](Self::sync) announces this node to every peer and
/// waits until every node (itself included) has announced the same round.
/// Announcements for later rounds that arrive early are kept; late ones for
/// a round that already completed are dropped.
pub struct SyncPoint {
    me: NodeAddress,
    nodes: Vec<NodeAddress>,
    timeout: Duration,
    received: Mutex<Rounds>,
    notify: Notify,
}

#[derive(Default)]
struct Rounds {
    /// Highest round this node has passed
    completed: Option<u64>,
    heard: HashMap<u64, BTreeSet<NodeAddress>>,
}

impl Rounds {
    fn is_stale(&self, round: u64) -> bool {
        self.completed.is_some_and(|done| round <= done)
    }

    fn complete(&mut self, round: u64) {
        let done = self.completed.map_or(round, |done| done.max(round));
        self.completed = Some(done);
        self.heard.retain(|r, _| *r > done);
    }
}

impl SyncPoint {
    pub fn new(me: NodeAddress, nodes: Vec<NodeAddress>, timeout: Duration) -> Self {
        Self {
            me,
            nodes,
            timeout,
            received: Mutex::new(Rounds::default()),
            notify: Notify::new(),
        }
    }

    pub fn me(&self) -> NodeAddress {
        self.me
    }

    /// Records that `from` reached `round`
    pub fn receive(&self, round: u64, from: NodeAddress) {
        if let Ok(mut received) = self.received.lock() {
            if received.is_stale(round) {
                tracing::trace!("Ignoring late sync round {} from {}", round, from);
                return;
            }
            received.heard.entry(round).or_default().insert(from);
        }
        self.notify.notify_waiters();
    }

    /// Nodes not yet heard from in `round`
    fn missing(&self, round: u64) -> Vec<NodeAddress> {
        let received = match self.received.lock() {
            Ok(received) => received,
            Err(_) => return self.nodes.clone(),
        };
        let heard = received.heard.get(&round);
        self.nodes
            .iter()
            .filter(|node| heard.map_or(true, |set| !set.contains(node)))
            .copied()
            .collect()
    }

    /// Blocks until every node has reached `round` or the timeout elapses
    pub async fn sync(&self, round: u64) -> Result<()> {
        let deadline = Instant::now() + self.timeout;
        self.receive(round, self.me);

        let mut sends = JoinSet::new();
        for node in self.nodes.iter().copied().filter(|n| *n != self.me) {
            let message = Message::Sync {
                round,
                from: self.me,
            };
            let timeout = self.timeout;
            sends.spawn(async move {
                let client = PeerClient::new(node, timeout);
                loop {
                    match client.expect_ack(&message).await {
                        Ok(()) => return Ok(()),
                        Err(e) if Instant::now() + RESEND_DELAY < deadline => {
                            tracing::trace!("Sync round {} to {} failed, retrying: {}", round, node, e);
                            tokio::time::sleep(RESEND_DELAY).await;
                        }
                        Err(e) => return Err(e),
                    }
                }
            });
        }

        tracing::debug!("Waiting at sync round {} for {} nodes", round, self.nodes.len());
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let missing = self.missing(round);
            if missing.is_empty() {
                break;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                sends.abort_all();
                tracing::error!("Sync round {} timed out waiting for {:?}", round, missing);
                return Err(FrontierError::SyncTimeout {
                    round,
                    missing: missing.iter().map(|n| n.to_string()).collect(),
                });
            }
        }

        while let Some(sent) = sends.join_next().await {
            match sent {
                Ok(result) => result?,
                Err(e) => {
                    return Err(FrontierError::Pipeline(format!("sync sender failed: {}", e)))
                }
            }
        }

        if let Ok(mut received) = self.received.lock() {
            received.complete(round);
        }
        tracing::debug!("Sync round {} complete", round);
        Ok(())
    }
}
