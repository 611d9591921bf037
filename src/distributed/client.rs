use crate::distributed::wire::{read_frame, write_frame, Message};
use crate::distributed::NodeAddress;
use crate::{FrontierError, Result};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// Request/reply connection to one peer
///
/// The connection is opened lazily and reused; after any failure it is
/// dropped and the next request reconnects.
pub struct PeerClient {
    addr: NodeAddress,
    timeout: Duration,
    conn: Mutex<Option<TcpStream>>,
}

impl PeerClient {
    pub fn new(addr: NodeAddress, timeout: Duration) -> Self {
        Self {
            addr,
            timeout,
            conn: Mutex::new(None),
        }
    }

    pub fn addr(&self) -> NodeAddress {
        self.addr
    }

    /// Sends one message and waits for the reply
    pub async fn request(&self, message: &Message) -> Result<Message> {
        let mut conn = self.conn.lock().await;
        let outcome = tokio::time::timeout(self.timeout, async {
            if conn.is_none() {
                let stream = TcpStream::connect(self.addr.socket_addr()).await?;
                stream.set_nodelay(true)?;
                *conn = Some(stream);
            }
            let stream = conn
                .as_mut()
                .ok_or_else(|| self.transport_error("no connection"))?;
            write_frame(stream, message).await?;
            let reply = read_frame(stream)
                .await?
                .ok_or_else(|| self.transport_error("connection closed by peer"))?;
            Ok::<Message, FrontierError>(reply)
        })
        .await;

        match outcome {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(e)) => {
                *conn = None;
                Err(self.transport_error(&e.to_string()))
            }
            Err(_) => {
                *conn = None;
                Err(self.transport_error("request timed out"))
            }
        }
    }

    /// Like [`request`](Self::request) but treats an `Error` reply as a failure
    pub async fn expect_ack(&self, message: &Message) -> Result<()> {
        match self.request(message).await? {
            Message::Ack => Ok(()),
            Message::Error { message } => Err(self.transport_error(&message)),
            other => Err(self.transport_error(&format!("unexpected reply {:?}", other))),
        }
    }

    fn transport_error(&self, message: &str) -> FrontierError {
        FrontierError::Transport {
            node: self.addr.to_string(),
            message: message.to_string(),
        }
    }
}
