//! Node-to-node message framing
//!
//! A frame is a big-endian `u32` byte length followed by a JSON-encoded
//! [`Message`]. Every request gets exactly one reply frame.

use crate::distributed::NodeAddress;
use crate::page::Page;
use crate::{FrontierError, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest frame accepted from a peer
const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Store this page in the receiver's catcher
    Catch { page: Page },
    /// `from` reached the barrier for `round`
    Sync { round: u64, from: NodeAddress },
    Ack,
    Error { message: String },
}

pub async fn write_frame<W>(writer: &mut W, message: &Message) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(message)
        .map_err(|e| FrontierError::Pipeline(format!("failed to encode message: {}", e)))?;
    writer.write_u32(body.len() as u32).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

/// Reads one frame; `Ok(None)` when the peer closed the connection cleanly
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Message>>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len > MAX_FRAME_LEN {
        return Err(FrontierError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("frame of {} bytes exceeds limit", len),
        )));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    let message = serde_json::from_slice(&body).map_err(|e| {
        FrontierError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("bad frame: {}", e),
        ))
    })?;
    Ok(Some(message))
}
