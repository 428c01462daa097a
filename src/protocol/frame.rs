//! Response framing.
//!
//! Every server response is framed the same way: one status byte (`'1'`
//! success, `'0'` failure), a 4-byte big-endian payload length, then exactly
//! that many payload bytes. Success payloads are the JSON catalog for `LIST`
//! or raw excerpt bytes for `GET`; failure payloads are UTF-8 error text.
//!
//! Receiver contract: a missing status byte means the peer closed the
//! connection; fewer than 4 length bytes is a protocol error; a payload that
//! ends early is a transfer error distinct from a protocol violation.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::protocol::constants::{LEN_PREFIX_SIZE, MAX_RESPONSE_SIZE, STATUS_ERR, STATUS_OK};
use crate::protocol::error::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Err,
}

/// One framed server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub payload: Vec<u8>,
}

impl Response {
    pub fn ok(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload: payload.into(),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            status: Status::Err,
            payload: message.into().into_bytes(),
        }
    }

    /// Failure payloads are UTF-8 error text.
    pub fn error_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

pub async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
) -> anyhow::Result<()> {
    let status = match response.status {
        Status::Ok => STATUS_OK,
        Status::Err => STATUS_ERR,
    };
    let len = response.payload.len() as u32;

    writer.write_all(&[status]).await?;
    writer.write_all(&len.to_be_bytes()).await?;
    if !response.payload.is_empty() {
        writer.write_all(&response.payload).await?;
    }
    writer.flush().await?;
    Ok(())
}

pub async fn read_response<R: AsyncRead + Unpin>(reader: &mut R) -> anyhow::Result<Response> {
    let mut status_buf = [0u8; 1];
    if reader.read_exact(&mut status_buf).await.is_err() {
        return Err(ProtocolError::ConnectionClosed.into());
    }

    let status = match status_buf[0] {
        STATUS_OK => Status::Ok,
        STATUS_ERR => Status::Err,
        other => return Err(ProtocolError::InvalidStatus(other).into()),
    };

    let mut len_buf = [0u8; LEN_PREFIX_SIZE];
    if reader.read_exact(&mut len_buf).await.is_err() {
        return Err(ProtocolError::TruncatedHeader.into());
    }

    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_RESPONSE_SIZE {
        return Err(ProtocolError::FrameTooLarge(len).into());
    }

    // Read until the declared count is reached or the peer closes early.
    let mut payload = vec![0u8; len];
    let mut received = 0;
    while received < len {
        let n = reader.read(&mut payload[received..]).await?;
        if n == 0 {
            return Err(ProtocolError::ShortPayload {
                expected: len,
                received,
            }
            .into());
        }
        received += n;
    }

    Ok(Response { status, payload })
}
