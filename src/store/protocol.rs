//! Store service protocol
//!
//! Request/response messages exchanged between a `RemoteStore` client and a
//! `StoreService`. Bodies are MessagePack (rmp-serde).
//!
//! # Message Flow
//!
//! ```text
//! Client                          Service
//!    |                               |
//!    |-------- HELLO(version) ------>|
//!    |<------- WELCOME(version) -----|
//!    |                               |
//!    |-------- request ------------->|
//!    |<------- response -------------|
//!    |            ...                |
//! ```
//!
//! # Message Framing
//!
//! Each message is prefixed with a 4-byte length field (little-endian u32):
//!
//! ```text
//! [4 bytes: message length][N bytes: MessagePack-serialized message]
//! ```

use super::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Protocol version
///
/// Client and service must match exactly.
pub const PROTOCOL_VERSION: u32 = 1;

/// Largest frame body accepted (16 MiB)
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Client → service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    /// First message on every connection
    Hello { protocol_version: u32 },
    PutIfAbsent { map: String, key: String, value: Vec<u8> },
    InitCounter { name: String, count: u64 },
    CountDown { name: String },
    GetCount { name: String },
    /// Blocks on the service side for at most `timeout_ms`
    AwaitZero { name: String, timeout_ms: u64 },
    Append { list: String, item: Vec<u8> },
    Snapshot { list: String },
}

/// Service → client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    Welcome { protocol_version: u32 },
    Inserted(bool),
    Count(u64),
    Reached(bool),
    Ack,
    Items(Vec<Vec<u8>>),
    Error { kind: ErrorKind, message: String },
}

/// Error category carried in `Response::Error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    UnknownCounter,
    Interrupted,
    ProtocolMismatch,
    Other,
}

impl Response {
    /// Build the error response describing `err`
    pub fn from_error(err: &StoreError) -> Self {
        let kind = match err {
            StoreError::UnknownCounter(_) => ErrorKind::UnknownCounter,
            StoreError::Interrupted => ErrorKind::Interrupted,
            StoreError::ProtocolMismatch { .. } => ErrorKind::ProtocolMismatch,
            _ => ErrorKind::Other,
        };
        let message = match err {
            StoreError::UnknownCounter(name) => name.clone(),
            other => other.to_string(),
        };
        Response::Error { kind, message }
    }
}

/// Turn an error response back into the matching `StoreError`
pub fn error_from_response(kind: ErrorKind, message: String) -> StoreError {
    match kind {
        ErrorKind::UnknownCounter => StoreError::UnknownCounter(message),
        ErrorKind::Interrupted => StoreError::Interrupted,
        ErrorKind::ProtocolMismatch | ErrorKind::Other => StoreError::Remote(message),
    }
}

/// Serialize a message with its length prefix
pub fn encode_frame<T: Serialize>(msg: &T) -> StoreResult<Vec<u8>> {
    let body = rmp_serde::to_vec(msg).map_err(|e| StoreError::Codec(e.to_string()))?;
    if body.len() > MAX_FRAME_LEN {
        return Err(StoreError::Codec(format!(
            "frame too large: {} bytes (max {})",
            body.len(),
            MAX_FRAME_LEN
        )));
    }

    let mut framed = Vec::with_capacity(4 + body.len());
    framed.extend_from_slice(&(body.len() as u32).to_le_bytes());
    framed.extend_from_slice(&body);
    Ok(framed)
}

/// Deserialize one framed message from the front of `buf`
///
/// Returns (message, bytes_consumed) where bytes_consumed includes the length prefix.
pub fn decode_frame<T: DeserializeOwned>(buf: &[u8]) -> StoreResult<(T, usize)> {
    if buf.len() < 4 {
        return Err(StoreError::Codec(format!(
            "buffer too small for frame length (need 4 bytes, got {})",
            buf.len()
        )));
    }

    let len = frame_len([buf[0], buf[1], buf[2], buf[3]])?;
    if buf.len() < 4 + len {
        return Err(StoreError::Codec(format!(
            "incomplete frame (need {} bytes, got {})",
            4 + len,
            buf.len()
        )));
    }

    let msg = decode_body(&buf[4..4 + len])?;
    Ok((msg, 4 + len))
}

/// Read a complete message from an async TCP stream
pub async fn read_frame<T: DeserializeOwned>(stream: &mut tokio::net::TcpStream) -> StoreResult<T> {
    use tokio::io::AsyncReadExt;

    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await?;
    let len = frame_len(len_buf)?;

    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await?;
    decode_body(&body)
}

/// Write a message to an async TCP stream
pub async fn write_frame<T: Serialize>(stream: &mut tokio::net::TcpStream, msg: &T) -> StoreResult<()> {
    use tokio::io::AsyncWriteExt;

    let framed = encode_frame(msg)?;
    stream.write_all(&framed).await?;
    stream.flush().await?;
    Ok(())
}

/// Read a complete message from a blocking reader
pub fn read_frame_blocking<T: DeserializeOwned, R: Read>(reader: &mut R) -> StoreResult<T> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = frame_len(len_buf)?;

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body)?;
    decode_body(&body)
}

/// Write a message to a blocking writer
pub fn write_frame_blocking<T: Serialize, W: Write>(writer: &mut W, msg: &T) -> StoreResult<()> {
    let framed = encode_frame(msg)?;
    writer.write_all(&framed)?;
    writer.flush()?;
    Ok(())
}

fn frame_len(len_buf: [u8; 4]) -> StoreResult<usize> {
    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(StoreError::Codec(format!(
            "frame too large: {} bytes (max {})",
            len, MAX_FRAME_LEN
        )));
    }
    Ok(len)
}

fn decode_body<T: DeserializeOwned>(body: &[u8]) -> StoreResult<T> {
    rmp_serde::from_slice(body).map_err(|e| StoreError::Codec(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_request() {
        let msg = Request::AwaitZero {
            name: "externalClientsRunning".to_string(),
            timeout_ms: 100,
        };

        let bytes = encode_frame(&msg).unwrap();
        let (decoded, consumed): (Request, usize) = decode_frame(&bytes).unwrap();

        assert_eq!(consumed, bytes.len());
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_decode_consumes_one_frame() {
        let mut bytes = encode_frame(&Response::Count(3)).unwrap();
        let first_len = bytes.len();
        bytes.extend(encode_frame(&Response::Ack).unwrap());

        let (first, consumed): (Response, usize) = decode_frame(&bytes).unwrap();
        assert_eq!(first, Response::Count(3));
        assert_eq!(consumed, first_len);

        let (second, _): (Response, usize) = decode_frame(&bytes[consumed..]).unwrap();
        assert_eq!(second, Response::Ack);
    }

    #[test]
    fn test_decode_incomplete() {
        let bytes = encode_frame(&Response::Items(vec![vec![1, 2, 3]])).unwrap();
        assert!(decode_frame::<Response>(&bytes[..2]).is_err());
        assert!(decode_frame::<Response>(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut bytes = ((MAX_FRAME_LEN + 1) as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 8]);
        assert!(matches!(decode_frame::<Response>(&bytes), Err(StoreError::Codec(_))));
    }

    #[test]
    fn test_blocking_frames_over_buffer() {
        let mut buf = Vec::new();
        write_frame_blocking(&mut buf, &Request::Snapshot { list: "r".to_string() }).unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let msg: Request = read_frame_blocking(&mut cursor).unwrap();
        assert_eq!(msg, Request::Snapshot { list: "r".to_string() });
    }

    #[test]
    fn test_error_response_mapping() {
        let resp = Response::from_error(&StoreError::UnknownCounter("run".to_string()));
        match resp {
            Response::Error { kind, message } => {
                assert_eq!(kind, ErrorKind::UnknownCounter);
                assert!(matches!(
                    error_from_response(kind, message),
                    StoreError::UnknownCounter(name) if name == "run"
                ));
            }
            other => panic!("expected error response, got {:?}", other),
        }

        assert!(matches!(
            error_from_response(ErrorKind::Interrupted, String::new()),
            StoreError::Interrupted
        ));
    }
}
