//! Block framing over a byte stream.
//!
//! Every block starts with an 8-byte header: payload size and message count,
//! both u32 big-endian. We always send one message per block, and so does
//! LibreOffice. Messages carry no length of their own, so a batched block
//! cannot be split without decoding it; such blocks are rejected.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::error::{Result, UrpError};

/// Upper bound on a single block; anything larger is treated as corruption.
const MAX_BLOCK_SIZE: u32 = 64 * 1024 * 1024;

pub struct Transport<S = TcpStream> {
    stream: S,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Transport<S> {
    pub fn new(stream: S) -> Self {
        Self { stream }
    }

    pub async fn send(&mut self, message: &[u8]) -> Result<()> {
        let mut header = [0u8; 8];
        header[..4].copy_from_slice(&(message.len() as u32).to_be_bytes());
        header[4..].copy_from_slice(&1u32.to_be_bytes());

        self.stream.write_all(&header).await?;
        self.stream.write_all(message).await?;
        self.stream.flush().await?;
        Ok(())
    }

    /// Next block's payload.
    pub async fn recv(&mut self) -> Result<Bytes> {
        let mut header = [0u8; 8];
        if let Err(e) = self.stream.read_exact(&mut header).await {
            return Err(match e.kind() {
                std::io::ErrorKind::UnexpectedEof => UrpError::ConnectionClosed,
                _ => UrpError::Io(e),
            });
        }

        let size = u32::from_be_bytes([header[0], header[1], header[2], header[3]]);
        if size > MAX_BLOCK_SIZE {
            return Err(UrpError::Protocol(format!("block of {size} bytes exceeds limit")));
        }
        let count = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
        if count != 1 {
            return Err(UrpError::Protocol(format!(
                "block carries {count} messages, expected exactly one"
            )));
        }

        let mut payload = BytesMut::zeroed(size as usize);
        self.stream.read_exact(&mut payload).await?;
        Ok(payload.freeze())
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frames_over_duplex() {
        let (a, b) = tokio::io::duplex(1024);
        let mut client = Transport::new(a);
        let mut server = Transport::new(b);

        client.send(b"first").await.unwrap();
        client.send(b"").await.unwrap();

        assert_eq!(server.recv().await.unwrap().as_ref(), b"first");
        assert!(server.recv().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_header_layout() {
        let (a, mut b) = tokio::io::duplex(64);
        Transport::new(a).send(b"urp").await.unwrap();

        let mut raw = [0u8; 11];
        b.read_exact(&mut raw).await.unwrap();
        assert_eq!(&raw, &[0, 0, 0, 3, 0, 0, 0, 1, b'u', b'r', b'p']);
    }

    #[tokio::test]
    async fn test_batched_block_is_rejected() {
        let (mut a, b) = tokio::io::duplex(64);
        a.write_all(&[0, 0, 0, 2, 0, 0, 0, 2, 0x01, 0x02]).await.unwrap();

        let err = Transport::new(b).recv().await.unwrap_err();
        match err {
            UrpError::Protocol(msg) => assert!(msg.contains("2 messages"), "{msg}"),
            other => panic!("expected protocol error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_peer_hangup_is_connection_closed() {
        let (a, b) = tokio::io::duplex(64);
        drop(a);
        let err = Transport::new(b).recv().await.unwrap_err();
        assert!(matches!(err, UrpError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_over_loopback_tcp() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            Transport::new(stream).recv().await.unwrap()
        });

        let mut client = Transport::new(TcpStream::connect(addr).await.unwrap());
        client.send(b"hello urp").await.unwrap();
        assert_eq!(server.await.unwrap().as_ref(), b"hello urp");
    }
}
