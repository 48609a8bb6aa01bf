//! Async frame codec over any byte stream.
//!
//! The codec knows nothing about opcodes beyond the header layout; it
//! turns bytes into [`Frame`]s and back.

// ============================================================================
// Imports
// ============================================================================

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::error::{Error, Result};

use super::frame::{Frame, HEADER_LEN, parse_header};

// ============================================================================
// Read / Write
// ============================================================================

/// Reads exactly one frame.
///
/// # Errors
///
/// - [`Error::ChannelClosed`] if the stream ends inside the header or
///   inside a non-empty payload
/// - [`Error::ProtocolViolation`] if the length field is out of range
/// - [`Error::Io`] for any other transport failure
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header = [0u8; HEADER_LEN];
    reader
        .read_exact(&mut header)
        .await
        .map_err(Error::from_transport)?;

    let (opcode, len) = parse_header(&header)?;

    let mut payload = vec![0u8; len];
    if len > 0 {
        reader
            .read_exact(&mut payload)
            .await
            .map_err(Error::from_transport)?;
    }

    trace!(opcode, len, "Frame read");
    Ok(Frame { opcode, payload })
}

/// Writes one frame and flushes the stream.
///
/// # Errors
///
/// - [`Error::ChannelClosed`] on a short write or a closed peer
/// - [`Error::Io`] for any other transport failure
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer
        .write_all(&frame.encode())
        .await
        .map_err(Error::from_transport)?;
    writer.flush().await.map_err(Error::from_transport)?;

    trace!(opcode = frame.opcode, len = frame.payload.len(), "Frame written");
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio_test::io::Builder;

    use crate::protocol::Opcode;

    #[tokio::test]
    async fn test_read_frame() {
        let bytes = Frame::new(Opcode::Ping, "ping-token").encode();
        let mut mock = Builder::new().read(&bytes).build();

        let frame = read_frame(&mut mock).await.unwrap();
        assert_eq!(frame.opcode, 3);
        assert_eq!(frame.payload, b"ping-token");
    }

    #[tokio::test]
    async fn test_read_frame_split_across_reads() {
        let bytes = Frame::new(Opcode::Message, "{\"cmd\":\"X\"}").encode();
        let mut mock = Builder::new()
            .read(&bytes[..3])
            .read(&bytes[3..10])
            .read(&bytes[10..])
            .build();

        let frame = read_frame(&mut mock).await.unwrap();
        assert_eq!(frame.payload, b"{\"cmd\":\"X\"}");
    }

    #[tokio::test]
    async fn test_read_frame_short_header() {
        let mut mock = Builder::new().read(&[1, 0, 0, 0]).build();
        let result = read_frame(&mut mock).await;
        assert!(matches!(result, Err(Error::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_read_frame_short_payload() {
        let mut mock = Builder::new()
            .read(&[1, 0, 0, 0, 4, 0, 0, 0, b'{', b'}'])
            .build();
        let result = read_frame(&mut mock).await;
        assert!(matches!(result, Err(Error::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_read_zero_length_payload() {
        let mut mock = Builder::new().read(&[4, 0, 0, 0, 0, 0, 0, 0]).build();
        let frame = read_frame(&mut mock).await.unwrap();
        assert_eq!(frame.opcode, 4);
        assert!(frame.payload.is_empty());
    }

    #[tokio::test]
    async fn test_write_frame() {
        let expected = [0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0x7B, 0x7D];
        let mut mock = Builder::new().write(&expected).build();

        write_frame(&mut mock, &Frame::new(Opcode::Message, "{}"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_write_frame_to_closed_peer() {
        let (mut client, peer) = tokio::io::duplex(64);
        drop(peer);

        let result = write_frame(&mut client, &Frame::new(Opcode::Pong, "x")).await;
        assert!(matches!(result, Err(Error::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_roundtrip_over_duplex() {
        let (mut a, mut b) = tokio::io::duplex(1024);
        let frame = Frame::new(Opcode::Close, r#"{"code":1000,"message":"bye"}"#);

        write_frame(&mut a, &frame).await.unwrap();
        let read = read_frame(&mut b).await.unwrap();
        assert_eq!(read, frame);
    }
}
