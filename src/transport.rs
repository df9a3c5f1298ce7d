//! Frame transport: the connect side of the wire protocol.
//!
//! Owns the stream connection to the store. [`connect`] establishes a TCP
//! connection with an optional keepalive and a bounded connect timeout; the
//! stream is then split into a [`FrameReader`] and a [`FrameWriter`] so the
//! session can await inbound frames and write outbound frames from the same
//! event loop.
//!
//! A send failure is fatal to the session, not just to the current request;
//! the session tears the transport down on the first write error.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tokio::time::timeout;

use crate::error::{CrdtWireError, Result};
use crate::protocol::{build_frame, Frame, FrameBuffer};
use crate::session::SessionConfig;

/// Read buffer size for socket reads.
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Establish a TCP connection to the store.
///
/// Resolves `address:port`, applies `SO_KEEPALIVE` when the config asks for
/// it, and bounds the whole attempt with the configured connect timeout.
///
/// # Errors
///
/// [`CrdtWireError::Connect`] if no address accepts the connection,
/// [`CrdtWireError::ConnectTimeout`] if an attempt exceeds the timeout.
pub async fn connect(address: &str, port: u16, config: &SessionConfig) -> Result<TcpStream> {
    let addrs = lookup_host((address, port))
        .await
        .map_err(CrdtWireError::Connect)?;

    let mut last_err: Option<std::io::Error> = None;

    for addr in addrs {
        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(CrdtWireError::Connect)?;

        if config.keepalive {
            socket.set_keepalive(true).map_err(CrdtWireError::Connect)?;
        }

        match timeout(config.connect_timeout, socket.connect(addr)).await {
            Ok(Ok(stream)) => {
                tracing::debug!(%addr, "connected");
                return Ok(stream);
            }
            Ok(Err(e)) => {
                tracing::debug!(%addr, error = %e, "connect attempt failed");
                last_err = Some(e);
            }
            Err(_) => return Err(CrdtWireError::ConnectTimeout(config.connect_timeout)),
        }
    }

    Err(CrdtWireError::Connect(last_err.unwrap_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "address resolved to no usable endpoint",
        )
    })))
}

/// Split a stream into the session's frame reader and writer halves.
pub fn split_frames<S>(stream: S, max_frame_size: u32) -> (FrameReader<S>, FrameWriter<S>)
where
    S: AsyncRead + AsyncWrite,
{
    let (read_half, write_half) = tokio::io::split(stream);
    (
        FrameReader {
            reader: read_half,
            buffer: FrameBuffer::with_max_frame_size(max_frame_size),
            chunk: vec![0u8; READ_CHUNK_SIZE],
        },
        FrameWriter { writer: write_half },
    )
}

/// The inbound half: accumulates socket reads into complete frames.
pub struct FrameReader<S> {
    reader: ReadHalf<S>,
    buffer: FrameBuffer,
    chunk: Vec<u8>,
}

impl<S: AsyncRead + AsyncWrite> FrameReader<S> {
    /// Perform one socket read and return the complete frames it yielded.
    ///
    /// May return an empty vector when the read ended mid-frame; the partial
    /// data stays buffered for the next call. The single await point is a
    /// plain `read`, so this is safe to drop from a `select!` arm.
    ///
    /// # Errors
    ///
    /// [`CrdtWireError::Disconnected`] when the remote closed the
    /// connection; [`CrdtWireError::Protocol`] on a malformed frame;
    /// [`CrdtWireError::Io`] on a read failure.
    pub async fn read_chunk(&mut self) -> Result<Vec<Frame>> {
        let n = self.reader.read(&mut self.chunk).await?;
        if n == 0 {
            return Err(CrdtWireError::Disconnected);
        }
        self.buffer.push(&self.chunk[..n])
    }
}

/// The outbound half: writes one frame at a time.
pub struct FrameWriter<S> {
    writer: WriteHalf<S>,
}

impl<S: AsyncRead + AsyncWrite> FrameWriter<S> {
    /// Write one complete frame (length prefix, code, payload) and flush.
    ///
    /// # Errors
    ///
    /// [`CrdtWireError::Send`] on any write failure, fatal to the session.
    pub async fn send(&mut self, code: u8, payload: &[u8]) -> Result<()> {
        let frame = build_frame(code, payload);
        self.writer
            .write_all(&frame)
            .await
            .map_err(CrdtWireError::Send)?;
        self.writer.flush().await.map_err(CrdtWireError::Send)
    }
}
