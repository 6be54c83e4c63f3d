/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Message channel over a byte stream.
//!
//! An [`IsoChannel`] turns any ordered byte stream into a stream of
//! [`IsoMessage`]s: it frames with a [`FrameCodec`], optionally prepends a
//! static header (such as a 5-byte TPDU) inside each frame, and packs or
//! unpacks with a shared [`Packager`].

use crate::codec::{FrameCodec, FrameError};
use bytes::{BufMut, Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use ironiso_core::{DecodeError, EncodeError, IsoMessage};
use ironiso_packager::Packager;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, trace};

/// Errors raised by channel operations.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Framing failed; the byte stream is no longer usable.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// The outbound message could not be packed.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// A complete inbound frame could not be unpacked.
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// An inbound frame is too short to hold the configured header.
    #[error("frame of {received} bytes cannot hold the {expected}-byte header")]
    HeaderMismatch {
        /// Configured header length.
        expected: usize,
        /// Frame length received.
        received: usize,
    },

    /// I/O error while connecting.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ChannelError {
    /// Returns true if the error leaves the channel unusable.
    ///
    /// Undecodable messages and headers only spoil one frame; framing and
    /// I/O failures lose synchronization with the stream.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Frame(_) | Self::Io(_))
    }
}

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Receiving half of a channel.
pub struct ChannelReader {
    frames: FramedRead<BoxedReader, FrameCodec>,
    packager: Arc<Packager>,
    header_len: usize,
}

impl ChannelReader {
    /// Receives the next message.
    ///
    /// Returns `Ok(None)` when the peer closes the stream between frames.
    ///
    /// # Errors
    /// Returns `ChannelError::Frame` for framing failures and
    /// `ChannelError::Decode` or `ChannelError::HeaderMismatch` for a frame
    /// that does not hold a valid message.
    pub async fn receive(&mut self) -> Result<Option<IsoMessage>, ChannelError> {
        let Some(frame) = self.frames.next().await.transpose()? else {
            debug!("channel closed by peer");
            return Ok(None);
        };
        if frame.len() < self.header_len {
            return Err(ChannelError::HeaderMismatch {
                expected: self.header_len,
                received: frame.len(),
            });
        }
        let msg = self.packager.unpack(&frame[self.header_len..])?;
        trace!(msg = %msg.protected(), bytes = frame.len(), "received message");
        Ok(Some(msg))
    }
}

impl std::fmt::Debug for ChannelReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelReader")
            .field("header_len", &self.header_len)
            .finish_non_exhaustive()
    }
}

/// Sending half of a channel.
pub struct ChannelWriter {
    frames: FramedWrite<BoxedWriter, FrameCodec>,
    packager: Arc<Packager>,
    header: Bytes,
}

impl ChannelWriter {
    /// Packs and sends a message as one frame.
    ///
    /// # Errors
    /// Returns `ChannelError::Encode` if the message cannot be packed (nothing
    /// is written) and `ChannelError::Frame` if writing fails.
    pub async fn send(&mut self, msg: &IsoMessage) -> Result<(), ChannelError> {
        let mut buf = BytesMut::with_capacity(self.header.len() + 256);
        buf.put_slice(&self.header);
        self.packager.pack_into(msg, &mut buf)?;
        trace!(msg = %msg.protected(), bytes = buf.len(), "sending message");
        self.frames.send(buf.freeze()).await?;
        Ok(())
    }

    /// Sends an already packed message body as one frame, after the header.
    ///
    /// # Errors
    /// Returns `ChannelError::Frame` if writing fails.
    pub async fn send_packed(&mut self, packed: &[u8]) -> Result<(), ChannelError> {
        let mut buf = BytesMut::with_capacity(self.header.len() + packed.len());
        buf.put_slice(&self.header);
        buf.put_slice(packed);
        trace!(bytes = buf.len(), "sending packed message");
        self.frames.send(buf.freeze()).await?;
        Ok(())
    }

    /// Returns the packager used for outbound messages.
    #[must_use]
    pub const fn packager(&self) -> &Arc<Packager> {
        &self.packager
    }

    /// Flushes and shuts down the write side of the stream.
    ///
    /// # Errors
    /// Returns `ChannelError::Frame` if the shutdown fails.
    pub async fn close(&mut self) -> Result<(), ChannelError> {
        SinkExt::<Bytes>::close(&mut self.frames).await?;
        Ok(())
    }
}

impl std::fmt::Debug for ChannelWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelWriter")
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

/// Bidirectional message channel.
#[derive(Debug)]
pub struct IsoChannel {
    reader: ChannelReader,
    writer: ChannelWriter,
}

impl IsoChannel {
    /// Creates a channel over an established transport.
    ///
    /// # Arguments
    /// * `io` - Any ordered byte stream: TCP, TLS, an in-memory duplex
    /// * `packager` - Shared packager for the dialect spoken
    /// * `codec` - Frame length prefix layout
    pub fn new<T>(io: T, packager: Arc<Packager>, codec: FrameCodec) -> Self
    where
        T: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (read_half, write_half) = tokio::io::split(io);
        let read_half: BoxedReader = Box::new(read_half);
        let write_half: BoxedWriter = Box::new(write_half);
        Self {
            reader: ChannelReader {
                frames: FramedRead::new(read_half, codec.clone()),
                packager: Arc::clone(&packager),
                header_len: 0,
            },
            writer: ChannelWriter {
                frames: FramedWrite::new(write_half, codec),
                packager,
                header: Bytes::new(),
            },
        }
    }

    /// Connects over TCP.
    ///
    /// # Errors
    /// Returns `ChannelError::Io` if the connection cannot be established.
    pub async fn connect<A>(
        addr: A,
        packager: Arc<Packager>,
        codec: FrameCodec,
    ) -> Result<Self, ChannelError>
    where
        A: ToSocketAddrs,
    {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        debug!(peer = ?stream.peer_addr().ok(), "channel connected");
        Ok(Self::new(stream, packager, codec))
    }

    /// Sets a static header written before every outbound message and
    /// skipped on every inbound one.
    #[must_use]
    pub fn with_header(mut self, header: impl Into<Bytes>) -> Self {
        let header = header.into();
        self.reader.header_len = header.len();
        self.writer.header = header;
        self
    }

    /// Packs and sends a message.
    ///
    /// # Errors
    /// Same as [`ChannelWriter::send`].
    pub async fn send(&mut self, msg: &IsoMessage) -> Result<(), ChannelError> {
        self.writer.send(msg).await
    }

    /// Receives the next message, `Ok(None)` once the peer has closed.
    ///
    /// # Errors
    /// Same as [`ChannelReader::receive`].
    pub async fn receive(&mut self) -> Result<Option<IsoMessage>, ChannelError> {
        self.reader.receive().await
    }

    /// Splits the channel for use from separate tasks.
    #[must_use]
    pub fn split(self) -> (ChannelReader, ChannelWriter) {
        (self.reader, self.writer)
    }
}
