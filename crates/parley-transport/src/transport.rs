use async_trait::async_trait;
use bytes::{BufMut, Bytes, BytesMut};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};

use crate::error::{Result, TransportError};

/// Frames larger than this are refused unless configured otherwise.
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Writing half of a transport.
#[async_trait]
pub trait FrameSink: Send + 'static {
    async fn send(&mut self, frame: Bytes) -> Result<()>;

    /// Signals end of stream to the peer.
    async fn close(&mut self) -> Result<()>;
}

/// Reading half of a transport.
#[async_trait]
pub trait FrameStream: Send + 'static {
    /// Next frame, or `None` once the peer closed cleanly.
    async fn recv(&mut self) -> Result<Option<Bytes>>;
}

/// Abstract Transport Layer.
pub trait Transport: Send + 'static {
    type Sink: FrameSink;
    type Stream: FrameStream;

    /// Human readable peer description for logs.
    fn peer(&self) -> String;

    fn split(self) -> (Self::Sink, Self::Stream);
}

/// Duplex TCP connection with `u32` big-endian length-prefixed frames.
pub struct DuplexTransport {
    stream: TcpStream,
    max_frame_len: usize,
}

impl DuplexTransport {
    pub async fn connect(addr: impl ToSocketAddrs, max_frame_len: usize) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        tracing::debug!(peer = ?stream.peer_addr().ok(), "Duplex connection established");
        Ok(Self::new(stream, max_frame_len))
    }

    pub fn new(stream: TcpStream, max_frame_len: usize) -> Self {
        Self {
            stream,
            max_frame_len,
        }
    }
}

impl Transport for DuplexTransport {
    type Sink = TcpFrameSink;
    type Stream = TcpFrameStream;

    fn peer(&self) -> String {
        match self.stream.peer_addr() {
            Ok(addr) => addr.to_string(),
            Err(_) => "tcp:unknown".to_string(),
        }
    }

    fn split(self) -> (TcpFrameSink, TcpFrameStream) {
        let (reader, writer) = self.stream.into_split();
        (
            TcpFrameSink {
                writer,
                max_frame_len: self.max_frame_len,
            },
            TcpFrameStream {
                reader,
                max_frame_len: self.max_frame_len,
            },
        )
    }
}

pub struct TcpFrameSink {
    writer: OwnedWriteHalf,
    max_frame_len: usize,
}

#[async_trait]
impl FrameSink for TcpFrameSink {
    async fn send(&mut self, frame: Bytes) -> Result<()> {
        if frame.len() > self.max_frame_len {
            return Err(TransportError::FrameTooLarge {
                len: frame.len(),
                max: self.max_frame_len,
            });
        }
        let len = u32::try_from(frame.len()).map_err(|_| TransportError::FrameTooLarge {
            len: frame.len(),
            max: u32::MAX as usize,
        })?;

        let mut buf = BytesMut::with_capacity(4 + frame.len());
        buf.put_u32(len);
        buf.put_slice(&frame);
        self.writer.write_all(&buf).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

pub struct TcpFrameStream {
    reader: OwnedReadHalf,
    max_frame_len: usize,
}

#[async_trait]
impl FrameStream for TcpFrameStream {
    async fn recv(&mut self) -> Result<Option<Bytes>> {
        let mut header = [0u8; 4];
        let mut filled = 0;
        while filled < header.len() {
            match self.reader.read(&mut header[filled..]).await? {
                0 if filled == 0 => return Ok(None),
                0 => {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        format!("connection closed after {filled} of 4 header bytes"),
                    )
                    .into());
                }
                n => filled += n,
            }
        }
        let len = u32::from_be_bytes(header) as usize;
        if len > self.max_frame_len {
            return Err(TransportError::FrameTooLarge {
                len,
                max: self.max_frame_len,
            });
        }

        let mut buf = BytesMut::zeroed(len);
        self.reader.read_exact(&mut buf).await?;
        Ok(Some(buf.freeze()))
    }
}

/// Accepts inbound duplex connections.
pub struct DuplexListener {
    listener: TcpListener,
    max_frame_len: usize,
}

impl DuplexListener {
    pub async fn bind(addr: impl ToSocketAddrs, max_frame_len: usize) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            max_frame_len,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn accept(&self) -> Result<DuplexTransport> {
        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        tracing::debug!(%peer, "Accepted duplex connection");
        Ok(DuplexTransport::new(stream, self.max_frame_len))
    }
}
