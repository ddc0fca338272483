use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;

/// The duplex byte stream a connection runs over.
///
/// `Duplex` is the in-process transport (`tokio::io::duplex`), used by tests
/// and by embedders that host both peers in one process.
#[derive(Debug)]
pub enum RawStream {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
    Duplex(DuplexStream),
}

pub(crate) type StreamReadHalf = tokio::io::ReadHalf<RawStream>;
pub(crate) type StreamWriteHalf = tokio::io::WriteHalf<RawStream>;

impl RawStream {
    pub(crate) fn split(self) -> (StreamReadHalf, StreamWriteHalf) {
        tokio::io::split(self)
    }
}

impl From<TcpStream> for RawStream {
    fn from(stream: TcpStream) -> Self {
        RawStream::Tcp(stream)
    }
}

#[cfg(unix)]
impl From<UnixStream> for RawStream {
    fn from(stream: UnixStream) -> Self {
        RawStream::Unix(stream)
    }
}

impl From<DuplexStream> for RawStream {
    fn from(stream: DuplexStream) -> Self {
        RawStream::Duplex(stream)
    }
}

macro_rules! delegate {
    ($self:ident, $stream:ident => $call:expr) => {
        match Pin::into_inner($self) {
            RawStream::Tcp($stream) => $call,
            #[cfg(unix)]
            RawStream::Unix($stream) => $call,
            RawStream::Duplex($stream) => $call,
        }
    };
}

impl AsyncRead for RawStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        delegate!(self, s => Pin::new(s).poll_read(cx, buf))
    }
}

impl AsyncWrite for RawStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        delegate!(self, s => Pin::new(s).poll_write(cx, buf))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        delegate!(self, s => Pin::new(s).poll_flush(cx))
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        delegate!(self, s => Pin::new(s).poll_shutdown(cx))
    }
}
