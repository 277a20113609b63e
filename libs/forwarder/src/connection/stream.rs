use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::Instant;

use crate::connection::Connection;

pub type TcpConnection = StreamConnection<TcpStream>;

#[cfg(unix)]
pub type UnixConnection = StreamConnection<tokio::net::UnixStream>;

/// Deadline-aware connection over any async byte stream
pub struct StreamConnection<S> {
    stream: Option<S>,
    write_deadline: Option<Instant>,
    read_deadline: Option<Instant>,
}

impl<S> StreamConnection<S> {
    /// Wrap an already established stream with no deadlines
    pub fn from_stream(stream: S) -> Self {
        Self {
            stream: Some(stream),
            write_deadline: None,
            read_deadline: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    fn stream_mut(&mut self) -> io::Result<&mut S> {
        self.stream.as_mut().ok_or_else(not_connected)
    }
}

impl TcpConnection {
    /// Dial a TCP address, optionally bounding the connect
    pub async fn connect_tcp(
        addr: impl ToSocketAddrs,
        connect_timeout: Option<Duration>,
    ) -> io::Result<Self> {
        let stream = connect_with_timeout(TcpStream::connect(addr), connect_timeout).await?;
        stream.set_nodelay(true)?;
        tracing::debug!(peer = ?stream.peer_addr().ok(), "TCP connection established");
        Ok(Self::from_stream(stream))
    }
}

#[cfg(unix)]
impl UnixConnection {
    /// Dial a Unix domain socket, optionally bounding the connect
    pub async fn connect_unix(
        path: impl AsRef<std::path::Path>,
        connect_timeout: Option<Duration>,
    ) -> io::Result<Self> {
        let path = path.as_ref();
        let stream =
            connect_with_timeout(tokio::net::UnixStream::connect(path), connect_timeout).await?;
        tracing::debug!(path = %path.display(), "Unix connection established");
        Ok(Self::from_stream(stream))
    }
}

async fn connect_with_timeout<S>(
    connect_op: impl Future<Output = io::Result<S>>,
    timeout: Option<Duration>,
) -> io::Result<S> {
    match timeout {
        Some(timeout) => tokio::time::timeout(timeout, connect_op)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "Connect timeout exceeded"))?,
        None => connect_op.await,
    }
}

/// Run `op` bounded by `deadline`, failing immediately when it already passed
async fn bounded<T>(
    deadline: Option<Instant>,
    op: impl Future<Output = io::Result<T>>,
) -> io::Result<T> {
    let Some(deadline) = deadline else {
        return op.await;
    };
    if deadline <= Instant::now() {
        return Err(timed_out());
    }
    tokio::time::timeout_at(deadline, op)
        .await
        .map_err(|_| timed_out())?
}

fn timed_out() -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, "i/o timeout")
}

fn not_connected() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "use of closed connection")
}

#[async_trait::async_trait]
impl<S> Connection for StreamConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn set_write_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()> {
        self.stream_mut()?;
        self.write_deadline = deadline;
        Ok(())
    }

    fn set_read_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()> {
        self.stream_mut()?;
        self.read_deadline = deadline;
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        let deadline = self.write_deadline;
        let stream = self.stream_mut()?;
        bounded(deadline, async {
            stream.write_all(bytes).await?;
            stream.flush().await?;
            Ok(bytes.len())
        })
        .await
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let deadline = self.read_deadline;
        let stream = self.stream_mut()?;
        let n = bounded(deadline, stream.read(buf)).await?;
        if n == 0 && !buf.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by peer",
            ));
        }
        Ok(n)
    }

    async fn close(&mut self) -> io::Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        match stream.shutdown().await {
            Ok(()) => Ok(()),
            Err(e) if peer_gone(&e) => {
                tracing::debug!(error = %e, "Ignoring shutdown error on disconnected stream");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

fn peer_gone(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
    )
}
