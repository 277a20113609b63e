use std::io;

use tokio::time::Instant;

pub mod stream;

pub use self::stream::{StreamConnection, TcpConnection};
#[cfg(unix)]
pub use self::stream::UnixConnection;

/// An open bidirectional byte stream with settable per-direction deadlines
///
/// There is no message framing: a write sends bytes, a read returns whatever
/// bytes arrived. Operations fail with `io::ErrorKind::TimedOut` once the
/// deadline of their direction has passed.
#[async_trait::async_trait]
pub trait Connection: Send {
    /// Bound all subsequent writes; `None` clears the deadline
    fn set_write_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()>;

    /// Bound all subsequent reads; `None` clears the deadline
    fn set_read_deadline(&mut self, deadline: Option<Instant>) -> io::Result<()>;

    /// Write the whole buffer as one operation
    async fn write(&mut self, bytes: &[u8]) -> io::Result<usize>;

    /// Perform a single read into `buf`
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Release the connection; closing an already closed connection is not an error
    async fn close(&mut self) -> io::Result<()>;
}
