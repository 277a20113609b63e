use std::io;

use crate::connection::{Connection, TcpConnection};
use crate::context::Context;
use crate::error::{Error, RequestFailure, Result};
use crate::protocol::Protocol;
use crate::request::Request;
use crate::transcript::{Transcript, TranscriptBuilder};

/// Payload sent when a request carries no message
pub const DEFAULT_MESSAGE: &str = "HelloWorld";

/// Capacity of the single read performed per request; longer responses are truncated
pub const READ_BUFFER_SIZE: usize = 1024;

const _: fn() = || {
    fn assert_protocol<P: Protocol>() {}
    assert_protocol::<TcpProtocol<TcpConnection>>();
};

/// Raw stream protocol: writes the payload once and reports a single read of the reply
///
/// No framing is applied in either direction. The reply is split on `\n` and
/// every non-empty segment becomes a body line.
pub struct TcpProtocol<C = TcpConnection> {
    conn: C,
}

impl<C: Connection> TcpProtocol<C> {
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

#[async_trait::async_trait]
impl<C: Connection> Protocol for TcpProtocol<C> {
    async fn make_request(
        &mut self,
        ctx: &Context,
        req: &Request,
    ) -> std::result::Result<Transcript, RequestFailure> {
        let mut out = TranscriptBuilder::new(req.request_id);
        out.url(&req.url);
        if let Some(message) = req.echo() {
            out.echo(message);
        }

        let deadline = ctx.with_timeout(req.timeout).deadline();
        let applied = self
            .conn
            .set_write_deadline(deadline)
            .and_then(|_| self.conn.set_read_deadline(deadline));
        if let Err(e) = applied {
            return Err(RequestFailure::new(
                out.finish(),
                Error::DeadlineApplicationFailed(e),
            ));
        }

        let payload = req.echo().unwrap_or(DEFAULT_MESSAGE).as_bytes();
        tracing::debug!(request_id = req.request_id, len = payload.len(), "Writing payload");
        match self.conn.write(payload).await {
            Ok(n) if n == payload.len() => {}
            Ok(n) => {
                let short = io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("short write: {} of {} bytes", n, payload.len()),
                );
                return Err(RequestFailure::new(out.finish(), Error::WriteFailed(short)));
            }
            Err(e) => return Err(RequestFailure::new(out.finish(), Error::WriteFailed(e))),
        }

        let mut resp = vec![0u8; READ_BUFFER_SIZE];
        let n = match self.conn.read(&mut resp).await {
            Ok(n) => n,
            Err(e) => return Err(RequestFailure::new(out.finish(), Error::ReadFailed(e))),
        };
        tracing::debug!(request_id = req.request_id, bytes = n, "Read response");

        out.read_bytes(n);
        out.body_lines(&String::from_utf8_lossy(&resp[..n]));

        Ok(out.finish())
    }

    async fn close(&mut self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }
}
