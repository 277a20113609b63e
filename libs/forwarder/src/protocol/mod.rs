use crate::context::Context;
use crate::error::{RequestFailure, Result};
use crate::request::Request;
use crate::transcript::Transcript;

pub mod tcp;

pub use self::tcp::TcpProtocol;

/// Uniform request/response lifecycle implemented once per wire protocol
///
/// A protocol is bound to a single open connection. Calls must be serialized:
/// at most one `make_request` is in flight per instance.
#[async_trait::async_trait]
pub trait Protocol: Send {
    /// Perform one exchange bounded by the earlier of the context deadline and
    /// `req.timeout`
    ///
    /// On failure the transcript produced up to the failing step is returned
    /// inside the [`RequestFailure`].
    async fn make_request(
        &mut self,
        ctx: &Context,
        req: &Request,
    ) -> std::result::Result<Transcript, RequestFailure>;

    /// Release the underlying connection
    async fn close(&mut self) -> Result<()>;
}
