//! Echo Forwarder - Protocol-pluggable request forwarding
//!
//! Sends a payload over an already open connection, awaits the reply and
//! records a diagnostic transcript of every phase of the exchange. Each wire
//! protocol implements [`Protocol`]; the raw stream backend is [`TcpProtocol`].
//!
//! Transcript format:
//!
//! ```text
//! [<id>] Url=<url>
//! [<id>] Echo=<message>
//! [<id>] Read <n> bytes
//! [<id> body] <line>
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use echo_forwarder::{Context, Forwarder, ForwarderConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ForwarderConfig::builder()
//!     .url("tcp://127.0.0.1:9000")
//!     .count(3)
//!     .timeout(Duration::from_secs(2))
//!     .build()?;
//!
//! let transcript = Forwarder::new(config)?.run(&Context::background()).await?;
//! print!("{transcript}");
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod context;
pub mod error;
pub mod forwarder;
pub mod protocol;
pub mod request;
pub mod transcript;

// Re-exports for convenience
pub use context::Context;
pub use error::{Error, RequestFailure, Result};
pub use forwarder::{Forwarder, ForwarderConfig};
pub use protocol::{Protocol, TcpProtocol};
pub use request::Request;
pub use transcript::Transcript;
