use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::connection::TcpConnection;
use crate::context::Context;
use crate::error::{Error, RequestFailure, Result};
use crate::protocol::{Protocol, TcpProtocol};
use crate::request::Request;
use crate::transcript::Transcript;

/// Timeout applied to each request when the config leaves it unset
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for a batch of forwarded requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwarderConfig {
    pub url: String,
    #[serde(default = "default_count")]
    pub count: u64,
    #[serde(default)]
    pub message: String,
    /// Per-request timeout; zero selects [`DEFAULT_TIMEOUT`]
    #[serde(default)]
    pub timeout: Duration,
    #[serde(default)]
    pub connect_timeout: Option<Duration>,
}

fn default_count() -> u64 {
    1
}

impl ForwarderConfig {
    pub fn builder() -> ForwarderConfigBuilder {
        ForwarderConfigBuilder::new()
    }

    /// The per-request timeout after defaults are applied
    pub fn effective_timeout(&self) -> Duration {
        if self.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            self.timeout
        }
    }
}

/// Builder for [`ForwarderConfig`]
#[derive(Default)]
pub struct ForwarderConfigBuilder {
    url: Option<String>,
    count: Option<u64>,
    message: String,
    timeout: Duration,
    connect_timeout: Option<Duration>,
}

impl ForwarderConfigBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target url, e.g. `tcp://127.0.0.1:9000` or `unix:///tmp/echo.sock`
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set how many sequential requests to send
    pub fn count(mut self, count: u64) -> Self {
        self.count = Some(count);
        self
    }

    /// Set the payload; empty uses the protocol default
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connection timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn build(self) -> Result<ForwarderConfig> {
        let url = self.url.ok_or_else(|| Error::custom("Url not set"))?;
        Ok(ForwarderConfig {
            url,
            count: self.count.unwrap_or_else(default_count),
            message: self.message,
            timeout: self.timeout,
            connect_timeout: self.connect_timeout,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Tcp(String),
    #[cfg(unix)]
    Unix(std::path::PathBuf),
}

impl Target {
    fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).map_err(|e| Error::InvalidUrl(format!("{raw}: {e}")))?;
        match url.scheme() {
            "tcp" => {
                let host = url
                    .host_str()
                    .ok_or_else(|| Error::InvalidUrl(format!("{raw}: missing host")))?;
                let port = url
                    .port()
                    .ok_or_else(|| Error::InvalidUrl(format!("{raw}: missing port")))?;
                let host = host.trim_start_matches('[').trim_end_matches(']');
                let addr = if host.contains(':') {
                    format!("[{host}]:{port}")
                } else {
                    format!("{host}:{port}")
                };
                Ok(Target::Tcp(addr))
            }
            #[cfg(unix)]
            "unix" => {
                if url.path().is_empty() {
                    return Err(Error::InvalidUrl(format!("{raw}: missing socket path")));
                }
                Ok(Target::Unix(url.path().into()))
            }
            other => Err(Error::UnsupportedScheme(other.to_string())),
        }
    }
}

/// Drives a batch of requests over one connection
///
/// Opens the connection, binds the matching protocol to it, sends `count`
/// requests in order and closes the protocol whatever the outcome.
#[derive(Debug)]
pub struct Forwarder {
    config: ForwarderConfig,
    target: Target,
}

impl Forwarder {
    pub fn new(config: ForwarderConfig) -> Result<Self> {
        let target = Target::parse(&config.url)?;
        Ok(Self { config, target })
    }

    pub fn config(&self) -> &ForwarderConfig {
        &self.config
    }

    /// Requests this forwarder will issue, ids `0..count`
    pub fn requests(&self) -> impl Iterator<Item = Request> + '_ {
        let timeout = self.config.effective_timeout();
        (0..self.config.count.max(1)).map(move |id| {
            Request::new(id, self.config.url.clone(), timeout).message(self.config.message.clone())
        })
    }

    /// Connect bound: the earlier of `connect_timeout` and the time left on `ctx`
    fn connect_bound(&self, ctx: &Context) -> Result<Option<Duration>> {
        let remaining = ctx.remaining();
        if remaining.is_some_and(|left| left.is_zero()) {
            let expired = io::Error::new(io::ErrorKind::TimedOut, "deadline exceeded before dial");
            return Err(expired.into());
        }
        Ok(match (self.config.connect_timeout, remaining) {
            (Some(timeout), Some(left)) => Some(timeout.min(left)),
            (timeout, left) => timeout.or(left),
        })
    }

    async fn dial(&self, ctx: &Context) -> Result<Box<dyn Protocol>> {
        let connect_timeout = self.connect_bound(ctx)?;
        let protocol: Box<dyn Protocol> = match &self.target {
            Target::Tcp(addr) => {
                let conn = TcpConnection::connect_tcp(addr.as_str(), connect_timeout).await?;
                Box::new(TcpProtocol::new(conn))
            }
            #[cfg(unix)]
            Target::Unix(path) => {
                let conn = crate::connection::UnixConnection::connect_unix(path, connect_timeout)
                    .await?;
                Box::new(TcpProtocol::new(conn))
            }
        };
        Ok(protocol)
    }

    /// Run every request and return the combined transcript
    ///
    /// The dial is bounded by the context deadline as well as `connect_timeout`.
    /// A dial failure yields an empty transcript. The first failing request
    /// stops the batch; its failure carries the output of all earlier requests.
    pub async fn run(&self, ctx: &Context) -> std::result::Result<Transcript, RequestFailure> {
        let mut protocol = self
            .dial(ctx)
            .await
            .map_err(|e| RequestFailure::new(Transcript::new(), e))?;

        let mut output = Transcript::new();
        let mut outcome = Ok(());
        for req in self.requests() {
            match protocol.make_request(ctx, &req).await {
                Ok(transcript) => output.extend(transcript),
                Err(failure) => {
                    tracing::warn!(
                        request_id = req.request_id,
                        url = %req.url,
                        error = %failure.error,
                        "Request failed"
                    );
                    let (transcript, error) = failure.into_parts();
                    output.extend(transcript);
                    outcome = Err(error);
                    break;
                }
            }
        }

        if let Err(e) = protocol.close().await {
            tracing::debug!(error = %e, "Error closing protocol");
        }

        match outcome {
            Ok(()) => Ok(output),
            Err(error) => Err(RequestFailure::new(output, error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_url() {
        assert!(matches!(
            ForwarderConfig::builder().build(),
            Err(Error::Custom(_))
        ));
    }

    #[test]
    fn zero_timeout_resolves_to_default() {
        let config = ForwarderConfig::builder()
            .url("tcp://127.0.0.1:9000")
            .build()
            .unwrap();
        assert_eq!(config.count, 1);
        assert_eq!(config.effective_timeout(), DEFAULT_TIMEOUT);

        let forwarder = Forwarder::new(config).unwrap();
        let requests: Vec<_> = forwarder.requests().collect();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn requests_are_numbered_from_zero() {
        let config = ForwarderConfig::builder()
            .url("tcp://127.0.0.1:9000")
            .count(3)
            .message("hi")
            .timeout(Duration::from_millis(250))
            .build()
            .unwrap();
        let forwarder = Forwarder::new(config).unwrap();

        let requests: Vec<_> = forwarder.requests().collect();
        assert_eq!(
            requests.iter().map(|r| r.request_id).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert!(requests
            .iter()
            .all(|r| r.message == "hi" && r.timeout == Duration::from_millis(250)));
    }

    #[test]
    fn connect_bound_takes_the_earlier_limit() {
        let forwarder = |connect_timeout: Option<Duration>| {
            let mut builder = ForwarderConfig::builder().url("tcp://127.0.0.1:9000");
            if let Some(timeout) = connect_timeout {
                builder = builder.connect_timeout(timeout);
            }
            Forwarder::new(builder.build().unwrap()).unwrap()
        };
        let background = Context::background();
        let short = Context::background().with_timeout(Duration::from_millis(100));

        assert_eq!(forwarder(None).connect_bound(&background).unwrap(), None);
        assert_eq!(
            forwarder(Some(Duration::from_secs(3)))
                .connect_bound(&background)
                .unwrap(),
            Some(Duration::from_secs(3))
        );
        assert!(
            forwarder(None).connect_bound(&short).unwrap().unwrap() <= Duration::from_millis(100)
        );
        assert!(
            forwarder(Some(Duration::from_secs(10)))
                .connect_bound(&short)
                .unwrap()
                .unwrap()
                <= Duration::from_millis(100)
        );
    }

    #[test]
    fn expired_context_refuses_to_dial() {
        let forwarder = Forwarder::new(
            ForwarderConfig::builder()
                .url("tcp://127.0.0.1:9000")
                .build()
                .unwrap(),
        )
        .unwrap();
        let expired = Context::background()
            .with_deadline(tokio::time::Instant::now() - Duration::from_millis(1));

        let err = forwarder.connect_bound(&expired).unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn parses_supported_targets() {
        assert_eq!(
            Target::parse("tcp://localhost:9000").unwrap(),
            Target::Tcp("localhost:9000".into())
        );
        assert_eq!(
            Target::parse("tcp://[::1]:9000").unwrap(),
            Target::Tcp("[::1]:9000".into())
        );
        #[cfg(unix)]
        assert_eq!(
            Target::parse("unix:///tmp/echo.sock").unwrap(),
            Target::Unix("/tmp/echo.sock".into())
        );
    }

    #[test]
    fn rejects_unknown_scheme_and_missing_port() {
        assert!(matches!(
            Target::parse("grpc://localhost:9000"),
            Err(Error::UnsupportedScheme(s)) if s == "grpc"
        ));
        assert!(matches!(
            Target::parse("tcp://localhost"),
            Err(Error::InvalidUrl(_))
        ));
        assert!(matches!(Target::parse("not a url"), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ForwarderConfig = serde::Deserialize::deserialize(
            serde::de::value::MapDeserializer::<_, serde::de::value::Error>::new(
                [("url", "tcp://127.0.0.1:1")].into_iter(),
            ),
        )
        .unwrap();
        assert_eq!(config.count, 1);
        assert!(config.message.is_empty());
        assert!(config.timeout.is_zero());
        assert!(config.connect_timeout.is_none());
    }
}
