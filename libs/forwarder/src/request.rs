use std::time::Duration;

use serde::{Deserialize, Serialize};

/// One logical request/response exchange
///
/// `url` is informational only: the connection is already addressed by the
/// time a request reaches a protocol. `timeout` bounds the whole exchange and
/// must be non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub request_id: u64,
    pub url: String,
    /// Empty means the protocol's default payload
    #[serde(default)]
    pub message: String,
    pub timeout: Duration,
}

impl Request {
    pub fn new(request_id: u64, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            request_id,
            url: url.into(),
            message: String::new(),
            timeout,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// The supplied message, if any
    pub fn echo(&self) -> Option<&str> {
        (!self.message.is_empty()).then_some(self.message.as_str())
    }
}
