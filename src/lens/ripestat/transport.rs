//! HTTP GET transport for RIPEstat data calls.
//!
//! The lens only depends on the [`HttpGet`] trait. [`UreqTransport`] is the
//! blocking implementation used by the CLI; tests plug in canned responses.

use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout and retry parameters forwarded to the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Timeout of the first attempt; doubled on every retry
    pub timeout: Duration,
    /// Number of retries after the first failed attempt
    pub max_retries: u32,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_retries: 0,
        }
    }
}

impl RequestOptions {
    pub fn new(timeout: Duration, max_retries: u32) -> Self {
        Self {
            timeout,
            max_retries,
        }
    }
}

/// Raw HTTP response, whatever its status code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// No response could be obtained, even after all retries
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{reason} (after {attempts} attempt(s))")]
pub struct TransportFailure {
    pub reason: String,
    pub attempts: u32,
}

/// Blocking HTTP GET capability
pub trait HttpGet {
    fn get(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse, TransportFailure>;
}

impl<T: HttpGet + ?Sized> HttpGet for &T {
    fn get(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse, TransportFailure> {
        (**self).get(url, options)
    }
}

/// Run `attempt` until it succeeds or retries are exhausted.
///
/// Every retry doubles the timeout handed to `attempt`. Only the last error
/// is reported.
pub fn with_retries<F>(
    options: &RequestOptions,
    mut attempt: F,
) -> Result<HttpResponse, TransportFailure>
where
    F: FnMut(Duration) -> Result<HttpResponse, String>,
{
    let mut timeout = options.timeout;
    let mut attempts = 0;
    loop {
        attempts += 1;
        match attempt(timeout) {
            Ok(response) => return Ok(response),
            Err(reason) if attempts > options.max_retries => {
                return Err(TransportFailure { reason, attempts });
            }
            Err(reason) => {
                let next = timeout.saturating_mul(2);
                warn!(
                    "request attempt {} failed: {}; retrying with timeout {:?}",
                    attempts, reason, next
                );
                timeout = next;
            }
        }
    }
}

/// [`HttpGet`] backed by `ureq`
#[derive(Debug, Clone, Default)]
pub struct UreqTransport;

impl UreqTransport {
    pub fn new() -> Self {
        Self
    }

    fn attempt(url: &str, timeout: Duration) -> Result<HttpResponse, ureq::Error> {
        // non-2xx responses still carry a RIPEstat JSON body
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();

        let mut response = agent.get(url).call()?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_vec()?;
        Ok(HttpResponse { status, body })
    }
}

impl HttpGet for UreqTransport {
    fn get(&self, url: &str, options: &RequestOptions) -> Result<HttpResponse, TransportFailure> {
        with_retries(options, |timeout| {
            Self::attempt(url, timeout).map_err(|e| e.to_string())
        })
    }
}

/// In-memory transport answering from canned responses keyed by URL
#[cfg(test)]
pub(crate) mod canned {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    #[derive(Default)]
    pub(crate) struct CannedTransport {
        responses: HashMap<String, Result<HttpResponse, TransportFailure>>,
        requested: RefCell<Vec<String>>,
    }

    impl CannedTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        pub(crate) fn respond(mut self, url: &str, body: serde_json::Value) -> Self {
            let body = body.to_string().into_bytes();
            self.responses
                .insert(url.to_string(), Ok(HttpResponse::new(200, body)));
            self
        }

        pub(crate) fn fail(mut self, url: &str, reason: &str) -> Self {
            self.responses.insert(
                url.to_string(),
                Err(TransportFailure {
                    reason: reason.to_string(),
                    attempts: 1,
                }),
            );
            self
        }

        pub(crate) fn requested(&self) -> Vec<String> {
            self.requested.borrow().clone()
        }
    }

    impl HttpGet for CannedTransport {
        fn get(
            &self,
            url: &str,
            _options: &RequestOptions,
        ) -> Result<HttpResponse, TransportFailure> {
            self.requested.borrow_mut().push(url.to_string());
            self.responses.get(url).cloned().unwrap_or_else(|| {
                Err(TransportFailure {
                    reason: format!("no canned response for {}", url),
                    attempts: 1,
                })
            })
        }
    }
}
