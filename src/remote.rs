//! Probing the size of remotely hosted images, for feed enclosures.
//!
//! The probe first asks with the caller's method (normally `HEAD`, so the
//! image isn't downloaded). Some hosts refuse `HEAD` or serve broken
//! certificate chains, so a failed first attempt is retried exactly once with
//! `GET` and certificate verification disabled. Verification is never
//! disabled on the first attempt.

use log::{error, warn};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_LENGTH, USER_AGENT};
use reqwest::StatusCode;
use std::fmt;
use std::time::Duration;

/// How long a single probe request may take.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_ATTEMPTS: u32 = 2;

const TOOL_USER_AGENT: &str =
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    Head,
    Get,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Method::Head => "HEAD",
            Method::Get => "GET",
        })
    }
}

/// A single probe request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Request<'a> {
    pub url: &'a str,
    pub method: Method,

    /// Whether the server certificate must be valid.
    pub verify_tls: bool,
}

/// Performs probe requests. [`HttpTransport`] is the real implementation.
pub trait Transport {
    /// Sends `request` and returns the raw `content-length` header, if the
    /// response had one.
    fn content_length(&self, request: &Request) -> Result<Option<String>>;
}

/// A [`Transport`] over HTTP(S).
pub struct HttpTransport {
    verified: Client,
    unverified: Client,
}

impl HttpTransport {
    /// Builds the HTTP clients. Every request identifies the tool in its
    /// `User-Agent` header and gives up after `timeout`.
    pub fn new(timeout: Duration) -> Result<HttpTransport> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(TOOL_USER_AGENT));

        let build = |accept_invalid_certs: bool| {
            Client::builder()
                .default_headers(headers.clone())
                .timeout(timeout)
                .danger_accept_invalid_certs(accept_invalid_certs)
                .build()
        };
        Ok(HttpTransport {
            verified: build(false)?,
            unverified: build(true)?,
        })
    }
}

impl Transport for HttpTransport {
    fn content_length(&self, request: &Request) -> Result<Option<String>> {
        let client = if request.verify_tls {
            &self.verified
        } else {
            &self.unverified
        };
        let builder = match request.method {
            Method::Head => client.head(request.url),
            Method::Get => client.get(request.url),
        };

        let response = builder.send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status));
        }
        Ok(response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned))
    }
}

/// Returns the size in bytes of the image at `image_url`, starting with a
/// `HEAD` request. See [`probe`].
pub fn get_remote_image_length(
    transport: &dyn Transport,
    image_url: &str,
) -> Option<u64> {
    probe(transport, image_url, Method::Head)
}

/// Returns the size in bytes of the image at `image_url`, or `None` when it
/// can't be determined. At most two requests are made: the first with
/// `method`, the second (only if the first failed) with `GET` and without
/// certificate verification. Failures are logged, never returned.
pub fn probe(
    transport: &dyn Transport,
    image_url: &str,
    method: Method,
) -> Option<u64> {
    let mut request = Request {
        url: image_url,
        method,
        verify_tls: true,
    };

    for attempt in 1..=MAX_ATTEMPTS {
        match transport.content_length(&request) {
            Ok(length) => return parse_length(image_url, length),
            Err(err) if attempt < MAX_ATTEMPTS => {
                warn!(
                    "Remote image could not be reached: {}. Trying again with GET and \
                     without certificate verification. Attempt: {}. Trace: {}",
                    image_url, attempt, err
                );
                request.method = Method::Get;
                request.verify_tls = false;
            }
            Err(err) => {
                error!(
                    "Remote image is not reachable: {} after {} attempts. Trace: {}",
                    image_url, attempt, err
                );
            }
        }
    }
    None
}

fn parse_length(image_url: &str, length: Option<String>) -> Option<u64> {
    let length = length?;
    match length.trim().parse() {
        Ok(length) => Some(length),
        Err(_) => {
            warn!(
                "Remote image {} sent an invalid content-length: {:?}",
                image_url, length
            );
            None
        }
    }
}

/// Represents the result of a probe request.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents a failed probe request.
#[derive(Debug)]
pub enum Error {
    /// Returned when the server answered with an error status.
    Status(StatusCode),

    /// Returned for connection, TLS, timeout and other client errors.
    Http(reqwest::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Status(status) => write!(f, "HTTP Error {}", status),
            Error::Http(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Status(_) => None,
            Error::Http(err) => Some(err),
        }
    }
}

impl From<reqwest::Error> for Error {
    /// Converts [`reqwest::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator on client calls.
    fn from(err: reqwest::Error) -> Error {
        Error::Http(err)
    }
}
