//! HTTP exchange types and the blocking transport.
//!
//! # Design
//! Requests and responses are plain owned data. The client builds an
//! `HttpRequest`, hands it to a `Transport`, and interprets the returned
//! `HttpResponse`. Keeping the round-trip behind a trait lets the session
//! and pipeline logic run against a scripted transport in unit tests and
//! against a real socket everywhere else.

use std::fmt;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::{Error, Result};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether the payload travels as a JSON body rather than a query string.
    pub fn has_body(self) -> bool {
        !matches!(self, HttpMethod::Get)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Performs one blocking HTTP round-trip.
///
/// Implementations return 4xx/5xx responses as `Ok`; an `Err` means no
/// response was obtained at all.
pub trait Transport: Send {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

/// `Transport` backed by a blocking `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_timeouts(config.connect_timeout, config.timeout, config.max_redirects)
    }

    pub fn with_timeouts(connect: Duration, total: Duration, max_redirects: u32) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(connect))
            .timeout_global(Some(total))
            .max_redirects(max_redirects)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let url = request.url.as_str();
        let body = request.body.as_deref();

        let result = match request.method {
            HttpMethod::Get => with_headers(self.agent.get(url), &request.headers).call(),
            HttpMethod::Post => send(with_headers(self.agent.post(url), &request.headers), body),
            HttpMethod::Put => send(with_headers(self.agent.put(url), &request.headers), body),
            HttpMethod::Delete => send(
                with_headers(self.agent.delete(url), &request.headers).force_send_body(),
                body,
            ),
        };

        // The response (and its connection) is dropped at the end of this
        // scope whichever way the body read goes.
        let mut response = result.map_err(map_ureq_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(map_ureq_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers {
        // ureq derives content-length from the body it is given.
        if name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send(
    builder: ureq::RequestBuilder<ureq::typestate::WithBody>,
    body: Option<&str>,
) -> std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

fn map_ureq_error(err: ureq::Error) -> Error {
    match err {
        ureq::Error::Timeout(_) => Error::DeadlineExceeded,
        ureq::Error::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => Error::DeadlineExceeded,
        other => Error::Transport(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = HttpRequest {
            method: HttpMethod::Post,
            url: "http://localhost/auth/login".to_string(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some("{}".to_string()),
        };
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("authorization"), None);
    }

    #[test]
    fn response_header_lookup_ignores_case() {
        let resp = HttpResponse {
            status: 502,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: String::new(),
        };
        assert_eq!(resp.header("Content-Type"), Some("text/html"));
        assert_eq!(resp.header("location"), None);
    }

    #[test]
    fn only_get_sends_payload_as_query() {
        assert!(!HttpMethod::Get.has_body());
        assert!(HttpMethod::Post.has_body());
        assert!(HttpMethod::Put.has_body());
        assert!(HttpMethod::Delete.has_body());
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }

    #[test]
    fn unreachable_host_is_a_transport_error() {
        let transport = UreqTransport::with_timeouts(
            Duration::from_secs(2),
            Duration::from_secs(3),
            0,
        );
        // Port 9 (discard) on localhost is not expected to accept connections.
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: "http://127.0.0.1:9/my-account".to_string(),
            headers: Vec::new(),
            body: None,
        };
        let err = transport.execute(&req).unwrap_err();
        assert!(matches!(err, Error::Transport(_) | Error::DeadlineExceeded));
    }
}
