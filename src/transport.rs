//! Transport adapter (component E): translates an internal [`Request`] into a transport call and
//! the reply back into an internal [`Response`], performing no redirects of its own — the browser
//! core owns redirect logic (SPEC_FULL §4.D).
//!
//! Grounded on the teacher's [`CookieStore`](crate::cookie::CookieStore) trait shape (a small
//! `Send + Sync` collaborator trait) and on `client/client/service.rs`'s `ClientService`, which
//! folds cookie-jar reads/writes around a single transport call the same way `dispatch` does here.

use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE, COOKIE};
use http::{HeaderMap, HeaderValue, Method, StatusCode};
use std::collections::HashMap;

use crate::error::Error;
use crate::request::{encode_form, FileField, Request};
use crate::response::Response;

/// A normalised, ready-to-send request as the transport sees it: method, URI, headers and an
/// already-encoded body. Built by [`build_headers`]/[`build_body`] from a [`Request`].
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub method: Method,
    pub uri: crate::uri::Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// The pluggable HTTP collaborator. Implementations perform the actual network I/O (or, in tests,
/// return canned data) and must not follow redirects themselves.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &WireRequest) -> Result<Response, Error>;
}

/// Builds the outgoing headers for `request`, folding `server` parameters and the jar's raw
/// cookie values into a single `HeaderMap`, per SPEC_FULL §4.D.
pub fn build_headers(request: &Request) -> HeaderMap {
    let mut headers = request.server().to_header_map();
    if !request.cookies().is_empty() {
        let cookie_header = request
            .cookies()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ");
        if let Ok(value) = HeaderValue::from_str(&cookie_header) {
            headers.insert(COOKIE, value);
        }
    }
    headers
}

/// Builds the outgoing body for `request`: multipart when `files` is non-empty, url-encoded form
/// when only `parameters` are set, raw bytes when `content` is set, and empty for GET/HEAD or an
/// otherwise-empty request. Mirrors SPEC_FULL §4.D's precedence (`content` overrides
/// `parameters`).
pub fn build_body(request: &Request, headers: &mut HeaderMap) -> Bytes {
    if matches!(*request.method(), Method::GET | Method::HEAD) {
        return Bytes::new();
    }
    if let Some(content) = request.content() {
        return Bytes::copy_from_slice(content);
    }
    if !request.files().is_empty() {
        return build_multipart(request, headers);
    }
    if !request.parameters().is_empty() {
        let body = encode_form(request.parameters());
        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_str(mime::APPLICATION_WWW_FORM_URLENCODED.as_ref())
                    .expect("mime constant is a valid header value"),
            );
        }
        return Bytes::from(body);
    }
    Bytes::new()
}

const MULTIPART_BOUNDARY: &str = "----browserkit-boundary";

fn build_multipart(request: &Request, headers: &mut HeaderMap) -> Bytes {
    let mut body = Vec::new();
    let mut push_field = |name: &str, value: &str, body: &mut Vec<u8>| {
        body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    };

    for (key, value) in request.parameters() {
        if let crate::request::Parameter::Value(v) = value {
            push_field(key, v, &mut body);
        }
    }
    for (field, file) in request.files() {
        push_multipart_file(field, file, &mut body);
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_str(&format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"))
            .expect("boundary is ASCII"),
    );
    headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    Bytes::from(body)
}

fn push_multipart_file(field: &str, file: &FileField, body: &mut Vec<u8>) {
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{}\"\r\n",
            file.client_name
        )
        .as_bytes(),
    );
    let content_type = file
        .content_type
        .clone()
        .unwrap_or_else(|| mime_guess::from_path(&file.tmp_path).first_or_octet_stream().to_string());
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    if let Ok(contents) = std::fs::read(&file.tmp_path) {
        body.extend_from_slice(&contents);
    }
    body.extend_from_slice(b"\r\n");
}

/// A canned, in-memory [`Transport`] for tests and the bundled example: responses are looked up by
/// `METHOD uri` rather than dispatched over a real socket, so this crate's own test suite exercises
/// the full adapter contract (header folding, body selection) without network I/O. Real consumers
/// wire up their own transport against `hyper`/`reqwest`/etc. — that is explicitly out of scope
/// here (SPEC_FULL §1).
#[derive(Debug, Default)]
pub struct ChannelTransport {
    routes: HashMap<String, CannedResponse>,
}

#[derive(Debug, Clone)]
struct CannedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ChannelTransport {
    pub fn new() -> ChannelTransport {
        ChannelTransport::default()
    }

    /// Registers a canned response for `method uri`. Later calls for the same key overwrite
    /// earlier ones, so a test can reprogram a route between dispatches (e.g. simulate a 302 that
    /// stops redirecting on the second hit).
    pub fn on(
        mut self,
        method: Method,
        uri: &str,
        status: StatusCode,
        headers: HeaderMap,
        body: impl Into<Bytes>,
    ) -> ChannelTransport {
        self.routes.insert(
            route_key(&method, uri),
            CannedResponse { status, headers, body: body.into() },
        );
        self
    }
}

fn route_key(method: &Method, uri: &str) -> String {
    format!("{method} {uri}")
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, request: &WireRequest) -> Result<Response, Error> {
        let key = route_key(&request.method, request.uri.to_string().as_str());
        match self.routes.get(&key) {
            Some(canned) => Ok(Response::new(
                request.uri.clone(),
                canned.status,
                canned.headers.clone(),
                canned.body.clone(),
            )),
            None => Err(Error::transport(format!("no canned response for {key}")).with_uri(request.uri.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uri::Uri;

    fn req(method: Method, uri: &str) -> Request {
        Request::builder(method, Uri::parse(uri).unwrap()).build()
    }

    #[test]
    fn get_has_no_body() {
        let request = req(Method::GET, "http://x/");
        let mut headers = build_headers(&request);
        let body = build_body(&request, &mut headers);
        assert!(body.is_empty());
    }

    #[test]
    fn post_parameters_encode_as_form() {
        let mut params = crate::request::Parameters::new();
        params.insert("a".to_string(), crate::request::Parameter::Value("1".to_string()));
        let request = Request::builder(Method::POST, Uri::parse("http://x/").unwrap())
            .parameters(params)
            .build();
        let mut headers = build_headers(&request);
        let body = build_body(&request, &mut headers);
        assert_eq!(body.as_ref(), b"a=1");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/x-www-form-urlencoded");
    }

    #[test]
    fn content_overrides_parameters() {
        let mut params = crate::request::Parameters::new();
        params.insert("a".to_string(), crate::request::Parameter::Value("1".to_string()));
        let request = Request::builder(Method::POST, Uri::parse("http://x/").unwrap())
            .parameters(params)
            .content(b"raw".to_vec())
            .build();
        let mut headers = build_headers(&request);
        let body = build_body(&request, &mut headers);
        assert_eq!(body.as_ref(), b"raw");
    }

    #[test]
    fn cookie_header_is_folded_from_request_snapshot() {
        let mut request = req(Method::GET, "http://x/");
        request.set_cookies(vec![("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]);
        let headers = build_headers(&request);
        assert_eq!(headers.get(COOKIE).unwrap(), "a=1; b=2");
    }

    #[tokio::test]
    async fn channel_transport_returns_canned_response() {
        let transport = ChannelTransport::new().on(
            Method::GET,
            "http://x/",
            StatusCode::OK,
            HeaderMap::new(),
            "hello",
        );
        let wire = WireRequest {
            method: Method::GET,
            uri: Uri::parse("http://x/").unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        };
        let response = transport.send(&wire).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text(), "hello");
    }

    #[tokio::test]
    async fn channel_transport_errors_on_unknown_route() {
        let transport = ChannelTransport::new();
        let wire = WireRequest {
            method: Method::GET,
            uri: Uri::parse("http://x/missing").unwrap(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        };
        assert!(transport.send(&wire).await.is_err());
    }
}
