//! `Response`, the other half of component C.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};

use crate::uri::Uri;

/// A completed response, as handed back by the transport adapter and stored verbatim in history.
///
/// `content()` returns the raw body exactly as received; callers that want it filtered through a
/// response-content hook (SPEC_FULL §4.D, the REDESIGN FLAGS closure-based filter) call
/// [`Browser::response`](crate::browser::Browser::response) instead, which applies the hook on
/// top of this.
#[derive(Debug, Clone)]
pub struct Response {
    uri: Uri,
    status: StatusCode,
    headers: HeaderMap,
    content: Bytes,
}

impl Response {
    pub fn new(uri: Uri, status: StatusCode, headers: HeaderMap, content: Bytes) -> Response {
        Response {
            uri,
            status,
            headers,
            content,
        }
    }

    /// The final URI this response came from (after following any redirects the transport itself
    /// performed — but the browser core only ever hands the transport one hop at a time, so in
    /// practice this equals the request URI).
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The raw response body.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// The response body decoded as UTF-8 text, lossily substituting invalid sequences. Used by
    /// the HTML façade and by meta-refresh detection.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.content).into_owned()
    }

    /// True for 3xx status codes that carry a `Location` header, i.e. this response triggers
    /// HTTP-level redirection per SPEC_FULL §4.C.
    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection() && self.headers.contains_key(http::header::LOCATION)
    }

    /// The `Location` header value, if present.
    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(http::header::LOCATION)
            .and_then(|v| v.to_str().ok())
    }
}
