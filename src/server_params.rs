//! The server-parameter dictionary (half of component C) and its folding into outgoing headers.
//!
//! Modelled as a typed configuration with explicit fields for the well-known keys plus a
//! catch-all map for arbitrary `HTTP_*` entries, per Design Note "Dynamic server-parameter
//! dictionary" — the same shape the teacher uses for its own large `Config` struct in
//! `client/client.rs`, and the same manual-builder ergonomics as `client/emulation.rs`'s
//! `EmulationProviderBuilder`.

use std::collections::BTreeMap;

use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::uri::Uri;

/// Caller-controlled key-value configuration that becomes outgoing request headers and
/// environment flags (`HTTPS`, auth). See SPEC_FULL §6.
#[derive(Debug, Clone, Default)]
pub struct ServerParams {
    /// Arbitrary `HTTP_<X>` entries, keyed by the header name they fold into (lowercase,
    /// `_` already replaced with `-`, e.g. `"x-requested-with"`).
    http: BTreeMap<String, String>,
    pub http_host: Option<String>,
    pub https: Option<bool>,
    pub http_referer: Option<String>,
    pub http_user_agent: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<String>,
    pub content_md5: Option<String>,
    pub php_auth_user: Option<String>,
    pub php_auth_pw: Option<String>,
}

impl ServerParams {
    pub fn new() -> ServerParams {
        ServerParams::default()
    }

    /// Sets an arbitrary server parameter by its PHP-SAPI-style key (`"HTTP_X_FOO"`, `"HTTPS"`,
    /// `"CONTENT_TYPE"`, ...). Well-known keys are routed to their typed field; anything else
    /// starting with `HTTP_` is folded into the catch-all header map.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match key {
            "HTTP_HOST" => self.http_host = Some(value),
            "HTTPS" => self.https = Some(value.eq_ignore_ascii_case("true") || value == "1"),
            "HTTP_REFERER" => self.http_referer = Some(value),
            "HTTP_USER_AGENT" => self.http_user_agent = Some(value),
            "CONTENT_TYPE" => self.content_type = Some(value),
            "CONTENT_LENGTH" => self.content_length = Some(value),
            "CONTENT_MD5" => self.content_md5 = Some(value),
            "PHP_AUTH_USER" => self.php_auth_user = Some(value),
            "PHP_AUTH_PW" => self.php_auth_pw = Some(value),
            key if key.starts_with("HTTP_") => {
                self.http.insert(header_name_for(key), value);
            }
            _ => {
                self.http.insert(key.to_ascii_lowercase(), value);
            }
        }
    }

    /// Reads back a server parameter by its PHP-SAPI-style key. Returns `None` if it was never
    /// explicitly set — callers distinguish "default-effective" from "user-configured" this way,
    /// per SPEC_FULL §6.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "HTTP_HOST" => self.http_host.clone(),
            "HTTPS" => self.https.map(|b| b.to_string()),
            "HTTP_REFERER" => self.http_referer.clone(),
            "HTTP_USER_AGENT" => self.http_user_agent.clone(),
            "CONTENT_TYPE" => self.content_type.clone(),
            "CONTENT_LENGTH" => self.content_length.clone(),
            "CONTENT_MD5" => self.content_md5.clone(),
            "PHP_AUTH_USER" => self.php_auth_user.clone(),
            "PHP_AUTH_PW" => self.php_auth_pw.clone(),
            key if key.starts_with("HTTP_") => self.http.get(&header_name_for(key)).cloned(),
            key => self.http.get(&key.to_ascii_lowercase()).cloned(),
        }
    }

    /// Every catch-all `HTTP_*` entry as `(header-name, value)` pairs, e.g. `("x-requested-with",
    /// "XMLHttpRequest")`. Used by the browser core to merge one `ServerParams` on top of another.
    pub(crate) fn iter_http(&self) -> impl Iterator<Item = (&String, &String)> {
        self.http.iter()
    }

    /// Recomputes `HTTP_HOST` and `HTTPS` from `uri`, per SPEC_FULL §6/§4.C step 5.
    pub(crate) fn recompute_for(&mut self, uri: &Uri) {
        self.https = Some(uri.is_secure());
        self.http_host = Some(uri.authority());
    }

    /// Folds every server parameter into an outgoing [`HeaderMap`], per SPEC_FULL §4.D.
    pub(crate) fn to_header_map(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.http {
            insert_header(&mut headers, name, value);
        }
        if let Some(host) = &self.http_host {
            insert_header(&mut headers, "host", host);
        }
        if let Some(referer) = &self.http_referer {
            insert_header(&mut headers, "referer", referer);
        }
        let user_agent = self
            .http_user_agent
            .clone()
            .unwrap_or_else(|| format!("browserkit/{}", env!("CARGO_PKG_VERSION")));
        insert_header(&mut headers, "user-agent", &user_agent);
        if let Some(ct) = &self.content_type {
            insert_header(&mut headers, "content-type", ct);
        }
        if let Some(cl) = &self.content_length {
            insert_header(&mut headers, "content-length", cl);
        }
        if let Some(md5) = &self.content_md5 {
            insert_header(&mut headers, "content-md5", md5);
        }
        if let (Some(user), pw) = (&self.php_auth_user, &self.php_auth_pw) {
            use base64::Engine;
            let credentials = format!("{}:{}", user, pw.clone().unwrap_or_default());
            let encoded = base64::engine::general_purpose::STANDARD.encode(credentials.as_bytes());
            insert_header(&mut headers, "authorization", &format!("Basic {encoded}"));
        }
        headers
    }
}

fn insert_header(headers: &mut HeaderMap, name: &str, value: &str) {
    if let (Ok(name), Ok(value)) = (
        HeaderName::from_bytes(name.as_bytes()),
        HeaderValue::from_str(value),
    ) {
        headers.insert(name, value);
    }
}

/// `HTTP_X_REQUESTED_WITH` -> `"x-requested-with"`.
fn header_name_for(key: &str) -> String {
    key.trim_start_matches("HTTP_").to_ascii_lowercase().replace('_', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_getter_distinguishes_default_from_configured() {
        let params = ServerParams::new();
        assert_eq!(params.get("HTTP_USER_AGENT"), None);
        let mut params = ServerParams::new();
        params.set("HTTP_USER_AGENT", "my-agent/1.0");
        assert_eq!(params.get("HTTP_USER_AGENT").as_deref(), Some("my-agent/1.0"));
    }

    #[test]
    fn arbitrary_http_key_folds_into_header_name() {
        let mut params = ServerParams::new();
        params.set("HTTP_X_REQUESTED_WITH", "XMLHttpRequest");
        let headers = params.to_header_map();
        assert_eq!(
            headers.get("x-requested-with").unwrap(),
            "XMLHttpRequest"
        );
    }

    #[test]
    fn https_recomputed_from_uri() {
        let mut params = ServerParams::new();
        params.recompute_for(&Uri::parse("https://example.com/").unwrap());
        assert_eq!(params.https, Some(true));
        params.recompute_for(&Uri::parse("http://example.com/").unwrap());
        assert_eq!(params.https, Some(false));
    }

    #[test]
    fn http_host_recomputed_from_uri() {
        let mut params = ServerParams::new();
        params.recompute_for(&Uri::parse("https://example.com/a").unwrap());
        assert_eq!(params.http_host.as_deref(), Some("example.com"));
        params.recompute_for(&Uri::parse("https://other.example:8080/b").unwrap());
        assert_eq!(params.http_host.as_deref(), Some("other.example:8080"));
    }

    #[test]
    fn basic_auth_header_is_folded() {
        let mut params = ServerParams::new();
        params.set("PHP_AUTH_USER", "alice");
        params.set("PHP_AUTH_PW", "secret");
        let headers = params.to_header_map();
        let value = headers.get("authorization").unwrap().to_str().unwrap();
        assert!(value.starts_with("Basic "));
    }
}
