//! HTTP cookies (component B).
//!
//! `CookieJar` implements the RFC 6265 domain (§5.1.3) and path (§5.1.4) matching rules directly,
//! rather than delegating to an opaque third-party store, because the browser core needs to
//! assert on exactly which cookies are sent/stored in each of the scenarios in SPEC_FULL §8.

use std::time::{Duration, SystemTime};

use crate::uri::Uri;

/// A single HTTP cookie, as observed via `Set-Cookie` or constructed directly.
#[derive(Debug, Clone)]
pub struct Cookie {
    name: String,
    value: String,
    path: String,
    domain: String,
    host_only: bool,
    expires: Option<SystemTime>,
    secure: bool,
    http_only: bool,
    same_site: SameSite,
}

/// The `SameSite` attribute of a cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    Strict,
    Lax,
    #[default]
    None,
}

impl Cookie {
    /// Builds a cookie directly (as opposed to parsing one from a `Set-Cookie` header).
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Cookie {
        Cookie {
            name: name.into(),
            value: value.into(),
            path: "/".to_string(),
            domain: String::new(),
            host_only: true,
            expires: None,
            secure: false,
            http_only: false,
            same_site: SameSite::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The raw (as received) value.
    pub fn raw_value(&self) -> &str {
        &self.value
    }

    /// The percent-decoded value.
    pub fn value(&self) -> String {
        percent_encoding::percent_decode_str(&self.value)
            .decode_utf8_lossy()
            .into_owned()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// True if this cookie was not given an explicit `Domain` attribute (host-only cookie).
    pub fn is_host_only(&self) -> bool {
        self.host_only
    }

    pub fn expires(&self) -> Option<SystemTime> {
        self.expires
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn http_only(&self) -> bool {
        self.http_only
    }

    pub fn same_site(&self) -> SameSite {
        self.same_site
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Cookie {
        self.path = path.into();
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Cookie {
        self.domain = domain.into();
        self.host_only = false;
        self
    }

    pub fn with_secure(mut self, secure: bool) -> Cookie {
        self.secure = secure;
        self
    }

    pub fn with_expires(mut self, expires: SystemTime) -> Cookie {
        self.expires = Some(expires);
        self
    }

    fn is_expired(&self, now: SystemTime) -> bool {
        matches!(self.expires, Some(t) if t <= now)
    }

    /// Parses a single `Set-Cookie` header value, scoping `Domain`/`Path` defaults against
    /// `default_uri` per RFC 6265 §5.2. Returns `None` on a malformed cookie (callers ignore it
    /// silently, per SPEC_FULL §4.B).
    fn parse(raw: &str, default_uri: &Uri) -> Option<Cookie> {
        let parsed = cookie_crate::Cookie::parse(raw.to_string()).ok()?;
        if parsed.name().is_empty() {
            return None;
        }

        let host_only;
        let domain = match parsed.domain() {
            Some(d) if !d.is_empty() => {
                host_only = false;
                d.trim_start_matches('.').to_ascii_lowercase()
            }
            _ => {
                host_only = true;
                default_uri.host().unwrap_or_default().to_ascii_lowercase()
            }
        };

        let path = match parsed.path() {
            Some(p) if p.starts_with('/') => p.to_string(),
            _ => default_path(default_uri.path()),
        };

        let expires = match parsed.max_age() {
            Some(max_age) => {
                let secs = max_age.whole_seconds();
                if secs <= 0 {
                    Some(SystemTime::UNIX_EPOCH)
                } else {
                    Some(SystemTime::now() + Duration::from_secs(secs as u64))
                }
            }
            None => match parsed.expires() {
                Some(cookie_crate::Expiration::DateTime(dt)) => Some(SystemTime::from(dt)),
                _ => None,
            },
        };

        let same_site = match parsed.same_site() {
            Some(cookie_crate::SameSite::Strict) => SameSite::Strict,
            Some(cookie_crate::SameSite::Lax) => SameSite::Lax,
            _ => SameSite::None,
        };

        Some(Cookie {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            path,
            domain,
            host_only,
            expires,
            secure: parsed.secure().unwrap_or(false),
            http_only: parsed.http_only().unwrap_or(false),
            same_site,
        })
    }

    /// RFC 6265 §5.1.3: domain-match between a request host and a cookie's domain.
    fn domain_matches(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        if self.host_only {
            return host == self.domain;
        }
        if host == self.domain {
            return true;
        }
        host.ends_with(&self.domain)
            && host.as_bytes()[host.len() - self.domain.len() - 1] == b'.'
            && host.parse::<std::net::IpAddr>().is_err()
    }

    /// RFC 6265 §5.1.4: path-match between a request path and a cookie's path.
    fn path_matches(&self, request_path: &str) -> bool {
        if request_path == self.path {
            return true;
        }
        request_path.starts_with(&self.path)
            && (self.path.ends_with('/') || request_path[self.path.len()..].starts_with('/'))
    }

    fn applies_to(&self, uri: &Uri, now: SystemTime) -> bool {
        if self.is_expired(now) {
            return false;
        }
        let host = match uri.host() {
            Some(h) => h,
            None => return false,
        };
        if !self.domain_matches(host) {
            return false;
        }
        if !self.path_matches(uri.path()) {
            return false;
        }
        if self.secure && !uri.is_secure() {
            return false;
        }
        true
    }
}

/// RFC 6265 §5.1.4: the default path for a cookie with no explicit `Path` attribute.
fn default_path(request_path: &str) -> String {
    if !request_path.starts_with('/') {
        return "/".to_string();
    }
    match request_path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => request_path[..idx].to_string(),
    }
}

/// A scoped store of cookies. See SPEC_FULL §4.B.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: Vec<Cookie>,
}

impl CookieJar {
    pub fn new() -> CookieJar {
        CookieJar::default()
    }

    /// Overwrites any existing cookie with the same `(name, path, domain)` key.
    pub fn set(&mut self, cookie: Cookie) {
        self.cookies.retain(|c| {
            !(c.name == cookie.name && c.path == cookie.path && c.domain == cookie.domain)
        });
        self.cookies.push(cookie);
    }

    /// Removes cookies matching `name`, optionally narrowed by `path`/`domain`.
    pub fn expire(&mut self, name: &str, path: Option<&str>, domain: Option<&str>) {
        self.cookies.retain(|c| {
            let name_matches = c.name == name;
            let path_matches = path.map(|p| p == c.path).unwrap_or(true);
            let domain_matches = domain.map(|d| d.eq_ignore_ascii_case(&c.domain)).unwrap_or(true);
            !(name_matches && path_matches && domain_matches)
        });
    }

    /// Drops every cookie in the jar.
    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    /// True if the jar holds no cookies (regardless of expiry).
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Parses every `Set-Cookie` value in `headers` and folds the results into the jar.
    /// Malformed cookies are skipped silently, per SPEC_FULL §4.B.
    pub fn update_from_set_cookie<'a, I>(&mut self, headers: I, default_uri: &Uri)
    where
        I: IntoIterator<Item = &'a str>,
    {
        for raw in headers {
            if let Some(cookie) = Cookie::parse(raw, default_uri) {
                self.set(cookie);
            }
        }
    }

    /// Cookies applicable to `uri`, decoded, as `name -> value`.
    pub fn all_values(&self, uri: &Uri) -> Vec<(String, String)> {
        let now = SystemTime::now();
        self.cookies
            .iter()
            .filter(|c| c.applies_to(uri, now))
            .map(|c| (c.name.clone(), c.value()))
            .collect()
    }

    /// Cookies applicable to `uri`, raw (undecoded), as `name -> value` — used to build the
    /// outgoing `Cookie:` header.
    pub fn all_raw_values(&self, uri: &Uri) -> Vec<(String, String)> {
        let now = SystemTime::now();
        self.cookies
            .iter()
            .filter(|c| c.applies_to(uri, now))
            .map(|c| (c.name.clone(), c.value.clone()))
            .collect()
    }

    /// Every cookie currently in the jar, expired or not (used by `restart`'s invariant check).
    pub fn all(&self) -> &[Cookie] {
        &self.cookies
    }
}

/// A pluggable jar backend, so a `BrowserBuilder` can accept an external store instead of the
/// built-in [`CookieJar`]. Mirrors the teacher's own `CookieStore` trait shape
/// (`set_cookies`/`cookies`/`clear`), generalized to the browser's richer jar contract.
pub trait CookieStore: Send + Sync {
    fn update_from_set_cookie(&mut self, headers: &[&str], default_uri: &Uri);
    fn all_values(&self, uri: &Uri) -> Vec<(String, String)>;
    fn all_raw_values(&self, uri: &Uri) -> Vec<(String, String)>;
    fn clear(&mut self);
    fn is_empty(&self) -> bool;
}

impl CookieStore for CookieJar {
    fn update_from_set_cookie(&mut self, headers: &[&str], default_uri: &Uri) {
        CookieJar::update_from_set_cookie(self, headers.iter().copied(), default_uri);
    }

    fn all_values(&self, uri: &Uri) -> Vec<(String, String)> {
        CookieJar::all_values(self, uri)
    }

    fn all_raw_values(&self, uri: &Uri) -> Vec<(String, String)> {
        CookieJar::all_raw_values(self, uri)
    }

    fn clear(&mut self) {
        CookieJar::clear(self)
    }

    fn is_empty(&self) -> bool {
        CookieJar::is_empty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        Uri::parse(s).unwrap()
    }

    #[test]
    fn stores_host_only_cookie_with_default_path() {
        let mut jar = CookieJar::new();
        jar.update_from_set_cookie(["foo=bar"], &uri("http://example.com/a/b"));
        let values = jar.all_values(&uri("http://example.com/a/b"));
        assert_eq!(values, vec![("foo".to_string(), "bar".to_string())]);
        // Different directory, no longer matches the default path "/a".
        let values = jar.all_values(&uri("http://example.com/other"));
        assert!(values.is_empty());
    }

    #[test]
    fn secure_cookie_not_sent_over_http() {
        let mut jar = CookieJar::new();
        jar.update_from_set_cookie(["foo=bar; Secure"], &uri("https://example.com/"));
        assert_eq!(jar.all_values(&uri("https://example.com/")).len(), 1);
        assert!(jar.all_values(&uri("http://example.com/")).is_empty());
    }

    #[test]
    fn domain_cookie_matches_subdomains() {
        let mut jar = CookieJar::new();
        jar.update_from_set_cookie(
            ["foo=bar; Domain=example.com; Path=/"],
            &uri("https://www.example.com/"),
        );
        assert_eq!(jar.all_values(&uri("https://sub.example.com/")).len(), 1);
        assert!(jar.all_values(&uri("https://otherexample.com/")).is_empty());
    }

    #[test]
    fn malformed_cookie_is_ignored() {
        let mut jar = CookieJar::new();
        jar.update_from_set_cookie(["=no-name"], &uri("http://example.com/"));
        assert!(jar.is_empty());
    }

    #[test]
    fn set_overwrites_by_name_path_domain() {
        let mut jar = CookieJar::new();
        jar.set(Cookie::new("foo", "1").with_domain("localhost"));
        jar.set(Cookie::new("foo", "2").with_domain("localhost"));
        let values = jar.all_values(&uri("http://localhost/"));
        assert_eq!(values, vec![("foo".to_string(), "2".to_string())]);
    }

    #[test]
    fn clear_drops_everything() {
        let mut jar = CookieJar::new();
        jar.set(Cookie::new("foo", "1").with_domain("localhost"));
        jar.clear();
        assert!(jar.is_empty());
    }
}
