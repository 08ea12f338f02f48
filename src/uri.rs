//! URI resolution (component A).
//!
//! `resolve` implements RFC 3986 §5.3 reference resolution by hand, rather than delegating to
//! [`url::Url::join`], so that the edge cases the browser core depends on (an empty fragment or
//! query surviving resolution, a bare word like `http` staying a relative path segment instead of
//! being mistaken for a scheme) are pinned down rather than inherited from whatever the `url`
//! crate's own WHATWG-flavoured parser happens to do.

use std::fmt;

use crate::error::Error;

/// An absolute URI, backed by [`url::Url`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Uri(url::Url);

impl Uri {
    /// Parses an absolute URI from a string.
    pub fn parse(s: &str) -> Result<Uri, Error> {
        url::Url::parse(s)
            .map(Uri)
            .map_err(|e| Error::parse(format!("invalid URI {s:?}: {e}")))
    }

    /// The scheme, e.g. `"http"`.
    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// The host, if any.
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    /// The port, if explicitly present in the URI (does not infer scheme defaults).
    pub fn port(&self) -> Option<u16> {
        self.0.port()
    }

    /// `host[:port]`, the authority component.
    pub fn authority(&self) -> String {
        match self.0.port() {
            Some(port) => format!("{}:{}", self.host().unwrap_or_default(), port),
            None => self.host().unwrap_or_default().to_string(),
        }
    }

    /// The path, always starting with `/` for hierarchical URIs.
    pub fn path(&self) -> &str {
        self.0.path()
    }

    /// The query string, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.0.query()
    }

    /// The fragment, without the leading `#`.
    pub fn fragment(&self) -> Option<&str> {
        self.0.fragment()
    }

    /// Returns true if this URI uses the `https` scheme.
    pub fn is_secure(&self) -> bool {
        self.scheme().eq_ignore_ascii_case("https")
    }

    /// The default base URI used when the browser has not yet made a request:
    /// `http://localhost`.
    pub fn default_base() -> Uri {
        Uri(url::Url::parse("http://localhost").expect("static URL always parses"))
    }

    pub(crate) fn as_url(&self) -> &url::Url {
        &self.0
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Uri({:?})", self.0.as_str())
    }
}

/// A parsed URI-reference, split into its five RFC 3986 components. `None` distinguishes an
/// absent component from a present-but-empty one (`Some("")`), which matters for the empty
/// query/fragment edge cases.
struct Reference<'a> {
    scheme: Option<&'a str>,
    authority: Option<&'a str>,
    path: &'a str,
    query: Option<&'a str>,
    fragment: Option<&'a str>,
}

fn parse_reference(reference: &str) -> Reference<'_> {
    let (rest, fragment) = match reference.split_once('#') {
        Some((rest, frag)) => (rest, Some(frag)),
        None => (reference, None),
    };
    let (rest, query) = match rest.split_once('?') {
        Some((rest, q)) => (rest, Some(q)),
        None => (rest, None),
    };

    // A scheme is a leading token of scheme-grammar characters immediately followed by ':',
    // provided that colon appears before the first '/' (otherwise it's just a path segment that
    // happens to contain a colon later on, e.g. a relative path `foo:bar/baz`).
    let first_slash = rest.find('/');
    let colon = rest.find(':');
    let scheme_end = match (colon, first_slash) {
        (Some(c), Some(s)) if c < s => Some(c),
        (Some(c), None) => Some(c),
        _ => None,
    };
    let has_scheme = match scheme_end {
        Some(idx) => is_scheme_token(&rest[..idx]),
        None => false,
    };

    if has_scheme {
        let idx = scheme_end.unwrap();
        let scheme = &rest[..idx];
        let after = &rest[idx + 1..];
        if let Some(auth) = after.strip_prefix("//") {
            let path_start = auth.find('/').unwrap_or(auth.len());
            return Reference {
                scheme: Some(scheme),
                authority: Some(&auth[..path_start]),
                path: &auth[path_start..],
                query,
                fragment,
            };
        }
        return Reference {
            scheme: Some(scheme),
            authority: None,
            path: after,
            query,
            fragment,
        };
    }

    if let Some(auth) = rest.strip_prefix("//") {
        let path_start = auth.find('/').unwrap_or(auth.len());
        return Reference {
            scheme: None,
            authority: Some(&auth[..path_start]),
            path: &auth[path_start..],
            query,
            fragment,
        };
    }

    Reference {
        scheme: None,
        authority: None,
        path: rest,
        query,
        fragment,
    }
}

fn is_scheme_token(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
}

/// Removes `.` and `..` segments from a path per RFC 3986 §5.2.4.
fn remove_dot_segments(path: &str) -> String {
    let mut input: Vec<&str> = Vec::new();
    // Split into segments, keeping track of leading/trailing slash semantics by re-splitting on
    // '/': a path like "/a/b/../c" becomes ["", "a", "b", "..", "c"].
    for seg in path.split('/') {
        input.push(seg);
    }

    let mut output: Vec<&str> = Vec::new();
    let mut i = 0;
    let absolute = path.starts_with('/');
    while i < input.len() {
        match input[i] {
            "." => {
                // drop; if this was the last segment, leave a trailing empty marker.
                if i == input.len() - 1 {
                    output.push("");
                }
            }
            ".." => {
                // pop the last real segment (not counting a bare leading marker for "/").
                if output.last().map(|s| !s.is_empty()).unwrap_or(false) {
                    output.pop();
                } else if !absolute {
                    output.push("..");
                }
                if i == input.len() - 1 {
                    output.push("");
                }
            }
            seg => output.push(seg),
        }
        i += 1;
    }

    if output.is_empty() {
        return if absolute { "/".to_string() } else { String::new() };
    }
    let mut result = output.join("/");
    if absolute && !result.starts_with('/') {
        result.insert(0, '/');
    }
    result
}

fn merge_paths(base: &Uri, reference_path: &str) -> String {
    if !base.authority().is_empty() && base.path().is_empty() {
        return format!("/{reference_path}");
    }
    match base.path().rfind('/') {
        Some(idx) => format!("{}{}", &base.path()[..=idx], reference_path),
        None => reference_path.to_string(),
    }
}

/// Resolves `reference` against `base`, producing an absolute [`Uri`].
///
/// See the module docs and SPEC_FULL §4.A for the exact branch contract; this is a direct
/// implementation of RFC 3986 §5.3, which already covers every branch spec.md calls out by name
/// (absolute / scheme-relative / fragment-only / query-only / path-absolute / path-relative) as
/// special cases of the same merge algorithm.
pub fn resolve(base: &Uri, reference: &str) -> Result<Uri, Error> {
    let r = parse_reference(reference);

    if let Some(scheme) = r.scheme {
        // Absolute reference: returned unchanged beyond scheme-case, so parse it directly rather
        // than running it through remove_dot_segments.
        let _ = scheme;
        return Uri::parse(reference);
    }

    let (authority, path, query, fragment) = if let Some(auth) = r.authority {
        // Scheme-relative (`//host/...`): inherit base scheme, replace everything else.
        (auth.to_string(), remove_dot_segments(r.path), r.query.map(str::to_string), r.fragment.map(str::to_string))
    } else if r.path.is_empty() {
        // Fragment-only / query-only / empty reference: keep base path, and keep base query
        // unless the reference itself defines one.
        let query = if r.query.is_some() {
            r.query.map(str::to_string)
        } else {
            base.query().map(str::to_string)
        };
        (base.authority(), base.path().to_string(), query, r.fragment.map(str::to_string))
    } else if r.path.starts_with('/') {
        // Path-absolute: keep scheme+authority, replace path+query+fragment.
        (base.authority(), remove_dot_segments(r.path), r.query.map(str::to_string), r.fragment.map(str::to_string))
    } else {
        // Path-relative: merge against base's path.
        let merged = merge_paths(base, r.path);
        (base.authority(), remove_dot_segments(&merged), r.query.map(str::to_string), r.fragment.map(str::to_string))
    };

    let mut rebuilt = format!("{}://{}{}", base.scheme(), authority, path);
    if let Some(q) = &query {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    if let Some(f) = &fragment {
        rebuilt.push('#');
        rebuilt.push_str(f);
    }
    Uri::parse(&rebuilt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        Uri::parse(s).unwrap()
    }

    #[test]
    fn drops_last_segment_of_base_path() {
        let base = uri("http://x/foo");
        let got = resolve(&base, "bar").unwrap();
        assert_eq!(got.to_string(), "http://x/bar");
    }

    #[test]
    fn trailing_slash_base_keeps_directory() {
        let base = uri("http://x/foo/");
        let got = resolve(&base, "bar").unwrap();
        assert_eq!(got.to_string(), "http://x/foo/bar");
    }

    #[test]
    fn bare_word_http_is_not_a_scheme() {
        let base = uri("http://x/foo");
        let got = resolve(&base, "http").unwrap();
        assert_eq!(got.to_string(), "http://x/http");
    }

    #[test]
    fn scheme_relative_inherits_scheme() {
        let base = uri("https://x/foo");
        let got = resolve(&base, "//y/z").unwrap();
        assert_eq!(got.to_string(), "https://y/z");
    }

    #[test]
    fn path_absolute_replaces_path_only() {
        let base = uri("http://x/foo/bar?old#frag");
        let got = resolve(&base, "/baz").unwrap();
        assert_eq!(got.to_string(), "http://x/baz");
    }

    #[test]
    fn fragment_only_preserves_query() {
        let base = uri("http://x/foo?q=1");
        let got = resolve(&base, "#").unwrap();
        assert_eq!(got.to_string(), "http://x/foo?q=1#");
    }

    #[test]
    fn query_only_clears_fragment() {
        let base = uri("http://x/foo?old#frag");
        let got = resolve(&base, "?").unwrap();
        assert_eq!(got.to_string(), "http://x/foo?");
    }

    #[test]
    fn absolute_reference_is_returned_unchanged() {
        let base = uri("http://x/foo");
        let got = resolve(&base, "https://y.example/a/b").unwrap();
        assert_eq!(got.to_string(), "https://y.example/a/b");
    }

    #[test]
    fn default_base_is_http_localhost() {
        let base = Uri::default_base();
        assert_eq!(base.scheme(), "http");
        assert_eq!(base.host(), Some("localhost"));
    }
}
