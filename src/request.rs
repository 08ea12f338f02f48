//! `Request`, the immutable snapshot component C describes (plus its builder).

use std::collections::BTreeMap;
use std::path::PathBuf;

use http::Method;
use serde::{Deserialize, Serialize};

use crate::server_params::ServerParams;
use crate::uri::Uri;

/// A form/query parameter value. Arbitrary nesting is preserved for form encoding, per SPEC_FULL
/// §3 ("value may be string, nested mapping, or list"). Shaped like `serde_json::Value`'s
/// string/array/object triad, and `Serialize`/`Deserialize` so a caller can snapshot a parameter
/// tree to JSON for test fixtures or request logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Parameter {
    Value(String),
    List(Vec<Parameter>),
    Map(BTreeMap<String, Parameter>),
}

impl From<&str> for Parameter {
    fn from(s: &str) -> Parameter {
        Parameter::Value(s.to_string())
    }
}

impl From<String> for Parameter {
    fn from(s: String) -> Parameter {
        Parameter::Value(s)
    }
}

pub type Parameters = BTreeMap<String, Parameter>;

/// An uploaded file attached to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileField {
    pub tmp_path: PathBuf,
    pub client_name: String,
    pub content_type: Option<String>,
}

/// An immutable request snapshot. See SPEC_FULL §3.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    parameters: Parameters,
    files: BTreeMap<String, FileField>,
    server: ServerParams,
    content: Option<Vec<u8>>,
    cookies: Vec<(String, String)>,
}

impl Request {
    pub fn builder(method: Method, uri: Uri) -> RequestBuilder {
        RequestBuilder {
            method,
            uri,
            parameters: Parameters::new(),
            files: BTreeMap::new(),
            server: ServerParams::new(),
            content: None,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn files(&self) -> &BTreeMap<String, FileField> {
        &self.files
    }

    pub fn server(&self) -> &ServerParams {
        &self.server
    }

    pub fn server_mut(&mut self) -> &mut ServerParams {
        &mut self.server
    }

    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    pub fn cookies(&self) -> &[(String, String)] {
        &self.cookies
    }

    pub(crate) fn set_cookies(&mut self, cookies: Vec<(String, String)>) {
        self.cookies = cookies;
    }

    /// Re-expressed per the redirect algorithm (SPEC_FULL §4.C step 4): drop body/parameters and
    /// demote to GET.
    pub(crate) fn demote_to_get(&mut self) {
        self.method = Method::GET;
        self.parameters.clear();
        self.files.clear();
        self.content = None;
    }

    pub(crate) fn retarget(&mut self, uri: Uri) {
        self.uri = uri;
    }
}

/// Builder for [`Request`], mirroring the teacher's manual-builder style
/// (`EmulationProviderBuilder`).
pub struct RequestBuilder {
    method: Method,
    uri: Uri,
    parameters: Parameters,
    files: BTreeMap<String, FileField>,
    server: ServerParams,
    content: Option<Vec<u8>>,
}

impl RequestBuilder {
    pub fn parameters(mut self, parameters: Parameters) -> RequestBuilder {
        self.parameters = parameters;
        self
    }

    pub fn files(mut self, files: BTreeMap<String, FileField>) -> RequestBuilder {
        self.files = files;
        self
    }

    pub fn server(mut self, server: ServerParams) -> RequestBuilder {
        self.server = server;
        self
    }

    pub fn content(mut self, content: impl Into<Vec<u8>>) -> RequestBuilder {
        self.content = Some(content.into());
        self
    }

    pub fn build(self) -> Request {
        Request {
            method: self.method,
            uri: self.uri,
            parameters: self.parameters,
            files: self.files,
            server: self.server,
            content: self.content,
            cookies: Vec::new(),
        }
    }
}

/// URL-encodes `parameters` as a `application/x-www-form-urlencoded` body, per SPEC_FULL §4.D.
/// Nested maps/lists are flattened PHP-style (`a[b]=1&a[c]=2`, `a[]=1&a[]=2`), which is the
/// convention the spec's `parameters` shape (arbitrary nesting) is modelled after; the flattened
/// `(key, value)` pairs are then handed to `serde_urlencoded` for the actual percent-encoding,
/// matching the teacher's own `serde_urlencoded` dependency rather than a hand-rolled encoder.
pub fn encode_form(parameters: &Parameters) -> String {
    let mut pairs = Vec::new();
    for (key, value) in parameters {
        flatten(key, value, &mut pairs);
    }
    serde_urlencoded::to_string(&pairs).unwrap_or_default()
}

fn flatten(prefix: &str, value: &Parameter, out: &mut Vec<(String, String)>) {
    match value {
        Parameter::Value(v) => out.push((prefix.to_string(), v.clone())),
        Parameter::List(items) => {
            for item in items {
                flatten(&format!("{prefix}[]"), item, out);
            }
        }
        Parameter::Map(map) => {
            for (k, v) in map {
                flatten(&format!("{prefix}[{k}]"), v, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_form_flattens_nesting() {
        let mut params = Parameters::new();
        params.insert("name".to_string(), Parameter::Value("alice".to_string()));
        params.insert(
            "tags".to_string(),
            Parameter::List(vec![Parameter::Value("a".to_string()), Parameter::Value("b".to_string())]),
        );
        let encoded = encode_form(&params);
        assert!(encoded.contains("name=alice"));
        assert!(encoded.contains("tags%5B%5D=a"));
        assert!(encoded.contains("tags%5B%5D=b"));
    }

    #[test]
    fn parameter_round_trips_through_json() {
        let mut params = Parameters::new();
        params.insert(
            "tags".to_string(),
            Parameter::List(vec![Parameter::Value("a".to_string())]),
        );
        let value = Parameter::Map(params);
        let json = serde_json::to_string(&value).unwrap();
        let back: Parameter = serde_json::from_str(&json).unwrap();
        assert_eq!(value, back);
    }

    #[test]
    fn demote_to_get_clears_body() {
        let uri = Uri::parse("http://example.com/").unwrap();
        let mut req = Request::builder(Method::POST, uri)
            .content(b"payload".to_vec())
            .build();
        req.demote_to_get();
        assert_eq!(*req.method(), Method::GET);
        assert!(req.content().is_none());
        assert!(req.parameters().is_empty());
    }
}
