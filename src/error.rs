//! Error type shared across the crate.

use std::fmt;

use crate::uri::Uri;

/// A boxed error, used for opaque transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The crate's single error type.
///
/// Mirrors the three taxonomies from the design: programming errors (`Kind::Logic`), navigation
/// errors (`Kind::InvalidArgument`), and transport errors (`Kind::Transport`), plus `Kind::Parse`
/// for malformed input the browser itself rejects (e.g. an unresolvable URI).
pub struct Error {
    kind: Kind,
    source: Option<BoxError>,
    uri: Option<Uri>,
}

#[derive(Debug)]
enum Kind {
    Logic(String),
    InvalidArgument(String),
    Transport,
    Parse(String),
}

impl Error {
    pub(crate) fn logic<S: Into<String>>(reason: S) -> Error {
        Error {
            kind: Kind::Logic(reason.into()),
            source: None,
            uri: None,
        }
    }

    pub(crate) fn invalid_argument<S: Into<String>>(reason: S) -> Error {
        Error {
            kind: Kind::InvalidArgument(reason.into()),
            source: None,
            uri: None,
        }
    }

    pub(crate) fn parse<S: Into<String>>(reason: S) -> Error {
        Error {
            kind: Kind::Parse(reason.into()),
            source: None,
            uri: None,
        }
    }

    pub(crate) fn transport<E: Into<BoxError>>(source: E) -> Error {
        Error {
            kind: Kind::Transport,
            source: Some(source.into()),
            uri: None,
        }
    }

    pub(crate) fn with_uri(mut self, uri: Uri) -> Error {
        self.uri = Some(uri);
        self
    }

    /// Returns true if this error represents a programming/logic misuse (exceeding
    /// `max_redirects`, calling `follow_redirect` with nothing pending, and the like).
    pub fn is_logic(&self) -> bool {
        matches!(self.kind, Kind::Logic(_))
    }

    /// Returns true if this error represents a missing link/form lookup.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self.kind, Kind::InvalidArgument(_))
    }

    /// Returns true if this error was propagated from the transport adapter.
    pub fn is_transport(&self) -> bool {
        matches!(self.kind, Kind::Transport)
    }

    /// The URI in flight when this error occurred, if known.
    pub fn uri(&self) -> Option<&Uri> {
        self.uri.as_ref()
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("Error");
        d.field("kind", &self.kind);
        if let Some(uri) = &self.uri {
            d.field("uri", uri);
        }
        d.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Logic(reason) => write!(f, "logic error: {reason}"),
            Kind::InvalidArgument(reason) => write!(f, "invalid argument: {reason}"),
            Kind::Transport => write!(f, "transport error"),
            Kind::Parse(reason) => write!(f, "parse error: {reason}"),
        }?;
        if let Some(uri) = &self.uri {
            write!(f, " (uri: {uri})")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}
