//! Navigation history (component D): a linear stack with a cursor, redirect-hop-aware.

use crate::request::Request;
use crate::response::Response;

/// One committed navigation: the request that was sent and the response that resulted. A request
/// that triggered a chain of redirects is recorded as one `HistoryEntry` per hop, so `back()` can
/// walk past intermediate redirect hops rather than stopping on them — see SPEC_FULL §4.C/§4.D.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    request: Request,
    response: Response,
    /// True if this entry was produced by following a redirect from the previous entry, rather
    /// than by an explicit navigation call.
    is_redirect_hop: bool,
}

impl HistoryEntry {
    pub fn new(request: Request, response: Response, is_redirect_hop: bool) -> HistoryEntry {
        HistoryEntry {
            request,
            response,
            is_redirect_hop,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn is_redirect_hop(&self) -> bool {
        self.is_redirect_hop
    }
}

/// The browser's navigation stack. New entries always truncate any forward entries beyond the
/// cursor, matching ordinary browser back/forward semantics (SPEC_FULL §4.D, Design Note
/// "History as a stack with a cursor").
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
    /// Index of the current entry, or `None` if history is empty.
    cursor: Option<usize>,
}

impl History {
    pub fn new() -> History {
        History::default()
    }

    /// Pushes a new entry, discarding any forward history past the current cursor.
    pub fn push(&mut self, entry: HistoryEntry) {
        if let Some(cursor) = self.cursor {
            self.entries.truncate(cursor + 1);
        } else {
            self.entries.clear();
        }
        self.entries.push(entry);
        self.cursor = Some(self.entries.len() - 1);
    }

    /// The current entry, if any navigation has happened yet.
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.cursor.map(|i| &self.entries[i])
    }

    /// Moves the cursor back one *navigation* (not one redirect hop), per the Design Note that
    /// redirect hops are transparent to back/forward. Returns the entry now current, or `None` if
    /// already at the start.
    pub fn back(&mut self) -> Option<&HistoryEntry> {
        let mut cursor = self.cursor?;
        while cursor > 0 && self.entries[cursor].is_redirect_hop() {
            cursor -= 1;
        }
        if cursor == 0 {
            return None;
        }
        cursor -= 1;
        while cursor > 0 && self.entries[cursor].is_redirect_hop() {
            cursor -= 1;
        }
        self.cursor = Some(cursor);
        self.current()
    }

    /// Moves the cursor forward one navigation, skipping over any redirect hops that were
    /// recorded after it. Returns the entry now current, or `None` if already at the end.
    pub fn forward(&mut self) -> Option<&HistoryEntry> {
        let cursor = self.cursor?;
        if cursor + 1 >= self.entries.len() {
            return None;
        }
        let mut next = cursor + 1;
        while next + 1 < self.entries.len() && self.entries[next + 1].is_redirect_hop() {
            next += 1;
        }
        self.cursor = Some(next);
        self.current()
    }

    /// True if the history holds no *navigations* — redirect hops alone don't count, per
    /// SPEC_FULL §8 ("∀ redirect chain... `history.len()` increased by exactly 1").
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The number of user-initiated navigations recorded, i.e. entries *not* produced by
    /// following a redirect/meta-refresh. A redirect chain of any length contributes exactly one
    /// entry to this count (its first, non-redirect hop) — the automatically issued hops after it
    /// are recorded for `back`/`forward` traversal but are not separate navigations.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_redirect_hop()).count()
    }

    /// True if `back()` would move the cursor.
    pub fn can_go_back(&self) -> bool {
        match self.cursor {
            Some(cursor) => {
                let mut c = cursor;
                while c > 0 && self.entries[c].is_redirect_hop() {
                    c -= 1;
                }
                c > 0
            }
            None => false,
        }
    }

    /// True if `forward()` would move the cursor.
    pub fn can_go_forward(&self) -> bool {
        match self.cursor {
            Some(cursor) => cursor + 1 < self.entries.len(),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{Method, StatusCode};
    use bytes::Bytes;
    use crate::uri::Uri;

    fn entry(url: &str, redirect_hop: bool) -> HistoryEntry {
        let uri = Uri::parse(url).unwrap();
        let request = Request::builder(Method::GET, uri.clone()).build();
        let response = Response::new(uri, StatusCode::OK, http::HeaderMap::new(), Bytes::new());
        HistoryEntry::new(request, response, redirect_hop)
    }

    #[test]
    fn push_truncates_forward_history() {
        let mut history = History::new();
        history.push(entry("http://x/1", false));
        history.push(entry("http://x/2", false));
        history.back();
        history.push(entry("http://x/3", false));
        assert_eq!(history.len(), 2);
        assert_eq!(history.current().unwrap().request().uri().to_string(), "http://x/3");
    }

    #[test]
    fn back_skips_redirect_hops() {
        let mut history = History::new();
        history.push(entry("http://x/1", false));
        history.push(entry("http://x/2", false));
        history.push(entry("http://x/2-redirected", true));
        assert!(history.back().is_some());
        assert_eq!(history.current().unwrap().request().uri().to_string(), "http://x/1");
    }

    #[test]
    fn forward_skips_redirect_hops() {
        let mut history = History::new();
        history.push(entry("http://x/1", false));
        history.push(entry("http://x/2", false));
        history.push(entry("http://x/2-redirected", true));
        history.back();
        history.back();
        assert_eq!(history.current().unwrap().request().uri().to_string(), "http://x/1");
        history.forward();
        assert_eq!(history.current().unwrap().request().uri().to_string(), "http://x/2-redirected");
    }

    #[test]
    fn cannot_go_back_from_first_entry() {
        let mut history = History::new();
        history.push(entry("http://x/1", false));
        assert!(!history.can_go_back());
        assert!(history.back().is_none());
    }

    #[test]
    fn redirect_hops_do_not_count_as_separate_navigations() {
        let mut history = History::new();
        history.push(entry("http://x/1", false));
        history.push(entry("http://x/1-redirected", true));
        history.push(entry("http://x/1-redirected-again", true));
        assert_eq!(history.len(), 1);
        assert!(!history.is_empty());
    }
}
