//! Browser core (component F): the orchestrator. Composes the URI resolver, cookie jar, history
//! stack, redirect policy, transport adapter and HTML façade into the public navigation API
//! described by SPEC_FULL §4.C.
//!
//! Grounded end-to-end on the teacher's `Client`/`ClientBuilder` split in
//! `client/client.rs` — its inline redirect loop (`PendingRequest::poll`) is the direct model for
//! [`Browser::dispatch`]'s own loop, generalized to meta-refresh and to respect
//! `change_history=false` on intermediate hops — and its referer bookkeeping
//! (`if self.client.referer { ... make_referer(...) }`).

use std::collections::BTreeMap;

use futures_util::future::BoxFuture;
use http::{HeaderMap, Method, StatusCode};
use log::{debug, trace};

use crate::cookie::{CookieJar, CookieStore};
use crate::error::Error;
use crate::history::{History, HistoryEntry};
use crate::html::{Crawler, Form};
use crate::redirect::{self, RedirectAction, RedirectMethod};
use crate::request::{FileField, Parameter, Parameters, Request};
use crate::response::Response;
use crate::server_params::ServerParams;
use crate::transport::{build_body, build_headers, Transport, WireRequest};
use crate::uri::{self, Uri};

type ResponseFilter = Box<dyn Fn(Response) -> Response + Send + Sync>;

/// Builds a [`Browser`], mirroring the teacher's `ClientBuilder` (a config struct plus a manual
/// builder) rather than a derive-macro builder.
pub struct BrowserBuilder {
    transport: Box<dyn Transport>,
    cookie_jar: Box<dyn CookieStore>,
    history: History,
    default_server: ServerParams,
    follow_redirects: bool,
    follow_meta_refresh: bool,
    max_redirects: Option<u32>,
    response_filter: ResponseFilter,
    referer: bool,
}

impl BrowserBuilder {
    pub fn new(transport: impl Transport + 'static) -> BrowserBuilder {
        BrowserBuilder {
            transport: Box::new(transport),
            cookie_jar: Box::new(CookieJar::new()),
            history: History::new(),
            default_server: ServerParams::new(),
            follow_redirects: true,
            follow_meta_refresh: false,
            max_redirects: Some(20),
            response_filter: Box::new(|response| response),
            referer: true,
        }
    }

    /// Replaces the built-in [`CookieJar`] with an external store. Per SPEC_FULL §5, the caller
    /// accepts the same single-task contract the built-in jar has.
    pub fn cookie_store(mut self, jar: impl CookieStore + 'static) -> BrowserBuilder {
        self.cookie_jar = Box::new(jar);
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> BrowserBuilder {
        self.follow_redirects = follow;
        self
    }

    pub fn follow_meta_refresh(mut self, follow: bool) -> BrowserBuilder {
        self.follow_meta_refresh = follow;
        self
    }

    pub fn max_redirects(mut self, max: Option<u32>) -> BrowserBuilder {
        self.max_redirects = max;
        self
    }

    pub fn referer(mut self, enable: bool) -> BrowserBuilder {
        self.referer = enable;
        self
    }

    /// Installs the response-filter hook (SPEC_FULL §4.C "Response filtering hook"), re-expressing
    /// the source's subclass-override `filterResponse` as an injected closure. Default is identity.
    pub fn response_filter(
        mut self,
        filter: impl Fn(Response) -> Response + Send + Sync + 'static,
    ) -> BrowserBuilder {
        self.response_filter = Box::new(filter);
        self
    }

    pub fn build(self) -> Browser {
        Browser {
            transport: self.transport,
            cookie_jar: self.cookie_jar,
            history: self.history,
            default_server: self.default_server,
            follow_redirects: self.follow_redirects,
            follow_meta_refresh: self.follow_meta_refresh,
            max_redirects: self.max_redirects,
            response_filter: self.response_filter,
            referer: self.referer,
            last_response: None,
            last_internal_response: None,
            last_redirect_target: None,
            redirect_count: 0,
        }
    }
}

/// The headless browser. Not `Sync`-contended internally: every public method takes `&mut self`,
/// so the Rust type system enforces the "one owning task drives it" rule from SPEC_FULL §5 at
/// compile time.
pub struct Browser {
    transport: Box<dyn Transport>,
    cookie_jar: Box<dyn CookieStore>,
    history: History,
    default_server: ServerParams,
    follow_redirects: bool,
    follow_meta_refresh: bool,
    max_redirects: Option<u32>,
    response_filter: ResponseFilter,
    referer: bool,

    last_response: Option<Response>,
    last_internal_response: Option<Response>,
    /// Resolved `Location` target captured off the last response, for a later `follow_redirect()`
    /// call when `follow_redirects` is off.
    last_redirect_target: Option<(Uri, Method, bool)>,
    redirect_count: u32,
}

/// Either a [`crate::html::Link`] or a [`Form`], the two things `click` can dispatch.
pub enum Clickable {
    Link(crate::html::Link),
    Form(Form),
}

impl Browser {
    pub fn builder(transport: impl Transport + 'static) -> BrowserBuilder {
        BrowserBuilder::new(transport)
    }

    /// The previous request's URI, used as the base for resolving a new one. `None` before the
    /// first request, in which case [`Uri::default_base`] is used (SPEC_FULL §4.A).
    fn base_uri(&self) -> Uri {
        self.history
            .current()
            .map(|entry| entry.request().uri().clone())
            .unwrap_or_else(Uri::default_base)
    }

    pub fn current_uri(&self) -> Option<&Uri> {
        self.history.current().map(|e| e.request().uri())
    }

    pub fn current_request(&self) -> Option<&Request> {
        self.history.current().map(|e| e.request())
    }

    /// The (possibly filtered) response to the last dispatched request.
    pub fn response(&self) -> Option<&Response> {
        self.last_response.as_ref()
    }

    /// The verbatim response to the last dispatched request, bypassing the response filter.
    pub fn internal_response(&self) -> Option<&Response> {
        self.last_internal_response.as_ref()
    }

    pub fn crawler(&self) -> Option<Crawler> {
        self.last_response.as_ref().map(|r| Crawler::new(&r.text()))
    }

    pub fn set_server_parameter(&mut self, key: &str, value: impl Into<String>) {
        self.default_server.set(key, value);
    }

    pub fn get_server_parameter(&self, key: &str) -> Option<String> {
        self.default_server.get(key)
    }

    pub fn set_max_redirects(&mut self, max: Option<u32>) {
        self.max_redirects = max;
    }

    pub fn set_follow_redirects(&mut self, follow: bool) {
        self.follow_redirects = follow;
    }

    pub fn set_follow_meta_refresh(&mut self, follow: bool) {
        self.follow_meta_refresh = follow;
    }

    /// The main entry point (SPEC_FULL §4.C). Resolves `uri` against the previous request's URI,
    /// merges `server` over the default server params for this call only, dispatches, stores the
    /// response, pushes to history when `change_history`, then chases redirects/meta-refresh.
    #[allow(clippy::too_many_arguments)]
    pub async fn request(
        &mut self,
        method: Method,
        uri: &str,
        parameters: Parameters,
        files: BTreeMap<String, FileField>,
        server: ServerParams,
        content: Option<Vec<u8>>,
        change_history: bool,
    ) -> Result<(), Error> {
        let base = self.base_uri();
        let resolved = uri::resolve(&base, uri)?;
        let mut merged = self.default_server.clone();
        merge_server(&mut merged, &server);
        if self.referer {
            if let Some(current) = self.current_uri() {
                merged.http_referer = Some(current.to_string());
            }
        }

        let mut builder = Request::builder(method, resolved).parameters(parameters).files(files).server(merged);
        if let Some(content) = content {
            builder = builder.content(content);
        }
        let request = builder.build();

        self.redirect_count = 0;
        self.dispatch(request, change_history).await
    }

    /// Identical to [`Browser::request`], but sets `HTTP_X_REQUESTED_WITH=XMLHttpRequest` for this
    /// call only — not persisted into the default server params (SPEC_FULL §4.C).
    #[allow(clippy::too_many_arguments)]
    pub async fn xml_http_request(
        &mut self,
        method: Method,
        uri: &str,
        parameters: Parameters,
        files: BTreeMap<String, FileField>,
        mut server: ServerParams,
        content: Option<Vec<u8>>,
        change_history: bool,
    ) -> Result<(), Error> {
        server.set("HTTP_X_REQUESTED_WITH", "XMLHttpRequest");
        self.request(method, uri, parameters, files, server, content, change_history).await
    }

    /// Dispatches `GET link.href` for a [`Clickable::Link`], or delegates to `submit` for a
    /// [`Clickable::Form`] (SPEC_FULL §4.C `click`).
    pub async fn click(&mut self, clickable: Clickable) -> Result<(), Error> {
        match clickable {
            Clickable::Link(link) => {
                self.request(Method::GET, &link.href, Parameters::new(), BTreeMap::new(), ServerParams::new(), None, true)
                    .await
            }
            Clickable::Form(form) => self.submit(form, Parameters::new(), ServerParams::new()).await,
        }
    }

    /// Locates the first link whose text/alt/id matches `text` in the last response and clicks it.
    /// Fails with [`Error::invalid_argument`] if no such link exists.
    pub async fn click_link(&mut self, text: &str) -> Result<(), Error> {
        let link = self
            .crawler()
            .and_then(|c| c.link(text))
            .ok_or_else(|| Error::invalid_argument(format!("no link found with text {text:?}")))?;
        self.click(Clickable::Link(link)).await
    }

    /// Merges `values` into `form`'s fields and dispatches with the form's method and action,
    /// folding `headers` into server params for this call only.
    pub async fn submit(&mut self, form: Form, values: Parameters, headers: ServerParams) -> Result<(), Error> {
        let method = Method::from_bytes(form.method.as_bytes()).unwrap_or(Method::GET);
        let action = form.action.clone().unwrap_or_default();
        let parameters = form.parameters(&values);
        self.request(method, &action, parameters, BTreeMap::new(), headers, None, true).await
    }

    /// Locates the form owning a submit button labelled `button_text`, overrides its method if
    /// `method` is given, and submits it. Fails with [`Error::invalid_argument`] if the button is
    /// absent.
    pub async fn submit_form(
        &mut self,
        button_text: &str,
        values: Parameters,
        method: Option<Method>,
        headers: ServerParams,
    ) -> Result<(), Error> {
        let mut form = self
            .crawler()
            .and_then(|c| c.form_with_button(button_text))
            .ok_or_else(|| Error::invalid_argument(format!("no form found with submit button {button_text:?}")))?;
        if let Some(method) = method {
            form.method = method.to_string();
        }
        self.submit(form, values, headers).await
    }

    /// Dispatches the redirect target captured on the last response. Fails [`Error::logic`] if the
    /// last response was not a 30x, or there is nothing left to chase.
    pub async fn follow_redirect(&mut self) -> Result<(), Error> {
        let (target, method, drop_body) = self
            .last_redirect_target
            .take()
            .ok_or_else(|| Error::logic("no redirect to follow"))?;
        self.redirect_count += 1;
        if let Some(max) = self.max_redirects {
            if self.redirect_count > max {
                return Err(Error::logic(format!("max redirects ({max}) exceeded")));
            }
        }
        let previous = self.current_request().cloned();
        let next = self.build_redirect_request(previous.as_ref(), target, method, drop_body);
        self.dispatch(next, false).await
    }

    /// Re-dispatches the previous user-initiated history entry (skipping over redirect hops),
    /// without otherwise moving the cursor further.
    pub async fn back(&mut self) -> Result<(), Error> {
        let entry = self.history.back().cloned().ok_or_else(|| Error::logic("no previous page"))?;
        self.redispatch(entry).await
    }

    /// Re-dispatches the next history entry forward of the cursor.
    pub async fn forward(&mut self) -> Result<(), Error> {
        let entry = self.history.forward().cloned().ok_or_else(|| Error::logic("no next page"))?;
        self.redispatch(entry).await
    }

    /// Re-dispatches `history.current()` verbatim.
    pub async fn reload(&mut self) -> Result<(), Error> {
        let entry = self.history.current().cloned().ok_or_else(|| Error::logic("nothing to reload"))?;
        self.redispatch(entry).await
    }

    /// Clears history and the cookie jar.
    pub fn restart(&mut self) {
        self.history = History::new();
        self.cookie_jar.clear();
        self.last_response = None;
        self.last_internal_response = None;
        self.last_redirect_target = None;
        self.redirect_count = 0;
    }

    /// Re-dispatches a stored history entry's request verbatim (method/uri/parameters/files/
    /// server/content), without touching history — the jar is still consulted fresh for cookies
    /// (SPEC_FULL §4.C "History traversal with redirects").
    async fn redispatch(&mut self, entry: HistoryEntry) -> Result<(), Error> {
        self.redirect_count = 0;
        let mut request = entry.request().clone();
        request.server_mut().recompute_for(request.uri());
        self.dispatch_without_history(request).await
    }

    /// Builds the request for a redirect/meta-refresh hop by cloning `previous` (when there is
    /// one) and re-expressing it in place via [`Request::retarget`]/[`Request::demote_to_get`],
    /// rather than re-deriving method/parameters/files/content from scratch.
    fn build_redirect_request(
        &self,
        previous: Option<&Request>,
        target: Uri,
        method: Method,
        drop_body: bool,
    ) -> Request {
        let mut request = match previous {
            Some(previous) => previous.clone(),
            None => Request::builder(method, target.clone()).build(),
        };
        request.retarget(target.clone());
        if drop_body {
            request.demote_to_get();
        }

        let mut server = request.server().clone();
        server.recompute_for(&target);
        if let Some(previous) = previous {
            server.http_referer = Some(previous.uri().to_string());
        }
        *request.server_mut() = server;
        request
    }

    /// Dispatches `request`, pushing the result (and any redirect/meta-refresh hops) to history
    /// when `change_history` is set.
    ///
    /// Boxed rather than a plain `async fn` because it and [`Browser::chase`] are mutually
    /// recursive (a redirect/meta-refresh hop re-enters `dispatch`), which an `async fn` cannot
    /// express directly (the resulting future type would be infinite).
    fn dispatch(&mut self, request: Request, change_history: bool) -> BoxFuture<'_, Result<(), Error>> {
        Box::pin(async move {
            let (request, internal, filtered) = self.send_one(request).await?;
            self.history.push(HistoryEntry::new(request.clone(), internal.clone(), !change_history));
            self.last_internal_response = Some(internal.clone());
            self.last_response = Some(filtered.clone());

            self.chase(request, internal, change_history).await
        })
    }

    /// Like [`Browser::dispatch`], but never pushes the *first* hop to history (used by `back`/
    /// `forward`/`reload`, which replay an existing entry rather than create a new user-initiated
    /// one).
    fn dispatch_without_history(&mut self, request: Request) -> BoxFuture<'_, Result<(), Error>> {
        Box::pin(async move {
            let (request, internal, filtered) = self.send_one(request).await?;
            self.last_internal_response = Some(internal.clone());
            self.last_response = Some(filtered.clone());
            self.chase(request, internal, false).await
        })
    }

    /// Single hop: fold cookies in, build the wire request, send it, fold `Set-Cookie` back into
    /// the jar. Per SPEC_FULL §9 Open Questions, cookies from a non-followed 30x are folded in
    /// eagerly, before the redirect-vs-stop decision below is made.
    async fn send_one(&mut self, mut request: Request) -> Result<(Request, Response, Response), Error> {
        request.server_mut().recompute_for(request.uri());
        request.set_cookies(self.cookie_jar.all_raw_values(request.uri()));

        let mut headers = build_headers(&request);
        let body = build_body(&request, &mut headers);
        let wire = WireRequest { method: request.method().clone(), uri: request.uri().clone(), headers, body };

        trace!("dispatching {} {}", wire.method, wire.uri);
        let internal = self.transport.send(&wire).await?;

        let set_cookie_values: Vec<String> = internal
            .headers()
            .get_all(http::header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect();
        if !set_cookie_values.is_empty() {
            let refs: Vec<&str> = set_cookie_values.iter().map(String::as_str).collect();
            self.cookie_jar.update_from_set_cookie(&refs, request.uri());
        }

        let filtered = (self.response_filter)(internal.clone());
        Ok((request, internal, filtered))
    }

    /// Implements the redirect/meta-refresh loop of SPEC_FULL §4.C, given the request/response of
    /// the hop that was just completed. Boxed for the same reason as [`Browser::dispatch`]: it
    /// calls back into `dispatch` to issue the next hop.
    fn chase(&mut self, request: Request, response: Response, change_history: bool) -> BoxFuture<'_, Result<(), Error>> {
        Box::pin(async move {
            if !self.follow_redirects {
                self.capture_redirect_target(&request, &response);
                return Ok(());
            }

            if redirect::is_redirect_status(response.status()) {
                if let Some(location) = response.location() {
                    let action = redirect::decide(response.status(), request.method());
                    let RedirectAction::Follow { method, drop_body } = action else {
                        return Ok(());
                    };
                    self.redirect_count += 1;
                    if let Some(max) = self.max_redirects {
                        if self.redirect_count > max {
                            return Err(Error::logic(format!("max redirects ({max}) exceeded")));
                        }
                    }
                    let target = uri::resolve(request.uri(), location)?;
                    let next_method = match method {
                        RedirectMethod::Same => request.method().clone(),
                        RedirectMethod::Get => Method::GET,
                    };
                    debug!("redirecting {} to {}", request.uri(), target);
                    let next = self.build_redirect_request(Some(&request), target, next_method, drop_body);
                    return self.dispatch(next, false).await;
                }
            }

            if self.follow_meta_refresh && response.status().is_success() && is_html(&response) {
                if let Some((timeout, target)) = crate::html::meta_refresh(&response.text()) {
                    if timeout == 0 {
                        let resolved = uri::resolve(request.uri(), &target)?;
                        debug!("meta-refresh redirecting {} to {}", request.uri(), resolved);
                        let next = self.build_redirect_request(Some(&request), resolved, Method::GET, true);
                        return self.dispatch(next, false).await;
                    }
                }
            }

            let _ = change_history;
            Ok(())
        })
    }

    /// When auto-follow is off, captures the resolved redirect target (or meta-refresh target) so
    /// a later [`Browser::follow_redirect`] call can dispatch it.
    fn capture_redirect_target(&mut self, request: &Request, response: &Response) {
        self.last_redirect_target = None;
        if redirect::is_redirect_status(response.status()) {
            if let Some(location) = response.location() {
                if let RedirectAction::Follow { method, drop_body } =
                    redirect::decide(response.status(), request.method())
                {
                    if let Ok(target) = uri::resolve(request.uri(), location) {
                        let next_method = match method {
                            RedirectMethod::Same => request.method().clone(),
                            RedirectMethod::Get => Method::GET,
                        };
                        self.last_redirect_target = Some((target, next_method, drop_body));
                    }
                }
            }
        }
    }

    pub fn cookie_jar_is_empty(&self) -> bool {
        self.cookie_jar.is_empty()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn history_is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("html"))
        .unwrap_or(true)
}

/// Merges `overrides` on top of `base`, leaving `base` untouched for anything `overrides` does not
/// set (SPEC_FULL §4.C: "merges server over the default server params — but only for this call,
/// defaults are not mutated").
fn merge_server(base: &mut ServerParams, overrides: &ServerParams) {
    macro_rules! merge_field {
        ($field:ident) => {
            if overrides.$field.is_some() {
                base.$field = overrides.$field.clone();
            }
        };
    }
    merge_field!(http_host);
    merge_field!(https);
    merge_field!(http_referer);
    merge_field!(http_user_agent);
    merge_field!(content_type);
    merge_field!(content_length);
    merge_field!(content_md5);
    merge_field!(php_auth_user);
    merge_field!(php_auth_pw);
    for (key, value) in overrides.iter_http() {
        base.set(&format!("HTTP_{}", key.to_ascii_uppercase().replace('-', "_")), value.clone());
    }
}
