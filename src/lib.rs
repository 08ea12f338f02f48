//! A headless, programmatic browser for integration testing.
//!
//! `browserkit` drives an HTTP-level dialogue against a remote server (or a local application
//! under test) while emulating the parts of a real browser's behaviour that matter for scripted
//! navigation: URL resolution, cookie management, redirect handling, HTML-triggered navigation
//! (link clicks, form submissions, meta-refresh), and a back/forward history stack.
//!
//! The concrete HTTP transport is an injectable collaborator — implement [`transport::Transport`]
//! against whatever HTTP client you already use (or the bundled [`transport::ChannelTransport`]
//! for tests) and hand it to [`browser::Browser::builder`]. Likewise the HTML parser
//! ([`html::Crawler`], backed by `scraper`) is a thin query façade, not a DOM engine: this crate
//! does not render pages or execute JavaScript.
//!
//! ```no_run
//! # async fn run() -> Result<(), browserkit::Error> {
//! use browserkit::browser::Browser;
//! use browserkit::request::Parameters;
//! use browserkit::server_params::ServerParams;
//! use browserkit::transport::ChannelTransport;
//! use http::Method;
//! use std::collections::BTreeMap;
//!
//! let transport = ChannelTransport::new(); // wire up a real Transport impl for live traffic
//! let mut browser = Browser::builder(transport).build();
//! browser
//!     .request(Method::GET, "http://example.com/", Parameters::new(), BTreeMap::new(), ServerParams::new(), None, true)
//!     .await?;
//! browser.click_link("More information...").await?;
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod cookie;
pub mod error;
pub mod history;
pub mod html;
pub mod redirect;
pub mod request;
pub mod response;
pub mod server_params;
pub mod transport;
pub mod uri;

pub use browser::{Browser, BrowserBuilder, Clickable};
pub use cookie::{Cookie, CookieJar, CookieStore, SameSite};
pub use error::Error;
pub use history::{History, HistoryEntry};
pub use html::{Crawler, Form, Link};
pub use request::{FileField, Parameter, Parameters, Request};
pub use response::Response;
pub use server_params::ServerParams;
pub use transport::{ChannelTransport, Transport};
pub use uri::Uri;
