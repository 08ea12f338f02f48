//! End-to-end scenario tests against the public API, exercising the browser core the way a
//! caller would: build a [`Browser`] over a [`ChannelTransport`] and drive it through `request`/
//! `click_link`/`back`/`restart`. These cover the concrete scenarios enumerated in SPEC_FULL §8.

use std::collections::BTreeMap;

use browserkit::browser::Browser;
use browserkit::request::{Parameter, Parameters};
use browserkit::server_params::ServerParams;
use http::{HeaderMap, Method, StatusCode};

fn empty() -> (Parameters, BTreeMap<String, browserkit::FileField>, ServerParams) {
    (Parameters::new(), BTreeMap::new(), ServerParams::new())
}

#[tokio::test]
async fn relative_navigation_tracks_referer_across_hops() {
    let transport = browserkit::ChannelTransport::new()
        .on(Method::GET, "http://www.example.com/foo/foobar", StatusCode::OK, HeaderMap::new(), "")
        .on(Method::GET, "http://www.example.com/foo/bar", StatusCode::OK, HeaderMap::new(), "");
    let mut browser = Browser::builder(transport).build();

    let (params, files, server) = empty();
    browser
        .request(Method::GET, "http://www.example.com/foo/foobar", params, files, server, None, true)
        .await
        .unwrap();

    let (params, files, server) = empty();
    browser.request(Method::GET, "bar", params, files, server, None, true).await.unwrap();

    assert_eq!(browser.current_uri().unwrap().to_string(), "http://www.example.com/foo/bar");
    assert_eq!(
        browser.current_request().unwrap().server().http_referer.as_deref(),
        Some("http://www.example.com/foo/foobar")
    );
}

#[tokio::test]
async fn plain_302_redirects_to_location() {
    let mut headers = HeaderMap::new();
    headers.insert(http::header::LOCATION, "/redirected".parse().unwrap());
    let transport = browserkit::ChannelTransport::new()
        .on(Method::GET, "http://www.example.com/foo/foobar", StatusCode::FOUND, headers, "")
        .on(Method::GET, "http://www.example.com/redirected", StatusCode::OK, HeaderMap::new(), "");
    let mut browser = Browser::builder(transport).build();

    let (params, files, server) = empty();
    browser
        .request(Method::GET, "http://www.example.com/foo/foobar", params, files, server, None, true)
        .await
        .unwrap();

    assert_eq!(browser.current_uri().unwrap().to_string(), "http://www.example.com/redirected");
}

#[tokio::test]
async fn non_redirect_201_with_location_leaves_nothing_to_follow() {
    let mut headers = HeaderMap::new();
    headers.insert(http::header::LOCATION, "/x".parse().unwrap());
    let transport =
        browserkit::ChannelTransport::new().on(Method::GET, "http://x/foo", StatusCode::CREATED, headers, "");
    let mut browser = Browser::builder(transport).follow_redirects(false).build();

    let (params, files, server) = empty();
    browser.request(Method::GET, "http://x/foo", params, files, server, None, true).await.unwrap();

    let err = browser.follow_redirect().await.unwrap_err();
    assert!(err.is_logic());
}

#[tokio::test]
async fn two_redirects_exceed_max_redirects_of_one() {
    let mut loc1 = HeaderMap::new();
    loc1.insert(http::header::LOCATION, "/two".parse().unwrap());
    let mut loc2 = HeaderMap::new();
    loc2.insert(http::header::LOCATION, "/three".parse().unwrap());
    let transport = browserkit::ChannelTransport::new()
        .on(Method::GET, "http://x/one", StatusCode::FOUND, loc1, "")
        .on(Method::GET, "http://x/two", StatusCode::FOUND, loc2, "");
    let mut browser = Browser::builder(transport).max_redirects(Some(1)).build();

    let (params, files, server) = empty();
    let result = browser.request(Method::GET, "http://x/one", params, files, server, None, true).await;
    assert!(result.unwrap_err().is_logic());
}

#[tokio::test]
async fn post_with_parameters_redirected_by_307_preserves_them_303_drops_them() {
    let mut loc = HeaderMap::new();
    loc.insert(http::header::LOCATION, "/next".parse().unwrap());
    let transport = browserkit::ChannelTransport::new()
        .on(Method::POST, "http://x/a", StatusCode::TEMPORARY_REDIRECT, loc.clone(), "")
        .on(Method::POST, "http://x/next", StatusCode::OK, HeaderMap::new(), "")
        .on(Method::POST, "http://x/b", StatusCode::SEE_OTHER, loc, "")
        .on(Method::GET, "http://x/next", StatusCode::OK, HeaderMap::new(), "");
    let mut browser = Browser::builder(transport).build();

    let mut params = Parameters::new();
    params.insert("a".to_string(), Parameter::Value("1".to_string()));
    let (_, files, server) = empty();
    browser
        .request(Method::POST, "http://x/a", params.clone(), files.clone(), server.clone(), None, true)
        .await
        .unwrap();
    assert_eq!(*browser.current_request().unwrap().method(), Method::POST);
    assert_eq!(browser.current_request().unwrap().parameters().len(), 1);

    browser.request(Method::POST, "http://x/b", params, files, server, None, true).await.unwrap();
    assert_eq!(*browser.current_request().unwrap().method(), Method::GET);
    assert!(browser.current_request().unwrap().parameters().is_empty());
}

#[tokio::test]
async fn secure_cookie_scoped_to_https_only() {
    let mut headers = HeaderMap::new();
    headers.insert(http::header::SET_COOKIE, "foo=bar; Secure".parse().unwrap());
    let transport = browserkit::ChannelTransport::new()
        .on(Method::GET, "https://example.com/", StatusCode::OK, headers, "")
        .on(Method::GET, "http://example.com/next", StatusCode::OK, HeaderMap::new(), "");
    let mut browser = Browser::builder(transport).build();

    let (params, files, server) = empty();
    browser.request(Method::GET, "https://example.com/", params, files, server, None, true).await.unwrap();
    assert!(!browser.cookie_jar_is_empty());

    let (params, files, server) = empty();
    browser.request(Method::GET, "http://example.com/next", params, files, server, None, true).await.unwrap();
    assert!(browser.current_request().unwrap().cookies().is_empty());
}

#[tokio::test]
async fn restart_drops_history_and_jar() {
    let mut headers = HeaderMap::new();
    headers.insert(http::header::SET_COOKIE, "foo=bar".parse().unwrap());
    let transport = browserkit::ChannelTransport::new().on(Method::GET, "http://x/", StatusCode::OK, headers, "");
    let mut browser = Browser::builder(transport).build();

    let (params, files, server) = empty();
    browser.request(Method::GET, "http://x/", params, files, server, None, true).await.unwrap();
    assert!(!browser.cookie_jar_is_empty());

    browser.restart();
    assert!(browser.history_is_empty());
    assert!(browser.cookie_jar_is_empty());
}
