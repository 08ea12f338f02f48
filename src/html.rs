//! HTML query façade (component G): given a response body, expose link/form lookup by text or
//! selector, plus the free-standing meta-refresh parser the browser core consults on terminal 2xx
//! responses (SPEC_FULL §4.C "Meta-refresh").
//!
//! No file in the five teacher repos does HTML querying; this module is grounded on the wider
//! pack's `DaveDev42-wget-faster` manifest, which pairs `scraper` with an HTTP client for exactly
//! this "fetch, then find links/forms to follow" shape.

use std::collections::BTreeMap;

use scraper::{Html, Selector};

use crate::request::{Parameter, Parameters};

/// A read-only query façade over one HTML document. Cheap to construct; holds the parsed DOM.
pub struct Crawler {
    document: Html,
}

/// A hyperlink found in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub href: String,
    pub text: String,
}

/// A form found in the document, with its fields pre-populated from `value`/`checked` attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    pub action: Option<String>,
    pub method: String,
    pub fields: BTreeMap<String, String>,
    /// Text of each `<button>`/`<input type="submit">` inside the form, in document order — used
    /// by `submit_form(button_text, ...)` to locate this form.
    pub submit_labels: Vec<String>,
}

impl Form {
    /// `fields`, converted into the browser's `Parameters` shape, with `overrides` merged on top.
    pub fn parameters(&self, overrides: &Parameters) -> Parameters {
        let mut params = Parameters::new();
        for (k, v) in &self.fields {
            params.insert(k.clone(), Parameter::Value(v.clone()));
        }
        for (k, v) in overrides {
            params.insert(k.clone(), v.clone());
        }
        params
    }
}

impl Crawler {
    /// Parses `html` into a queryable document.
    pub fn new(html: &str) -> Crawler {
        Crawler { document: Html::parse_document(html) }
    }

    /// Every `<a href="...">` in document order.
    pub fn links(&self) -> Vec<Link> {
        let selector = Selector::parse("a[href]").expect("static selector");
        self.document
            .select(&selector)
            .map(|el| Link {
                href: el.value().attr("href").unwrap_or_default().to_string(),
                text: el.text().collect::<String>().trim().to_string(),
            })
            .collect()
    }

    /// The first link whose visible text, `alt`, or `id` matches `text`. First DOM-order match
    /// wins when several links share the same text — see SPEC_FULL §9 Open Questions, resolved to
    /// match `scraper`'s own document-order iteration.
    pub fn link(&self, text: &str) -> Option<Link> {
        let selector = Selector::parse("a[href]").expect("static selector");
        self.document.select(&selector).find_map(|el| {
            let matches = el.text().collect::<String>().trim() == text
                || el.value().attr("alt") == Some(text)
                || el.value().attr("id") == Some(text);
            matches.then(|| Link {
                href: el.value().attr("href").unwrap_or_default().to_string(),
                text: el.text().collect::<String>().trim().to_string(),
            })
        })
    }

    /// Every `<form>` in document order.
    pub fn forms(&self) -> Vec<Form> {
        let selector = Selector::parse("form").expect("static selector");
        self.document.select(&selector).map(form_from_element).collect()
    }

    /// The first form containing a submit button (`<button>` or `<input type="submit">`) whose
    /// label matches `text`. First DOM-order match wins, matching `click_link`'s policy.
    pub fn form_with_button(&self, text: &str) -> Option<Form> {
        self.forms().into_iter().find(|form| form.submit_labels.iter().any(|label| label == text))
    }
}

fn form_from_element(el: scraper::ElementRef<'_>) -> Form {
    let method = el
        .value()
        .attr("method")
        .map(|m| m.to_ascii_uppercase())
        .unwrap_or_else(|| "GET".to_string());
    let action = el.value().attr("action").map(str::to_string);

    let mut fields = BTreeMap::new();
    let input_selector = Selector::parse("input,select,textarea").expect("static selector");
    for input in el.select(&input_selector) {
        let name = match input.value().attr("name") {
            Some(name) => name,
            None => continue,
        };
        let input_type = input.value().attr("type").unwrap_or("text").to_ascii_lowercase();
        if matches!(input_type.as_str(), "submit" | "button" | "reset" | "image") {
            continue;
        }
        if matches!(input_type.as_str(), "checkbox" | "radio") && input.value().attr("checked").is_none() {
            continue;
        }
        let value = input
            .value()
            .attr("value")
            .map(str::to_string)
            .unwrap_or_else(|| {
                if input.value().name() == "textarea" {
                    input.text().collect::<String>()
                } else {
                    String::new()
                }
            });
        fields.insert(name.to_string(), value);
    }

    let submit_selector =
        Selector::parse("button, input[type=submit]").expect("static selector");
    let submit_labels = el
        .select(&submit_selector)
        .map(|btn| {
            let text = btn.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                text
            } else {
                btn.value().attr("value").unwrap_or_default().to_string()
            }
        })
        .collect();

    Form { action, method, fields, submit_labels }
}

/// Parses `<meta http-equiv="refresh" content="<timeout>; URL=<target>">` out of the `<head>` of
/// `html`, per SPEC_FULL §4.C. Returns `(timeout_seconds, target)` for the first such tag found in
/// `<head>` (including inside a `<noscript>` nested in `<head>`); tags in `<body>` are ignored.
pub fn meta_refresh(html: &str) -> Option<(u64, String)> {
    let document = Html::parse_document(html);
    let head_selector = Selector::parse("head").expect("static selector");
    let head = document.select(&head_selector).next()?;
    let meta_selector = Selector::parse("meta").expect("static selector");
    head.select(&meta_selector).find_map(|meta| {
        let http_equiv = meta.value().attr("http-equiv")?;
        if !http_equiv.eq_ignore_ascii_case("refresh") {
            return None;
        }
        parse_refresh_content(meta.value().attr("content")?)
    })
}

/// Parses a `content="0; URL=http://..."`-shaped attribute value, tolerating unquoted,
/// single-quoted and double-quoted targets and whitespace around `;`/`=`.
fn parse_refresh_content(content: &str) -> Option<(u64, String)> {
    let (timeout_part, rest) = content.split_once(';')?;
    let timeout: u64 = timeout_part.trim().parse().ok()?;

    let rest = rest.trim();
    let (key, value) = rest.split_once('=')?;
    if !key.trim().eq_ignore_ascii_case("url") {
        return None;
    }
    let value = value.trim();
    let value = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);
    Some((timeout, value.to_string()))
}
