//! Embedded JSON fallback for listing pages
//!
//! Result listings are often rendered client-side from JSON shipped in the
//! page itself. This module finds the start of such payloads in script
//! blocks and `data-products` attributes, parses one JSON value from each
//! start and walks it for download entries:
//!
//! - `{ "downloads": [ {url, name}, ... ] }` or `"files"` on a product
//! - arrays of products, or objects carrying `products` / `results`
//! - bare download entries with a `url`
//!
//! Malformed payloads are skipped; the fallback then yields nothing.

use super::anchors::{is_download_url, push_candidate};
use super::CrawlCandidate;
use crate::assets::extension_of;
use crate::config::SiteConfig;
use crate::url::normalize_url;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;
use url::Url;

/// Marks where a JSON value starts inside a script block
const PAYLOAD_START: &str = r#"(?:window\.__INITIAL_STATE__|window\.products|(?:var|let|const)\s+products)\s*=\s*|"(?:products|results|downloads)"\s*:\s*"#;

fn payload_start() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(PAYLOAD_START).expect("payload pattern is valid"))
}

/// Finds download candidates in JSON embedded in the page
pub(crate) fn embedded_candidates(
    document: &Html,
    page_url: &Url,
    site: &SiteConfig,
) -> Vec<CrawlCandidate> {
    let mut candidates = Vec::new();

    for payload in script_payloads(document, payload_start())
        .into_iter()
        .chain(attribute_payloads(document))
    {
        collect_downloads(&payload, page_url, site, &mut candidates);
    }

    candidates
}

fn script_payloads(document: &Html, pattern: &Regex) -> Vec<Value> {
    let Ok(selector) = Selector::parse("script") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .map(|script| script.text().collect::<String>())
        .flat_map(|source| {
            pattern
                .find_iter(&source)
                .filter_map(|m| parse_value_at(&source[m.end()..]))
                .collect::<Vec<_>>()
        })
        .collect()
}

fn attribute_payloads(document: &Html) -> Vec<Value> {
    let Ok(selector) = Selector::parse("[data-products]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("data-products"))
        .filter_map(|raw| match serde_json::from_str::<Value>(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("Skipping malformed data-products attribute: {}", e);
                None
            }
        })
        .collect()
}

/// Parses the first JSON value at the start of `source`, ignoring whatever
/// follows it
fn parse_value_at(source: &str) -> Option<Value> {
    let mut stream = serde_json::Deserializer::from_str(source).into_iter::<Value>();
    match stream.next() {
        Some(Ok(value @ (Value::Array(_) | Value::Object(_)))) => Some(value),
        Some(Ok(_)) => None,
        Some(Err(e)) => {
            debug!("Skipping malformed embedded JSON: {}", e);
            None
        }
        None => None,
    }
}

fn collect_downloads(
    value: &Value,
    page_url: &Url,
    site: &SiteConfig,
    out: &mut Vec<CrawlCandidate>,
) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_downloads(item, page_url, site, out);
            }
        }
        Value::Object(map) => {
            if let Some(entry) = download_entry(map, page_url, site) {
                push_candidate(out, entry);
                return;
            }
            for key in ["downloads", "files", "products", "results"] {
                if let Some(inner) = map.get(key) {
                    collect_downloads(inner, page_url, site, out);
                }
            }
        }
        _ => {}
    }
}

fn download_entry(
    map: &serde_json::Map<String, Value>,
    page_url: &Url,
    site: &SiteConfig,
) -> Option<CrawlCandidate> {
    let raw = map.get("url")?.as_str()?;
    let url = normalize_url(page_url.join(raw).ok()?.as_str()).ok()?;
    if !is_download_url(&url, site) {
        return None;
    }

    let text = ["name", "title"]
        .iter()
        .filter_map(|key| map.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!(
                "Download {}",
                extension_of(url.path()).trim_start_matches('.').to_uppercase()
            )
        });

    Some(CrawlCandidate::from_url(&url, &text))
}
