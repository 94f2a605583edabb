//! Structured metadata extraction for a single page: the SEO-relevant head
//! material, Open Graph and Twitter cards, JSON-LD blobs, feeds and icons.
//! This needs a DOM parse (nested text, attribute co-location), not a
//! tokenizer pass.

use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use lazy_static::lazy_static;
use scraper::{ElementRef, Html, Selector};
use serde_derive::Serialize;
use std::collections::HashMap;
use url::Url;

use crate::crawler::Downloaded;

lazy_static! {
    static ref TITLE: Selector = Selector::parse("title").expect("failed to parse static selector");
    static ref H1: Selector = Selector::parse("h1").expect("failed to parse static selector");
    static ref META: Selector = Selector::parse("meta").expect("failed to parse static selector");
    static ref LINK: Selector = Selector::parse("link[href]").expect("failed to parse static selector");
    static ref HTML_TAG: Selector = Selector::parse("html").expect("failed to parse static selector");
    static ref JSON_LD: Selector = Selector::parse(r#"script[type="application/ld+json"]"#)
        .expect("failed to parse static selector");
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PageMeta {
    pub url: String,
    pub canonical: String,
    pub title: String,
    pub description: String,
    pub h1: String,
    pub status: u16,
    pub content_type: String,
    pub content_length: i64,

    /// Merged `X-Robots-Tag` header + meta robots, split on commas,
    /// lowercased and trimmed.
    pub robots: Vec<String>,
    pub lang: String,
    pub hreflang: HashMap<String, String>,
    /// `"next"` / `"prev"` as announced by pagination links.
    pub pagination: HashMap<String, String>,

    pub og: HashMap<String, String>,
    pub twitter: HashMap<String, String>,
    /// Raw JSON-LD blobs, untouched.
    pub json_ld: Vec<String>,

    pub primary_image: String,
    pub feeds: Vec<String>,
    pub favicons: Vec<String>,
}

fn resolve(base: &Url, href: &str) -> String {
    match base.join(href.trim()) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => String::new(),
    }
}

fn push_robots(robots: &mut Vec<String>, directives: &str) {
    for directive in directives.split(',') {
        let directive = directive.trim().to_lowercase();
        if !directive.is_empty() {
            robots.push(directive);
        }
    }
}

fn element_text(element: ElementRef) -> String {
    let text = element.text().collect::<Vec<_>>().join(" ");
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn scan_meta(element: ElementRef, meta: &mut PageMeta) {
    let name = element.value().attr("name").unwrap_or("").to_lowercase();
    let property = element.value().attr("property").unwrap_or("").to_lowercase();
    let Some(content) = element.value().attr("content").filter(|content| !content.is_empty())
    else {
        return;
    };

    match name.as_str() {
        "description" => {
            if meta.description.is_empty() {
                meta.description = content.to_owned();
            }
        }
        "robots" | "googlebot" => push_robots(&mut meta.robots, content),
        "twitter:card" | "twitter:title" | "twitter:description" | "twitter:image" => {
            meta.twitter.insert(name, content.to_owned());
        }
        _ => {}
    }

    if property.starts_with("og:") {
        meta.og.insert(property, content.to_owned());
    }
}

fn scan_link(element: ElementRef, meta: &mut PageMeta, base: &Url) {
    let rel = element.value().attr("rel").unwrap_or("").to_lowercase();
    let Some(href) = element.value().attr("href").filter(|href| !href.is_empty()) else {
        return;
    };
    let absolute = resolve(base, href);
    if absolute.is_empty() {
        return;
    }

    match rel.as_str() {
        "canonical" => {
            if meta.canonical.is_empty() {
                meta.canonical = absolute;
            }
        }
        "alternate" => {
            let kind = element.value().attr("type").unwrap_or("").to_lowercase();
            if kind.contains("rss") || kind.contains("atom") {
                meta.feeds.push(absolute.clone());
            }
            if let Some(hreflang) = element.value().attr("hreflang") {
                meta.hreflang.insert(hreflang.to_lowercase(), absolute);
            }
        }
        "next" | "prev" => {
            meta.pagination.insert(rel, absolute);
        }
        "icon" | "shortcut icon" => {
            meta.favicons.push(absolute);
        }
        _ => {}
    }
}

/// Builds the metadata record for a downloaded page. All URLs come out
/// absolute, all map keys lowercased; scalar fields are first-wins.
pub fn extract_page_meta(downloaded: &Downloaded, base: &Url) -> PageMeta {
    let mut meta = PageMeta {
        url: base.to_string(),
        status: downloaded.status_code.as_u16(),
        content_type: downloaded
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_owned(),
        content_length: downloaded
            .headers
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse().ok())
            .unwrap_or(downloaded.content.len() as i64),
        ..PageMeta::default()
    };

    // Headers first (robots):
    if let Some(header) = downloaded
        .headers
        .get("x-robots-tag")
        .and_then(|value| value.to_str().ok())
    {
        push_robots(&mut meta.robots, header);
    }

    let html = Html::parse_document(&String::from_utf8_lossy(&downloaded.content));

    if let Some(title) = html.select(&TITLE).next() {
        meta.title = element_text(title);
    }
    if let Some(h1) = html.select(&H1).next() {
        meta.h1 = element_text(h1);
    }
    for element in html.select(&META) {
        scan_meta(element, &mut meta);
    }
    for element in html.select(&LINK) {
        scan_link(element, &mut meta, base);
    }
    for element in html.select(&JSON_LD) {
        let raw = element.text().collect::<String>().trim().to_owned();
        if !raw.is_empty() {
            meta.json_ld.push(raw);
        }
    }
    if let Some(lang) = html
        .select(&HTML_TAG)
        .next()
        .and_then(|element| element.value().attr("lang"))
    {
        meta.lang = lang.trim().to_lowercase();
    }

    // Fallback canonical:
    if meta.canonical.is_empty() {
        if let Some(og_url) = meta.og.get("og:url") {
            meta.canonical = resolve(base, og_url);
        }
    }
    // Choose primary image:
    if let Some(image) = meta.og.get("og:image") {
        meta.primary_image = resolve(base, image);
    } else if let Some(image) = meta.twitter.get("twitter:image") {
        meta.primary_image = resolve(base, image);
    }

    meta
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::{HeaderMap, HeaderValue};
    use http::StatusCode;

    const PAGE: &str = r#"<!DOCTYPE html>
        <html lang="en-US">
        <head>
            <title> The  Title </title>
            <meta name="description" content="First description">
            <meta name="description" content="Second description">
            <meta name="robots" content="NoIndex, nofollow">
            <meta name="googlebot" content="noarchive">
            <meta property="og:title" content="OG Title">
            <meta property="og:image" content="/img/social.png">
            <meta name="twitter:card" content="summary">
            <meta name="twitter:image" content="/img/tw.png">
            <link rel="alternate" type="application/rss+xml" href="/feed.xml">
            <link rel="alternate" hreflang="DE" href="/de/">
            <link rel="next" href="/page/2">
            <link rel="icon" href="/favicon.ico">
            <script type="application/ld+json">{"@type": "WebSite"}</script>
        </head>
        <body><h1>Main heading</h1><h1>Second heading</h1></body>
        </html>"#;

    fn downloaded(body: &str, headers: HeaderMap) -> Downloaded {
        Downloaded {
            status_code: StatusCode::OK,
            headers,
            content: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn extracts_the_whole_record() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
        headers.insert("x-robots-tag", HeaderValue::from_static("NOSNIPPET"));

        let base = Url::parse("https://example.com/article").unwrap();
        let meta = extract_page_meta(&downloaded(PAGE, headers), &base);

        assert_eq!(meta.url, "https://example.com/article");
        assert_eq!(meta.status, 200);
        assert_eq!(meta.content_type, "text/html; charset=utf-8");
        assert_eq!(meta.title, "The Title");
        assert_eq!(meta.h1, "Main heading");
        assert_eq!(meta.description, "First description");
        assert_eq!(meta.lang, "en-us");
        assert_eq!(
            meta.robots,
            vec!["nosnippet", "noindex", "nofollow", "noarchive"],
        );
        assert_eq!(meta.og["og:title"], "OG Title");
        assert_eq!(meta.twitter["twitter:card"], "summary");
        assert_eq!(meta.hreflang["de"], "https://example.com/de/");
        assert_eq!(meta.pagination["next"], "https://example.com/page/2");
        assert_eq!(meta.feeds, vec!["https://example.com/feed.xml"]);
        assert_eq!(meta.favicons, vec!["https://example.com/favicon.ico"]);
        assert_eq!(meta.json_ld, vec![r#"{"@type": "WebSite"}"#]);
        // og:image wins over twitter:image, resolved absolute.
        assert_eq!(meta.primary_image, "https://example.com/img/social.png");
    }

    #[test]
    fn canonical_falls_back_to_og_url() {
        let body = r#"<html><head>
            <meta property="og:url" content="https://example.com/canonical-form">
        </head></html>"#;

        let base = Url::parse("https://example.com/raw?utm=x").unwrap();
        let meta = extract_page_meta(&downloaded(body, HeaderMap::new()), &base);
        assert_eq!(meta.canonical, "https://example.com/canonical-form");
    }

    #[test]
    fn explicit_canonical_wins() {
        let body = r#"<html><head>
            <link rel="canonical" href="/the-one">
            <meta property="og:url" content="/the-other">
        </head></html>"#;

        let base = Url::parse("https://example.com/x").unwrap();
        let meta = extract_page_meta(&downloaded(body, HeaderMap::new()), &base);
        assert_eq!(meta.canonical, "https://example.com/the-one");
    }

    #[test]
    fn content_length_falls_back_to_body_size() {
        let body = "<html></html>";
        let base = Url::parse("https://example.com/").unwrap();
        let meta = extract_page_meta(&downloaded(body, HeaderMap::new()), &base);
        assert_eq!(meta.content_length, body.len() as i64);
    }
}
