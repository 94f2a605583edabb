use lazy_static::lazy_static;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::{ParseError, Url};

use crate::Error;

lazy_static! {
    static ref ANCHOR: Selector = Selector::parse("a[href]").expect("failed to parse static selector");
}

/// All raw `href` values of anchors, trimmed, in document order. This is the
/// common harvest behind link extraction and the mailto/tel collectors.
pub fn anchor_hrefs(html: &Html) -> Vec<String> {
    html.select(&ANCHOR)
        .filter_map(|element| element.value().attr("href"))
        .map(|href| href.trim().to_owned())
        .collect()
}

/// Performs a checked join, with all the common problems accounted for.
pub fn checked_join(base_url: &Url, raw: &str) -> Result<Url, Error> {
    let raw = raw.trim();

    // Get rid of those pesky "#" section references and of weird empty strings:
    if raw.is_empty() || raw.starts_with('#') {
        return Err(Error::BadLink(raw.to_owned()));
    }

    // Parse the thing.
    let maybe_url = raw.parse().or_else(|err| {
        if err == ParseError::RelativeUrlWithoutBase {
            base_url.join(raw)
        } else {
            Err(err)
        }
    });

    let mut url: Url = if let Ok(url) = maybe_url {
        url
    } else {
        return Err(Error::BadLink(raw.to_owned()));
    };

    // Now, make sure this is really HTTP (not mail, javascript and what not):
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(Error::UnacceptedScheme(raw.to_owned()));
    }

    // Check that resolution produced a real host:
    if url.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(Error::NoHost(raw.to_owned()));
    }

    // Section references never name a different page:
    url.set_fragment(None);

    Ok(url)
}

/// Extracts the absolute child URLs of a page: every anchor resolved against
/// `base_url`, filtered by `checked_join`, deduplicated in first-seen order.
/// Malformed HTML does not abort; the parse is best-effort.
pub fn extract_links(content: &[u8], base_url: &Url) -> Vec<Url> {
    let html = Html::parse_document(&String::from_utf8_lossy(content));

    let mut emitted = HashSet::new();
    let mut links = Vec::new();
    for raw in anchor_hrefs(&html) {
        match checked_join(base_url, &raw) {
            Ok(url) => {
                if emitted.insert(url.to_string()) {
                    links.push(url);
                }
            }
            Err(err) => log::debug!("at {}: {}", base_url, err),
        }
    }

    links
}
