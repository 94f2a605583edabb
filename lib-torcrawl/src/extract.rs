//! Thin collectors over the crawl output: `mailto:` addresses and `tel:`
//! numbers found on a page.

use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::Html;
use url::Url;

use crate::crawler::{anchor_hrefs, Downloader};
use crate::Error;

lazy_static! {
    static ref EMAIL: Regex = Regex::new(
        "^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    )
    .expect("failed to parse email regex");
}

/// Structure and length gate for an address, before any DNS is consulted.
pub fn is_well_formed_email(address: &str) -> bool {
    if address.len() < 3 || address.len() > 254 {
        return false;
    }
    EMAIL.is_match(address)
}

/// Whether the address's domain answers with at least one MX record.
pub async fn has_mx_record(resolver: &TokioAsyncResolver, address: &str) -> bool {
    let Some((_, domain)) = address.rsplit_once('@') else {
        return false;
    };
    resolver
        .mx_lookup(domain)
        .await
        .map(|lookup| lookup.iter().next().is_some())
        .unwrap_or(false)
}

async fn page_hrefs(downloader: &dyn Downloader, link: &Url) -> Result<Vec<String>, Error> {
    let downloaded = downloader.download(link).await?;
    let html = Html::parse_document(&String::from_utf8_lossy(&downloaded.content));
    Ok(anchor_hrefs(&html))
}

/// Collects the validated `mailto:` addresses linked from a page. Validation
/// is structural (regex and length) plus an MX lookup on the domain.
pub async fn collect_emails(downloader: &dyn Downloader, link: &Url) -> Result<Vec<String>, Error> {
    let hrefs = page_hrefs(downloader, link).await?;
    let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());

    let mut emails = Vec::new();
    for href in hrefs {
        if let Some((_, address)) = href.split_once("mailto:") {
            if is_well_formed_email(address) && has_mx_record(&resolver, address).await {
                emails.push(address.to_owned());
            }
        }
    }

    Ok(emails)
}

/// Collects every non-empty `tel:` number linked from a page.
pub async fn collect_phone_numbers(
    downloader: &dyn Downloader,
    link: &Url,
) -> Result<Vec<String>, Error> {
    let hrefs = page_hrefs(downloader, link).await?;

    Ok(hrefs
        .into_iter()
        .filter_map(|href| {
            href.split_once("tel:")
                .map(|(_, number)| number.to_owned())
        })
        .filter(|number| !number.is_empty())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{ClientOpts, HttpDownloader};

    fn local_downloader() -> HttpDownloader {
        HttpDownloader::new(&ClientOpts {
            use_tor: false,
            ..ClientOpts::default()
        })
        .unwrap()
    }

    #[test]
    fn well_formed_addresses_pass() {
        assert!(is_well_formed_email("random@gmail.com"));
        assert!(is_well_formed_email("first.last+tag@sub.example.org"));
    }

    #[test]
    fn malformed_addresses_fail() {
        assert!(!is_well_formed_email(""));
        assert!(!is_well_formed_email("a@"));
        assert!(!is_well_formed_email("@b.com"));
        assert!(!is_well_formed_email("no-at-sign.com"));
        assert!(!is_well_formed_email("spaces in@example.com"));
        // Too short and too long.
        assert!(!is_well_formed_email("a@"));
        let long_local = "x".repeat(250);
        assert!(!is_well_formed_email(&format!("{long_local}@example.com")));
    }

    #[tokio::test]
    async fn phone_numbers_are_collected() {
        let mut server = mockito::Server::new_async().await;
        let _page = server
            .mock("GET", "/")
            .with_status(200)
            .with_body(
                r#"<html><body>
                    <a href="tel:+15551234567">call us</a>
                    <a href="tel:">empty</a>
                    <a href="/about">about</a>
                </body></html>"#,
            )
            .create_async()
            .await;

        let downloader = local_downloader();
        let url = Url::parse(&server.url()).unwrap();
        let numbers = collect_phone_numbers(&downloader, &url).await.unwrap();
        assert_eq!(numbers, vec!["+15551234567"]);
    }

    #[tokio::test]
    async fn mailto_parsing_feeds_the_validator() {
        // No MX lookups here: a page whose only mailto is structurally
        // invalid must come back empty without consulting DNS results.
        let mut server = mockito::Server::new_async().await;
        let _page = server
            .mock("GET", "/")
            .with_status(200)
            .with_body(r#"<a href="mailto:not an address">mail</a>"#)
            .create_async()
            .await;

        let downloader = local_downloader();
        let url = Url::parse(&server.url()).unwrap();
        let emails = collect_emails(&downloader, &url).await.unwrap();
        assert!(emails.is_empty());
    }
}
