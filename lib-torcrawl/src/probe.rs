use lazy_static::lazy_static;
use scraper::{Html, Selector};
use url::Url;

use crate::crawler::Downloader;
use crate::Error;

/// The well-known page that reports the observed egress IP.
pub const DEFAULT_CHECK_URL: &str = "https://check.torproject.org/";

lazy_static! {
    static ref STRONG: Selector = Selector::parse("strong").expect("failed to parse static selector");
}

/// Fetches `check_url` and returns the text of the first `<strong>` on the
/// page, which on the Tor check page is the exit IP. A page without one
/// yields an empty string; only transport trouble is an error.
pub async fn exit_ip(downloader: &dyn Downloader, check_url: &Url) -> Result<String, Error> {
    let downloaded = downloader.download(check_url).await?;
    let html = Html::parse_document(&String::from_utf8_lossy(&downloaded.content));

    Ok(html
        .select(&STRONG)
        .next()
        .and_then(|element| element.text().next())
        .map(|text| text.trim().to_owned())
        .unwrap_or_default())
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

    #[tokio::test]
    async fn reads_the_first_strong_tag() {
        let mut server = mockito::Server::new_async().await;
        let _check = server
            .mock("GET", "/")
            .with_status(200)
            .with_body("<html><body><p>Your IP: <strong>Random IP Address</strong></p></body></html>")
            .create_async()
            .await;

        let downloader = local_downloader();
        let url = Url::parse(&server.url()).unwrap();
        assert_eq!(exit_ip(&downloader, &url).await.unwrap(), "Random IP Address");
    }

    #[tokio::test]
    async fn page_without_strong_yields_empty() {
        let mut server = mockito::Server::new_async().await;
        let _check = server
            .mock("GET", "/")
            .with_status(200)
            .with_body("<html><body><p>nothing to see</p></body></html>")
            .create_async()
            .await;

        let downloader = local_downloader();
        let url = Url::parse(&server.url()).unwrap();
        assert_eq!(exit_ip(&downloader, &url).await.unwrap(), "");
    }

    #[tokio::test]
    async fn transport_error_is_surfaced() {
        let downloader = HttpDownloader::new(&ClientOpts {
            use_tor: false,
            dial_timeout: std::time::Duration::from_millis(300),
            request_timeout: std::time::Duration::from_millis(800),
            ..ClientOpts::default()
        })
        .unwrap();

        let url = Url::parse("http://127.0.0.1:9/").unwrap();
        assert!(exit_ip(&downloader, &url).await.is_err());
    }
}
