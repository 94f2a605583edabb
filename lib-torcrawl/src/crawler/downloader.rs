use async_trait::async_trait;
use http::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL};
use http::StatusCode;
use tokio::time::Duration;
use url::Url;

use crate::Error;

/// Configuration of the one process-wide HTTP client.
#[derive(Debug, Clone)]
pub struct ClientOpts {
    /// Route all connections through a SOCKS5 proxy (Tor).
    pub use_tor: bool,
    pub socks_host: String,
    pub socks_port: u16,
    pub dial_timeout: Duration,
    pub request_timeout: Duration,
    pub max_idle_conns: usize,
    /// Often desirable when SOCKS5 is in use.
    pub disable_http2: bool,
    pub user_agent: String,
}

impl Default for ClientOpts {
    fn default() -> ClientOpts {
        ClientOpts {
            use_tor: true,
            socks_host: "127.0.0.1".to_owned(),
            socks_port: 9050,
            dial_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_idle_conns: 32,
            disable_http2: false,
            user_agent: crate::default_user_agent().to_owned(),
        }
    }
}

/// What came back for a page: the final status after redirects, the response
/// headers and the whole (already decompressed) body.
#[derive(Debug, Clone)]
pub struct Downloaded {
    pub status_code: StatusCode,
    pub headers: HeaderMap,
    pub content: Vec<u8>,
}

#[async_trait]
pub trait Downloader: 'static + Send + Sync {
    async fn download(&self, page_url: &Url) -> Result<Downloaded, Error>;
}

/// The production downloader: a single reqwest client with connection
/// pooling, optionally dialing through SOCKS5.
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new(opts: &ClientOpts) -> Result<HttpDownloader, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let mut builder = reqwest::Client::builder()
            .user_agent(opts.user_agent.as_str())
            .default_headers(headers)
            .connect_timeout(opts.dial_timeout)
            .timeout(opts.request_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(opts.max_idle_conns)
            .redirect(reqwest::redirect::Policy::limited(10));

        if opts.use_tor {
            // socks5h: names resolve through the proxy, which is what makes
            // .onion addresses reachable at all.
            let address = format!("socks5h://{}:{}", opts.socks_host, opts.socks_port);
            let proxy = reqwest::Proxy::all(address.as_str())
                .map_err(|_| Error::BadProxy(address.clone()))?;
            builder = builder.proxy(proxy);
        } else {
            // Explicitly requested direct connections: environment proxy
            // settings are not consulted.
            builder = builder.no_proxy();
        }

        if opts.disable_http2 {
            builder = builder.http1_only();
        }

        let client = builder.build().map_err(Error::Client)?;

        Ok(HttpDownloader { client })
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, page_url: &Url) -> Result<Downloaded, Error> {
        let response = self.client.get(page_url.clone()).send().await?;

        let status_code = response.status();
        let headers = response.headers().clone();
        let content = response.bytes().await?.to_vec();

        Ok(Downloaded {
            status_code,
            headers,
            content,
        })
    }
}
