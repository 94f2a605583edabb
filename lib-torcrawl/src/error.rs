use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("bad socks5 proxy address: {0}")]
    BadProxy(String),
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("fetch error: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("url parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
    #[error("bad link: {0}")]
    BadLink(String),
    #[error("unaccepted scheme: {0}")]
    UnacceptedScheme(String),
    #[error("no host: {0}")]
    NoHost(String),
    #[error("bad configuration: {0}")]
    BadConfig(String),
    #[error("crawl interrupted")]
    Interrupted,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Whether this error stands for external cancellation, as opposed to a
    /// failure of the crawl itself.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Interrupted)
    }
}

impl From<String> for Error {
    fn from(this: String) -> Error {
        Error::Custom(this)
    }
}
