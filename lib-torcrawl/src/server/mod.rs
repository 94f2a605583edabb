//! The HTTP JSON API: small extraction endpoints over the crawl engine.

use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::crawler::{normalize_seed, Crawler, Downloader, LinkTree, Node};
use crate::page_meta::{extract_page_meta, PageMeta};
use crate::probe;
use crate::profile::Profile;
use crate::{extract, Error};

#[derive(Clone)]
pub struct AppState {
    downloader: Arc<dyn Downloader>,
    profile: Arc<Profile>,
    check_url: Url,
}

impl AppState {
    pub fn new(downloader: Arc<dyn Downloader>, profile: Profile) -> AppState {
        AppState {
            downloader,
            profile: Arc::new(profile),
            check_url: Url::parse(probe::DEFAULT_CHECK_URL).expect("default check url is valid"),
        }
    }

    /// Points the `/ip` probe somewhere else. Useful against test servers.
    pub fn with_check_url(mut self, check_url: Url) -> AppState {
        self.check_url = check_url;
        self
    }
}

/// An error already shaped for the wire.
struct ApiError(StatusCode, String);

impl ApiError {
    fn bad_request(message: &str) -> ApiError {
        ApiError(StatusCode::BAD_REQUEST, message.to_owned())
    }

    fn internal(error: Error) -> ApiError {
        ApiError(StatusCode::INTERNAL_SERVER_ERROR, error.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

fn required_link(params: &HashMap<String, String>) -> Result<Url, ApiError> {
    let link = params
        .get("link")
        .map(|link| link.trim())
        .filter(|link| !link.is_empty())
        .ok_or_else(|| ApiError::bad_request("link cannot be blank"))?;

    normalize_seed(link).map_err(|_| ApiError::bad_request("link must be a valid http(s) URL"))
}

async fn get_ip(State(state): State<AppState>) -> Result<String, ApiError> {
    log::info!("retrieving exit IP");
    probe::exit_ip(&*state.downloader, &state.check_url)
        .await
        .map_err(ApiError::internal)
}

async fn get_tree(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Node>, ApiError> {
    let link = required_link(&params)?;
    let depth = match params.get("depth") {
        None => 1,
        Some(raw) => raw
            .parse::<u16>()
            .map_err(|_| ApiError::bad_request("invalid depth, must be an integer"))?,
    };

    log::info!("building tree for {} at depth {}", link, depth);

    let mut parameters = state.profile.parameters();
    parameters.max_depth = depth;
    parameters.do_not_log_stats = true;

    let crawler =
        Crawler::new(state.downloader.clone(), parameters).map_err(ApiError::internal)?;
    crawler.seed([link.as_str()]);

    let tree = Arc::new(LinkTree::new());
    crawler
        .run(CancellationToken::new(), tree.clone())
        .await
        .map_err(ApiError::internal)?;

    let node = tree
        .to_node(&link)
        .ok_or_else(|| ApiError::internal(Error::BadLink(link.to_string())))?;

    Ok(Json(node))
}

async fn get_content(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<String>, ApiError> {
    let link = required_link(&params)?;

    let downloaded = state
        .downloader
        .download(&link)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(String::from_utf8_lossy(&downloaded.content).into_owned()))
}

async fn get_emails(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<String>>, ApiError> {
    let link = required_link(&params)?;

    extract::collect_emails(&*state.downloader, &link)
        .await
        .map(Json)
        .map_err(ApiError::internal)
}

async fn get_phone_numbers(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<String>>, ApiError> {
    let link = required_link(&params)?;

    extract::collect_phone_numbers(&*state.downloader, &link)
        .await
        .map(Json)
        .map_err(ApiError::internal)
}

async fn get_meta(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<PageMeta>, ApiError> {
    let link = required_link(&params)?;

    let downloaded = state
        .downloader
        .download(&link)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(extract_page_meta(&downloaded, &link)))
}

async fn log_requests(request: Request, next: Next) -> Response {
    log::info!("{} {}", request.method(), request.uri());
    next.run(request).await
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ip", get(get_ip))
        .route("/tree", get(get_tree))
        .route("/content", get(get_content))
        .route("/emails", get(get_emails))
        .route("/phone", get(get_phone_numbers))
        .route("/meta", get(get_meta))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Binds and serves the API until the process ends.
pub async fn serve(address: SocketAddr, state: AppState) -> Result<(), Error> {
    log::info!("starting torcrawl server on {}", address);
    let listener = tokio::net::TcpListener::bind(address).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{ClientOpts, HttpDownloader};

    async fn spawn_api(state: AppState) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        address
    }

    fn state() -> AppState {
        let downloader = Arc::new(
            HttpDownloader::new(&ClientOpts {
                use_tor: false,
                ..ClientOpts::default()
            })
            .unwrap(),
        );
        let profile = Profile {
            workers: 4,
            rps: 1000.0,
            burst: 100,
            ..Profile::default()
        };
        AppState::new(downloader, profile)
    }

    #[tokio::test]
    async fn ip_endpoint_reports_the_probe_result() {
        let mut upstream = mockito::Server::new_async().await;
        let _check = upstream
            .mock("GET", "/")
            .with_status(200)
            .with_body("<strong>10.20.30.40</strong>")
            .create_async()
            .await;

        let state = state().with_check_url(Url::parse(&upstream.url()).unwrap());
        let api = spawn_api(state).await;

        let body = reqwest::get(format!("http://{api}/ip"))
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(body, "10.20.30.40");
    }

    #[tokio::test]
    async fn tree_endpoint_builds_a_depth_one_tree() {
        let mut upstream = mockito::Server::new_async().await;
        let _root = upstream
            .mock("GET", "/")
            .with_status(200)
            .with_body(r#"<a href="/leaf">leaf</a>"#)
            .create_async()
            .await;
        let _leaf = upstream
            .mock("GET", "/leaf")
            .with_status(200)
            .with_body("")
            .create_async()
            .await;

        let api = spawn_api(state()).await;

        let response = reqwest::get(format!(
            "http://{api}/tree?link={}&depth=1",
            upstream.url()
        ))
        .await
        .unwrap();
        assert_eq!(response.status(), 200);

        let node: Node = response.json().await.unwrap();
        assert_eq!(node.status_code, 200);
        assert_eq!(node.children.len(), 1);
        assert!(node.children[0].url.ends_with("/leaf"));
    }

    #[tokio::test]
    async fn blank_and_invalid_input_is_rejected() {
        let api = spawn_api(state()).await;

        let response = reqwest::get(format!("http://{api}/tree")).await.unwrap();
        assert_eq!(response.status(), 400);

        let response = reqwest::get(format!("http://{api}/tree?link=")).await.unwrap();
        assert_eq!(response.status(), 400);

        let response = reqwest::get(format!(
            "http://{api}/tree?link=https://example.com&depth=much"
        ))
        .await
        .unwrap();
        assert_eq!(response.status(), 400);

        let response = reqwest::get(format!("http://{api}/emails?link=")).await.unwrap();
        assert_eq!(response.status(), 400);
    }

    #[tokio::test]
    async fn content_endpoint_returns_the_body_as_json_string() {
        let mut upstream = mockito::Server::new_async().await;
        let _page = upstream
            .mock("GET", "/")
            .with_status(200)
            .with_body("<html><body>raw page</body></html>")
            .create_async()
            .await;

        let api = spawn_api(state()).await;

        let body: String = reqwest::get(format!("http://{api}/content?link={}", upstream.url()))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(body.contains("raw page"));
    }

    #[tokio::test]
    async fn phone_endpoint_lists_tel_links() {
        let mut upstream = mockito::Server::new_async().await;
        let _page = upstream
            .mock("GET", "/")
            .with_status(200)
            .with_body(r#"<a href="tel:+3555">call</a>"#)
            .create_async()
            .await;

        let api = spawn_api(state()).await;

        let numbers: Vec<String> =
            reqwest::get(format!("http://{api}/phone?link={}", upstream.url()))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
        assert_eq!(numbers, vec!["+3555"]);
    }

    #[tokio::test]
    async fn meta_endpoint_returns_page_metadata() {
        let mut upstream = mockito::Server::new_async().await;
        let _page = upstream
            .mock("GET", "/")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><head><title>Meta page</title></head></html>")
            .create_async()
            .await;

        let api = spawn_api(state()).await;

        let meta: serde_json::Value =
            reqwest::get(format!("http://{api}/meta?link={}", upstream.url()))
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
        assert_eq!(meta["title"], "Meta page");
        assert_eq!(meta["status"], 200);
    }
}
