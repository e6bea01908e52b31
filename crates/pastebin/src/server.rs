//! HTTPS front end: routes, handlers and TLS listeners.
//!
//! The same router is served on loopback and on the primary address. Each
//! accepted connection goes through the rustls handshake and is then handed
//! to hyper with the peer address attached for the handlers.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::{ConnectInfo, Form, State};
use axum::http::{HeaderMap, header};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use rustls::ServerConfig;
use serde::Deserialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio_rustls::TlsAcceptor;
use tower::ServiceExt;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::error::{AppError, HttpError, Result};
use crate::pages;
use crate::pastes::{Paste, PasteStore};
use crate::qr;
use crate::urls::{content_url, home_url, local_url};

/// State shared by every handler.
#[derive(Debug)]
pub struct AppState {
    pastes: PasteStore,
    server_ip: IpAddr,
    port: u16,
}

impl AppState {
    /// Creates an empty paste service advertised at `server_ip:port`.
    #[must_use]
    pub fn new(server_ip: IpAddr, port: u16) -> Self {
        Self {
            pastes: PasteStore::new(),
            server_ip,
            port,
        }
    }

    /// The paste store.
    #[must_use]
    pub const fn pastes(&self) -> &PasteStore {
        &self.pastes
    }
}

/// Form posted by the paste page.
#[derive(Debug, Deserialize)]
pub struct SaveForm {
    /// Text to store.
    #[serde(default)]
    pub content: String,
    /// Boolean-ish visibility flag.
    pub private: Option<String>,
}

/// Form posted by the viewer.
#[derive(Debug, Deserialize)]
pub struct ContentForm {
    /// Identifier of the requested paste.
    #[serde(default, rename = "contentKey")]
    pub content_key: String,
}

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/save", post(save))
        .route("/c", get(view))
        .route("/getContent", post(get_content))
        .route("/content", post(get_content))
        .fallback(home)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Interpretation of the `private` form field.
///
/// Only an explicit false value makes a paste public; a missing or
/// unrecognised value keeps it private.
fn parse_private(value: Option<&str>) -> bool {
    !matches!(
        value.map(str::trim),
        Some("0" | "f" | "F" | "false" | "FALSE" | "False")
    )
}

fn host_header(headers: &HeaderMap) -> &str {
    headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// Handle GET / - paste form.
async fn home(State(state): State<Arc<AppState>>) -> Html<String> {
    Html(pages::home_page(state.server_ip))
}

/// Handle POST /save - store a paste and show its link.
async fn save(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Form(form): Form<SaveForm>,
) -> std::result::Result<Html<String>, HttpError> {
    let paste = Paste {
        text: form.content,
        private: parse_private(form.private.as_deref()),
    };
    let id = state.pastes.insert(paste.clone()).await;
    info!(remote = %peer, id = %id, "Content saved");
    info!(url = %format!("{}c#{id}", local_url(state.port)), "New text copied");

    let url = content_url(state.server_ip, state.port, &id);
    let qr_svg = qr::svg(&url)?;
    let home = home_url(host_header(&headers), peer.ip(), state.server_ip, state.port);
    Ok(Html(pages::saved_page(&paste, &url, &qr_svg, &home)))
}

/// Handle GET /c - paste viewer.
async fn view(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Html<String> {
    let home = home_url(host_header(&headers), peer.ip(), state.server_ip, state.port);
    Html(pages::view_page(&home))
}

/// Handle POST /getContent and /content - paste lookup.
async fn get_content(
    State(state): State<Arc<AppState>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Form(form): Form<ContentForm>,
) -> std::result::Result<Json<Paste>, HttpError> {
    info!(remote = %peer, key = %form.content_key, "Content requested");
    state
        .pastes
        .get(&form.content_key)
        .await
        .map(Json)
        .ok_or(HttpError::NotFound)
}

/// Addresses the server listens on: loopback and the primary address.
#[must_use]
pub fn listen_addrs(primary: IpAddr, port: u16) -> Vec<SocketAddr> {
    let mut addrs = vec![SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)];
    let primary = SocketAddr::new(primary, port);
    if !addrs.contains(&primary) {
        addrs.push(primary);
    }
    addrs
}

/// Binds every address, failing on the first one that is unavailable.
///
/// # Errors
///
/// Returns `AppError::Bind` naming the address that could not be bound.
pub async fn bind(addrs: &[SocketAddr]) -> Result<Vec<TcpListener>> {
    let mut listeners = Vec::with_capacity(addrs.len());
    for &addr in addrs {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::Bind(addr, e))?;
        listeners.push(listener);
    }
    Ok(listeners)
}

/// Serves `router` over TLS on every listener until `shutdown` turns true.
///
/// # Errors
///
/// Returns `AppError::Io` if a listener fails outside of a single connection.
pub async fn serve(
    listeners: Vec<TcpListener>,
    tls: Arc<ServerConfig>,
    router: Router,
    shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let acceptor = TlsAcceptor::from(tls);
    let mut tasks = JoinSet::new();
    for listener in listeners {
        tasks.spawn(accept_loop(
            listener,
            acceptor.clone(),
            router.clone(),
            shutdown.clone(),
        ));
    }

    while let Some(joined) = tasks.join_next().await {
        joined.map_err(|e| AppError::Io(std::io::Error::other(e)))??;
    }
    info!("Server shut down");
    Ok(())
}

async fn accept_loop(
    listener: TcpListener,
    acceptor: TlsAcceptor,
    router: Router,
    mut shutdown: watch::Receiver<bool>,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(addr = %addr, "Serving on https://{addr}");

    loop {
        tokio::select! {
            accept = listener.accept() => {
                match accept {
                    Ok((stream, peer)) => {
                        tokio::spawn(handle_connection(
                            stream,
                            peer,
                            acceptor.clone(),
                            router.clone(),
                        ));
                    }
                    Err(e) => error!(addr = %addr, error = %e, "Accept failed"),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!(addr = %addr, "Listener shutting down");
                    break;
                }
            }
        }
    }
    Ok(())
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    acceptor: TlsAcceptor,
    router: Router,
) {
    let stream = match acceptor.accept(stream).await {
        Ok(stream) => stream,
        Err(e) => {
            // Browsers drop the first handshake until the certificate is trusted.
            debug!(peer = %peer, error = %e, "TLS handshake failed");
            return;
        }
    };

    let service = service_fn(move |mut request: Request<Incoming>| {
        request.extensions_mut().insert(ConnectInfo(peer));
        router.clone().oneshot(request)
    });

    if let Err(e) = http1::Builder::new()
        .serve_connection(TokioIo::new(stream), service)
        .await
    {
        if !e.is_incomplete_message() {
            warn!(peer = %peer, error = %e, "Connection error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use http_body_util::BodyExt;
    use test_case::test_case;

    const LAN_PEER: &str = "192.168.1.50:51000";

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new("192.168.1.10".parse().unwrap(), 8443))
    }

    fn form_request(uri: &str, body: &str, peer: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::HOST, "192.168.1.10:8443")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .extension(ConnectInfo(peer.parse::<SocketAddr>().unwrap()))
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str, host: &str, peer: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder()
            .uri(uri)
            .header(header::HOST, host)
            .extension(ConnectInfo(peer.parse::<SocketAddr>().unwrap()))
            .body(Body::empty())
            .unwrap()
    }

    fn saved_id(page: &str) -> String {
        let start = page.find("/c#").unwrap() + 3;
        page[start..start + crate::pastes::ID_LEN].to_string()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(body.to_vec()).unwrap()
    }

    #[test_case(None, true ; "missing")]
    #[test_case(Some("true"), true ; "true")]
    #[test_case(Some("1"), true ; "one")]
    #[test_case(Some("on"), true ; "unrecognised")]
    #[test_case(Some("false"), false ; "false")]
    #[test_case(Some("F"), false ; "short false")]
    #[test_case(Some("0"), false ; "zero")]
    fn private_flag(value: Option<&str>, expected: bool) {
        assert_eq!(parse_private(value), expected);
    }

    #[test]
    fn listens_on_loopback_and_primary() {
        assert_eq!(
            listen_addrs("10.0.0.5".parse().unwrap(), 8443),
            vec![
                "127.0.0.1:8443".parse::<SocketAddr>().unwrap(),
                "10.0.0.5:8443".parse().unwrap()
            ]
        );
        assert_eq!(listen_addrs("127.0.0.1".parse().unwrap(), 8443).len(), 1);
    }

    #[tokio::test]
    async fn home_serves_paste_form() {
        let response = router(state())
            .oneshot(get_request("/", "192.168.1.10:8443", LAN_PEER))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("action=\"/save\""));
    }

    #[tokio::test]
    async fn save_stores_paste_and_links_it() {
        let state = state();
        let response = router(state.clone())
            .oneshot(form_request(
                "/save",
                "content=hello+%3Cworld%3E&private=false",
                LAN_PEER,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let page = body_text(response).await;
        assert!(page.contains("hello &lt;world&gt;"));
        assert!(page.contains("https://192.168.1.10:8443/c#"));
        assert!(page.contains("<svg"));
        assert_eq!(state.pastes().len().await, 1);

        let stored = state.pastes().get(&saved_id(&page)).await.unwrap();
        assert_eq!(stored.text, "hello <world>");
        assert!(!stored.private);
    }

    #[tokio::test]
    async fn save_without_flag_is_private() {
        let state = state();
        let response = router(state.clone())
            .oneshot(form_request("/save", "content=secret", LAN_PEER))
            .await
            .unwrap();

        let page = body_text(response).await;
        assert!(page.contains("<details>"));
        let stored = state.pastes().get(&saved_id(&page)).await.unwrap();
        assert!(stored.private);
    }

    #[tokio::test]
    async fn save_requires_post() {
        let response = router(state())
            .oneshot(get_request("/save", "192.168.1.10:8443", LAN_PEER))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test_case("/getContent" ; "get content")]
    #[test_case("/content" ; "content alias")]
    #[tokio::test]
    async fn content_lookup_returns_json(uri: &str) {
        let state = state();
        let id = state
            .pastes()
            .insert(Paste {
                text: "shared".into(),
                private: true,
            })
            .await;

        let response = router(state)
            .oneshot(form_request(uri, &format!("contentKey={id}"), LAN_PEER))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json, serde_json::json!({"text": "shared", "private": true}));
    }

    #[tokio::test]
    async fn unknown_key_is_not_found() {
        let response = router(state())
            .oneshot(form_request("/getContent", "contentKey=zzzz", LAN_PEER))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "content not found");
    }

    #[test_case("192.168.1.10:8443", LAN_PEER, "href=\"https://192.168.1.10:8443/\"" ; "lan client")]
    #[test_case("localhost:8443", "127.0.0.1:40000", "href=\"https://localhost:8443/\"" ; "local client")]
    #[tokio::test]
    async fn viewer_links_home_for_the_client(host: &str, peer: &str, expected: &str) {
        let response = router(state())
            .oneshot(get_request("/c", host, peer))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains(expected));
    }

    #[tokio::test]
    async fn bind_reports_taken_address() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();

        let result = bind(&[addr]).await;

        assert!(matches!(result, Err(AppError::Bind(a, _)) if a == addr));
    }

    #[tokio::test]
    async fn serve_stops_on_shutdown() {
        let dir = tempfile::tempdir().expect("tempdir");
        let paths = paste_pki::PairPaths::in_dir(dir.path());
        let pair = paste_pki::issue(
            &paste_pki::CertIdentity::default(),
            &["127.0.0.1".parse().unwrap()],
            &[],
        )
        .unwrap();
        paste_pki::write_pair(&paths, &pair).unwrap();
        let tls = crate::tls::load_server_config(&paths).unwrap();

        let listeners = bind(&["127.0.0.1:0".parse().unwrap()]).await.unwrap();
        let addr = listeners[0].local_addr().unwrap();
        let (tx, rx) = watch::channel(false);
        let server = tokio::spawn(serve(listeners, tls, router(state()), rx));

        // A client that never completes the handshake does not stop the listener.
        let stray = TcpStream::connect(addr).await.unwrap();
        drop(stray);

        tx.send(true).unwrap();
        server.await.unwrap().unwrap();
    }
}
