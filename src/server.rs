use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::store::Store;

/// HTTP server
///
/// Routes `PUT`/`GET`/`DELETE` on any path to the store, treating the path
/// minus its leading slash as the key. Keys are passed through verbatim: no
/// normalization, length limit, or character restriction.
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    store: Arc<Store>,
}

impl Server {
    /// Create and bind the HTTP server to the specified address
    pub async fn bind(addr: &str, store: Arc<Store>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        info!("HTTP server bound to {}", local_addr);

        Ok(Self {
            listener,
            local_addr,
            store,
        })
    }

    /// Get local listening address
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve requests until the process exits
    pub async fn run(self) -> std::io::Result<()> {
        info!("Server started, listening on {}", self.local_addr);
        axum::serve(self.listener, router(self.store)).await
    }
}

/// Build the application router over a store instance.
pub fn router(store: Arc<Store>) -> Router {
    // "/" is the empty key; "/*key" captures everything else, slashes
    // included. Unhandled methods fall through to axum's 405.
    Router::new()
        .route(
            "/",
            get(get_root).put(put_root).delete(delete_root),
        )
        .route(
            "/*key",
            get(get_key).put(put_key).delete(delete_key),
        )
        .with_state(store)
        .layer(TraceLayer::new_for_http())
}

async fn get_key(State(store): State<Arc<Store>>, Path(key): Path<String>) -> Response {
    get_value(store, &key).await
}

async fn put_key(
    State(store): State<Arc<Store>>,
    Path(key): Path<String>,
    body: Bytes,
) -> StatusCode {
    put_value(store, key, body).await
}

async fn delete_key(State(store): State<Arc<Store>>, Path(key): Path<String>) -> StatusCode {
    delete_value(store, &key).await
}

async fn get_root(State(store): State<Arc<Store>>) -> Response {
    get_value(store, "").await
}

async fn put_root(State(store): State<Arc<Store>>, body: Bytes) -> StatusCode {
    put_value(store, String::new(), body).await
}

async fn delete_root(State(store): State<Arc<Store>>) -> StatusCode {
    delete_value(store, "").await
}

async fn get_value(store: Arc<Store>, key: &str) -> Response {
    match store.get(key).await {
        Some(value) => value.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// The response is decided by the in-memory update alone; a failed snapshot
/// write leaves the on-disk copy stale and is only logged.
async fn put_value(store: Arc<Store>, key: String, body: Bytes) -> StatusCode {
    if let Err(e) = store.put(key, body.to_vec()).await {
        error!("snapshot not updated after put: {e}");
    }
    StatusCode::NO_CONTENT
}

async fn delete_value(store: Arc<Store>, key: &str) -> StatusCode {
    if let Err(e) = store.delete(key).await {
        error!("snapshot not updated after delete: {e}");
    }
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use tower::ServiceExt;

    async fn test_router(dir: &tempfile::TempDir) -> Router {
        let store = Arc::new(Store::open(dir.path().join("store.db.json")).await);
        router(store)
    }

    fn request(method: Method, uri: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(body.into())
            .unwrap()
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec()
    }

    #[tokio::test]
    async fn test_put_get_delete_lifecycle() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(&dir).await;

        let response = app
            .clone()
            .oneshot(request(Method::PUT, "/alpha", "hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/alpha", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await, b"hello");

        let response = app
            .clone()
            .oneshot(request(Method::DELETE, "/alpha", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(request(Method::GET, "/alpha", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_missing_key_without_backing_file() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(&dir).await;

        let response = app
            .oneshot(request(Method::GET, "/missing", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_put_empty_body_is_distinct_from_absent() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(&dir).await;

        let response = app
            .clone()
            .oneshot(request(Method::PUT, "/k", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(request(Method::GET, "/k", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_bytes(response).await.is_empty());
    }

    #[tokio::test]
    async fn test_key_may_contain_slashes() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(&dir).await;

        let response = app
            .clone()
            .oneshot(request(Method::PUT, "/nested/path/key", "v"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(request(Method::GET, "/nested/path/key", Body::empty()))
            .await
            .unwrap();
        assert_eq!(body_bytes(response).await, b"v");
    }

    #[tokio::test]
    async fn test_root_path_is_the_empty_key() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(&dir).await;

        let response = app
            .clone()
            .oneshot(request(Method::PUT, "/", "root value"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(request(Method::GET, "/", Body::empty()))
            .await
            .unwrap();
        assert_eq!(body_bytes(response).await, b"root value");
    }

    #[tokio::test]
    async fn test_unhandled_method_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(&dir).await;

        let response = app
            .oneshot(request(Method::POST, "/alpha", "x"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_put_succeeds_even_when_snapshot_write_fails() {
        let dir = tempfile::tempdir().unwrap();
        // Backing path is a directory, so every snapshot write fails.
        let store = Arc::new(Store::open(dir.path()).await);
        let app = router(store);

        let response = app
            .clone()
            .oneshot(request(Method::PUT, "/k", "v"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(request(Method::GET, "/k", Body::empty()))
            .await
            .unwrap();
        assert_eq!(body_bytes(response).await, b"v");
    }
}
