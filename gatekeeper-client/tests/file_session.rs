//! HTTP transport backed by the on-disk session store

use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::{Json, Router};
use gatekeeper_client::{
    ApiClientConfig, FileSessionStore, HttpTransport, IamApi, RecordingNavigator, SessionProvider,
};
use gatekeeper_core::{Group, GatekeeperError, PrincipalPermission, Session, User};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

async fn spawn_backend(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("test server");
    });
    format!("http://{}", addr)
}

fn session(token: &str) -> Session {
    Session {
        user: User::reference(1),
        token: Some(token.to_string()),
    }
}

/// Accepts only `Bearer current`; anything else is an expired session
fn backend() -> Router {
    Router::new().route(
        "/api/groups",
        get(|headers: HeaderMap| async move {
            let authorized = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                == Some("Bearer current");
            if authorized {
                (StatusCode::OK, Json(json!({"groups": [{"id": 2, "name": "Ops"}]})))
            } else {
                (StatusCode::UNAUTHORIZED, Json(json!({"message": "Token expired"})))
            }
        }),
    )
}

#[tokio::test]
async fn credential_is_read_per_request() {
    let dir = TempDir::new().expect("temp dir");
    let store = Arc::new(FileSessionStore::new(dir.path()).expect("session dir"));
    let navigator = Arc::new(RecordingNavigator::new());
    let base = spawn_backend(backend()).await;

    let transport = HttpTransport::new(ApiClientConfig::new(&base), store.clone(), navigator.clone())
        .expect("transport builds");
    let api = IamApi::new(Arc::new(transport));

    // A session written after the transport was built is picked up
    store.store_session(&session("current")).expect("store session");
    let groups: Vec<Group> = api.list().await.expect("list groups");
    assert_eq!(groups[0].name, "Ops");
    assert_eq!(navigator.redirects(), 0);
}

#[tokio::test]
async fn expired_session_removes_both_files() {
    let dir = TempDir::new().expect("temp dir");
    let store = Arc::new(FileSessionStore::new(dir.path()).expect("session dir"));
    store.store_session(&session("stale")).expect("store session");
    store
        .store_permissions(&[PrincipalPermission::new("Groups", "read")])
        .expect("store permissions");

    let navigator = Arc::new(RecordingNavigator::new());
    let base = spawn_backend(backend()).await;
    let transport = HttpTransport::new(ApiClientConfig::new(&base), store.clone(), navigator.clone())
        .expect("transport builds");
    let api = IamApi::new(Arc::new(transport));

    let err = api.list::<Group>().await.unwrap_err();
    assert!(matches!(err, GatekeeperError::Authentication { .. }));
    assert_eq!(err.user_message(), "Token expired");
    assert_eq!(navigator.redirects(), 1);

    let reopened = FileSessionStore::new(dir.path()).expect("session dir");
    assert!(reopened.load_session().expect("readable").is_none());
    assert!(reopened.load_permissions().expect("readable").is_empty());
}
