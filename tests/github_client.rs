use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use atelier::github::{GitHubApi, GitHubClient, GitHubError};

const GOOD_AUTH: &str = "token good-token";

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .is_some_and(|v| v == GOOD_AUTH)
}

async fn user(headers: HeaderMap) -> StatusCode {
    if authorized(&headers) {
        StatusCode::OK
    } else {
        StatusCode::UNAUTHORIZED
    }
}

async fn user_repos(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(json!([{
        "name": "portfolio",
        "description": "My portfolio site",
        "html_url": "https://github.com/jdoe/portfolio",
        "language": "Python",
        "topics": ["django"],
        "created_at": "2024-01-15T10:00:00Z",
        "updated_at": "2024-06-01T12:30:00Z"
    }]))
    .into_response()
}

async fn broken_repo() -> StatusCode {
    StatusCode::INTERNAL_SERVER_ERROR
}

/// Serves a minimal stand-in for the GitHub API on an ephemeral port.
async fn spawn_stub() -> String {
    let app = Router::new()
        .route("/user", get(user))
        .route("/user/repos", get(user_repos))
        .route("/repos/{owner}/{name}", get(broken_repo));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn test_connect_rejects_invalid_token() {
    let base_url = spawn_stub().await;

    let err = GitHubClient::connect_to(&base_url, "bad-token")
        .await
        .err()
        .expect("connect must fail");

    assert!(matches!(
        err,
        GitHubError::Authentication { status: 401 }
    ));
}

#[tokio::test]
async fn test_connect_then_list_repositories() {
    let base_url = spawn_stub().await;

    let client = GitHubClient::connect_to(&base_url, "good-token")
        .await
        .expect("connect");

    let repos = client.list_repositories().await.expect("list");
    assert_eq!(repos.len(), 1);
    assert_eq!(repos[0].name, "portfolio");
    assert_eq!(repos[0].topics, vec!["django"]);
}

#[tokio::test]
async fn test_data_operation_failures_are_status_errors() {
    let base_url = spawn_stub().await;

    let client = GitHubClient::connect_to(&base_url, "good-token")
        .await
        .expect("connect");

    // Server errors on a data operation
    let err = client
        .get_repository("jdoe", "portfolio")
        .await
        .expect_err("must fail");
    assert!(matches!(err, GitHubError::Status { status: 500, .. }));

    // A route the stub never registered
    let err = client.get_languages("jdoe", "portfolio").await.expect_err("must fail");
    assert!(matches!(err, GitHubError::Status { status: 404, .. }));
}
