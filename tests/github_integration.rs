//! Integration tests for the GitHub forge against a mock HTTP server.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use multirepo::core::types::RepoSlug;
use multirepo::forge::github::GitHubForge;
use multirepo::forge::{
    CreatePrRequest, Forge, ForgeError, PrState, StaticToken, TokenProvider,
};

fn repo() -> RepoSlug {
    RepoSlug::new("camptocamp/tilecloud").unwrap()
}

fn forge(server: &MockServer) -> GitHubForge {
    GitHubForge::with_api_base(Arc::new(StaticToken::new("ghp_test")), server.uri())
}

fn request() -> CreatePrRequest {
    CreatePrRequest {
        head: "update-ci".to_string(),
        base: "master".to_string(),
        title: "Update the CI".to_string(),
        body: Some("Generated".to_string()),
        draft: false,
        labels: vec!["chore".to_string()],
    }
}

fn pull_request_json(number: u64, state: &str) -> serde_json::Value {
    json!({
        "number": number,
        "html_url": format!("https://github.com/camptocamp/tilecloud/pull/{number}"),
        "state": state,
        "draft": false,
        "head": { "ref": "update-ci" },
        "base": { "ref": "master" },
        "title": "Update the CI",
        "merged": false,
    })
}

// =============================================================================
// Creating pull requests
// =============================================================================

mod create {
    use super::*;

    #[tokio::test]
    async fn posts_the_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/camptocamp/tilecloud/pulls"))
            .and(header("authorization", "Bearer ghp_test"))
            .and(body_partial_json(json!({
                "head": "update-ci",
                "base": "master",
                "title": "Update the CI",
                "body": "Generated",
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(pull_request_json(42, "open")))
            .expect(1)
            .mount(&server)
            .await;

        let pr = forge(&server).create_pr(&repo(), request()).await.unwrap();

        assert_eq!(pr.number, 42);
        assert_eq!(pr.url, "https://github.com/camptocamp/tilecloud/pull/42");
        assert_eq!(pr.state, PrState::Open);
        assert_eq!(pr.head, "update-ci");
    }

    #[tokio::test]
    async fn labels_go_to_the_issue() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/camptocamp/tilecloud/pulls"))
            .respond_with(ResponseTemplate::new(201).set_body_json(pull_request_json(42, "open")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/camptocamp/tilecloud/issues/42/labels"))
            .and(header("authorization", "Bearer ghp_test"))
            .and(body_partial_json(json!({ "labels": ["chore"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "name": "chore" }])))
            .expect(1)
            .mount(&server)
            .await;

        let pr = forge(&server).create_pr(&repo(), request()).await.unwrap();
        assert_eq!(pr.number, 42);
    }

    #[tokio::test]
    async fn unlabeled_pull_request_is_still_returned() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/camptocamp/tilecloud/pulls"))
            .respond_with(ResponseTemplate::new(201).set_body_json(pull_request_json(42, "open")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/camptocamp/tilecloud/issues/42/labels"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({ "message": "Forbidden" })))
            .expect(1)
            .mount(&server)
            .await;

        let pr = forge(&server).create_pr(&repo(), request()).await.unwrap();
        assert_eq!(pr.url, "https://github.com/camptocamp/tilecloud/pull/42");
    }

    #[tokio::test]
    async fn no_labels_no_label_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/camptocamp/tilecloud/pulls"))
            .respond_with(ResponseTemplate::new(201).set_body_json(pull_request_json(42, "open")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/repos/camptocamp/tilecloud/issues/42/labels"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let request = CreatePrRequest {
            labels: Vec::new(),
            ..request()
        };
        forge(&server).create_pr(&repo(), request).await.unwrap();
    }

    #[tokio::test]
    async fn validation_error_keeps_details() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/camptocamp/tilecloud/pulls"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Validation Failed",
                "errors": [{ "message": "No commits between master and update-ci" }],
            })))
            .mount(&server)
            .await;

        let err = forge(&server).create_pr(&repo(), request()).await.unwrap_err();

        match err {
            ForgeError::ApiError { status, message } => {
                assert_eq!(status, 422);
                assert!(message.contains("Validation Failed"));
                assert!(message.contains("No commits between"));
            }
            other => panic!("expected an API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn exhausted_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("X-RateLimit-Remaining", "0")
                    .set_body_json(json!({ "message": "API rate limit exceeded" })),
            )
            .mount(&server)
            .await;

        let err = forge(&server).create_pr(&repo(), request()).await.unwrap_err();
        assert!(matches!(err, ForgeError::RateLimited));
    }

    #[tokio::test]
    async fn forbidden_lists_scopes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("X-Accepted-OAuth-Scopes", "repo")
                    .insert_header("X-OAuth-Scopes", "read:org")
                    .set_body_json(json!({ "message": "Resource not accessible" })),
            )
            .mount(&server)
            .await;

        let err = forge(&server).create_pr(&repo(), request()).await.unwrap_err();
        match err {
            ForgeError::AuthFailed(message) => {
                assert!(message.contains("required scopes: repo"));
                assert!(message.contains("granted: read:org"));
            }
            other => panic!("expected an auth failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn bad_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "message": "Bad credentials" })))
            .mount(&server)
            .await;

        let err = forge(&server).create_pr(&repo(), request()).await.unwrap_err();
        assert!(matches!(err, ForgeError::AuthFailed(_)));
    }
}

// =============================================================================
// Finding pull requests
// =============================================================================

mod find {
    use super::*;

    #[tokio::test]
    async fn queries_open_pull_requests_by_owner_and_branch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/camptocamp/tilecloud/pulls"))
            .and(query_param("head", "camptocamp:update-ci"))
            .and(query_param("state", "open"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([pull_request_json(7, "open")])))
            .expect(1)
            .mount(&server)
            .await;

        let pr = forge(&server)
            .find_pr_by_head(&repo(), "update-ci")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(pr.number, 7);
    }

    #[tokio::test]
    async fn nothing_open() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let pr = forge(&server).find_pr_by_head(&repo(), "update-ci").await.unwrap();
        assert!(pr.is_none());
    }

    #[tokio::test]
    async fn unknown_repository() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
            .mount(&server)
            .await;

        let err = forge(&server)
            .find_pr_by_head(&repo(), "update-ci")
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::NotFound(message) if message == "Not Found"));
    }
}

// =============================================================================
// Authentication
// =============================================================================

struct NoToken;

#[async_trait]
impl TokenProvider for NoToken {
    async fn bearer_token(&self) -> Result<String, ForgeError> {
        Err(ForgeError::AuthRequired)
    }
}

#[tokio::test]
async fn missing_token_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let forge = GitHubForge::with_api_base(Arc::new(NoToken), server.uri());
    let err = forge.create_pr(&repo(), request()).await.unwrap_err();

    assert!(matches!(err, ForgeError::AuthRequired));
}
