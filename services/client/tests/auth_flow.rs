//! Integration tests for login, registration, hydration and logout.


use client_lib::adapters::FileStorage;
use client_lib::config::Config;
use client_lib::AppContext;
use fixtures::{
    can_bind_localhost, context, read_tokens, session_body, signed_in, token_path, EMAIL,
    PASSWORD,
};
use serde_json::json;
use tempfile::TempDir;
use todo_core::ports::{DurableStorage, PortError};
use todo_core::session_store::SessionState;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn login_with_known_user_authenticates() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({ "email": EMAIL, "password": PASSWORD })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(session_body("u1", EMAIL, "a1", "r1")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut ctx = context(&server, &dir);
    let session = ctx.login(EMAIL, PASSWORD).await.unwrap().clone();

    assert_eq!(session.email, EMAIL);
    assert_eq!(session.user_id, "u1");
    assert_eq!(ctx.session_store().state(), SessionState::Authenticated(session));

    let stored = read_tokens(&dir);
    assert_eq!(stored["accessToken"], "a1");
    assert_eq!(stored["refreshToken"], "r1");
}

#[tokio::test]
async fn login_with_bad_password_is_unauthorized_without_refresh() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let mut ctx = context(&server, &dir);
    let result = ctx.login(EMAIL, "wrong").await;

    assert!(matches!(result, Err(PortError::Unauthorized(_))));
    assert!(!ctx.session_store().is_authenticated());
}

#[tokio::test]
async fn register_with_taken_email_is_a_conflict() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    let mut ctx = signed_in(&server, &dir).await;
    let before = ctx.session_store().state();

    Mock::given(method("POST"))
        .and(path("/api/register"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "title": "One or more validation errors occurred.",
            "status": 400,
            "errors": {
                "DuplicateUserName": ["Username 'tester@test.tld' is already taken."]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = ctx.register(EMAIL, PASSWORD).await;

    match result {
        Err(PortError::Conflict(message)) => assert!(message.contains("Duplicate")),
        other => panic!("expected conflict, got {other:?}"),
    }
    assert_eq!(ctx.session_store().state(), before);
    assert_eq!(read_tokens(&dir)["accessToken"], "a1");
}

#[tokio::test]
async fn register_without_tokens_follows_up_with_login() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/register"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(session_body("u9", EMAIL, "a9", "r9")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut ctx = context(&server, &dir);
    let session = ctx.register(EMAIL, PASSWORD).await.unwrap();

    assert_eq!(session.user_id, "u9");
    assert_eq!(session.access_token, "a9");
}

#[tokio::test]
async fn login_without_id_looks_up_own_details() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tokenType": "Bearer",
            "accessToken": "a1",
            "refreshToken": "r1",
            "expiresIn": 3600
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users/getowndetails"))
        .and(header("Authorization", "Bearer a1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "u-7", "email": EMAIL })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut ctx = context(&server, &dir);
    let session = ctx.login(EMAIL, PASSWORD).await.unwrap();

    assert_eq!(session.user_id, "u-7");
    assert_eq!(session.email, EMAIL);
}

#[tokio::test]
async fn initialize_restores_stored_session() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    FileStorage::new(token_path(&dir))
        .set_many(&[("accessToken", "a1"), ("refreshToken", "r1")])
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/users/getowndetails"))
        .and(header("Authorization", "Bearer a1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "u1", "email": EMAIL })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut ctx = context(&server, &dir);
    assert!(ctx.initialize().await.unwrap());

    let session = ctx.session_store().session().unwrap();
    assert_eq!(session.user_id, "u1");
    assert_eq!(session.access_token, "a1");
    assert_eq!(session.refresh_token, "r1");
}

#[tokio::test]
async fn initialize_with_expired_token_stays_anonymous_without_requests() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    FileStorage::new(token_path(&dir))
        .set_many(&[
            ("accessToken", "a1"),
            ("refreshToken", "r1"),
            ("accessTokenExpiresAt", "2000-01-01T00:00:00+00:00"),
        ])
        .unwrap();

    let mut ctx = context(&server, &dir);
    assert!(!ctx.initialize().await.unwrap());
    assert_eq!(ctx.session_store().state(), SessionState::Anonymous);
    assert_eq!(fixtures::request_count(&server).await, 0);
}

#[tokio::test]
async fn initialize_with_revoked_tokens_clears_storage() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    FileStorage::new(token_path(&dir))
        .set_many(&[("accessToken", "a1"), ("refreshToken", "r1")])
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/users/getowndetails"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/refresh"))
        .and(body_json(json!({ "refreshToken": "r1" })))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let mut ctx = context(&server, &dir);
    assert!(!ctx.initialize().await.unwrap());

    assert_eq!(ctx.session_store().state(), SessionState::Anonymous);
    let stored = read_tokens(&dir);
    assert!(stored.get("accessToken").is_none());
    assert!(stored.get("refreshToken").is_none());
}

#[tokio::test]
async fn corrupt_token_file_leaves_client_usable() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    std::fs::write(token_path(&dir), "{not json").unwrap();

    let mut ctx = context(&server, &dir);
    assert!(!ctx.initialize().await.unwrap());
    assert_eq!(ctx.session_store().state(), SessionState::Anonymous);
    assert_eq!(fixtures::request_count(&server).await, 0);

    std::fs::write(token_path(&dir), "{not json").unwrap();
    ctx.logout().unwrap();

    std::fs::write(token_path(&dir), "{not json").unwrap();
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(session_body("u1", EMAIL, "a1", "r1")),
        )
        .mount(&server)
        .await;
    ctx.login(EMAIL, PASSWORD).await.unwrap();

    assert_eq!(read_tokens(&dir)["accessToken"], "a1");
    assert_eq!(read_tokens(&dir)["refreshToken"], "r1");
}

#[tokio::test]
async fn initialize_with_malformed_expiry_discards_tokens() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    FileStorage::new(token_path(&dir))
        .set_many(&[
            ("accessToken", "a1"),
            ("refreshToken", "r1"),
            ("accessTokenExpiresAt", "tomorrow"),
        ])
        .unwrap();

    let mut ctx = context(&server, &dir);
    assert!(!ctx.initialize().await.unwrap());

    assert_eq!(fixtures::request_count(&server).await, 0);
    let stored = read_tokens(&dir);
    assert!(stored.get("accessToken").is_none());
    assert!(stored.get("accessTokenExpiresAt").is_none());
}

#[tokio::test]
async fn initialize_discards_access_token_without_refresh_token() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    FileStorage::new(token_path(&dir))
        .set_many(&[("accessToken", "a1")])
        .unwrap();

    Mock::given(method("GET"))
        .and(path("/api/users/getowndetails"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": "u1", "email": EMAIL })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut ctx = context(&server, &dir);
    assert!(!ctx.initialize().await.unwrap());

    assert_eq!(ctx.session_store().state(), SessionState::Anonymous);
    assert!(read_tokens(&dir).get("accessToken").is_none());
}

#[tokio::test]
async fn logout_clears_tokens_and_cache() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    let mut ctx = signed_in(&server, &dir).await;

    Mock::given(method("GET"))
        .and(path("/api/todos/u1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "todoItems": [{ "id": 1, "title": "Buy milk", "status": 0 }]
        })))
        .mount(&server)
        .await;
    ctx.refresh_todos().await.unwrap();
    assert_eq!(ctx.todo_store().len(), 1);

    ctx.logout().unwrap();
    ctx.logout().unwrap();

    assert_eq!(ctx.session_store().state(), SessionState::Anonymous);
    assert!(ctx.todo_store().is_empty());
    assert!(read_tokens(&dir).get("accessToken").is_none());
}

#[tokio::test]
async fn unreachable_backend_is_a_network_error() {
    let dir = TempDir::new().unwrap();
    let config = Config::for_base_url("http://127.0.0.1:1/api", token_path(&dir)).unwrap();
    let mut ctx = AppContext::new(&config).unwrap();

    let error = ctx.login(EMAIL, PASSWORD).await.unwrap_err();

    assert!(matches!(error, PortError::Network(_)));
    assert!(error.is_retryable());
    assert!(!ctx.session_store().is_authenticated());
}

#[tokio::test]
async fn user_lookup_by_id_uses_bearer() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    let ctx = signed_in(&server, &dir).await;

    Mock::given(method("GET"))
        .and(path("/api/users/u2"))
        .and(header("Authorization", "Bearer a1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": "u2", "email": "friend@test.tld" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let user = ctx.user("u2").await.unwrap();

    assert_eq!(user.email, "friend@test.tld");
}
