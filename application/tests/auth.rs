use std::time::Duration;

use application::{app, Service, Transport};
use axum::{body::Body, Router};
use common::{Role, RoleSet};
use secrecy::SecretBox;
use serde_json::{json, Value};
use service::{
    command::{self, Command as _},
    domain::user::{self, session},
    infra::Memory,
};
use tower::ServiceExt as _;

fn service() -> Service {
    Service::new(
        service::Config {
            codec: session::Codec::new(
                b"0123456789abcdef0123456789abcdef",
                "site",
                "site-clients",
                Duration::from_secs(60),
            )
            .unwrap(),
            session_ttl: Duration::from_secs(7 * 24 * 60 * 60),
        },
        Memory::default(),
    )
}

fn router(service: Service) -> Router {
    app(service, Transport::new("auth_token"))
}

struct Response {
    status: http::StatusCode,
    set_cookie: Option<String>,
    body: Value,
}

async fn call(
    app: &Router,
    method: http::Method,
    uri: &str,
    headers: &[(http::HeaderName, String)],
    body: Option<Value>,
) -> Response {
    let mut req = http::Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        req = req.header(name, value);
    }
    let req = match body {
        Some(body) => req
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => req.body(Body::empty()),
    }
    .unwrap();

    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let set_cookie = resp
        .headers()
        .get(http::header::SET_COOKIE)
        .map(|h| h.to_str().unwrap().to_owned());
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    Response {
        status,
        set_cookie,
        body,
    }
}

async fn register(app: &Router, username: &str, email: &str) -> Response {
    call(
        app,
        http::Method::POST,
        "/api/auth/register",
        &[],
        Some(json!({
            "username": username,
            "email": email,
            "password": "secret1",
        })),
    )
    .await
}

async fn login(app: &Router, identifier: &str, password: &str) -> Response {
    call(
        app,
        http::Method::POST,
        "/api/auth/login",
        &[],
        Some(json!({
            "usernameOrEmail": identifier,
            "password": password,
        })),
    )
    .await
}

async fn get(app: &Router, uri: &str, token: Option<&str>) -> Response {
    let headers = token
        .map(|t| (http::header::AUTHORIZATION, format!("Bearer {t}")))
        .into_iter()
        .collect::<Vec<_>>();
    call(app, http::Method::GET, uri, &headers, None).await
}

fn token(resp: &Response) -> &str {
    resp.body["token"].as_str().unwrap()
}

#[tokio::test]
async fn registers_as_member_and_sets_cookie() {
    let app = router(service());

    let resp = register(&app, "alice", "alice@x.com").await;

    assert_eq!(resp.status, http::StatusCode::OK);
    assert_eq!(resp.body["tokenType"], "Bearer");
    assert_eq!(resp.body["user"]["username"], "alice");
    assert_eq!(resp.body["user"]["email"], "alice@x.com");
    assert_eq!(
        resp.body["user"]["roles"],
        u64::from(RoleSet::from(Role::Member).bits()),
    );
    assert!(resp.body["expiresAt"].as_str().unwrap().ends_with('Z'));

    let cookie = resp.set_cookie.as_deref().unwrap();
    assert!(cookie.starts_with(&format!("auth_token={};", token(&resp))));
    for attr in ["HttpOnly", "Secure", "SameSite=Lax", "Path=/", "Expires="] {
        assert!(cookie.contains(attr), "missing `{attr}` in `{cookie}`");
    }
}

#[tokio::test]
async fn refuses_duplicate_or_malformed_registration() {
    let app = router(service());
    drop(register(&app, "alice", "alice@x.com").await);

    let dup = register(&app, "alice", "other@x.com").await;
    assert_eq!(dup.status, http::StatusCode::CONFLICT);
    assert_eq!(dup.body["code"], "ALREADY_EXISTS");

    let bad = register(&app, "al", "not-an-email").await;
    assert_eq!(bad.status, http::StatusCode::BAD_REQUEST);
    assert_eq!(bad.body["code"], "INVALID_CREDENTIALS_FORMAT");

    let garbage = call(
        &app,
        http::Method::POST,
        "/api/auth/register",
        &[],
        Some(json!({"username": "bob"})),
    )
    .await;
    assert!(garbage.status.is_client_error());
    assert_eq!(garbage.body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn logs_in_by_name_or_email() {
    let app = router(service());
    drop(register(&app, "alice", "alice@x.com").await);

    for identifier in ["alice", "alice@x.com"] {
        let resp = login(&app, identifier, "secret1").await;

        assert_eq!(resp.status, http::StatusCode::OK, "{identifier}");
        assert_eq!(resp.body["user"]["username"], "alice");
        assert!(resp.set_cookie.is_some());
    }
}

#[tokio::test]
async fn rejects_wrong_credentials_uniformly() {
    let app = router(service());
    drop(register(&app, "alice", "alice@x.com").await);

    let wrong_password = login(&app, "alice", "wrong").await;
    let unknown_user = login(&app, "bob", "secret1").await;
    let malformed = login(&app, "?", "secret1").await;

    for resp in [&wrong_password, &unknown_user, &malformed] {
        assert_eq!(resp.status, http::StatusCode::UNAUTHORIZED);
        assert!(resp.set_cookie.is_none());
    }
    assert_eq!(wrong_password.body, unknown_user.body);
    assert_eq!(wrong_password.body, malformed.body);
    assert_eq!(wrong_password.body["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn describes_principal_by_cookie_or_header() {
    let app = router(service());
    let reg = register(&app, "alice", "alice@x.com").await;
    let token = token(&reg);

    let by_header = get(&app, "/api/auth/me", Some(token)).await;
    let by_cookie = call(
        &app,
        http::Method::GET,
        "/api/auth/me",
        &[(http::header::COOKIE, format!("auth_token={token}"))],
        None,
    )
    .await;

    for resp in [by_header, by_cookie] {
        assert_eq!(resp.status, http::StatusCode::OK);
        assert_eq!(resp.body, reg.body["user"]);
    }
}

#[tokio::test]
async fn prefers_cookie_over_header() {
    let app = router(service());
    let alice = register(&app, "alice", "alice@x.com").await;
    let bob = register(&app, "bob", "bob@x.com").await;

    let resp = call(
        &app,
        http::Method::GET,
        "/api/auth/me",
        &[
            (http::header::COOKIE, format!("auth_token={}", token(&bob))),
            (
                http::header::AUTHORIZATION,
                format!("Bearer {}", token(&alice)),
            ),
        ],
        None,
    )
    .await;

    assert_eq!(resp.body["username"], "bob");
}

#[tokio::test]
async fn treats_tampered_token_as_anonymous() {
    let app = router(service());
    let reg = register(&app, "alice", "alice@x.com").await;
    let mut tampered = token(&reg).to_owned();
    let last = tampered.pop().unwrap();
    tampered.push(if last == 'A' { 'B' } else { 'A' });

    let anonymous = get(&app, "/api/auth/me", None).await;
    let forged = get(&app, "/api/auth/me", Some(&tampered)).await;
    let garbage = get(&app, "/api/auth/me", Some("garbage")).await;

    for resp in [&anonymous, &forged, &garbage] {
        assert_eq!(resp.status, http::StatusCode::UNAUTHORIZED);
        assert_eq!(resp.body, anonymous.body);
    }
}

#[tokio::test]
async fn gates_endpoints_by_any_of_roles() {
    let service = service();
    for (name, roles) in [
        ("moder", RoleSet::from(Role::Moderator)),
        ("admin", Role::Admin.into()),
    ] {
        drop(
            service
                .execute(command::CreateUser {
                    name: user::Name::new(name).unwrap(),
                    email: user::Email::new(format!("{name}@x.com")).unwrap(),
                    password: SecretBox::new(Box::new(
                        user::Password::new("secret1").unwrap(),
                    )),
                    roles,
                })
                .await
                .unwrap(),
        );
    }
    let app = router(service);
    let member = register(&app, "alice", "alice@x.com").await;
    let moder = login(&app, "moder", "secret1").await;
    let admin = login(&app, "admin", "secret1").await;

    let cases = [
        ("/api/moderation/queue", Some(token(&moder)), 200),
        ("/api/moderation/queue", Some(token(&admin)), 200),
        ("/api/moderation/queue", Some(token(&member)), 403),
        ("/api/moderation/queue", None, 401),
        ("/api/admin/secret", Some(token(&admin)), 200),
        ("/api/admin/secret", Some(token(&moder)), 403),
        ("/api/admin/secret", None, 401),
    ];
    for (uri, token, status) in cases {
        let resp = get(&app, uri, token).await;

        assert_eq!(resp.status.as_u16(), status, "{uri} with {token:?}");
    }
}

#[tokio::test]
async fn logout_clears_cookie() {
    let app = router(service());
    let reg = register(&app, "alice", "alice@x.com").await;

    let resp = call(
        &app,
        http::Method::POST,
        "/api/auth/logout",
        &[(http::header::COOKIE, format!("auth_token={}", token(&reg)))],
        None,
    )
    .await;

    assert_eq!(resp.status, http::StatusCode::OK);
    let cookie = resp.set_cookie.unwrap();
    assert!(cookie.starts_with("auth_token=;"), "{cookie}");
    assert!(cookie.contains("Max-Age=0"), "{cookie}");
    assert!(cookie.contains("Path=/"), "{cookie}");
}
