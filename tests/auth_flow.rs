//! End-to-end register / login / gated access / logout through the router.

use authgate::auth::password::MIN_COST;
use authgate::auth::{AuthSettings, CredentialStore, PasswordHasher};
use authgate::config::GatewayConfig;
use authgate::gateway::cookie::CookieSettings;
use authgate::gateway::{router, AppState};
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use cookie::Cookie;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

fn app() -> Router {
    let state = AppState::from_parts(
        CredentialStore::in_memory().unwrap(),
        PasswordHasher::new(MIN_COST).unwrap(),
        AuthSettings::default(),
        CookieSettings::default(),
    )
    .unwrap();
    router(state, &GatewayConfig::default())
}

fn post_form(path: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(path).header(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
    );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_owned())).unwrap()
}

fn get(path: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn json(response: Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// `session=<token>` from the response's `Set-Cookie`.
fn session_cookie(response: &Response) -> String {
    let value = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("Set-Cookie present")
        .to_str()
        .unwrap();
    let cookie = Cookie::parse(value).unwrap();
    format!("{}={}", cookie.name(), cookie.value())
}

#[tokio::test]
async fn register_login_access_logout() {
    let app = app();

    let response = send(
        &app,
        post_form("/register", "username=alice&password=s3cret&email=a%40x.com", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await["success"], true);

    let response = send(&app, post_form("/login", "username=alice&password=s3cret", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie(&response);
    assert!(cookie.starts_with("session="));
    assert_eq!(cookie.len(), "session=".len() + 32);

    let me = json(send(&app, get("/me", Some(&cookie))).await).await;
    assert_eq!(me["logged"], true);
    assert_eq!(me["username"], "alice");

    let response = send(&app, get("/hello", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await["message"], "Hello, API!");

    let response = send(&app, get("/api.html", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, get("/logout", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let cleared = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(cleared.contains("Max-Age=0"));

    // The old cookie no longer opens anything.
    let response = send(&app, get("/hello", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, get("/api.html", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers().get(header::LOCATION).unwrap(), "/auth.html");

    let me = json(send(&app, get("/me", Some(&cookie))).await).await;
    assert_eq!(me["logged"], false);
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let app = app();
    let body = "username=alice&password=s3cret&email=a%40x.com";

    let first = send(&app, post_form("/register", body, None)).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = send(
        &app,
        post_form("/register", "username=ALICE&password=other&email=b%40x.com", None),
    )
    .await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(json(second).await["success"], false);

    // The original password still works.
    let login = send(&app, post_form("/login", "username=alice&password=s3cret", None)).await;
    assert_eq!(login.status(), StatusCode::OK);
}

#[tokio::test]
async fn wrong_password_sets_no_cookie() {
    let app = app();
    send(
        &app,
        post_form("/register", "username=alice&password=s3cret&email=a%40x.com", None),
    )
    .await;

    let response = send(&app, post_form("/login", "username=alice&password=nope", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(json(response).await["error"], "invalid username or password");
}

#[tokio::test]
async fn logged_in_user_cannot_register_again() {
    let app = app();
    send(
        &app,
        post_form("/register", "username=alice&password=s3cret&email=a%40x.com", None),
    )
    .await;
    let login = send(&app, post_form("/login", "username=alice&password=s3cret", None)).await;
    let cookie = session_cookie(&login);

    let response = send(
        &app,
        post_form(
            "/register",
            "username=bob&password=pw&email=b%40x.com",
            Some(&cookie),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unauthenticated_requests_are_gated() {
    let app = app();

    let response = send(&app, get("/hello", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json(response).await["success"], false);

    let response = send(&app, get("/hash?password=pw", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, get("/api.html", None)).await;
    assert_eq!(response.status(), StatusCode::FOUND);

    let response = send(&app, get("/register", None)).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn public_pages_render() {
    let app = app();
    for path in ["/", "/auth.html"] {
        let response = send(&app, get(path, None)).await;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
        let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
        assert!(content_type.to_str().unwrap().starts_with("text/html"));
    }

    let health = json(send(&app, get("/health", None)).await).await;
    assert_eq!(health["status"], "ok");
}
