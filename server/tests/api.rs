//! End-to-end proxy behaviour: session gate, list and detail round-trips
//! against the fixture upstream, and the error mapping for each failure
//! class.

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use mock_upstream::Fixture;
use pokedex_proxy::{
    app,
    config::Config,
    error::{DETAIL_FETCH_FAILED, LIST_FETCH_FAILED},
    session::SESSION_COOKIE,
    state::AppState,
};
use serde_json::{json, Value};
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tower::ServiceExt;
use tower_cookies::{cookie::CookieJar, Cookie};

async fn start_upstream(fixture: Fixture) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_upstream::run_with(listener, fixture));
    format!("http://{addr}")
}

fn state_for(upstream: &str, extra: &[(&str, &str)]) -> Arc<AppState> {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("POKEAPI_GRAPHQL_URL".to_string(), format!("{upstream}/graphql")),
        ("POKEAPI_BASE_URL".to_string(), upstream.to_string()),
        ("UPSTREAM_TIMEOUT_SECS".to_string(), "2".to_string()),
        ("AUTH_USERNAME".to_string(), "admin".to_string()),
        ("AUTH_PASSWORD".to_string(), "admin".to_string()),
        ("SESSION_SECRET".to_string(), "k".repeat(64)),
    ]);
    for (key, value) in extra {
        vars.insert(key.to_string(), value.to_string());
    }
    let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
    AppState::new(config).unwrap()
}

fn proxy_for(upstream: &str, extra: &[(&str, &str)]) -> Router {
    app(state_for(upstream, extra))
}

async fn proxy(fixture: Fixture) -> Router {
    let upstream = start_upstream(fixture).await;
    proxy_for(&upstream, &[])
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn login_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// Log in and return the `name=value` pair to send back as `Cookie`.
async fn login(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(login_request(r#"{"username":"admin","password":"admin"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    session_cookie(&response).expect("login sets a session cookie")
}

fn session_cookie(response: &axum::response::Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(SESSION_COOKIE))
        .and_then(|value| value.split(';').next())
        .map(str::to_string)
}

fn names(page: &Value) -> Vec<String> {
    page["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap().to_string())
        .collect()
}

// --- auth ---

#[tokio::test]
async fn login_success_sets_session() {
    let app = proxy(Fixture::standard()).await;
    let response = app
        .clone()
        .oneshot(login_request(r#"{"username":"admin","password":"admin"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Max-Age=3600"));
    assert_eq!(
        body_json(response).await,
        json!({
            "success": true,
            "message": "Login successful",
            "user": { "username": "admin" }
        })
    );
}

#[tokio::test]
async fn login_rejections_are_uniform() {
    let app = proxy(Fixture::standard()).await;
    for body in [
        r#"{"username":"admin","password":"wrong"}"#,
        r#"{"username":"Admin","password":"admin"}"#,
        r#"{"username":"admin"}"#,
        r#"{}"#,
        "not json",
    ] {
        let response = app.clone().oneshot(login_request(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "body {body}");
        assert!(session_cookie(&response).is_none());
        assert_eq!(
            body_json(response).await,
            json!({ "success": false, "error": "Invalid credentials" })
        );
    }
}

#[tokio::test]
async fn logout_always_succeeds() {
    let app = proxy(Fixture::standard()).await;
    for method in ["POST", "DELETE", "POST"] {
        let request = Request::builder()
            .method(method)
            .uri("/api/v1/logout")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({ "success": true, "message": "Logged out successfully" })
        );
    }
}

#[tokio::test]
async fn catalog_requires_session() {
    let app = proxy(Fixture::standard()).await;
    for uri in ["/api/v1/pokemons", "/api/v1/pokemons/1"] {
        let response = app.clone().oneshot(get(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await, json!({ "error": "Unauthorized" }));
    }

    let forged = format!("{SESSION_COOKIE}=admin:9999999999");
    let response = app
        .clone()
        .oneshot(get("/api/v1/pokemons", Some(&forged)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn session_from_another_key_is_rejected() {
    let upstream = start_upstream(Fixture::standard()).await;
    let first = proxy_for(&upstream, &[]);
    let other_secret = "z".repeat(64);
    let second = proxy_for(&upstream, &[("SESSION_SECRET", other_secret.as_str())]);

    let cookie = login(&first).await;
    let response = second
        .oneshot(get("/api/v1/pokemons", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// A session cookie for `admin` issued `age` ago, signed with the state's key.
fn signed_session(state: &AppState, age: time::Duration) -> String {
    let issued_at = (OffsetDateTime::now_utc() - age).unix_timestamp();
    let mut jar = CookieJar::new();
    jar.signed_mut(&state.session_key)
        .add(Cookie::new(SESSION_COOKIE, format!("admin:{issued_at}")));
    let cookie = jar.get(SESSION_COOKIE).unwrap();
    format!("{}={}", cookie.name(), cookie.value())
}

#[tokio::test]
async fn expired_session_is_rejected() {
    let upstream = start_upstream(Fixture::standard()).await;
    let state = state_for(&upstream, &[]);
    let app = app(state.clone());

    let fresh = signed_session(&state, time::Duration::minutes(5));
    let response = app
        .clone()
        .oneshot(get("/api/v1/pokemons?limit=1", Some(&fresh)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let stale = signed_session(&state, time::Duration::minutes(61));
    let response = app
        .clone()
        .oneshot(get("/api/v1/pokemons?limit=1", Some(&stale)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await, json!({ "error": "Unauthorized" }));
}

#[tokio::test]
async fn logout_removes_cookie() {
    let app = proxy(Fixture::standard()).await;
    let cookie = login(&app).await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/logout")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let removal = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(removal.starts_with(&format!("{SESSION_COOKIE}=;")));
    assert!(removal.contains("Max-Age=0"));
}

// --- list ---

#[tokio::test]
async fn first_page_with_defaults() {
    let app = proxy(Fixture::standard()).await;
    let cookie = login(&app).await;

    let response = app
        .clone()
        .oneshot(get("/api/v1/pokemons", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let page = body_json(response).await;
    assert_eq!(page["count"], 1302);
    assert_eq!(page["next"], "offset=20&limit=20");
    assert_eq!(page["previous"], Value::Null);
    let results = page["results"].as_array().unwrap();
    assert_eq!(results.len(), 20);
    assert_eq!(
        results[0],
        json!({
            "id": 1,
            "name": "bulbasaur",
            "number": 1,
            "image_url": format!("{}/1.png", mock_upstream::SPRITE_BASE),
        })
    );
}

#[tokio::test]
async fn paging_follows_cursors() {
    let app = proxy(Fixture::standard()).await;
    let cookie = login(&app).await;

    let page = body_json(
        app.clone()
            .oneshot(get("/api/v1/pokemons?offset=24&limit=2", Some(&cookie)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(names(&page), ["pikachu", "raichu"]);
    assert_eq!(page["next"], "offset=26&limit=2");
    assert_eq!(page["previous"], "offset=22&limit=2");
}

#[tokio::test]
async fn limit_is_clamped() {
    let app = proxy(Fixture::standard()).await;
    let cookie = login(&app).await;

    let page = body_json(
        app.clone()
            .oneshot(get("/api/v1/pokemons?limit=0", Some(&cookie)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(names(&page), ["bulbasaur"]);

    let page = body_json(
        app.clone()
            .oneshot(get("/api/v1/pokemons?limit=500&offset=", Some(&cookie)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(page["results"].as_array().unwrap().len(), 33);
    assert_eq!(page["next"], Value::Null);
}

#[tokio::test]
async fn bad_paging_params_are_400() {
    let app = proxy(Fixture::standard()).await;
    let cookie = login(&app).await;

    for uri in [
        "/api/v1/pokemons?offset=-1",
        "/api/v1/pokemons?offset=abc",
        "/api/v1/pokemons?limit=ten",
    ] {
        let response = app.clone().oneshot(get(uri, Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("must be"));
    }
}

#[tokio::test]
async fn unparseable_query_string_is_json_400() {
    let app = proxy(Fixture::standard()).await;
    let cookie = login(&app).await;

    let response = app
        .clone()
        .oneshot(get("/api/v1/pokemons?offset=1&offset=2", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("offset"), "{body}");
}

#[tokio::test]
async fn search_by_name_and_number() {
    let app = proxy(Fixture::standard()).await;
    let cookie = login(&app).await;

    let page = body_json(
        app.clone()
            .oneshot(get("/api/v1/pokemons?search=CHAR", Some(&cookie)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(names(&page), ["charmander", "charmeleon", "charizard"]);
    assert_eq!(page["count"], 3);
    assert_eq!(page["next"], Value::Null);

    let page = body_json(
        app.clone()
            .oneshot(get("/api/v1/pokemons?search=025", Some(&cookie)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(names(&page), ["pikachu"]);

    let page = body_json(
        app.clone()
            .oneshot(get("/api/v1/pokemons?search=zzz", Some(&cookie)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(page["count"], 0);
    assert_eq!(page["results"], json!([]));
}

#[tokio::test]
async fn like_wildcards_in_search_match_literally() {
    let app = proxy(Fixture::standard()).await;
    let cookie = login(&app).await;

    for (search, expected) in [
        ("_", &[][..]),
        ("%25", &[][..]),
        ("mr_mime", &[][..]),
        ("mr-mime", &["mr-mime"][..]),
    ] {
        let uri = format!("/api/v1/pokemons?search={search}");
        let page = body_json(app.clone().oneshot(get(&uri, Some(&cookie))).await.unwrap()).await;
        assert_eq!(names(&page), expected, "{uri}");
    }
}

#[tokio::test]
async fn out_of_range_number_search_is_empty() {
    let app = proxy(Fixture::standard()).await;
    let cookie = login(&app).await;

    let response = app
        .clone()
        .oneshot(get("/api/v1/pokemons?search=99999999999", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["count"], 0);
    assert_eq!(page["results"], json!([]));
}

#[tokio::test]
async fn sort_by_name_accepts_both_spellings() {
    let app = proxy(Fixture::standard()).await;
    let cookie = login(&app).await;

    for uri in [
        "/api/v1/pokemons?limit=3&sort_by=name",
        "/api/v1/pokemons?limit=3&sortBy=name",
    ] {
        let page = body_json(app.clone().oneshot(get(uri, Some(&cookie))).await.unwrap()).await;
        assert_eq!(names(&page), ["arbok", "beedrill", "blastoise"], "{uri}");
    }

    let page = body_json(
        app.clone()
            .oneshot(get("/api/v1/pokemons?limit=2&sort_by=weight", Some(&cookie)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(names(&page), ["bulbasaur", "ivysaur"]);
}

#[tokio::test]
async fn upstream_query_error_is_passed_through() {
    let app = proxy(Fixture::with_query_error("field 'x' not found")).await;
    let cookie = login(&app).await;

    let response = app
        .clone()
        .oneshot(get("/api/v1/pokemons", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        body_json(response).await,
        json!({ "error": "field 'x' not found" })
    );
}

#[tokio::test]
async fn upstream_outage_is_502() {
    let app = proxy(Fixture::failing(StatusCode::SERVICE_UNAVAILABLE)).await;
    let cookie = login(&app).await;

    let response = app
        .clone()
        .oneshot(get("/api/v1/pokemons", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await, json!({ "error": LIST_FETCH_FAILED }));

    let response = app
        .clone()
        .oneshot(get("/api/v1/pokemons/1", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await, json!({ "error": DETAIL_FETCH_FAILED }));
}

#[tokio::test]
async fn slow_upstream_times_out_as_502() {
    let upstream = start_upstream(Fixture::slow(Duration::from_secs(5))).await;
    let app = proxy_for(&upstream, &[("UPSTREAM_TIMEOUT_SECS", "1")]);
    let cookie = login(&app).await;

    let response = app
        .clone()
        .oneshot(get("/api/v1/pokemons", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await, json!({ "error": LIST_FETCH_FAILED }));
}

#[tokio::test]
async fn unreachable_upstream_is_502() {
    let unused = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream = format!("http://{}", unused.local_addr().unwrap());
    drop(unused);

    let app = proxy_for(&upstream, &[]);
    let cookie = login(&app).await;
    let response = app
        .clone()
        .oneshot(get("/api/v1/pokemons", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await, json!({ "error": LIST_FETCH_FAILED }));
}

// --- detail ---

#[tokio::test]
async fn detail_is_normalized() {
    let app = proxy(Fixture::standard()).await;
    let cookie = login(&app).await;

    let response = app
        .clone()
        .oneshot(get("/api/v1/pokemons/1", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let detail = body_json(response).await;
    assert_eq!(detail["id"], 1);
    assert_eq!(detail["name"], "bulbasaur");
    assert_eq!(detail["number"], 1);
    assert_eq!(
        detail["image_url"],
        format!("{}/1.png", mock_upstream::SPRITE_BASE)
    );
    assert_eq!(detail["types"], json!(["grass", "poison"]));
    assert_eq!(detail["abilities"][1]["name"], "chlorophyll");
    assert_eq!(detail["abilities"][1]["is_hidden"], true);
    assert_eq!(detail["stats"].as_array().unwrap().len(), 6);
    assert_eq!(detail["stats"][0]["name"], "hp");
    assert_eq!(detail["moves"][0]["name"], "tackle");
}

#[tokio::test]
async fn detail_by_name() {
    let app = proxy(Fixture::standard()).await;
    let cookie = login(&app).await;

    let detail = body_json(
        app.clone()
            .oneshot(get("/api/v1/pokemons/Mr-Mime", Some(&cookie)))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(detail["id"], 122);
    assert_eq!(detail["types"], json!(["psychic", "fairy"]));
}

#[tokio::test]
async fn detail_not_found_is_404() {
    let app = proxy(Fixture::standard()).await;
    let cookie = login(&app).await;

    let response = app
        .clone()
        .oneshot(get("/api/v1/pokemons/9999", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, json!({ "error": "Pokemon not found" }));
}

#[tokio::test]
async fn detail_rejects_malformed_id() {
    let app = proxy(Fixture::standard()).await;
    let cookie = login(&app).await;

    let response = app
        .clone()
        .oneshot(get("/api/v1/pokemons/mr.mime", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());

    let response = app
        .clone()
        .oneshot(get("/api/v1/pokemons/%FF", Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

// --- misc ---

#[tokio::test]
async fn health_needs_no_session() {
    let app = proxy(Fixture::standard()).await;
    let response = app.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn cors_allows_configured_origin() {
    let app = proxy(Fixture::standard()).await;
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/api/v1/login")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
}
