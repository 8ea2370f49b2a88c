use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use shared::domain::{SortDirection, SortKey};
use tokio::{net::TcpListener, sync::Mutex};

use super::*;
use crate::fake_api::language;

const TOKEN: &str = "token-ada";

#[derive(Debug, Clone)]
struct Seen {
    route: &'static str,
    authorization: Option<String>,
    body: Value,
}

#[derive(Clone, Default)]
struct StubState {
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl StubState {
    async fn record(&self, route: &'static str, headers: &HeaderMap, body: Value) {
        let authorization = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        self.seen.lock().await.push(Seen {
            route,
            authorization,
            body,
        });
    }

    async fn last(&self, route: &str) -> Seen {
        self.seen
            .lock()
            .await
            .iter()
            .rev()
            .find(|seen| seen.route == route)
            .cloned()
            .expect("route was called")
    }
}

type Reply = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn authorized(headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    let expected = format!("Bearer {TOKEN}");
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "Invalid token" })),
        )),
    }
}

async fn login(State(state): State<StubState>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    state.record("login", &headers, body.clone()).await;
    if body["password"] == "lovelace" {
        Ok(Json(json!({ "token": TOKEN, "username": body["username"] })))
    } else {
        Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Invalid username or password" })),
        ))
    }
}

async fn logout(State(state): State<StubState>, headers: HeaderMap) -> Reply {
    state.record("logout", &headers, Value::Null).await;
    authorized(&headers)?;
    Ok(Json(json!({ "message": "Logged out" })))
}

async fn list(State(state): State<StubState>, headers: HeaderMap) -> Reply {
    state.record("list", &headers, Value::Null).await;
    authorized(&headers)?;
    Ok(Json(json!([language(1, "Go"), language(2, "Rust")])))
}

async fn create(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    state.record("create", &headers, body.clone()).await;
    authorized(&headers)?;
    let mut created = body;
    created["id"] = json!(99);
    Ok(Json(created))
}

async fn delete_many(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    state.record("delete_many", &headers, body).await;
    authorized(&headers)?;
    Ok(Json(json!({ "message": "deleted" })))
}

async fn search(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    state.record("search", &headers, body.clone()).await;
    authorized(&headers)?;
    if body["search_keyword"] == "cobol" {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No programming languages found" })),
        ));
    }
    Ok(Json(json!([language(2, "Rust"), language(1, "Go")])))
}

async fn fetch_one(Path(id): Path<i64>, headers: HeaderMap) -> Reply {
    authorized(&headers)?;
    match id {
        1 => Ok(Json(json!(language(1, "Go")))),
        13 => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "code": "internal", "message": "database offline" })),
        )),
        _ => Err((StatusCode::NOT_FOUND, Json(json!({ "error": "not found" })))),
    }
}

async fn update_one(Path(id): Path<i64>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    authorized(&headers)?;
    let mut updated = body;
    updated["id"] = json!(id);
    Ok(Json(updated))
}

async fn delete_one(Path(_id): Path<i64>, headers: HeaderMap) -> Reply {
    authorized(&headers)?;
    Ok(Json(json!({ "message": "deleted" })))
}

/// Serves the catalogue under `/api` so the client's base-path joining is exercised.
async fn spawn_catalogue_server() -> (String, StubState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = StubState::default();
    let routes = Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route(
            "/programming-languages",
            get(list).post(create).delete(delete_many),
        )
        .route("/programming-languages/search-sort", post(search))
        .route(
            "/programming-languages/:id",
            get(fetch_one).put(update_one).delete(delete_one),
        );
    let app = Router::new().nest("/api", routes).with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/api"), state)
}

async fn client() -> (HttpLanguagesApi, StubState) {
    let (url, state) = spawn_catalogue_server().await;
    let api = HttpLanguagesApi::new(&url, Duration::from_secs(5)).expect("client");
    (api, state)
}

fn token() -> AccessToken {
    AccessToken::new(TOKEN)
}

#[test]
fn base_url_gains_trailing_slash() {
    let api = HttpLanguagesApi::new("http://localhost:3001/api", Duration::from_secs(1))
        .expect("client");
    assert_eq!(api.base_url().as_str(), "http://localhost:3001/api/");

    let api = HttpLanguagesApi::new("http://localhost:3001", Duration::from_secs(1))
        .expect("client");
    assert_eq!(api.base_url().as_str(), "http://localhost:3001/");

    assert!(matches!(
        HttpLanguagesApi::new("not a url", Duration::from_secs(1)),
        Err(ClientError::Config(_))
    ));
}

#[tokio::test]
async fn login_returns_token_and_sends_credentials() {
    let (api, state) = client().await;
    let response = api.login("ada", "lovelace").await.expect("login");
    assert_eq!(response.token, TOKEN);
    assert_eq!(response.username, "ada");

    let seen = state.last("login").await;
    assert_eq!(seen.body, json!({ "username": "ada", "password": "lovelace" }));
    assert!(seen.authorization.is_none());
}

#[tokio::test]
async fn rejected_login_maps_to_invalid_credentials() {
    let (api, _state) = client().await;
    match api.login("ada", "wrong-password").await {
        Err(ClientError::Auth(message)) => assert_eq!(message, "Invalid credentials"),
        other => panic!("expected auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn list_sends_bearer_token() {
    let (api, state) = client().await;
    let items = api.list_languages(&token()).await.expect("list");
    assert_eq!(items, vec![language(1, "Go"), language(2, "Rust")]);
    assert_eq!(
        state.last("list").await.authorization.as_deref(),
        Some("Bearer token-ada")
    );
}

#[tokio::test]
async fn wrong_token_is_an_auth_error_with_server_message() {
    let (api, _state) = client().await;
    match api.list_languages(&AccessToken::new("stale")).await {
        Err(ClientError::Auth(message)) => assert_eq!(message, "Invalid token"),
        other => panic!("expected auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn search_posts_keyword_and_wire_sort_names() {
    let (api, state) = client().await;
    let request =
        SearchSortRequest::new("r", Some(SortKey::ReleaseYear), SortDirection::Descending);
    let items = api.search_languages(&token(), &request).await.expect("search");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].name, "Rust");

    assert_eq!(
        state.last("search").await.body,
        json!({ "search_keyword": "r", "sortBy": "releaseYear", "sortOrder": "desc" })
    );
}

#[tokio::test]
async fn search_not_found_is_an_empty_result() {
    let (api, _state) = client().await;
    let request = SearchSortRequest::new("cobol", None, SortDirection::Ascending);
    let items = api.search_languages(&token(), &request).await.expect("search");
    assert!(items.is_empty());
}

#[tokio::test]
async fn get_language_maps_statuses() {
    let (api, _state) = client().await;
    let found = api.get_language(&token(), LanguageId(1)).await.expect("found");
    assert_eq!(found.name, "Go");

    assert!(matches!(
        api.get_language(&token(), LanguageId(404)).await,
        Err(ClientError::NotFound)
    ));

    match api.get_language(&token(), LanguageId(13)).await {
        Err(ClientError::Network(message)) => assert!(message.contains("database offline")),
        other => panic!("expected network error, got {other:?}"),
    }
}

#[tokio::test]
async fn create_and_update_send_camel_case_drafts() {
    let (api, state) = client().await;
    let draft = language(0, "Zig").draft();

    let created = api.create_language(&token(), &draft).await.expect("create");
    assert_eq!(created.id, LanguageId(99));
    assert_eq!(created.draft(), draft);
    assert_eq!(state.last("create").await.body["releaseYear"], json!(1990));

    let updated = api
        .update_language(&token(), LanguageId(4), &draft)
        .await
        .expect("update");
    assert_eq!(updated.id, LanguageId(4));
    assert_eq!(updated.name, "Zig");
}

#[tokio::test]
async fn bulk_delete_sends_ids_in_body() {
    let (api, state) = client().await;
    api.delete_languages(&token(), &[LanguageId(1), LanguageId(3)])
        .await
        .expect("bulk delete");
    assert_eq!(state.last("delete_many").await.body, json!({ "ids": [1, 3] }));

    api.delete_language(&token(), LanguageId(1))
        .await
        .expect("single delete");
}

#[tokio::test]
async fn empty_bulk_delete_sends_nothing() {
    let (api, state) = client().await;
    api.delete_languages(&token(), &[]).await.expect("no-op");
    assert!(state.seen.lock().await.is_empty());
}

#[tokio::test]
async fn logout_carries_token() {
    let (api, state) = client().await;
    api.logout(&token()).await.expect("logout");
    assert_eq!(
        state.last("logout").await.authorization.as_deref(),
        Some("Bearer token-ada")
    );
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let api = HttpLanguagesApi::new(&format!("http://{addr}"), Duration::from_secs(2))
        .expect("client");
    assert!(matches!(
        api.list_languages(&token()).await,
        Err(ClientError::Network(_))
    ));
}
