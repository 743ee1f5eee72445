use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::{net::TcpListener, sync::RwLock};

/// Header the create endpoint requires.
pub const ACCESS_TOKEN_HEADER: &str = "access-token";

/// Token accepted for reads but refused for writes.
pub const READ_ONLY_TOKEN: &str = "read-only";

/// Stored item, in the service's own wire format: prices are decimal
/// strings and `created` is epoch milliseconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: u64,
    pub name: String,
    pub price: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created: i64,
}

#[derive(Deserialize)]
pub struct CreateItem {
    pub name: String,
    pub price: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub tag: Option<String>,
}

#[derive(Default)]
pub struct Store {
    next_id: AtomicU64,
    items: RwLock<HashMap<u64, Item>>,
}

pub type Db = Arc<Store>;

pub fn app() -> Router {
    let db: Db = Arc::new(Store::default());
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/{id}", get(get_item).delete(delete_item))
        .route("/status/{code}", get(echo_status))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Entity tag served for an item, matched against `If-None-Match`.
pub fn etag(id: u64) -> String {
    format!("item-{id}")
}

fn error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

async fn list_items(State(db): State<Db>, Query(query): Query<ListQuery>) -> Json<Vec<Item>> {
    let items = db.items.read().await;
    let mut listed: Vec<Item> = items
        .values()
        .filter(|item| query.tag.as_ref().map_or(true, |tag| item.tags.contains(tag)))
        .cloned()
        .collect();
    listed.sort_by_key(|item| item.id);
    Json(listed)
}

async fn create_item(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<CreateItem>,
) -> Response {
    match headers.get(ACCESS_TOKEN_HEADER).and_then(|v| v.to_str().ok()) {
        None => return error(StatusCode::UNAUTHORIZED, "missing access token"),
        Some(READ_ONLY_TOKEN) => return error(StatusCode::FORBIDDEN, "token cannot create items"),
        Some(_) => {}
    }
    if input.name.trim().is_empty() {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "name must not be empty");
    }
    let item = Item {
        id: db.next_id.fetch_add(1, Ordering::Relaxed) + 1,
        name: input.name,
        price: input.price,
        tags: input.tags,
        created: now_millis(),
    };
    tracing::debug!(id = item.id, "created item");
    db.items.write().await.insert(item.id, item.clone());
    (StatusCode::CREATED, Json(item)).into_response()
}

async fn get_item(State(db): State<Db>, Path(id): Path<u64>, headers: HeaderMap) -> Response {
    let items = db.items.read().await;
    let Some(item) = items.get(&id) else {
        return error(StatusCode::NOT_FOUND, "no such item");
    };
    let tag = etag(id);
    let matches = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == tag);
    if matches {
        return StatusCode::NOT_MODIFIED.into_response();
    }
    ([(header::ETAG, tag)], Json(item.clone())).into_response()
}

async fn delete_item(State(db): State<Db>, Path(id): Path<u64>) -> StatusCode {
    let mut items = db.items.write().await;
    match items.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

/// Answer with the requested status, for exercising status dispatch.
async fn echo_status(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) if status == StatusCode::NOT_MODIFIED => status.into_response(),
        Ok(status) => (status, Json(json!({ "status": code }))).into_response(),
        Err(_) => error(StatusCode::BAD_REQUEST, "invalid status code"),
    }
}
