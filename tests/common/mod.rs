#![allow(dead_code)]

//! In-process stand-in for the Power BI REST API plus a blob folder on disk.

use anyhow::Result;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use pushsync::storage::FilesystemStorage;
use pushsync::sync::RetryPolicy;
use pushsync::SyncEngine;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const TOKEN: &str = "test-token";
pub const WORKSPACE: &str = "ws-1";
pub const CONTAINER: &str = "tableau-datasources";
pub const FOLDER: &str = "raju";
pub const TEMPLATE_CONTAINER: &str = "templates";
pub const TEMPLATE_BLOB: &str = "empty.pbix";

/// One request the stub received.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub body: Value,
}

#[derive(Debug, Default)]
pub struct StubDataset {
    pub name: String,
    /// Declared columns per table; `None` for imported datasets, which accept any shape.
    pub schema: Option<HashMap<String, Vec<String>>>,
    pub rows: HashMap<String, Vec<Value>>,
    pub listed: bool,
}

#[derive(Debug, Default)]
pub struct StubState {
    pub calls: Vec<RecordedCall>,
    pub datasets: HashMap<String, StubDataset>,
    /// Status returned by dataset creation instead of creating one.
    pub fail_create: Option<u16>,
    /// Whether imported datasets show up in the listing.
    pub hide_imports: bool,
    /// Status returned by row deletion instead of clearing.
    pub fail_delete: Option<u16>,
    /// 1-based index of the rows POST that is rejected with 400.
    pub fail_post_batch: Option<usize>,
    posts: usize,
    next_id: usize,
}

impl StubState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

#[derive(Clone, Default)]
pub struct PowerBiStub {
    pub state: Arc<Mutex<StubState>>,
}

type Shared = State<PowerBiStub>;

impl PowerBiStub {
    /// Serve the stub on an ephemeral port; returns its API base URL.
    pub async fn start(&self) -> Result<String> {
        let router = Router::new()
            .route(
                "/groups/{ws}/datasets",
                post(create_dataset).get(list_datasets),
            )
            .route("/groups/{ws}/imports", post(import_pbix))
            .route(
                "/groups/{ws}/datasets/{ds}/tables/{table}/rows",
                post(post_rows).delete(delete_rows),
            )
            .route("/groups/{ws}/reports/{report}/Clone", post(clone_report))
            .route("/groups/{ws}/reports/{report}/Rebind", post(rebind_report))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(format!("http://{}", addr))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn calls_matching(&self, method: Method, path_suffix: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method && c.path.ends_with(path_suffix))
            .collect()
    }

    /// Rows currently stored for a table of the dataset called `name`.
    pub fn rows(&self, dataset_name: &str, table: &str) -> Vec<Value> {
        let state = self.state.lock().unwrap();
        state
            .datasets
            .values()
            .find(|d| d.name == dataset_name)
            .and_then(|d| d.rows.get(table).cloned())
            .unwrap_or_default()
    }

    fn record(&self, method: Method, path: String, body: Value) {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(RecordedCall { method, path, body });
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TOKEN))
        .unwrap_or(false)
}

fn reject(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": {"code": "Stub", "message": message}}))).into_response()
}

async fn create_dataset(
    State(stub): Shared,
    Path(ws): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    stub.record(Method::POST, format!("/groups/{}/datasets", ws), body.clone());
    if !authorized(&headers) {
        return reject(StatusCode::UNAUTHORIZED, "bad token");
    }

    let mut state = stub.state.lock().unwrap();
    if let Some(status) = state.fail_create {
        let status = StatusCode::from_u16(status).unwrap();
        return reject(status, "dataset creation refused");
    }

    if body["defaultMode"] != "Push" {
        return reject(StatusCode::BAD_REQUEST, "defaultMode must be Push");
    }

    let mut schema = HashMap::new();
    let tables = body["tables"].as_array().cloned().unwrap_or_default();
    if tables.is_empty() {
        return reject(StatusCode::BAD_REQUEST, "no tables");
    }
    for table in tables {
        let columns = table["columns"].as_array().cloned().unwrap_or_default();
        if columns.is_empty() {
            return reject(StatusCode::BAD_REQUEST, "table without columns");
        }
        let mut names = Vec::new();
        for column in columns {
            if column["dataType"] != "string" {
                return reject(StatusCode::BAD_REQUEST, "unsupported dataType");
            }
            names.push(column["name"].as_str().unwrap_or_default().to_string());
        }
        schema.insert(table["name"].as_str().unwrap_or_default().to_string(), names);
    }

    let id = state.next_id("ds");
    state.datasets.insert(
        id.clone(),
        StubDataset {
            name: body["name"].as_str().unwrap_or_default().to_string(),
            schema: Some(schema),
            rows: HashMap::new(),
            listed: true,
        },
    );

    (StatusCode::CREATED, Json(json!({"id": id, "name": body["name"]}))).into_response()
}

async fn list_datasets(State(stub): Shared, Path(ws): Path<String>, headers: HeaderMap) -> Response {
    stub.record(Method::GET, format!("/groups/{}/datasets", ws), Value::Null);
    if !authorized(&headers) {
        return reject(StatusCode::UNAUTHORIZED, "bad token");
    }

    let state = stub.state.lock().unwrap();
    let value: Vec<Value> = state
        .datasets
        .iter()
        .filter(|(_, d)| d.listed)
        .map(|(id, d)| json!({"id": id, "name": d.name}))
        .collect();
    Json(json!({ "value": value })).into_response()
}

async fn import_pbix(
    State(stub): Shared,
    Path(ws): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    stub.record(
        Method::POST,
        format!("/groups/{}/imports", ws),
        json!({"query": query, "size": body.len()}),
    );
    if !authorized(&headers) {
        return reject(StatusCode::UNAUTHORIZED, "bad token");
    }

    let Some(name) = query.get("datasetDisplayName").cloned() else {
        return reject(StatusCode::BAD_REQUEST, "datasetDisplayName missing");
    };

    let mut state = stub.state.lock().unwrap();
    let listed = !state.hide_imports;
    // CreateOrOverwrite keeps the existing dataset id
    let existing = state
        .datasets
        .iter()
        .find(|(_, d)| d.name == name)
        .map(|(id, _)| id.clone());
    if existing.is_none() {
        let id = state.next_id("ds");
        state.datasets.insert(
            id,
            StubDataset {
                name,
                schema: None,
                rows: HashMap::new(),
                listed,
            },
        );
    }
    let import_id = state.next_id("import");

    (StatusCode::ACCEPTED, Json(json!({ "id": import_id }))).into_response()
}

async fn delete_rows(
    State(stub): Shared,
    Path((ws, ds, table)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    stub.record(
        Method::DELETE,
        format!("/groups/{}/datasets/{}/tables/{}/rows", ws, ds, table),
        Value::Null,
    );
    if !authorized(&headers) {
        return reject(StatusCode::UNAUTHORIZED, "bad token");
    }

    let mut state = stub.state.lock().unwrap();
    if let Some(status) = state.fail_delete {
        return reject(StatusCode::from_u16(status).unwrap(), "delete refused");
    }
    match state.datasets.get_mut(&ds) {
        Some(dataset) => {
            dataset.rows.remove(&table);
            StatusCode::OK.into_response()
        }
        None => reject(StatusCode::NOT_FOUND, "dataset not found"),
    }
}

async fn post_rows(
    State(stub): Shared,
    Path((ws, ds, table)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let rows = body["rows"].as_array().cloned().unwrap_or_default();
    stub.record(
        Method::POST,
        format!("/groups/{}/datasets/{}/tables/{}/rows", ws, ds, table),
        json!({ "row_count": rows.len() }),
    );
    if !authorized(&headers) {
        return reject(StatusCode::UNAUTHORIZED, "bad token");
    }
    if rows.len() > 10_000 {
        return reject(StatusCode::BAD_REQUEST, "too many rows in one request");
    }

    let mut state = stub.state.lock().unwrap();
    state.posts += 1;
    if state.fail_post_batch == Some(state.posts) {
        return reject(StatusCode::BAD_REQUEST, "row batch refused");
    }
    let Some(dataset) = state.datasets.get_mut(&ds) else {
        return reject(StatusCode::NOT_FOUND, "dataset not found");
    };

    if let Some(schema) = &dataset.schema {
        let Some(columns) = schema.get(&table) else {
            return reject(StatusCode::NOT_FOUND, "table not found");
        };
        for row in &rows {
            let Some(object) = row.as_object() else {
                return reject(StatusCode::BAD_REQUEST, "row is not an object");
            };
            for (key, value) in object {
                if !columns.contains(key) {
                    return reject(StatusCode::BAD_REQUEST, "unknown column");
                }
                if !(value.is_string() || value.is_null()) {
                    return reject(StatusCode::BAD_REQUEST, "string column got non-string");
                }
            }
        }
    }

    dataset.rows.entry(table).or_default().extend(rows);
    StatusCode::OK.into_response()
}

async fn clone_report(
    State(stub): Shared,
    Path((ws, report)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    stub.record(
        Method::POST,
        format!("/groups/{}/reports/{}/Clone", ws, report),
        body.clone(),
    );
    if !authorized(&headers) {
        return reject(StatusCode::UNAUTHORIZED, "bad token");
    }
    for field in ["name", "targetWorkspaceId", "targetModelId"] {
        if !body[field].is_string() {
            return reject(StatusCode::BAD_REQUEST, "clone body incomplete");
        }
    }

    let id = stub.state.lock().unwrap().next_id("report");
    Json(json!({ "id": id, "name": body["name"] })).into_response()
}

async fn rebind_report(
    State(stub): Shared,
    Path((ws, report)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    stub.record(
        Method::POST,
        format!("/groups/{}/reports/{}/Rebind", ws, report),
        body,
    );
    if !authorized(&headers) {
        return reject(StatusCode::UNAUTHORIZED, "bad token");
    }
    StatusCode::OK.into_response()
}

/// Blob containers laid out on disk for [`FilesystemStorage`].
pub struct BlobFixture {
    pub dir: TempDir,
}

impl BlobFixture {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        std::fs::create_dir_all(dir.path().join(CONTAINER).join(FOLDER))?;
        std::fs::create_dir_all(dir.path().join(TEMPLATE_CONTAINER))?;
        std::fs::write(
            dir.path().join(TEMPLATE_CONTAINER).join(TEMPLATE_BLOB),
            b"PK\x03\x04 not really a pbix",
        )?;
        Ok(Self { dir })
    }

    /// Write `contents` to `{CONTAINER}/{FOLDER}/{name}`.
    pub fn put(&self, name: &str, contents: &[u8]) -> Result<()> {
        std::fs::write(
            self.dir.path().join(CONTAINER).join(FOLDER).join(name),
            contents,
        )?;
        Ok(())
    }

    pub fn storage(&self) -> Arc<FilesystemStorage> {
        Arc::new(FilesystemStorage::new(self.dir.path()))
    }
}

/// CSV with `id,amount` and `rows` data rows.
pub fn sales_csv(rows: usize) -> Vec<u8> {
    let mut csv = String::from("id,amount\n");
    for i in 0..rows {
        csv.push_str(&format!("{},{}.5\n", i, i));
    }
    csv.into_bytes()
}

/// Engine wired to the stub and the fixture with a fast poll.
pub fn engine_builder(api_base: &str, blobs: &BlobFixture) -> pushsync::SyncEngineBuilder {
    SyncEngine::builder()
        .storage(blobs.storage())
        .http_client(
            reqwest::Client::builder()
                .no_proxy()
                .build()
                .expect("http client"),
        )
        .api_base(api_base)
        .retry_policy(RetryPolicy::new(
            3,
            Duration::from_millis(5),
            Duration::ZERO,
        ))
        .template_pbix(TEMPLATE_CONTAINER, TEMPLATE_BLOB)
        .default_container(CONTAINER)
        .default_folder(FOLDER)
}
