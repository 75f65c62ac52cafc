mod common;

use anyhow::Result;
use axum::response::Response;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use common::{BlobFixture, PowerBiStub, TOKEN, WORKSPACE};
use pushsync::http::app_server::{AppServer, PATH_HEALTH};
use serde_json::{json, Value};
use tower::util::ServiceExt;

struct TestApp {
    router: Router,
    stub: PowerBiStub,
    blobs: BlobFixture,
}

async fn setup_test(
    configure: impl FnOnce(pushsync::SyncEngineBuilder) -> pushsync::SyncEngineBuilder,
) -> Result<TestApp> {
    let stub = PowerBiStub::default();
    let api_base = stub.start().await?;
    let blobs = BlobFixture::new()?;

    let engine = configure(common::engine_builder(&api_base, &blobs)).build()?;
    let app = AppServer::new(engine);

    Ok(TestApp {
        router: app.router,
        stub,
        blobs,
    })
}

async fn post_json(router: &Router, uri: &str, token: Option<&str>, body: Value) -> Result<Response> {
    let mut request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        request = request.header("authorization", format!("Bearer {}", token));
    }

    Ok(router
        .clone()
        .oneshot(request.body(Body::from(serde_json::to_vec(&body)?))?)
        .await?)
}

async fn json_body(response: Response) -> Result<Value> {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&body)?)
}

fn auto_upload_uri() -> String {
    format!("/workspaces/{}/auto-upload", WORKSPACE)
}

fn folder_migrate_uri() -> String {
    format!("/workspaces/{}/folder-migrate", WORKSPACE)
}

#[tokio::test]
async fn test_health_endpoint() -> Result<()> {
    let app = setup_test(|b| b).await?;

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri(PATH_HEALTH).body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await?;
    assert_eq!(json, json!({"status": "ok", "service": "pushsync"}));

    Ok(())
}

#[tokio::test]
async fn test_folder_migrate_pushes_12000_rows_in_two_batches() -> Result<()> {
    let app = setup_test(|b| b).await?;
    app.blobs.put("fact_sales.csv", &common::sales_csv(12_000))?;

    let response = post_json(
        &app.router,
        &folder_migrate_uri(),
        Some(TOKEN),
        json!({"report_name": "Sales"}),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await?;
    assert_eq!(json["success"], true);
    assert_eq!(json["workspaceId"], WORKSPACE);
    assert_eq!(json["reportName"], "Sales");
    assert_eq!(json["folder"], "raju");
    assert_eq!(json["synced_tables"], json!(["fact_sales"]));
    assert!(json.get("reportId").is_none());

    let dataset_id = json["datasetId"].as_str().unwrap();
    let rows_suffix = format!("/datasets/{}/tables/fact_sales/rows", dataset_id);

    let deletes = app.stub.calls_matching(Method::DELETE, &rows_suffix);
    assert_eq!(deletes.len(), 1);

    let posts = app.stub.calls_matching(Method::POST, &rows_suffix);
    let sizes: Vec<_> = posts.iter().map(|c| c.body["row_count"].clone()).collect();
    assert_eq!(sizes, vec![json!(10_000), json!(2_000)]);

    // Delete precedes every push
    let calls = app.stub.calls();
    let delete_at = calls
        .iter()
        .position(|c| c.method == Method::DELETE)
        .unwrap();
    let first_post_at = calls
        .iter()
        .position(|c| c.method == Method::POST && c.path.ends_with(&rows_suffix))
        .unwrap();
    assert!(delete_at < first_post_at);

    let rows = app.stub.rows("Sales", "fact_sales");
    assert_eq!(rows.len(), 12_000);
    assert_eq!(rows[0], json!({"id": "0", "amount": "0.5"}));
    assert_eq!(rows[11_999], json!({"id": "11999", "amount": "11999.5"}));

    Ok(())
}

#[tokio::test]
async fn test_missing_token_returns_401_without_outbound_calls() -> Result<()> {
    let app = setup_test(|b| b).await?;
    app.blobs.put("fact_sales.csv", &common::sales_csv(3))?;

    for uri in [auto_upload_uri(), folder_migrate_uri()] {
        let response = post_json(&app.router, &uri, None, json!({"report_name": "Sales"})).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = json_body(response).await?;
        assert_eq!(json["detail"], "Not logged in");
    }

    assert!(app.stub.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_vendor_rejection_is_relayed_without_row_pushes() -> Result<()> {
    let app = setup_test(|b| b).await?;
    app.blobs.put("fact_sales.csv", &common::sales_csv(3))?;
    app.stub.state.lock().unwrap().fail_create = Some(403);

    let response = post_json(
        &app.router,
        &folder_migrate_uri(),
        Some(TOKEN),
        json!({"report_name": "Sales"}),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = json_body(response).await?;
    assert!(json["detail"]
        .as_str()
        .unwrap()
        .contains("dataset creation refused"));

    assert!(app
        .stub
        .calls()
        .iter()
        .all(|c| !c.path.ends_with("/rows")));
    Ok(())
}

#[tokio::test]
async fn test_auto_upload_imports_template_and_pushes_rows() -> Result<()> {
    let app = setup_test(|b| b).await?;
    app.blobs.put("fact_sales.csv", &common::sales_csv(5))?;
    app.blobs.put("Dim Region.csv", b"region,code\nNorth,1\nSouth,\n")?;
    app.blobs.put("notes.txt", b"ignored")?;

    let response = post_json(
        &app.router,
        &auto_upload_uri(),
        Some(TOKEN),
        json!({"report_name": "Quarterly"}),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await?;
    assert_eq!(json["message"], "Migration completed successfully");
    assert_eq!(json["synced_tables"], json!(["Dim_Region", "fact_sales"]));
    assert!(json["dataset_id"].as_str().unwrap().starts_with("ds-"));

    let imports = app.stub.calls_matching(Method::POST, "/imports");
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].body["query"]["datasetDisplayName"], "Quarterly");
    assert_eq!(
        imports[0].body["query"]["nameConflict"],
        "CreateOrOverwrite"
    );

    // Imported tables keep native JSON types
    let rows = app.stub.rows("Quarterly", "fact_sales");
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[1], json!({"id": 1, "amount": 1.5}));

    let regions = app.stub.rows("Quarterly", "Dim_Region");
    assert_eq!(
        regions,
        vec![
            json!({"region": "North", "code": 1}),
            json!({"region": "South", "code": null}),
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_auto_upload_poll_exhaustion_returns_404() -> Result<()> {
    let app = setup_test(|b| b).await?;
    app.blobs.put("fact_sales.csv", &common::sales_csv(3))?;
    app.stub.state.lock().unwrap().hide_imports = true;

    let response = post_json(
        &app.router,
        &auto_upload_uri(),
        Some(TOKEN),
        json!({"report_name": "Quarterly"}),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await?;
    assert!(json["detail"]
        .as_str()
        .unwrap()
        .starts_with("Dataset not found"));

    // Three polls, no pushes
    assert_eq!(
        app.stub
            .calls_matching(Method::GET, &format!("/groups/{}/datasets", WORKSPACE))
            .len(),
        3
    );
    assert!(app.stub.calls().iter().all(|c| !c.path.ends_with("/rows")));
    Ok(())
}

#[tokio::test]
async fn test_auto_upload_requires_report_name() -> Result<()> {
    let app = setup_test(|b| b).await?;

    for body in [json!({}), json!({"report_name": "  "})] {
        let response = post_json(&app.router, &auto_upload_uri(), Some(TOKEN), body).await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await?;
        assert_eq!(json["detail"], "Report name missing");
    }

    assert!(app.stub.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_malformed_json_is_400() -> Result<()> {
    let app = setup_test(|b| b).await?;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(auto_upload_uri())
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {}", TOKEN))
                .body(Body::from("{not json"))?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await?;
    assert_eq!(json["code"], "BAD_REQUEST");
    Ok(())
}

#[tokio::test]
async fn test_empty_folder_returns_404() -> Result<()> {
    let app = setup_test(|b| b).await?;

    let response = post_json(
        &app.router,
        &folder_migrate_uri(),
        Some(TOKEN),
        json!({"report_name": "Sales"}),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await?;
    assert!(json["detail"]
        .as_str()
        .unwrap()
        .starts_with("No data files found"));
    assert!(app.stub.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_auto_upload_empty_folder_creates_nothing() -> Result<()> {
    let app = setup_test(|b| b).await?;
    app.blobs.put("notes.txt", b"not a data file")?;

    let response = post_json(
        &app.router,
        &auto_upload_uri(),
        Some(TOKEN),
        json!({"report_name": "Quarterly"}),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await?;
    assert!(json["detail"]
        .as_str()
        .unwrap()
        .starts_with("No data files found"));
    // No template import, no dataset
    assert!(app.stub.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_rejected_batch_names_table_and_batch() -> Result<()> {
    let app = setup_test(|b| b).await?;
    app.blobs.put("fact_sales.csv", &common::sales_csv(12_000))?;
    app.stub.state.lock().unwrap().fail_post_batch = Some(2);

    let response = post_json(
        &app.router,
        &folder_migrate_uri(),
        Some(TOKEN),
        json!({"report_name": "Sales"}),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await?;
    let detail = json["detail"].as_str().unwrap();
    assert!(detail.contains("fact_sales"), "{}", detail);
    assert!(detail.contains("batch 2 of 2"), "{}", detail);
    assert!(detail.contains("row batch refused"), "{}", detail);

    // The first batch landed before the rejection
    assert_eq!(app.stub.rows("Sales", "fact_sales").len(), 10_000);
    Ok(())
}

#[tokio::test]
async fn test_folder_migrate_reads_excel_workbook() -> Result<()> {
    let app = setup_test(|b| b).await?;
    app.blobs
        .put("regions.xlsx", include_bytes!("fixtures/regions.xlsx"))?;

    let response = post_json(
        &app.router,
        &folder_migrate_uri(),
        Some(TOKEN),
        json!({"report_name": "Regions"}),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await?;
    assert_eq!(json["synced_tables"], json!(["regions"]));

    let created = app
        .stub
        .calls_matching(Method::POST, &format!("/groups/{}/datasets", WORKSPACE));
    let columns: Vec<_> = created[0].body["tables"][0]["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].clone())
        .collect();
    assert_eq!(
        columns,
        vec![
            json!("region"),
            json!("code"),
            json!("opened"),
            json!("active"),
            json!("ratio")
        ]
    );

    let rows = app.stub.rows("Regions", "regions");
    assert_eq!(
        rows,
        vec![
            json!({
                "region": "North",
                "code": "1",
                "opened": "2023-07-16T12:00:00",
                "active": "True",
                "ratio": "0.25"
            }),
            json!({
                "region": "South",
                "code": null,
                "opened": null,
                "active": "False",
                "ratio": null
            }),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_resync_replaces_rows() -> Result<()> {
    let app = setup_test(|b| b).await?;
    app.blobs.put("fact_sales.csv", &common::sales_csv(4))?;

    for _ in 0..2 {
        let response = post_json(
            &app.router,
            &auto_upload_uri(),
            Some(TOKEN),
            json!({"report_name": "Quarterly"}),
        )
        .await?;
        assert_eq!(response.status(), StatusCode::OK);
    }

    // Same dataset overwritten, rows replaced rather than appended
    assert_eq!(app.stub.rows("Quarterly", "fact_sales").len(), 4);
    Ok(())
}

#[tokio::test]
async fn test_folder_migrate_clones_template_report() -> Result<()> {
    let app = setup_test(|b| b.template_report("tmpl-ws", "tmpl-report")).await?;
    app.blobs.put("fact_sales.csv", &common::sales_csv(2))?;

    let response = post_json(
        &app.router,
        &folder_migrate_uri(),
        Some(TOKEN),
        json!({"report_name": "Sales"}),
    )
    .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await?;
    let report_id = json["reportId"].as_str().unwrap().to_string();
    let dataset_id = json["datasetId"].as_str().unwrap();

    let clones = app
        .stub
        .calls_matching(Method::POST, "/groups/tmpl-ws/reports/tmpl-report/Clone");
    assert_eq!(clones.len(), 1);
    assert_eq!(
        clones[0].body,
        json!({
            "name": "Sales",
            "targetWorkspaceId": WORKSPACE,
            "targetModelId": dataset_id,
        })
    );

    let rebinds = app.stub.calls_matching(
        Method::POST,
        &format!("/groups/{}/reports/{}/Rebind", WORKSPACE, report_id),
    );
    assert_eq!(rebinds.len(), 1);
    assert_eq!(rebinds[0].body, json!({"datasetId": dataset_id}));
    Ok(())
}

#[tokio::test]
async fn test_folder_migrate_without_body_uses_configured_name() -> Result<()> {
    let app = setup_test(|b| b.dataset_name("Configured")).await?;
    app.blobs.put("fact_sales.csv", &common::sales_csv(1))?;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(folder_migrate_uri())
                .header("authorization", format!("Bearer {}", TOKEN))
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await?;
    assert_eq!(json["reportName"], "Configured");
    assert_eq!(app.stub.rows("Configured", "fact_sales").len(), 1);
    Ok(())
}
