use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use flexo_jobs::api::routes::create_router;
use flexo_jobs::store::MemoryStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    create_router().with_state(Arc::new(MemoryStore::new()))
}

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

async fn send_raw(app: &Router, method: Method, uri: &str, body: &str) -> TestResponse {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-user-id", "planner-1")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    TestResponse {
        status,
        headers,
        body,
    }
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
    let raw = body.map(|value| value.to_string()).unwrap_or_default();
    send_raw(app, method, uri, &raw).await
}

async fn get(app: &Router, uri: &str) -> TestResponse {
    send(app, Method::GET, uri, None).await
}

async fn post(app: &Router, uri: &str, body: Value) -> TestResponse {
    send(app, Method::POST, uri, Some(body)).await
}

fn id_of(response: &TestResponse) -> i64 {
    response.body["id"].as_i64().unwrap()
}

fn location(response: &TestResponse) -> &str {
    response.headers[header::LOCATION].to_str().unwrap()
}

fn assert_error_shape(response: &TestResponse, status: StatusCode, path: &str) {
    assert_eq!(response.status, status);
    assert_eq!(response.body["status"], status.as_u16());
    assert_eq!(response.body["error"], status.canonical_reason().unwrap());
    assert_eq!(response.body["path"], path);
    assert!(response.body["timestamp"].is_string());
    assert!(response.body["message"].is_string());
}

fn job_body(number: &str) -> Value {
    json!({
        "jobNumber": number,
        "jobDate": "2025-12-22T10:00:00",
        "jobName": "Yoghurt lid",
        "cylinderWidth": 1320,
        "noteInfo": "Check registration marks"
    })
}

async fn create_job(app: &Router, number: &str) -> i64 {
    let response = post(app, "/jobs", job_body(number)).await;
    assert_eq!(response.status, StatusCode::CREATED);
    id_of(&response)
}

async fn create_spec(app: &Router, base: &str, name: &str) -> i64 {
    let response = post(
        app,
        base,
        json!({ "name": name, "type": "foam", "thicknessMicrometers": 550 }),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);
    id_of(&response)
}

async fn create_cylinder(app: &Router, job_id: i64, nr: i32, tape_spec_id: i64) -> TestResponse {
    post(
        app,
        &format!("/jobs/{}/cylinders", job_id),
        json!({ "cylinderNr": nr, "color": "Cyan", "tapeSpecId": tape_spec_id }),
    )
    .await
}

async fn create_report(app: &Router, cylinder_id: i64, nr: i32, report_spec_id: i64) -> TestResponse {
    post(
        app,
        "/reports",
        json!({
            "reportNr": nr,
            "reportWidth": 320,
            "cylinderId": cylinder_id,
            "reportSpecId": report_spec_id
        }),
    )
    .await
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let response = get(&app, "/health").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "healthy");
}

#[tokio::test]
async fn test_job_lifecycle() {
    let app = app();

    let created = post(&app, "/jobs", job_body("J-100")).await;
    assert_eq!(created.status, StatusCode::CREATED);
    let job_id = id_of(&created);
    assert_eq!(location(&created), format!("/jobs/{}", job_id));
    assert_eq!(created.body["noteInfo"], "Check registration marks");
    assert_eq!(created.body["jobDate"], "2025-12-22T10:00:00");

    let fetched = get(&app, &format!("/jobs/{}", job_id)).await;
    assert_eq!(fetched.status, StatusCode::OK);
    assert_eq!(fetched.body, created.body);

    let updated = send(
        &app,
        Method::PUT,
        &format!("/jobs/{}", job_id),
        Some(json!({ "jobNumber": "J-100b", "jobDate": "2026-01-05T08:30:00" })),
    )
    .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["jobNumber"], "J-100b");
    assert!(updated.body["noteInfo"].is_null());

    let listed = get(&app, "/jobs").await;
    assert_eq!(listed.body.as_array().unwrap().len(), 1);

    let deleted = send(&app, Method::DELETE, &format!("/jobs/{}", job_id), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let missing = get(&app, &format!("/jobs/{}", job_id)).await;
    assert_error_shape(&missing, StatusCode::NOT_FOUND, &format!("/jobs/{}", job_id));
}

#[tokio::test]
async fn test_missing_job_is_not_found() {
    let app = app();
    let response = get(&app, "/jobs/999").await;
    assert_error_shape(&response, StatusCode::NOT_FOUND, "/jobs/999");
    assert_eq!(response.body["message"], "Job not found with id: 999");
    assert!(response.body.get("fieldErrors").is_none());
}

#[tokio::test]
async fn test_validation_errors_carry_field_map() {
    let app = app();
    let response = post(&app, "/jobs", json!({ "jobNumber": "J-1" })).await;

    assert_error_shape(&response, StatusCode::BAD_REQUEST, "/jobs");
    assert_eq!(response.body["fieldErrors"]["jobDate"], "jobDate is required.");

    let listed = get(&app, "/jobs").await;
    assert!(listed.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_requests_use_uniform_shape() {
    let app = app();

    let bad_json = send_raw(&app, Method::POST, "/jobs", "{ not json").await;
    assert_error_shape(&bad_json, StatusCode::BAD_REQUEST, "/jobs");

    let bad_id = get(&app, "/jobs/abc").await;
    assert_error_shape(&bad_id, StatusCode::BAD_REQUEST, "/jobs/abc");

    let unknown = get(&app, "/nowhere").await;
    assert_error_shape(&unknown, StatusCode::NOT_FOUND, "/nowhere");

    let patch = send(&app, Method::PATCH, "/jobs/1", Some(json!({}))).await;
    assert_error_shape(&patch, StatusCode::METHOD_NOT_ALLOWED, "/jobs/1");
    assert_eq!(
        patch.body["message"],
        "Request method PATCH is not supported for /jobs/1"
    );
    assert!(patch.headers.contains_key(header::ALLOW));

    let get_assembly = get(&app, "/jobs/full").await;
    assert_error_shape(&get_assembly, StatusCode::METHOD_NOT_ALLOWED, "/jobs/full");
}

#[tokio::test]
async fn test_cylinders_are_scoped_to_their_job() {
    let app = app();
    let tape = create_spec(&app, "/tape-specs", "Lohmann 5.3").await;
    let job_a = create_job(&app, "J-A").await;
    let job_b = create_job(&app, "J-B").await;

    let created = create_cylinder(&app, job_a, 1, tape).await;
    assert_eq!(created.status, StatusCode::CREATED);
    let cylinder_id = id_of(&created);
    assert_eq!(
        location(&created),
        format!("/jobs/{}/cylinders/{}", job_a, cylinder_id)
    );
    assert_eq!(created.body["jobId"], job_a);

    let duplicate = create_cylinder(&app, job_a, 1, tape).await;
    assert_error_shape(
        &duplicate,
        StatusCode::BAD_REQUEST,
        &format!("/jobs/{}/cylinders", job_a),
    );
    assert_eq!(
        duplicate.body["message"],
        "Cylinder number 1 already exists within this job."
    );

    // The same number is free in another job.
    assert_eq!(create_cylinder(&app, job_b, 1, tape).await.status, StatusCode::CREATED);

    let wrong_job = get(&app, &format!("/jobs/{}/cylinders/{}", job_b, cylinder_id)).await;
    assert_eq!(wrong_job.status, StatusCode::NOT_FOUND);

    let listed = get(&app, &format!("/jobs/{}/cylinders", job_a)).await;
    assert_eq!(listed.body.as_array().unwrap().len(), 1);

    let unknown_job = get(&app, "/jobs/4242/cylinders").await;
    assert_eq!(unknown_job.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cylinder_with_unknown_tape_spec_is_not_found() {
    let app = app();
    let job = create_job(&app, "J-1").await;

    let response = create_cylinder(&app, job, 1, 777).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "TapeSpec not found with id: 777");
}

#[tokio::test]
async fn test_reports_by_cylinder() {
    let app = app();
    let tape = create_spec(&app, "/tape-specs", "Lohmann 5.3").await;
    let plate = create_spec(&app, "/report-specs", "Cyrel DPR").await;
    let job = create_job(&app, "J-1").await;
    let first = id_of(&create_cylinder(&app, job, 1, tape).await);
    let second = id_of(&create_cylinder(&app, job, 2, tape).await);

    let report = create_report(&app, first, 1, plate).await;
    assert_eq!(report.status, StatusCode::CREATED);
    let report_id = id_of(&report);
    assert_eq!(location(&report), format!("/reports/{}", report_id));

    // Report numbers repeat freely across cylinders but not within one.
    assert_eq!(create_report(&app, second, 1, plate).await.status, StatusCode::CREATED);
    let duplicate = create_report(&app, first, 1, plate).await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        duplicate.body["message"],
        "Report number 1 already exists within this cylinder."
    );

    let listed = get(&app, &format!("/reports?cylinderId={}", first)).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.body.as_array().unwrap().len(), 1);

    let no_query = get(&app, "/reports").await;
    assert_error_shape(&no_query, StatusCode::BAD_REQUEST, "/reports");

    let deleted = send(&app, Method::DELETE, &format!("/reports/{}", report_id), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    let listed = get(&app, &format!("/reports?cylinderId={}", first)).await;
    assert!(listed.body.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_job_delete_cascades() {
    let app = app();
    let tape = create_spec(&app, "/tape-specs", "Lohmann 5.3").await;
    let plate = create_spec(&app, "/report-specs", "Cyrel DPR").await;
    let job = create_job(&app, "J-1").await;
    let cylinder = id_of(&create_cylinder(&app, job, 1, tape).await);
    let report = id_of(&create_report(&app, cylinder, 1, plate).await);

    let deleted = send(&app, Method::DELETE, &format!("/jobs/{}", job), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    assert_eq!(get(&app, &format!("/reports/{}", report)).await.status, StatusCode::NOT_FOUND);
    assert_eq!(
        get(&app, &format!("/reports?cylinderId={}", cylinder)).await.status,
        StatusCode::NOT_FOUND
    );

    // Specs survive and are free to delete now.
    let tape_deleted = send(&app, Method::DELETE, &format!("/tape-specs/{}", tape), None).await;
    assert_eq!(tape_deleted.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_referenced_spec_cannot_be_deleted() {
    let app = app();
    let tape = create_spec(&app, "/tape-specs", "Lohmann 5.3").await;
    let job = create_job(&app, "J-1").await;
    create_cylinder(&app, job, 1, tape).await;

    let uri = format!("/tape-specs/{}", tape);
    let response = send(&app, Method::DELETE, &uri, None).await;
    assert_error_shape(&response, StatusCode::CONFLICT, &uri);

    assert_eq!(get(&app, &uri).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_spec_catalog_crud() {
    let app = app();
    let created = post(&app, "/report-specs", json!({ "name": "Cyrel DPR", "type": "plate" })).await;
    assert_eq!(created.status, StatusCode::CREATED);
    let id = id_of(&created);
    assert_eq!(location(&created), format!("/report-specs/{}", id));
    assert_eq!(created.body["type"], "plate");

    let updated = send(
        &app,
        Method::PUT,
        &format!("/report-specs/{}", id),
        Some(json!({ "name": "Cyrel DPR 1.14", "thicknessMicrometers": 1140 })),
    )
    .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.body["name"], "Cyrel DPR 1.14");
    assert!(updated.body["type"].is_null());

    // The two catalogs do not share entries.
    assert!(get(&app, "/tape-specs").await.body.as_array().unwrap().is_empty());

    let blank = post(&app, "/tape-specs", json!({ "name": "  " })).await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert!(blank.body["fieldErrors"]["name"].is_string());
}

#[tokio::test]
async fn test_assembly_provisions_missing_specs() {
    let app = app();
    let response = post(
        &app,
        "/jobs/full",
        json!({
            "job": { "jobNumber": "J-FULL", "jobDate": "2025-12-22T10:00:00" },
            "cylinders": [
                {
                    "cylinderNr": 1,
                    "color": "Cyan",
                    "reports": [
                        { "reportNr": 1, "reportWidth": 320 },
                        { "reportNr": 2, "reportWidth": 320, "reportSpecId": 9999 }
                    ]
                },
                { "cylinderNr": 2, "color": "Magenta", "tapeSpecId": null }
            ]
        }),
    )
    .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let job_id = id_of(&response);
    assert_eq!(location(&response), format!("/jobs/{}", job_id));

    let cylinders = get(&app, &format!("/jobs/{}/cylinders", job_id)).await;
    assert_eq!(cylinders.body.as_array().unwrap().len(), 2);
    assert_eq!(get(&app, "/tape-specs").await.body.as_array().unwrap().len(), 2);
    assert_eq!(get(&app, "/report-specs").await.body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_assembly_is_all_or_nothing() {
    let app = app();
    let tape = create_spec(&app, "/tape-specs", "Lohmann 5.3").await;

    let response = post(
        &app,
        "/jobs/full",
        json!({
            "job": { "jobNumber": "J-DUP", "jobDate": "2025-12-22T10:00:00" },
            "cylinders": [
                { "cylinderNr": 1, "tapeSpecId": tape },
                { "cylinderNr": 1, "tapeSpecId": tape }
            ]
        }),
    )
    .await;

    assert_error_shape(&response, StatusCode::BAD_REQUEST, "/jobs/full");
    assert!(get(&app, "/jobs").await.body.as_array().unwrap().is_empty());
    assert_eq!(get(&app, "/tape-specs").await.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_assembly_requires_job() {
    let app = app();

    let missing = post(&app, "/jobs/full", json!({ "cylinders": [] })).await;
    assert_error_shape(&missing, StatusCode::BAD_REQUEST, "/jobs/full");
    assert_eq!(missing.body["message"], "job is required.");

    let bad_date = post(
        &app,
        "/jobs/full",
        json!({ "job": { "jobDate": "22.12.2025" } }),
    )
    .await;
    assert_eq!(bad_date.status, StatusCode::BAD_REQUEST);
    assert!(bad_date.body["message"].as_str().unwrap().contains("22.12.2025"));
}

#[tokio::test]
async fn test_assembly_treats_non_numeric_spec_ids_as_missing() {
    let app = app();
    let response = post(
        &app,
        "/jobs/full",
        json!({
            "job": { "jobDate": "2025-12-22T10:00:00" },
            "cylinders": [{
                "cylinderNr": 1,
                "tapeSpecId": "abc",
                "reports": [{ "reportNr": 1, "reportSpecId": "" }]
            }]
        }),
    )
    .await;

    assert_eq!(response.status, StatusCode::CREATED);
    let tapes = get(&app, "/tape-specs").await;
    assert_eq!(tapes.body.as_array().unwrap().len(), 1);
    assert_eq!(
        tapes.body[0]["name"],
        "Auto-generated TapeSpec for cylinder 1"
    );
    assert_eq!(get(&app, "/report-specs").await.body.as_array().unwrap().len(), 1);
}
