use flexo_jobs::api::routes::create_router;
use flexo_jobs::store::MemoryStore;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;

// Test client wrapper for making API calls
struct TestClient {
    client: Client,
    base_url: String,
}

impl TestClient {
    /// Start the service on an ephemeral port backed by a fresh in-memory store.
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        let app = create_router().with_state(Arc::new(MemoryStore::new()));

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            client: Client::new(),
            base_url: format!("http://{}", address),
        }
    }

    async fn post(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(&format!("{}{}", self.base_url, path))
            .header("X-User-Id", "integration")
            .json(&json)
            .send()
            .await
    }

    async fn put(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.client
            .put(&format!("{}{}", self.base_url, path))
            .header("X-User-Id", "integration")
            .json(&json)
            .send()
            .await
    }

    async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .get(&format!("{}{}", self.base_url, path))
            .send()
            .await
    }

    async fn delete(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .delete(&format!("{}{}", self.base_url, path))
            .header("X-User-Id", "integration")
            .send()
            .await
    }
}

#[tokio::test]
async fn test_print_job_workflow() {
    let client = TestClient::start().await;

    // Catalog entries
    let tape: Value = client
        .post(
            "/tape-specs",
            json!({ "name": "Lohmann DuploFLEX 5.3", "type": "foam", "thicknessMicrometers": 550 }),
        )
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let plate: Value = client
        .post("/report-specs", json!({ "name": "Cyrel DPR", "type": "plate" }))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    // Assemble a job with one cylinder and one report
    let response = client
        .post(
            "/jobs/full",
            json!({
                "job": {
                    "jobNumber": "JOB-2025-001",
                    "jobDate": "2025-12-22T10:00:00",
                    "noteInfo": "Customer proof approved"
                },
                "cylinders": [{
                    "cylinderNr": 1,
                    "color": "Cyan",
                    "tapeSpecId": tape["id"],
                    "reports": [{ "reportNr": 1, "reportWidth": 320, "reportSpecId": plate["id"] }]
                }]
            }),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let location = response.headers()["location"].to_str().unwrap().to_string();
    let job: Value = response.json().await.unwrap();
    assert_eq!(location, format!("/jobs/{}", job["id"]));
    assert_eq!(job["noteInfo"], "Customer proof approved");

    let job_id = job["id"].as_i64().unwrap();
    let cylinders: Vec<Value> = client
        .get(&format!("/jobs/{}/cylinders", job_id))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cylinders.len(), 1);
    assert_eq!(cylinders[0]["tapeSpecId"], tape["id"]);
    let cylinder_id = cylinders[0]["id"].as_i64().unwrap();

    // Add a second cylinder, then try to reuse its number
    let second = client
        .post(
            &format!("/jobs/{}/cylinders", job_id),
            json!({ "cylinderNr": 2, "color": "Magenta", "tapeSpecId": tape["id"] }),
        )
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CREATED);
    let second: Value = second.json().await.unwrap();

    let renumber = client
        .put(
            &format!("/jobs/{}/cylinders/{}", job_id, second["id"]),
            json!({ "cylinderNr": 1, "color": "Magenta", "tapeSpecId": tape["id"] }),
        )
        .await
        .unwrap();
    assert_eq!(renumber.status(), StatusCode::BAD_REQUEST);
    let error: Value = renumber.json().await.unwrap();
    assert_eq!(
        error["message"],
        "Cylinder number 1 already exists within this job."
    );

    // Move the report to the second cylinder
    let reports: Vec<Value> = client
        .get(&format!("/reports?cylinderId={}", cylinder_id))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reports.len(), 1);
    let moved = client
        .put(
            &format!("/reports/{}", reports[0]["id"]),
            json!({
                "reportNr": 1,
                "reportWidth": 330,
                "cylinderId": second["id"],
                "reportSpecId": plate["id"]
            }),
        )
        .await
        .unwrap();
    assert_eq!(moved.status(), StatusCode::OK);
    let moved: Value = moved.json().await.unwrap();
    assert_eq!(moved["cylinderId"], second["id"]);

    // Delete the whole job
    let deleted = client.delete(&format!("/jobs/{}", job_id)).await.unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let missing = client.get(&format!("/jobs/{}", job_id)).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let error: Value = missing.json().await.unwrap();
    assert_eq!(error["path"], format!("/jobs/{}", job_id));
    assert_eq!(error["status"], 404);
}
