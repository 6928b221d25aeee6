use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::logic::{
    AssemblyOrchestrator, CylinderOperations, JobOperations, ReportOperations, SpecOperations,
};
use crate::model::{
    AssemblyRequest, CatalogSpec, CylinderRequest, CylinderResponse, Id, JobRequest, JobResponse,
    ReportRequest, ReportResponse, SpecKind, SpecRequest, UserContext,
};
use crate::store::traits::Store;

pub type AppState<S> = Arc<S>;

type JsonBody<T> = Result<Json<T>, JsonRejection>;
type PathId = Result<Path<Id>, PathRejection>;
type JobCylinderPath = Result<Path<(Id, Id)>, PathRejection>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// Fallback for unknown routes, rendered in the uniform error shape.
pub async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::new(
        StatusCode::NOT_FOUND,
        format!("No handler found for {}", uri.path()),
    )
}

fn created<T: Serialize>(location: String, body: T) -> Response {
    (
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(body),
    )
        .into_response()
}

fn location(base: &str, id: Option<Id>) -> String {
    match id {
        Some(id) => format!("{}/{}", base, id),
        None => base.to_string(),
    }
}

// Jobs

pub async fn create_job<S: Store>(
    State(store): State<AppState<S>>,
    user: UserContext,
    payload: JsonBody<JobRequest>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let job = JobOperations::create(&*store, &user, request).await?;
    Ok(created(location("/jobs", job.id), job))
}

pub async fn list_jobs<S: Store>(
    State(store): State<AppState<S>>,
) -> ApiResult<Json<Vec<JobResponse>>> {
    Ok(Json(JobOperations::list(&*store).await?))
}

pub async fn get_job<S: Store>(
    State(store): State<AppState<S>>,
    path: PathId,
) -> ApiResult<Json<JobResponse>> {
    let Path(id) = path?;
    Ok(Json(JobOperations::get(&*store, id).await?))
}

pub async fn update_job<S: Store>(
    State(store): State<AppState<S>>,
    user: UserContext,
    path: PathId,
    payload: JsonBody<JobRequest>,
) -> ApiResult<Json<JobResponse>> {
    let Path(id) = path?;
    let Json(request) = payload?;
    Ok(Json(JobOperations::update(&*store, &user, id, request).await?))
}

pub async fn delete_job<S: Store>(
    State(store): State<AppState<S>>,
    user: UserContext,
    path: PathId,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;
    JobOperations::delete(&*store, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Create a job with nested cylinders and reports in one call.
pub async fn assemble_job<S: Store>(
    State(store): State<AppState<S>>,
    user: UserContext,
    payload: JsonBody<AssemblyRequest>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let job = AssemblyOrchestrator::assemble(&*store, &user, request).await?;
    Ok(created(location("/jobs", job.id), job))
}

// Cylinders, scoped to their job

pub async fn create_cylinder<S: Store>(
    State(store): State<AppState<S>>,
    user: UserContext,
    path: PathId,
    payload: JsonBody<CylinderRequest>,
) -> ApiResult<Response> {
    let Path(job_id) = path?;
    let Json(request) = payload?;
    let cylinder = CylinderOperations::create(&*store, &user, job_id, request).await?;
    Ok(created(
        location(&format!("/jobs/{}/cylinders", job_id), cylinder.id),
        cylinder,
    ))
}

pub async fn list_cylinders<S: Store>(
    State(store): State<AppState<S>>,
    path: PathId,
) -> ApiResult<Json<Vec<CylinderResponse>>> {
    let Path(job_id) = path?;
    Ok(Json(CylinderOperations::list(&*store, job_id).await?))
}

pub async fn get_cylinder<S: Store>(
    State(store): State<AppState<S>>,
    path: JobCylinderPath,
) -> ApiResult<Json<CylinderResponse>> {
    let Path((job_id, cylinder_id)) = path?;
    Ok(Json(
        CylinderOperations::get(&*store, job_id, cylinder_id).await?,
    ))
}

pub async fn update_cylinder<S: Store>(
    State(store): State<AppState<S>>,
    user: UserContext,
    path: JobCylinderPath,
    payload: JsonBody<CylinderRequest>,
) -> ApiResult<Json<CylinderResponse>> {
    let Path((job_id, cylinder_id)) = path?;
    let Json(request) = payload?;
    Ok(Json(
        CylinderOperations::update(&*store, &user, job_id, cylinder_id, request).await?,
    ))
}

pub async fn delete_cylinder<S: Store>(
    State(store): State<AppState<S>>,
    user: UserContext,
    path: JobCylinderPath,
) -> ApiResult<StatusCode> {
    let Path((job_id, cylinder_id)) = path?;
    CylinderOperations::delete(&*store, &user, job_id, cylinder_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Reports

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    pub cylinder_id: Option<Id>,
}

pub async fn create_report<S: Store>(
    State(store): State<AppState<S>>,
    user: UserContext,
    payload: JsonBody<ReportRequest>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let report = ReportOperations::create(&*store, &user, request).await?;
    Ok(created(location("/reports", report.id), report))
}

pub async fn list_reports<S: Store>(
    State(store): State<AppState<S>>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ReportResponse>>> {
    let Query(query) = query?;
    let cylinder_id = query
        .cylinder_id
        .ok_or_else(|| ApiError::bad_request("cylinderId query parameter is required."))?;
    Ok(Json(
        ReportOperations::list_by_cylinder(&*store, cylinder_id).await?,
    ))
}

pub async fn get_report<S: Store>(
    State(store): State<AppState<S>>,
    path: PathId,
) -> ApiResult<Json<ReportResponse>> {
    let Path(id) = path?;
    Ok(Json(ReportOperations::get(&*store, id).await?))
}

pub async fn update_report<S: Store>(
    State(store): State<AppState<S>>,
    user: UserContext,
    path: PathId,
    payload: JsonBody<ReportRequest>,
) -> ApiResult<Json<ReportResponse>> {
    let Path(id) = path?;
    let Json(request) = payload?;
    Ok(Json(
        ReportOperations::update(&*store, &user, id, request).await?,
    ))
}

pub async fn delete_report<S: Store>(
    State(store): State<AppState<S>>,
    user: UserContext,
    path: PathId,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;
    ReportOperations::delete(&*store, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Specification catalogs

/// Binds a catalog handler to its spec kind and base path.
pub trait Catalog: Send + Sync + 'static {
    const KIND: SpecKind;
    const BASE_PATH: &'static str;
}

pub struct TapeSpecs;

impl Catalog for TapeSpecs {
    const KIND: SpecKind = SpecKind::Tape;
    const BASE_PATH: &'static str = "/tape-specs";
}

pub struct ReportSpecs;

impl Catalog for ReportSpecs {
    const KIND: SpecKind = SpecKind::Report;
    const BASE_PATH: &'static str = "/report-specs";
}

pub async fn create_spec<S: Store, C: Catalog>(
    State(store): State<AppState<S>>,
    user: UserContext,
    payload: JsonBody<SpecRequest>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let spec = SpecOperations::create(&*store, &user, C::KIND, request).await?;
    Ok(created(location(C::BASE_PATH, Some(spec.id)), spec))
}

pub async fn list_specs<S: Store, C: Catalog>(
    State(store): State<AppState<S>>,
) -> ApiResult<Json<Vec<CatalogSpec>>> {
    Ok(Json(SpecOperations::list(&*store, C::KIND).await?))
}

pub async fn get_spec<S: Store, C: Catalog>(
    State(store): State<AppState<S>>,
    path: PathId,
) -> ApiResult<Json<CatalogSpec>> {
    let Path(id) = path?;
    Ok(Json(SpecOperations::get(&*store, C::KIND, id).await?))
}

pub async fn update_spec<S: Store, C: Catalog>(
    State(store): State<AppState<S>>,
    user: UserContext,
    path: PathId,
    payload: JsonBody<SpecRequest>,
) -> ApiResult<Json<CatalogSpec>> {
    let Path(id) = path?;
    let Json(request) = payload?;
    Ok(Json(
        SpecOperations::update(&*store, &user, C::KIND, id, request).await?,
    ))
}

pub async fn delete_spec<S: Store, C: Catalog>(
    State(store): State<AppState<S>>,
    user: UserContext,
    path: PathId,
) -> ApiResult<StatusCode> {
    let Path(id) = path?;
    SpecOperations::delete(&*store, &user, C::KIND, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
