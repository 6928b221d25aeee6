use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;

use crate::api::error::error_path_layer;
use crate::api::handlers::{self, ReportSpecs, TapeSpecs};
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<Arc<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Jobs
        .route(
            "/jobs",
            get(handlers::list_jobs::<S>).post(handlers::create_job::<S>),
        )
        .route("/jobs/full", post(handlers::assemble_job::<S>))
        .route(
            "/jobs/:id",
            get(handlers::get_job::<S>)
                .put(handlers::update_job::<S>)
                .delete(handlers::delete_job::<S>),
        )
        // Cylinders within a job
        .route(
            "/jobs/:job_id/cylinders",
            get(handlers::list_cylinders::<S>).post(handlers::create_cylinder::<S>),
        )
        .route(
            "/jobs/:job_id/cylinders/:cylinder_id",
            get(handlers::get_cylinder::<S>)
                .put(handlers::update_cylinder::<S>)
                .delete(handlers::delete_cylinder::<S>),
        )
        // Reports
        .route(
            "/reports",
            get(handlers::list_reports::<S>).post(handlers::create_report::<S>),
        )
        .route(
            "/reports/:id",
            get(handlers::get_report::<S>)
                .put(handlers::update_report::<S>)
                .delete(handlers::delete_report::<S>),
        )
        // Specification catalogs
        .route(
            "/tape-specs",
            get(handlers::list_specs::<S, TapeSpecs>).post(handlers::create_spec::<S, TapeSpecs>),
        )
        .route(
            "/tape-specs/:id",
            get(handlers::get_spec::<S, TapeSpecs>)
                .put(handlers::update_spec::<S, TapeSpecs>)
                .delete(handlers::delete_spec::<S, TapeSpecs>),
        )
        .route(
            "/report-specs",
            get(handlers::list_specs::<S, ReportSpecs>)
                .post(handlers::create_spec::<S, ReportSpecs>),
        )
        .route(
            "/report-specs/:id",
            get(handlers::get_spec::<S, ReportSpecs>)
                .put(handlers::update_spec::<S, ReportSpecs>)
                .delete(handlers::delete_spec::<S, ReportSpecs>),
        )
        .fallback(handlers::route_not_found)
        .layer(ServiceBuilder::new().layer(middleware::from_fn(error_path_layer)))
}
