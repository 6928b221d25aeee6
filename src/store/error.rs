use thiserror::Error;

/// Unique index on `cylinders (job_id, cylinder_nr)`.
pub const UK_CYLINDER_JOB_NR: &str = "uk_cylinder_job_nr";
/// Unique index on `reports (cylinder_id, report_nr)`.
pub const UK_REPORT_CYLINDER_NR: &str = "uk_report_cylinder_nr";

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint '{constraint}' violated")]
    UniqueViolation { constraint: String },

    #[error("foreign key constraint '{constraint}' violated")]
    ForeignKeyViolation { constraint: String },

    /// A child entity was written without being attached to a persisted parent.
    #[error("{entity} is not attached to a persisted parent")]
    Detached { entity: &'static str },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}
