use itertools::Itertools;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::model::Id;
use crate::store::{StoreError, UK_CYLINDER_JOB_NR, UK_REPORT_CYLINDER_NR};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Per-field validation messages, keyed by the request's JSON field name.
pub type FieldErrors = BTreeMap<String, String>;

/// Violations of the in-memory Job/Cylinder/Report graph rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    #[error("The {parent} must be persisted before a {child} can be attached to it.")]
    UnsavedParent {
        parent: &'static str,
        child: &'static str,
    },

    #[error("This {child} already belongs to {parent} {owner}; remove it there first.")]
    AlreadyAttached {
        child: &'static str,
        parent: &'static str,
        owner: Id,
    },
}

/// Failures surfaced by job, cylinder, report, catalog and assembly operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    Validation {
        message: String,
        field_errors: FieldErrors,
    },

    #[error("{0}")]
    NotFound(String),

    /// Business-rule violations such as a duplicate cylinder number.
    #[error("{0}")]
    InvalidArgument(String),

    /// A constraint enforced by the store rejected the write.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Internal(anyhow::Error),
}

impl ServiceError {
    pub fn not_found(entity: &str, id: Id) -> Self {
        ServiceError::NotFound(format!("{} not found with id: {}", entity, id))
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        ServiceError::InvalidArgument(message.into())
    }

    pub fn validation(field_errors: FieldErrors) -> Self {
        ServiceError::Validation {
            message: "Validation failed for one or more fields.".to_string(),
            field_errors,
        }
    }

    /// Collapse a validation failure into a single business-rule message.
    pub fn into_invalid_argument(self) -> Self {
        match self {
            ServiceError::Validation { field_errors, .. } if !field_errors.is_empty() => {
                ServiceError::InvalidArgument(field_errors.values().join(" "))
            }
            ServiceError::Validation { message, .. } => ServiceError::InvalidArgument(message),
            other => other,
        }
    }
}

impl From<AggregateError> for ServiceError {
    fn from(error: AggregateError) -> Self {
        ServiceError::InvalidArgument(error.to_string())
    }
}

impl From<StoreError> for ServiceError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::UniqueViolation { constraint } => {
                let message = match constraint.as_str() {
                    UK_CYLINDER_JOB_NR => "Cylinder number already exists within this job.",
                    UK_REPORT_CYLINDER_NR => "Report number already exists within this cylinder.",
                    _ => "Database constraint violation.",
                };
                ServiceError::Conflict(message.to_string())
            }
            StoreError::ForeignKeyViolation { constraint } => ServiceError::Conflict(format!(
                "Database constraint violation: {} still references or misses a related row.",
                constraint
            )),
            StoreError::Backend(error) => ServiceError::Internal(error),
            other => ServiceError::Internal(anyhow::Error::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let error: ServiceError = StoreError::UniqueViolation {
            constraint: UK_CYLINDER_JOB_NR.to_string(),
        }
        .into();

        match error {
            ServiceError::Conflict(message) => assert!(message.contains("Cylinder number")),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_detached_write_is_internal() {
        let error: ServiceError = StoreError::Detached { entity: "report" }.into();
        assert!(matches!(error, ServiceError::Internal(_)));
    }
}
