//! Request validation. Each check records a message under the JSON field
//! name so the API can report every problem at once.

use crate::error::{FieldErrors, ServiceError, ServiceResult};
use crate::model::{
    parse_timestamp, CylinderFields, CylinderRequest, Field, Id, JobFields, JobRequest, NewSpec,
    ReportFields, ReportRequest, SpecRequest,
};

pub const JOB_NUMBER_MAX: usize = 40;
pub const TEXT_MAX: usize = 255;
pub const NOTE_MAX: usize = 100_000;
pub const CYLINDER_WIDTH_MAX: i32 = 168_000;
pub const CYLINDER_CIRCUMFERENCE_MAX: i32 = 1_250_000;

fn key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", prefix, name)
    }
}

/// Unwrap a required tri-state field, recording why it is unusable.
pub(crate) fn required<T>(
    field: Field<T>,
    prefix: &str,
    name: &str,
    errors: &mut FieldErrors,
) -> Option<T> {
    match field {
        Field::Value(value) => Some(value),
        Field::Null => {
            errors.insert(key(prefix, name), format!("{} must not be null.", name));
            None
        }
        Field::Absent => {
            errors.insert(key(prefix, name), format!("{} is required.", name));
            None
        }
    }
}

pub(crate) fn max_chars(
    value: Option<&str>,
    max: usize,
    prefix: &str,
    name: &str,
    errors: &mut FieldErrors,
) {
    if let Some(value) = value {
        if value.chars().count() > max {
            errors.insert(
                key(prefix, name),
                format!("{} must be at most {} characters.", name, max),
            );
        }
    }
}

pub(crate) fn in_range(
    value: Option<i32>,
    min: i32,
    max: Option<i32>,
    prefix: &str,
    name: &str,
    errors: &mut FieldErrors,
) {
    let Some(value) = value else {
        return;
    };
    match max {
        Some(max) if value < min || value > max => {
            errors.insert(
                key(prefix, name),
                format!("{} must be between {} and {}.", name, min, max),
            );
        }
        None if value < min => {
            errors.insert(key(prefix, name), format!("{} must be at least {}.", name, min));
        }
        _ => {}
    }
}

fn finish<T>(value: Option<T>, errors: FieldErrors) -> ServiceResult<T> {
    match value {
        Some(value) if errors.is_empty() => Ok(value),
        _ => Err(ServiceError::validation(errors)),
    }
}

pub(crate) fn collect_job(
    request: JobRequest,
    prefix: &str,
    errors: &mut FieldErrors,
) -> Option<JobFields> {
    let job_date = required(request.job_date, prefix, "jobDate", errors).and_then(|raw| {
        let parsed = parse_timestamp(&raw);
        if parsed.is_none() {
            errors.insert(
                key(prefix, "jobDate"),
                format!(
                    "jobDate must be a timestamp like 2025-12-22T10:00:00, got '{}'.",
                    raw
                ),
            );
        }
        parsed
    });

    max_chars(request.job_number.as_deref(), JOB_NUMBER_MAX, prefix, "jobNumber", errors);
    max_chars(request.job_name.as_deref(), TEXT_MAX, prefix, "jobName", errors);
    max_chars(request.info.as_deref(), TEXT_MAX, prefix, "info", errors);
    max_chars(request.note_info.as_deref(), NOTE_MAX, prefix, "noteInfo", errors);
    in_range(
        request.cylinder_width,
        0,
        Some(CYLINDER_WIDTH_MAX),
        prefix,
        "cylinderWidth",
        errors,
    );
    in_range(
        request.cylinder_circumference,
        0,
        Some(CYLINDER_CIRCUMFERENCE_MAX),
        prefix,
        "cylinderCircumference",
        errors,
    );

    Some(JobFields {
        job_number: request.job_number,
        job_date: job_date?,
        job_name: request.job_name,
        cylinder_width: request.cylinder_width,
        cylinder_circumference: request.cylinder_circumference,
        info: request.info,
        note: request.note_info,
    })
}

pub fn job_fields(request: JobRequest) -> ServiceResult<JobFields> {
    let mut errors = FieldErrors::new();
    let fields = collect_job(request, "", &mut errors);
    finish(fields, errors)
}

pub fn cylinder_fields(request: CylinderRequest) -> ServiceResult<CylinderFields> {
    let mut errors = FieldErrors::new();
    let cylinder_nr = required(request.cylinder_nr, "", "cylinderNr", &mut errors);
    let tape_spec_id = required(request.tape_spec_id, "", "tapeSpecId", &mut errors);
    max_chars(request.color.as_deref(), TEXT_MAX, "", "color", &mut errors);
    max_chars(request.cylinder_info.as_deref(), TEXT_MAX, "", "cylinderInfo", &mut errors);

    let fields = cylinder_nr.zip(tape_spec_id).map(|(cylinder_nr, tape_spec_id)| CylinderFields {
        cylinder_nr,
        color: request.color,
        cylinder_info: request.cylinder_info,
        tape_spec_id,
    });
    finish(fields, errors)
}

/// Checks shared by direct report requests and nested assembly entries.
pub(crate) fn check_report_numbers(
    report_nr: Option<i32>,
    report_width: Option<i32>,
    prefix: &str,
    errors: &mut FieldErrors,
) {
    in_range(report_nr, 1, None, prefix, "reportNr", errors);
    in_range(report_width, 0, None, prefix, "reportWidth", errors);
}

/// Returns the owning cylinder id alongside the report fields.
pub fn report_fields(request: ReportRequest) -> ServiceResult<(Id, ReportFields)> {
    let mut errors = FieldErrors::new();
    let report_nr = required(request.report_nr, "", "reportNr", &mut errors);
    let cylinder_id = required(request.cylinder_id, "", "cylinderId", &mut errors);
    let report_spec_id = required(request.report_spec_id, "", "reportSpecId", &mut errors);
    check_report_numbers(report_nr, request.report_width, "", &mut errors);

    let fields = match (report_nr, cylinder_id, report_spec_id) {
        (Some(report_nr), Some(cylinder_id), Some(report_spec_id)) => Some((
            cylinder_id,
            ReportFields {
                report_nr,
                report_width: request.report_width,
                x_offset: request.x_offset,
                y_offset: request.y_offset,
                report_spec_id,
            },
        )),
        _ => None,
    };
    finish(fields, errors)
}

pub fn spec_fields(request: SpecRequest) -> ServiceResult<NewSpec> {
    let mut errors = FieldErrors::new();
    let name = required(request.name, "", "name", &mut errors).filter(|name| {
        if name.trim().is_empty() {
            errors.insert("name".to_string(), "name must not be blank.".to_string());
            return false;
        }
        true
    });
    max_chars(name.as_deref(), TEXT_MAX, "", "name", &mut errors);
    max_chars(request.spec_type.as_deref(), TEXT_MAX, "", "type", &mut errors);
    max_chars(request.info.as_deref(), TEXT_MAX, "", "info", &mut errors);
    in_range(
        request.thickness_micrometers,
        0,
        None,
        "",
        "thicknessMicrometers",
        &mut errors,
    );

    let fields = name.map(|name| NewSpec {
        name,
        spec_type: request.spec_type,
        thickness_micrometers: request.thickness_micrometers,
        info: request.info,
    });
    finish(fields, errors)
}
