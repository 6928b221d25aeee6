use crate::model::{Field, Id};
use serde::{Deserialize, Serialize};

/// Row shape of the `reports` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ReportRecord {
    pub id: Id,
    pub report_nr: i32,
    pub report_width: Option<i32>,
    pub x_offset: Option<i32>,
    pub y_offset: Option<i32>,
    pub cylinder_id: Id,
    pub report_spec_id: Id,
}

/// Validated editable fields of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFields {
    pub report_nr: i32,
    pub report_width: Option<i32>,
    pub x_offset: Option<i32>,
    pub y_offset: Option<i32>,
    pub report_spec_id: Id,
}

/// A plate placement on a cylinder.
///
/// The owning cylinder is set only through [`crate::model::Cylinder::add_report`].
#[derive(Debug, Clone)]
pub struct Report {
    id: Option<Id>,
    pub report_nr: i32,
    pub report_width: Option<i32>,
    pub x_offset: Option<i32>,
    pub y_offset: Option<i32>,
    pub(super) cylinder_id: Option<Id>,
    report_spec_id: Id,
}

impl Report {
    pub fn new(fields: ReportFields) -> Self {
        Self {
            id: None,
            report_nr: fields.report_nr,
            report_width: fields.report_width,
            x_offset: fields.x_offset,
            y_offset: fields.y_offset,
            cylinder_id: None,
            report_spec_id: fields.report_spec_id,
        }
    }

    pub fn id(&self) -> Option<Id> {
        self.id
    }

    pub fn cylinder_id(&self) -> Option<Id> {
        self.cylinder_id
    }

    pub fn report_spec_id(&self) -> Id {
        self.report_spec_id
    }

    pub fn set_report_spec(&mut self, report_spec_id: Id) {
        self.report_spec_id = report_spec_id;
    }

    pub fn mark_persisted(&mut self, id: Id) {
        self.id = Some(id);
    }

    /// Full replace: every editable field is overwritten.
    pub fn apply(&mut self, fields: ReportFields) {
        self.report_nr = fields.report_nr;
        self.report_width = fields.report_width;
        self.x_offset = fields.x_offset;
        self.y_offset = fields.y_offset;
        self.report_spec_id = fields.report_spec_id;
    }
}

impl PartialEq for Report {
    fn eq(&self, other: &Self) -> bool {
        matches!((self.id, other.id), (Some(a), Some(b)) if a == b)
    }
}

impl From<ReportRecord> for Report {
    fn from(record: ReportRecord) -> Self {
        Self {
            id: Some(record.id),
            report_nr: record.report_nr,
            report_width: record.report_width,
            x_offset: record.x_offset,
            y_offset: record.y_offset,
            cylinder_id: Some(record.cylinder_id),
            report_spec_id: record.report_spec_id,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    #[serde(default)]
    pub report_nr: Field<i32>,
    pub report_width: Option<i32>,
    pub x_offset: Option<i32>,
    pub y_offset: Option<i32>,
    #[serde(default)]
    pub cylinder_id: Field<Id>,
    #[serde(default)]
    pub report_spec_id: Field<Id>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportResponse {
    pub id: Option<Id>,
    pub report_nr: i32,
    pub report_width: Option<i32>,
    pub x_offset: Option<i32>,
    pub y_offset: Option<i32>,
    pub cylinder_id: Option<Id>,
    pub report_spec_id: Id,
}

impl From<&Report> for ReportResponse {
    fn from(report: &Report) -> Self {
        Self {
            id: report.id,
            report_nr: report.report_nr,
            report_width: report.report_width,
            x_offset: report.x_offset,
            y_offset: report.y_offset,
            cylinder_id: report.cylinder_id,
            report_spec_id: report.report_spec_id,
        }
    }
}
