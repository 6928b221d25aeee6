use crate::error::AggregateError;
use crate::model::{Field, Id, Report};
use serde::{Deserialize, Serialize};

/// Row shape of the `cylinders` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CylinderRecord {
    pub id: Id,
    pub cylinder_nr: i32,
    pub color: Option<String>,
    pub cylinder_info: Option<String>,
    pub job_id: Id,
    pub tape_spec_id: Id,
}

/// Validated editable fields of a cylinder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CylinderFields {
    pub cylinder_nr: i32,
    pub color: Option<String>,
    pub cylinder_info: Option<String>,
    pub tape_spec_id: Id,
}

/// A printing station within a job. Owns its reports.
///
/// The owning job is set only through [`crate::model::Job::add_cylinder`].
#[derive(Debug, Clone)]
pub struct Cylinder {
    id: Option<Id>,
    pub cylinder_nr: i32,
    pub color: Option<String>,
    pub cylinder_info: Option<String>,
    pub(super) job_id: Option<Id>,
    tape_spec_id: Id,
    reports: Vec<Report>,
}

impl Cylinder {
    pub fn new(fields: CylinderFields) -> Self {
        Self {
            id: None,
            cylinder_nr: fields.cylinder_nr,
            color: fields.color,
            cylinder_info: fields.cylinder_info,
            job_id: None,
            tape_spec_id: fields.tape_spec_id,
            reports: Vec::new(),
        }
    }

    pub fn id(&self) -> Option<Id> {
        self.id
    }

    pub fn job_id(&self) -> Option<Id> {
        self.job_id
    }

    pub fn tape_spec_id(&self) -> Id {
        self.tape_spec_id
    }

    pub fn set_tape_spec(&mut self, tape_spec_id: Id) {
        self.tape_spec_id = tape_spec_id;
    }

    pub fn mark_persisted(&mut self, id: Id) {
        self.id = Some(id);
        for report in &mut self.reports {
            report.cylinder_id = Some(id);
        }
    }

    /// Full replace: every editable field is overwritten.
    pub fn apply(&mut self, fields: CylinderFields) {
        self.cylinder_nr = fields.cylinder_nr;
        self.color = fields.color;
        self.cylinder_info = fields.cylinder_info;
        self.tape_spec_id = fields.tape_spec_id;
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    pub fn report(&self, report_id: Id) -> Option<&Report> {
        self.reports.iter().find(|r| r.id() == Some(report_id))
    }

    /// Attach `report` to this cylinder.
    ///
    /// A report that is already in the collection is refreshed in place rather
    /// than appended twice. A report owned by another cylinder is rejected.
    pub fn add_report(&mut self, mut report: Report) -> Result<&mut Report, AggregateError> {
        let cylinder_id = self.id.ok_or(AggregateError::UnsavedParent {
            parent: "cylinder",
            child: "report",
        })?;

        if let Some(owner) = report.cylinder_id {
            if owner != cylinder_id {
                return Err(AggregateError::AlreadyAttached {
                    child: "report",
                    parent: "cylinder",
                    owner,
                });
            }
        }

        report.cylinder_id = Some(cylinder_id);
        let index = match self.reports.iter().position(|r| *r == report) {
            Some(index) => {
                self.reports[index] = report;
                index
            }
            None => {
                self.reports.push(report);
                self.reports.len() - 1
            }
        };

        Ok(&mut self.reports[index])
    }

    /// Detach the report with `report_id`, returning it for deletion.
    pub fn remove_report(&mut self, report_id: Id) -> Option<Report> {
        let index = self.reports.iter().position(|r| r.id() == Some(report_id))?;
        let mut report = self.reports.remove(index);
        if report.cylinder_id.is_some() && report.cylinder_id == self.id {
            report.cylinder_id = None;
        }
        Some(report)
    }
}

impl PartialEq for Cylinder {
    fn eq(&self, other: &Self) -> bool {
        matches!((self.id, other.id), (Some(a), Some(b)) if a == b)
    }
}

impl From<CylinderRecord> for Cylinder {
    fn from(record: CylinderRecord) -> Self {
        Self {
            id: Some(record.id),
            cylinder_nr: record.cylinder_nr,
            color: record.color,
            cylinder_info: record.cylinder_info,
            job_id: Some(record.job_id),
            tape_spec_id: record.tape_spec_id,
            reports: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CylinderRequest {
    #[serde(default)]
    pub cylinder_nr: Field<i32>,
    pub color: Option<String>,
    pub cylinder_info: Option<String>,
    #[serde(default)]
    pub tape_spec_id: Field<Id>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CylinderResponse {
    pub id: Option<Id>,
    pub cylinder_nr: i32,
    pub color: Option<String>,
    pub cylinder_info: Option<String>,
    pub job_id: Option<Id>,
    pub tape_spec_id: Id,
}

impl From<&Cylinder> for CylinderResponse {
    fn from(cylinder: &Cylinder) -> Self {
        Self {
            id: cylinder.id,
            cylinder_nr: cylinder.cylinder_nr,
            color: cylinder.color.clone(),
            cylinder_info: cylinder.cylinder_info.clone(),
            job_id: cylinder.job_id,
            tape_spec_id: cylinder.tape_spec_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ReportFields, ReportRecord};

    fn persisted_cylinder(id: Id) -> Cylinder {
        Cylinder::from(CylinderRecord {
            id,
            cylinder_nr: 1,
            color: Some("Cyan".to_string()),
            cylinder_info: None,
            job_id: 100,
            tape_spec_id: 10,
        })
    }

    fn report_fields(nr: i32) -> ReportFields {
        ReportFields {
            report_nr: nr,
            report_width: Some(320),
            x_offset: Some(0),
            y_offset: Some(0),
            report_spec_id: 3,
        }
    }

    #[test]
    fn test_add_report_sets_parent_reference() {
        let mut cylinder = persisted_cylinder(5);
        let report = cylinder.add_report(Report::new(report_fields(1))).unwrap();
        assert_eq!(report.cylinder_id(), Some(5));
        assert_eq!(cylinder.reports().len(), 1);
    }

    #[test]
    fn test_add_report_is_idempotent_for_same_identity() {
        let mut cylinder = persisted_cylinder(5);
        let record = ReportRecord {
            id: 42,
            report_nr: 1,
            report_width: None,
            x_offset: None,
            y_offset: None,
            cylinder_id: 5,
            report_spec_id: 3,
        };

        cylinder.add_report(Report::from(record.clone())).unwrap();
        cylinder.add_report(Report::from(record)).unwrap();
        assert_eq!(cylinder.reports().len(), 1);
    }

    #[test]
    fn test_unsaved_reports_are_never_equal() {
        let mut cylinder = persisted_cylinder(5);
        cylinder.add_report(Report::new(report_fields(1))).unwrap();
        cylinder.add_report(Report::new(report_fields(1))).unwrap();
        assert_eq!(cylinder.reports().len(), 2);
    }

    #[test]
    fn test_add_report_rejects_report_of_other_cylinder() {
        let mut cylinder = persisted_cylinder(5);
        let foreign = Report::from(ReportRecord {
            id: 9,
            report_nr: 1,
            report_width: None,
            x_offset: None,
            y_offset: None,
            cylinder_id: 6,
            report_spec_id: 3,
        });

        let error = cylinder.add_report(foreign).unwrap_err();
        assert_eq!(
            error,
            AggregateError::AlreadyAttached {
                child: "report",
                parent: "cylinder",
                owner: 6
            }
        );
    }

    #[test]
    fn test_add_report_requires_persisted_cylinder() {
        let mut cylinder = Cylinder::new(CylinderFields {
            cylinder_nr: 1,
            color: None,
            cylinder_info: None,
            tape_spec_id: 10,
        });
        assert!(matches!(
            cylinder.add_report(Report::new(report_fields(1))),
            Err(AggregateError::UnsavedParent { .. })
        ));
    }

    #[test]
    fn test_remove_report_detaches() {
        let mut cylinder = persisted_cylinder(5);
        let report = cylinder.add_report(Report::new(report_fields(2))).unwrap();
        report.mark_persisted(77);

        let removed = cylinder.remove_report(77).unwrap();
        assert_eq!(removed.cylinder_id(), None);
        assert!(cylinder.reports().is_empty());
        assert!(cylinder.remove_report(77).is_none());
    }
}
