use crate::model::{deserialize_lenient_id, Field, Id, JobRequest};
use serde::{Deserialize, Serialize};

/// Composite document describing a job with nested cylinders and reports.
///
/// ```json
/// {
///   "job": { "jobDate": "2025-12-22T10:00:00", "jobNumber": "JOB-1" },
///   "cylinders": [
///     { "cylinderNr": 1, "color": "Cyan", "tapeSpecId": 10,
///       "reports": [ { "reportNr": 1, "reportWidth": 320, "reportSpecId": 3 } ] }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssemblyRequest {
    #[serde(default)]
    pub job: Field<JobRequest>,
    pub cylinders: Option<Vec<AssemblyCylinder>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyCylinder {
    #[serde(default)]
    pub cylinder_nr: Field<i32>,
    pub color: Option<String>,
    pub cylinder_info: Option<String>,
    /// Missing, null, non-numeric and unknown ids all fall back to a new
    /// default TapeSpec.
    #[serde(default, deserialize_with = "deserialize_lenient_id")]
    pub tape_spec_id: Option<Id>,
    pub reports: Option<Vec<AssemblyReport>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyReport {
    #[serde(default)]
    pub report_nr: Field<i32>,
    pub report_width: Option<i32>,
    pub x_offset: Option<i32>,
    pub y_offset: Option<i32>,
    /// Missing, null, non-numeric and unknown ids all fall back to a new
    /// default ReportSpec.
    #[serde(default, deserialize_with = "deserialize_lenient_id")]
    pub report_spec_id: Option<Id>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_payload_deserializes() {
        let json = r#"{
            "job": {"jobDate": "2025-12-22T10:00:00", "jobNumber": "JOB-1"},
            "cylinders": [
                {"cylinderNr": 1, "color": "Cyan", "tapeSpecId": null,
                 "reports": [{"reportNr": 1, "xOffset": 5, "yOffset": 0}]},
                {"cylinderNr": 2}
            ]
        }"#;

        let request: AssemblyRequest = serde_json::from_str(json).unwrap();
        let job = request.job.as_value().unwrap();
        assert_eq!(job.job_date, Field::Value("2025-12-22T10:00:00".to_string()));

        let cylinders = request.cylinders.unwrap();
        assert_eq!(cylinders.len(), 2);
        assert_eq!(cylinders[0].tape_spec_id, None);
        let reports = cylinders[0].reports.as_ref().unwrap();
        assert_eq!(reports[0].x_offset, Some(5));
        assert!(cylinders[1].reports.is_none());
    }

    #[test]
    fn test_spec_ids_are_read_leniently() {
        let json = r#"{
            "job": {"jobDate": "2025-12-22T10:00:00"},
            "cylinders": [
                {"cylinderNr": 1, "tapeSpecId": "abc",
                 "reports": [{"reportNr": 1, "reportSpecId": " 12 "}, {"reportNr": 2, "reportSpecId": 7.9}]},
                {"cylinderNr": 2, "tapeSpecId": true},
                {"cylinderNr": 3, "tapeSpecId": 42}
            ]
        }"#;

        let request: AssemblyRequest = serde_json::from_str(json).unwrap();
        let cylinders = request.cylinders.unwrap();
        assert_eq!(cylinders[0].tape_spec_id, None);
        assert_eq!(cylinders[1].tape_spec_id, None);
        assert_eq!(cylinders[2].tape_spec_id, Some(42));

        let reports = cylinders[0].reports.as_ref().unwrap();
        assert_eq!(reports[0].report_spec_id, Some(12));
        assert_eq!(reports[1].report_spec_id, Some(7));
    }

    #[test]
    fn test_missing_job_is_absent() {
        let request: AssemblyRequest = serde_json::from_str(r#"{"cylinders": []}"#).unwrap();
        assert!(request.job.is_absent());
    }
}
