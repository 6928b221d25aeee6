use crate::model::{Field, Id};
use serde::{Deserialize, Serialize};

/// Thickness used for specifications provisioned by job assembly.
pub const DEFAULT_SPEC_THICKNESS_UM: i32 = 40;
/// Marker stored in `info` of auto-provisioned specifications.
pub const AUTO_PROVISIONED_INFO: &str = "Created automatically by job assembly";

/// The two shared specification catalogs. Both have the same record shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecKind {
    Tape,
    Report,
}

impl SpecKind {
    pub fn label(self) -> &'static str {
        match self {
            SpecKind::Tape => "TapeSpec",
            SpecKind::Report => "ReportSpec",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            SpecKind::Tape => "tape_specs",
            SpecKind::Report => "report_specs",
        }
    }
}

/// A persisted TapeSpec or ReportSpec catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSpec {
    pub id: Id,
    pub name: String,
    #[serde(rename = "type")]
    pub spec_type: Option<String>,
    pub thickness_micrometers: Option<i32>,
    pub info: Option<String>,
}

impl PartialEq for CatalogSpec {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl CatalogSpec {
    /// Full replace of every editable field.
    pub fn apply(&mut self, fields: NewSpec) {
        self.name = fields.name;
        self.spec_type = fields.spec_type;
        self.thickness_micrometers = fields.thickness_micrometers;
        self.info = fields.info;
    }
}

/// Validated field set for creating or replacing a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSpec {
    pub name: String,
    pub spec_type: Option<String>,
    pub thickness_micrometers: Option<i32>,
    pub info: Option<String>,
}

impl NewSpec {
    pub fn with_id(self, id: Id) -> CatalogSpec {
        CatalogSpec {
            id,
            name: self.name,
            spec_type: self.spec_type,
            thickness_micrometers: self.thickness_micrometers,
            info: self.info,
        }
    }

    /// Placeholder TapeSpec for an assembled cylinder without a usable spec id.
    pub fn default_tape_spec(cylinder_nr: i32) -> Self {
        Self {
            name: format!("Auto-generated TapeSpec for cylinder {}", cylinder_nr),
            spec_type: None,
            thickness_micrometers: Some(DEFAULT_SPEC_THICKNESS_UM),
            info: Some(AUTO_PROVISIONED_INFO.to_string()),
        }
    }

    /// Placeholder ReportSpec for an assembled report without a usable spec id.
    pub fn default_report_spec(report_nr: i32) -> Self {
        Self {
            name: format!("Auto-generated ReportSpec for report {}", report_nr),
            spec_type: None,
            thickness_micrometers: Some(DEFAULT_SPEC_THICKNESS_UM),
            info: Some(AUTO_PROVISIONED_INFO.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecRequest {
    #[serde(default)]
    pub name: Field<String>,
    #[serde(rename = "type")]
    pub spec_type: Option<String>,
    pub thickness_micrometers: Option<i32>,
    pub info: Option<String>,
}
