use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::AggregateError;
use crate::model::{Cylinder, Field, Id};

/// Row shape of the `jobs` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct JobRecord {
    pub id: Id,
    pub job_number: Option<String>,
    pub job_date: NaiveDateTime,
    pub job_name: Option<String>,
    pub cylinder_width: Option<i32>,
    pub cylinder_circumference: Option<i32>,
    pub info: Option<String>,
}

/// Row shape of the `notes` table. Shares the job's primary key.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct NoteRecord {
    pub job_id: Id,
    pub content: String,
}

/// Validated editable fields of a job, including the optional note text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFields {
    pub job_number: Option<String>,
    pub job_date: NaiveDateTime,
    pub job_name: Option<String>,
    pub cylinder_width: Option<i32>,
    pub cylinder_circumference: Option<i32>,
    pub info: Option<String>,
    pub note: Option<String>,
}

/// Free-text note attached to exactly one job.
#[derive(Debug, Clone)]
pub struct Note {
    job_id: Option<Id>,
    pub content: String,
}

impl Note {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            job_id: None,
            content: content.into(),
        }
    }

    pub fn job_id(&self) -> Option<Id> {
        self.job_id
    }
}

impl PartialEq for Note {
    fn eq(&self, other: &Self) -> bool {
        matches!((self.job_id, other.job_id), (Some(a), Some(b)) if a == b)
    }
}

/// Aggregate root of a print job.
#[derive(Debug, Clone)]
pub struct Job {
    id: Option<Id>,
    pub job_number: Option<String>,
    pub job_date: NaiveDateTime,
    pub job_name: Option<String>,
    pub cylinder_width: Option<i32>,
    pub cylinder_circumference: Option<i32>,
    pub info: Option<String>,
    note: Option<Note>,
    cylinders: Vec<Cylinder>,
}

impl Job {
    pub fn new(job_date: NaiveDateTime) -> Self {
        Self {
            id: None,
            job_number: None,
            job_date,
            job_name: None,
            cylinder_width: None,
            cylinder_circumference: None,
            info: None,
            note: None,
            cylinders: Vec::new(),
        }
    }

    pub fn from_fields(fields: JobFields) -> Self {
        let mut job = Self::new(fields.job_date);
        job.apply(fields);
        job
    }

    pub fn id(&self) -> Option<Id> {
        self.id
    }

    /// Record the generated primary key; an attached note adopts it.
    pub fn mark_persisted(&mut self, id: Id) {
        self.id = Some(id);
        if let Some(note) = &mut self.note {
            note.job_id = Some(id);
        }
    }

    /// Full replace of every editable field. Blank note text clears the note.
    pub fn apply(&mut self, fields: JobFields) -> Option<Note> {
        self.job_number = fields.job_number;
        self.job_date = fields.job_date;
        self.job_name = fields.job_name;
        self.cylinder_width = fields.cylinder_width;
        self.cylinder_circumference = fields.cylinder_circumference;
        self.info = fields.info;

        let note = fields
            .note
            .filter(|content| !content.trim().is_empty())
            .map(Note::new);
        self.set_note(note)
    }

    pub fn note(&self) -> Option<&Note> {
        self.note.as_ref()
    }

    /// Replace or clear the note. The previous note, if any, is returned detached.
    pub fn set_note(&mut self, note: Option<Note>) -> Option<Note> {
        let previous = self.note.take().map(|mut old| {
            old.job_id = None;
            old
        });

        if let Some(mut note) = note {
            note.job_id = self.id;
            self.note = Some(note);
        }

        previous
    }

    pub fn cylinders(&self) -> &[Cylinder] {
        &self.cylinders
    }

    pub fn cylinder(&self, cylinder_id: Id) -> Option<&Cylinder> {
        self.cylinders.iter().find(|c| c.id() == Some(cylinder_id))
    }

    pub fn cylinder_mut(&mut self, cylinder_id: Id) -> Option<&mut Cylinder> {
        self.cylinders.iter_mut().find(|c| c.id() == Some(cylinder_id))
    }

    /// Attach `cylinder` to this job.
    ///
    /// A cylinder that is already in the collection is refreshed in place
    /// rather than appended twice. A cylinder owned by another job is rejected;
    /// it has to be removed from that job first.
    pub fn add_cylinder(&mut self, mut cylinder: Cylinder) -> Result<&mut Cylinder, AggregateError> {
        let job_id = self.id.ok_or(AggregateError::UnsavedParent {
            parent: "job",
            child: "cylinder",
        })?;

        if let Some(owner) = cylinder.job_id {
            if owner != job_id {
                return Err(AggregateError::AlreadyAttached {
                    child: "cylinder",
                    parent: "job",
                    owner,
                });
            }
        }

        cylinder.job_id = Some(job_id);
        let index = match self.cylinders.iter().position(|c| *c == cylinder) {
            Some(index) => {
                self.cylinders[index] = cylinder;
                index
            }
            None => {
                self.cylinders.push(cylinder);
                self.cylinders.len() - 1
            }
        };

        Ok(&mut self.cylinders[index])
    }

    /// Detach the cylinder with `cylinder_id`, returning it (with its reports)
    /// for deletion.
    pub fn remove_cylinder(&mut self, cylinder_id: Id) -> Option<Cylinder> {
        let index = self.cylinders.iter().position(|c| c.id() == Some(cylinder_id))?;
        let mut cylinder = self.cylinders.remove(index);
        if cylinder.job_id.is_some() && cylinder.job_id == self.id {
            cylinder.job_id = None;
        }
        Some(cylinder)
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        matches!((self.id, other.id), (Some(a), Some(b)) if a == b)
    }
}

impl From<JobRecord> for Job {
    fn from(record: JobRecord) -> Self {
        let mut job = Job::new(record.job_date);
        job.id = Some(record.id);
        job.job_number = record.job_number;
        job.job_name = record.job_name;
        job.cylinder_width = record.cylinder_width;
        job.cylinder_circumference = record.cylinder_circumference;
        job.info = record.info;
        job
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequest {
    pub job_number: Option<String>,
    #[serde(default)]
    pub job_date: Field<String>,
    pub job_name: Option<String>,
    pub cylinder_width: Option<i32>,
    pub cylinder_circumference: Option<i32>,
    pub info: Option<String>,
    pub note_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResponse {
    pub id: Option<Id>,
    pub job_number: Option<String>,
    pub job_date: NaiveDateTime,
    pub job_name: Option<String>,
    pub cylinder_width: Option<i32>,
    pub cylinder_circumference: Option<i32>,
    pub info: Option<String>,
    pub note_info: Option<String>,
}

impl From<&Job> for JobResponse {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            job_number: job.job_number.clone(),
            job_date: job.job_date,
            job_name: job.job_name.clone(),
            cylinder_width: job.cylinder_width,
            cylinder_circumference: job.cylinder_circumference,
            info: job.info.clone(),
            note_info: job.note.as_ref().map(|note| note.content.clone()),
        }
    }
}
