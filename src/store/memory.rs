use itertools::Itertools;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::model::{
    CatalogSpec, Cylinder, CylinderRecord, Id, Job, JobRecord, NewSpec, Note, NoteRecord, Report,
    ReportRecord, SpecKind,
};
use crate::store::traits::{CylinderStore, JobStore, ReportStore, SpecStore, Store, StoreTx};
use crate::store::{StoreError, StoreResult, UK_CYLINDER_JOB_NR, UK_REPORT_CYLINDER_NR};

const FK_NOTE_JOB: &str = "notes_job_id_fkey";
const FK_CYLINDER_JOB: &str = "cylinders_job_id_fkey";
const FK_CYLINDER_TAPE_SPEC: &str = "cylinders_tape_spec_id_fkey";
const FK_REPORT_CYLINDER: &str = "reports_cylinder_id_fkey";
const FK_REPORT_REPORT_SPEC: &str = "reports_report_spec_id_fkey";

#[derive(Debug, Clone, Default)]
struct MemoryState {
    last_id: Id,
    jobs: BTreeMap<Id, JobRecord>,
    notes: BTreeMap<Id, NoteRecord>,
    cylinders: BTreeMap<Id, CylinderRecord>,
    reports: BTreeMap<Id, ReportRecord>,
    tape_specs: BTreeMap<Id, CatalogSpec>,
    report_specs: BTreeMap<Id, CatalogSpec>,
}

impl MemoryState {
    fn next_id(&mut self) -> Id {
        self.last_id += 1;
        self.last_id
    }

    fn specs(&self, kind: SpecKind) -> &BTreeMap<Id, CatalogSpec> {
        match kind {
            SpecKind::Tape => &self.tape_specs,
            SpecKind::Report => &self.report_specs,
        }
    }

    fn specs_mut(&mut self, kind: SpecKind) -> &mut BTreeMap<Id, CatalogSpec> {
        match kind {
            SpecKind::Tape => &mut self.tape_specs,
            SpecKind::Report => &mut self.report_specs,
        }
    }

    fn check_cylinder(&self, record: &CylinderRecord) -> StoreResult<()> {
        if !self.jobs.contains_key(&record.job_id) {
            return Err(foreign_key(FK_CYLINDER_JOB));
        }
        if !self.tape_specs.contains_key(&record.tape_spec_id) {
            return Err(foreign_key(FK_CYLINDER_TAPE_SPEC));
        }
        let taken = self.cylinders.values().any(|c| {
            c.id != record.id && c.job_id == record.job_id && c.cylinder_nr == record.cylinder_nr
        });
        if taken {
            return Err(StoreError::UniqueViolation {
                constraint: UK_CYLINDER_JOB_NR.to_string(),
            });
        }
        Ok(())
    }

    fn check_report(&self, record: &ReportRecord) -> StoreResult<()> {
        if !self.cylinders.contains_key(&record.cylinder_id) {
            return Err(foreign_key(FK_REPORT_CYLINDER));
        }
        if !self.report_specs.contains_key(&record.report_spec_id) {
            return Err(foreign_key(FK_REPORT_REPORT_SPEC));
        }
        let taken = self.reports.values().any(|r| {
            r.id != record.id
                && r.cylinder_id == record.cylinder_id
                && r.report_nr == record.report_nr
        });
        if taken {
            return Err(StoreError::UniqueViolation {
                constraint: UK_REPORT_CYLINDER_NR.to_string(),
            });
        }
        Ok(())
    }
}

fn foreign_key(constraint: &str) -> StoreError {
    StoreError::ForeignKeyViolation {
        constraint: constraint.to_string(),
    }
}

fn job_record(id: Id, job: &Job) -> JobRecord {
    JobRecord {
        id,
        job_number: job.job_number.clone(),
        job_date: job.job_date,
        job_name: job.job_name.clone(),
        cylinder_width: job.cylinder_width,
        cylinder_circumference: job.cylinder_circumference,
        info: job.info.clone(),
    }
}

fn cylinder_record(id: Id, cylinder: &Cylinder) -> StoreResult<CylinderRecord> {
    Ok(CylinderRecord {
        id,
        cylinder_nr: cylinder.cylinder_nr,
        color: cylinder.color.clone(),
        cylinder_info: cylinder.cylinder_info.clone(),
        job_id: cylinder.job_id().ok_or(StoreError::Detached { entity: "cylinder" })?,
        tape_spec_id: cylinder.tape_spec_id(),
    })
}

fn report_record(id: Id, report: &Report) -> StoreResult<ReportRecord> {
    Ok(ReportRecord {
        id,
        report_nr: report.report_nr,
        report_width: report.report_width,
        x_offset: report.x_offset,
        y_offset: report.y_offset,
        cylinder_id: report.cylinder_id().ok_or(StoreError::Detached { entity: "report" })?,
        report_spec_id: report.report_spec_id(),
    })
}

fn load_job(record: &JobRecord, note: Option<&NoteRecord>) -> Job {
    let mut job = Job::from(record.clone());
    if let Some(note) = note {
        job.set_note(Some(Note::new(note.content.clone())));
    }
    job
}

/// Process-local store with the same constraint behaviour as the
/// PostgreSQL schema. Transactions are serialized.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryTx { guard, work }))
    }
}

/// Writes go to a private copy that replaces the shared state on commit.
pub struct MemoryTx {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
}

#[async_trait::async_trait]
impl JobStore for MemoryTx {
    async fn get_job(&mut self, id: Id) -> StoreResult<Option<Job>> {
        Ok(self
            .work
            .jobs
            .get(&id)
            .map(|record| load_job(record, self.work.notes.get(&id))))
    }

    async fn list_jobs(&mut self) -> StoreResult<Vec<Job>> {
        Ok(self
            .work
            .jobs
            .values()
            .map(|record| load_job(record, self.work.notes.get(&record.id)))
            .collect())
    }

    async fn job_exists(&mut self, id: Id) -> StoreResult<bool> {
        Ok(self.work.jobs.contains_key(&id))
    }

    async fn insert_job(&mut self, job: &Job) -> StoreResult<Id> {
        let id = self.work.next_id();
        self.work.jobs.insert(id, job_record(id, job));
        Ok(id)
    }

    async fn update_job(&mut self, job: &Job) -> StoreResult<()> {
        let id = job.id().ok_or(StoreError::Detached { entity: "job" })?;
        if self.work.jobs.contains_key(&id) {
            self.work.jobs.insert(id, job_record(id, job));
        }
        Ok(())
    }

    async fn delete_job(&mut self, id: Id) -> StoreResult<bool> {
        if self.work.notes.contains_key(&id) {
            return Err(foreign_key(FK_NOTE_JOB));
        }
        if self.work.cylinders.values().any(|c| c.job_id == id) {
            return Err(foreign_key(FK_CYLINDER_JOB));
        }
        Ok(self.work.jobs.remove(&id).is_some())
    }

    async fn save_note(&mut self, note: &Note) -> StoreResult<()> {
        let job_id = note.job_id().ok_or(StoreError::Detached { entity: "note" })?;
        if !self.work.jobs.contains_key(&job_id) {
            return Err(foreign_key(FK_NOTE_JOB));
        }
        self.work.notes.insert(
            job_id,
            NoteRecord {
                job_id,
                content: note.content.clone(),
            },
        );
        Ok(())
    }

    async fn delete_note(&mut self, job_id: Id) -> StoreResult<bool> {
        Ok(self.work.notes.remove(&job_id).is_some())
    }
}

#[async_trait::async_trait]
impl CylinderStore for MemoryTx {
    async fn get_cylinder(&mut self, id: Id) -> StoreResult<Option<Cylinder>> {
        Ok(self.work.cylinders.get(&id).cloned().map(Cylinder::from))
    }

    async fn find_cylinder_in_job(&mut self, job_id: Id, cylinder_id: Id) -> StoreResult<Option<Cylinder>> {
        Ok(self
            .work
            .cylinders
            .get(&cylinder_id)
            .filter(|c| c.job_id == job_id)
            .cloned()
            .map(Cylinder::from))
    }

    async fn list_cylinders_by_job(&mut self, job_id: Id) -> StoreResult<Vec<Cylinder>> {
        Ok(self
            .work
            .cylinders
            .values()
            .filter(|c| c.job_id == job_id)
            .sorted_by_key(|c| (c.cylinder_nr, c.id))
            .cloned()
            .map(Cylinder::from)
            .collect())
    }

    async fn cylinder_nr_exists(&mut self, job_id: Id, cylinder_nr: i32) -> StoreResult<bool> {
        Ok(self
            .work
            .cylinders
            .values()
            .any(|c| c.job_id == job_id && c.cylinder_nr == cylinder_nr))
    }

    async fn tape_spec_in_use(&mut self, tape_spec_id: Id) -> StoreResult<bool> {
        Ok(self
            .work
            .cylinders
            .values()
            .any(|c| c.tape_spec_id == tape_spec_id))
    }

    async fn insert_cylinder(&mut self, cylinder: &Cylinder) -> StoreResult<Id> {
        let mut record = cylinder_record(0, cylinder)?;
        self.work.check_cylinder(&record)?;
        record.id = self.work.next_id();
        let id = record.id;
        self.work.cylinders.insert(id, record);
        Ok(id)
    }

    async fn update_cylinder(&mut self, cylinder: &Cylinder) -> StoreResult<()> {
        let id = cylinder.id().ok_or(StoreError::Detached { entity: "cylinder" })?;
        if !self.work.cylinders.contains_key(&id) {
            return Ok(());
        }
        let record = cylinder_record(id, cylinder)?;
        self.work.check_cylinder(&record)?;
        self.work.cylinders.insert(id, record);
        Ok(())
    }

    async fn delete_cylinder(&mut self, id: Id) -> StoreResult<bool> {
        if self.work.reports.values().any(|r| r.cylinder_id == id) {
            return Err(foreign_key(FK_REPORT_CYLINDER));
        }
        Ok(self.work.cylinders.remove(&id).is_some())
    }
}

#[async_trait::async_trait]
impl ReportStore for MemoryTx {
    async fn get_report(&mut self, id: Id) -> StoreResult<Option<Report>> {
        Ok(self.work.reports.get(&id).cloned().map(Report::from))
    }

    async fn list_reports_by_cylinder(&mut self, cylinder_id: Id) -> StoreResult<Vec<Report>> {
        Ok(self
            .work
            .reports
            .values()
            .filter(|r| r.cylinder_id == cylinder_id)
            .sorted_by_key(|r| (r.report_nr, r.id))
            .cloned()
            .map(Report::from)
            .collect())
    }

    async fn report_nr_exists(&mut self, cylinder_id: Id, report_nr: i32) -> StoreResult<bool> {
        Ok(self
            .work
            .reports
            .values()
            .any(|r| r.cylinder_id == cylinder_id && r.report_nr == report_nr))
    }

    async fn report_spec_in_use(&mut self, report_spec_id: Id) -> StoreResult<bool> {
        Ok(self
            .work
            .reports
            .values()
            .any(|r| r.report_spec_id == report_spec_id))
    }

    async fn insert_report(&mut self, report: &Report) -> StoreResult<Id> {
        let mut record = report_record(0, report)?;
        self.work.check_report(&record)?;
        record.id = self.work.next_id();
        let id = record.id;
        self.work.reports.insert(id, record);
        Ok(id)
    }

    async fn update_report(&mut self, report: &Report) -> StoreResult<()> {
        let id = report.id().ok_or(StoreError::Detached { entity: "report" })?;
        if !self.work.reports.contains_key(&id) {
            return Ok(());
        }
        let record = report_record(id, report)?;
        self.work.check_report(&record)?;
        self.work.reports.insert(id, record);
        Ok(())
    }

    async fn delete_report(&mut self, id: Id) -> StoreResult<bool> {
        Ok(self.work.reports.remove(&id).is_some())
    }
}

#[async_trait::async_trait]
impl SpecStore for MemoryTx {
    async fn get_spec(&mut self, kind: SpecKind, id: Id) -> StoreResult<Option<CatalogSpec>> {
        Ok(self.work.specs(kind).get(&id).cloned())
    }

    async fn list_specs(&mut self, kind: SpecKind) -> StoreResult<Vec<CatalogSpec>> {
        Ok(self.work.specs(kind).values().cloned().collect())
    }

    async fn spec_exists(&mut self, kind: SpecKind, id: Id) -> StoreResult<bool> {
        Ok(self.work.specs(kind).contains_key(&id))
    }

    async fn insert_spec(&mut self, kind: SpecKind, spec: &NewSpec) -> StoreResult<CatalogSpec> {
        let id = self.work.next_id();
        let spec = spec.clone().with_id(id);
        self.work.specs_mut(kind).insert(id, spec.clone());
        Ok(spec)
    }

    async fn update_spec(&mut self, kind: SpecKind, spec: &CatalogSpec) -> StoreResult<()> {
        if let Some(existing) = self.work.specs_mut(kind).get_mut(&spec.id) {
            *existing = spec.clone();
        }
        Ok(())
    }

    async fn delete_spec(&mut self, kind: SpecKind, id: Id) -> StoreResult<bool> {
        let referenced = match kind {
            SpecKind::Tape => self
                .work
                .cylinders
                .values()
                .any(|c| c.tape_spec_id == id)
                .then_some(FK_CYLINDER_TAPE_SPEC),
            SpecKind::Report => self
                .work
                .reports
                .values()
                .any(|r| r.report_spec_id == id)
                .then_some(FK_REPORT_REPORT_SPEC),
        };
        if let Some(constraint) = referenced {
            return Err(foreign_key(constraint));
        }
        Ok(self.work.specs_mut(kind).remove(&id).is_some())
    }
}

#[async_trait::async_trait]
impl StoreTx for MemoryTx {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}
