use crate::model::{CatalogSpec, Cylinder, Id, Job, NewSpec, Note, Report, SpecKind};
use crate::store::StoreResult;

#[async_trait::async_trait]
pub trait JobStore: Send {
    /// Load the job header together with its note. Cylinders are not loaded.
    async fn get_job(&mut self, id: Id) -> StoreResult<Option<Job>>;
    async fn list_jobs(&mut self) -> StoreResult<Vec<Job>>;
    async fn job_exists(&mut self, id: Id) -> StoreResult<bool>;
    /// Insert the job header and return the generated id. The note is saved separately.
    async fn insert_job(&mut self, job: &Job) -> StoreResult<Id>;
    async fn update_job(&mut self, job: &Job) -> StoreResult<()>;
    async fn delete_job(&mut self, id: Id) -> StoreResult<bool>;
    /// Insert or replace the note keyed by its job id.
    async fn save_note(&mut self, note: &Note) -> StoreResult<()>;
    async fn delete_note(&mut self, job_id: Id) -> StoreResult<bool>;
}

#[async_trait::async_trait]
pub trait CylinderStore: Send {
    async fn get_cylinder(&mut self, id: Id) -> StoreResult<Option<Cylinder>>;
    async fn find_cylinder_in_job(&mut self, job_id: Id, cylinder_id: Id) -> StoreResult<Option<Cylinder>>;
    /// Cylinders of a job ordered by cylinder number.
    async fn list_cylinders_by_job(&mut self, job_id: Id) -> StoreResult<Vec<Cylinder>>;
    async fn cylinder_nr_exists(&mut self, job_id: Id, cylinder_nr: i32) -> StoreResult<bool>;
    async fn tape_spec_in_use(&mut self, tape_spec_id: Id) -> StoreResult<bool>;
    async fn insert_cylinder(&mut self, cylinder: &Cylinder) -> StoreResult<Id>;
    async fn update_cylinder(&mut self, cylinder: &Cylinder) -> StoreResult<()>;
    async fn delete_cylinder(&mut self, id: Id) -> StoreResult<bool>;
}

#[async_trait::async_trait]
pub trait ReportStore: Send {
    async fn get_report(&mut self, id: Id) -> StoreResult<Option<Report>>;
    /// Reports of a cylinder ordered by report number.
    async fn list_reports_by_cylinder(&mut self, cylinder_id: Id) -> StoreResult<Vec<Report>>;
    async fn report_nr_exists(&mut self, cylinder_id: Id, report_nr: i32) -> StoreResult<bool>;
    async fn report_spec_in_use(&mut self, report_spec_id: Id) -> StoreResult<bool>;
    async fn insert_report(&mut self, report: &Report) -> StoreResult<Id>;
    async fn update_report(&mut self, report: &Report) -> StoreResult<()>;
    async fn delete_report(&mut self, id: Id) -> StoreResult<bool>;
}

/// TapeSpec and ReportSpec catalogs, selected by [`SpecKind`].
#[async_trait::async_trait]
pub trait SpecStore: Send {
    async fn get_spec(&mut self, kind: SpecKind, id: Id) -> StoreResult<Option<CatalogSpec>>;
    async fn list_specs(&mut self, kind: SpecKind) -> StoreResult<Vec<CatalogSpec>>;
    async fn spec_exists(&mut self, kind: SpecKind, id: Id) -> StoreResult<bool>;
    async fn insert_spec(&mut self, kind: SpecKind, spec: &NewSpec) -> StoreResult<CatalogSpec>;
    async fn update_spec(&mut self, kind: SpecKind, spec: &CatalogSpec) -> StoreResult<()>;
    async fn delete_spec(&mut self, kind: SpecKind, id: Id) -> StoreResult<bool>;
}

/// One unit of work. Dropping it without [`StoreTx::commit`] discards every write.
#[async_trait::async_trait]
pub trait StoreTx: JobStore + CylinderStore + ReportStore + SpecStore + Send {
    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

#[async_trait::async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>>;
}
