use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use std::collections::HashMap;

use crate::model::{
    CatalogSpec, Cylinder, CylinderRecord, Id, Job, JobRecord, NewSpec, Note, NoteRecord, Report,
    ReportRecord, SpecKind,
};
use crate::store::traits::{CylinderStore, JobStore, ReportStore, SpecStore, Store, StoreTx};
use crate::store::{StoreError, StoreResult};

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Run the embedded schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait::async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTx>> {
        let tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;
        Ok(Box::new(PgTx { tx }))
    }
}

/// A PostgreSQL transaction. Rolled back by sqlx when dropped uncommitted.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

/// Translate a failed write, keeping constraint violations distinguishable.
fn write_error(error: sqlx::Error, what: &'static str) -> StoreError {
    if let sqlx::Error::Database(db_error) = &error {
        let constraint = db_error.constraint().unwrap_or_default().to_string();
        if db_error.is_unique_violation() {
            return StoreError::UniqueViolation { constraint };
        }
        if db_error.is_foreign_key_violation() {
            return StoreError::ForeignKeyViolation { constraint };
        }
    }
    StoreError::Backend(anyhow::Error::new(error).context(what))
}

fn job_with_note(record: JobRecord, note: Option<NoteRecord>) -> Job {
    let mut job = Job::from(record);
    if let Some(note) = note {
        job.set_note(Some(Note::new(note.content)));
    }
    job
}

const JOB_COLUMNS: &str =
    "id, job_number, job_date, job_name, cylinder_width, cylinder_circumference, info";
const CYLINDER_COLUMNS: &str = "id, cylinder_nr, color, cylinder_info, job_id, tape_spec_id";
const REPORT_COLUMNS: &str =
    "id, report_nr, report_width, x_offset, y_offset, cylinder_id, report_spec_id";
const SPEC_COLUMNS: &str = "id, name, spec_type, thickness_micrometers, info";

#[async_trait::async_trait]
impl JobStore for PgTx {
    async fn get_job(&mut self, id: Id) -> StoreResult<Option<Job>> {
        let record = sqlx::query_as::<_, JobRecord>(&format!(
            "SELECT {} FROM jobs WHERE id = $1",
            JOB_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to fetch job")?;

        let Some(record) = record else {
            return Ok(None);
        };

        let note = sqlx::query_as::<_, NoteRecord>("SELECT job_id, content FROM notes WHERE job_id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await
            .context("Failed to fetch note")?;

        Ok(Some(job_with_note(record, note)))
    }

    async fn list_jobs(&mut self) -> StoreResult<Vec<Job>> {
        let records = sqlx::query_as::<_, JobRecord>(&format!(
            "SELECT {} FROM jobs ORDER BY id",
            JOB_COLUMNS
        ))
        .fetch_all(&mut *self.tx)
        .await
        .context("Failed to list jobs")?;

        let mut notes: HashMap<Id, NoteRecord> =
            sqlx::query_as::<_, NoteRecord>("SELECT job_id, content FROM notes")
                .fetch_all(&mut *self.tx)
                .await
                .context("Failed to list notes")?
                .into_iter()
                .map(|note| (note.job_id, note))
                .collect();

        Ok(records
            .into_iter()
            .map(|record| {
                let note = notes.remove(&record.id);
                job_with_note(record, note)
            })
            .collect())
    }

    async fn job_exists(&mut self, id: Id) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM jobs WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *self.tx)
            .await
            .context("Failed to check job")?;
        Ok(exists)
    }

    async fn insert_job(&mut self, job: &Job) -> StoreResult<Id> {
        sqlx::query_scalar::<_, Id>(
            r#"
            INSERT INTO jobs (job_number, job_date, job_name, cylinder_width, cylinder_circumference, info)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&job.job_number)
        .bind(job.job_date)
        .bind(&job.job_name)
        .bind(job.cylinder_width)
        .bind(job.cylinder_circumference)
        .bind(&job.info)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, "Failed to insert job"))
    }

    async fn update_job(&mut self, job: &Job) -> StoreResult<()> {
        let id = job.id().ok_or(StoreError::Detached { entity: "job" })?;
        sqlx::query(
            r#"
            UPDATE jobs SET
                job_number = $2,
                job_date = $3,
                job_name = $4,
                cylinder_width = $5,
                cylinder_circumference = $6,
                info = $7
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&job.job_number)
        .bind(job.job_date)
        .bind(&job.job_name)
        .bind(job.cylinder_width)
        .bind(job.cylinder_circumference)
        .bind(&job.info)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, "Failed to update job"))?;

        Ok(())
    }

    async fn delete_job(&mut self, id: Id) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| write_error(e, "Failed to delete job"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn save_note(&mut self, note: &Note) -> StoreResult<()> {
        let job_id = note.job_id().ok_or(StoreError::Detached { entity: "note" })?;
        sqlx::query(
            r#"
            INSERT INTO notes (job_id, content)
            VALUES ($1, $2)
            ON CONFLICT (job_id) DO UPDATE SET content = EXCLUDED.content
            "#,
        )
        .bind(job_id)
        .bind(&note.content)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, "Failed to save note"))?;

        Ok(())
    }

    async fn delete_note(&mut self, job_id: Id) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM notes WHERE job_id = $1")
            .bind(job_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| write_error(e, "Failed to delete note"))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl CylinderStore for PgTx {
    async fn get_cylinder(&mut self, id: Id) -> StoreResult<Option<Cylinder>> {
        let record = sqlx::query_as::<_, CylinderRecord>(&format!(
            "SELECT {} FROM cylinders WHERE id = $1",
            CYLINDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to fetch cylinder")?;

        Ok(record.map(Cylinder::from))
    }

    async fn find_cylinder_in_job(&mut self, job_id: Id, cylinder_id: Id) -> StoreResult<Option<Cylinder>> {
        let record = sqlx::query_as::<_, CylinderRecord>(&format!(
            "SELECT {} FROM cylinders WHERE id = $1 AND job_id = $2",
            CYLINDER_COLUMNS
        ))
        .bind(cylinder_id)
        .bind(job_id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to fetch cylinder for job")?;

        Ok(record.map(Cylinder::from))
    }

    async fn list_cylinders_by_job(&mut self, job_id: Id) -> StoreResult<Vec<Cylinder>> {
        let records = sqlx::query_as::<_, CylinderRecord>(&format!(
            "SELECT {} FROM cylinders WHERE job_id = $1 ORDER BY cylinder_nr, id",
            CYLINDER_COLUMNS
        ))
        .bind(job_id)
        .fetch_all(&mut *self.tx)
        .await
        .context("Failed to list cylinders")?;

        Ok(records.into_iter().map(Cylinder::from).collect())
    }

    async fn cylinder_nr_exists(&mut self, job_id: Id, cylinder_nr: i32) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM cylinders WHERE job_id = $1 AND cylinder_nr = $2)",
        )
        .bind(job_id)
        .bind(cylinder_nr)
        .fetch_one(&mut *self.tx)
        .await
        .context("Failed to check cylinder number")?;
        Ok(exists)
    }

    async fn tape_spec_in_use(&mut self, tape_spec_id: Id) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM cylinders WHERE tape_spec_id = $1)",
        )
        .bind(tape_spec_id)
        .fetch_one(&mut *self.tx)
        .await
        .context("Failed to check tape spec usage")?;
        Ok(exists)
    }

    async fn insert_cylinder(&mut self, cylinder: &Cylinder) -> StoreResult<Id> {
        let job_id = cylinder.job_id().ok_or(StoreError::Detached { entity: "cylinder" })?;
        sqlx::query_scalar::<_, Id>(
            r#"
            INSERT INTO cylinders (cylinder_nr, color, cylinder_info, job_id, tape_spec_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(cylinder.cylinder_nr)
        .bind(&cylinder.color)
        .bind(&cylinder.cylinder_info)
        .bind(job_id)
        .bind(cylinder.tape_spec_id())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, "Failed to insert cylinder"))
    }

    async fn update_cylinder(&mut self, cylinder: &Cylinder) -> StoreResult<()> {
        let id = cylinder.id().ok_or(StoreError::Detached { entity: "cylinder" })?;
        let job_id = cylinder.job_id().ok_or(StoreError::Detached { entity: "cylinder" })?;
        sqlx::query(
            r#"
            UPDATE cylinders SET
                cylinder_nr = $2,
                color = $3,
                cylinder_info = $4,
                job_id = $5,
                tape_spec_id = $6
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(cylinder.cylinder_nr)
        .bind(&cylinder.color)
        .bind(&cylinder.cylinder_info)
        .bind(job_id)
        .bind(cylinder.tape_spec_id())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, "Failed to update cylinder"))?;

        Ok(())
    }

    async fn delete_cylinder(&mut self, id: Id) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM cylinders WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| write_error(e, "Failed to delete cylinder"))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl ReportStore for PgTx {
    async fn get_report(&mut self, id: Id) -> StoreResult<Option<Report>> {
        let record = sqlx::query_as::<_, ReportRecord>(&format!(
            "SELECT {} FROM reports WHERE id = $1",
            REPORT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .context("Failed to fetch report")?;

        Ok(record.map(Report::from))
    }

    async fn list_reports_by_cylinder(&mut self, cylinder_id: Id) -> StoreResult<Vec<Report>> {
        let records = sqlx::query_as::<_, ReportRecord>(&format!(
            "SELECT {} FROM reports WHERE cylinder_id = $1 ORDER BY report_nr, id",
            REPORT_COLUMNS
        ))
        .bind(cylinder_id)
        .fetch_all(&mut *self.tx)
        .await
        .context("Failed to list reports")?;

        Ok(records.into_iter().map(Report::from).collect())
    }

    async fn report_nr_exists(&mut self, cylinder_id: Id, report_nr: i32) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM reports WHERE cylinder_id = $1 AND report_nr = $2)",
        )
        .bind(cylinder_id)
        .bind(report_nr)
        .fetch_one(&mut *self.tx)
        .await
        .context("Failed to check report number")?;
        Ok(exists)
    }

    async fn report_spec_in_use(&mut self, report_spec_id: Id) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM reports WHERE report_spec_id = $1)",
        )
        .bind(report_spec_id)
        .fetch_one(&mut *self.tx)
        .await
        .context("Failed to check report spec usage")?;
        Ok(exists)
    }

    async fn insert_report(&mut self, report: &Report) -> StoreResult<Id> {
        let cylinder_id = report.cylinder_id().ok_or(StoreError::Detached { entity: "report" })?;
        sqlx::query_scalar::<_, Id>(
            r#"
            INSERT INTO reports (report_nr, report_width, x_offset, y_offset, cylinder_id, report_spec_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(report.report_nr)
        .bind(report.report_width)
        .bind(report.x_offset)
        .bind(report.y_offset)
        .bind(cylinder_id)
        .bind(report.report_spec_id())
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, "Failed to insert report"))
    }

    async fn update_report(&mut self, report: &Report) -> StoreResult<()> {
        let id = report.id().ok_or(StoreError::Detached { entity: "report" })?;
        let cylinder_id = report.cylinder_id().ok_or(StoreError::Detached { entity: "report" })?;
        sqlx::query(
            r#"
            UPDATE reports SET
                report_nr = $2,
                report_width = $3,
                x_offset = $4,
                y_offset = $5,
                cylinder_id = $6,
                report_spec_id = $7
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(report.report_nr)
        .bind(report.report_width)
        .bind(report.x_offset)
        .bind(report.y_offset)
        .bind(cylinder_id)
        .bind(report.report_spec_id())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, "Failed to update report"))?;

        Ok(())
    }

    async fn delete_report(&mut self, id: Id) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM reports WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| write_error(e, "Failed to delete report"))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl SpecStore for PgTx {
    async fn get_spec(&mut self, kind: SpecKind, id: Id) -> StoreResult<Option<CatalogSpec>> {
        let spec = sqlx::query_as::<_, CatalogSpec>(&format!(
            "SELECT {} FROM {} WHERE id = $1",
            SPEC_COLUMNS,
            kind.table()
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await
        .with_context(|| format!("Failed to fetch {}", kind.label()))?;

        Ok(spec)
    }

    async fn list_specs(&mut self, kind: SpecKind) -> StoreResult<Vec<CatalogSpec>> {
        let specs = sqlx::query_as::<_, CatalogSpec>(&format!(
            "SELECT {} FROM {} ORDER BY id",
            SPEC_COLUMNS,
            kind.table()
        ))
        .fetch_all(&mut *self.tx)
        .await
        .with_context(|| format!("Failed to list {}s", kind.label()))?;

        Ok(specs)
    }

    async fn spec_exists(&mut self, kind: SpecKind, id: Id) -> StoreResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
            kind.table()
        ))
        .bind(id)
        .fetch_one(&mut *self.tx)
        .await
        .with_context(|| format!("Failed to check {}", kind.label()))?;
        Ok(exists)
    }

    async fn insert_spec(&mut self, kind: SpecKind, spec: &NewSpec) -> StoreResult<CatalogSpec> {
        let id = sqlx::query_scalar::<_, Id>(&format!(
            "INSERT INTO {} (name, spec_type, thickness_micrometers, info) VALUES ($1, $2, $3, $4) RETURNING id",
            kind.table()
        ))
        .bind(&spec.name)
        .bind(&spec.spec_type)
        .bind(spec.thickness_micrometers)
        .bind(&spec.info)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, "Failed to insert specification"))?;

        Ok(spec.clone().with_id(id))
    }

    async fn update_spec(&mut self, kind: SpecKind, spec: &CatalogSpec) -> StoreResult<()> {
        sqlx::query(&format!(
            "UPDATE {} SET name = $2, spec_type = $3, thickness_micrometers = $4, info = $5 WHERE id = $1",
            kind.table()
        ))
        .bind(spec.id)
        .bind(&spec.name)
        .bind(&spec.spec_type)
        .bind(spec.thickness_micrometers)
        .bind(&spec.info)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| write_error(e, "Failed to update specification"))?;

        Ok(())
    }

    async fn delete_spec(&mut self, kind: SpecKind, id: Id) -> StoreResult<bool> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", kind.table()))
            .bind(id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| write_error(e, "Failed to delete specification"))?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl StoreTx for PgTx {
    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| write_error(e, "Failed to commit transaction"))
    }
}
