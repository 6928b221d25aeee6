use crate::error::{ServiceError, ServiceResult};
use crate::logic::{validate, CylinderOperations};
use crate::model::{Id, Job, JobFields, JobRequest, JobResponse, UserContext};
use crate::store::{Store, StoreTx};

/// Job aggregate operations. Each public operation runs in one transaction.
pub struct JobOperations;

impl JobOperations {
    pub async fn create<S: Store + ?Sized>(
        store: &S,
        user: &UserContext,
        request: JobRequest,
    ) -> ServiceResult<JobResponse> {
        let fields = validate::job_fields(request)?;

        let mut tx = store.begin().await?;
        let job = Self::create_in(tx.as_mut(), fields).await?;
        tx.commit().await?;

        log::info!("User {} created job {:?}", user.user_id, job.id());
        Ok(JobResponse::from(&job))
    }

    /// Insert the job header and its note without committing.
    pub(crate) async fn create_in(tx: &mut dyn StoreTx, fields: JobFields) -> ServiceResult<Job> {
        let mut job = Job::from_fields(fields);
        let id = tx.insert_job(&job).await?;
        job.mark_persisted(id);

        if let Some(note) = job.note() {
            tx.save_note(note).await?;
        }

        Ok(job)
    }

    pub async fn get<S: Store + ?Sized>(store: &S, id: Id) -> ServiceResult<JobResponse> {
        let mut tx = store.begin().await?;
        let job = Self::load(tx.as_mut(), id).await?;
        Ok(JobResponse::from(&job))
    }

    pub async fn list<S: Store + ?Sized>(store: &S) -> ServiceResult<Vec<JobResponse>> {
        let mut tx = store.begin().await?;
        let jobs = tx.list_jobs().await?;
        Ok(jobs.iter().map(JobResponse::from).collect())
    }

    /// Full replace of the job's fields. A missing or blank `noteInfo`
    /// removes the current note.
    pub async fn update<S: Store + ?Sized>(
        store: &S,
        user: &UserContext,
        id: Id,
        request: JobRequest,
    ) -> ServiceResult<JobResponse> {
        let fields = validate::job_fields(request)?;

        let mut tx = store.begin().await?;
        let mut job = Self::load(tx.as_mut(), id).await?;
        let previous_note = job.apply(fields);
        tx.update_job(&job).await?;

        match job.note() {
            Some(note) => tx.save_note(note).await?,
            None if previous_note.is_some() => {
                tx.delete_note(id).await?;
            }
            None => {}
        }
        tx.commit().await?;

        log::info!("User {} updated job {}", user.user_id, id);
        Ok(JobResponse::from(&job))
    }

    /// Delete the job together with its note, cylinders and their reports.
    pub async fn delete<S: Store + ?Sized>(
        store: &S,
        user: &UserContext,
        id: Id,
    ) -> ServiceResult<()> {
        let mut tx = store.begin().await?;
        let mut job = Self::load(tx.as_mut(), id).await?;
        Self::load_children(tx.as_mut(), &mut job).await?;

        let cylinder_ids: Vec<Id> = job.cylinders().iter().filter_map(|c| c.id()).collect();
        for cylinder_id in &cylinder_ids {
            CylinderOperations::delete_in(tx.as_mut(), &mut job, *cylinder_id).await?;
        }

        if job.set_note(None).is_some() {
            tx.delete_note(id).await?;
        }
        tx.delete_job(id).await?;
        tx.commit().await?;

        log::info!(
            "User {} deleted job {} with {} cylinder(s)",
            user.user_id,
            id,
            cylinder_ids.len()
        );
        Ok(())
    }

    pub(crate) async fn load(tx: &mut dyn StoreTx, id: Id) -> ServiceResult<Job> {
        tx.get_job(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Job", id))
    }

    /// Attach every persisted cylinder, and each cylinder's reports, to `job`.
    pub(crate) async fn load_children(tx: &mut dyn StoreTx, job: &mut Job) -> ServiceResult<()> {
        let Some(job_id) = job.id() else {
            return Ok(());
        };

        for cylinder in tx.list_cylinders_by_job(job_id).await? {
            let reports = match cylinder.id() {
                Some(cylinder_id) => tx.list_reports_by_cylinder(cylinder_id).await?,
                None => Vec::new(),
            };
            let attached = job.add_cylinder(cylinder)?;
            for report in reports {
                attached.add_report(report)?;
            }
        }

        Ok(())
    }
}
