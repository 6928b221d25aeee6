use crate::error::{AggregateError, ServiceError, ServiceResult};
use crate::logic::{validate, JobOperations};
use crate::model::{
    Cylinder, CylinderFields, CylinderRequest, CylinderResponse, Id, Job, SpecKind, UserContext,
};
use crate::store::{Store, StoreTx};

/// Cylinder operations, always scoped to the owning job.
pub struct CylinderOperations;

impl CylinderOperations {
    pub async fn create<S: Store + ?Sized>(
        store: &S,
        user: &UserContext,
        job_id: Id,
        request: CylinderRequest,
    ) -> ServiceResult<CylinderResponse> {
        let fields = validate::cylinder_fields(request)?;

        let mut tx = store.begin().await?;
        let mut job = JobOperations::load(tx.as_mut(), job_id).await?;
        let cylinder = Self::attach(tx.as_mut(), &mut job, fields).await?;
        let response = CylinderResponse::from(&*cylinder);
        tx.commit().await?;

        log::info!(
            "User {} created cylinder {} in job {}",
            user.user_id,
            response.cylinder_nr,
            job_id
        );
        Ok(response)
    }

    /// Create a cylinder under a persisted `job` inside the open transaction.
    ///
    /// The TapeSpec must exist and the cylinder number must be free within the
    /// job. The store's unique index backs the number check against races.
    pub(crate) async fn attach<'a>(
        tx: &mut dyn StoreTx,
        job: &'a mut Job,
        fields: CylinderFields,
    ) -> ServiceResult<&'a mut Cylinder> {
        let job_id = job.id().ok_or(AggregateError::UnsavedParent {
            parent: "job",
            child: "cylinder",
        })?;

        if !tx.spec_exists(SpecKind::Tape, fields.tape_spec_id).await? {
            return Err(ServiceError::not_found("TapeSpec", fields.tape_spec_id));
        }
        if tx.cylinder_nr_exists(job_id, fields.cylinder_nr).await? {
            return Err(ServiceError::invalid(format!(
                "Cylinder number {} already exists within this job.",
                fields.cylinder_nr
            )));
        }

        let cylinder = job.add_cylinder(Cylinder::new(fields))?;
        let id = tx.insert_cylinder(cylinder).await?;
        cylinder.mark_persisted(id);
        Ok(cylinder)
    }

    pub async fn list<S: Store + ?Sized>(
        store: &S,
        job_id: Id,
    ) -> ServiceResult<Vec<CylinderResponse>> {
        let mut tx = store.begin().await?;
        if !tx.job_exists(job_id).await? {
            return Err(ServiceError::not_found("Job", job_id));
        }
        let cylinders = tx.list_cylinders_by_job(job_id).await?;
        Ok(cylinders.iter().map(CylinderResponse::from).collect())
    }

    pub async fn get<S: Store + ?Sized>(
        store: &S,
        job_id: Id,
        cylinder_id: Id,
    ) -> ServiceResult<CylinderResponse> {
        let mut tx = store.begin().await?;
        let cylinder = Self::load_scoped(tx.as_mut(), job_id, cylinder_id).await?;
        Ok(CylinderResponse::from(&cylinder))
    }

    /// Full replace of the cylinder's fields, re-resolving its TapeSpec.
    pub async fn update<S: Store + ?Sized>(
        store: &S,
        user: &UserContext,
        job_id: Id,
        cylinder_id: Id,
        request: CylinderRequest,
    ) -> ServiceResult<CylinderResponse> {
        let fields = validate::cylinder_fields(request)?;

        let mut tx = store.begin().await?;
        let mut job = JobOperations::load(tx.as_mut(), job_id).await?;
        let existing = Self::load_scoped(tx.as_mut(), job_id, cylinder_id).await?;

        if !tx.spec_exists(SpecKind::Tape, fields.tape_spec_id).await? {
            return Err(ServiceError::not_found("TapeSpec", fields.tape_spec_id));
        }
        if fields.cylinder_nr != existing.cylinder_nr
            && tx.cylinder_nr_exists(job_id, fields.cylinder_nr).await?
        {
            return Err(ServiceError::invalid(format!(
                "Cylinder number {} already exists within this job.",
                fields.cylinder_nr
            )));
        }

        let cylinder = job.add_cylinder(existing)?;
        cylinder.apply(fields);
        tx.update_cylinder(cylinder).await?;
        let response = CylinderResponse::from(&*cylinder);
        tx.commit().await?;

        log::info!(
            "User {} updated cylinder {} in job {}",
            user.user_id,
            cylinder_id,
            job_id
        );
        Ok(response)
    }

    /// Delete the cylinder and its reports.
    pub async fn delete<S: Store + ?Sized>(
        store: &S,
        user: &UserContext,
        job_id: Id,
        cylinder_id: Id,
    ) -> ServiceResult<()> {
        let mut tx = store.begin().await?;
        let mut job = JobOperations::load(tx.as_mut(), job_id).await?;
        let cylinder = Self::load_scoped(tx.as_mut(), job_id, cylinder_id).await?;
        let reports = tx.list_reports_by_cylinder(cylinder_id).await?;

        let attached = job.add_cylinder(cylinder)?;
        for report in reports {
            attached.add_report(report)?;
        }

        Self::delete_in(tx.as_mut(), &mut job, cylinder_id).await?;
        tx.commit().await?;

        log::info!(
            "User {} deleted cylinder {} from job {}",
            user.user_id,
            cylinder_id,
            job_id
        );
        Ok(())
    }

    /// Detach the cylinder from `job` and delete it together with the reports
    /// loaded into it.
    pub(crate) async fn delete_in(
        tx: &mut dyn StoreTx,
        job: &mut Job,
        cylinder_id: Id,
    ) -> ServiceResult<()> {
        let mut cylinder = job
            .remove_cylinder(cylinder_id)
            .ok_or_else(|| ServiceError::not_found("Cylinder", cylinder_id))?;

        let report_ids: Vec<Id> = cylinder.reports().iter().filter_map(|r| r.id()).collect();
        for report_id in report_ids {
            if cylinder.remove_report(report_id).is_some() {
                tx.delete_report(report_id).await?;
            }
        }

        tx.delete_cylinder(cylinder_id).await?;
        Ok(())
    }

    async fn load_scoped(tx: &mut dyn StoreTx, job_id: Id, cylinder_id: Id) -> ServiceResult<Cylinder> {
        tx.find_cylinder_in_job(job_id, cylinder_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Cylinder", cylinder_id))
    }
}
