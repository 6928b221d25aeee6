use crate::error::{AggregateError, ServiceError, ServiceResult};
use crate::logic::validate;
use crate::model::{
    Cylinder, Id, Report, ReportFields, ReportRequest, ReportResponse, SpecKind, UserContext,
};
use crate::store::{Store, StoreError, StoreTx};

/// Report operations. Reports are addressed by id; the owning cylinder comes
/// from the request body or the stored row.
pub struct ReportOperations;

impl ReportOperations {
    pub async fn create<S: Store + ?Sized>(
        store: &S,
        user: &UserContext,
        request: ReportRequest,
    ) -> ServiceResult<ReportResponse> {
        let (cylinder_id, fields) = validate::report_fields(request)?;

        let mut tx = store.begin().await?;
        let mut cylinder = Self::load_cylinder(tx.as_mut(), cylinder_id).await?;
        let report = Self::attach(tx.as_mut(), &mut cylinder, fields).await?;
        let response = ReportResponse::from(&*report);
        tx.commit().await?;

        log::info!(
            "User {} created report {} on cylinder {}",
            user.user_id,
            response.report_nr,
            cylinder_id
        );
        Ok(response)
    }

    /// Create a report under a persisted `cylinder` inside the open transaction.
    pub(crate) async fn attach<'a>(
        tx: &mut dyn StoreTx,
        cylinder: &'a mut Cylinder,
        fields: ReportFields,
    ) -> ServiceResult<&'a mut Report> {
        let cylinder_id = cylinder.id().ok_or(AggregateError::UnsavedParent {
            parent: "cylinder",
            child: "report",
        })?;

        if !tx.spec_exists(SpecKind::Report, fields.report_spec_id).await? {
            return Err(ServiceError::not_found("ReportSpec", fields.report_spec_id));
        }
        if tx.report_nr_exists(cylinder_id, fields.report_nr).await? {
            return Err(ServiceError::invalid(format!(
                "Report number {} already exists within this cylinder.",
                fields.report_nr
            )));
        }

        let report = cylinder.add_report(Report::new(fields))?;
        let id = tx.insert_report(report).await?;
        report.mark_persisted(id);
        Ok(report)
    }

    pub async fn get<S: Store + ?Sized>(store: &S, id: Id) -> ServiceResult<ReportResponse> {
        let mut tx = store.begin().await?;
        let report = Self::load(tx.as_mut(), id).await?;
        Ok(ReportResponse::from(&report))
    }

    pub async fn list_by_cylinder<S: Store + ?Sized>(
        store: &S,
        cylinder_id: Id,
    ) -> ServiceResult<Vec<ReportResponse>> {
        let mut tx = store.begin().await?;
        Self::load_cylinder(tx.as_mut(), cylinder_id).await?;
        let reports = tx.list_reports_by_cylinder(cylinder_id).await?;
        Ok(reports.iter().map(ReportResponse::from).collect())
    }

    /// Full replace of the report's fields. A different `cylinderId` moves
    /// the report to that cylinder.
    pub async fn update<S: Store + ?Sized>(
        store: &S,
        user: &UserContext,
        id: Id,
        request: ReportRequest,
    ) -> ServiceResult<ReportResponse> {
        let (cylinder_id, fields) = validate::report_fields(request)?;

        let mut tx = store.begin().await?;
        let existing = Self::load(tx.as_mut(), id).await?;
        let current_owner = existing
            .cylinder_id()
            .ok_or(StoreError::Detached { entity: "report" })?;

        let mut owner = Self::load_cylinder(tx.as_mut(), current_owner).await?;
        let mut target = if cylinder_id == current_owner {
            None
        } else {
            Some(Self::load_cylinder(tx.as_mut(), cylinder_id).await?)
        };

        if !tx.spec_exists(SpecKind::Report, fields.report_spec_id).await? {
            return Err(ServiceError::not_found("ReportSpec", fields.report_spec_id));
        }
        let number_changes = target.is_some() || fields.report_nr != existing.report_nr;
        if number_changes && tx.report_nr_exists(cylinder_id, fields.report_nr).await? {
            return Err(ServiceError::invalid(format!(
                "Report number {} already exists within this cylinder.",
                fields.report_nr
            )));
        }

        let report = match target.as_mut() {
            Some(target) => {
                owner.add_report(existing)?;
                let moved = owner
                    .remove_report(id)
                    .ok_or_else(|| ServiceError::not_found("Report", id))?;
                target.add_report(moved)?
            }
            None => owner.add_report(existing)?,
        };
        report.apply(fields);
        tx.update_report(report).await?;
        let response = ReportResponse::from(&*report);
        tx.commit().await?;

        log::info!("User {} updated report {}", user.user_id, id);
        Ok(response)
    }

    /// Detach the report from its cylinder and delete it.
    pub async fn delete<S: Store + ?Sized>(
        store: &S,
        user: &UserContext,
        id: Id,
    ) -> ServiceResult<()> {
        let mut tx = store.begin().await?;
        let report = Self::load(tx.as_mut(), id).await?;
        let owner_id = report
            .cylinder_id()
            .ok_or(StoreError::Detached { entity: "report" })?;

        let mut cylinder = Self::load_cylinder(tx.as_mut(), owner_id).await?;
        cylinder.add_report(report)?;
        if cylinder.remove_report(id).is_some() {
            tx.delete_report(id).await?;
        }
        tx.commit().await?;

        log::info!(
            "User {} deleted report {} from cylinder {}",
            user.user_id,
            id,
            owner_id
        );
        Ok(())
    }

    async fn load(tx: &mut dyn StoreTx, id: Id) -> ServiceResult<Report> {
        tx.get_report(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Report", id))
    }

    async fn load_cylinder(tx: &mut dyn StoreTx, cylinder_id: Id) -> ServiceResult<Cylinder> {
        tx.get_cylinder(cylinder_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Cylinder", cylinder_id))
    }
}
