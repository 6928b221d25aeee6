use crate::error::{FieldErrors, ServiceError, ServiceResult};
use crate::logic::validate::{self, TEXT_MAX};
use crate::logic::{CylinderOperations, JobOperations, ReportOperations};
use crate::model::{
    AssemblyCylinder, AssemblyReport, AssemblyRequest, CylinderFields, Field, Id, JobResponse,
    NewSpec, ReportFields, SpecKind, UserContext,
};
use crate::store::{Store, StoreTx};

/// A nested cylinder entry that passed validation. Spec ids are resolved later.
struct CylinderPlan {
    cylinder_nr: i32,
    color: Option<String>,
    cylinder_info: Option<String>,
    tape_spec_id: Option<Id>,
    reports: Vec<ReportPlan>,
}

struct ReportPlan {
    report_nr: i32,
    report_width: Option<i32>,
    x_offset: Option<i32>,
    y_offset: Option<i32>,
    report_spec_id: Option<Id>,
}

/// Builds a job with its cylinders and reports in one transaction.
pub struct AssemblyOrchestrator;

impl AssemblyOrchestrator {
    /// Materialize the whole graph described by `request`, or nothing at all.
    ///
    /// Cylinders and reports are created in input order. Spec ids that are
    /// missing or do not resolve are replaced by freshly provisioned default
    /// specs written in the same transaction. Returns the job's fields only.
    pub async fn assemble<S: Store + ?Sized>(
        store: &S,
        user: &UserContext,
        request: AssemblyRequest,
    ) -> ServiceResult<JobResponse> {
        let job_request = match request.job {
            Field::Value(job) => job,
            Field::Null => return Err(ServiceError::invalid("job must not be null.")),
            Field::Absent => return Err(ServiceError::invalid("job is required.")),
        };
        let job_fields =
            validate::job_fields(job_request).map_err(ServiceError::into_invalid_argument)?;
        let plans = Self::plan(request.cylinders.unwrap_or_default())?;

        let mut tx = store.begin().await?;
        let mut job = JobOperations::create_in(tx.as_mut(), job_fields).await?;

        let mut provisioned = 0;
        for plan in plans {
            let tape_spec_id = Self::resolve_spec(
                tx.as_mut(),
                SpecKind::Tape,
                plan.tape_spec_id,
                || NewSpec::default_tape_spec(plan.cylinder_nr),
                &mut provisioned,
            )
            .await?;

            let fields = CylinderFields {
                cylinder_nr: plan.cylinder_nr,
                color: plan.color,
                cylinder_info: plan.cylinder_info,
                tape_spec_id,
            };
            let cylinder = CylinderOperations::attach(tx.as_mut(), &mut job, fields).await?;

            for report in plan.reports {
                let report_spec_id = Self::resolve_spec(
                    tx.as_mut(),
                    SpecKind::Report,
                    report.report_spec_id,
                    || NewSpec::default_report_spec(report.report_nr),
                    &mut provisioned,
                )
                .await?;

                let fields = ReportFields {
                    report_nr: report.report_nr,
                    report_width: report.report_width,
                    x_offset: report.x_offset,
                    y_offset: report.y_offset,
                    report_spec_id,
                };
                ReportOperations::attach(tx.as_mut(), cylinder, fields).await?;
            }
        }

        tx.commit().await?;

        let cylinders = job.cylinders().len();
        let reports: usize = job.cylinders().iter().map(|c| c.reports().len()).sum();
        log::info!(
            "User {} assembled job {:?}: {} cylinder(s), {} report(s), {} default spec(s)",
            user.user_id,
            job.id(),
            cylinders,
            reports,
            provisioned
        );
        Ok(JobResponse::from(&job))
    }

    /// Use `requested` when it names an existing spec, otherwise persist a
    /// default one and use that.
    async fn resolve_spec(
        tx: &mut dyn StoreTx,
        kind: SpecKind,
        requested: Option<Id>,
        fallback: impl FnOnce() -> NewSpec + Send,
        provisioned: &mut usize,
    ) -> ServiceResult<Id> {
        if let Some(id) = requested {
            if tx.spec_exists(kind, id).await? {
                return Ok(id);
            }
        }

        let spec = tx.insert_spec(kind, &fallback()).await?;
        *provisioned += 1;
        log::info!(
            "Provisioned default {} {} '{}' (requested id: {:?})",
            kind.label(),
            spec.id,
            spec.name,
            requested
        );
        Ok(spec.id)
    }

    /// Validate every nested entry before anything is written.
    fn plan(cylinders: Vec<AssemblyCylinder>) -> ServiceResult<Vec<CylinderPlan>> {
        let mut errors = FieldErrors::new();
        let mut plans = Vec::with_capacity(cylinders.len());

        for (index, cylinder) in cylinders.into_iter().enumerate() {
            let prefix = format!("cylinders[{}]", index);
            let cylinder_nr = validate::required(cylinder.cylinder_nr, &prefix, "cylinderNr", &mut errors);
            validate::max_chars(cylinder.color.as_deref(), TEXT_MAX, &prefix, "color", &mut errors);
            validate::max_chars(
                cylinder.cylinder_info.as_deref(),
                TEXT_MAX,
                &prefix,
                "cylinderInfo",
                &mut errors,
            );

            let reports = Self::plan_reports(
                cylinder.reports.unwrap_or_default(),
                &prefix,
                &mut errors,
            );

            if let Some(cylinder_nr) = cylinder_nr {
                plans.push(CylinderPlan {
                    cylinder_nr,
                    color: cylinder.color,
                    cylinder_info: cylinder.cylinder_info,
                    tape_spec_id: cylinder.tape_spec_id,
                    reports,
                });
            }
        }

        if errors.is_empty() {
            Ok(plans)
        } else {
            Err(ServiceError::validation(errors))
        }
    }

    fn plan_reports(
        reports: Vec<AssemblyReport>,
        cylinder_prefix: &str,
        errors: &mut FieldErrors,
    ) -> Vec<ReportPlan> {
        let mut plans = Vec::with_capacity(reports.len());

        for (index, report) in reports.into_iter().enumerate() {
            let prefix = format!("{}.reports[{}]", cylinder_prefix, index);
            let report_nr = validate::required(report.report_nr, &prefix, "reportNr", errors);
            validate::check_report_numbers(report_nr, report.report_width, &prefix, errors);

            if let Some(report_nr) = report_nr {
                plans.push(ReportPlan {
                    report_nr,
                    report_width: report.report_width,
                    x_offset: report.x_offset,
                    y_offset: report.y_offset,
                    report_spec_id: report.report_spec_id,
                });
            }
        }

        plans
    }
}
