use crate::error::{ServiceError, ServiceResult};
use crate::logic::validate;
use crate::model::{CatalogSpec, Id, SpecKind, SpecRequest, UserContext};
use crate::store::{Store, StoreTx};

/// CRUD over the TapeSpec and ReportSpec catalogs.
pub struct SpecOperations;

impl SpecOperations {
    pub async fn create<S: Store + ?Sized>(
        store: &S,
        user: &UserContext,
        kind: SpecKind,
        request: SpecRequest,
    ) -> ServiceResult<CatalogSpec> {
        let fields = validate::spec_fields(request)?;

        let mut tx = store.begin().await?;
        let spec = tx.insert_spec(kind, &fields).await?;
        tx.commit().await?;

        log::info!("User {} created {} {}", user.user_id, kind.label(), spec.id);
        Ok(spec)
    }

    pub async fn get<S: Store + ?Sized>(
        store: &S,
        kind: SpecKind,
        id: Id,
    ) -> ServiceResult<CatalogSpec> {
        let mut tx = store.begin().await?;
        Self::load(tx.as_mut(), kind, id).await
    }

    pub async fn list<S: Store + ?Sized>(
        store: &S,
        kind: SpecKind,
    ) -> ServiceResult<Vec<CatalogSpec>> {
        let mut tx = store.begin().await?;
        Ok(tx.list_specs(kind).await?)
    }

    pub async fn update<S: Store + ?Sized>(
        store: &S,
        user: &UserContext,
        kind: SpecKind,
        id: Id,
        request: SpecRequest,
    ) -> ServiceResult<CatalogSpec> {
        let fields = validate::spec_fields(request)?;

        let mut tx = store.begin().await?;
        let mut spec = Self::load(tx.as_mut(), kind, id).await?;
        spec.apply(fields);
        tx.update_spec(kind, &spec).await?;
        tx.commit().await?;

        log::info!("User {} updated {} {}", user.user_id, kind.label(), id);
        Ok(spec)
    }

    /// Delete a catalog entry that no cylinder or report references.
    pub async fn delete<S: Store + ?Sized>(
        store: &S,
        user: &UserContext,
        kind: SpecKind,
        id: Id,
    ) -> ServiceResult<()> {
        let mut tx = store.begin().await?;
        Self::load(tx.as_mut(), kind, id).await?;

        let in_use = match kind {
            SpecKind::Tape => tx.tape_spec_in_use(id).await?,
            SpecKind::Report => tx.report_spec_in_use(id).await?,
        };
        if in_use {
            return Err(ServiceError::Conflict(format!(
                "{} {} is still referenced and cannot be deleted.",
                kind.label(),
                id
            )));
        }

        tx.delete_spec(kind, id).await?;
        tx.commit().await?;

        log::info!("User {} deleted {} {}", user.user_id, kind.label(), id);
        Ok(())
    }

    async fn load(tx: &mut dyn StoreTx, kind: SpecKind, id: Id) -> ServiceResult<CatalogSpec> {
        tx.get_spec(kind, id)
            .await?
            .ok_or_else(|| ServiceError::not_found(kind.label(), id))
    }
}
