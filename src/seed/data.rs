use crate::logic::SpecOperations;
use crate::model::{SpecKind, SpecRequest, UserContext};
use crate::store::traits::Store;
use anyhow::{Context, Result};

/// Helper function to build a catalog request
fn spec_request(name: &str, spec_type: &str, thickness_micrometers: i32, info: &str) -> SpecRequest {
    SpecRequest {
        name: name.to_string().into(),
        spec_type: Some(spec_type.to_string()),
        thickness_micrometers: Some(thickness_micrometers),
        info: Some(info.to_string()),
    }
}

fn tape_catalog() -> Vec<SpecRequest> {
    vec![
        spec_request("Lohmann DuploFLEX 5.3", "foam", 550, "Medium foam, mixed print"),
        spec_request("Lohmann DuploFLEX 5.1", "foam", 550, "Soft foam, solids"),
        spec_request("3M Cushion-Mount 1120", "cushion", 510, "Hard cushion, line work"),
        spec_request("tesa Softprint 52117", "foam", 500, "Medium soft, halftones"),
    ]
}

fn report_catalog() -> Vec<SpecRequest> {
    vec![
        spec_request("Plate DuPont Cyrel DPR", "plate", 1140, "Standard photopolymer plate"),
        spec_request("Plate Flint nyloflex FTF", "plate", 1140, "Flat top dot plate"),
        spec_request("Sleeve adapter 1.70", "sleeve", 1700, "Thin wall adapter"),
    ]
}

/// Populate the TapeSpec and ReportSpec catalogs with a starter set.
///
/// Catalogs that already have entries are left untouched, so this is safe to
/// run on every start.
pub async fn load_seed_data<S: Store + ?Sized>(store: &S) -> Result<()> {
    let user = UserContext::system();

    for (kind, requests) in [
        (SpecKind::Tape, tape_catalog()),
        (SpecKind::Report, report_catalog()),
    ] {
        let existing = SpecOperations::list(store, kind)
            .await
            .with_context(|| format!("Failed to list {} catalog", kind.label()))?;
        if !existing.is_empty() {
            log::info!(
                "Skipping {} seed, catalog already has {} entries",
                kind.label(),
                existing.len()
            );
            continue;
        }

        let count = requests.len();
        for request in requests {
            SpecOperations::create(store, &user, kind, request)
                .await
                .with_context(|| format!("Failed to seed {}", kind.label()))?;
        }
        log::info!("Seeded {} {} entries", count, kind.label());
    }

    Ok(())
}
