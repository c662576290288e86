use std::collections::BTreeMap;

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::{DatasetKind, StatusArgs};
use crate::dates::YearMonth;
use crate::model::{DailyLandingRow, NationalityRow, PdfInventoryManifest, ReceptionRow};
use crate::settings::Settings;
use crate::store::{self, Record};
use crate::util::read_json;

pub fn run(args: StatusArgs) -> Result<()> {
    let settings = Settings::from_common(&args.common);
    info!(data_root = %settings.data_root.display(), "status requested");

    let inventory_path = settings.inventory_manifest_path();
    if inventory_path.exists() {
        let inventory: PdfInventoryManifest = read_json(&inventory_path)?;
        info!(
            generated_at = %inventory.generated_at,
            pdf_count = inventory.pdf_count,
            undated = inventory.undated_count,
            "loaded inventory manifest"
        );
    } else {
        warn!(path = %inventory_path.display(), "inventory manifest missing");
    }

    for kind in DatasetKind::ALL {
        match kind {
            DatasetKind::Nationality => report::<NationalityRow>(&settings, args.coverage)?,
            DatasetKind::Reception => report::<ReceptionRow>(&settings, args.coverage)?,
            DatasetKind::DailyLandings => report::<DailyLandingRow>(&settings, args.coverage)?,
        }
    }

    Ok(())
}

fn report<R: Record>(settings: &Settings, with_coverage: bool) -> Result<()> {
    let Some(table) = store::describe::<R>(settings)? else {
        warn!(
            dataset = R::KIND.file_stem(),
            path = %settings.parquet_path(R::KIND).display(),
            "dataset missing"
        );
        return Ok(());
    };

    info!(
        dataset = %table.dataset,
        path = %table.path,
        size_bytes = table.size_bytes,
        modified_at = %table.modified_at.clone().unwrap_or_default(),
        rows = table.row_count,
        reports = table.report_count,
        first = ?table.first_reference_date,
        last = ?table.last_reference_date,
        "dataset status"
    );

    if with_coverage {
        let rows = store::load::<R>(settings)?;
        for (month, count) in coverage(&rows) {
            info!(dataset = %table.dataset, month = %month, rows = count, "coverage");
        }
    }
    Ok(())
}

pub fn coverage<R: Record>(rows: &[R]) -> BTreeMap<YearMonth, usize> {
    let mut months = BTreeMap::new();
    for row in rows {
        *months.entry(YearMonth::of(row.reference_date())).or_insert(0) += 1;
    }
    months
}
