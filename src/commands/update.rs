use anyhow::Result;
use chrono::{Local, NaiveDate};
use tracing::{info, warn};

use crate::cli::{DatasetKind, UpdateArgs};
use crate::commands::download::{HttpSource, PdfSource, download_months};
use crate::commands::ingest::{self, IngestOptions};
use crate::commands::inventory;
use crate::dates::{YearMonth, last_published_month, months_before};
use crate::model::IngestRunManifest;
use crate::settings::{NetworkSettings, Settings};

#[derive(Debug)]
pub enum UpdateOutcome {
    UpToDate(YearMonth),
    DownloadFailed(YearMonth),
    Ingested(IngestRunManifest),
}

pub fn run(args: UpdateArgs) -> Result<()> {
    let settings = Settings::from_common(&args.common);
    let network = NetworkSettings::from_args(&args.network);
    let source = HttpSource::new(&network)?;
    let today = Local::now().date_naive();

    let request = UpdateRequest {
        today,
        recent_months: args.recent_months,
        force: args.force,
        command: format!(
            "cruscotto update --data-root {} --recent-months {}{}",
            args.common.data_root.display(),
            args.recent_months,
            if args.force { " --force" } else { "" }
        ),
    };

    match update(&settings, &network, &source, &request)? {
        UpdateOutcome::UpToDate(month) => {
            info!(month = %month, "datasets already up to date")
        }
        UpdateOutcome::DownloadFailed(month) => {
            warn!(month = %month, "report not available yet; retry on the next run")
        }
        UpdateOutcome::Ingested(manifest) => info!(
            run_id = %manifest.run_id,
            processed = manifest.processed_files.len(),
            "update completed"
        ),
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub today: NaiveDate,
    pub recent_months: u32,
    pub force: bool,
    pub command: String,
}

pub fn update(
    settings: &Settings,
    network: &NetworkSettings,
    source: &dyn PdfSource,
    request: &UpdateRequest,
) -> Result<UpdateOutcome> {
    settings.prepare()?;
    let month = last_published_month(request.today);
    let present = month_present(settings, month)?;

    if present && !request.force {
        return Ok(UpdateOutcome::UpToDate(month));
    }

    if !present {
        let manifest = download_months(settings, network, source, &[month])?;
        let fetched = manifest
            .months
            .first()
            .is_some_and(|outcome| outcome.status.is_success());
        if !fetched {
            return Ok(UpdateOutcome::DownloadFailed(month));
        }
    }

    let options = IngestOptions {
        datasets: DatasetKind::ALL.to_vec(),
        since: Some(months_before(request.today, request.recent_months)),
        until: None,
        rebuild: false,
        max_files: None,
        command: request.command.clone(),
    };
    info!(
        month = %month,
        since = ?options.since,
        "re-extracting recent reports"
    );

    let manifest = ingest::ingest(settings, &options)?;
    Ok(UpdateOutcome::Ingested(manifest))
}

fn month_present(settings: &Settings, month: YearMonth) -> Result<bool> {
    let inventory = inventory::build_manifest(&settings.pdf_dir)?;
    Ok(inventory
        .pdfs
        .iter()
        .filter_map(|pdf| pdf.reference_date)
        .any(|date| YearMonth::of(date) == month))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::fs;
    use std::time::Duration;

    use tempfile::TempDir;

    use super::*;
    use crate::commands::download::FetchResponse;

    struct NotPublished {
        requests: Cell<usize>,
    }

    impl PdfSource for NotPublished {
        fn get(&self, _url: &str) -> Result<FetchResponse> {
            self.requests.set(self.requests.get() + 1);
            Ok(FetchResponse {
                status: 404,
                body: Vec::new(),
            })
        }
    }

    fn network() -> NetworkSettings {
        NetworkSettings {
            base_url: "https://example.test".to_string(),
            timeout: Duration::from_secs(1),
            max_retries: 1,
            retry_pause: Duration::ZERO,
        }
    }

    fn request(force: bool) -> UpdateRequest {
        UpdateRequest {
            today: NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(),
            recent_months: 3,
            force,
            command: "cruscotto update".to_string(),
        }
    }

    #[test]
    fn present_month_without_force_is_up_to_date() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::new(temp.path());
        settings.prepare().unwrap();
        fs::write(
            settings
                .pdf_dir
                .join("cruscotto_statistico_giornaliero_31-03-2024.pdf"),
            b"%PDF-1.4",
        )
        .unwrap();
        let source = NotPublished {
            requests: Cell::new(0),
        };

        let outcome = update(&settings, &network(), &source, &request(false)).unwrap();

        assert!(matches!(
            outcome,
            UpdateOutcome::UpToDate(month) if month == YearMonth::new(2024, 3).unwrap()
        ));
        assert_eq!(source.requests.get(), 0);
    }

    #[test]
    fn unpublished_month_stops_before_extraction() {
        let temp = TempDir::new().unwrap();
        let settings = Settings::new(temp.path());
        fs::create_dir_all(&settings.pdf_dir).unwrap();
        fs::write(
            settings
                .pdf_dir
                .join("cruscotto_statistico_giornaliero_29-02-2024.pdf"),
            b"%PDF-1.4",
        )
        .unwrap();
        let source = NotPublished {
            requests: Cell::new(0),
        };

        let outcome = update(&settings, &network(), &source, &request(false)).unwrap();

        assert!(matches!(outcome, UpdateOutcome::DownloadFailed(_)));
        assert!(source.requests.get() > 0);
        assert!(!settings.inventory_manifest_path().exists());
    }
}
