use anyhow::{Result, bail};
use chrono::{Local, Utc};
use tracing::{info, warn};

use crate::cli::DownloadArgs;
use crate::dates::{YearMonth, last_published_month};
use crate::model::{DownloadCounts, DownloadRunManifest, DownloadStatus, MonthDownload};
use crate::settings::{NetworkSettings, Settings};
use crate::util::{now_utc_string, utc_compact_string, write_bytes_atomic, write_json_pretty};

use super::fetch::{Attempt, HttpSource, PdfSource, fetch_pdf};
use super::urls::candidates;

pub fn run(args: DownloadArgs) -> Result<()> {
    let settings = Settings::from_common(&args.common);
    let network = NetworkSettings::from_args(&args.network);

    let last = args
        .to
        .unwrap_or_else(|| last_published_month(Local::now().date_naive()));
    if args.from > last {
        bail!("--from {} is after the last month {}", args.from, last);
    }

    let source = HttpSource::new(&network)?;
    let manifest = download_months(&settings, &network, &source, &args.from.through(last))?;

    if manifest.counts.failed > 0 || manifest.counts.not_found > 0 {
        warn!(
            not_found = manifest.counts.not_found,
            failed = manifest.counts.failed,
            "some months could not be downloaded; they will be retried on the next run"
        );
    }
    Ok(())
}

pub fn download_months(
    settings: &Settings,
    network: &NetworkSettings,
    source: &dyn PdfSource,
    months: &[YearMonth],
) -> Result<DownloadRunManifest> {
    settings.prepare()?;

    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("download-{}", utc_compact_string(started_ts));

    info!(
        run_id = %run_id,
        months = months.len(),
        pdf_dir = %settings.pdf_dir.display(),
        "starting download"
    );

    let mut counts = DownloadCounts {
        months_total: months.len(),
        ..DownloadCounts::default()
    };
    let mut outcomes = Vec::with_capacity(months.len());

    for month in months {
        let outcome = download_month(settings, network, source, *month);
        match outcome.status {
            DownloadStatus::Downloaded => counts.downloaded += 1,
            DownloadStatus::AlreadyPresent => counts.already_present += 1,
            DownloadStatus::NotFound => counts.not_found += 1,
            DownloadStatus::Failed => counts.failed += 1,
        }
        outcomes.push(outcome);
    }

    let manifest = DownloadRunManifest {
        manifest_version: 1,
        run_id,
        started_at,
        updated_at: now_utc_string(),
        base_url: network.base_url.clone(),
        first_month: months.first().map(ToString::to_string).unwrap_or_default(),
        last_month: months.last().map(ToString::to_string).unwrap_or_default(),
        counts,
        months: outcomes,
    };

    let manifest_path = settings.manifest_dir.join(format!(
        "download_run_{}.json",
        utc_compact_string(started_ts)
    ));
    write_json_pretty(&manifest_path, &manifest)?;

    info!(
        path = %manifest_path.display(),
        downloaded = manifest.counts.downloaded,
        already_present = manifest.counts.already_present,
        not_found = manifest.counts.not_found,
        failed = manifest.counts.failed,
        "download completed"
    );

    Ok(manifest)
}

pub fn download_month(
    settings: &Settings,
    network: &NetworkSettings,
    source: &dyn PdfSource,
    month: YearMonth,
) -> MonthDownload {
    let mut outcome = MonthDownload {
        month: month.to_string(),
        status: DownloadStatus::NotFound,
        filename: None,
        url: None,
        bytes: None,
        errors: Vec::new(),
    };

    let candidates = match candidates(&network.files_url(), month) {
        Ok(candidates) => candidates,
        Err(err) => {
            outcome.status = DownloadStatus::Failed;
            outcome.errors.push(format!("{err:#}"));
            return outcome;
        }
    };

    if let Some(present) = candidates
        .iter()
        .find(|candidate| settings.pdf_dir.join(&candidate.filename).exists())
    {
        info!(month = %month, filename = %present.filename, "report already present");
        outcome.status = DownloadStatus::AlreadyPresent;
        outcome.filename = Some(present.filename.clone());
        return outcome;
    }

    let mut transient_failure = false;
    for candidate in candidates {
        match fetch_pdf(source, network, &candidate.url) {
            Attempt::Fetched(bytes) => {
                let path = settings.pdf_dir.join(&candidate.filename);
                if let Err(err) = write_bytes_atomic(&path, &bytes) {
                    outcome.errors.push(format!("{err:#}"));
                    transient_failure = true;
                    continue;
                }

                info!(
                    month = %month,
                    filename = %candidate.filename,
                    bytes = bytes.len(),
                    "downloaded report"
                );
                outcome.status = DownloadStatus::Downloaded;
                outcome.filename = Some(candidate.filename);
                outcome.url = Some(candidate.url);
                outcome.bytes = Some(bytes.len() as u64);
                return outcome;
            }
            Attempt::Missing(reason) => outcome.errors.push(reason),
            Attempt::Failed(reason) => {
                outcome.errors.push(reason);
                transient_failure = true;
            }
        }
    }

    outcome.status = if transient_failure {
        DownloadStatus::Failed
    } else {
        DownloadStatus::NotFound
    };
    warn!(
        month = %month,
        status = ?outcome.status,
        attempts = outcome.errors.len(),
        "no report downloaded"
    );
    outcome
}
