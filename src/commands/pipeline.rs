use anyhow::{Result, bail};
use chrono::Local;
use tracing::{info, warn};

use crate::cli::{DatasetKind, PipelineArgs};
use crate::commands::download::{HttpSource, download_months};
use crate::commands::ingest::{self, IngestOptions};
use crate::dates::last_published_month;
use crate::settings::{NetworkSettings, Settings};

pub fn run(args: PipelineArgs) -> Result<()> {
    let settings = Settings::from_common(&args.common);
    let network = NetworkSettings::from_args(&args.network);

    let last = args
        .to
        .unwrap_or_else(|| last_published_month(Local::now().date_naive()));
    if args.from > last {
        bail!("--from {} is after the last month {}", args.from, last);
    }

    if args.skip_download {
        info!("skipping download stage");
    } else {
        let source = HttpSource::new(&network)?;
        let manifest = download_months(&settings, &network, &source, &args.from.through(last))?;
        if manifest.counts.failed > 0 || manifest.counts.not_found > 0 {
            warn!(
                not_found = manifest.counts.not_found,
                failed = manifest.counts.failed,
                "continuing with the reports already on disk"
            );
        }
    }

    let options = IngestOptions {
        datasets: DatasetKind::ALL.to_vec(),
        since: None,
        until: None,
        rebuild: true,
        max_files: None,
        command: render_pipeline_command(&args),
    };
    let manifest = ingest::ingest(&settings, &options)?;

    for counts in &manifest.datasets {
        info!(
            dataset = %counts.dataset,
            rows = counts.total_rows,
            files = counts.files_with_rows,
            "dataset rebuilt"
        );
    }
    info!(
        run_id = %manifest.run_id,
        status = %manifest.status,
        "pipeline completed"
    );
    Ok(())
}

fn render_pipeline_command(args: &PipelineArgs) -> String {
    let mut command = vec![
        "cruscotto".to_string(),
        "pipeline".to_string(),
        "--data-root".to_string(),
        args.common.data_root.display().to_string(),
        "--from".to_string(),
        args.from.to_string(),
    ];
    if let Some(to) = args.to {
        command.push("--to".to_string());
        command.push(to.to_string());
    }
    if args.skip_download {
        command.push("--skip-download".to_string());
    }
    command.join(" ")
}
