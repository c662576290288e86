use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::InventoryArgs;
use crate::dates::ReferenceDateParser;
use crate::model::{PdfEntry, PdfInventoryManifest};
use crate::settings::Settings;
use crate::util::{now_utc_string, sha256_file, write_json_pretty};

pub fn run(args: InventoryArgs) -> Result<()> {
    let settings = Settings::from_common(&args.common);
    let manifest = build_manifest(&settings.pdf_dir)?;

    if manifest.pdf_count == 0 {
        warn!(source = %manifest.source_directory, "no PDFs found");
    }

    if args.dry_run {
        info!(
            pdf_count = manifest.pdf_count,
            undated = manifest.undated_count,
            source = %manifest.source_directory,
            "inventory dry-run complete"
        );
        return Ok(());
    }

    let manifest_path = args
        .manifest_path
        .unwrap_or_else(|| settings.inventory_manifest_path());

    write_json_pretty(&manifest_path, &manifest)?;
    info!(path = %manifest_path.display(), "wrote inventory manifest");
    info!(
        pdf_count = manifest.pdf_count,
        undated = manifest.undated_count,
        "inventory completed"
    );

    Ok(())
}

pub fn build_manifest(pdf_dir: &Path) -> Result<PdfInventoryManifest> {
    let parser = ReferenceDateParser::new()?;

    let mut pdf_paths = if pdf_dir.exists() {
        discover_pdfs(pdf_dir)?
    } else {
        Vec::new()
    };
    pdf_paths.sort();

    let mut pdfs = Vec::with_capacity(pdf_paths.len());
    for path in pdf_paths {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", path.display()))?;

        let reference_date = parser.parse(&filename);
        if reference_date.is_none() {
            warn!(file = %filename, "no reference date in filename");
        }

        let size_bytes = fs::metadata(&path)
            .with_context(|| format!("failed to inspect {}", path.display()))?
            .len();
        let sha256 = sha256_file(&path)?;

        pdfs.push(PdfEntry {
            filename,
            reference_date,
            size_bytes,
            sha256,
        });
    }

    pdfs.sort_by(|a, b| {
        a.reference_date
            .cmp(&b.reference_date)
            .then(a.filename.cmp(&b.filename))
    });

    let undated_count = pdfs
        .iter()
        .filter(|pdf| pdf.reference_date.is_none())
        .count();

    Ok(PdfInventoryManifest {
        manifest_version: 1,
        generated_at: now_utc_string(),
        source_directory: pdf_dir.display().to_string(),
        pdf_count: pdfs.len(),
        undated_count,
        pdfs,
    })
}

fn discover_pdfs(pdf_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut pdfs = Vec::new();

    let entries =
        fs::read_dir(pdf_dir).with_context(|| format!("failed to read {}", pdf_dir.display()))?;

    for entry in entries {
        let entry =
            entry.with_context(|| format!("failed to read entry in {}", pdf_dir.display()))?;
        let path = entry.path();

        if !entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", path.display()))?
            .is_file()
        {
            continue;
        }

        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);

        if is_pdf {
            pdfs.push(path);
        }
    }

    Ok(pdfs)
}
