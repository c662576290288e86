use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct ReportText {
    pub filename: String,
    pub reference_date: NaiveDate,
    pub layout_pages: Vec<String>,
    pub raw_pages: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMode {
    Layout,
    Raw,
}

impl ReportText {
    pub fn load(
        pdf_path: &Path,
        reference_date: NaiveDate,
        need_layout: bool,
        need_raw: bool,
    ) -> Result<Self> {
        let filename = pdf_path
            .file_name()
            .and_then(|name| name.to_str())
            .map(ToOwned::to_owned)
            .with_context(|| format!("invalid UTF-8 filename: {}", pdf_path.display()))?;

        let layout_pages = if need_layout {
            extract_pages_with_pdftotext(pdf_path, TextMode::Layout)?
        } else {
            Vec::new()
        };
        let raw_pages = if need_raw {
            extract_pages_with_pdftotext(pdf_path, TextMode::Raw)?
        } else {
            Vec::new()
        };

        Ok(Self {
            filename,
            reference_date,
            layout_pages,
            raw_pages,
        })
    }
}

pub fn command_available(program: &str) -> bool {
    Command::new(program).arg("-v").output().is_ok()
}

pub fn extract_pages_with_pdftotext(pdf_path: &Path, mode: TextMode) -> Result<Vec<String>> {
    let mut command = Command::new("pdftotext");
    command.arg("-enc").arg("UTF-8");
    if mode == TextMode::Layout {
        command.arg("-layout");
    }
    command.arg(pdf_path).arg("-");

    let output = command
        .output()
        .with_context(|| format!("failed to execute pdftotext for {}", pdf_path.display()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "pdftotext returned non-zero exit status for {}: {}",
            pdf_path.display(),
            stderr.trim()
        );
    }

    Ok(split_pages(&String::from_utf8_lossy(&output.stdout)))
}

pub fn split_pages(raw: &str) -> Vec<String> {
    let mut pages: Vec<String> = raw
        .split('\u{000C}')
        .map(|chunk| chunk.replace('\u{0000}', ""))
        .collect();

    while let Some(last_page) = pages.last() {
        if last_page.trim().is_empty() {
            pages.pop();
            continue;
        }
        break;
    }

    pages
}

pub fn command_version(program: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .with_context(|| format!("failed to run {} {}", program, args.join(" ")))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let source = if stdout.trim().is_empty() {
        stderr.trim()
    } else {
        stdout.trim()
    };

    let version_line = source
        .lines()
        .next()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .unwrap_or("unknown");

    Ok(version_line.to_string())
}
