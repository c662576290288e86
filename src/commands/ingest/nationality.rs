use std::collections::HashSet;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, warn};

use crate::dates::italian_month_number;
use crate::model::NationalityRow;

use super::cells::{CellParser, normalize_label};
use super::pages::ReportText;
use super::schema::{CompiledSchema, NATIONALITY};
use super::{ExtractedRows, ReportExtractor};

pub const COTE_DIVOIRE: &str = "Costa d'Avorio";

pub struct NationalityExtractor {
    schema: CompiledSchema,
    cells: CellParser,
    cote_divoire: Regex,
}

impl NationalityExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            schema: CompiledSchema::new(&NATIONALITY)?,
            cells: CellParser::new()?,
            cote_divoire: Regex::new(r"(?i)^costa\s*d\s*(?:['’‘´`]{1,2}|â€™)?\s*avorio$")
                .context("failed to compile Costa d'Avorio regex")?,
        })
    }

    pub fn normalize_nationality(&self, label: &str) -> String {
        let label = normalize_label(label);
        if self.cote_divoire.is_match(&label) {
            return COTE_DIVOIRE.to_string();
        }
        label
    }

    fn is_data_label(&self, label: &str) -> bool {
        if self.schema.is_skipped(label) {
            return false;
        }
        if !label.chars().any(char::is_alphabetic) {
            return false;
        }
        italian_month_number(label).is_none()
    }
}

impl ReportExtractor for NationalityExtractor {
    type Row = NationalityRow;

    fn extract(&self, report: &ReportText) -> ExtractedRows<NationalityRow> {
        let mut extracted = ExtractedRows::default();
        let reference_date = report.reference_date;
        let Some((page_index, page)) = self.schema.find_page(&report.layout_pages) else {
            debug!(file = %report.filename, "nationality table not found");
            return extracted;
        };

        let lines = page.lines().collect::<Vec<_>>();
        let start = self
            .schema
            .title_line(&lines)
            .map(|index| index + 1)
            .unwrap_or(0);

        let mut seen = HashSet::new();
        for line in &lines[start..] {
            for group in self.cells.group_line(line) {
                if !self.is_data_label(&group.label) {
                    continue;
                }
                for cell in &group.coerced {
                    let message = format!(
                        "{}: coerced count '{}' for {}",
                        report.filename, cell, group.label
                    );
                    warn!(
                        file = %report.filename,
                        cell = %cell,
                        label = %group.label,
                        "coerced malformed count"
                    );
                    extracted.warnings.push(message);
                }

                let Some(&landed) = group.values.first() else {
                    continue;
                };
                if landed == 0 {
                    continue;
                }

                let nationality = self.normalize_nationality(&group.label);
                if !seen.insert(nationality.clone()) {
                    continue;
                }
                extracted.rows.push(NationalityRow {
                    reference_date,
                    nationality,
                    landed,
                    source_file: report.filename.clone(),
                });
            }
        }

        debug!(
            file = %report.filename,
            page = page_index + 1,
            rows = extracted.rows.len(),
            "nationality rows extracted"
        );
        extracted
    }
}
