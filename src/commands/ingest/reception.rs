use std::collections::HashSet;

use anyhow::Result;
use tracing::{debug, warn};

use crate::model::{FacilityType, ReceptionRow};

use super::cells::CellParser;
use super::pages::ReportText;
use super::schema::{CompiledSchema, RECEPTION};
use super::{ExtractedRows, ReportExtractor};

const REGION_ALIASES: &[(&str, &str)] = &[
    ("friuli venezia giulia", "Friuli-Venezia Giulia"),
    ("trentino alto adige", "Trentino-Alto Adige"),
    ("emilia romagna", "Emilia-Romagna"),
    ("valle d aosta", "Valle d'Aosta"),
    ("valle daosta", "Valle d'Aosta"),
    ("alto adige", "Trentino-Alto Adige"),
    ("basilicata", "Basilicata"),
    ("lombardia", "Lombardia"),
    ("lombardie", "Lombardia"),
    ("campania", "Campania"),
    ("calabria", "Calabria"),
    ("piemonte", "Piemonte"),
    ("sardegna", "Sardegna"),
    ("trentino", "Trentino-Alto Adige"),
    ("abruzzo", "Abruzzo"),
    ("liguria", "Liguria"),
    ("sicilia", "Sicilia"),
    ("toscana", "Toscana"),
    ("toscane", "Toscana"),
    ("friuli", "Friuli-Venezia Giulia"),
    ("marche", "Marche"),
    ("molise", "Molise"),
    ("puglia", "Puglia"),
    ("puglie", "Puglia"),
    ("umbria", "Umbria"),
    ("veneto", "Veneto"),
    ("lazio", "Lazio"),
];

fn fold(label: &str) -> String {
    let repaired = label.replace("Ã¼", "u").replace("Ã©", "e");
    let mut folded = String::with_capacity(repaired.len());
    for ch in repaired.chars().flat_map(char::to_lowercase) {
        let mapped = match ch {
            'à' | 'á' | 'â' | 'ä' => 'a',
            'è' | 'é' | 'ê' | 'ë' => 'e',
            'ì' | 'í' | 'î' | 'ï' => 'i',
            'ò' | 'ó' | 'ô' | 'ö' => 'o',
            'ù' | 'ú' | 'û' | 'ü' => 'u',
            '-' | '/' | '\'' | '’' | '‘' | '´' | '`' | '.' | '*' | '(' | ')' => ' ',
            other => other,
        };
        folded.push(mapped);
    }
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn normalize_region(label: &str) -> Option<&'static str> {
    let folded = fold(label);
    REGION_ALIASES.iter().find_map(|(alias, canonical)| {
        let matches = folded == *alias
            || folded
                .strip_prefix(alias)
                .is_some_and(|rest| rest.starts_with(' '));
        matches.then_some(*canonical)
    })
}

pub struct ReceptionExtractor {
    schema: CompiledSchema,
    cells: CellParser,
}

impl ReceptionExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            schema: CompiledSchema::new(&RECEPTION)?,
            cells: CellParser::new()?,
        })
    }
}

impl ReportExtractor for ReceptionExtractor {
    type Row = ReceptionRow;

    fn extract(&self, report: &ReportText) -> ExtractedRows<ReceptionRow> {
        let mut extracted = ExtractedRows::default();
        let reference_date = report.reference_date;
        let Some((page_index, page)) = self.schema.find_page(&report.layout_pages) else {
            debug!(file = %report.filename, "reception table not found");
            return extracted;
        };
        let Some(variant) = self.schema.variant_for(page, reference_date) else {
            return extracted;
        };

        let mut seen = HashSet::new();
        for line in page.lines() {
            for group in self.cells.group_line(line) {
                if self.schema.is_skipped(&group.label) {
                    continue;
                }
                let Some(region) = normalize_region(&group.label) else {
                    continue;
                };
                if !seen.insert(region) {
                    continue;
                }
                for cell in &group.coerced {
                    warn!(
                        file = %report.filename,
                        cell = %cell,
                        region,
                        "coerced malformed count"
                    );
                    extracted.warnings.push(format!(
                        "{}: coerced count '{}' for {}",
                        report.filename, cell, region
                    ));
                }

                for (column, present) in variant.assign(&group.values) {
                    let Some(facility_type) = FacilityType::parse(column) else {
                        continue;
                    };
                    extracted.rows.push(ReceptionRow {
                        reference_date,
                        region: region.to_string(),
                        facility_type,
                        present,
                        layout: variant.layout.to_string(),
                        source_file: report.filename.clone(),
                    });
                }
            }
        }

        debug!(
            file = %report.filename,
            page = page_index + 1,
            layout = variant.layout,
            regions = seen.len(),
            "reception rows extracted"
        );
        extracted
    }
}
