use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug)]
pub struct ColumnVariant {
    pub layout: &'static str,
    pub markers: &'static [&'static str],
    pub before: Option<(i32, u32, u32)>,
    pub columns: &'static [&'static str],
    pub align: Align,
}

#[derive(Debug)]
pub struct TableSchema {
    pub name: &'static str,
    pub title_indicators: &'static [&'static str],
    pub title_pattern: &'static str,
    pub keyword_sets: &'static [&'static [&'static str]],
    pub skip_labels: &'static [&'static str],
    pub variants: &'static [ColumnVariant],
}

pub static NATIONALITY: TableSchema = TableSchema {
    name: "nationality",
    title_indicators: &[
        "Nazionalità dichiarate al momento dello sbarco",
        "Nazionalità dichiarata al momento dello sbarco",
        "Nazionalità dichiarate",
    ],
    title_pattern: r"NAZIONALIT[ÀA].*DICHIARAT[AE].*SBARCO",
    keyword_sets: &[],
    skip_labels: &[
        "totale",
        "nazionalit",
        "note",
        "aggiornamento",
        "fonte",
        "dati",
        "sbarc",
    ],
    variants: &[ColumnVariant {
        layout: "default",
        markers: &[],
        before: None,
        columns: &["landed"],
        align: Align::Left,
    }],
};

pub static RECEPTION: TableSchema = TableSchema {
    name: "reception",
    title_indicators: &[
        "Presenze migranti in accoglienza",
        "Presenza migranti in accoglienza",
        "Presenze in accoglienza",
        "Presenza in accoglienza",
    ],
    title_pattern: r"PRESENZ[AE]\s*(MIGRANTI)?\s*IN\s*ACCOGLIENZA",
    keyword_sets: &[
        &["REGIONE", "HOT SPOT", "ACCOGLIENZA"],
        &["REGIONE", "TOTALE IMMIGRATI PRESENTI"],
    ],
    skip_labels: &[
        "presenze migranti",
        "presenza migranti",
        "totale",
        "aggiornamento",
        "regione",
        "note",
        "fonte",
        "percentuale",
    ],
    variants: &[
        ColumnVariant {
            layout: "pre-2019",
            markers: &[
                "Totale immigrati presenti sul territorio regione",
                "percentuale di distribuzione",
            ],
            before: Some((2019, 6, 1)),
            columns: &["total"],
            align: Align::Left,
        },
        ColumnVariant {
            layout: "post-2019",
            markers: &[],
            before: None,
            columns: &["hot_spot", "reception_centre", "sai", "total"],
            align: Align::Right,
        },
    ],
};

pub struct CompiledSchema {
    pub schema: &'static TableSchema,
    title: Regex,
}

impl CompiledSchema {
    pub fn new(schema: &'static TableSchema) -> Result<Self> {
        let title = Regex::new(&format!("(?i){}", schema.title_pattern))
            .with_context(|| format!("failed to compile {} title regex", schema.name))?;
        Ok(Self { schema, title })
    }

    pub fn matches_page(&self, page: &str) -> bool {
        let upper = page.to_uppercase();
        if self
            .schema
            .title_indicators
            .iter()
            .any(|indicator| upper.contains(&indicator.to_uppercase()))
        {
            return true;
        }
        if self.title.is_match(&upper) {
            return true;
        }
        self.schema
            .keyword_sets
            .iter()
            .any(|keywords| keywords.iter().all(|keyword| upper.contains(keyword)))
    }

    pub fn find_page<'a>(&self, pages: &'a [String]) -> Option<(usize, &'a str)> {
        pages
            .iter()
            .enumerate()
            .find(|(_, page)| self.matches_page(page))
            .map(|(index, page)| (index, page.as_str()))
    }

    pub fn title_line(&self, lines: &[&str]) -> Option<usize> {
        lines.iter().position(|line| {
            let upper = line.to_uppercase();
            self.title.is_match(&upper)
                || self
                    .schema
                    .title_indicators
                    .iter()
                    .any(|indicator| upper.contains(&indicator.to_uppercase()))
        })
    }

    pub fn is_skipped(&self, label: &str) -> bool {
        let lower = label.to_lowercase();
        self.schema
            .skip_labels
            .iter()
            .any(|pattern| lower.contains(pattern))
    }

    pub fn variant_for(
        &self,
        page: &str,
        reference_date: NaiveDate,
    ) -> Option<&'static ColumnVariant> {
        let lower = page.to_lowercase();
        let variants = self.schema.variants;

        variants
            .iter()
            .find(|variant| {
                let marked = variant
                    .markers
                    .iter()
                    .any(|marker| lower.contains(&marker.to_lowercase()));
                let early = variant
                    .before
                    .and_then(|(year, month, day)| NaiveDate::from_ymd_opt(year, month, day))
                    .is_some_and(|limit| reference_date < limit);
                marked || early
            })
            .or_else(|| variants.last())
    }
}

impl ColumnVariant {
    pub fn assign(&self, values: &[u64]) -> Vec<(&'static str, u64)> {
        let width = self.columns.len();
        match self.align {
            Align::Left => self
                .columns
                .iter()
                .zip(values.iter())
                .map(|(column, value)| (*column, *value))
                .collect(),
            Align::Right => {
                let tail = &values[values.len().saturating_sub(width)..];
                let missing = width - tail.len();
                self.columns
                    .iter()
                    .enumerate()
                    .map(|(index, column)| {
                        let value = index
                            .checked_sub(missing)
                            .and_then(|offset| tail.get(offset))
                            .copied()
                            .unwrap_or(0);
                        (*column, value)
                    })
                    .collect()
            }
        }
    }
}
