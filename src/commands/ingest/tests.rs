use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use tempfile::TempDir;

use super::cells::CellParser;
use super::landings::{plausible, read_chart_labels};
use super::pages::split_pages;
use super::run::{persist, select_reports};
use super::schema::{CompiledSchema, RECEPTION};
use super::*;
use crate::cli::{CommonArgs, DatasetKind, IngestArgs};
use crate::dates::YearMonth;
use crate::model::{FacilityType, NationalityRow, PdfEntry, PdfInventoryManifest};
use crate::settings::Settings;
use crate::store;

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn layout_report(filename: &str, reference_date: NaiveDate, pages: &[&str]) -> ReportText {
    ReportText {
        filename: filename.to_string(),
        reference_date,
        layout_pages: pages.iter().map(|page| page.to_string()).collect(),
        raw_pages: Vec::new(),
    }
}

fn raw_report(filename: &str, reference_date: NaiveDate, pages: &[String]) -> ReportText {
    ReportText {
        filename: filename.to_string(),
        reference_date,
        layout_pages: Vec::new(),
        raw_pages: pages.to_vec(),
    }
}

const CHART_FOOTNOTE: &str = "*I dati si riferiscono agli eventi di sbarco rilevati entro le ore 8:00 del giorno di riferimento";
const CHART_SOURCE: &str = "Fonte: Dipartimento della Pubblica sicurezza. I dati sono suscettibili di successivo consolidamento.";

fn chart_page(title: &str, labels: &[(u32, u64)], abbr: &str) -> String {
    let mut page = format!("Cruscotto statistico giornaliero\n{title}\n");
    for (day, value) in labels {
        page.push_str(&format!("{day}-{abbr}\n{value}\n"));
    }
    page.push_str(CHART_FOOTNOTE);
    page.push('\n');
    page.push_str(CHART_SOURCE);
    page.push('\n');
    page
}

#[test]
fn group_line_pairs_labels_with_following_counts() {
    let cells = CellParser::new().unwrap();

    let groups = cells.group_line("   12   Tunisia      1.203     Guinea    87   Costa d'Avorio  -");
    let summary = groups
        .iter()
        .map(|group| (group.label.as_str(), group.values.clone()))
        .collect::<Vec<_>>();
    assert_eq!(
        summary,
        vec![
            ("Tunisia", vec![1203]),
            ("Guinea", vec![87]),
            ("Costa d'Avorio", vec![0]),
        ]
    );

    let shares = cells.group_line("Lombardia   13.015   9,3%   Sicilia 10.080  7,2");
    assert_eq!(shares[0].values, vec![13015]);
    assert_eq!(shares[1].values, vec![10080]);

    let coerced = cells.group_line("Egitto 1'203");
    assert_eq!(coerced[0].values, vec![1203]);
    assert_eq!(coerced[0].coerced, vec!["1'203".to_string()]);

    assert!(cells.group_line("Regione   Hot spot   SAI   Totale").is_empty());

    let punctuated = cells.group_line("Nazionalità: Tunisia, 120   Sicilia*: 45  Totale: 165");
    let labels = punctuated
        .iter()
        .map(|group| (group.label.as_str(), group.values.clone()))
        .collect::<Vec<_>>();
    assert_eq!(
        labels,
        vec![("Tunisia", vec![120]), ("Sicilia", vec![45]), ("Totale", vec![165])]
    );
}

#[test]
fn page_split_drops_trailing_blank_pages_and_nul_bytes() {
    let pages = split_pages("first\u{0000} page\u{000C}second\u{000C}\n  \u{000C}");
    assert_eq!(pages, vec!["first page".to_string(), "second".to_string()]);
}

const NATIONALITY_PAGE: &str = "Cruscotto statistico giornaliero
               Nazionalità dichiarate al momento dello sbarco
 Aggiornamento al 31 maggio 2021
 Tunisia            1.203        Guinea          87
 Costa d’Avorio       300        Bangladesh      250
 Eritrea              -          Sudan           45
 Tunisia              12
 Egitto            1'203
 Totale            3.098
";

#[test]
fn nationality_rows_come_from_the_table_under_the_title() {
    let extractor = NationalityExtractor::new().unwrap();
    let report = layout_report(
        "cruscotto_statistico_giornaliero_31-05-2021.pdf",
        date(2021, 5, 31),
        &["Cruscotto statistico giornaliero\nSbarchi 2021   12.000", NATIONALITY_PAGE],
    );

    let extracted = extractor.extract(&report);
    let rows = extracted
        .rows
        .iter()
        .map(|row| (row.nationality.as_str(), row.landed))
        .collect::<Vec<_>>();

    assert_eq!(
        rows,
        vec![
            ("Tunisia", 1203),
            ("Guinea", 87),
            ("Costa d'Avorio", 300),
            ("Bangladesh", 250),
            ("Sudan", 45),
            ("Egitto", 1203),
        ]
    );
    assert!(extracted.rows.iter().all(|row| {
        row.reference_date == date(2021, 5, 31)
            && row.source_file == "cruscotto_statistico_giornaliero_31-05-2021.pdf"
    }));
    assert_eq!(extracted.warnings.len(), 1);
    assert!(extracted.warnings[0].contains("1'203"));
}

#[test]
fn punctuated_nationality_labels_are_cleaned() {
    let extractor = NationalityExtractor::new().unwrap();
    for line in ["Nazionalità: Tunisia, 120", "Tunisia, 120", "Tunisia: 120"] {
        let page = format!("Nazionalità dichiarate al momento dello sbarco\n{line}\n");
        let report = layout_report("report.pdf", date(2021, 5, 1), &[page.as_str()]);

        let rows = extractor
            .extract(&report)
            .rows
            .into_iter()
            .map(|row| (row.reference_date, row.nationality, row.landed))
            .collect::<Vec<_>>();
        assert_eq!(
            rows,
            vec![(date(2021, 5, 1), "Tunisia".to_string(), 120)],
            "{line}"
        );
    }
}

#[test]
fn cote_divoire_spellings_collapse_to_one_name() {
    let extractor = NationalityExtractor::new().unwrap();
    for spelling in [
        "Costa d'Avorio",
        "Costa d’Avorio",
        "Costa d´Avorio",
        "Costa dâ€™Avorio",
        "Costa d''Avorio",
        "COSTA D AVORIO",
        "Costa  d'Avorio",
    ] {
        assert_eq!(
            extractor.normalize_nationality(spelling),
            nationality::COTE_DIVOIRE,
            "{spelling}"
        );
    }
    assert_eq!(extractor.normalize_nationality("Costa  Rica"), "Costa Rica");
}

#[test]
fn report_without_nationality_table_yields_nothing() {
    let extractor = NationalityExtractor::new().unwrap();
    let report = layout_report(
        "cruscotto_statistico_giornaliero_31-05-2021.pdf",
        date(2021, 5, 31),
        &["Sbarchi per mese\n Gennaio  1.000\n Febbraio 2.000"],
    );
    let extracted = extractor.extract(&report);
    assert!(extracted.rows.is_empty());
    assert!(extracted.warnings.is_empty());
}

const RECEPTION_PAGE: &str = "Presenze migranti in accoglienza al 31 maggio 2021
 Regione             Hot spot   Centri di accoglienza    SAI       Totale
 Lombardia                              8.450         1.200      9.650
 Sicilia               520              4.100           900      5.520
 Valle d'Aosta/Vallée d'Aoste              67            12         79
 Trentino-Alto Adige                    1.100           300      1.400
 Sicilia               999                999           999        999
 Totale                520             13.717         2.412     16.649
";

#[test]
fn post_2019_reception_reads_right_aligned_breakdown() {
    let extractor = ReceptionExtractor::new().unwrap();
    let report = layout_report(
        "cruscotto_statistico_giornaliero_31-05-2021.pdf",
        date(2021, 5, 31),
        &[RECEPTION_PAGE],
    );

    let extracted = extractor.extract(&report);
    assert_eq!(extracted.rows.len(), 16);
    assert!(extracted.rows.iter().all(|row| row.layout == "post-2019"));

    let lookup = |region: &str, facility_type: FacilityType| {
        extracted
            .rows
            .iter()
            .find(|row| row.region == region && row.facility_type == facility_type)
            .map(|row| row.present)
    };
    assert_eq!(lookup("Lombardia", FacilityType::HotSpot), Some(0));
    assert_eq!(lookup("Lombardia", FacilityType::ReceptionCentre), Some(8450));
    assert_eq!(lookup("Lombardia", FacilityType::Sai), Some(1200));
    assert_eq!(lookup("Lombardia", FacilityType::Total), Some(9650));
    assert_eq!(lookup("Sicilia", FacilityType::HotSpot), Some(520));
    assert_eq!(lookup("Sicilia", FacilityType::Total), Some(5520));
    assert_eq!(lookup("Valle d'Aosta", FacilityType::Total), Some(79));
    assert_eq!(lookup("Trentino-Alto Adige", FacilityType::Sai), Some(300));
}

const PRE_2019_PAGE: &str = "Presenze migranti in accoglienza
 Regione     Totale immigrati presenti sul territorio regione     percentuale di distribuzione
 Lombardia          13.015        9%
 Sicilia            10.080        7%
 Totale            144.000      100%
";

#[test]
fn pre_2019_reception_keeps_only_totals() {
    let extractor = ReceptionExtractor::new().unwrap();
    let report = layout_report(
        "cruscotto_statistico_giornaliero_31-12-2018.pdf",
        date(2018, 12, 31),
        &[PRE_2019_PAGE],
    );

    let extracted = extractor.extract(&report);
    let rows = extracted
        .rows
        .iter()
        .map(|row| (row.region.as_str(), row.facility_type, row.present, row.layout.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        rows,
        vec![
            ("Lombardia", FacilityType::Total, 13015, "pre-2019"),
            ("Sicilia", FacilityType::Total, 10080, "pre-2019"),
        ]
    );
}

#[test]
fn reception_variant_follows_markers_then_date() {
    let schema = CompiledSchema::new(&RECEPTION).unwrap();

    let marked = schema.variant_for(PRE_2019_PAGE, date(2019, 7, 31)).unwrap();
    assert_eq!(marked.layout, "pre-2019");

    let early = schema
        .variant_for("Regione Hot spot Totale", date(2019, 5, 31))
        .unwrap();
    assert_eq!(early.layout, "pre-2019");

    let current = schema.variant_for(RECEPTION_PAGE, date(2019, 6, 30)).unwrap();
    assert_eq!(current.layout, "post-2019");
}

#[test]
fn region_spellings_normalize_to_canonical_names() {
    let cases = [
        ("LOMBARDIA", Some("Lombardia")),
        ("Lombardie", Some("Lombardia")),
        ("Valle d’Aosta/Vallée d'Aoste", Some("Valle d'Aosta")),
        ("Valle D'Aosta", Some("Valle d'Aosta")),
        ("Trentino-Alto Adige/Südtirol", Some("Trentino-Alto Adige")),
        ("Trentino Alto Adige (*)", Some("Trentino-Alto Adige")),
        ("Friuli Venezia Giulia", Some("Friuli-Venezia Giulia")),
        ("Emilia Romagna", Some("Emilia-Romagna")),
        ("Totale", None),
        ("Lazion", None),
    ];
    for (label, expected) in cases {
        assert_eq!(normalize_region(label), expected, "{label}");
    }
}

const CHART_TITLE: &str = "Migranti sbarcati per giorno al 31 maggio 2023* - mese di maggio";

#[test]
fn chart_area_stops_at_the_footnote_and_drops_noise() {
    let extractor = DailyLandingsExtractor::new().unwrap();
    let mut page = chart_page(CHART_TITLE, &[(1, 120), (2, 45)], "mag");
    page = page.replace("2-mag", "Totale 165\n2-mag");

    let area = extractor.chart_area(&page).unwrap();
    assert_eq!(area, "1-mag\n120\n2-mag\n45");
    assert!(extractor.chart_area("no chart here").is_none());
}

#[test]
fn chart_labels_fall_back_to_looser_patterns() {
    let month = YearMonth::new(2023, 5).unwrap();

    let primary = "1-mag\n120\n2-MAG 45\n3-mag\n7\n40-mag\n12\n4-mag\n99999";
    let values = read_chart_labels(primary, month).unwrap();
    assert_eq!(values.get(&1), Some(&120));
    assert_eq!(values.get(&2), Some(&45));
    assert_eq!(values.get(&3), Some(&7));
    assert!(!values.contains_key(&4));

    let spaced = (1..=12)
        .map(|day| format!("{day} mag {}", 100 + day))
        .collect::<Vec<_>>()
        .join("\n");
    let values = read_chart_labels(&spaced, month).unwrap();
    assert_eq!(values.len(), 12);
    assert_eq!(values.get(&12), Some(&112));
}

#[test]
fn chart_values_keep_thousands_separators() {
    let month = YearMonth::new(2023, 8).unwrap();

    let area = (1..=9)
        .map(|day| format!("{day}-ago\n1.00{day}"))
        .chain(["10-ago\n1.010".to_string(), "12-ago 1.203".to_string()])
        .collect::<Vec<_>>()
        .join("\n");
    let values = read_chart_labels(&area, month).unwrap();
    assert_eq!(values.len(), 11);
    assert_eq!(values.get(&1), Some(&1001));
    assert_eq!(values.get(&10), Some(&1010));
    assert_eq!(values.get(&12), Some(&1203));

    let spaced = (1..=12)
        .map(|day| format!("{day} ago 2.{:03}", day * 10))
        .collect::<Vec<_>>()
        .join("\n");
    let values = read_chart_labels(&spaced, month).unwrap();
    assert_eq!(values.get(&3), Some(&2030));
    assert_eq!(values.get(&12), Some(&2120));
}

#[test]
fn implausible_label_sets_are_rejected() {
    let few = (1..=4).map(|day| (day, 10)).collect::<BTreeMap<u32, u64>>();
    assert!(!plausible(&few, 31));

    let enough = (1..=10).map(|day| (day, 10)).collect::<BTreeMap<u32, u64>>();
    assert!(plausible(&enough, 31));
    assert!(!plausible(&BTreeMap::new(), 28));
}

#[test]
fn daily_landings_fill_unlabelled_days_with_zero() {
    let extractor = DailyLandingsExtractor::new().unwrap();
    let labels = (1..=20)
        .filter(|day| *day != 5)
        .map(|day| (day, u64::from(day) * 10))
        .collect::<Vec<_>>();
    let pages = vec![
        "Cruscotto statistico giornaliero\nSbarchi 2023".to_string(),
        chart_page(CHART_TITLE, &labels, "mag"),
    ];
    let report = raw_report(
        "cruscotto_statistico_giornaliero_31-05-2023.pdf",
        date(2023, 5, 31),
        &pages,
    );

    let extracted = extractor.extract(&report);
    assert_eq!(extracted.rows.len(), 31);
    assert_eq!(extracted.rows[0].date, date(2023, 5, 1));
    assert_eq!(extracted.rows[0].landed, 10);
    assert_eq!(extracted.rows[4].landed, 0);
    assert_eq!(extracted.rows[19].landed, 200);
    assert_eq!(extracted.rows[30].date, date(2023, 5, 31));
    assert_eq!(extracted.rows[30].landed, 0);
    assert!(extracted
        .rows
        .iter()
        .all(|row| row.reference_date == date(2023, 5, 31)));
}

#[test]
fn chart_without_footnotes_is_ignored() {
    let extractor = DailyLandingsExtractor::new().unwrap();
    let labels = (1..=20).map(|day| (day, 10)).collect::<Vec<_>>();
    let page = chart_page(CHART_TITLE, &labels, "mag").replace(CHART_SOURCE, "");
    let report = raw_report("report.pdf", date(2023, 5, 31), &[page]);

    assert!(extractor.extract(&report).rows.is_empty());
}

fn options(since: Option<NaiveDate>, until: Option<NaiveDate>) -> IngestOptions {
    IngestOptions {
        datasets: DatasetKind::ALL.to_vec(),
        since,
        until,
        rebuild: false,
        max_files: None,
        command: "cruscotto ingest".to_string(),
    }
}

fn inventory(entries: &[(&str, Option<NaiveDate>)]) -> PdfInventoryManifest {
    let pdfs = entries
        .iter()
        .map(|(filename, reference_date)| PdfEntry {
            filename: filename.to_string(),
            reference_date: *reference_date,
            size_bytes: 1,
            sha256: String::new(),
        })
        .collect::<Vec<_>>();
    PdfInventoryManifest {
        manifest_version: 1,
        generated_at: String::new(),
        source_directory: "pdf".to_string(),
        pdf_count: pdfs.len(),
        undated_count: 0,
        pdfs,
    }
}

#[test]
fn report_selection_respects_window_and_file_cap() {
    let inventory = inventory(&[
        ("b.pdf", Some(date(2021, 3, 31))),
        ("a.pdf", Some(date(2021, 1, 31))),
        ("undated.pdf", None),
        ("c.pdf", Some(date(2021, 5, 31))),
        ("d.pdf", Some(date(2021, 7, 31))),
    ]);

    let (selected, warnings) = select_reports(
        &inventory,
        &options(Some(date(2021, 2, 1)), Some(date(2021, 6, 30))),
    );
    assert_eq!(
        selected,
        vec![
            ("b.pdf".to_string(), date(2021, 3, 31)),
            ("c.pdf".to_string(), date(2021, 5, 31)),
        ]
    );
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("undated.pdf"));

    let mut capped = options(None, None);
    capped.max_files = Some(2);
    let (selected, _) = select_reports(&inventory, &capped);
    let names = selected.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["a.pdf", "b.pdf"]);
}

#[test]
fn recent_months_narrow_an_explicit_since() {
    let args = IngestArgs {
        common: CommonArgs {
            data_root: PathBuf::from("data"),
        },
        datasets: vec![DatasetKind::DailyLandings, DatasetKind::Nationality],
        recent_months: Some(3),
        since: Some(date(2020, 1, 1)),
        until: None,
        rebuild: false,
        max_files: None,
    };

    let options = IngestOptions::from_args(&args, date(2021, 6, 15));
    assert_eq!(options.since, Some(date(2021, 3, 15)));
    assert_eq!(
        options.datasets,
        vec![DatasetKind::Nationality, DatasetKind::DailyLandings]
    );
    assert!(!options.selects(DatasetKind::Reception));
    assert!(options.command.contains("--recent-months 3"));
}

fn nationality_row(reference_date: NaiveDate, nationality: &str, landed: u64) -> NationalityRow {
    NationalityRow {
        reference_date,
        nationality: nationality.to_string(),
        landed,
        source_file: format!("report_{reference_date}.pdf"),
    }
}

#[test]
fn persist_drops_rows_below_the_floor_and_merges() {
    let temp = TempDir::new().unwrap();
    let settings = Settings::new(temp.path());

    let first = vec![
        nationality_row(date(2016, 12, 31), "Nigeria", 10),
        nationality_row(date(2017, 1, 31), "Nigeria", 20),
        nationality_row(date(2017, 1, 31), "Guinea", 5),
    ];
    let counts = persist(&settings, first, 2, false).unwrap();
    assert_eq!(counts.dataset, "landings_by_nationality");
    assert_eq!(counts.extracted_rows, 3);
    assert_eq!(counts.below_date_floor, 1);
    assert_eq!(counts.total_rows, 2);
    assert_eq!(counts.files_with_rows, 2);
    assert!(settings.parquet_path(DatasetKind::Nationality).exists());
    assert!(settings.csv_path(DatasetKind::Nationality).exists());

    let second = vec![nationality_row(date(2017, 2, 28), "Nigeria", 30)];
    let counts = persist(&settings, second, 1, false).unwrap();
    assert_eq!(counts.existing_rows, 2);
    assert_eq!(counts.total_rows, 3);

    let rebuilt = vec![nationality_row(date(2018, 3, 31), "Mali", 7)];
    let counts = persist(&settings, rebuilt, 1, true).unwrap();
    assert_eq!(counts.existing_rows, 0);
    assert_eq!(counts.total_rows, 1);

    let stored = store::load::<NationalityRow>(&settings).unwrap();
    assert_eq!(stored, vec![nationality_row(date(2018, 3, 31), "Mali", 7)]);
}
