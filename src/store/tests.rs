use std::collections::HashSet;

use chrono::NaiveDate;
use tempfile::TempDir;

use super::*;
use crate::model::{DailyLandingRow, FacilityType, NationalityRow, ReceptionRow};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn nationality(reference: NaiveDate, name: &str, landed: u64) -> NationalityRow {
    NationalityRow {
        reference_date: reference,
        nationality: name.to_string(),
        landed,
        source_file: format!("report_{reference}.pdf"),
    }
}

fn daily(day: NaiveDate, landed: u64, reference: NaiveDate) -> DailyLandingRow {
    DailyLandingRow {
        date: day,
        landed,
        reference_date: reference,
        source_file: format!("report_{reference}.pdf"),
    }
}

#[test]
fn merge_replaces_whole_report_snapshots() {
    let existing = vec![
        nationality(date(2025, 10, 1), "Italia", 100),
        nationality(date(2025, 10, 2), "Francia", 150),
        nationality(date(2025, 10, 2), "Egitto", 40),
    ];
    let incoming = vec![
        nationality(date(2025, 10, 2), "Francia", 200),
        nationality(date(2025, 10, 3), "Spagna", 120),
    ];

    let (merged, stats) = merge_rows(existing, incoming);

    assert_eq!(merged.len(), 3);
    assert_eq!(stats.kept, 1);
    assert_eq!(stats.replaced, 2);
    assert_eq!(stats.total, 3);

    let francia = merged
        .iter()
        .find(|row| row.nationality == "Francia")
        .unwrap();
    assert_eq!(francia.landed, 200);
    assert!(
        merged.iter().all(|row| row.nationality != "Egitto"),
        "stale rows of a refreshed report must not survive"
    );
}

#[test]
fn merging_the_same_batch_twice_is_idempotent() {
    let existing = vec![
        nationality(date(2024, 1, 31), "Tunisia", 300),
        nationality(date(2024, 2, 29), "Tunisia", 500),
    ];
    let incoming = vec![
        nationality(date(2024, 2, 29), "Tunisia", 550),
        nationality(date(2024, 2, 29), "Guinea", 80),
        nationality(date(2024, 3, 31), "Tunisia", 700),
    ];

    let (once, _) = merge_rows(existing, incoming.clone());
    let (twice, stats) = merge_rows(once.clone(), incoming);

    assert_eq!(once, twice);
    assert_eq!(stats.total, once.len());
}

#[test]
fn overlapping_ranges_keep_unique_keys_and_latest_values() {
    let first_run = vec![
        daily(date(2024, 1, 1), 10, date(2024, 1, 31)),
        daily(date(2024, 1, 2), 20, date(2024, 1, 31)),
        daily(date(2024, 2, 1), 5, date(2024, 2, 29)),
    ];
    let second_run = vec![
        daily(date(2024, 2, 1), 7, date(2024, 2, 29)),
        daily(date(2024, 3, 1), 9, date(2024, 3, 31)),
    ];

    let (after_first, _) = merge_rows(Vec::new(), first_run);
    let (merged, _) = merge_rows(after_first, second_run);

    let keys = merged.iter().map(Record::key).collect::<HashSet<_>>();
    assert_eq!(keys.len(), merged.len());
    assert_eq!(merged.len(), 4);

    let february = merged
        .iter()
        .find(|row| row.date == date(2024, 2, 1))
        .unwrap();
    assert_eq!(february.landed, 7);
}

#[test]
fn day_reported_by_a_later_report_wins_over_an_earlier_one() {
    let existing = vec![daily(date(2025, 5, 20), 11, date(2025, 5, 21))];
    let incoming = vec![daily(date(2025, 5, 20), 13, date(2025, 5, 31))];

    let (merged, stats) = merge_rows(existing, incoming);

    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].landed, 13);
    assert_eq!(merged[0].reference_date, date(2025, 5, 31));
    assert_eq!(stats.kept, 0);
    assert_eq!(stats.replaced, 1);
}

#[test]
fn saved_datasets_load_back_with_csv_mirror() {
    let temp = TempDir::new().unwrap();
    let settings = Settings::new(temp.path());

    let rows = vec![
        ReceptionRow {
            reference_date: date(2021, 5, 31),
            region: "Lombardia".to_string(),
            facility_type: FacilityType::ReceptionCentre,
            present: 8_450,
            layout: "post-2019".to_string(),
            source_file: "report.pdf".to_string(),
        },
        ReceptionRow {
            reference_date: date(2021, 5, 31),
            region: "Lombardia".to_string(),
            facility_type: FacilityType::Total,
            present: 10_200,
            layout: "post-2019".to_string(),
            source_file: "report.pdf".to_string(),
        },
    ];

    save(&settings, &rows).unwrap();
    let loaded = load::<ReceptionRow>(&settings).unwrap();
    assert_eq!(loaded, rows);

    let csv = std::fs::read_to_string(settings.csv_path(DatasetKind::Reception)).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("reference_date,region,facility_type,present,layout,source_file")
    );
    assert_eq!(
        lines.next(),
        Some("2021-05-31,Lombardia,reception_centre,8450,post-2019,report.pdf")
    );

    let info = describe::<ReceptionRow>(&settings).unwrap().unwrap();
    assert_eq!(info.row_count, 2);
    assert_eq!(info.report_count, 1);
    assert_eq!(info.first_reference_date, Some(date(2021, 5, 31)));
}

#[test]
fn missing_dataset_loads_empty_and_csv_mirror_is_a_fallback() {
    let temp = TempDir::new().unwrap();
    let settings = Settings::new(temp.path());

    assert!(load::<DailyLandingRow>(&settings).unwrap().is_empty());
    assert!(describe::<DailyLandingRow>(&settings).unwrap().is_none());

    std::fs::create_dir_all(&settings.output_dir).unwrap();
    std::fs::write(
        settings.csv_path(DatasetKind::DailyLandings),
        "date,landed,reference_date,source_file\n2024-03-01,42,2024-03-31,a.pdf\n",
    )
    .unwrap();

    let loaded = load::<DailyLandingRow>(&settings).unwrap();
    assert_eq!(loaded, vec![daily_with_source(date(2024, 3, 1), 42, date(2024, 3, 31), "a.pdf")]);
}

#[test]
fn empty_dataset_still_writes_a_header() {
    let temp = TempDir::new().unwrap();
    let settings = Settings::new(temp.path());

    save::<NationalityRow>(&settings, &[]).unwrap();

    let csv = std::fs::read_to_string(settings.csv_path(DatasetKind::Nationality)).unwrap();
    assert_eq!(csv.trim(), "reference_date,nationality,landed,source_file");
    assert!(load::<NationalityRow>(&settings).unwrap().is_empty());
}

fn daily_with_source(
    day: NaiveDate,
    landed: u64,
    reference: NaiveDate,
    source: &str,
) -> DailyLandingRow {
    DailyLandingRow {
        date: day,
        landed,
        reference_date: reference,
        source_file: source.to_string(),
    }
}
