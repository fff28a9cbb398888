//! End-to-end exports of plain submissions

mod common;

use common::{column, household_submission, read_csv, write_form, write_plain_submission};
use formex::adapters::load_form_definition;
use formex::core::export::{ExportCoordinator, ExportOutcome, ExportSettings, ExportState};
use formex::core::parse::DateRange;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tokio::sync::watch;

fn settings(form_dir: &Path, export_dir: &Path) -> ExportSettings {
    ExportSettings {
        form_dir: form_dir.to_path_buf(),
        export_dir: export_dir.to_path_buf(),
        export_filename: None,
        date_range: DateRange::default(),
        export_media: true,
        overwrite_files: false,
        split_select_multiples: false,
        include_geojson: false,
        parallelism: 4,
    }
}

async fn run(form_path: &Path, settings: ExportSettings) -> (ExportCoordinator, formex::core::export::ExportSummary) {
    let form = load_form_definition(form_path).unwrap();
    let (_tx, rx) = watch::channel(false);
    let mut coordinator = ExportCoordinator::new(form, settings, None, rx);
    let summary = coordinator.execute_export().await.unwrap();
    (coordinator, summary)
}

#[tokio::test]
async fn test_three_submissions_with_two_repeats_each() {
    let dir = TempDir::new().unwrap();
    let form_path = write_form(dir.path(), false);
    let form_dir = dir.path().join("household");
    write_plain_submission(
        &form_dir,
        "c",
        &household_submission("uuid:c", "2019-03-01T10:00:00.000Z", "Carol", &[5, 6]),
    );
    write_plain_submission(
        &form_dir,
        "a",
        &household_submission("uuid:a", "2019-01-01T10:00:00.000Z", "Alice", &[1, 2]),
    );
    write_plain_submission(
        &form_dir,
        "b",
        &household_submission("uuid:b", "2019-02-01T10:00:00.000Z", "Bob, Jr.", &[3, 4]),
    );

    let export_dir = dir.path().join("out");
    let (coordinator, summary) = run(&form_path, settings(&form_dir, &export_dir)).await;

    assert_eq!(summary.candidates, 3);
    assert_eq!(summary.exported, 3);
    assert_eq!(summary.outcome(), ExportOutcome::AllExported);
    assert_eq!(
        coordinator.state(),
        ExportState::Completed(ExportOutcome::AllExported)
    );
    assert_eq!(
        summary.last_exported_date.map(|d| d.to_rfc3339()),
        Some("2019-03-01T10:00:00+00:00".to_string())
    );

    let (main_header, main_rows) = read_csv(&export_dir.join("Household.csv"));
    assert_eq!(main_header.first().map(String::as_str), Some("SubmissionDate"));
    assert_eq!(main_header.last().map(String::as_str), Some("KEY"));
    assert!(main_header.contains(&"SET-OF-g".to_string()));
    assert_eq!(main_rows.len(), 3);

    let key = column(&main_header, "KEY");
    let keys: Vec<&str> = main_rows.iter().map(|row| row[key].as_str()).collect();
    assert_eq!(keys, ["uuid:a", "uuid:b", "uuid:c"], "main table is sorted by date");
    assert_eq!(main_rows[0][0], "Jan 1, 2019 10:00:00 AM");
    assert_eq!(main_rows[1][column(&main_header, "name")], "Bob, Jr.");
    assert_eq!(main_rows[0][column(&main_header, "SET-OF-g")], "uuid:a/g");

    let (g_header, g_rows) = read_csv(&export_dir.join("Household-g.csv"));
    assert_eq!(g_header, ["x", "PARENT_KEY", "KEY", "SET-OF-g"]);
    assert_eq!(g_rows.len(), 6);

    let main_keys: HashSet<&str> = keys.into_iter().collect();
    for row in &g_rows {
        assert!(main_keys.contains(row[1].as_str()), "PARENT_KEY {} is a main KEY", row[1]);
        assert!(row[2].starts_with(&format!("{}/g[", row[1])));
        assert_eq!(row[3], format!("{}/g", row[1]));
    }
    let instance_keys: HashSet<&str> = g_rows.iter().map(|row| row[2].as_str()).collect();
    assert!(instance_keys.contains("uuid:a/g[1]"));
    assert!(instance_keys.contains("uuid:a/g[2]"));
}

#[tokio::test]
async fn test_media_deduplication_across_submissions() {
    let dir = TempDir::new().unwrap();
    let form_path = write_form(dir.path(), false);
    let form_dir = dir.path().join("household");

    let with_photo = |id: &str, date: &str| {
        household_submission(id, date, "P", &[])
            .replace("<photo/>", "<photo>photo.jpg</photo>")
    };
    let a = write_plain_submission(&form_dir, "a", &with_photo("uuid:a", "2019-01-01T00:00:00Z"));
    let b = write_plain_submission(&form_dir, "b", &with_photo("uuid:b", "2019-01-02T00:00:00Z"));
    let c = write_plain_submission(&form_dir, "c", &with_photo("uuid:c", "2019-01-03T00:00:00Z"));
    fs::write(a.join("photo.jpg"), b"same").unwrap();
    fs::write(b.join("photo.jpg"), b"same").unwrap();
    fs::write(c.join("photo.jpg"), b"different").unwrap();

    let export_dir = dir.path().join("out");
    let mut settings = settings(&form_dir, &export_dir);
    // One worker keeps the copy order deterministic
    settings.parallelism = 1;
    let (_, summary) = run(&form_path, settings).await;
    assert_eq!(summary.exported, 3);

    let media = export_dir.join("media");
    assert_eq!(fs::read(media.join("photo.jpg")).unwrap(), b"same");
    assert_eq!(fs::read(media.join("photo-2.jpg")).unwrap(), b"different");
    assert!(!media.join("photo-3.jpg").exists());

    let (header, rows) = read_csv(&export_dir.join("Household.csv"));
    let photo = column(&header, "photo");
    let photos: Vec<&str> = rows.iter().map(|row| row[photo].as_str()).collect();
    assert_eq!(photos, ["media/photo.jpg", "media/photo.jpg", "media/photo-2.jpg"]);
}

#[tokio::test]
async fn test_attachment_names_cannot_leave_media_dir() {
    let dir = TempDir::new().unwrap();
    let form_path = write_form(dir.path(), false);
    let form_dir = dir.path().join("household");
    fs::create_dir_all(&form_dir).unwrap();
    fs::write(form_dir.join("outside.txt"), b"not an attachment").unwrap();
    write_plain_submission(
        &form_dir,
        "a",
        &household_submission("uuid:a", "2019-01-01T00:00:00Z", "A", &[1])
            .replace("<photo/>", "<photo>../../outside.txt</photo>"),
    );
    write_plain_submission(
        &form_dir,
        "b",
        &household_submission("uuid:b", "2019-01-02T00:00:00Z", "B", &[2]),
    );

    let export_dir = dir.path().join("out");
    let (_, summary) = run(&form_path, settings(&form_dir, &export_dir)).await;

    assert_eq!(summary.exported, 1);
    assert_eq!(summary.skipped, 1);
    assert!(summary.errors[0].message.contains("../../outside.txt"));
    assert!(!dir.path().join("outside.txt").exists());

    let (header, rows) = read_csv(&export_dir.join("Household.csv"));
    let key = column(&header, "KEY");
    let keys: Vec<&str> = rows.iter().map(|row| row[key].as_str()).collect();
    assert_eq!(keys, ["uuid:b"]);
}

#[tokio::test]
async fn test_unparsable_submission_is_skipped() {
    let dir = TempDir::new().unwrap();
    let form_path = write_form(dir.path(), false);
    let form_dir = dir.path().join("household");
    write_plain_submission(
        &form_dir,
        "a",
        &household_submission("uuid:a", "2019-01-01T00:00:00Z", "A", &[1]),
    );
    write_plain_submission(&form_dir, "broken", "<data id=\"household\"><name>");

    let export_dir = dir.path().join("out");
    let (coordinator, summary) = run(&form_path, settings(&form_dir, &export_dir)).await;

    assert_eq!(summary.exported, 1);
    assert_eq!(summary.skipped, 1);
    assert!(summary.errors[0].path.as_deref().unwrap_or_default().contains("broken"));
    assert_eq!(
        coordinator.state(),
        ExportState::Completed(ExportOutcome::SomeSkipped)
    );
}

#[tokio::test]
async fn test_date_range_filters_candidates() {
    let dir = TempDir::new().unwrap();
    let form_path = write_form(dir.path(), false);
    let form_dir = dir.path().join("household");
    for (id, date) in [
        ("a", "2018-12-31T23:00:00Z"),
        ("b", "2019-06-15T12:00:00Z"),
        ("c", "2020-01-01T00:00:00Z"),
    ] {
        write_plain_submission(
            &form_dir,
            id,
            &household_submission(&format!("uuid:{id}"), date, id, &[]),
        );
    }

    let export_dir = dir.path().join("out");
    let mut settings = settings(&form_dir, &export_dir);
    settings.date_range = DateRange::new(
        chrono::NaiveDate::from_ymd_opt(2019, 1, 1),
        chrono::NaiveDate::from_ymd_opt(2019, 12, 31),
    );
    let (_, summary) = run(&form_path, settings).await;

    assert_eq!(summary.candidates, 1);
    let (header, rows) = read_csv(&export_dir.join("Household.csv"));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][column(&header, "KEY")], "uuid:b");
}

#[tokio::test]
async fn test_second_run_appends_unless_overwriting() {
    let dir = TempDir::new().unwrap();
    let form_path = write_form(dir.path(), false);
    let form_dir = dir.path().join("household");
    write_plain_submission(
        &form_dir,
        "a",
        &household_submission("uuid:a", "2019-01-01T00:00:00Z", "A", &[1]),
    );
    let export_dir = dir.path().join("out");

    run(&form_path, settings(&form_dir, &export_dir)).await;
    run(&form_path, settings(&form_dir, &export_dir)).await;
    let (_, rows) = read_csv(&export_dir.join("Household.csv"));
    assert_eq!(rows.len(), 2, "header written once, rows appended");

    let mut overwrite = settings(&form_dir, &export_dir);
    overwrite.overwrite_files = true;
    run(&form_path, overwrite).await;
    let (_, rows) = read_csv(&export_dir.join("Household.csv"));
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn test_empty_instances_directory_exports_headers() {
    let dir = TempDir::new().unwrap();
    let form_path = write_form(dir.path(), false);
    let form_dir = dir.path().join("household");
    fs::create_dir_all(form_dir.join("instances")).unwrap();

    let export_dir = dir.path().join("out");
    let mut settings = settings(&form_dir, &export_dir);
    settings.export_filename = Some("survey.csv".to_string());
    let (coordinator, summary) = run(&form_path, settings).await;

    assert_eq!(summary.candidates, 0);
    assert_eq!(
        coordinator.state(),
        ExportState::Completed(ExportOutcome::AllExported)
    );
    let (header, rows) = read_csv(&export_dir.join("survey.csv"));
    assert_eq!(header.first().map(String::as_str), Some("SubmissionDate"));
    assert!(rows.is_empty());
    assert!(export_dir.join("survey-g.csv").exists());
}
