use chrono::NaiveDate;
use incidence_forecast::data::{DataLoader, Observation};
use incidence_forecast::updater::{
    merge_observations, read_observations, DataStatus, DataUpdater, UpdateStatus,
};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::tempdir;

fn obs(year: i32, value: f64) -> Observation {
    Observation {
        period: NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
        value,
    }
}

#[test]
fn test_merge_keeps_existing_on_collision() {
    let existing = vec![obs(2000, 10.0), obs(2001, 9.0)];
    let incoming = vec![obs(2002, 8.0), obs(2001, 99.0)];

    let (merged, added) = merge_observations(&existing, &incoming);

    assert_eq!(added, 1);
    assert_eq!(merged, vec![obs(2000, 10.0), obs(2001, 9.0), obs(2002, 8.0)]);
}

#[test]
fn test_validate_reports_findings() {
    let updater = DataUpdater::new("unused.csv");
    let report = updater.validate(&[
        obs(2000, 10.0),
        obs(2001, 1200.0),
        obs(2001, 9.0),
        obs(2004, -1.0),
    ]);

    assert_eq!(report.duplicates, vec![obs(2001, 0.0).period]);
    assert_eq!(report.gaps, vec![(obs(2001, 0.0).period, obs(2004, 0.0).period)]);
    assert_eq!(report.out_of_range.len(), 2);
    assert!(!report.is_clean());

    assert!(updater.validate(&[obs(2000, 1.0), obs(2001, 2.0)]).is_clean());
}

#[test]
fn test_apply_backs_up_and_writes() {
    let dir = tempdir().unwrap();
    let data_file = dir.path().join("tb.csv");
    fs::write(&data_file, "ds,y\n2000,322\n2001,315\n").unwrap();

    let updater = DataUpdater::new(&data_file);
    let outcome = updater.apply(&[obs(2002, 308.0), obs(2001, 1.0)]).unwrap();

    assert_eq!(outcome.added, 1);
    assert_eq!(outcome.total, 3);
    assert!(outcome.report.is_clean());

    let backups: Vec<_> = fs::read_dir(updater.backup_dir())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect();
    assert_eq!(backups.len(), 1);
    assert!(backups[0].starts_with("tb_backup_"));
    assert!(backups[0].ends_with(".csv"));

    let written = read_observations(&data_file).unwrap();
    assert_eq!(written, vec![obs(2000, 322.0), obs(2001, 315.0), obs(2002, 308.0)]);

    // The merged file is a valid input for the loader
    let series = DataLoader::from_csv(&data_file).unwrap();
    assert_eq!(series.len(), 3);
}

#[test]
fn test_apply_creates_missing_file() {
    let dir = tempdir().unwrap();
    let data_file = dir.path().join("new.csv");
    let incoming = dir.path().join("incoming.csv");
    fs::write(&incoming, "ds,y\n2024-01-01,210.0\n2023-01-01,215.0\n").unwrap();

    let updater = DataUpdater::new(&data_file);
    assert_eq!(updater.backup().unwrap(), None);

    let outcome = updater.apply_file(&incoming).unwrap();
    assert_eq!(outcome.added, 2);
    assert!(!updater.backup_dir().exists());
    assert_eq!(
        read_observations(&data_file).unwrap(),
        vec![obs(2023, 215.0), obs(2024, 210.0)]
    );
}

#[test]
fn test_backups_in_the_same_second_are_kept() {
    let dir = tempdir().unwrap();
    let data_file = dir.path().join("tb.csv");
    fs::write(&data_file, "ds,y\n2000,322\n").unwrap();

    let updater = DataUpdater::new(&data_file);
    let first = updater.backup().unwrap().unwrap();
    let second = updater.backup().unwrap().unwrap();
    let third = updater.backup().unwrap().unwrap();

    assert_ne!(first, second);
    assert_ne!(second, third);
    assert_eq!(fs::read_dir(updater.backup_dir()).unwrap().count(), 3);
    for backup in [first, second, third] {
        assert_eq!(fs::read_to_string(backup).unwrap(), "ds,y\n2000,322\n");
    }
}

#[test]
fn test_status_of_current_file() {
    let dir = tempdir().unwrap();
    let data_file = dir.path().join("tb.csv");
    fs::write(&data_file, "ds,y\n2001,315\n2000,322\n2002,308\n").unwrap();

    let status = DataUpdater::new(&data_file).status().unwrap();
    assert_eq!(
        status,
        UpdateStatus::Current(DataStatus {
            first_period: obs(2000, 0.0).period,
            latest_period: obs(2002, 0.0).period,
            latest_value: 308.0,
            records: 3,
            clean: true,
        })
    );

    let text = status.to_string();
    assert!(text.contains("Records: 3"));
    assert!(text.contains("Date range: 2000 - 2002"));
}

#[test]
fn test_status_without_data() {
    let dir = tempdir().unwrap();

    let missing = DataUpdater::new(dir.path().join("absent.csv"));
    assert_eq!(missing.status().unwrap(), UpdateStatus::Missing);
    assert_eq!(missing.status().unwrap().to_string(), "No data file found");

    let empty_file = dir.path().join("empty.csv");
    fs::write(&empty_file, "ds,y\n").unwrap();
    assert_eq!(DataUpdater::new(&empty_file).status().unwrap(), UpdateStatus::Empty);
}
