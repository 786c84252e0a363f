use approx::assert_relative_eq;
use chrono::NaiveDate;
use incidence_forecast::data::{parse_period, DataLoader, Frequency, Observation, TimeSeriesData};
use incidence_forecast::ForecastError;
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::io::Write;
use tempfile::NamedTempFile;

fn year(y: i32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, 1, 1).unwrap()
}

fn csv_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

#[test]
fn test_load_year_column() {
    let file = csv_file(&["Year,Incidence_Rate", "2000,322", "2001,315", "2002,308"]);
    let data = DataLoader::from_csv(file.path()).unwrap();

    assert_eq!(data.len(), 3);
    assert_eq!(data.periods(), &[year(2000), year(2001), year(2002)]);
    assert_eq!(data.values(), &[322.0, 315.0, 308.0]);
}

#[test]
fn test_load_ds_y_columns_out_of_order() {
    let file = csv_file(&[
        "ds,y",
        "2002-01-01,308.0",
        "2000-01-01,322.0",
        "2001-01-01,315.0",
    ]);
    let data = DataLoader::from_csv(file.path()).unwrap();

    assert_eq!(data.first().period, year(2000));
    assert_eq!(data.last().value, 308.0);
}

#[test]
fn test_loader_error_handling() {
    assert!(DataLoader::from_csv("nonexistent_file.csv").is_err());

    let header_only = csv_file(&["invalid,csv,format"]);
    assert!(DataLoader::from_csv(header_only.path()).is_err());

    let gap = csv_file(&["year,value", "2000,10", "2002,9"]);
    assert!(matches!(
        DataLoader::from_csv(gap.path()),
        Err(ForecastError::DataError(_))
    ));
}

#[rstest]
#[case("2015", year(2015))]
#[case("2015-06-30", NaiveDate::from_ymd_opt(2015, 6, 30).unwrap())]
#[case("2015/06/30", NaiveDate::from_ymd_opt(2015, 6, 30).unwrap())]
#[case(" 2015-06-30T12:00:00 ", NaiveDate::from_ymd_opt(2015, 6, 30).unwrap())]
fn test_parse_period(#[case] raw: &str, #[case] expected: NaiveDate) {
    assert_eq!(parse_period(raw).unwrap(), expected);
}

#[test]
fn test_parse_period_rejects_garbage() {
    assert!(parse_period("last year").is_err());
}

#[test]
fn test_series_validation() {
    assert!(TimeSeriesData::new(vec![], vec![]).is_err());
    assert!(TimeSeriesData::new(vec![year(2000)], vec![1.0, 2.0]).is_err());
    assert!(TimeSeriesData::new(vec![year(2000), year(2000)], vec![1.0, 2.0]).is_err());
    assert!(TimeSeriesData::new(vec![year(2000), year(2001)], vec![1.0, -2.0]).is_err());
    assert!(TimeSeriesData::new(vec![year(2000), year(2001)], vec![1.0, f64::NAN]).is_err());
}

#[test]
fn test_series_rejects_drifting_day() {
    let periods = vec![
        NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2001, 1, 31).unwrap(),
        NaiveDate::from_ymd_opt(2002, 1, 2).unwrap(),
        NaiveDate::from_ymd_opt(2003, 1, 28).unwrap(),
    ];
    let result = TimeSeriesData::new(periods, vec![4.0, 3.0, 2.0, 1.0]);
    assert!(matches!(result, Err(ForecastError::DataError(_))));

    assert!(!Frequency::Annual.is_next(
        NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2001, 1, 31).unwrap()
    ));
}

#[test]
fn test_month_end_series_is_equally_spaced() {
    let periods = vec![
        NaiveDate::from_ymd_opt(2021, 1, 31).unwrap(),
        NaiveDate::from_ymd_opt(2021, 2, 28).unwrap(),
        NaiveDate::from_ymd_opt(2021, 3, 31).unwrap(),
        NaiveDate::from_ymd_opt(2021, 4, 30).unwrap(),
    ];
    assert!(
        TimeSeriesData::with_frequency(periods, vec![4.0, 3.0, 2.0, 1.0], Frequency::Monthly)
            .is_ok()
    );
    assert!(!Frequency::Monthly.is_next(
        NaiveDate::from_ymd_opt(2021, 2, 28).unwrap(),
        NaiveDate::from_ymd_opt(2021, 3, 30).unwrap()
    ));
}

#[test]
fn test_monthly_series() {
    let periods = vec![
        NaiveDate::from_ymd_opt(2020, 11, 1).unwrap(),
        NaiveDate::from_ymd_opt(2020, 12, 1).unwrap(),
        NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
    ];
    let data = TimeSeriesData::with_frequency(periods, vec![3.0, 2.0, 1.0], Frequency::Monthly)
        .unwrap();

    assert_eq!(
        data.future_periods(2).unwrap(),
        vec![
            NaiveDate::from_ymd_opt(2021, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2021, 3, 1).unwrap()
        ]
    );
}

#[test]
fn test_future_periods_start_after_last() {
    let data = TimeSeriesData::new(vec![year(2022), year(2023), year(2024)], vec![3.0, 2.0, 1.0])
        .unwrap();

    assert_eq!(
        data.future_periods(3).unwrap(),
        vec![year(2025), year(2026), year(2027)]
    );
}

#[test]
fn test_split_and_slice() {
    let periods: Vec<NaiveDate> = (2000..2010).map(year).collect();
    let values: Vec<f64> = (0..10).map(|v| v as f64).collect();
    let data = TimeSeriesData::new(periods, values).unwrap();

    let (train, test) = data.split_at_ratio(0.8).unwrap();
    assert_eq!(train.len(), 8);
    assert_eq!(test.len(), 2);
    assert_eq!(test.first().period, year(2008));

    assert_eq!(data.slice(2, 5).unwrap().values(), &[2.0, 3.0, 4.0]);
    assert!(data.split_at_ratio(1.0).is_err());
}

#[test]
fn test_observations_round_trip() {
    let observations = vec![
        Observation {
            period: year(2001),
            value: 5.0,
        },
        Observation {
            period: year(2000),
            value: 6.0,
        },
    ];
    let data = TimeSeriesData::from_observations(observations, Frequency::Annual).unwrap();

    assert_eq!(data.first().period, year(2000));
    assert_eq!(data.frequency(), Frequency::Annual);
}

#[test]
fn test_summary() {
    let data = TimeSeriesData::new(
        (2000..2005).map(year).collect(),
        vec![200.0, 190.0, 180.0, 170.0, 150.0],
    )
    .unwrap();
    let summary = data.summary().unwrap();

    assert_eq!(summary.observations, 5);
    assert_eq!(summary.last_period, year(2004));
    assert_relative_eq!(summary.midpoint_value, 180.0);
    assert_relative_eq!(summary.mean, 178.0);
    assert_relative_eq!(summary.min, 150.0);
    assert_relative_eq!(summary.max, 200.0);
    assert_relative_eq!(summary.reduction_pct, 25.0);
    assert_relative_eq!(summary.avg_period_change, -12.5);
}
