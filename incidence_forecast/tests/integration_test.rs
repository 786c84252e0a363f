use incidence_forecast::config::{AnalysisConfig, RecurrentConfig, SequenceConfig};
use incidence_forecast::export::{
    render_markdown, write_artifacts, FORECAST_TABLE, PERFORMANCE_TABLE, REPORT_JSON,
    REPORT_MARKDOWN,
};
use incidence_forecast::error::Stage;
use incidence_forecast::{Analysis, DataLoader};
use pretty_assertions::assert_eq;
use std::fs;
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

// 2000-2024 annual incidence per 100k
fn create_sample_data() -> NamedTempFile {
    let values = [
        322, 315, 308, 301, 294, 287, 280, 276, 273, 270, 267, 264, 258, 256, 252, 248, 244, 240,
        238, 235, 229, 225, 220, 215, 210,
    ];
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "Year,Incidence_Rate").unwrap();
    for (i, value) in values.iter().enumerate() {
        writeln!(file, "{},{}", 2000 + i, value).unwrap();
    }
    file
}

fn quick_config() -> AnalysisConfig {
    AnalysisConfig {
        network: RecurrentConfig {
            hidden_units: 8,
            epochs: 20,
            ..RecurrentConfig::default()
        },
        sequence: SequenceConfig {
            uncertainty_level: Some(0.9),
            ..SequenceConfig::default()
        },
        ..AnalysisConfig::default()
    }
}

#[test]
fn test_full_analysis_workflow() {
    let data_file = create_sample_data();
    let series = DataLoader::from_csv(data_file.path()).unwrap();
    assert_eq!(series.len(), 25);

    let report = Analysis::new(quick_config()).unwrap().run(&series).unwrap();

    assert_eq!(report.forecasts.len(), 5);
    assert_eq!(report.forecasts[0].period.to_string(), "2025-01-01");
    assert_eq!(report.forecasts[4].period.to_string(), "2029-01-01");
    for row in &report.forecasts {
        assert!(row.trend_lower < row.trend && row.trend < row.trend_upper);
        assert!(row.sequence_lower.is_some() && row.sequence_upper.is_some());
        assert!(row.arima.is_finite() && row.sequence.is_finite());
    }

    let models: Vec<&str> = report.performance.iter().map(|p| p.model.as_str()).collect();
    assert_eq!(models.len(), 2);
    assert_eq!(models[0], "ARIMA(2,1,2)");

    let (lo, hi) = report.final_period_range;
    assert!(lo <= hi);
    assert_eq!(report.summary.first_value, 322.0);
    assert_eq!(report.summary.last_value, 210.0);
}

#[test]
fn test_analysis_on_twelve_years() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "ds,y").unwrap();
    for (i, value) in [322, 315, 308, 301, 294, 287, 280, 276, 273, 270, 267, 264]
        .iter()
        .enumerate()
    {
        writeln!(file, "{},{}", 2000 + i, value).unwrap();
    }
    let series = DataLoader::from_csv(file.path()).unwrap();

    let report = Analysis::new(quick_config()).unwrap().run(&series).unwrap();

    assert_eq!(report.forecasts.len(), 5);
    assert_eq!(report.forecasts[0].period.to_string(), "2012-01-01");
    assert_eq!(report.performance.len(), 2);
    assert!(report.forecasts.iter().all(|row| row.arima.is_finite()));
}

#[test]
fn test_artifacts_written() {
    let data_file = create_sample_data();
    let series = DataLoader::from_csv(data_file.path()).unwrap();
    let report = Analysis::new(quick_config()).unwrap().run(&series).unwrap();

    let dir = tempdir().unwrap();
    let out = dir.path().join("output");
    let written = write_artifacts(&out, &report).unwrap();

    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![FORECAST_TABLE, PERFORMANCE_TABLE, REPORT_JSON, REPORT_MARKDOWN]
    );

    let forecasts = fs::read_to_string(out.join(FORECAST_TABLE)).unwrap();
    let mut lines = forecasts.lines();
    assert_eq!(
        lines.next().unwrap(),
        "period,trend,trend_lower,trend_upper,arima,sequence,sequence_lower,sequence_upper"
    );
    assert_eq!(lines.count(), 5);

    let performance = fs::read_to_string(out.join(PERFORMANCE_TABLE)).unwrap();
    assert!(performance.starts_with("Model,MSE,RMSE"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join(REPORT_JSON)).unwrap()).unwrap();
    assert_eq!(json["forecasts"].as_array().unwrap().len(), 5);
    assert_eq!(json["config"]["sequence"]["window_width"], 4);

    let markdown = fs::read_to_string(out.join(REPORT_MARKDOWN)).unwrap();
    assert_eq!(markdown, render_markdown(&report));
    assert!(markdown.contains("## Model performance"));
    assert!(markdown.contains("errors compound with the horizon"));
}

#[test]
fn test_analysis_rejects_constant_series() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "ds,y").unwrap();
    for year in 2000..2025 {
        writeln!(file, "{},100", year).unwrap();
    }
    let series = DataLoader::from_csv(file.path()).unwrap();

    let error = Analysis::new(quick_config())
        .unwrap()
        .run(&series)
        .unwrap_err();
    assert_eq!(error.stage(), Some(Stage::Normalization));
    assert!(error.to_string().contains("normalization failed"));
}

#[test]
fn test_config_from_json_file_uses_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{ "sequence": {{ "horizon": 3 }}, "network": {{ "seed": 7 }} }}"#).unwrap();

    let config = AnalysisConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.sequence.horizon, 3);
    assert_eq!(config.sequence.window_width, 4);
    assert_eq!(config.network.seed, 7);
    assert_eq!(config.network.hidden_units, 50);
    assert_eq!(config.arima.p, 2);

    let mut bad = NamedTempFile::new().unwrap();
    writeln!(bad, r#"{{ "sequence": {{ "window_width": 0 }} }}"#).unwrap();
    assert!(AnalysisConfig::from_json_file(bad.path()).is_err());
}
