use approx::assert_relative_eq;
use incidence_forecast::metrics::{
    forecast_accuracy, mean_absolute_error, mean_absolute_percentage_error, mean_squared_error,
    root_mean_squared_error, ModelPerformance,
};
use incidence_forecast::ForecastError;
use rstest::rstest;

#[test]
fn test_error_metrics() {
    let actual = [100.0, 110.0, 120.0, 130.0];
    let predicted = [102.0, 108.0, 125.0, 130.0];

    assert_relative_eq!(mean_absolute_error(&actual, &predicted).unwrap(), 2.25);
    assert_relative_eq!(mean_squared_error(&actual, &predicted).unwrap(), 8.25);
    assert_relative_eq!(
        root_mean_squared_error(&actual, &predicted).unwrap(),
        8.25_f64.sqrt()
    );

    let expected_mape = (2.0 / 100.0 + 2.0 / 110.0 + 5.0 / 120.0) / 4.0 * 100.0;
    assert_relative_eq!(
        mean_absolute_percentage_error(&actual, &predicted).unwrap(),
        expected_mape,
        epsilon = 1e-12
    );
}

#[test]
fn test_perfect_forecast() {
    let values = [5.0, 4.0, 3.0];
    let accuracy = forecast_accuracy(&values, &values).unwrap();

    assert_eq!(accuracy.mae, 0.0);
    assert_eq!(accuracy.mse, 0.0);
    assert_eq!(accuracy.rmse, 0.0);
    assert_eq!(accuracy.mape, 0.0);
}

#[rstest]
#[case(&[], &[])]
#[case(&[1.0, 2.0], &[1.0])]
fn test_rejects_bad_lengths(#[case] actual: &[f64], #[case] predicted: &[f64]) {
    assert!(matches!(
        mean_squared_error(actual, predicted),
        Err(ForecastError::ValidationError(_))
    ));
    assert!(mean_absolute_error(actual, predicted).is_err());
}

#[test]
fn test_mape_skips_zero_actuals() {
    let mape = mean_absolute_percentage_error(&[0.0, 50.0], &[3.0, 45.0]).unwrap();
    assert_relative_eq!(mape, 10.0);

    assert!(mean_absolute_percentage_error(&[0.0, 0.0], &[1.0, 2.0]).is_err());
}

#[test]
fn test_accuracy_display() {
    let accuracy = forecast_accuracy(&[10.0, 20.0], &[12.0, 18.0]).unwrap();
    let text = accuracy.to_string();

    assert!(text.contains("MAE:   2.0000"));
    assert!(text.contains("RMSE:  2.0000"));
}

#[test]
fn test_model_performance_row() {
    let row = ModelPerformance::from_mse("ARIMA(2,1,2)", 16.0);

    assert_eq!(row.rmse, 4.0);
    assert_eq!(row.to_string(), "ARIMA(2,1,2): MSE = 16.00, RMSE = 4.00");

    let json = serde_json::to_value(&row).unwrap();
    assert_eq!(json["Model"], "ARIMA(2,1,2)");
    assert_eq!(json["MSE"], 16.0);
}
