//! Recursive forecasting with the linear window regressor
//!
//! Run with `cargo run --example recursive_forecast -- data/tb_incidence_india_2000_2024.csv`

use incidence_forecast::config::SequenceConfig;
use incidence_forecast::data::DataLoader;
use incidence_forecast::error::Result;
use incidence_forecast::sequence::{LinearWindowRegressor, SequenceForecaster};

fn main() -> Result<()> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "data/tb_incidence_india_2000_2024.csv".to_string());
    let series = DataLoader::from_csv(&path)?;

    let forecaster = SequenceForecaster::new(SequenceConfig {
        horizon: 10,
        uncertainty_level: Some(0.8),
        ..SequenceConfig::default()
    })?;
    let forecast = forecaster.run(&series, &LinearWindowRegressor::default())?;

    println!("{} on {} observations", forecast.model, series.len());
    if let Some(rmse) = forecast.test_rmse() {
        println!("Held-out RMSE: {:.2}", rmse);
    }
    for (i, (period, value)) in forecast.periods.iter().zip(&forecast.values).enumerate() {
        let band = forecast
            .bands
            .as_ref()
            .map(|b| format!(" [{:.1}, {:.1}]", b[i].0, b[i].1))
            .unwrap_or_default();
        let flag = if forecast.extrapolated_steps.contains(&(i + 1)) {
            " (extrapolated)"
        } else {
            ""
        };
        println!("{}  {:>8.1}{}{}", period.format("%Y"), value, band, flag);
    }
    Ok(())
}
