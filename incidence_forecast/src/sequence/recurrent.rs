//! LSTM regressor
//!
//! One LSTM layer reads the context one value at a time and a dense layer
//! maps the rectified final hidden state to the next normalized value:
//!
//! ```text
//! (h_W, c_W) = LSTM(x_1 .. x_W)
//! y          = Dense(relu(h_W))
//! ```
//!
//! Training minimizes the mean squared error with Adam on an autodiff
//! backend. Weight initialisation is seeded through the backend and the
//! batch order through a seeded RNG, so the same windows and configuration
//! always give the same network.

use crate::config::RecurrentConfig;
use crate::error::{ForecastError, Result};
use crate::sequence::{check_context, window_width, FittedRegressor, Regressor};
use burn::backend::{Autodiff, NdArray};
use burn::module::{AutodiffModule, Module};
use burn::nn::{Linear, LinearConfig, Lstm, LstmConfig};
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Tensor, TensorData};
use incidence_math::Window;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Mutex;
use tracing::{debug, info};

/// Backend used while training
type TrainingBackend = Autodiff<NdArray>;
/// Backend a trained network predicts on
type InferenceBackend = NdArray;

/// Keras' Adam epsilon
const ADAM_EPSILON: f32 = 1e-7;

/// The backend seed is process-wide, seeding and initialisation must not interleave
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// LSTM layer followed by a dense output
#[derive(Module, Debug)]
pub struct SequenceNet<B: Backend> {
    lstm: Lstm<B>,
    output: Linear<B>,
}

impl<B: Backend> SequenceNet<B> {
    fn new(hidden: usize, device: &B::Device) -> Self {
        Self {
            lstm: LstmConfig::new(1, hidden, true).init(device),
            output: LinearConfig::new(hidden, 1).init(device),
        }
    }

    /// Contexts `[batch, width, 1]` to predictions `[batch, 1]`
    fn forward(&self, contexts: Tensor<B, 3>) -> Tensor<B, 2> {
        let (_, state) = self.lstm.forward(contexts, None);
        self.output.forward(relu(state.hidden))
    }
}

/// Stack contexts into a `[batch, width, 1]` tensor
fn context_tensor<B: Backend>(
    contexts: &[&[f64]],
    width: usize,
    device: &B::Device,
) -> Tensor<B, 3> {
    let values: Vec<f32> = contexts
        .iter()
        .flat_map(|context| context.iter().map(|&x| x as f32))
        .collect();
    Tensor::from_data(TensorData::new(values, [contexts.len(), width, 1]), device)
}

/// Windows selected by `indices` as input and target tensors
fn batch_tensors<B: Backend>(
    windows: &[Window],
    indices: &[usize],
    width: usize,
    device: &B::Device,
) -> (Tensor<B, 3>, Tensor<B, 2>) {
    let contexts: Vec<&[f64]> = indices
        .iter()
        .map(|&i| windows[i].context.as_slice())
        .collect();
    let labels: Vec<f32> = indices.iter().map(|&i| windows[i].label as f32).collect();

    let inputs = context_tensor(&contexts, width, device);
    let targets = Tensor::from_data(TensorData::new(labels, [indices.len(), 1]), device);
    (inputs, targets)
}

fn mean_squared_error<B: Backend>(
    predictions: Tensor<B, 2>,
    targets: Tensor<B, 2>,
) -> Tensor<B, 1> {
    let diff = predictions - targets;
    (diff.clone() * diff).mean()
}

fn mean_loss<B: Backend>(
    model: &SequenceNet<B>,
    windows: &[Window],
    width: usize,
    device: &B::Device,
) -> Option<f64> {
    if windows.is_empty() {
        return None;
    }
    let indices: Vec<usize> = (0..windows.len()).collect();
    let (inputs, targets) = batch_tensors::<B>(windows, &indices, width, device);
    let loss = mean_squared_error(model.forward(inputs), targets);
    Some(loss.into_scalar().elem::<f64>())
}

fn initial_model(
    hidden: usize,
    seed: u64,
    device: &<TrainingBackend as Backend>::Device,
) -> Result<SequenceNet<TrainingBackend>> {
    let _guard = INIT_LOCK.lock().map_err(|e| {
        ForecastError::ModelError(format!("Weight initialisation lock poisoned: {}", e))
    })?;
    TrainingBackend::seed(seed);
    Ok(SequenceNet::new(hidden, device))
}

/// LSTM learning algorithm
#[derive(Debug, Clone)]
pub struct RecurrentRegressor {
    /// Name of the model
    name: String,
    /// Training configuration
    config: RecurrentConfig,
}

/// Trained LSTM network
#[derive(Debug, Clone)]
pub struct RecurrentNetwork {
    /// Name of the model
    name: String,
    /// Context width
    width: usize,
    /// Trained weights
    model: SequenceNet<InferenceBackend>,
    /// Mean squared error on the training windows after the last epoch
    training_loss: f64,
    /// Mean squared error on the validation windows, when any were held out
    validation_loss: Option<f64>,
}

impl RecurrentRegressor {
    /// Create a new LSTM regressor
    pub fn new(config: RecurrentConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            name: format!(
                "LSTM (hidden={}, epochs={})",
                config.hidden_units, config.epochs
            ),
            config,
        })
    }

    /// Training configuration
    pub fn config(&self) -> &RecurrentConfig {
        &self.config
    }
}

impl Regressor for RecurrentRegressor {
    type Fitted = RecurrentNetwork;

    fn fit(&self, windows: &[Window]) -> Result<Self::Fitted> {
        let width = window_width(windows)?;
        let device = Default::default();

        // Trailing windows are held out for the validation loss
        let split = (windows.len() as f64 * (1.0 - self.config.validation_split)).floor() as usize;
        let split = if split == 0 { windows.len() } else { split };
        let (train, validation) = windows.split_at(split);

        let mut model = initial_model(self.config.hidden_units, self.config.seed, &device)?;
        let mut optimizer = AdamConfig::new().with_epsilon(ADAM_EPSILON).init();
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut order: Vec<usize> = (0..train.len()).collect();

        for epoch in 0..self.config.epochs {
            order.shuffle(&mut rng);

            for batch in order.chunks(self.config.batch_size) {
                let (inputs, targets) =
                    batch_tensors::<TrainingBackend>(train, batch, width, &device);
                let loss = mean_squared_error(model.forward(inputs), targets);
                let grads = GradientsParams::from_grads(loss.backward(), &model);
                model = optimizer.step(self.config.learning_rate, model, grads);
            }

            if (epoch + 1) % 10 == 0 {
                let current = model.valid();
                debug!(
                    epoch = epoch + 1,
                    loss = mean_loss(&current, train, width, &device).unwrap_or(f64::NAN),
                    val_loss = mean_loss(&current, validation, width, &device),
                    "lstm training"
                );
            }
        }

        let model = model.valid();
        let training_loss = mean_loss(&model, train, width, &device).unwrap_or(0.0);
        if !training_loss.is_finite() {
            return Err(ForecastError::ModelError("LSTM training diverged".to_string()));
        }
        let validation_loss = mean_loss(&model, validation, width, &device);
        info!(
            training_windows = train.len(),
            validation_windows = validation.len(),
            training_loss,
            ?validation_loss,
            "lstm trained"
        );

        Ok(RecurrentNetwork {
            name: self.name.clone(),
            width,
            model,
            training_loss,
            validation_loss,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl RecurrentNetwork {
    /// Training loss after the last epoch, normalized units
    pub fn training_loss(&self) -> f64 {
        self.training_loss
    }

    /// Validation loss after the last epoch, normalized units
    pub fn validation_loss(&self) -> Option<f64> {
        self.validation_loss
    }

    /// Number of trainable parameters
    pub fn parameter_count(&self) -> usize {
        self.model.num_params()
    }
}

impl FittedRegressor for RecurrentNetwork {
    fn predict(&self, context: &[f64]) -> Result<f64> {
        check_context(self.width, context)?;
        let device = Default::default();
        let input = context_tensor::<InferenceBackend>(&[context], self.width, &device);
        Ok(self.model.forward(input).into_scalar().elem::<f64>())
    }

    fn width(&self) -> usize {
        self.width
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> RecurrentConfig {
        RecurrentConfig {
            hidden_units: 3,
            epochs: 2,
            batch_size: 4,
            learning_rate: 0.01,
            validation_split: 0.0,
            seed: 7,
        }
    }

    fn rising_windows() -> Vec<Window> {
        (0..10)
            .map(|i| {
                let base = i as f64 / 20.0;
                Window {
                    context: vec![base, base + 0.05, base + 0.1, base + 0.15],
                    label: base + 0.2,
                }
            })
            .collect()
    }

    #[test]
    fn test_training_is_deterministic() {
        let windows = rising_windows();
        let regressor = RecurrentRegressor::new(small_config()).unwrap();
        let a = regressor.fit(&windows).unwrap();
        let b = regressor.fit(&windows).unwrap();

        assert_eq!(a.parameter_count(), b.parameter_count());
        assert_eq!(a.training_loss(), b.training_loss());
        assert_eq!(
            a.predict(&windows[0].context).unwrap(),
            b.predict(&windows[0].context).unwrap()
        );
    }

    #[test]
    fn test_lstm_parameter_count() {
        let network = RecurrentRegressor::new(small_config())
            .unwrap()
            .fit(&rising_windows())
            .unwrap();

        // Four gates with input (1 -> 3) and hidden (3 -> 3) transforms, plus the dense layer
        let gates = 4 * ((3 + 3) + (9 + 3));
        assert_eq!(network.parameter_count(), gates + 3 + 1);
        assert!(network.training_loss().is_finite());
        assert!(network.validation_loss().is_none());
    }

    #[test]
    fn test_validation_split_holds_out_trailing_windows() {
        let config = RecurrentConfig {
            validation_split: 0.2,
            ..small_config()
        };
        let network = RecurrentRegressor::new(config)
            .unwrap()
            .fit(&rising_windows())
            .unwrap();

        assert!(network.validation_loss().is_some());
        assert!(network.name().starts_with("LSTM"));
    }

    #[test]
    fn test_wrong_context_width() {
        let windows = vec![Window {
            context: vec![0.1, 0.2],
            label: 0.3,
        }];
        let network = RecurrentRegressor::new(small_config())
            .unwrap()
            .fit(&windows)
            .unwrap();

        assert!(matches!(
            network.predict(&[0.1, 0.2, 0.3]),
            Err(ForecastError::DimensionMismatch {
                expected: 2,
                got: 3
            })
        ));
    }
}
