use std::{env, fs::File, io::BufReader, path::Path};

use machine_learning::initialization::InitSpec;
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{Result, WorkerErr};

/// The environment variable naming a json file with the driver's hyperparameters.
pub const CONFIG_VAR: &str = "TRAIN_CONFIG";

/// Hyperparameters of the LeNet driver.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LenetConfig {
    pub data_path: String,
    /// How many of the `folds` go to validation.
    pub val_fold: usize,
    pub folds: usize,
    pub width: usize,
    pub height: usize,
    pub batch_size: usize,
    pub max_epoch: usize,
    pub learning_rate: f32,
    pub momentum: f32,
    pub weight_decay: f32,
    pub rescale_grad: f32,
    pub clip_gradient: Option<f32>,
    /// Every pixel is multiplied by this value when loaded.
    pub pixel_scale: f32,
    pub weight_init: InitSpec,
    pub bias_init: InitSpec,
    pub seed: Option<u64>,
}

impl Default for LenetConfig {
    fn default() -> Self {
        Self {
            data_path: "./train.csv".to_string(),
            val_fold: 1,
            folds: 10,
            width: 28,
            height: 28,
            batch_size: 42,
            max_epoch: 100_000,
            learning_rate: 1e-4,
            momentum: 0.9,
            weight_decay: 1e-4,
            rescale_grad: 1.,
            clip_gradient: Some(10.),
            pixel_scale: 1. / 256.,
            weight_init: InitSpec::XavierUniform,
            bias_init: InitSpec::Const { value: 0. },
            seed: None,
        }
    }
}

impl LenetConfig {
    /// The validation batch size, ten training batches.
    pub fn val_batch_size(&self) -> usize {
        self.batch_size * 10
    }
}

/// Hyperparameters of the ads driver.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AdsConfig {
    pub batch_size: usize,
    /// Floats per record, the label included.
    pub sample_size: usize,
    pub max_epoch: usize,
    pub learning_rate: f32,
    pub weight_decay: f32,
    pub momentum: f32,
    /// Defaults to `1 / (num_workers * batch_size)`.
    pub rescale_grad: Option<f32>,
    pub clip_gradient: Option<f32>,
    pub weight_init: InitSpec,
    pub bias_init: InitSpec,
    pub seed: Option<u64>,
}

impl Default for AdsConfig {
    fn default() -> Self {
        let normal = InitSpec::Normal {
            mean: 0.,
            std_dev: 1.,
        };

        Self {
            batch_size: 3072,
            sample_size: 601,
            max_epoch: 1,
            learning_rate: 0.01,
            weight_decay: 1e-5,
            momentum: 0.9,
            rescale_grad: None,
            clip_gradient: None,
            weight_init: normal,
            bias_init: normal,
            seed: None,
        }
    }
}

impl AdsConfig {
    pub fn rescale_grad(&self, num_workers: usize) -> f32 {
        self.rescale_grad
            .unwrap_or(1. / (num_workers * self.batch_size) as f32)
    }
}

/// The random source for the initial parameters, seeded from the os if `seed` is `None`.
pub(crate) fn rng(seed: Option<u64>) -> StdRng {
    seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64)
}

/// Loads a configuration from the file named by `TRAIN_CONFIG`, the defaults if it's unset.
pub fn from_env<T: DeserializeOwned + Default>() -> Result<T> {
    match env::var(CONFIG_VAR) {
        Ok(path) => from_file(path),
        Err(env::VarError::NotPresent) => Ok(T::default()),
        Err(e) => Err(WorkerErr::Config(format!("{CONFIG_VAR}: {e}"))),
    }
}

/// Loads a configuration from a json file, missing fields take their default value.
pub fn from_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let file = File::open(path)?;

    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| WorkerErr::Config(format!("{}: {e}", path.display())))
}
