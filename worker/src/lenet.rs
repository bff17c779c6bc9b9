//! LeNet trained on a csv of 28x28 images.

use std::{fs::File, io::BufReader, num::NonZeroUsize};

use log::info;
use machine_learning::{
    Executor, MlErr,
    arch::{Sequential, Symbol, activations::ActFn, layers::Layer, loss::SoftmaxOutput},
    initialization,
    metrics::Accuracy,
    optimization::Sgd,
};
use ndarray::{ArrayView1, ArrayView4};

use crate::{
    Result, WorkerErr,
    config::{self, LenetConfig},
    data::{BatchRef, DataLoader, InMemoryDataset, LabeledData, load_csv},
};

/// LeCun, Yann, Leon Bottou, Yoshua Bengio, and Patrick Haffner.
/// "Gradient-based learning applied to document recognition."
/// Proceedings of the IEEE (1998)
pub fn network() -> Symbol<SoftmaxOutput> {
    let body = Sequential::new([
        Layer::conv("conv1", (5, 5), 20),
        Layer::activation("tanh1", ActFn::Tanh),
        Layer::max_pool("pool1", (2, 2), (2, 2)),
        Layer::conv("conv2", (5, 5), 50),
        Layer::activation("tanh2", ActFn::Tanh),
        Layer::max_pool("pool2", (2, 2), (2, 2)),
        Layer::conv("conv3", (2, 2), 500),
        Layer::activation("tanh3", ActFn::Tanh),
        Layer::max_pool("pool3", (2, 2), (1, 1)),
        Layer::flatten("flatten"),
        Layer::dense("fc1", 500),
        Layer::activation("tanh4", ActFn::Tanh),
        Layer::dense("fc2", 10),
    ]);

    Symbol::new(body, SoftmaxOutput::new())
}

/// Loads `config.data_path` and trains on it.
///
/// # Returns
/// The validation accuracy after every epoch.
pub fn run(config: &LenetConfig) -> Result<Vec<f32>> {
    let file = File::open(&config.data_path)?;
    let data = load_csv(BufReader::new(file), config.pixel_scale)?;
    train(config, data)
}

/// Trains LeNet over `data`, keeping its last samples for validation.
///
/// # Arguments
/// * `config` - The hyperparameters.
/// * `data` - Every sample, a `width * height` image each.
///
/// # Returns
/// The validation accuracy after every epoch.
pub fn train(config: &LenetConfig, data: LabeledData) -> Result<Vec<f32>> {
    let sample = [1, config.height, config.width];
    if data.features != config.width * config.height && !data.is_empty() {
        return Err(WorkerErr::Config(format!(
            "samples have {} pixels, expected {}x{}",
            data.features, config.width, config.height
        )));
    }

    let batch_size = non_zero(config.batch_size, "batch_size")?;
    let val_batch_size = non_zero(config.val_batch_size(), "batch_size")?;

    let mut symbol = network();
    for arg in symbol.list_arguments() {
        info!("{arg}");
    }

    let dataset = InMemoryDataset::new(data.data, data.labels, config.width * config.height)?;
    let (train, val) = dataset.split(config.val_fold, config.folds)?;
    info!("read finished: {} training and {} validation samples", train.len(), val.len());

    let layout = symbol.infer_args(&sample)?;
    let rng = config::rng(config.seed);
    let params = initialization::initialize(&layout, config.weight_init, config.bias_init, rng)?;
    let mut exec = Executor::bind(symbol, &sample, params)?;

    let mut optimizer = Sgd::new(config.learning_rate, config.momentum, config.weight_decay)
        .with_rescale_grad(config.rescale_grad)
        .with_clip_gradient(config.clip_gradient);

    let mut accuracies = Vec::with_capacity(config.max_epoch);
    for epoch in 0..config.max_epoch {
        for batch in DataLoader::new(&train, batch_size) {
            let (x, y) = views(batch, &sample)?;
            exec.forward(x.into_dyn(), true)?;
            exec.backward(y)?;
            exec.update_all(&mut optimizer, config.learning_rate)?;
        }

        let accuracy = validate(&mut exec, &val, val_batch_size, &sample)?;
        info!("Iter {epoch}, accuracy: {accuracy}");
        accuracies.push(accuracy);
    }

    Ok(accuracies)
}

/// The accuracy of the network over `val`.
fn validate(
    exec: &mut Executor<SoftmaxOutput>,
    val: &InMemoryDataset,
    batch_size: NonZeroUsize,
    sample: &[usize; 3],
) -> Result<f32> {
    let mut accuracy = Accuracy::new();

    for batch in DataLoader::new(val, batch_size) {
        let (x, y) = views(batch, sample)?;
        let outputs = exec.forward(x.into_dyn(), false)?;
        accuracy.update(outputs, y)?;
    }

    Ok(accuracy.get())
}

fn views<'a>(
    batch: BatchRef<'a>,
    &[c, h, w]: &[usize; 3],
) -> Result<(ArrayView4<'a, f32>, ArrayView1<'a, f32>)> {
    let x = ArrayView4::from_shape((batch.len(), c, h, w), batch.xs).map_err(MlErr::from)?;
    Ok((x, ArrayView1::from(batch.ys)))
}

fn non_zero(n: usize, name: &str) -> Result<NonZeroUsize> {
    NonZeroUsize::new(n).ok_or_else(|| WorkerErr::Config(format!("{name} must be positive")))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Images of a single bright pixel whose row is the label.
    fn stripes(n: usize) -> LabeledData {
        let mut data = LabeledData {
            features: 28 * 28,
            ..Default::default()
        };

        for i in 0..n {
            let label = i % 3;
            let mut image = vec![0.; 28 * 28];
            image[label * 9 * 28 + 14] = 1.;

            data.data.extend(image);
            data.labels.push(label as f32);
        }

        data
    }

    fn config() -> LenetConfig {
        LenetConfig {
            batch_size: 4,
            max_epoch: 2,
            learning_rate: 0.05,
            seed: Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn network_arguments() {
        let args = network().list_arguments();
        assert_eq!(args.len(), 12);
        assert_eq!(args[1], "conv1_w");
        assert_eq!(args[10], "fc2_b");
    }

    #[test]
    fn trains_and_reports_every_epoch() {
        let accuracies = train(&config(), stripes(20)).unwrap();

        assert_eq!(accuracies.len(), 2);
        assert!(accuracies.iter().all(|a| (0. ..=1.).contains(a)));
    }

    #[test]
    fn rejects_images_of_another_size() {
        let data = LabeledData {
            data: vec![0.; 10],
            labels: vec![1., 2.],
            features: 5,
        };

        assert!(matches!(train(&config(), data), Err(WorkerErr::Config(_))));
    }

    #[test]
    fn rejects_empty_batches() {
        let config = LenetConfig {
            batch_size: 0,
            ..config()
        };

        assert!(train(&config, stripes(4)).is_err());
    }
}
