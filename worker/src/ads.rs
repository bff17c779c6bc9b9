//! A three layer perceptron trained on ads click records through a key-value store.

use std::{
    io::{Read, Seek},
    ops::Range,
    time::Instant,
};

use comms::{msg::Key, specs::OptimizerSpec};
use log::info;
use machine_learning::{
    Executor, MlErr,
    arch::{
        Sequential, Symbol, activations::ActFn, layers::Layer, loss::LogisticRegressionOutput,
    },
    initialization,
    metrics::binary_accuracy,
};
use ndarray::{ArrayView1, ArrayView2};
use parameter_server::KvStore;

use crate::{
    Result, WorkerErr,
    config::{self, AdsConfig},
    data::{DataReader, split_records},
};

pub fn network() -> Symbol<LogisticRegressionOutput> {
    let body = Sequential::new([
        Layer::dense("fc1", 2048),
        Layer::activation("act1", ActFn::Relu),
        Layer::dense("fc2", 512),
        Layer::activation("act2", ActFn::Relu),
        Layer::dense("fc3", 1),
    ]);

    Symbol::new(body, LogisticRegressionOutput::new()).with_input_names("data", "label")
}

/// Trains the network over the records of `stream` that belong to this worker.
///
/// Gradients are pushed to `kv` after every batch and the updated parameters pulled back, the
/// optimizer runs wherever `kv` keeps the values. When `kv` is synchronous every worker reads
/// a shard of the same length, the records left over by an uneven split are skipped.
///
/// # Arguments
/// * `kv` - The key-value store shared by every worker.
/// * `stream` - The records, `config.sample_size` floats each.
/// * `stream_size` - The size of `stream` in bytes.
/// * `config` - The hyperparameters.
///
/// # Returns
/// The amount of samples processed by this worker.
pub async fn run<K, S>(
    kv: &mut K,
    stream: &mut S,
    stream_size: u64,
    config: &AdsConfig,
) -> Result<usize>
where
    K: KvStore,
    S: Read + Seek + ?Sized,
{
    if config.sample_size < 2 || config.batch_size == 0 {
        return Err(WorkerErr::Config(
            "sample_size must be at least 2 and batch_size positive".to_string(),
        ));
    }

    let features = config.sample_size - 1;
    let mut symbol = network();
    for arg in symbol.list_arguments() {
        info!("{arg}");
    }

    let layout = symbol.infer_args(&[features])?;
    let rng = config::rng(config.seed);
    let params = initialization::initialize(&layout, config.weight_init, config.bias_init, rng)?;
    let mut exec = Executor::bind(symbol, &[features], params)?;

    let keys: Vec<(Key, Range<usize>)> = exec
        .layout()
        .slots()
        .iter()
        .enumerate()
        .map(|(key, slot)| (key as Key, slot.range()))
        .collect();

    let (rank, num_workers) = (kv.rank(), kv.num_workers());
    let even_shards = kv.is_synchronous();

    let spec = OptimizerSpec::Sgd {
        learning_rate: config.learning_rate,
        momentum: config.momentum,
        weight_decay: config.weight_decay,
        rescale_grad: config.rescale_grad(num_workers),
        clip_gradient: config.clip_gradient,
    };
    kv.set_optimizer(spec).await?;

    for (key, range) in &keys {
        kv.init(*key, &exec.arg_arrays()[range.clone()]).await?;
    }

    kv.barrier().await?;
    pull_all(kv, &mut exec, &keys).await?;

    let start = Instant::now();
    let mut processed = 0;

    for epoch in 0..config.max_epoch {
        let mut reader = DataReader::new(
            &mut *stream,
            stream_size,
            config.sample_size,
            rank,
            num_workers,
            config.batch_size,
        )?;
        if even_shards {
            reader = reader.even_shards();
        }

        let mut epoch_samples = 0;
        while !reader.eof() {
            let raw = reader.read_batch()?;
            let (data, labels) = split_records(&raw, config.sample_size)?;
            drop(raw);

            let n = labels.len();
            epoch_samples += n;
            processed += n;

            let x = ArrayView2::from_shape((n, features), &data).map_err(MlErr::from)?;
            let y = ArrayView1::from(&labels);

            let outputs = exec.forward(x.into_dyn(), true)?;
            let accuracy = binary_accuracy(outputs.column(0), y)?;

            let speed = processed as f64 / start.elapsed().as_secs_f64();
            let progress =
                processed as f64 * 100. / config.max_epoch as f64 / reader.record_count() as f64;
            info!("Iter {epoch}, accuracy: {accuracy}\t sample/s: {speed}\t Processing: [{progress}%]");

            exec.backward(y)?;

            for (key, range) in &keys {
                kv.push(*key, &exec.grad_arrays()[range.clone()]).await?;
            }

            pull_all(kv, &mut exec, &keys).await?;
        }

        info!("Total samples: {epoch_samples}");
    }

    kv.barrier().await?;
    Ok(processed)
}

async fn pull_all<K: KvStore>(
    kv: &mut K,
    exec: &mut Executor<LogisticRegressionOutput>,
    keys: &[(Key, Range<usize>)],
) -> Result<()> {
    for (key, range) in keys {
        kv.pull(*key, &mut exec.arg_arrays_mut()[range.clone()]).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{io::Cursor, num::NonZeroUsize};

    use parameter_server::LocalKvStore;

    use super::*;

    /// Records of 4 features labeled by the sign of the first one.
    fn records(n: usize) -> Cursor<Vec<u8>> {
        let bytes = (0..n)
            .flat_map(|i| {
                let x = (i % 7) as f32 - 3.;
                let label = (x > 0.) as u8 as f32;
                [label, x, 1., -x, 0.5]
            })
            .flat_map(f32::to_le_bytes)
            .collect();

        Cursor::new(bytes)
    }

    fn config() -> AdsConfig {
        AdsConfig {
            batch_size: 16,
            sample_size: 5,
            max_epoch: 2,
            weight_init: initialization::InitSpec::Normal {
                mean: 0.,
                std_dev: 0.01,
            },
            seed: Some(3),
            ..Default::default()
        }
    }

    #[test]
    fn network_arguments() {
        let args = network().list_arguments();
        assert_eq!(args.first().unwrap(), "data");
        assert_eq!(args.last().unwrap(), "label");
        assert_eq!(args.len(), 8);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn processes_every_record_of_every_epoch() {
        let mut kv = LocalKvStore::new(NonZeroUsize::new(1 << 12).unwrap());
        let mut stream = records(40);
        let size = stream.get_ref().len() as u64;

        let processed = run(&mut kv, &mut stream, size, &config()).await.unwrap();
        assert_eq!(processed, 80);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn rejects_records_without_features() {
        let mut kv = LocalKvStore::new(NonZeroUsize::new(8).unwrap());
        let mut stream = records(1);
        let config = AdsConfig {
            sample_size: 1,
            ..config()
        };

        let res = run(&mut kv, &mut stream, 20, &config).await;
        assert!(matches!(res, Err(WorkerErr::Config(_))));
    }
}
