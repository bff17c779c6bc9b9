use std::{collections::HashMap, num::NonZeroUsize};

use comms::{msg::Key, specs::OptimizerSpec};
use log::{debug, warn};
use machine_learning::optimization::{self, Optimizer};

use super::KvStore;
use crate::{KvErr, Result, storage::ParameterStore};

type BoxedOptimizer = Box<dyn Optimizer + Send>;

/// A single process store, pushes are applied right away.
pub struct LocalKvStore {
    spec: OptimizerSpec,
    shard_size: NonZeroUsize,
    values: HashMap<Key, ParameterStore<BoxedOptimizer>>,
}

impl LocalKvStore {
    pub fn new(shard_size: NonZeroUsize) -> Self {
        Self {
            spec: OptimizerSpec::Assign,
            shard_size,
            values: HashMap::new(),
        }
    }

    fn get(&self, key: Key) -> Result<&ParameterStore<BoxedOptimizer>> {
        self.values.get(&key).ok_or(KvErr::UnknownKey(key))
    }
}

impl KvStore for LocalKvStore {
    fn rank(&self) -> usize {
        0
    }

    fn num_workers(&self) -> usize {
        1
    }

    fn is_synchronous(&self) -> bool {
        false
    }

    async fn set_optimizer(&mut self, spec: OptimizerSpec) -> Result<()> {
        debug!("setting optimizer {spec:?}");
        self.spec = spec;

        for store in self.values.values() {
            store.set_optimizer(|_| optimization::from_spec(spec));
        }

        Ok(())
    }

    async fn init(&mut self, key: Key, values: &[f32]) -> Result<()> {
        if self.values.contains_key(&key) {
            warn!(key = key; "key already initialized, keeping its first value");
            return Ok(());
        }

        let spec = self.spec;
        let store = ParameterStore::new(self.shard_size, values, |_| optimization::from_spec(spec));
        self.values.insert(key, store);
        Ok(())
    }

    async fn push(&mut self, key: Key, grad: &[f32]) -> Result<()> {
        let store = self.get(key)?;
        store.accumulate(grad).map_err(KvErr::for_key(key))?;
        store.update_params().map_err(KvErr::for_key(key))
    }

    async fn pull(&mut self, key: Key, out: &mut [f32]) -> Result<()> {
        self.get(key)?
            .pull_params(out)
            .map_err(KvErr::for_key(key))
    }

    async fn barrier(&mut self) -> Result<()> {
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> LocalKvStore {
        LocalKvStore::new(NonZeroUsize::new(2).unwrap())
    }

    #[tokio::test]
    async fn without_optimizer_push_replaces_the_value() {
        let mut kv = store();
        kv.init(0, &[1., 2., 3.]).await.unwrap();
        kv.push(0, &[4., 5., 6.]).await.unwrap();

        let mut out = [0.; 3];
        kv.pull(0, &mut out).await.unwrap();
        assert_eq!(out, [4., 5., 6.]);
    }

    #[tokio::test]
    async fn push_applies_the_optimizer() {
        let mut kv = store();
        kv.set_optimizer(OptimizerSpec::GradientDescent { learning_rate: 0.5 })
            .await
            .unwrap();
        kv.init(3, &[1., 1.]).await.unwrap();
        kv.push(3, &[2., -2.]).await.unwrap();

        let mut out = [0.; 2];
        kv.pull(3, &mut out).await.unwrap();
        assert_eq!(out, [0., 2.]);
    }

    #[tokio::test]
    async fn first_init_wins() {
        let mut kv = store();
        kv.init(0, &[1.]).await.unwrap();
        kv.init(0, &[9.]).await.unwrap();

        let mut out = [0.];
        kv.pull(0, &mut out).await.unwrap();
        assert_eq!(out, [1.]);
    }

    #[tokio::test]
    async fn unknown_keys_and_sizes_are_errors() {
        let mut kv = store();
        kv.init(0, &[1., 2.]).await.unwrap();

        assert!(matches!(kv.pull(1, &mut [0.]).await, Err(KvErr::UnknownKey(1))));
        assert!(matches!(
            kv.push(0, &[1.]).await,
            Err(KvErr::SizeMismatch { key: 0, got: 1, expected: 2 })
        ));
        assert_eq!((kv.rank(), kv.num_workers()), (0, 1));
        kv.barrier().await.unwrap();
    }
}
