use std::{collections::HashMap, num::NonZeroUsize};

use comms::{msg::Key, specs::OptimizerSpec};
use machine_learning::optimization::{self, Optimizer};
use parking_lot::RwLock;

use crate::{
    KvErr, Result,
    storage::{ParameterHandle, ParameterStore},
};

pub(super) type BoxedOptimizer = Box<dyn Optimizer + Send>;

/// Every key held by the server along with the optimizer new keys are created with.
pub(super) struct ParamTable {
    shard_size: NonZeroUsize,
    spec: RwLock<OptimizerSpec>,
    handles: RwLock<HashMap<Key, ParameterHandle<BoxedOptimizer>>>,
}

impl ParamTable {
    pub fn new(shard_size: NonZeroUsize) -> Self {
        Self {
            shard_size,
            spec: RwLock::new(OptimizerSpec::Assign),
            handles: RwLock::new(HashMap::new()),
        }
    }

    /// Sets the optimizer of the keys stored so far and of the ones to come.
    pub fn set_optimizer(&self, spec: OptimizerSpec) {
        *self.spec.write() = spec;

        for handle in self.handles.read().values() {
            handle.set_optimizer(|_| optimization::from_spec(spec));
        }
    }

    /// Stores the initial value of `key`.
    ///
    /// # Returns
    /// Whether the value was stored, `false` if the key already existed.
    pub fn init(&self, key: Key, values: &[f32]) -> bool {
        let mut handles = self.handles.write();
        if handles.contains_key(&key) {
            return false;
        }

        let spec = *self.spec.read();
        let store = ParameterStore::new(self.shard_size, values, |_| optimization::from_spec(spec));
        handles.insert(key, ParameterHandle::new(store));
        true
    }

    pub fn get(&self, key: Key) -> Result<ParameterHandle<BoxedOptimizer>> {
        self.handles
            .read()
            .get(&key)
            .cloned()
            .ok_or(KvErr::UnknownKey(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread")]
    async fn first_init_wins() {
        let table = ParamTable::new(NonZeroUsize::new(4).unwrap());

        assert!(table.init(7, &[1., 2.]));
        assert!(!table.init(7, &[3., 4.]));

        let mut out = [0.; 2];
        table.get(7).unwrap().pull_params(&mut out).await.unwrap();
        assert_eq!(out, [1., 2.]);
        assert!(matches!(table.get(8), Err(KvErr::UnknownKey(8))));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn optimizer_applies_to_existing_keys() {
        let table = ParamTable::new(NonZeroUsize::new(4).unwrap());
        table.init(0, &[1.]);
        table.set_optimizer(OptimizerSpec::GradientDescent { learning_rate: 1. });

        let handle = table.get(0).unwrap();
        handle.accumulate(&[0.25]).await.unwrap();
        handle.update_params().await.unwrap();

        let mut out = [0.];
        handle.pull_params(&mut out).await.unwrap();
        assert_eq!(out, [0.75]);
    }
}
