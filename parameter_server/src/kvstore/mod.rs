mod dist;
mod local;

use comms::{msg::Key, specs::OptimizerSpec};
pub use dist::DistKvStore;
pub use local::LocalKvStore;

use crate::Result;

/// A key-value store of parameter arrays shared by the workers of a training job.
///
/// Values are initialized once, workers push gradients and pull the values back.
#[allow(unused)]
#[trait_variant::make(KvStore: Send)]
pub trait KvStoreTemplate {
    /// The rank of this worker, in `0..num_workers`.
    fn rank(&self) -> usize;

    fn num_workers(&self) -> usize;

    /// Whether pushes of a key wait for every worker, in which case all workers must push the
    /// same keys the same number of times.
    fn is_synchronous(&self) -> bool;

    /// Sets how pushed gradients update the stored values.
    async fn set_optimizer(&mut self, spec: OptimizerSpec) -> Result<()>;

    /// Stores the initial value of `key`, only the first value of a key is kept.
    async fn init(&mut self, key: Key, values: &[f32]) -> Result<()>;

    /// Pushes a gradient for `key`.
    async fn push(&mut self, key: Key, grad: &[f32]) -> Result<()>;

    /// Copies the current value of `key` into `out`.
    async fn pull(&mut self, key: Key, out: &mut [f32]) -> Result<()>;

    /// Waits until every worker reached this point.
    async fn barrier(&mut self) -> Result<()>;

    /// Leaves the job, the store can't be used afterwards.
    async fn close(&mut self) -> Result<()>;
}
