use std::iter::StepBy;
use std::num::NonZeroUsize;
use std::ops::Range;

/// Splits `total` samples among `num_workers` and returns the shard for `worker_id`.
///
/// Properties:
/// - Ranges are contiguous, disjoint and cover `[0..total)`.
/// - Sizes differ by at most 1 (balanced partition).
pub fn shard_range(total: usize, worker_id: usize, num_workers: usize) -> Range<usize> {
    assert!(num_workers > 0);
    assert!(worker_id < num_workers);

    let base = total / num_workers;
    let rem = total % num_workers;

    let start = worker_id * base + worker_id.min(rem);
    let extra = if worker_id < rem { 1 } else { 0 };
    let end = start + base + extra;

    start..end
}

/// The samples of `worker_id` when they're dealt one at a time among `num_workers`.
///
/// Every index in `[0..total)` belongs to exactly one worker.
pub fn round_robin(total: usize, worker_id: usize, num_workers: usize) -> StepBy<Range<usize>> {
    assert!(num_workers > 0);
    assert!(worker_id < num_workers);

    (worker_id.min(total)..total).step_by(num_workers)
}

/// Shard specification for a worker (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardSpec {
    pub worker_id: usize,
    pub num_workers: NonZeroUsize,
}

impl ShardSpec {
    pub fn new(worker_id: usize, num_workers: NonZeroUsize) -> Self {
        assert!(worker_id < num_workers.get(), "worker_id out of range");
        Self {
            worker_id,
            num_workers,
        }
    }

    #[inline]
    pub fn range(self, total: usize) -> Range<usize> {
        shard_range(total, self.worker_id, self.num_workers.get())
    }

    #[inline]
    pub fn round_robin(self, total: usize) -> StepBy<Range<usize>> {
        round_robin(total, self.worker_id, self.num_workers.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_range_balanced() {
        // total 10, workers 3 => sizes 4,3,3
        assert_eq!(shard_range(10, 0, 3), 0..4);
        assert_eq!(shard_range(10, 1, 3), 4..7);
        assert_eq!(shard_range(10, 2, 3), 7..10);
    }

    #[test]
    fn shard_spec_range_matches_function() {
        let spec = ShardSpec::new(1, NonZeroUsize::new(3).unwrap());
        assert_eq!(spec.range(10), 4..7);
    }

    #[test]
    fn round_robin_deals_one_at_a_time() {
        let got: Vec<_> = round_robin(10, 1, 3).collect();
        assert_eq!(got, [1, 4, 7]);
        assert_eq!(round_robin(2, 2, 3).count(), 0);
    }

    #[test]
    fn partitions_cover_every_sample_once() {
        for total in [0, 1, 7, 10, 64, 101] {
            for workers in 1..=8 {
                let mut contiguous = vec![0; total];
                let mut dealt = vec![0; total];

                for rank in 0..workers {
                    let spec = ShardSpec::new(rank, NonZeroUsize::new(workers).unwrap());
                    spec.range(total).for_each(|i| contiguous[i] += 1);
                    spec.round_robin(total).for_each(|i| dealt[i] += 1);
                }

                assert!(contiguous.iter().all(|&c| c == 1), "{total}/{workers}");
                assert!(dealt.iter().all(|&c| c == 1), "{total}/{workers}");
            }
        }
    }
}
