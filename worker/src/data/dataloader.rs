use std::num::NonZeroUsize;

use super::dataset::{BatchRef, InMemoryDataset};

/// Yields full-size batches over a dataset.
///
/// Once the remaining samples don't fill a batch, the last batch is moved back so that it ends
/// at the last sample, overlapping with the previous one. A dataset smaller than the batch size
/// yields a single batch with every sample.
#[derive(Debug, Clone)]
pub struct DataLoader<'a> {
    dataset: &'a InMemoryDataset,
    batch_size: usize,
    cursor: usize,
}

impl<'a> DataLoader<'a> {
    pub fn new(dataset: &'a InMemoryDataset, batch_size: NonZeroUsize) -> Self {
        let batch_size = batch_size.get().min(dataset.len());

        Self {
            dataset,
            batch_size,
            cursor: 0,
        }
    }

    /// The size of every batch, at most the requested one.
    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    #[inline]
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Returns the next borrowed batch, or None if exhausted.
    pub fn next_batch(&mut self) -> Option<BatchRef<'a>> {
        let total = self.dataset.len();
        if self.cursor >= total {
            return None;
        }

        let start = self.cursor.min(total - self.batch_size);
        let end = start + self.batch_size;

        self.cursor += self.batch_size;
        Some(self.dataset.rows(start..end))
    }
}

impl<'a> Iterator for DataLoader<'a> {
    type Item = BatchRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_batch()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(n: usize) -> InMemoryDataset {
        let xs = (0..n).map(|i| i as f32).collect();
        let ys = (0..n).map(|i| (i as f32) + 100.0).collect();
        InMemoryDataset::new(xs, ys, 1).unwrap()
    }

    fn batch(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn last_batch_is_moved_back() {
        let ds = dataset(10);
        let mut dl = DataLoader::new(&ds, batch(4));

        assert_eq!(dl.next_batch().unwrap().xs, [0., 1., 2., 3.]);
        assert_eq!(dl.next_batch().unwrap().xs, [4., 5., 6., 7.]);

        let last = dl.next_batch().unwrap();
        assert_eq!(last.xs, [6., 7., 8., 9.]);
        assert_eq!(last.ys, [106., 107., 108., 109.]);

        assert!(dl.next_batch().is_none());

        dl.reset();
        assert_eq!(dl.next_batch().unwrap().xs, [0., 1., 2., 3.]);
    }

    #[test]
    fn exact_multiples_do_not_overlap() {
        let ds = dataset(6);
        let starts: Vec<_> = DataLoader::new(&ds, batch(3)).map(|b| b.xs[0]).collect();
        assert_eq!(starts, [0., 3.]);
    }

    #[test]
    fn small_datasets_yield_one_batch() {
        let ds = dataset(3);
        let mut dl = DataLoader::new(&ds, batch(42));

        assert_eq!(dl.batch_size(), 3);
        assert_eq!(dl.next_batch().unwrap().len(), 3);
        assert!(dl.next_batch().is_none());
    }

    #[test]
    fn empty_datasets_yield_nothing() {
        let ds = dataset(0);
        assert_eq!(DataLoader::new(&ds, batch(4)).count(), 0);
    }
}
