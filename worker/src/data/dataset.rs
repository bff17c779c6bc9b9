use std::ops::Range;

use super::{DataErr, LabeledData, Result};

/// An in-memory dataset of `len` samples with `features` values each.
#[derive(Debug, Clone)]
pub struct InMemoryDataset {
    xs: Vec<f32>,
    ys: Vec<f32>,
    features: usize,
}

impl InMemoryDataset {
    /// Creates a new dataset from owned buffers.
    ///
    /// # Arguments
    /// * `xs` - The samples, one row of `features` values after the other.
    /// * `ys` - The label of each sample.
    /// * `features` - The amount of values per sample.
    ///
    /// # Returns
    /// An error if `xs` doesn't hold exactly one row per label.
    pub fn new(xs: Vec<f32>, ys: Vec<f32>, features: usize) -> Result<Self> {
        if xs.len() != ys.len() * features {
            return Err(DataErr::InvalidArgument(
                "samples and labels must have the same length",
            ));
        }

        Ok(Self { xs, ys, features })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ys.is_empty()
    }

    #[inline]
    pub fn features(&self) -> usize {
        self.features
    }

    #[inline]
    pub fn xs(&self) -> &[f32] {
        &self.xs
    }

    #[inline]
    pub fn ys(&self) -> &[f32] {
        &self.ys
    }

    /// Borrows the samples in `rows`.
    ///
    /// # Panics
    /// If `rows` is out of bounds.
    pub fn rows(&self, rows: Range<usize>) -> BatchRef<'_> {
        let xs = &self.xs[rows.start * self.features..rows.end * self.features];
        let ys = &self.ys[rows];
        BatchRef { xs, ys }
    }

    /// Splits the dataset in a training and a validation part.
    ///
    /// The last `val_fold / folds` of the samples are kept for validation, the amount of training
    /// samples is rounded down.
    ///
    /// # Arguments
    /// * `val_fold` - How many folds go to validation.
    /// * `folds` - The amount of folds the dataset is cut into.
    pub fn split(self, val_fold: usize, folds: usize) -> Result<(Self, Self)> {
        if folds == 0 || val_fold > folds {
            return Err(DataErr::InvalidArgument("val_fold must be in 0..=folds"));
        }

        let ratio = 1. - val_fold as f64 / folds as f64;
        let train_num = (self.len() as f64 * ratio) as usize;

        let Self {
            mut xs,
            mut ys,
            features,
        } = self;

        let val = Self {
            xs: xs.split_off(train_num * features),
            ys: ys.split_off(train_num),
            features,
        };

        Ok((Self { xs, ys, features }, val))
    }
}

impl From<LabeledData> for InMemoryDataset {
    fn from(value: LabeledData) -> Self {
        Self {
            xs: value.data,
            ys: value.labels,
            features: value.features,
        }
    }
}

/// Borrowed batch view (zero-copy).
#[derive(Debug, Clone, Copy)]
pub struct BatchRef<'a> {
    pub xs: &'a [f32],
    pub ys: &'a [f32],
}

impl BatchRef<'_> {
    #[inline]
    pub fn len(&self) -> usize {
        self.ys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(n: usize) -> InMemoryDataset {
        let xs = (0..n * 2).map(|i| i as f32).collect();
        let ys = (0..n).map(|i| i as f32).collect();
        InMemoryDataset::new(xs, ys, 2).unwrap()
    }

    #[test]
    fn lengths_must_agree() {
        assert!(InMemoryDataset::new(vec![0.; 5], vec![0.; 2], 2).is_err());
    }

    #[test]
    fn split_keeps_the_tail_for_validation() {
        let (train, val) = dataset(25).split(1, 10).unwrap();

        // 25 * 0.9 = 22.5
        assert_eq!(train.len(), 22);
        assert_eq!(val.len(), 3);
        assert_eq!(val.ys(), [22., 23., 24.]);
        assert_eq!(val.xs()[..2], [44., 45.]);
        assert_eq!(train.xs().len(), 44);
    }

    #[test]
    fn split_without_validation() {
        let (train, val) = dataset(4).split(0, 10).unwrap();
        assert_eq!(train.len(), 4);
        assert!(val.is_empty());
        assert!(dataset(4).split(11, 10).is_err());
    }

    #[test]
    fn rows_borrow_whole_samples() {
        let ds = dataset(5);
        let batch = ds.rows(1..3);

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.xs, [2., 3., 4., 5.]);
        assert_eq!(batch.ys, [1., 2.]);
    }
}
