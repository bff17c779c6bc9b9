//! Accuracy of classification outputs against their labels.

use ndarray::{ArrayView1, ArrayView2, Axis};

use crate::{MlErr, Result};

/// Index of the largest value, the first one wins on ties.
fn argmax(row: ArrayView1<f32>) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate() {
        if row[best] < v {
            best = i;
        }
    }
    best
}

fn ratio(matches: usize, total: usize) -> f32 {
    if total == 0 {
        return 0.;
    }

    matches as f32 / total as f32
}

fn check_labels(outputs: usize, labels: usize) -> Result<()> {
    if outputs != labels {
        return Err(MlErr::SizeMismatch {
            what: "labels",
            got: labels,
            expected: outputs,
        });
    }

    Ok(())
}

fn count_class_matches(outputs: ArrayView2<f32>, labels: ArrayView1<f32>) -> Result<usize> {
    check_labels(outputs.nrows(), labels.len())?;

    let matches = outputs
        .axis_iter(Axis(0))
        .zip(labels)
        .filter(|(row, label)| argmax(row.view()) as f32 == **label)
        .count();

    Ok(matches)
}

fn count_binary_matches(outputs: ArrayView1<f32>, labels: ArrayView1<f32>) -> Result<usize> {
    check_labels(outputs.len(), labels.len())?;

    let matches = outputs
        .iter()
        .zip(labels)
        .filter(|&(&p, &label)| ((p >= 0.5) as u8 as f32) == label)
        .count();

    Ok(matches)
}

/// The fraction of rows of `outputs` whose argmax is the label.
///
/// # Returns
/// A `SizeMismatch` error if there isn't exactly one label per row.
pub fn accuracy(outputs: ArrayView2<f32>, labels: ArrayView1<f32>) -> Result<f32> {
    let matches = count_class_matches(outputs, labels)?;
    Ok(ratio(matches, labels.len()))
}

/// The fraction of probabilities that land on the label's side of `0.5`.
///
/// # Returns
/// A `SizeMismatch` error if there isn't exactly one label per probability.
pub fn binary_accuracy(outputs: ArrayView1<f32>, labels: ArrayView1<f32>) -> Result<f32> {
    let matches = count_binary_matches(outputs, labels)?;
    Ok(ratio(matches, labels.len()))
}

/// Accumulates matches over many batches.
#[derive(Debug, Default, Clone, Copy)]
pub struct Accuracy {
    matches: usize,
    total: usize,
}

impl Accuracy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, outputs: ArrayView2<f32>, labels: ArrayView1<f32>) -> Result<()> {
        self.matches += count_class_matches(outputs, labels)?;
        self.total += labels.len();
        Ok(())
    }

    pub fn update_binary(
        &mut self,
        outputs: ArrayView1<f32>,
        labels: ArrayView1<f32>,
    ) -> Result<()> {
        self.matches += count_binary_matches(outputs, labels)?;
        self.total += labels.len();
        Ok(())
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn get(&self) -> f32 {
        ratio(self.matches, self.total)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn first_maximum_wins() {
        let outputs = array![[0.5, 0.5], [0.1, 0.9], [0.7, 0.3]];

        assert_eq!(accuracy(outputs.view(), array![0., 1., 1.].view()).unwrap(), 2. / 3.);
        assert_eq!(accuracy(outputs.view(), array![1., 1., 0.].view()).unwrap(), 2. / 3.);
    }

    #[test]
    fn binary_threshold_is_inclusive() {
        let outputs = array![0.5, 0.49, 0.99, 0.];
        let labels = array![1., 0., 1., 1.];

        assert_eq!(binary_accuracy(outputs.view(), labels.view()).unwrap(), 0.75);
    }

    #[test]
    fn empty_input_is_zero() {
        let outputs = ndarray::Array2::<f32>::zeros((0, 10));
        assert_eq!(accuracy(outputs.view(), array![].view()).unwrap(), 0.);
        assert_eq!(Accuracy::new().get(), 0.);
    }

    #[test]
    fn accumulates_across_batches() {
        let mut acc = Accuracy::new();

        acc.update(array![[1., 0.], [0., 1.]].view(), array![0., 0.].view())
            .unwrap();
        acc.update(array![[0., 1.], [0., 1.]].view(), array![1., 1.].view())
            .unwrap();
        assert_eq!(acc.total(), 4);
        assert_eq!(acc.get(), 0.75);

        acc.reset();
        acc.update_binary(array![0.9].view(), array![1.].view())
            .unwrap();
        assert_eq!(acc.get(), 1.);
    }

    #[test]
    fn label_count_must_match_outputs() {
        let outputs = array![[1., 0.], [0., 1.]];

        assert!(matches!(
            accuracy(outputs.view(), array![0.].view()),
            Err(MlErr::SizeMismatch { what: "labels", got: 1, expected: 2 })
        ));
        assert!(binary_accuracy(array![0.9].view(), array![1., 0.].view()).is_err());

        let mut acc = Accuracy::new();
        assert!(acc.update(outputs.view(), array![0., 1., 1.].view()).is_err());
        assert_eq!(acc.total(), 0);
    }
}
