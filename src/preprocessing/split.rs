use crate::error::{Error, Result};
use ndarray::{s, ArrayView1, ArrayView2};

/// A row range of the feature matrix together with its labels.
/// Both are views into the vectorized data, never copies.
#[derive(Clone, Copy, Debug)]
pub struct Slice<'a> {
    pub features: ArrayView2<'a, f32>,
    pub labels: ArrayView1<'a, f32>,
}

impl<'a> Slice<'a> {
    /// Pair up features and labels, checking that they have as many rows
    pub fn new(features: ArrayView2<'a, f32>, labels: ArrayView1<'a, f32>) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(Error::ShapeMismatch(format!(
                "{} feature rows but {} labels",
                features.nrows(),
                labels.len()
            )));
        }

        Ok(Slice { features, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Held-out validation rows `[0, k)` and training rows `[k, N)`
#[derive(Clone, Copy, Debug)]
pub struct Split<'a> {
    pub validation: Slice<'a>,
    pub training: Slice<'a>,
}

/// Cut the dataset at row `k`. The cut is deterministic so every variant
/// sees exactly the same validation rows.
pub fn split<'a>(
    features: ArrayView2<'a, f32>,
    labels: ArrayView1<'a, f32>,
    k: usize,
) -> Result<Split<'a>> {
    let all = Slice::new(features, labels)?;
    let n = all.len();

    if k > n {
        return Err(Error::SplitOutOfRange { k, n });
    }

    let (val_features, train_features) = all.features.split_at(ndarray::Axis(0), k);

    Ok(Split {
        validation: Slice {
            features: val_features,
            labels: all.labels.slice_move(s![..k]),
        },
        training: Slice {
            features: train_features,
            labels: all.labels.slice_move(s![k..]),
        },
    })
}
