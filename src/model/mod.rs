use ndarray::{Array1, ArrayView1, ArrayView2};

pub mod neural_net;
pub mod optimizer;
pub mod regularizer;
pub mod variant;

/// Loss and hit count of a model on one batch
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BatchStats {
    pub loss: f64, // Mean objective over the batch, penalty included
    pub correct: usize,
    pub size: usize,
}

pub trait Model {
    /// Number of features every input row must have
    fn input_dim(&self) -> usize;
    /// Measure the batch, then take one optimizer step on it
    fn train_on_batch(&mut self, inputs: &ArrayView2<f32>, targets: &ArrayView1<f32>) -> BatchStats;
    fn evaluate_batch(&self, inputs: &ArrayView2<f32>, targets: &ArrayView1<f32>) -> BatchStats;
    fn predict(&self, inputs: &ArrayView2<f32>) -> Array1<f32>;
}
