pub mod imdb;

/// A partition of reviews: each review is a sequence of word indices
/// together with its raw sentiment label
#[derive(Debug)]
pub struct Dataset {
    pub sequences: Vec<Vec<usize>>,
    pub labels: Vec<f64>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Largest word index appearing in any review
    pub fn max_token(&self) -> Option<usize> {
        self.sequences.iter().flatten().copied().max()
    }
}
