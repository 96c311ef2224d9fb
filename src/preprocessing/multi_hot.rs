use crate::error::{Error, Result};
use ndarray::Array2;

/// Encode every sequence as a multi-hot row of width `dimension`.
///
/// Row `i` has a 1.0 in column `t` iff token `t` occurs anywhere in sequence `i`.
/// Order and repetition are discarded. Any token `>= dimension` is rejected
/// before the matrix is allocated.
pub fn vectorize(sequences: &[Vec<usize>], dimension: usize) -> Result<Array2<f32>> {
    for (row, sequence) in sequences.iter().enumerate() {
        if let Some(&token) = sequence.iter().find(|&&token| token >= dimension) {
            return Err(Error::TokenOutOfRange {
                row,
                token,
                dimension,
            });
        }
    }

    let mut results = Array2::zeros((sequences.len(), dimension));

    for (mut row, sequence) in results.outer_iter_mut().zip(sequences) {
        for &token in sequence {
            row[token] = 1.0;
        }
    }

    Ok(results)
}
