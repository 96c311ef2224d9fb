use crate::error::{Error, Result};
use ndarray::Array1;

/// Convert raw labels into a float vector of 0.0 / 1.0, keeping their order
pub fn normalize_labels(labels: &[f64]) -> Result<Array1<f32>> {
    labels
        .iter()
        .enumerate()
        .map(|(index, &value)| {
            if value == 0.0 || value == 1.0 {
                Ok(value as f32)
            } else {
                Err(Error::InvalidLabel { index, value })
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rejects_non_binary() {
        assert!(matches!(
            normalize_labels(&[0.0, 1.0, 2.0]),
            Err(Error::InvalidLabel { index: 2, .. })
        ));
        assert!(normalize_labels(&[0.5]).is_err());
        assert!(normalize_labels(&[-1.0]).is_err());
        assert!(normalize_labels(&[f64::NAN]).is_err());
    }

    #[test]
    fn test_empty() {
        assert_eq!(normalize_labels(&[]).unwrap().len(), 0);
    }

    proptest! {
        #[test]
        fn binary_labels_pass_through(labels in prop::collection::vec(prop::bool::ANY, 0..64)) {
            let raw: Vec<f64> = labels.iter().map(|&l| if l { 1.0 } else { 0.0 }).collect();
            let normalized = normalize_labels(&raw).unwrap();

            prop_assert_eq!(normalized.len(), raw.len());
            for (n, r) in normalized.iter().zip(&raw) {
                prop_assert_eq!(*n as f64, *r);
            }
        }
    }
}
