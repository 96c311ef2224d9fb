use ndarray::Array2;

/// Weight penalty added to the training objective for every hidden-layer kernel
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Penalty {
    None,
    /// l2 * sum(w^2)
    L2 { l2: f32 },
    /// l1 * sum(|w|) + l2 * sum(w^2)
    L1L2 { l1: f32, l2: f32 },
}

impl Penalty {
    fn coefficients(&self) -> (f32, f32) {
        match *self {
            Penalty::None => (0.0, 0.0),
            Penalty::L2 { l2 } => (0.0, l2),
            Penalty::L1L2 { l1, l2 } => (l1, l2),
        }
    }

    /// Penalty contributed by one weight matrix
    pub fn value(&self, weights: &Array2<f32>) -> f64 {
        let (l1, l2) = self.coefficients();
        if l1 == 0.0 && l2 == 0.0 {
            return 0.0;
        }

        let (abs_sum, sq_sum) = weights.iter().fold((0f64, 0f64), |(a, s), &w| {
            let w = w as f64;
            (a + w.abs(), s + w * w)
        });

        l1 as f64 * abs_sum + l2 as f64 * sq_sum
    }

    /// Gradient of `value` WRT the weights, None when there is no penalty.
    /// The subgradient of |w| at 0 is taken to be 0.
    pub fn gradient(&self, weights: &Array2<f32>) -> Option<Array2<f32>> {
        match self {
            Penalty::None => None,
            _ => {
                let (l1, l2) = self.coefficients();
                Some(weights.mapv(|w| l1 * sign(w) + 2.0 * l2 * w))
            }
        }
    }
}

fn sign(w: f32) -> f32 {
    if w > 0.0 {
        1.0
    } else if w < 0.0 {
        -1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_values() {
        let w = array![[1.0f32, -2.0], [0.0, 0.5]];

        assert_eq!(Penalty::None.value(&w), 0.0);
        let l2 = Penalty::L2 { l2: 0.001 }.value(&w);
        assert!((l2 - 0.001 * 5.25).abs() < 1e-9);
        let l1l2 = Penalty::L1L2 { l1: 0.001, l2: 0.001 }.value(&w);
        assert!((l1l2 - 0.001 * 3.5 - 0.001 * 5.25).abs() < 1e-9);
    }

    #[test]
    fn test_zero_weights_have_no_penalty() {
        let w = Array2::<f32>::zeros((3, 4));

        assert_eq!(Penalty::L2 { l2: 0.001 }.value(&w), 0.0);
        assert_eq!(Penalty::L1L2 { l1: 0.001, l2: 0.001 }.value(&w), 0.0);
        assert_eq!(
            Penalty::L1L2 { l1: 0.001, l2: 0.001 }.gradient(&w).unwrap(),
            w
        );
    }

    #[test]
    fn test_gradients() {
        let w = array![[1.0f32, -2.0]];

        assert!(Penalty::None.gradient(&w).is_none());
        assert_eq!(
            Penalty::L2 { l2: 0.5 }.gradient(&w).unwrap(),
            array![[1.0f32, -2.0]]
        );
        assert_eq!(
            Penalty::L1L2 { l1: 0.25, l2: 0.5 }.gradient(&w).unwrap(),
            array![[1.25f32, -2.25]]
        );
    }
}
