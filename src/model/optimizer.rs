use ndarray::{Array, Array1, Array2, Dimension, Zip};

pub const DEFAULT_LEARNING_RATE: f32 = 0.001;
pub const DEFAULT_RHO: f32 = 0.9;
pub const DEFAULT_EPSILON: f32 = 1e-7;

/// RMSprop: every parameter's step is scaled by a running root-mean-square of its gradients
#[derive(Clone, Debug)]
pub struct RmsProp {
    pub learning_rate: f32,
    pub rho: f32,
    pub epsilon: f32,
    caches: Vec<(Array2<f32>, Array1<f32>)>, // Running mean of squared gradients, per layer
}

impl RmsProp {
    /// Construct an optimizer with empty caches shaped like `layers`
    pub fn new(learning_rate: f32, layers: &[(Array2<f32>, Array1<f32>)]) -> RmsProp {
        let caches = layers
            .iter()
            .map(|(w, b)| (Array2::zeros(w.raw_dim()), Array1::zeros(b.raw_dim())))
            .collect();

        RmsProp {
            learning_rate,
            rho: DEFAULT_RHO,
            epsilon: DEFAULT_EPSILON,
            caches,
        }
    }

    /// Apply one update to the weights and biases of layer `idx`
    pub fn step(
        &mut self,
        idx: usize,
        layer: &mut (Array2<f32>, Array1<f32>),
        weight_grad: &Array2<f32>,
        bias_grad: &Array1<f32>,
    ) {
        let (lr, rho, eps) = (self.learning_rate, self.rho, self.epsilon);
        let (weight_cache, bias_cache) = &mut self.caches[idx];

        update(&mut layer.0, weight_cache, weight_grad, lr, rho, eps);
        update(&mut layer.1, bias_cache, bias_grad, lr, rho, eps);
    }
}

fn update<D: Dimension>(
    param: &mut Array<f32, D>,
    cache: &mut Array<f32, D>,
    grad: &Array<f32, D>,
    lr: f32,
    rho: f32,
    eps: f32,
) {
    Zip::from(param).and(cache).and(grad).for_each(|p, c, &g| {
        *c = rho * *c + (1.0 - rho) * g * g;
        *p -= lr * g / (c.sqrt() + eps);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_first_step_is_scaled_by_rms() {
        let mut layer = (array![[1.0f32, 1.0]], array![0.0f32]);
        let mut opt = RmsProp::new(0.01, std::slice::from_ref(&layer));

        opt.step(0, &mut layer, &array![[2.0, -0.5]], &array![0.0]);

        // cache = 0.1 * g^2, so the step is lr * g / (|g| * sqrt(0.1))
        let expected = 0.01 / 0.1f32.sqrt();
        assert!((layer.0[[0, 0]] - (1.0 - expected)).abs() < 1e-5);
        assert!((layer.0[[0, 1]] - (1.0 + expected)).abs() < 1e-5);
        assert_eq!(layer.1[0], 0.0);
    }

    #[test]
    fn test_zero_gradient_leaves_params() {
        let mut layer = (array![[0.5f32]], array![0.25f32]);
        let mut opt = RmsProp::new(DEFAULT_LEARNING_RATE, std::slice::from_ref(&layer));

        opt.step(0, &mut layer, &array![[0.0]], &array![0.0]);

        assert_eq!(layer.0[[0, 0]], 0.5);
        assert_eq!(layer.1[0], 0.25);
    }
}
