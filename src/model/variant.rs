use rand::Rng;

use super::neural_net::{InitMethod, NeuralNet};
use super::regularizer::Penalty;

/// Width of both hidden layers
pub const HIDDEN_UNITS: usize = 16;

/// A named penalty configuration. Every variant shares the same topology
#[derive(Clone, Debug, PartialEq)]
pub struct ModelVariant {
    pub name: String,  // Identifier used in files and logs
    pub label: String, // Human readable name for charts
    pub penalty: Penalty,
}

impl ModelVariant {
    pub fn new(name: &str, label: &str, penalty: Penalty) -> ModelVariant {
        ModelVariant {
            name: name.to_string(),
            label: label.to_string(),
            penalty,
        }
    }

    pub fn original() -> ModelVariant {
        ModelVariant::new("original", "Original model", Penalty::None)
    }

    pub fn l2(l2: f32) -> ModelVariant {
        ModelVariant::new("l2", "L2Regularized model", Penalty::L2 { l2 })
    }

    pub fn l1_l2(l1: f32, l2: f32) -> ModelVariant {
        ModelVariant::new("l1_l2", "L1L2Regularized model", Penalty::L1L2 { l1, l2 })
    }

    /// Layer widths: input -> 16 -> 16 -> 1
    pub fn layer_structure(input_dim: usize) -> [usize; 4] {
        [input_dim, HIDDEN_UNITS, HIDDEN_UNITS, 1]
    }

    /// Build a fresh, untrained classifier for this variant
    pub fn build<R: Rng + ?Sized>(
        &self,
        input_dim: usize,
        init_method: InitMethod,
        learning_rate: f32,
        rng: &mut R,
    ) -> NeuralNet {
        NeuralNet::new(
            &Self::layer_structure(input_dim),
            self.penalty,
            init_method,
            learning_rate,
            rng,
        )
    }
}

/// The three variants compared by the experiment, in reporting order
pub fn standard_variants(l1: f32, l2: f32) -> Vec<ModelVariant> {
    vec![
        ModelVariant::original(),
        ModelVariant::l2(l2),
        ModelVariant::l1_l2(l1, l2),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_standard_variants() {
        let variants = standard_variants(0.001, 0.001);
        let names: Vec<_> = variants.iter().map(|v| v.name.as_str()).collect();

        assert_eq!(names, vec!["original", "l2", "l1_l2"]);
        assert_eq!(variants[0].penalty, Penalty::None);
        assert_eq!(variants[1].penalty, Penalty::L2 { l2: 0.001 });
        assert_eq!(variants[2].penalty, Penalty::L1L2 { l1: 0.001, l2: 0.001 });
    }

    #[test]
    fn test_variants_share_topology() {
        let mut rng = StdRng::seed_from_u64(3);
        let shapes: Vec<Vec<_>> = standard_variants(0.001, 0.001)
            .iter()
            .map(|v| {
                let net = v.build(100, InitMethod::Xavier, 0.001, &mut rng);
                net.layers.iter().map(|(w, _)| w.dim()).collect()
            })
            .collect();

        assert!(shapes.iter().all(|s| *s == vec![(100, 16), (16, 16), (16, 1)]));
    }

    #[test]
    fn test_builds_are_independent() {
        let mut rng = StdRng::seed_from_u64(3);
        let variant = ModelVariant::l2(0.001);

        let a = variant.build(20, InitMethod::Xavier, 0.001, &mut rng);
        let b = variant.build(20, InitMethod::Xavier, 0.001, &mut rng);
        assert_ne!(a.layers[0].0, b.layers[0].0);
    }
}
