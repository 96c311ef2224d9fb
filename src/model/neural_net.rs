use ndarray::{Array, Array1, Array2, ArrayView1, ArrayView2, Axis, Zip};
use rand::distributions::{Distribution, Uniform};
use rand::Rng;

use super::optimizer::RmsProp;
use super::regularizer::Penalty;
use super::{BatchStats, Model};
use crate::error::{Error, Result};

/// Represents a binary classifier: ReLU hidden layers followed by a single sigmoid unit
#[derive(Clone, Debug)]
pub struct NeuralNet {
    pub layers: Vec<(Array2<f32>, Array1<f32>)>, // Each layer holds a weight matrix and a bias vector
    pub penalty: Penalty,                        // Applied to every layer but the output layer
    optimizer: RmsProp,
}

#[derive(Clone, Copy, Debug)]
pub enum ActivationFunction {
    ReLU,
    Sigmoid,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitMethod {
    Default,
    Xavier,
}

/// Smallest distance between a predicted probability and 0 or 1
const PROBABILITY_EPSILON: f32 = f32::EPSILON;

/// Outputs of one forward pass, kept around for backprop
struct Pass {
    activations: Vec<Array2<f32>>, // Output of every layer (the last one holds the logits)
    linear: Vec<Array2<f32>>,      // Outputs before the activation function
}

impl NeuralNet {
    /// Construct a new net with randomly initialized layers
    pub fn new<R: Rng + ?Sized>(
        layer_structure: &[usize],
        penalty: Penalty,
        init_method: InitMethod,
        learning_rate: f32,
        rng: &mut R,
    ) -> NeuralNet {
        let layers = match init_method {
            InitMethod::Default => init_layers_default(layer_structure, rng),
            InitMethod::Xavier => init_layers_xavier(layer_structure, rng),
        };
        let optimizer = RmsProp::new(learning_rate, &layers);

        NeuralNet {
            layers,
            penalty,
            optimizer,
        }
    }

    /// Construct a net from given weights. Consecutive layers must chain
    /// and the last layer must have a single output unit.
    pub fn from_layers(
        layers: Vec<(Array2<f32>, Array1<f32>)>,
        penalty: Penalty,
        learning_rate: f32,
    ) -> Result<NeuralNet> {
        if layers.is_empty() {
            return Err(Error::ShapeMismatch("a net needs at least one layer".to_string()));
        }

        for (idx, (weights, bias)) in layers.iter().enumerate() {
            if weights.ncols() != bias.len() {
                return Err(Error::ShapeMismatch(format!(
                    "layer {idx}: {} outputs but {} biases",
                    weights.ncols(),
                    bias.len()
                )));
            }
        }
        for (idx, pair) in layers.windows(2).enumerate() {
            if pair[0].0.ncols() != pair[1].0.nrows() {
                return Err(Error::ShapeMismatch(format!(
                    "layer {idx} outputs {} values but layer {} expects {}",
                    pair[0].0.ncols(),
                    idx + 1,
                    pair[1].0.nrows()
                )));
            }
        }
        if let Some((weights, _)) = layers.last().filter(|(w, _)| w.ncols() != 1) {
            return Err(Error::ShapeMismatch(format!(
                "output layer must have one unit, got {}",
                weights.ncols()
            )));
        }

        let optimizer = RmsProp::new(learning_rate, &layers);

        Ok(NeuralNet {
            layers,
            penalty,
            optimizer,
        })
    }

    // Perform a forward pass of the network on some input.
    fn forward(&self, inputs: &ArrayView2<f32>) -> Pass {
        let mut activations: Vec<Array2<f32>> = vec![];
        let mut linear = vec![];
        let last = self.layers.len() - 1;

        for (idx, layer) in self.layers.iter().enumerate() {
            // The output of the layer without applying the activation function
            let lin_output = match activations.last() {
                Some(prev) => prev.dot(&layer.0) + &layer.1,
                None => inputs.dot(&layer.0) + &layer.1,
            };
            // Hidden layers apply ReLU. The output layer keeps its logits, the sigmoid
            // is folded into the loss for numerical stability
            let real_output = if idx == last {
                lin_output.clone()
            } else {
                lin_output.mapv(|x| activation(ActivationFunction::ReLU, x))
            };

            activations.push(real_output);
            linear.push(lin_output);
        }

        Pass {
            activations,
            linear,
        }
    }

    fn logits(pass: &Pass) -> ArrayView1<'_, f32> {
        // The output layer has a single unit
        pass.activations[pass.activations.len() - 1].column(0)
    }

    /// Total weight penalty of the current hidden-layer weights
    pub fn penalty_value(&self) -> f64 {
        let hidden = self.layers.len() - 1;
        self.layers[..hidden]
            .iter()
            .map(|(weights, _)| self.penalty.value(weights))
            .sum()
    }

    /// Training objective on a batch: mean binary cross-entropy plus the weight penalty
    #[cfg(test)]
    pub fn objective(&self, inputs: &ArrayView2<f32>, targets: &ArrayView1<f32>) -> f64 {
        let pass = self.forward(inputs);
        binary_cross_entropy(&Self::logits(&pass), targets) + self.penalty_value()
    }

    fn batch_stats(&self, pass: &Pass, targets: &ArrayView1<f32>) -> BatchStats {
        let logits = Self::logits(pass);

        BatchStats {
            loss: binary_cross_entropy(&logits, targets) + self.penalty_value(),
            correct: count_correct(&logits, targets),
            size: targets.len(),
        }
    }

    /// Calculate the gradients using backprop and perform an RMSprop step
    fn backward_and_update(&mut self, inputs: &ArrayView2<f32>, pass: Pass, grad: Array2<f32>) {
        // The gradient WRT the current layer
        let mut grad_help = grad;
        let last = self.layers.len() - 1;

        for idx in (0..self.layers.len()).rev() {
            // If we aren't at the last layer, we need to change the gradient
            if idx != last {
                let step_mat =
                    pass.linear[idx].mapv(delta_relu);
                grad_help = grad_help * step_mat;
            }

            // Gradient WRT the weights in the current layer
            let mut weight_grad = match idx {
                0 => inputs.t().dot(&grad_help),
                _ => pass.activations[idx - 1].t().dot(&grad_help),
            };
            if idx != last {
                if let Some(penalty_grad) = self.penalty.gradient(&self.layers[idx].0) {
                    weight_grad += &penalty_grad;
                }
            }
            // Gradient WRT the biases in the current layer
            let bias_grad = grad_help.sum_axis(Axis(0));

            // Propagate through the weights before they change
            if idx != 0 {
                grad_help = grad_help.dot(&self.layers[idx].0.t());
            }

            self.optimizer
                .step(idx, &mut self.layers[idx], &weight_grad, &bias_grad);
        }
    }
}

impl Model for NeuralNet {
    fn input_dim(&self) -> usize {
        self.layers[0].0.nrows()
    }

    fn train_on_batch(&mut self, inputs: &ArrayView2<f32>, targets: &ArrayView1<f32>) -> BatchStats {
        let pass = self.forward(inputs);
        let stats = self.batch_stats(&pass, targets);

        // Gradient of the mean cross-entropy WRT the logits is (sigmoid(z) - y) / m
        let m = targets.len().max(1) as f32;
        let mut grad = Array2::zeros((targets.len(), 1));
        Zip::from(grad.column_mut(0))
            .and(&Self::logits(&pass))
            .and(targets)
            .for_each(|g, &z, &y| *g = (activation(ActivationFunction::Sigmoid, z) - y) / m);

        self.backward_and_update(inputs, pass, grad);

        stats
    }

    fn evaluate_batch(&self, inputs: &ArrayView2<f32>, targets: &ArrayView1<f32>) -> BatchStats {
        let pass = self.forward(inputs);
        self.batch_stats(&pass, targets)
    }

    /// Predict the probability of the positive class for every row in "inputs".
    /// Saturated logits are kept strictly inside (0, 1)
    fn predict(&self, inputs: &ArrayView2<f32>) -> Array1<f32> {
        let pass = self.forward(inputs);
        Self::logits(&pass).mapv(|z| {
            activation(ActivationFunction::Sigmoid, z)
                .clamp(PROBABILITY_EPSILON, 1f32 - PROBABILITY_EPSILON)
        })
    }
}

fn activation(name: ActivationFunction, z: f32) -> f32 {
    match name {
        ActivationFunction::ReLU => z.max(0f32),
        ActivationFunction::Sigmoid => (1f32 + (-z).exp()).recip(),
    }
}

/// Derivative of ReLU. The sigmoid's derivative is folded into the loss gradient
fn delta_relu(z: f32) -> f32 {
    if z > 0f32 {
        1f32
    } else {
        0f32
    }
}

fn init_layers_default<R: Rng + ?Sized>(
    layer_structure: &[usize],
    rng: &mut R,
) -> Vec<(Array2<f32>, Array1<f32>)> {
    let mut layers = vec![];
    // Weights are initialized from a uniform distribution
    let distribution = Uniform::new(-0.3f32, 0.3);

    for pair in layer_structure.windows(2) {
        // Random matrix of the weights between this layer and the next layer
        let weights = Array::zeros((pair[0], pair[1])).map(|_: &f32| distribution.sample(rng));
        // Bias vector between this layer and the next layer. Init'd to ones
        let bias = Array::ones(pair[1]);

        layers.push((weights, bias));
    }

    layers
}

/// Glorot uniform: U(-b, b) with b = sqrt(6 / (fan_in + fan_out)), zero biases
fn init_layers_xavier<R: Rng + ?Sized>(
    layer_structure: &[usize],
    rng: &mut R,
) -> Vec<(Array2<f32>, Array1<f32>)> {
    let mut layers = vec![];

    for pair in layer_structure.windows(2) {
        let boundary = (6f32 / (pair[0] + pair[1]) as f32).sqrt();
        let dist = Uniform::new(-boundary, boundary);

        let weights = Array::zeros((pair[0], pair[1])).map(|_: &f32| dist.sample(rng));
        let bias = Array::zeros(pair[1]);

        layers.push((weights, bias));
    }

    layers
}

/// Mean binary cross-entropy of sigmoid(logits) against 0/1 targets.
/// Uses max(z, 0) - z * y + ln(1 + e^-|z|), which never takes the log of 0
fn binary_cross_entropy(logits: &ArrayView1<f32>, targets: &ArrayView1<f32>) -> f64 {
    if targets.is_empty() {
        return 0.0;
    }

    let total: f64 = logits
        .iter()
        .zip(targets.iter())
        .map(|(&z, &y)| {
            let (z, y) = (z as f64, y as f64);
            z.max(0.0) - z * y + (-z.abs()).exp().ln_1p()
        })
        .sum();

    total / targets.len() as f64
}

/// A prediction is correct when the rounded probability equals the label.
/// sigmoid(z) > 0.5 exactly when z > 0
fn count_correct(logits: &ArrayView1<f32>, targets: &ArrayView1<f32>) -> usize {
    logits
        .iter()
        .zip(targets.iter())
        .filter(|&(&z, &y)| (z > 0.0) == (y > 0.5))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn tiny_layers(scale: f32) -> Vec<(Array2<f32>, Array1<f32>)> {
        vec![
            (
                Array2::from_shape_fn((4, 3), |(i, j)| scale * ((i + j) as f32 - 2.5) / 4.0),
                Array1::zeros(3),
            ),
            (
                Array2::from_shape_fn((3, 3), |(i, j)| scale * ((i * j) as f32 - 1.0) / 3.0),
                Array1::zeros(3),
            ),
            (Array2::from_elem((3, 1), scale * 0.5), Array1::zeros(1)),
        ]
    }

    fn tiny_batch() -> (Array2<f32>, Array1<f32>) {
        let inputs = array![
            [1.0, 0.0, 1.0, 0.0],
            [0.0, 1.0, 1.0, 1.0],
            [1.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0]
        ];
        let targets = array![1.0, 0.0, 1.0, 0.0];
        (inputs, targets)
    }

    #[test]
    fn test_new_shapes() {
        let mut rng = StdRng::seed_from_u64(7);
        let net = NeuralNet::new(&[10, 16, 16, 1], Penalty::None, InitMethod::Xavier, 0.001, &mut rng);

        let shapes: Vec<_> = net.layers.iter().map(|(w, b)| (w.dim(), b.len())).collect();
        assert_eq!(shapes, vec![((10, 16), 16), ((16, 16), 16), ((16, 1), 1)]);
        assert_eq!(Model::input_dim(&net), 10);

        let bound = (6f32 / 26.0).sqrt();
        assert!(net.layers[0].0.iter().all(|w| w.abs() <= bound));
        assert!(net.layers[0].1.iter().all(|&b| b == 0.0));
    }

    #[test]
    fn test_default_init() {
        let mut rng = StdRng::seed_from_u64(7);
        let net = NeuralNet::new(&[5, 4, 1], Penalty::None, InitMethod::Default, 0.001, &mut rng);

        assert!(net.layers[0].0.iter().all(|w| w.abs() <= 0.3));
        assert!(net.layers[1].1.iter().all(|&b| b == 1.0));
    }

    #[test]
    fn test_from_layers_checks_shapes() {
        let mut layers = tiny_layers(1.0);
        layers[1].0 = Array2::zeros((2, 3));
        assert!(matches!(
            NeuralNet::from_layers(layers, Penalty::None, 0.001),
            Err(Error::ShapeMismatch(_))
        ));

        let layers = vec![(Array2::zeros((4, 2)), Array1::zeros(2))];
        assert!(NeuralNet::from_layers(layers, Penalty::None, 0.001).is_err());

        assert!(NeuralNet::from_layers(vec![], Penalty::None, 0.001).is_err());
    }

    #[test]
    fn test_predictions_are_probabilities() {
        let net = NeuralNet::from_layers(tiny_layers(3.0), Penalty::None, 0.001).unwrap();
        let (inputs, _) = tiny_batch();

        let predictions = net.predict(&inputs.view());
        assert_eq!(predictions.len(), 4);
        assert!(predictions.iter().all(|&p| p > 0.0 && p < 1.0));
    }

    #[test]
    fn test_saturated_logits_stay_inside_unit_interval() {
        let mut layers = tiny_layers(3.0);
        layers[2].0.fill(100.0);
        let positive = NeuralNet::from_layers(layers.clone(), Penalty::None, 0.001).unwrap();
        layers[2].0.fill(-100.0);
        let negative = NeuralNet::from_layers(layers, Penalty::None, 0.001).unwrap();
        let (inputs, _) = tiny_batch();

        // Rows with any active hidden unit push the logit far past where f32 saturates
        let high = positive.predict(&inputs.view());
        let low = negative.predict(&inputs.view());
        assert!(high.iter().any(|&p| p > 0.999));
        assert!(low.iter().any(|&p| p < 0.001));
        assert!(high.iter().chain(low.iter()).all(|&p| p > 0.0 && p < 1.0));
    }

    #[test]
    fn test_zero_net_predicts_one_half() {
        let net = NeuralNet::from_layers(tiny_layers(0.0), Penalty::None, 0.001).unwrap();
        let (inputs, targets) = tiny_batch();

        assert!(net.predict(&inputs.view()).iter().all(|&p| p == 0.5));
        let loss = net.objective(&inputs.view(), &targets.view());
        assert!((loss - std::f64::consts::LN_2).abs() < 1e-9);
    }

    #[test]
    fn test_penalty_raises_objective_for_nonzero_weights() {
        let (inputs, targets) = tiny_batch();
        let plain = NeuralNet::from_layers(tiny_layers(1.0), Penalty::None, 0.001).unwrap();
        let l2 = NeuralNet::from_layers(tiny_layers(1.0), Penalty::L2 { l2: 0.001 }, 0.001).unwrap();

        let plain_loss = plain.objective(&inputs.view(), &targets.view());
        let l2_loss = l2.objective(&inputs.view(), &targets.view());

        assert!(l2_loss > plain_loss);
        assert!((l2_loss - plain_loss - l2.penalty_value()).abs() < 1e-9);
    }

    #[test]
    fn test_penalty_ignores_output_layer() {
        let mut layers = tiny_layers(0.0);
        layers[2].0.fill(5.0);
        let net = NeuralNet::from_layers(layers, Penalty::L2 { l2: 0.001 }, 0.001).unwrap();

        assert_eq!(net.penalty_value(), 0.0);
    }

    #[test]
    fn test_training_reduces_objective() {
        let (inputs, targets) = tiny_batch();
        let mut net = NeuralNet::from_layers(tiny_layers(1.0), Penalty::None, 0.01).unwrap();

        let before = net.objective(&inputs.view(), &targets.view());
        for _ in 0..200 {
            net.train_on_batch(&inputs.view(), &targets.view());
        }
        let after = net.objective(&inputs.view(), &targets.view());

        assert!(after < before, "objective went from {before} to {after}");
    }

    #[test]
    fn test_l1_shrinks_weights() {
        let (inputs, targets) = tiny_batch();
        let mut plain = NeuralNet::from_layers(tiny_layers(1.0), Penalty::None, 0.01).unwrap();
        let mut l1 =
            NeuralNet::from_layers(tiny_layers(1.0), Penalty::L1L2 { l1: 0.1, l2: 0.0 }, 0.01)
                .unwrap();

        for _ in 0..100 {
            plain.train_on_batch(&inputs.view(), &targets.view());
            l1.train_on_batch(&inputs.view(), &targets.view());
        }

        let norm = |net: &NeuralNet| -> f32 { net.layers[0].0.iter().map(|w| w.abs()).sum() };
        assert!(norm(&l1) < norm(&plain));
    }

    #[test]
    fn test_batch_stats() {
        let net = NeuralNet::from_layers(tiny_layers(0.0), Penalty::None, 0.001).unwrap();
        let (inputs, targets) = tiny_batch();

        // Every logit is 0 so every prediction rounds to class 0
        let stats = net.evaluate_batch(&inputs.view(), &targets.view());
        assert_eq!(stats.size, 4);
        assert_eq!(stats.correct, 2);
    }

    #[test]
    fn test_cross_entropy_is_stable() {
        let logits = array![100.0f32, -100.0];
        let targets = array![1.0f32, 0.0];
        let loss = binary_cross_entropy(&logits.view(), &targets.view());
        assert!(loss.is_finite() && loss < 1e-9);

        let wrong = array![0.0f32, 1.0];
        let loss = binary_cross_entropy(&logits.view(), &wrong.view());
        assert!((loss - 100.0).abs() < 1e-6);
    }
}
