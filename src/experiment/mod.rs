//! Training every model variant against the same split and collecting
//! its per-epoch learning curves.

pub mod config;

use ndarray::Axis;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{Error, Result};
use crate::model::variant::ModelVariant;
use crate::model::{BatchStats, Model};
use crate::preprocessing::{Slice, Split};
pub use config::ExperimentConfig;

/// Per-epoch curves of one training run, all of length `epochs`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrainingRun {
    pub loss: Vec<f64>,
    pub val_loss: Vec<f64>,
    pub acc: Vec<f64>,
    pub val_acc: Vec<f64>,
}

impl TrainingRun {
    pub fn epochs(&self) -> usize {
        self.loss.len()
    }
}

/// Loss and accuracy of a trained model on a held-out partition
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Evaluation {
    pub loss: f64,
    pub accuracy: f64,
}

/// Everything produced for one variant
#[derive(Clone, Debug)]
pub struct VariantRun {
    pub variant: ModelVariant,
    pub history: TrainingRun,
    pub test: Option<Evaluation>,
}

/// Running example-weighted averages over batches
#[derive(Debug, Default)]
struct Accumulator {
    loss: f64,
    correct: usize,
    total: usize,
}

impl Accumulator {
    fn update(&mut self, stats: BatchStats) {
        self.loss += stats.loss * stats.size as f64;
        self.correct += stats.correct;
        self.total += stats.size;
    }

    fn finish(&self) -> Evaluation {
        if self.total == 0 {
            return Evaluation {
                loss: 0.0,
                accuracy: 0.0,
            };
        }

        Evaluation {
            loss: self.loss / self.total as f64,
            accuracy: self.correct as f64 / self.total as f64,
        }
    }
}

/// Loss and accuracy of `model` on a whole slice, computed in chunks of `batch_size` rows
pub fn evaluate<M: Model>(model: &M, data: &Slice, batch_size: usize) -> Evaluation {
    let mut acc = Accumulator::default();

    for (inputs, targets) in data
        .features
        .axis_chunks_iter(Axis(0), batch_size)
        .zip(data.labels.axis_chunks_iter(Axis(0), batch_size))
    {
        acc.update(model.evaluate_batch(&inputs, &targets));
    }

    acc.finish()
}

fn check_finite(name: &str, epoch: usize, values: &[f64]) -> Result<()> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(&loss) => Err(Error::Diverged {
            variant: name.to_string(),
            epoch,
            loss,
        }),
        None => Ok(()),
    }
}

/// Train `model` for `config.epochs` passes over `training`, updating once per batch.
/// After every epoch the model is measured on `validation`.
///
/// Training metrics are averaged over the epoch's batches, each measured just before
/// its update.
pub fn run<M: Model, R: Rng + ?Sized>(
    name: &str,
    model: &mut M,
    training: &Slice,
    validation: &Slice,
    config: &ExperimentConfig,
    rng: &mut R,
) -> Result<TrainingRun> {
    config.validate()?;
    if training.is_empty() {
        return Err(Error::InvalidConfig("training slice is empty".to_string()));
    }
    if validation.is_empty() {
        return Err(Error::InvalidConfig("validation slice is empty".to_string()));
    }
    if training.features.ncols() != validation.features.ncols() {
        return Err(Error::ShapeMismatch(format!(
            "training rows have {} features but validation rows have {}",
            training.features.ncols(),
            validation.features.ncols()
        )));
    }
    if training.features.ncols() != model.input_dim() {
        return Err(Error::ShapeMismatch(format!(
            "rows have {} features but the model expects {}",
            training.features.ncols(),
            model.input_dim()
        )));
    }

    let mut history = TrainingRun::default();
    let mut order: Vec<usize> = (0..training.len()).collect();

    for epoch in 1..=config.epochs {
        let mut acc = Accumulator::default();

        if config.shuffle {
            order.shuffle(rng);
            for chunk in order.chunks(config.batch_size) {
                let inputs = training.features.select(Axis(0), chunk);
                let targets = training.labels.select(Axis(0), chunk);
                acc.update(model.train_on_batch(&inputs.view(), &targets.view()));
            }
        } else {
            // Get a batch of instances and their targets
            for (inputs, targets) in training
                .features
                .axis_chunks_iter(Axis(0), config.batch_size)
                .zip(training.labels.axis_chunks_iter(Axis(0), config.batch_size))
            {
                acc.update(model.train_on_batch(&inputs, &targets));
            }
        }

        let train = acc.finish();
        let val = evaluate(model, validation, config.batch_size);
        check_finite(name, epoch, &[train.loss, val.loss])?;

        tracing::info!(
            variant = name,
            epoch,
            loss = format!("{:.4}", train.loss),
            acc = format!("{:.4}", train.accuracy),
            val_loss = format!("{:.4}", val.loss),
            val_acc = format!("{:.4}", val.accuracy),
            "Epoch complete"
        );

        history.loss.push(train.loss);
        history.acc.push(train.accuracy);
        history.val_loss.push(val.loss);
        history.val_acc.push(val.accuracy);
    }

    Ok(history)
}

/// Build and train every variant in turn on the same split. A failing variant
/// aborts the whole comparison.
pub fn run_all<R: Rng + ?Sized>(
    variants: &[ModelVariant],
    split: &Split,
    test: Option<&Slice>,
    config: &ExperimentConfig,
    rng: &mut R,
) -> Result<Vec<VariantRun>> {
    let input_dim = split.training.features.ncols();
    let mut runs = Vec::with_capacity(variants.len());

    for variant in variants {
        tracing::info!(variant = %variant.name, penalty = ?variant.penalty, "Training variant");

        let mut model = variant.build(input_dim, config.initialization, config.learning_rate, rng);
        let history = run(
            &variant.name,
            &mut model,
            &split.training,
            &split.validation,
            config,
            rng,
        )?;

        let test = test.map(|data| evaluate(&model, data, config.batch_size));
        if let Some(result) = test {
            tracing::info!(
                variant = %variant.name,
                loss = format!("{:.4}", result.loss),
                acc = format!("{:.4}", result.accuracy),
                "Test set"
            );
        }

        runs.push(VariantRun {
            variant: variant.clone(),
            history,
            test,
        });
    }

    Ok(runs)
}
