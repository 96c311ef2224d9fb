//! Writing the learning curves out for plotting, and a textual comparison in the log.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use json::{object, JsonValue};
use serde::Serialize;

use crate::error::Result;
use crate::experiment::{TrainingRun, VariantRun};

/// The four curves recorded for every variant
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Metric {
    Loss,
    ValLoss,
    Acc,
    ValAcc,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Loss, Metric::ValLoss, Metric::Acc, Metric::ValAcc];

    pub fn key(self) -> &'static str {
        match self {
            Metric::Loss => "loss",
            Metric::ValLoss => "val_loss",
            Metric::Acc => "acc",
            Metric::ValAcc => "val_acc",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Metric::Loss => "Training Loss",
            Metric::ValLoss => "Validation Loss",
            Metric::Acc => "Training Accuracy",
            Metric::ValAcc => "Validation Accuracy",
        }
    }

    pub fn values(self, history: &TrainingRun) -> &[f64] {
        match self {
            Metric::Loss => &history.loss,
            Metric::ValLoss => &history.val_loss,
            Metric::Acc => &history.acc,
            Metric::ValAcc => &history.val_acc,
        }
    }
}

/// One line of the curves CSV
#[derive(Debug, Serialize)]
struct CurveRecord<'a> {
    variant: &'a str,
    epoch: usize,
    loss: f64,
    val_loss: f64,
    acc: f64,
    val_acc: f64,
}

/// Write every variant's curves as `variant,epoch,loss,val_loss,acc,val_acc` rows,
/// epochs numbered from 1
pub fn write_curves_csv(path: &Path, runs: &[VariantRun]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;

    for run in runs {
        let h = &run.history;
        for idx in 0..h.epochs() {
            writer.serialize(CurveRecord {
                variant: &run.variant.name,
                epoch: idx + 1,
                loss: h.loss[idx],
                val_loss: h.val_loss[idx],
                acc: h.acc[idx],
                val_acc: h.val_acc[idx],
            })?;
        }
    }

    writer.flush()?;
    tracing::info!(path = %path.display(), "Wrote learning curves");

    Ok(())
}

/// JSON document keyed by variant name. Each entry holds the label, the four
/// curves and, when available, the test-set results
pub fn curves_json(runs: &[VariantRun]) -> JsonValue {
    let mut data = object! {};

    for run in runs {
        let mut entry = object! {};
        entry["label"] = run.variant.label.as_str().into();
        for metric in Metric::ALL {
            entry[metric.key()] = metric.values(&run.history).to_vec().into();
        }
        if let Some(test) = run.test {
            entry["test_loss"] = test.loss.into();
            entry["test_acc"] = test.accuracy.into();
        }

        data[run.variant.name.as_str()] = entry;
    }

    data
}

pub fn write_curves_json(path: &Path, runs: &[VariantRun]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(curves_json(runs).pretty(2).as_bytes())?;
    tracing::info!(path = %path.display(), "Wrote learning curves");

    Ok(())
}

/// One row per epoch, one column per variant
pub fn comparison_table(metric: Metric, runs: &[VariantRun]) -> String {
    let mut table = format!("{:>5}", "epoch");
    for run in runs {
        table.push_str(&format!(" {:>22}", run.variant.label));
    }
    table.push('\n');

    let epochs = runs.iter().map(|r| r.history.epochs()).max().unwrap_or(0);
    for idx in 0..epochs {
        table.push_str(&format!("{:>5}", idx + 1));
        for run in runs {
            match metric.values(&run.history).get(idx) {
                Some(value) => table.push_str(&format!(" {:>22.4}", value)),
                None => table.push_str(&format!(" {:>22}", "-")),
            }
        }
        table.push('\n');
    }

    table
}

/// Log a comparison table for each metric
pub fn log_comparison(runs: &[VariantRun]) {
    for metric in Metric::ALL {
        tracing::info!("{}\n{}", metric.title(), comparison_table(metric, runs));
    }
}
