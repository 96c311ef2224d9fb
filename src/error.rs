/// Errors raised while preparing data, training a variant or writing reports.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A token index does not fit in the vocabulary dimension.
    #[error("token {token} in sequence {row} is out of range for dimension {dimension}")]
    TokenOutOfRange {
        row: usize,
        token: usize,
        dimension: usize,
    },

    /// A label is neither 0 nor 1.
    #[error("label {value} at index {index} is not a binary label")]
    InvalidLabel { index: usize, value: f64 },

    /// The validation cut lies outside the dataset.
    #[error("split index {k} is outside [0, {n}]")]
    SplitOutOfRange { k: usize, n: usize },

    /// Two arrays that must line up row-for-row do not.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The objective stopped being finite during training.
    #[error("variant '{variant}' diverged at epoch {epoch} (loss = {loss})")]
    Diverged {
        variant: String,
        epoch: usize,
        loss: f64,
    },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
