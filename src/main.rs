pub mod error;
pub mod experiment;
pub mod model;
pub mod parsing;
pub mod preprocessing;
pub mod report;

use std::path::PathBuf;

use clap::Parser;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

use experiment::ExperimentConfig;
use model::neural_net::InitMethod;
use model::variant::standard_variants;
use parsing::{imdb, Dataset};
use preprocessing::{normalize_labels, split, vectorize, Slice};

/// Compare an unregularized, an L2 and an L1+L2 sentiment classifier on IMDB reviews
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// The path of the training reviews (CSV with a `label,tokens` header)
    #[arg(short, long)]
    train_path: PathBuf,

    /// The path of the test reviews, evaluated after training when given
    #[arg(long, default_value = None)]
    test_path: Option<PathBuf>,

    /// JSON word -> index mapping, used to decode reviews with --explore
    #[arg(short, long, default_value = None)]
    word_index_path: Option<PathBuf>,

    /// TOML experiment config. Flags below override its values
    #[arg(short, long, default_value = None)]
    config: Option<PathBuf>,

    /// Vocabulary size (width of the multi-hot vectors)
    #[arg(long)]
    num_words: Option<usize>,

    /// Number of leading training reviews held out for validation
    #[arg(short, long)]
    validation_size: Option<usize>,

    /// Number of epochs to train every variant for
    #[arg(short, long)]
    num_epochs: Option<usize>,

    /// Batch size of the network
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Learning rate of the RMSprop optimizer
    #[arg(short, long)]
    learning_rate: Option<f32>,

    /// Weight initialization method
    #[arg(short, long)]
    initialization: Option<InitMethod>,

    /// Seed for weight initialization and shuffling
    #[arg(short, long)]
    seed: Option<u64>,

    /// Shuffle the training rows before every epoch
    #[arg(long)]
    shuffle: bool,

    /// Log a quick look at the dataset before training
    #[arg(short, long)]
    explore: bool,

    /// Where to write the curves as CSV
    #[arg(long, default_value = None)]
    csv_path: Option<PathBuf>,

    /// Where to write the curves as JSON
    #[arg(short, long, default_value = None)]
    json_path: Option<PathBuf>,
}

/// Merge the config file (if any) with the command line. Flags win
fn build_config(args: &Args) -> anyhow::Result<ExperimentConfig> {
    let mut config = match &args.config {
        Some(path) => ExperimentConfig::load(path)?,
        None => ExperimentConfig::default(),
    };

    if let Some(n) = args.num_words {
        config.num_words = n;
    }
    if let Some(n) = args.validation_size {
        config.validation_size = n;
    }
    if let Some(n) = args.num_epochs {
        config.epochs = n;
    }
    if let Some(n) = args.batch_size {
        config.batch_size = n;
    }
    if let Some(lr) = args.learning_rate {
        config.learning_rate = lr;
    }
    if let Some(init) = args.initialization {
        config.initialization = init;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if args.shuffle {
        config.shuffle = true;
    }

    config.validate()?;
    Ok(config)
}

/// Vectorize the reviews and normalize their labels
fn prepare(dataset: &Dataset, num_words: usize) -> anyhow::Result<(Array2<f32>, Array1<f32>)> {
    let features = vectorize(&dataset.sequences, num_words)?;
    let labels = normalize_labels(&dataset.labels)?;
    tracing::info!(shape = ?features.dim(), "Vectorized reviews");

    Ok((features, labels))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;

    let train = imdb::load_dataset(&args.train_path, config.num_words)?;
    let test = match &args.test_path {
        Some(path) => Some(imdb::load_dataset(path, config.num_words)?),
        None => None,
    };

    if args.explore {
        let word_index = match &args.word_index_path {
            Some(path) => Some(imdb::load_word_index(path)?),
            None => None,
        };
        imdb::explore(&train, test.as_ref(), word_index.as_ref());
    }

    let (x_train, y_train) = prepare(&train, config.num_words)?;
    let test_data = match &test {
        Some(test) => Some(prepare(test, config.num_words)?),
        None => None,
    };
    let test_slice = match &test_data {
        Some((x_test, y_test)) => Some(Slice::new(x_test.view(), y_test.view())?),
        None => None,
    };

    let split = split(x_train.view(), y_train.view(), config.validation_size)?;
    tracing::info!(
        validation = split.validation.len(),
        training = split.training.len(),
        "Split training reviews"
    );

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let variants = standard_variants(config.l1, config.l2);
    let runs = experiment::run_all(&variants, &split, test_slice.as_ref(), &config, &mut rng)?;

    report::log_comparison(&runs);

    if let Some(path) = &args.csv_path {
        report::write_curves_csv(path, &runs)?;
    }

    if let Some(path) = &args.json_path {
        report::write_curves_json(path, &runs)?;
    }

    Ok(())
}
