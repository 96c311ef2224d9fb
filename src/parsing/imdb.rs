use super::Dataset;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use std::{fs::File, io::Read};

/// Index written in place of words outside the kept vocabulary
pub const OOV_INDEX: usize = 2;
/// Indices 0, 1 and 2 are reserved for padding, sequence start and unknown words
pub const INDEX_OFFSET: usize = 3;

/// One review as stored on disk: `<label>,<idx0> <idx1> ...`
#[derive(Debug, Deserialize)]
struct Record {
    label: f64,
    tokens: String,
}

/// Parse a record of the form <x1><sep><x2><sep>...
/// Empty fields (e.g. repeated separators) are skipped
fn parse_line<T: FromStr>(s: &str, seperator: char) -> Option<Vec<T>> {
    let mut record = Vec::<T>::new();

    for x in s.split(seperator).filter(|x| !x.is_empty()) {
        match T::from_str(x) {
            Ok(val) => {
                record.push(val);
            }
            _ => return None,
        }
    }

    Some(record)
}

/// Keep only the `num_words` most frequent words, everything else becomes the OOV index
fn clip_vocabulary(sequence: Vec<usize>, num_words: usize) -> Vec<usize> {
    sequence
        .into_iter()
        .map(|idx| if idx < num_words { idx } else { OOV_INDEX })
        .collect()
}

/// Parse a CSV partition with a `label,tokens` header from any reader
pub fn parse_reader<R: Read>(reader: R, num_words: usize) -> Result<Dataset> {
    if num_words <= OOV_INDEX {
        return Err(Error::InvalidConfig(format!(
            "num_words must be greater than {OOV_INDEX}, got {num_words}"
        )));
    }

    let mut sequences = vec![];
    let mut labels = vec![];
    let mut csv_reader = csv::Reader::from_reader(reader);

    for (line, record) in csv_reader.deserialize::<Record>().enumerate() {
        let record = record?;
        let tokens = parse_line::<usize>(record.tokens.trim(), ' ').ok_or_else(|| {
            Error::Parse(format!("record {line}: malformed token list '{}'", record.tokens))
        })?;

        sequences.push(clip_vocabulary(tokens, num_words));
        labels.push(record.label);
    }

    Ok(Dataset { sequences, labels })
}

/// Load a partition of the review dataset
pub fn load_dataset(path: &Path, num_words: usize) -> Result<Dataset> {
    let dataset = parse_reader(File::open(path)?, num_words)?;
    tracing::info!(path = %path.display(), reviews = dataset.len(), "Loaded dataset partition");

    Ok(dataset)
}

/// Load the word -> index mapping, stored as a flat JSON object
pub fn load_word_index(path: &Path) -> Result<HashMap<String, usize>> {
    let mut contents = String::new();
    File::open(path)?.read_to_string(&mut contents)?;

    let parsed = json::parse(&contents)?;
    if !parsed.is_object() {
        return Err(Error::Parse("word index must be a JSON object".to_string()));
    }

    let mut word_index = HashMap::new();
    for (word, value) in parsed.entries() {
        let idx = value
            .as_usize()
            .ok_or_else(|| Error::Parse(format!("word '{word}' has a non-integer index")))?;
        word_index.insert(word.to_string(), idx);
    }

    Ok(word_index)
}

/// Reverse the mapping so that indices can be turned back into words
pub fn reverse_word_index(word_index: &HashMap<String, usize>) -> HashMap<usize, String> {
    word_index
        .iter()
        .map(|(word, idx)| (*idx, word.clone()))
        .collect()
}

/// Decode a review back into text. Reserved and unknown indices decode as '?'
pub fn decode_review(sequence: &[usize], reversed: &HashMap<usize, String>) -> String {
    sequence
        .iter()
        .map(|idx| {
            idx.checked_sub(INDEX_OFFSET)
                .and_then(|word| reversed.get(&word))
                .map_or("?", String::as_str)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Log a quick look at the loaded data
pub fn explore(
    train: &Dataset,
    test: Option<&Dataset>,
    word_index: Option<&HashMap<String, usize>>,
) {
    tracing::info!(reviews = train.len(), labels = train.labels.len(), "Training partition");
    if let Some(test) = test {
        tracing::info!(reviews = test.len(), labels = test.labels.len(), "Test partition");
    }

    if train.is_empty() {
        tracing::warn!("Training partition is empty");
        return;
    }
    let (Some(first), Some(label)) = (train.sequences.first(), train.labels.first()) else {
        return;
    };
    tracing::info!(label, "First review: {:?}", first);

    if let Some(max_token) = train.max_token() {
        tracing::info!(max_token, "Largest word index");
    }

    if let Some(word_index) = word_index {
        let reversed = reverse_word_index(word_index);
        tracing::info!("Decoded first review: {}", decode_review(first, &reversed));
    }
}
