//! Turning raw reviews into dense arrays the classifier can consume.

pub mod labels;
pub mod multi_hot;
pub mod split;

pub use labels::normalize_labels;
pub use multi_hot::vectorize;
pub use split::{split, Slice, Split};
