pub mod classifier;
pub mod force;
pub mod payload;

pub use classifier::{classify, ClassifierOptions, DecodeMode, MissingValue};
