pub mod error;
pub mod keys;
pub mod labeling;
pub mod merge;
