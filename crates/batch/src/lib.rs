mod batcher;
mod source;

pub use batcher::{BatchLimits, Batcher};
pub use source::{INPUT_FIELD_COUNT, RecordParser, RecordSource};
