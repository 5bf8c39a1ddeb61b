use betwire_protocol::{Batch, Record, Result};
use log::debug;

/// Upper bounds on the growth of a single batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    /// Maximum number of records.
    pub max_count: usize,
    /// Maximum sum of the records' encoded lengths.
    pub max_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct Batcher {
    limits: BatchLimits,
}

impl Batcher {
    pub fn new(limits: BatchLimits) -> Self {
        Self { limits }
    }

    /// Pull records from `source` until the next one would overflow a limit.
    ///
    /// `carry` is the record that overflowed the previous batch; it seeds this
    /// one. Returns the batch and, if a limit stopped it, the record that did
    /// not fit. An exhausted source returns whatever was accumulated (possibly
    /// nothing) and no carry-over.
    ///
    /// Limits only apply once the batch holds a record, so a record larger
    /// than `max_bytes` on its own ends up alone in its batch.
    pub fn next_batch<S>(&self, source: &mut S, carry: Option<Record>) -> Result<(Batch, Option<Record>)>
    where
        S: Iterator<Item = Result<Record>>,
    {
        let mut batch = Batch::new();
        if let Some(record) = carry {
            batch.push(record);
        }

        for candidate in source.by_ref() {
            let candidate = candidate?;

            if !batch.is_empty() && !self.fits(&batch, &candidate) {
                debug!(
                    "batch closed at {} records / {} bytes",
                    batch.len(),
                    batch.encoded_len()
                );
                return Ok((batch, Some(candidate)));
            }

            batch.push(candidate);
        }

        Ok((batch, None))
    }

    fn fits(&self, batch: &Batch, candidate: &Record) -> bool {
        let would_be_count = batch.len() + 1;
        let would_be_bytes = batch.encoded_len() + candidate.encoded_len();
        would_be_count <= self.limits.max_count && would_be_bytes <= self.limits.max_bytes
    }
}

#[cfg(test)]
#[path = "batcher_tests.rs"]
mod tests;
