use std::{fs::File, io::Read, path::Path};

use betwire_protocol::{Error, Record, Result};
use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use log::debug;

/// Fields per input line; the agency id completes the record.
pub const INPUT_FIELD_COUNT: usize = 5;

/// Turns one CSV row into a [`Record`] owned by `agency`.
#[derive(Debug, Clone)]
pub struct RecordParser {
    agency: String,
}

impl RecordParser {
    pub fn new(agency: impl Into<String>) -> Self {
        Self {
            agency: agency.into(),
        }
    }

    /// Returns `Ok(None)` for blank rows.
    pub fn parse(&self, row: &StringRecord, line_no: usize) -> Result<Option<Record>> {
        if row.len() == 1 && row[0].trim().is_empty() {
            return Ok(None);
        }

        let Some([first_name, last_name, document, birthdate, number]) = fields(row) else {
            return Err(Error::malformed(
                line_no,
                format!(
                    "expected {INPUT_FIELD_COUNT} comma-separated fields, got {}",
                    row.len()
                ),
            ));
        };

        Record::from_fields(
            [
                self.agency.as_str(),
                first_name,
                last_name,
                document,
                birthdate,
                number,
            ],
            line_no,
        )
        .map(Some)
    }
}

fn fields(row: &StringRecord) -> Option<[&str; INPUT_FIELD_COUNT]> {
    let parts: Vec<&str> = row.iter().collect();
    parts.as_slice().try_into().ok()
}

/// Lazy record stream over a CSV reader.
///
/// Quoted fields follow the usual CSV rules and `\r\n` endings are accepted.
/// Yields records in input order; the first malformed row or read error is
/// returned as an `Err` item, tagged with its 1-based line number.
pub struct RecordSource<R> {
    rows: StringRecordsIntoIter<R>,
    parser: RecordParser,
    last_line: usize,
}

impl RecordSource<File> {
    pub fn open(path: &Path, parser: RecordParser) -> Result<Self> {
        let file = File::open(path)?;
        debug!("reading records from {}", path.display());
        Ok(Self::from_reader(file, parser))
    }
}

impl<R: Read> RecordSource<R> {
    pub fn from_reader(reader: R, parser: RecordParser) -> Self {
        // Field counts are checked per row so the error carries a line number.
        let rows = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader)
            .into_records();

        Self {
            rows,
            parser,
            last_line: 0,
        }
    }

    fn convert(&self, err: csv::Error) -> Error {
        let line = err
            .position()
            .map_or(self.last_line + 1, |p| p.line() as usize);
        let reason = err.to_string();

        match err.into_kind() {
            csv::ErrorKind::Io(e) => Error::Io(e),
            _ => Error::malformed(line, reason),
        }
    }
}

impl<R: Read> Iterator for RecordSource<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let row = match self.rows.next()? {
                Ok(row) => row,
                Err(e) => return Some(Err(self.convert(e))),
            };
            if let Some(pos) = row.position() {
                self.last_line = pos.line() as usize;
            }

            match self.parser.parse(&row, self.last_line) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
