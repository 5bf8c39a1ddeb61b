use crate::error::{Error, Result};

pub const FIELD_DELIMITER: char = '|';
pub const RECORD_TERMINATOR: char = '\n';
pub const FIELD_COUNT: usize = 6;

/// A single bet, in wire field order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Owner (agency) identifier
    pub agency: String,
    pub first_name: String,
    pub last_name: String,
    /// Document id of the bettor
    pub document: String,
    pub birthdate: String,
    /// Selected number
    pub number: String,
}

impl Record {
    /// Build a record from its six fields, rejecting values that would
    /// break the wire framing. `line` is only used for error reporting.
    pub fn from_fields<S: Into<String>>(fields: [S; FIELD_COUNT], line: usize) -> Result<Self> {
        let [agency, first_name, last_name, document, birthdate, number] = fields.map(Into::into);
        let record = Self {
            agency,
            first_name,
            last_name,
            document,
            birthdate,
            number,
        };

        if let Some(bad) = record
            .fields()
            .iter()
            .find(|f| f.contains([FIELD_DELIMITER, RECORD_TERMINATOR]))
        {
            return Err(Error::malformed(
                line,
                format!("field {bad:?} contains a reserved delimiter"),
            ));
        }

        Ok(record)
    }

    pub fn fields(&self) -> [&str; FIELD_COUNT] {
        [
            &self.agency,
            &self.first_name,
            &self.last_name,
            &self.document,
            &self.birthdate,
            &self.number,
        ]
    }

    /// Number of bytes this record occupies inside a batch payload.
    pub fn encoded_len(&self) -> usize {
        let delimiters = FIELD_COUNT - 1;
        self.fields().iter().map(|f| f.len()).sum::<usize>() + delimiters + 1
    }

    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        for (i, field) in self.fields().iter().enumerate() {
            if i > 0 {
                buf.push(FIELD_DELIMITER as u8);
            }
            buf.extend_from_slice(field.as_bytes());
        }
        buf.push(RECORD_TERMINATOR as u8);
    }

    /// Parse one `f1|f2|f3|f4|f5|f6` line (without its terminator).
    pub fn decode_line(line: &str, line_no: usize) -> Result<Self> {
        let parts: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        let fields: [&str; FIELD_COUNT] = parts.as_slice().try_into().map_err(|_| {
            Error::malformed(
                line_no,
                format!("expected {} fields, got {}", FIELD_COUNT, parts.len()),
            )
        })?;
        Self::from_fields(fields, line_no)
    }
}

/// Ordered group of records sent as one payload.
///
/// Tracks its encoded size as records are pushed so the batcher never has
/// to re-serialize to check a limit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    records: Vec<Record>,
    encoded_len: usize,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn singleton(record: Record) -> Self {
        let mut batch = Self::new();
        batch.push(record);
        batch
    }

    pub fn push(&mut self, record: Record) {
        self.encoded_len += record.encoded_len();
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of the encoded length of every record.
    pub fn encoded_len(&self) -> usize {
        self.encoded_len
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

impl FromIterator<Record> for Batch {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        let mut batch = Batch::new();
        for record in iter {
            batch.push(record);
        }
        batch
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
