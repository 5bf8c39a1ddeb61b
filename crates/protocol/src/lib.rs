pub mod codec;
mod error;
mod record;

pub use codec::WireCodec;
pub use error::{Error, Result};
pub use record::{Batch, FIELD_COUNT, FIELD_DELIMITER, RECORD_TERMINATOR, Record};

/// Size of the big-endian length prefix that precedes every payload.
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Largest payload a 2-byte length prefix can describe.
pub const MAX_FRAME_PAYLOAD: usize = u16::MAX as usize;

/// Every opcode understood on the wire, in either direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Client → server: a batch of records, or the finished sentinel when empty.
    Batch = 1,
    /// Client → server: ask for the winners of an agency.
    WinnersRequest = 2,
    /// Server → client: batch stored.
    BatchOk = 3,
    /// Server → client: batch rejected.
    BatchFail = 4,
    /// Server → client: length-prefixed winners list.
    SendWinners = 5,
}

impl TryFrom<u8> for Opcode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Opcode::Batch),
            2 => Ok(Opcode::WinnersRequest),
            3 => Ok(Opcode::BatchOk),
            4 => Ok(Opcode::BatchFail),
            5 => Ok(Opcode::SendWinners),
            other => Err(Error::violation(format!("unknown opcode {other}"))),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(op: Opcode) -> Self {
        op as u8
    }
}

/// Server verdict on one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    Ok,
    Fail,
}

/// A decoded client → server frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Batch(Batch),
    /// Zero-length `BATCH` frame: no more records follow.
    Finished,
    WinnersRequest(u8),
}
