use std::io::{Read, Write};

use log::trace;

use crate::{
    Ack, Batch, Error, FIELD_DELIMITER, LENGTH_PREFIX_SIZE, MAX_FRAME_PAYLOAD, Opcode,
    RECORD_TERMINATOR, Record, Request, Result,
};

/// Build a complete `BATCH` frame for `batch`.
///
/// Wire format:
///   - 1-byte opcode (`BATCH`)
///   - 2-byte big-endian payload length (u16)
///   - payload: each record as `f1|f2|f3|f4|f5|f6\n`
///
/// Fails with `PayloadTooLarge` when the payload exceeds `max_payload`
/// (itself capped at what the length prefix can carry). An empty batch is
/// rejected: its frame would be the finished sentinel.
pub fn encode_batch(batch: &Batch, max_payload: usize) -> Result<Vec<u8>> {
    if batch.is_empty() {
        return Err(Error::violation(
            "refusing to encode an empty batch, use the finished sentinel",
        ));
    }
    let max = max_payload.min(MAX_FRAME_PAYLOAD);

    let mut payload = Vec::with_capacity(batch.encoded_len());
    for record in batch {
        record.encode_into(&mut payload);
    }

    if payload.len() > max {
        return Err(Error::PayloadTooLarge {
            size: payload.len(),
            max,
        });
    }

    Ok(frame_with_payload(Opcode::Batch, &payload))
}

/// `BATCH` frame with a zero length prefix: the end-of-stream sentinel.
pub fn encode_finished() -> [u8; 3] {
    [Opcode::Batch.into(), 0, 0]
}

/// Fixed-size results request: opcode followed by the 1-byte agency id.
pub fn encode_winners_request(agency: u8) -> [u8; 2] {
    [Opcode::WinnersRequest.into(), agency]
}

fn frame_with_payload(op: Opcode, payload: &[u8]) -> Vec<u8> {
    // Callers have already bounded the payload by MAX_FRAME_PAYLOAD.
    let len = payload.len() as u16;

    let mut frame = Vec::with_capacity(1 + LENGTH_PREFIX_SIZE + payload.len());
    frame.push(op.into());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Write a whole frame to `writer`.
///
/// `write_all` keeps writing after short writes, so either the full frame
/// reaches the stream or an error is returned.
pub fn send_frame<W: Write>(writer: &mut W, bytes: &[u8]) -> Result<()> {
    writer.write_all(bytes)?;
    writer.flush()?;
    trace!("sent frame of {} bytes", bytes.len());
    Ok(())
}

/// Read exactly one opcode byte.
pub fn recv_opcode<R: Read>(reader: &mut R) -> Result<Opcode> {
    let mut op = [0u8; 1];
    reader.read_exact(&mut op)?;
    Opcode::try_from(op[0])
}

/// Read a 2-byte big-endian length followed by that many payload bytes.
pub fn recv_length_prefixed_payload<R: Read>(reader: &mut R, max_payload: usize) -> Result<Vec<u8>> {
    let mut len_buf = [0u8; LENGTH_PREFIX_SIZE];
    reader.read_exact(&mut len_buf)?;
    let len = u16::from_be_bytes(len_buf) as usize;

    if len > max_payload {
        return Err(Error::violation(format!(
            "declared payload of {len} bytes exceeds the maximum of {max_payload} bytes"
        )));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Wait for the server's verdict on the last batch.
pub fn recv_batch_ack<R: Read>(reader: &mut R) -> Result<Ack> {
    match recv_opcode(reader)? {
        Opcode::BatchOk => Ok(Ack::Ok),
        Opcode::BatchFail => Ok(Ack::Fail),
        op @ (Opcode::Batch | Opcode::WinnersRequest | Opcode::SendWinners) => Err(
            Error::violation(format!("expected a batch ack, got {op:?}")),
        ),
    }
}

/// Wait for a `SEND_WINNERS` frame and decode its identifiers.
pub fn recv_result_set<R: Read>(reader: &mut R, max_payload: usize) -> Result<Vec<String>> {
    match recv_opcode(reader)? {
        Opcode::SendWinners => {
            let payload = recv_length_prefixed_payload(reader, max_payload)?;
            decode_result_set(&payload)
        }
        op @ (Opcode::Batch | Opcode::WinnersRequest | Opcode::BatchOk | Opcode::BatchFail) => {
            Err(Error::violation(format!("expected winners, got {op:?}")))
        }
    }
}

/// Split a `|`-delimited winners payload.
///
/// An empty payload means "not ready yet" and decodes to an empty list,
/// never to a single empty identifier.
pub fn decode_result_set(payload: &[u8]) -> Result<Vec<String>> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| Error::violation(format!("winners payload is not UTF-8: {e}")))?;
    let text = text.trim_end_matches(RECORD_TERMINATOR);

    if text.is_empty() {
        return Ok(Vec::new());
    }

    Ok(text.split(FIELD_DELIMITER).map(str::to_owned).collect())
}

/// Parse a batch payload back into records.
pub fn decode_batch_payload(payload: &[u8]) -> Result<Batch> {
    let text = std::str::from_utf8(payload)
        .map_err(|e| Error::violation(format!("batch payload is not UTF-8: {e}")))?;

    let Some(body) = text.strip_suffix(RECORD_TERMINATOR) else {
        return Err(Error::violation("batch payload does not end with a newline"));
    };

    body.split(RECORD_TERMINATOR)
        .enumerate()
        .map(|(i, line)| Record::decode_line(line, i + 1))
        .collect()
}

/// Server side: read the next client frame.
pub fn read_request<R: Read>(reader: &mut R, max_payload: usize) -> Result<Request> {
    match recv_opcode(reader)? {
        Opcode::Batch => {
            let payload = recv_length_prefixed_payload(reader, max_payload)?;
            if payload.is_empty() {
                Ok(Request::Finished)
            } else {
                decode_batch_payload(&payload).map(Request::Batch)
            }
        }
        Opcode::WinnersRequest => {
            let mut id = [0u8; 1];
            reader.read_exact(&mut id)?;
            Ok(Request::WinnersRequest(id[0]))
        }
        op @ (Opcode::BatchOk | Opcode::BatchFail | Opcode::SendWinners) => Err(
            Error::violation(format!("{op:?} is not a client request")),
        ),
    }
}

/// Server side: acknowledge a batch.
pub fn write_batch_ack<W: Write>(writer: &mut W, ack: Ack) -> Result<()> {
    let op = match ack {
        Ack::Ok => Opcode::BatchOk,
        Ack::Fail => Opcode::BatchFail,
    };
    send_frame(writer, &[op.into()])
}

/// Server side: send the winners list (possibly empty, meaning not ready).
///
/// Identifiers must be non-empty and free of `|` and `\n`, otherwise the
/// client would decode a different list.
pub fn write_result_set<W: Write, S: AsRef<str>>(
    writer: &mut W,
    winners: &[S],
    max_payload: usize,
) -> Result<()> {
    if let Some(bad) = winners
        .iter()
        .map(AsRef::as_ref)
        .find(|id| id.is_empty() || id.contains([FIELD_DELIMITER, RECORD_TERMINATOR]))
    {
        return Err(Error::violation(format!(
            "winner id {bad:?} cannot be sent in a result set"
        )));
    }

    let max = max_payload.min(MAX_FRAME_PAYLOAD);
    let delimiter = FIELD_DELIMITER.to_string();
    let payload = winners
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join(delimiter.as_str());

    if payload.len() > max {
        return Err(Error::PayloadTooLarge {
            size: payload.len(),
            max,
        });
    }

    send_frame(writer, &frame_with_payload(Opcode::SendWinners, payload.as_bytes()))
}

/// Client half of the protocol bound to one connection.
pub struct WireCodec<S> {
    stream: S,
    max_payload: usize,
}

impl<S: Read + Write> WireCodec<S> {
    pub fn new(stream: S, max_payload: usize) -> Self {
        Self {
            stream,
            max_payload: max_payload.min(MAX_FRAME_PAYLOAD),
        }
    }

    pub fn send_batch(&mut self, batch: &Batch) -> Result<()> {
        let frame = encode_batch(batch, self.max_payload)?;
        send_frame(&mut self.stream, &frame)
    }

    pub fn send_finished(&mut self) -> Result<()> {
        send_frame(&mut self.stream, &encode_finished())
    }

    pub fn send_winners_request(&mut self, agency: u8) -> Result<()> {
        send_frame(&mut self.stream, &encode_winners_request(agency))
    }

    pub fn recv_batch_ack(&mut self) -> Result<Ack> {
        recv_batch_ack(&mut self.stream)
    }

    pub fn recv_result_set(&mut self) -> Result<Vec<String>> {
        recv_result_set(&mut self.stream, self.max_payload)
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
