use log::{error, info, warn};

/// Something worth reporting that happened inside a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Connected { address: String },
    ConnectFailed { attempt: u32, error: String },
    BatchAccepted { records: usize, bytes: usize },
    /// The server refused a batch. Not an error for the session.
    BatchRejected { records: usize, bytes: usize },
    BatchesFinished { batches: usize, records: usize },
    WinnersNotReady { attempt: u32 },
    PollFailed { attempt: u32, error: String },
    Winners { count: usize },
    Cancelled,
}

/// Destination for session diagnostics, injected into each session.
pub trait EventSink {
    fn emit(&self, agency: u8, event: &SessionEvent);
}

/// Writes events through the `log` facade as `action: .. | result: ..` lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, agency: u8, event: &SessionEvent) {
        match event {
            SessionEvent::Connected { address } => {
                info!("action: connect | result: success | client_id: {agency} | address: {address}")
            }
            SessionEvent::ConnectFailed { attempt, error } => warn!(
                "action: connect | result: fail | client_id: {agency} | attempt: {attempt} | error: {error}"
            ),
            SessionEvent::BatchAccepted { records, bytes } => info!(
                "action: send_batch | result: success | client_id: {agency} | records: {records} | bytes: {bytes}"
            ),
            SessionEvent::BatchRejected { records, bytes } => error!(
                "action: send_batch | result: fail | client_id: {agency} | records: {records} | bytes: {bytes}"
            ),
            SessionEvent::BatchesFinished { batches, records } => info!(
                "action: finish_batches | result: success | client_id: {agency} | batches: {batches} | records: {records}"
            ),
            SessionEvent::WinnersNotReady { attempt } => info!(
                "action: query_winners | result: in_progress | client_id: {agency} | attempt: {attempt}"
            ),
            SessionEvent::PollFailed { attempt, error } => warn!(
                "action: query_winners | result: fail | client_id: {agency} | attempt: {attempt} | error: {error}"
            ),
            SessionEvent::Winners { count } => info!(
                "action: query_winners | result: success | client_id: {agency} | winners: {count}"
            ),
            SessionEvent::Cancelled => {
                info!("action: shutdown | result: success | client_id: {agency}")
            }
        }
    }
}
