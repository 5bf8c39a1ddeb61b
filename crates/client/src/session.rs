use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use betwire_batch::{BatchLimits, Batcher};
use betwire_protocol::{Ack, Batch, Error, Record, Result, WireCodec};
use betwire_runtime::{
    CONNECT_RETRY_DELAY, CancelToken, DEFAULT_BACKOFF, DEFAULT_CONNECT_ATTEMPTS,
    DEFAULT_MAX_BATCH_AMOUNT, DEFAULT_MAX_BATCH_BYTES, DEFAULT_MAX_PAYLOAD,
    DEFAULT_SERVER_ADDRESS,
};
use log::debug;

use crate::events::{EventSink, SessionEvent};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub server_address: String,
    /// Agency id, sent with every winners request.
    pub agency: u8,
    pub limits: BatchLimits,
    /// Largest payload accepted by the codec in either direction.
    pub max_payload: usize,
    /// Delay between winners polls.
    pub backoff: Duration,
    /// Pause after each acknowledged batch.
    pub loop_period: Duration,
    pub connect_attempts: u32,
    pub connect_retry_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_address: DEFAULT_SERVER_ADDRESS.to_string(),
            agency: 0,
            limits: BatchLimits {
                max_count: DEFAULT_MAX_BATCH_AMOUNT,
                max_bytes: DEFAULT_MAX_BATCH_BYTES,
            },
            max_payload: DEFAULT_MAX_PAYLOAD,
            backoff: DEFAULT_BACKOFF,
            loop_period: Duration::ZERO,
            connect_attempts: DEFAULT_CONNECT_ATTEMPTS,
            connect_retry_delay: CONNECT_RETRY_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connected,
    Closed,
}

/// How a phase ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Completed(T),
    /// The cancel token tripped; the session is now `Closed`.
    Cancelled,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SendSummary {
    pub batches_sent: usize,
    pub batches_accepted: usize,
    pub batches_rejected: usize,
    pub records_sent: usize,
}

enum Link {
    Disconnected,
    Connected(WireCodec<TcpStream>),
    Closed,
}

enum SendStep {
    /// Build the next batch, seeded by the record that overflowed the last one.
    Fill(Option<Record>),
    Deliver {
        batch: Batch,
        carry: Option<Record>,
    },
    Finish,
}

enum PollStep {
    Connect,
    Request,
    Backoff,
}

/// One client session: a single connection at a time, driven through the
/// send-batches phase and then the winners polling phase.
pub struct Session {
    config: SessionConfig,
    batcher: Batcher,
    link: Link,
    events: Arc<dyn EventSink>,
    cancel: CancelToken,
}

impl Session {
    pub fn new(config: SessionConfig, events: Arc<dyn EventSink>, cancel: CancelToken) -> Self {
        let batcher = Batcher::new(config.limits);
        Self {
            config,
            batcher,
            link: Link::Disconnected,
            events,
            cancel,
        }
    }

    pub fn state(&self) -> ConnectionState {
        match self.link {
            Link::Disconnected => ConnectionState::Disconnected,
            Link::Connected(_) => ConnectionState::Connected,
            Link::Closed => ConnectionState::Closed,
        }
    }

    /// Dial the server once, replacing any previous connection.
    ///
    /// On failure the session is left `Disconnected`.
    pub fn connect(&mut self) -> Result<()> {
        self.close();
        self.link = Link::Disconnected;

        let stream = TcpStream::connect(&self.config.server_address)?;
        stream.set_nodelay(true)?;
        debug!("connected to {}", self.config.server_address);

        self.link = Link::Connected(WireCodec::new(stream, self.config.max_payload));
        self.emit(SessionEvent::Connected {
            address: self.config.server_address.clone(),
        });
        Ok(())
    }

    /// Startup dial with a bounded number of attempts.
    ///
    /// Returns the last dial error once the attempts are used up.
    pub fn connect_with_retries(&mut self) -> Result<Outcome<()>> {
        let attempts = self.config.connect_attempts.max(1);
        let mut attempt = 1;

        loop {
            if self.cancel.is_cancelled() {
                return Ok(self.cancelled());
            }

            match self.connect() {
                Ok(()) => return Ok(Outcome::Completed(())),
                Err(e) => {
                    self.emit(SessionEvent::ConnectFailed {
                        attempt,
                        error: e.to_string(),
                    });
                    if attempt >= attempts {
                        return Err(e);
                    }
                }
            }

            attempt += 1;
            self.cancel.sleep(self.config.connect_retry_delay);
        }
    }

    /// Release the connection. Does nothing unless connected.
    pub fn close(&mut self) {
        match std::mem::replace(&mut self.link, Link::Closed) {
            Link::Connected(codec) => {
                // The peer may already be gone; dropping the stream releases it either way.
                let _ = codec.get_ref().shutdown(Shutdown::Both);
                debug!("connection to {} closed", self.config.server_address);
            }
            other => self.link = other,
        }
    }

    /// Stream every record from `source` to the server, then send the
    /// finished sentinel.
    ///
    /// A rejected batch is reported and skipped over. Any error (transport,
    /// malformed input, oversized payload, protocol) closes the connection
    /// and is returned.
    pub fn send_batches<S>(&mut self, source: &mut S) -> Result<Outcome<SendSummary>>
    where
        S: Iterator<Item = Result<Record>>,
    {
        if !matches!(self.link, Link::Connected(_)) {
            return Err(Error::NotConnected);
        }

        let result = self.run_send_loop(source);
        if result.is_err() {
            self.close();
        }
        result
    }

    fn run_send_loop<S>(&mut self, source: &mut S) -> Result<Outcome<SendSummary>>
    where
        S: Iterator<Item = Result<Record>>,
    {
        let mut summary = SendSummary::default();
        let mut step = SendStep::Fill(None);

        loop {
            if self.cancel.is_cancelled() {
                return Ok(self.cancelled());
            }

            step = match step {
                SendStep::Fill(carry) => {
                    let (batch, carry) = self.batcher.next_batch(source, carry)?;
                    match (batch.is_empty(), carry) {
                        (true, None) => SendStep::Finish,
                        // The final record straddled a limit on its own.
                        (true, Some(last)) => SendStep::Deliver {
                            batch: Batch::singleton(last),
                            carry: None,
                        },
                        (false, carry) => SendStep::Deliver { batch, carry },
                    }
                }
                SendStep::Deliver { batch, carry } => {
                    let codec = self.codec()?;
                    codec.send_batch(&batch)?;
                    let ack = codec.recv_batch_ack()?;

                    let (records, bytes) = (batch.len(), batch.encoded_len());
                    summary.batches_sent += 1;
                    summary.records_sent += records;
                    match ack {
                        Ack::Ok => {
                            summary.batches_accepted += 1;
                            self.emit(SessionEvent::BatchAccepted { records, bytes });
                        }
                        Ack::Fail => {
                            summary.batches_rejected += 1;
                            self.emit(SessionEvent::BatchRejected { records, bytes });
                        }
                    }

                    if !self.config.loop_period.is_zero() {
                        self.cancel.sleep(self.config.loop_period);
                    }
                    SendStep::Fill(carry)
                }
                SendStep::Finish => {
                    // No ack follows the sentinel.
                    self.codec()?.send_finished()?;
                    self.emit(SessionEvent::BatchesFinished {
                        batches: summary.batches_sent,
                        records: summary.records_sent,
                    });
                    return Ok(Outcome::Completed(summary));
                }
            };
        }
    }

    /// Poll for the agency's winners until a non-empty list arrives.
    ///
    /// Empty lists, transport and protocol errors all lead to closing the
    /// connection, waiting `backoff` and reconnecting. Only cancellation
    /// stops the loop otherwise. On success the connection stays open.
    pub fn query_winners(&mut self) -> Outcome<Vec<String>> {
        // Numbers the current round, counting its dial.
        let mut attempt = 1u32;
        let mut step = if matches!(self.link, Link::Connected(_)) {
            PollStep::Request
        } else {
            PollStep::Connect
        };

        loop {
            if self.cancel.is_cancelled() {
                return self.cancelled();
            }

            step = match step {
                PollStep::Connect => match self.connect() {
                    Ok(()) => PollStep::Request,
                    Err(e) => {
                        self.emit(SessionEvent::PollFailed {
                            attempt,
                            error: e.to_string(),
                        });
                        PollStep::Backoff
                    }
                },
                PollStep::Request => match self.request_winners() {
                    Ok(winners) if !winners.is_empty() => {
                        self.emit(SessionEvent::Winners {
                            count: winners.len(),
                        });
                        return Outcome::Completed(winners);
                    }
                    Ok(_) => {
                        self.emit(SessionEvent::WinnersNotReady { attempt });
                        self.close();
                        PollStep::Backoff
                    }
                    Err(e) => {
                        self.emit(SessionEvent::PollFailed {
                            attempt,
                            error: e.to_string(),
                        });
                        self.close();
                        PollStep::Backoff
                    }
                },
                PollStep::Backoff => {
                    self.cancel.sleep(self.config.backoff);
                    attempt += 1;
                    PollStep::Connect
                }
            };
        }
    }

    fn request_winners(&mut self) -> Result<Vec<String>> {
        let agency = self.config.agency;
        let codec = self.codec()?;
        codec.send_winners_request(agency)?;
        codec.recv_result_set()
    }

    fn codec(&mut self) -> Result<&mut WireCodec<TcpStream>> {
        match &mut self.link {
            Link::Connected(codec) => Ok(codec),
            Link::Disconnected | Link::Closed => Err(Error::NotConnected),
        }
    }

    fn cancelled<T>(&mut self) -> Outcome<T> {
        self.close();
        self.link = Link::Closed;
        self.emit(SessionEvent::Cancelled);
        Outcome::Cancelled
    }

    fn emit(&self, event: SessionEvent) {
        self.events.emit(self.config.agency, &event);
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
