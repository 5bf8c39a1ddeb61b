pub mod config;
pub mod events;
pub mod session;

pub use config::{Cli, ClientConfig};
pub use events::{EventSink, LogSink, SessionEvent};
pub use session::{ConnectionState, Outcome, SendSummary, Session, SessionConfig};
