use std::time::Duration;

pub const PROGRAM_LOG_LEVEL: &str = "BETWIRE_LOG_LEVEL";

pub const DEFAULT_SERVER_ADDRESS: &str = "127.0.0.1:12345";
pub const DEFAULT_AGENCY_PATH: &str = "/data/agency.csv";

/// Records per batch unless overridden.
pub const DEFAULT_MAX_BATCH_AMOUNT: usize = 100;
/// Serialized bytes per batch unless overridden.
pub const DEFAULT_MAX_BATCH_BYTES: usize = 8192;
/// Largest payload the codec accepts in either direction.
/// Matches what a 2-byte length prefix can describe.
pub const DEFAULT_MAX_PAYLOAD: usize = u16::MAX as usize;

/// Startup dial attempts before the send phase gives up.
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 5;
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Delay between winners polls.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

/// Granularity at which sleeps re-check for cancellation.
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);
