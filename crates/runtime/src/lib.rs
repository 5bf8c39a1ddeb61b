pub mod config;
pub mod logging;
pub mod shutdown;

pub use config::{
    CONNECT_RETRY_DELAY, DEFAULT_AGENCY_PATH, DEFAULT_BACKOFF, DEFAULT_CONNECT_ATTEMPTS,
    DEFAULT_MAX_BATCH_AMOUNT, DEFAULT_MAX_BATCH_BYTES, DEFAULT_MAX_PAYLOAD,
    DEFAULT_SERVER_ADDRESS,
};

pub use logging::init;
pub use shutdown::CancelToken;
