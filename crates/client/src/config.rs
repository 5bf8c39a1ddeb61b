use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Result, ensure};
use betwire_batch::BatchLimits;
use betwire_protocol::MAX_FRAME_PAYLOAD;
use betwire_runtime::{
    CONNECT_RETRY_DELAY, DEFAULT_AGENCY_PATH, DEFAULT_BACKOFF, DEFAULT_CONNECT_ATTEMPTS,
    DEFAULT_MAX_BATCH_AMOUNT, DEFAULT_MAX_BATCH_BYTES, DEFAULT_MAX_PAYLOAD, DEFAULT_SERVER_ADDRESS,
};
use clap::Parser;

use crate::session::SessionConfig;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub session: SessionConfig,
    /// CSV file with this agency's bets
    pub agency_path: PathBuf,
    /// Print winners as JSON instead of one id per line
    pub json: bool,
}

#[derive(Debug, Parser)]
#[command(name = "betwire", version, about = "Send an agency's bets in batches and fetch its winners")]
pub struct Cli {
    /// Server address as host:port
    #[arg(long, env = "CLI_SERVER_ADDRESS", default_value = DEFAULT_SERVER_ADDRESS)]
    pub server_address: String,

    /// Agency id (0-255)
    #[arg(long, env = "CLI_ID")]
    pub id: u8,

    /// Maximum records per batch
    #[arg(long, env = "CLI_BATCH_MAXAMOUNT", default_value_t = DEFAULT_MAX_BATCH_AMOUNT)]
    pub max_amount: usize,

    /// Maximum serialized bytes per batch
    #[arg(long, env = "CLI_BATCH_MAXBYTES", default_value_t = DEFAULT_MAX_BATCH_BYTES)]
    pub max_bytes: usize,

    /// Largest payload accepted on the wire
    #[arg(long, env = "CLI_MAX_PAYLOAD", default_value_t = DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,

    /// Milliseconds between winners polls
    #[arg(long, env = "CLI_BACKOFF_MS", default_value_t = DEFAULT_BACKOFF.as_millis() as u64)]
    pub backoff_ms: u64,

    /// Milliseconds to pause after each batch
    #[arg(long, env = "CLI_LOOP_PERIOD_MS", default_value_t = 0)]
    pub loop_period_ms: u64,

    /// Dial attempts at startup
    #[arg(long, env = "CLI_CONNECT_ATTEMPTS", default_value_t = DEFAULT_CONNECT_ATTEMPTS)]
    pub connect_attempts: u32,

    /// Path to the agency's bets file
    #[arg(long, env = "CLI_AGENCY_PATH", default_value = DEFAULT_AGENCY_PATH)]
    pub agency_path: PathBuf,

    /// Print winners as JSON
    #[arg(long)]
    pub json: bool,
}

impl ClientConfig {
    pub fn from_args(args: &Cli) -> Result<Self> {
        ensure!(args.max_amount >= 1, "--max-amount must be at least 1");
        ensure!(args.max_bytes >= 1, "--max-bytes must be at least 1");
        ensure!(
            args.max_payload <= MAX_FRAME_PAYLOAD,
            "--max-payload cannot exceed {MAX_FRAME_PAYLOAD} bytes"
        );
        ensure!(
            args.max_bytes <= args.max_payload,
            "--max-bytes ({}) cannot exceed --max-payload ({})",
            args.max_bytes,
            args.max_payload
        );
        ensure!(args.connect_attempts >= 1, "--connect-attempts must be at least 1");

        let session = SessionConfig {
            server_address: args.server_address.clone(),
            agency: args.id,
            limits: BatchLimits {
                max_count: args.max_amount,
                max_bytes: args.max_bytes,
            },
            max_payload: args.max_payload,
            backoff: Duration::from_millis(args.backoff_ms),
            loop_period: Duration::from_millis(args.loop_period_ms),
            connect_attempts: args.connect_attempts,
            connect_retry_delay: CONNECT_RETRY_DELAY,
        };

        Ok(Self {
            session,
            agency_path: args.agency_path.clone(),
            json: args.json,
        })
    }

    pub fn from_env() -> Result<Self> {
        let args = Cli::parse();
        Self::from_args(&args)
    }
}
