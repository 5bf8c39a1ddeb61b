use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use betwire_batch::{RecordParser, RecordSource};
use betwire_client::{ClientConfig, LogSink, Outcome, Session};
use betwire_runtime::{CancelToken, logging};
use log::{error, info};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct WinnersReport<'a> {
    agency: u8,
    count: usize,
    winners: &'a [String],
}

fn main() -> ExitCode {
    logging::init().ok();

    match run() {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let config = ClientConfig::from_env()?;
    let agency = config.session.agency;

    info!(
        "Starting betwire client: id={}, server={}, bets={}",
        agency,
        config.session.server_address,
        config.agency_path.display(),
    );

    let cancel = CancelToken::from_signals().context("Failed to register signal handlers")?;

    let mut source = RecordSource::open(&config.agency_path, RecordParser::new(agency.to_string()))
        .with_context(|| format!("Failed to open bets file {}", config.agency_path.display()))?;

    let mut session = Session::new(config.session.clone(), Arc::new(LogSink), cancel);

    if let Outcome::Cancelled = session
        .connect_with_retries()
        .with_context(|| format!("Could not connect to {}", config.session.server_address))?
    {
        return Ok(ExitCode::SUCCESS);
    }

    let summary = match session.send_batches(&mut source).context("Failed to send bets")? {
        Outcome::Completed(summary) => summary,
        Outcome::Cancelled => return Ok(ExitCode::SUCCESS),
    };
    info!(
        "Sent {} bets in {} batches ({} rejected)",
        summary.records_sent, summary.batches_sent, summary.batches_rejected
    );

    let winners = match session.query_winners() {
        Outcome::Completed(winners) => winners,
        Outcome::Cancelled => return Ok(ExitCode::SUCCESS),
    };
    session.close();

    print_winners(agency, &winners, config.json)?;
    Ok(ExitCode::SUCCESS)
}

fn print_winners(agency: u8, winners: &[String], json: bool) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();

    if json {
        let report = WinnersReport {
            agency,
            count: winners.len(),
            winners,
        };
        serde_json::to_writer(&mut out, &report)?;
        writeln!(out)?;
    } else {
        for id in winners {
            writeln!(out, "{id}")?;
        }
    }

    out.flush()?;
    Ok(())
}
