use std::io;

use anyhow::Context;
use compute::Aggregator;
use config::Config;
use read::read_invoices;
use stripe::StripeClient;
use tracing::info;
use tracing_subscriber::EnvFilter;
use write::export_report;

mod compute;
mod config;
mod countries;
mod data;
mod read;
mod resolve;
mod stripe;
mod summary;
#[cfg(test)]
mod testing;
mod write;

/// Logs go to stderr (`RUST_LOG` to tune them), stdout is kept for the summary.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn main() -> Result<(), anyhow::Error> {
    dotenvy::dotenv().ok();
    init_logging();
    let config = Config::load()?;
    let client = StripeClient::new(&config.api_key, &config.api_base)?;

    info!(year = config.year, "fetching paid invoices");
    let mut aggregator = Aggregator::new(&client);
    let fetched = read_invoices(&client, config.year, &mut aggregator)?;
    let invoices: usize = fetched.iter().map(|(_, count)| count).sum();
    info!(invoices, "paid invoices fetched");
    info!(
        clients = aggregator.year.len(),
        "intra-EU clients, {} excluded",
        countries::DOMESTIC_COUNTRY
    );

    export_report(&config.output, aggregator.year.sorted())?;
    info!(path = %config.output.display(), "report written");

    summary::print_summary(
        &mut io::stdout().lock(),
        &fetched,
        &aggregator.months,
        &aggregator.year,
    )
    .context("cannot print summary")?;
    Ok(())
}
