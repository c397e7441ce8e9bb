use std::path::PathBuf;

use anyhow::Context;
use chrono::Datelike;
use clap::Parser;

use crate::stripe::DEFAULT_API_BASE;

/// Exports the intra-EU clients (outside France) invoiced through Stripe over
/// a year, for the DES (Déclaration Européenne de Services).
#[derive(Parser, Debug)]
#[command(name = "des-export", version)]
pub struct Args {
    /// Year to export (default: current year).
    #[arg(short, long, value_parser = clap::value_parser!(i32).range(1970..=9999))]
    pub year: Option<i32>,
    /// Output file (default: output/des_export_YYYY.csv).
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Stripe secret API key.
    #[arg(long, env = "STRIPE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    #[arg(long, env = "STRIPE_API_BASE", default_value = DEFAULT_API_BASE, hide = true)]
    pub api_base: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: String,
    pub year: i32,
    pub output: PathBuf,
    pub api_base: String,
}

impl Config {
    /// Parse the command line (and the environment it falls back to).
    pub fn load() -> anyhow::Result<Self> {
        Args::parse().try_into()
    }
}

pub fn default_output(year: i32) -> PathBuf {
    PathBuf::from("output").join(format!("des_export_{year}.csv"))
}

impl TryFrom<Args> for Config {
    type Error = anyhow::Error;

    fn try_from(args: Args) -> anyhow::Result<Self> {
        let api_key = args
            .api_key
            .filter(|key| !key.trim().is_empty())
            .context("no Stripe API key: use --api-key or set STRIPE_API_KEY")?;
        let year = args.year.unwrap_or_else(|| chrono::Local::now().year());
        Ok(Self {
            api_key,
            year,
            output: args.output.unwrap_or_else(|| default_output(year)),
            api_base: args.api_base,
        })
    }
}
