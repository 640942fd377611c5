pub mod classify;
pub mod cli;
pub mod columns;
pub mod cross;
pub mod data;
pub mod error;
pub mod filter;
pub mod io_utils;
pub mod join;
pub mod normalize;
pub mod pipeline;
pub mod preview;
pub mod render;
pub mod reshape;
pub mod snapshot;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

pub use crate::{
    classify::ResultFilter,
    error::CrossError,
    filter::ValuePredicate,
    join::{JoinMode, JoinSpec},
    pipeline::{CrossOutput, Pipeline, RunStatus},
    reshape::ColumnPlan,
    snapshot::ConfigSnapshot,
    table::Table,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("csv_crossmatch", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Cross(args) => cross::execute(&args),
        Commands::Columns(args) => columns::execute(&args),
        Commands::Preview(args) => preview::execute(&args),
    }
}
