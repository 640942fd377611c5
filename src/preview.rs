use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::PreviewArgs,
    cross::read_options,
    io_utils,
    normalize::normalize_table,
    render,
};

pub fn execute(args: &PreviewArgs) -> Result<()> {
    let options = read_options(&args.input_options)?;
    let table = io_utils::read_table(&args.input, &options)
        .with_context(|| format!("Loading {:?}", args.input))?;
    let normalized = normalize_table(&table)
        .with_context(|| format!("Normalizing column labels of {:?}", args.input))?;

    print!("{}", render::render(&normalized, Some(args.rows)));
    info!(
        "Displayed {} of {} row(s) from {:?}",
        args.rows.min(normalized.row_count()),
        normalized.row_count(),
        args.input
    );
    Ok(())
}
