//! Column listing across inputs.
//!
//! Loads every input, normalizes its column labels and renders one row per
//! label with a marker for the inputs that carry it, so the shared (joinable)
//! columns stand out. Optionally lists the distinct values of one column.

use anyhow::{Context, Result};
use log::info;

use crate::{
    cli::ColumnsArgs,
    cross::{load_tables, read_options},
    filter::distinct_values,
    normalize::{common_columns, normalize_table},
    render,
    table::Table,
};

pub fn execute(args: &ColumnsArgs) -> Result<()> {
    let options = read_options(&args.input)?;
    let tables = load_tables(&args.inputs, &options)?
        .iter()
        .map(normalize_table)
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Normalizing column labels")?;

    let (headers, rows) = column_matrix(&tables);
    print!("{}", render::render_grid(&headers, &rows));

    let common = common_columns(&tables);
    if common.is_empty() {
        info!("No column is shared by all {} input(s)", tables.len());
    } else {
        info!("Common column(s): {}", common.join(", "));
    }

    if let Some(column) = &args.values {
        for table in &tables {
            if table.column(column).is_none() {
                continue;
            }
            let values = distinct_values(table, column)?;
            println!();
            println!("{} / {} ({} distinct)", table.source(), column, values.len());
            for value in values {
                println!("  {value}");
            }
        }
    }
    Ok(())
}

/// One row per normalized label (first-seen order across inputs), one `x`
/// column per input that has it.
pub fn column_matrix(tables: &[Table]) -> (Vec<String>, Vec<Vec<String>>) {
    let mut headers = vec!["column".to_string()];
    headers.extend(tables.iter().map(|t| t.source().to_string()));

    let mut labels: Vec<&str> = Vec::new();
    for table in tables {
        for name in table.column_names() {
            if !labels.contains(&name) {
                labels.push(name);
            }
        }
    }

    let rows = labels
        .into_iter()
        .map(|label| {
            let mut row = vec![label.to_string()];
            row.extend(tables.iter().map(|t| {
                if t.column_index(label).is_some() {
                    "x".to_string()
                } else {
                    String::new()
                }
            }));
            row
        })
        .collect();
    (headers, rows)
}
