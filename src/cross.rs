use anyhow::{Context, Result, anyhow};
use itertools::Itertools;
use log::{debug, info};

use crate::{
    cli::{CrossArgs, InputArgs},
    filter::ValuePredicate,
    io_utils::{self, ReadOptions},
    normalize::{common_columns, normalize_table},
    pipeline::{Pipeline, RunStatus},
    render,
    reshape::ColumnPlan,
    snapshot::ConfigSnapshot,
    table::Table,
};

pub fn execute(args: &CrossArgs) -> Result<()> {
    if args.inputs.len() < 2 {
        return Err(anyhow!("Crossing requires at least two --input files"));
    }
    if args.inputs.iter().filter(|p| io_utils::is_dash(p)).count() > 1 {
        return Err(anyhow!("Only one input can be read from stdin"));
    }

    let snapshot = match &args.config {
        Some(path) => Some(
            ConfigSnapshot::read_from_path(path)
                .with_context(|| format!("Loading configuration from {path:?}"))?,
        ),
        None => None,
    };

    let options = read_options(&args.input)?;
    let tables = load_tables(&args.inputs, &options)?;
    let pipeline = resolve_pipeline(args, snapshot.as_ref(), &tables)?;
    debug!("Resolved pipeline: {:?}", pipeline);

    let output = pipeline.run(&tables).context("Crossing inputs")?;

    if let Some(path) = &args.save_config {
        pipeline
            .snapshot()
            .write_to_path(path)
            .with_context(|| format!("Saving configuration to {path:?}"))?;
        info!("Configuration saved to {:?}", path);
    }

    if args.table && args.output.is_none() {
        print!("{}", render::render(&output.table, None));
    } else {
        let delimiter = io_utils::resolve_delimiter(args.output.as_deref(), args.output_delimiter);
        io_utils::write_table(&output.table, args.output.as_deref(), delimiter)?;
        info!(
            "Wrote {} row(s) to {} (delimiter '{}')",
            output.table.row_count(),
            args.output
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "stdout".into()),
            io_utils::printable_delimiter(delimiter)
        );
    }

    log_status(&output.status);
    if args.status_json {
        let json = serde_json::to_string(&output.status).context("Serializing run status")?;
        eprintln!("{json}");
    }
    Ok(())
}

pub(crate) fn read_options(input: &InputArgs) -> Result<ReadOptions> {
    Ok(ReadOptions {
        delimiter: input.delimiter,
        encoding: io_utils::resolve_encoding(input.input_encoding.as_deref())?,
        infer_types: input.infer,
    })
}

pub(crate) fn load_tables(paths: &[std::path::PathBuf], options: &ReadOptions) -> Result<Vec<Table>> {
    paths
        .iter()
        .map(|path| {
            let table = io_utils::read_table(path, options)
                .with_context(|| format!("Loading {path:?}"))?;
            info!(
                "✓ Loaded {} with {} row(s) and {} column(s)",
                table.source(),
                table.row_count(),
                table.column_count()
            );
            Ok(table)
        })
        .collect()
}

/// Combines command-line flags with an optional snapshot. Flags given on the
/// command line win over snapshot values.
pub fn resolve_pipeline(
    args: &CrossArgs,
    snapshot: Option<&ConfigSnapshot>,
    tables: &[Table],
) -> Result<Pipeline> {
    let restored = snapshot.map(ConfigSnapshot::restore);

    let keys = if !args.keys.is_empty() {
        let keys: Vec<String> = args
            .keys
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if keys.len() == 1 {
            vec![keys[0].clone(); tables.len()]
        } else {
            keys
        }
    } else if let Some(restored) = &restored {
        restored.keys.clone()
    } else {
        vec![default_key(tables)?; tables.len()]
    };

    let mode = args
        .mode
        .or(restored.as_ref().map(|r| r.mode))
        .unwrap_or_default();
    let result = args
        .result
        .or(restored.as_ref().map(|r| r.result))
        .unwrap_or_default();
    let key_label = args
        .key_label
        .clone()
        .or_else(|| restored.as_ref().and_then(|r| r.key_label.clone()));

    let predicates = if args.filters.is_empty() {
        restored
            .as_ref()
            .map(|r| r.predicates.clone())
            .unwrap_or_default()
    } else {
        args.filters
            .iter()
            .map(|f| ValuePredicate::parse(f))
            .collect::<Result<Vec<_>>>()?
    };

    let plan = if args.columns.is_empty() && args.renames.is_empty() {
        restored.map(|r| r.plan).unwrap_or_default()
    } else {
        build_plan(&args.columns, &args.renames)?
    };

    let mut pipeline = Pipeline::new(keys, mode)
        .with_result(result)
        .with_predicates(predicates)
        .with_plan(plan);
    if let Some(label) = key_label {
        pipeline = pipeline.with_key_label(label);
    }
    Ok(pipeline)
}

fn default_key(tables: &[Table]) -> Result<String> {
    let normalized = tables
        .iter()
        .map(normalize_table)
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let common = common_columns(&normalized);
    match common.as_slice() {
        [only] => {
            info!("Using common column '{only}' as key");
            Ok(only.clone())
        }
        [] => Err(anyhow!("No column is common to all inputs; pass --key")),
        many => Err(anyhow!(
            "Several columns are common to all inputs ({}); choose one with --key",
            many.iter().join(", ")
        )),
    }
}

fn build_plan(columns: &[String], renames: &[String]) -> Result<ColumnPlan> {
    let mut plan = ColumnPlan::new(
        columns
            .iter()
            .map(|c| c.trim())
            .filter(|c| !c.is_empty()),
    );
    for rename in renames {
        let (from, to) = rename
            .split_once('=')
            .map(|(from, to)| (from.trim(), to.trim()))
            .filter(|(from, to)| !from.is_empty() && !to.is_empty())
            .ok_or_else(|| anyhow!("Failed to parse rename '{rename}' (expected old=new)"))?;
        plan = plan.with_rename(from, to);
    }
    Ok(plan)
}

fn log_status(status: &RunStatus) {
    if let (Some(matched), Some(unmatched)) = (status.matched, status.unmatched) {
        info!("Classification: {matched} matched, {unmatched} unmatched");
    }
    if let Some(new) = status.new {
        info!("New in second input: {new} row(s)");
    }
    for step in &status.filter_steps {
        info!("✓ Filter on '{}': {} row(s) remaining", step.column, step.rows);
    }
    info!("Result: {} row(s)", status.rows);
}
