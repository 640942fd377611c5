use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{classify::ResultFilter, join::JoinMode};

#[derive(Debug, Parser)]
#[command(author, version, about = "Cross and reconcile tabular files on key columns", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Cross two or more files on key columns, then classify, reshape and filter the result
    Cross(CrossArgs),
    /// List the normalized columns of each input and the columns they share
    Columns(ColumnsArgs),
    /// Preview the first few rows of a file after column normalization
    Preview(PreviewArgs),
}

#[derive(Debug, Args)]
pub struct InputArgs {
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Convert all-numeric and all-boolean columns to typed values (rewrites
    /// their text, e.g. `007` becomes `7`)
    #[arg(long = "infer")]
    pub infer: bool,
}

#[derive(Debug, Args)]
pub struct CrossArgs {
    /// Input files, crossed in the order given (use '-' for stdin once)
    #[arg(short = 'i', long = "input", required = true, action = clap::ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// Key column per input (comma-separated); a single key applies to every input
    #[arg(short = 'k', long = "key", value_delimiter = ',')]
    pub keys: Vec<String>,
    /// Join mode applied at every step
    #[arg(long = "mode", value_enum)]
    pub mode: Option<JoinMode>,
    /// Which crossed rows to keep
    #[arg(long = "result", value_enum)]
    pub result: Option<ResultFilter>,
    /// Value filters such as `status=active|pending` (repeatable, AND-combined)
    #[arg(long = "where", action = clap::ArgAction::Append)]
    pub filters: Vec<String>,
    /// Output columns in order, named as before renaming
    #[arg(short = 'C', long = "columns", value_delimiter = ',')]
    pub columns: Vec<String>,
    /// Rename an output column, `old=new` (repeatable)
    #[arg(long = "rename", action = clap::ArgAction::Append)]
    pub renames: Vec<String>,
    /// Name of the collapsed key column (defaults to the first input's key)
    #[arg(long = "key-label")]
    pub key_label: Option<String>,
    /// Output CSV file (stdout if omitted)
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter for the output (defaults from the output extension)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Render the result as an elastic table on stdout instead of CSV
    #[arg(long = "table")]
    pub table: bool,
    /// Print the run status as JSON on stderr
    #[arg(long = "status-json")]
    pub status_json: bool,
    /// Load keys, mode, filters and column plan from a saved snapshot
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Save the effective configuration to a snapshot file (.yaml or .json)
    #[arg(long = "save-config")]
    pub save_config: Option<PathBuf>,
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    /// Input files to inspect
    #[arg(short = 'i', long = "input", required = true, action = clap::ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// Also list the distinct values of this normalized column
    #[arg(long = "values")]
    pub values: Option<String>,
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    /// Input file to preview
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
    #[command(flatten)]
    pub input_options: InputArgs,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
