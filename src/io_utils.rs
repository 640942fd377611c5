//! File boundary of the tool: decoding delimited text into [`Table`]s and
//! writing finished tables back out.
//!
//! - **Delimiter resolution**: an explicit delimiter wins; `.tsv` → tab;
//!   otherwise the header line is sniffed for `,` `;` tab or `|`, falling
//!   back to comma.
//! - **Encoding**: inputs are decoded with `encoding_rs` (UTF-8 by default);
//!   output is always UTF-8.
//! - **stdin/stdout**: the `-` path reads standard input or writes standard
//!   output.
//! - **Malformed rows**: records whose field count differs from the header are
//!   skipped with a warning.

use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Read, Write},
    path::Path,
};

use anyhow::{Context, Result, anyhow};
use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::{debug, warn};

use crate::{
    data::{ColumnType, infer_column_type, parse_cell},
    table::{Column, Table},
};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| anyhow!("Unknown encoding '{value}'")),
        None => Ok(UTF_8),
    }
}

pub fn resolve_delimiter(path: Option<&Path>, provided: Option<u8>) -> u8 {
    if let Some(delim) = provided {
        return delim;
    }
    match path.and_then(|p| p.extension()).and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    }
}

/// Label used for a loaded file in log lines and error messages.
pub fn source_label(path: &Path) -> String {
    if is_dash(path) {
        return "stdin".to_string();
    }
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    if is_dash(path) {
        Ok(Box::new(std::io::stdin().lock()))
    } else {
        Ok(Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Opening input file {path:?}"))?,
        )))
    }
}

fn decode_field(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(anyhow!(
            "Failed to decode text with encoding {}",
            encoding.name()
        ))
    } else {
        Ok(text.into_owned())
    }
}

fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_field(field, encoding))
        .collect()
}

/// Options controlling how a delimited file becomes a [`Table`].
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    /// Infer integer/float/boolean columns. Off by default: inferred cells are
    /// compared and exported through their canonical form, not the source text.
    pub infer_types: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
            infer_types: false,
        }
    }
}

/// Candidates considered when sniffing a header line.
const SNIFF_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Like [`resolve_delimiter`], but a file that is neither `.tsv` nor given an
/// explicit delimiter has its header line sniffed. Standard input is never
/// sniffed.
pub fn detect_delimiter(path: &Path, provided: Option<u8>) -> Result<u8> {
    let resolved = resolve_delimiter(Some(path), provided);
    if provided.is_some() || resolved != DEFAULT_CSV_DELIMITER || is_dash(path) {
        return Ok(resolved);
    }
    let mut reader =
        BufReader::new(File::open(path).with_context(|| format!("Opening input file {path:?}"))?);
    let mut header = Vec::new();
    reader
        .read_until(b'\n', &mut header)
        .with_context(|| format!("Reading header line of {path:?}"))?;
    Ok(sniff_delimiter(&header))
}

/// Most frequent candidate outside quotes; comma on a tie or when none occurs.
fn sniff_delimiter(header: &[u8]) -> u8 {
    let mut counts = [0usize; SNIFF_CANDIDATES.len()];
    let mut quoted = false;
    for byte in header {
        if *byte == b'"' {
            quoted = !quoted;
        } else if !quoted {
            if let Some(idx) = SNIFF_CANDIDATES.iter().position(|c| c == byte) {
                counts[idx] += 1;
            }
        }
    }
    let (best, best_count) = counts
        .iter()
        .enumerate()
        .max_by_key(|(idx, count)| (**count, std::cmp::Reverse(*idx)))
        .map(|(idx, count)| (SNIFF_CANDIDATES[idx], *count))
        .unwrap_or((DEFAULT_CSV_DELIMITER, 0));
    let tied = counts.iter().filter(|c| **c == best_count).count() > 1;
    if best_count == 0 || tied {
        DEFAULT_CSV_DELIMITER
    } else {
        best
    }
}

pub fn read_table(path: &Path, options: &ReadOptions) -> Result<Table> {
    let delimiter = detect_delimiter(path, options.delimiter)?;
    debug!(
        "Reading {:?} with delimiter '{}'",
        path,
        printable_delimiter(delimiter)
    );
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true)
        .from_reader(open_input(path)?);

    let headers = decode_record(
        reader
            .byte_headers()
            .with_context(|| format!("Reading headers from {path:?}"))?,
        options.encoding,
    )?;

    let mut raw_columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    let mut skipped = 0usize;
    for (row_idx, record) in reader.byte_records().enumerate() {
        let record = record.with_context(|| format!("Reading row {} of {path:?}", row_idx + 2))?;
        if record.len() != headers.len() {
            skipped += 1;
            debug!(
                "Skipping row {} of {:?}: {} field(s), expected {}",
                row_idx + 2,
                path,
                record.len(),
                headers.len()
            );
            continue;
        }
        let decoded = decode_record(&record, options.encoding)
            .with_context(|| format!("Decoding row {} of {path:?}", row_idx + 2))?;
        for (column, value) in raw_columns.iter_mut().zip(decoded) {
            column.push(value);
        }
    }
    if skipped > 0 {
        warn!("Skipped {skipped} malformed row(s) in {path:?}");
    }

    let columns = headers
        .into_iter()
        .zip(raw_columns)
        .map(|(name, raw)| {
            let ty = if options.infer_types {
                infer_column_type(raw.iter().map(String::as_str))
            } else {
                ColumnType::String
            };
            let values = raw.iter().map(|value| parse_cell(value, ty)).collect();
            Column::new(name, values)
        })
        .collect();
    Table::new(source_label(path), columns)
        .with_context(|| format!("Building table from {path:?}"))
}

pub fn write_table(table: &Table, path: Option<&Path>, delimiter: u8) -> Result<()> {
    let sink: Box<dyn Write> = match path {
        Some(p) if !is_dash(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Creating output file {p:?}"))?,
        )),
        _ => Box::new(std::io::stdout()),
    };
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true)
        .from_writer(sink);
    writer
        .write_record(table.column_names())
        .context("Writing output headers")?;
    for row in table.display_rows() {
        writer.write_record(&row).context("Writing output row")?;
    }
    writer.flush().context("Flushing output")?;
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
