// src/ingest.rs

//! Reads an edge table from delimited text or a spreadsheet workbook and
//! builds a [`GraphModel`].
//!
//! The table has exactly four columns, in order: `Node A`, `Node B`, `id`,
//! `length`. Row width and field contents are checked by the graph model so
//! that every malformed row surfaces as a [`SchemaError`].

use std::io;
use std::path::Path;

use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use thiserror::Error;
use tracing::{debug, info};

use crate::graph::{GraphModel, SchemaError, SelfLoopPolicy, COLUMN_NAMES, ROW_FIELDS};

/// How the first line of the file is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderMode {
    /// First line is a header naming the four canonical columns.
    #[default]
    Validate,
    /// First line is a header with four columns of any name.
    Positional,
    /// There is no header; every line is data.
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    pub delimiter: u8,
    pub header: HeaderMode,
    pub self_loops: SelfLoopPolicy,
}

impl Default for IngestOptions {
    fn default() -> Self {
        IngestOptions {
            delimiter: b',',
            header: HeaderMode::Validate,
            self_loops: SelfLoopPolicy::Allow,
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("workbook error: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("workbook has no worksheets")]
    NoWorksheet,
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),
}

/// File extensions read as workbooks rather than delimited text.
const WORKBOOK_EXTENSIONS: [&str; 4] = ["xlsx", "xlsm", "xls", "ods"];

pub fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| WORKBOOK_EXTENSIONS.iter().any(|w| ext.eq_ignore_ascii_case(w)))
        .unwrap_or(false)
}

/// Reads all data rows from `path`, choosing the reader by extension.
pub fn read_rows<P: AsRef<Path>>(path: P, options: &IngestOptions) -> Result<Vec<Vec<String>>, IngestError> {
    let path = path.as_ref();
    if is_workbook(path) {
        return read_workbook_rows(path, options);
    }
    let file = std::fs::File::open(path)?;
    debug!("[ingest] reading {}", path.display());
    read_rows_from_reader(file, options)
}

/// Reads all data rows from the first worksheet of a workbook. Cells are
/// taken as displayed, so a whole-number length cell reads as `10`. The
/// delimiter option does not apply.
pub fn read_workbook_rows<P: AsRef<Path>>(path: P, options: &IngestOptions) -> Result<Vec<Vec<String>>, IngestError> {
    let path = path.as_ref();
    debug!("[ingest] reading workbook {}", path.display());
    let mut workbook = open_workbook_auto(path)?;
    let sheet = workbook.worksheet_range_at(0).ok_or(IngestError::NoWorksheet)??;

    let mut rows = sheet
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect::<Vec<String>>());
    if options.header != HeaderMode::None {
        if let Some(header) = rows.next() {
            check_header(header.as_slice(), options.header)?;
        }
    }
    Ok(rows.collect())
}

/// Reads all data rows from any reader.
pub fn read_rows_from_reader<R: io::Read>(
    reader: R,
    options: &IngestOptions,
) -> Result<Vec<Vec<String>>, IngestError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(options.delimiter)
        .from_reader(reader);

    let mut records = rdr.records();
    if options.header != HeaderMode::None {
        if let Some(header) = records.next() {
            let header = header?;
            let fields: Vec<&str> = header.iter().collect();
            check_header(fields.as_slice(), options.header)?;
        }
    }

    let mut rows = Vec::new();
    for record in records {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Reads `path` and builds a graph from it. Either the whole file is
/// accepted or no graph is returned.
pub fn load_graph<P: AsRef<Path>>(path: P, options: &IngestOptions) -> Result<GraphModel, IngestError> {
    let rows = read_rows(path, options)?;
    graph_from_rows(&rows, options)
}

pub fn graph_from_rows(rows: &[Vec<String>], options: &IngestOptions) -> Result<GraphModel, IngestError> {
    let mut graph = GraphModel::with_self_loop_policy(options.self_loops);
    graph.add_edges(rows)?;
    info!(
        "[ingest] built graph with {} nodes and {} edges from {} rows",
        graph.node_count(),
        graph.edge_count(),
        rows.len()
    );
    Ok(graph)
}

fn check_header<S: AsRef<str>>(header: &[S], mode: HeaderMode) -> Result<(), SchemaError> {
    if header.len() != ROW_FIELDS {
        return Err(SchemaError::HeaderWidth {
            expected: ROW_FIELDS,
            found: header.len(),
        });
    }
    if mode == HeaderMode::Validate {
        for (column, (found, expected)) in header.iter().zip(COLUMN_NAMES).enumerate() {
            let found = found.as_ref();
            if normalize(found) != normalize(expected) {
                return Err(SchemaError::HeaderName {
                    column: column + 1,
                    expected,
                    found: found.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// Lowercase with spaces, `_` and `-` removed, so `Node A`, `node_a` and
/// `NodeA` compare equal.
fn normalize(name: &str) -> String {
    name.trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}
