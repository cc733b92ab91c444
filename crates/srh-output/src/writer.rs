//! CSV and JSON serialisation of output tables.

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use srh_model::{Cell, Key, OutputTable, Symbols};
use tracing::info;

use crate::error::{OutputError, Result};

fn write_records<W: Write>(
    writer: W,
    table: &OutputTable,
    include_row_labels: bool,
    symbols: &Symbols,
) -> csv::Result<W> {
    let mut writer = csv::Writer::from_writer(writer);
    let mut header: Vec<&str> = Vec::new();
    if include_row_labels {
        header.extend(table.index_fields().iter().map(String::as_str));
    }
    header.extend(table.columns().iter().map(String::as_str));
    writer.write_record(&header)?;
    for row in table.rows() {
        let mut record: Vec<String> = Vec::with_capacity(header.len());
        if include_row_labels {
            record.extend(row.labels.iter().map(ToString::to_string));
        }
        record.extend(row.cells.iter().map(|cell| cell.render(symbols)));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    writer.into_inner().map_err(|e| csv::Error::from(e.into_error()))
}

/// Renders the table as CSV text. Numbers drop trailing zeros; withheld
/// values use `symbols`.
pub fn render_csv(table: &OutputTable, include_row_labels: bool, symbols: &Symbols) -> String {
    match write_records(Vec::new(), table, include_row_labels, symbols) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => String::new(),
    }
}

pub fn write_csv(
    table: &OutputTable,
    path: &Path,
    include_row_labels: bool,
    symbols: &Symbols,
) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_records(file, table, include_row_labels, symbols).map_err(|source| {
        OutputError::CsvWrite {
            path: path.to_path_buf(),
            source,
        }
    })?;
    info!(path = %path.display(), rows = table.height(), "wrote CSV output");
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum JsonCell {
    Number(f64),
    Marker(String),
}

#[derive(Debug, Serialize)]
struct JsonRow<'a> {
    labels: &'a [Key],
    cells: Vec<JsonCell>,
}

#[derive(Debug, Serialize)]
struct JsonTable<'a> {
    name: &'a str,
    index_fields: &'a [String],
    columns: &'a [String],
    rows: Vec<JsonRow<'a>>,
}

fn json_table<'a>(name: &'a str, table: &'a OutputTable, symbols: &Symbols) -> JsonTable<'a> {
    JsonTable {
        name,
        index_fields: table.index_fields(),
        columns: table.columns(),
        rows: table
            .rows()
            .iter()
            .map(|row| JsonRow {
                labels: &row.labels,
                cells: row
                    .cells
                    .iter()
                    .map(|&cell| match cell {
                        Cell::Value(v) => JsonCell::Number(v),
                        marker => JsonCell::Marker(marker.render(symbols)),
                    })
                    .collect(),
            })
            .collect(),
    }
}

pub fn render_json(name: &str, table: &OutputTable, symbols: &Symbols) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&json_table(name, table, symbols))
}

pub fn write_json(name: &str, table: &OutputTable, path: &Path, symbols: &Symbols) -> Result<()> {
    let json = render_json(name, table, symbols).map_err(|source| OutputError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, format!("{json}\n")).map_err(|source| OutputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), rows = table.height(), "wrote JSON output");
    Ok(())
}

/// Reads a CSV written by [`write_csv`] with row labels. The first
/// `index_width` columns are labels; the rest are numbers or markers.
pub fn read_csv_table(path: &Path, index_width: usize, symbols: &Symbols) -> Result<OutputTable> {
    let read_error = |source| OutputError::CsvRead {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(read_error)?;
    let headers = reader.headers().map_err(read_error)?.clone();
    if headers.len() < index_width {
        return Err(OutputError::CsvParse {
            path: path.to_path_buf(),
            message: format!("expected {index_width} label columns, found {}", headers.len()),
        });
    }
    let index_fields = headers.iter().take(index_width).map(String::from).collect();
    let columns = headers.iter().skip(index_width).map(String::from).collect();
    let mut table = OutputTable::new(index_fields, columns);
    for record in reader.records() {
        let record = record.map_err(read_error)?;
        let labels = record.iter().take(index_width).map(Key::parse).collect();
        let cells = record
            .iter()
            .skip(index_width)
            .map(|raw| {
                parse_cell(raw, symbols).ok_or_else(|| OutputError::CsvParse {
                    path: path.to_path_buf(),
                    message: format!("{raw:?} is neither a number nor a marker"),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        table.push_row(labels, cells)?;
    }
    Ok(table)
}

fn parse_cell(raw: &str, symbols: &Symbols) -> Option<Cell> {
    let raw = raw.trim();
    if raw == symbols.suppressed {
        Some(Cell::Suppressed)
    } else if raw == symbols.not_shown {
        Some(Cell::NotShown)
    } else if raw == symbols.not_applicable {
        Some(Cell::NotApplicable)
    } else if raw.is_empty() {
        Some(Cell::ZERO)
    } else {
        raw.parse::<f64>().ok().map(Cell::Value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> OutputTable {
        let mut table = OutputTable::new(
            vec!["Age_group".to_string()],
            vec!["LARC".to_string(), "Grand_total".to_string()],
        );
        table
            .push_row(vec![Key::parse("16-17")], vec![Cell::Suppressed, Cell::Value(2.5)])
            .expect("row");
        table
            .push_row(vec![Key::Int(20)], vec![Cell::NotApplicable, Cell::Value(100.0)])
            .expect("row");
        table
    }

    #[test]
    fn csv_renders_markers_and_whole_numbers() {
        let symbols = Symbols::default();
        insta::assert_snapshot!(render_csv(&table(), true, &symbols), @r"
        Age_group,LARC,Grand_total
        16-17,*,2.5
        20,z,100
        ");
        insta::assert_snapshot!(render_csv(&table(), false, &symbols), @r"
        LARC,Grand_total
        *,2.5
        z,100
        ");
    }

    #[test]
    fn json_keeps_numbers_numeric() {
        let json = render_json("Table 1", &table(), &Symbols::default()).expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value["rows"][0]["cells"], serde_json::json!(["*", 2.5]));
        assert_eq!(value["rows"][1]["labels"], serde_json::json!([20]));
        assert_eq!(value["columns"], serde_json::json!(["LARC", "Grand_total"]));
    }

    #[test]
    fn markers_parse_back() {
        let symbols = Symbols::default();
        assert_eq!(parse_cell("#", &symbols), Some(Cell::NotShown));
        assert_eq!(parse_cell(" 12.5 ", &symbols), Some(Cell::Value(12.5)));
        assert_eq!(parse_cell("", &symbols), Some(Cell::ZERO));
        assert_eq!(parse_cell("n/a", &symbols), None);
    }
}
