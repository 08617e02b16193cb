use crate::error::Error;
use serde_json::Value;
use std::io::{Read, Write};
use std::path::Path;

/// Text values that stand for "no value" in the published sheet.
const BLANK_SENTINELS: [&str; 2] = ["NaN", "N/A"];

/// A single table cell as read from a sheet, a CSV file or produced by the collector.
#[derive(Clone, Debug, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Integer(i64),
    Decimal(f64),
    Bool(bool),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Transport-safe text form of the cell. Missing, non-finite and sentinel
    /// values all collapse to an empty string.
    pub fn normalize(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) if BLANK_SENTINELS.contains(&s.as_str()) => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Integer(i) => i.to_string(),
            Cell::Decimal(f) if !f.is_finite() => String::new(),
            Cell::Decimal(f) => format_decimal(*f),
            Cell::Bool(b) => b.to_string(),
        }
    }
}

impl From<Value> for Cell {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Cell::Empty,
            Value::Bool(b) => Cell::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Integer(i),
                None => n.as_f64().map(Cell::Decimal).unwrap_or(Cell::Empty),
            },
            Value::String(s) => Cell::Text(s),
            other => Cell::Text(other.to_string()),
        }
    }
}

/// Integral decimals keep one fractional digit so spend reads `100.0`, not `100`.
fn format_decimal(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

/// Header-defined rows. Every row is kept exactly as wide as the header.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        // cells past the header get an unnamed column rather than being dropped
        while row.len() > self.columns.len() {
            self.columns.push(String::new());
            for existing in self.rows.iter_mut() {
                existing.push(Cell::Empty);
            }
        }
        row.resize(self.columns.len(), Cell::Empty);
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize, Error> {
        self.column_index(name).ok_or_else(|| Error::MissingColumn {
            column: name.to_string(),
        })
    }

    #[cfg(test)]
    pub fn cell(&self, row: usize, column: &str) -> Option<&Cell> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    /// Builds a table from raw sheet values; the first row is the header.
    pub fn from_values(values: Vec<Vec<Value>>) -> Self {
        let mut iter = values.into_iter();
        let columns = match iter.next() {
            Some(header) => header
                .into_iter()
                .map(|v| Cell::from(v).normalize())
                .collect(),
            None => return Table::default(),
        };

        let mut table = Table::new(columns);
        for row in iter {
            table.push_row(row.into_iter().map(Cell::from).collect());
        }
        table
    }

    /// Header row followed by every data row, each cell normalized to text.
    pub fn to_values(&self) -> Vec<Vec<String>> {
        let mut values = Vec::with_capacity(self.rows.len() + 1);
        values.push(self.columns.clone());
        values.extend(
            self.rows
                .iter()
                .map(|row| row.iter().map(Cell::normalize).collect()),
        );
        values
    }

    /// Reads a CSV with a header row; every cell is kept as text.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self, Error> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let columns = reader.headers()?.iter().map(str::to_string).collect();
        let mut table = Table::new(columns);
        for record in reader.records() {
            let record = record?;
            table.push_row(record.iter().map(Cell::text).collect());
        }
        Ok(table)
    }

    pub fn read_csv_file(path: &Path) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;
        Self::read_csv(file)
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), Error> {
        let mut writer = csv::Writer::from_writer(writer);
        for row in self.to_values() {
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Writes the table to `path`, replacing any previous file.
    pub fn write_csv_file(&self, path: &Path) -> Result<(), Error> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }
}
