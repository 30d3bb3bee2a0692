//! In-memory table: typed columns loaded from a delimited file, cached for
//! the process lifetime keyed by the loader's inputs.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

use anyhow::{bail, Context, Result};
use unicode_width::UnicodeWidthStr;

pub mod dictionary;

pub use dictionary::{load_dictionary, render_dictionary, DataType, DictionaryEntry};

/// A single value in a column. Empty fields load as `Null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Null,
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Ordering used by sort_values: numbers by value, strings/bools by
    /// their natural order, nulls always last.
    pub fn compare(&self, other: &Cell) -> Ordering {
        match (self, other) {
            (Cell::Null, Cell::Null) => Ordering::Equal,
            (Cell::Null, _) => Ordering::Greater,
            (_, Cell::Null) => Ordering::Less,
            (Cell::Int(a), Cell::Int(b)) => a.cmp(b),
            (Cell::Int(a), Cell::Float(b)) => (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal),
            (Cell::Float(a), Cell::Int(b)) => a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal),
            (Cell::Float(a), Cell::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Cell::Str(a), Cell::Str(b)) => a.cmp(b),
            (Cell::Bool(a), Cell::Bool(b)) => a.cmp(b),
            // Mixed types sort by a fixed type rank so the order is stable.
            (a, b) => type_rank(a).cmp(&type_rank(b)),
        }
    }
}

fn type_rank(c: &Cell) -> u8 {
    match c {
        Cell::Bool(_) => 0,
        Cell::Int(_) => 1,
        Cell::Float(_) => 2,
        Cell::Str(_) => 3,
        Cell::Null => 4,
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Str(v) => write!(f, "{}", v),
            Cell::Bool(v) => write!(f, "{}", v),
            Cell::Null => f.write_str(""),
        }
    }
}

/// A named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Series {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self { name: name.into(), cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// The in-memory dataset: equal-length named columns. Immutable for the
/// session; query evaluation only ever produces new tables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Series>,
}

impl Table {
    pub fn new(columns: Vec<Series>) -> Result<Self> {
        if let Some(first) = columns.first() {
            let rows = first.len();
            for c in &columns {
                if c.len() != rows {
                    bail!(
                        "column '{}' has {} rows, expected {}",
                        c.name,
                        c.len(),
                        rows
                    );
                }
            }
            let mut seen = HashMap::new();
            for c in &columns {
                if seen.insert(c.name.clone(), ()).is_some() {
                    bail!("duplicate column name '{}'", c.name);
                }
            }
        }
        Ok(Self { columns })
    }

    pub fn rows(&self) -> usize {
        self.columns.first().map(|c| c.len()).unwrap_or(0)
    }

    pub fn columns(&self) -> &[Series] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Series> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Keep the rows where `mask` is true. The mask length must equal the
    /// row count; callers validate that before building the mask.
    pub fn filter(&self, mask: &[bool]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let cells = c
                    .cells
                    .iter()
                    .zip(mask)
                    .filter(|(_, keep)| **keep)
                    .map(|(cell, _)| cell.clone())
                    .collect();
                Series::new(c.name.clone(), cells)
            })
            .collect();
        Table { columns }
    }

    /// Projection to a subset of columns, in the requested order.
    pub fn select(&self, names: &[String]) -> Result<Table, String> {
        let mut columns = Vec::with_capacity(names.len());
        for n in names {
            match self.column(n) {
                Some(c) => columns.push(c.clone()),
                None => return Err(format!("unknown column '{}'", n)),
            }
        }
        Ok(Table { columns })
    }

    pub fn head(&self, n: usize) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| Series::new(c.name.clone(), c.cells.iter().take(n).cloned().collect()))
            .collect();
        Table { columns }
    }

    pub fn sort_by(&self, name: &str, ascending: bool) -> Result<Table, String> {
        let key = self
            .column(name)
            .ok_or_else(|| format!("unknown column '{}'", name))?;
        let mut order: Vec<usize> = (0..self.rows()).collect();
        order.sort_by(|&a, &b| {
            let ord = key.cells[a].compare(&key.cells[b]);
            if ascending {
                ord
            } else {
                ord.reverse()
            }
        });
        let columns = self
            .columns
            .iter()
            .map(|c| {
                let cells = order.iter().map(|&i| c.cells[i].clone()).collect();
                Series::new(c.name.clone(), cells)
            })
            .collect();
        Ok(Table { columns })
    }

    /// Aligned plain-text rendering with the row index suppressed.
    pub fn render(&self, max_rows: Option<usize>) -> String {
        if self.columns.is_empty() {
            return "(empty table)".to_string();
        }
        let shown = max_rows.unwrap_or(self.rows()).min(self.rows());
        let mut widths: Vec<usize> = self
            .columns
            .iter()
            .map(|c| UnicodeWidthStr::width(c.name.as_str()))
            .collect();
        let mut body: Vec<Vec<String>> = Vec::with_capacity(shown);
        for row in 0..shown {
            let mut line = Vec::with_capacity(self.columns.len());
            for (i, c) in self.columns.iter().enumerate() {
                let text = c.cells[row].to_string();
                widths[i] = widths[i].max(UnicodeWidthStr::width(text.as_str()));
                line.push(text);
            }
            body.push(line);
        }

        let mut out = String::new();
        for (i, c) in self.columns.iter().enumerate() {
            if i > 0 {
                out.push_str("  ");
            }
            out.push_str(&pad(&c.name, widths[i]));
        }
        out.push('\n');
        for (i, _) in self.columns.iter().enumerate() {
            if i > 0 {
                out.push_str("  ");
            }
            out.push_str(&"-".repeat(widths[i]));
        }
        out.push('\n');
        for line in body {
            for (i, text) in line.iter().enumerate() {
                if i > 0 {
                    out.push_str("  ");
                }
                out.push_str(&pad(text, widths[i]));
            }
            out.push('\n');
        }
        if shown < self.rows() {
            out.push_str(&format!("... {} more rows\n", self.rows() - shown));
        }
        out
    }
}

fn pad(text: &str, width: usize) -> String {
    let w = UnicodeWidthStr::width(text);
    let mut s = text.to_string();
    for _ in w..width {
        s.push(' ');
    }
    s
}

/// The dataset as handed to the rest of the app: the table plus its schema
/// metadata, loaded once per (dataset, dictionary) pair.
#[derive(Debug)]
pub struct Dataset {
    pub table: Table,
    pub dictionary: Vec<DictionaryEntry>,
}

impl Dataset {
    pub fn dictionary_text(&self) -> String {
        render_dictionary(&self.dictionary)
    }

    pub fn sample_text(&self, rows: usize) -> String {
        self.table.render(Some(rows))
    }
}

fn parse_cell(raw: &str, dtype: DataType) -> Cell {
    let raw = raw.trim();
    if raw.is_empty() {
        return Cell::Null;
    }
    match dtype {
        DataType::Integer => raw
            .parse::<i64>()
            .map(Cell::Int)
            .unwrap_or_else(|_| Cell::Str(raw.to_string())),
        DataType::Float => raw
            .parse::<f64>()
            .map(Cell::Float)
            .unwrap_or_else(|_| Cell::Str(raw.to_string())),
        DataType::Bool => match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Cell::Bool(true),
            "false" | "0" | "no" => Cell::Bool(false),
            _ => Cell::Str(raw.to_string()),
        },
        // Dates stay textual; the query language compares them as strings,
        // which works for ISO-formatted values.
        DataType::Date | DataType::Text => Cell::Str(raw.to_string()),
    }
}

/// Load the dataset file, typing each column from its dictionary entry.
/// Columns absent from the dictionary load as text.
pub fn load_table(path: &Path, dictionary: &[DictionaryEntry]) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open dataset file {}", path.display()))?;
    let headers: Vec<String> = reader
        .headers()
        .context("dataset file has no header row")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let types: Vec<DataType> = headers
        .iter()
        .map(|h| {
            dictionary
                .iter()
                .find(|e| e.column == *h)
                .map(|e| e.data_type)
                .unwrap_or(DataType::Text)
        })
        .collect();

    let mut cells: Vec<Vec<Cell>> = headers.iter().map(|_| Vec::new()).collect();
    for record in reader.records() {
        let record = record.with_context(|| format!("malformed row in {}", path.display()))?;
        for (i, field) in record.iter().enumerate() {
            if i < cells.len() {
                cells[i].push(parse_cell(field, types[i]));
            }
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, cells)| Series::new(name, cells))
        .collect();
    Table::new(columns)
}

static DATASET_CACHE: OnceLock<Mutex<HashMap<String, Arc<Dataset>>>> = OnceLock::new();

fn cache_key(dataset: &Path, dict: &Path) -> String {
    let digest = md5::compute(format!("{}|{}", dataset.display(), dict.display()));
    format!("{:x}", digest)
}

/// Load a dataset through the process-wide cache. Repeat loads of the same
/// (dataset, dictionary) pair within one process return the same `Arc`.
pub fn load_cached(dataset: &Path, dict: &Path) -> Result<Arc<Dataset>> {
    let cache = DATASET_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let key = cache_key(dataset, dict);
    if let Some(hit) = cache.lock().ok().and_then(|m| m.get(&key).cloned()) {
        return Ok(hit);
    }
    let dictionary = load_dictionary(dict)?;
    let table = load_table(dataset, &dictionary)?;
    let loaded = Arc::new(Dataset { table, dictionary });
    if let Ok(mut map) = cache.lock() {
        map.insert(key, Arc::clone(&loaded));
    }
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn ages() -> Table {
        Table::new(vec![Series::new("age", vec![Cell::Int(10), Cell::Int(40)])]).unwrap()
    }

    #[test]
    fn rejects_ragged_columns() {
        let result = Table::new(vec![
            Series::new("a", vec![Cell::Int(1)]),
            Series::new("b", vec![]),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn filter_keeps_masked_rows() {
        let t = ages().filter(&[false, true]);
        assert_eq!(t.rows(), 1);
        assert_eq!(t.column("age").unwrap().cells[0], Cell::Int(40));
    }

    #[test]
    fn sort_descending_puts_nulls_last() {
        let t = Table::new(vec![Series::new(
            "v",
            vec![Cell::Int(1), Cell::Null, Cell::Int(3)],
        )])
        .unwrap();
        let sorted = t.sort_by("v", false).unwrap();
        assert_eq!(
            sorted.column("v").unwrap().cells,
            vec![Cell::Int(3), Cell::Int(1), Cell::Null]
        );
    }

    #[test]
    fn render_suppresses_index_and_aligns() {
        let rendered = ages().render(None);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "age");
        assert_eq!(lines[1], "---");
        assert_eq!(lines[2], "10 ");
        assert_eq!(lines[3], "40 ");
    }

    #[test]
    fn loader_types_cells_from_dictionary() {
        let dir = std::env::temp_dir().join("datachat_table_test");
        std::fs::create_dir_all(&dir).unwrap();
        let data_path = dir.join("mini.csv");
        let mut f = std::fs::File::create(&data_path).unwrap();
        writeln!(f, "name,hp").unwrap();
        writeln!(f, "Pikachu,35").unwrap();
        writeln!(f, "Snorlax,").unwrap();
        let dictionary = vec![
            DictionaryEntry {
                column: "name".into(),
                data_type: DataType::Text,
                description: "species name".into(),
            },
            DictionaryEntry {
                column: "hp".into(),
                data_type: DataType::Integer,
                description: "hit points".into(),
            },
        ];
        let table = load_table(&data_path, &dictionary).unwrap();
        assert_eq!(table.rows(), 2);
        assert_eq!(table.column("hp").unwrap().cells[0], Cell::Int(35));
        assert_eq!(table.column("hp").unwrap().cells[1], Cell::Null);
        assert_eq!(
            table.column("name").unwrap().cells[0],
            Cell::Str("Pikachu".into())
        );
    }

    #[test]
    fn cache_returns_the_same_arc() {
        let dir = std::env::temp_dir().join("datachat_cache_test");
        std::fs::create_dir_all(&dir).unwrap();
        let data_path = dir.join("data.csv");
        let dict_path = dir.join("dict.csv");
        std::fs::write(&data_path, "age\n10\n40\n").unwrap();
        std::fs::write(&dict_path, "column_name,data_type,description\nage,Integer,age\n").unwrap();
        let a = load_cached(&data_path, &dict_path).unwrap();
        let b = load_cached(&data_path, &dict_path).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
