//! Data dictionary: schema metadata rendered into prompts and the sidebar.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Column type label as declared in the dictionary file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Integer,
    Float,
    Text,
    Bool,
    Date,
}

impl DataType {
    /// Parse the free-form labels dictionary files use in the wild.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "int" | "integer" | "bigint" | "smallint" => Self::Integer,
            "float" | "double" | "decimal" | "numeric" | "real" => Self::Float,
            "bool" | "boolean" => Self::Bool,
            "date" | "datetime" | "timestamp" => Self::Date,
            _ => Self::Text,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Integer => "Integer",
            Self::Float => "Float",
            Self::Text => "Text",
            Self::Bool => "Bool",
            Self::Date => "Date",
        };
        f.write_str(s)
    }
}

/// One row of the dictionary file: `column_name,data_type,description`.
#[derive(Debug, Clone, PartialEq)]
pub struct DictionaryEntry {
    pub column: String,
    pub data_type: DataType,
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    column_name: String,
    data_type: String,
    description: String,
}

/// Load the dictionary file. Order of entries is the schema order used in
/// prompts, so it is preserved as-is.
pub fn load_dictionary(path: &Path) -> Result<Vec<DictionaryEntry>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open dictionary file {}", path.display()))?;
    let mut entries = Vec::new();
    for record in reader.deserialize() {
        let raw: RawEntry = record
            .with_context(|| format!("malformed dictionary row in {}", path.display()))?;
        entries.push(DictionaryEntry {
            column: raw.column_name.trim().to_string(),
            data_type: DataType::from_label(&raw.data_type),
            description: raw.description.trim().to_string(),
        });
    }
    Ok(entries)
}

/// Render the dictionary as the plain-text block embedded in prompts and
/// shown in the sidebar panel.
pub fn render_dictionary(entries: &[DictionaryEntry]) -> String {
    let mut out = String::new();
    for e in entries {
        out.push_str(&format!("- {} ({}): {}\n", e.column, e.data_type, e.description));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_map_to_types() {
        assert_eq!(DataType::from_label("Integer"), DataType::Integer);
        assert_eq!(DataType::from_label("  int "), DataType::Integer);
        assert_eq!(DataType::from_label("DOUBLE"), DataType::Float);
        assert_eq!(DataType::from_label("datetime"), DataType::Date);
        assert_eq!(DataType::from_label("varchar"), DataType::Text);
    }

    #[test]
    fn renders_one_line_per_entry() {
        let entries = vec![DictionaryEntry {
            column: "age".into(),
            data_type: DataType::Integer,
            description: "age in years".into(),
        }];
        assert_eq!(render_dictionary(&entries), "- age (Integer): age in years\n");
    }
}
