//! Turns a result value into terminal text, dispatching on its runtime type.

use owo_colors::OwoColorize;
use termimad::MadSkin;
use unicode_width::UnicodeWidthStr;

use crate::exec::{ChartSpec, Value};

const CHART_WIDTH: usize = 40;

/// Render the designated result value. Tables show without an index column,
/// sequences print one element per line, charts draw as unicode bars, and
/// anything else falls through to its string form.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Table(table) => table.render(None),
        Value::Column(series) => {
            let mut out = String::new();
            for cell in &series.cells {
                out.push_str(&cell.to_string());
                out.push('\n');
            }
            out
        }
        Value::List(items) => {
            let mut out = String::new();
            for item in items {
                out.push_str(&render_scalar_line(item));
                out.push('\n');
            }
            out
        }
        Value::Chart(spec) => render_chart(spec),
        other => {
            let mut s = render_scalar_line(other);
            s.push('\n');
            s
        }
    }
}

fn render_scalar_line(value: &Value) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::Float(v) => format_float(*v),
        Value::Str(v) => v.clone(),
        Value::Bool(v) => v.to_string(),
        // A nested composite inside a list renders on its own lines.
        other => render_value(other).trim_end().to_string(),
    }
}

pub fn format_float(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        let s = format!("{:.4}", v);
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

fn render_chart(spec: &ChartSpec) -> String {
    let mut out = String::new();
    out.push_str(&spec.title);
    out.push('\n');
    if spec.bars.is_empty() {
        out.push_str("(no data)\n");
        return out;
    }
    let max = spec
        .bars
        .iter()
        .map(|(_, v)| v.abs())
        .fold(0.0_f64, f64::max);
    let label_width = spec
        .bars
        .iter()
        .map(|(l, _)| UnicodeWidthStr::width(l.as_str()))
        .max()
        .unwrap_or(0);
    for (label, value) in &spec.bars {
        let len = if max > 0.0 {
            ((value.abs() / max) * CHART_WIDTH as f64).round() as usize
        } else {
            0
        };
        let pad = label_width - UnicodeWidthStr::width(label.as_str());
        out.push_str(label);
        out.push_str(&" ".repeat(pad));
        out.push_str("  ");
        out.push_str(&"█".repeat(len.max(1)));
        out.push_str(&format!(" {}\n", format_float(*value)));
    }
    out
}

/// Plain printer for one-shot output segments.
pub struct TextPrinter {
    pub color: Option<&'static str>,
}

impl TextPrinter {
    pub fn print(&self, text: &str) {
        match self.color {
            Some("green") => println!("{}", text.green()),
            Some("cyan") => println!("{}", text.cyan()),
            Some("magenta") => println!("{}", text.magenta()),
            Some("yellow") => println!("{}", text.yellow()),
            Some("red") => println!("{}", text.red()),
            _ => println!("{}", text),
        }
    }
}

pub struct MarkdownPrinter {
    pub skin: MadSkin,
}

impl Default for MarkdownPrinter {
    fn default() -> Self {
        Self { skin: MadSkin::default() }
    }
}

impl MarkdownPrinter {
    pub fn print(&self, text: &str) {
        self.skin.print_text(text);
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Cell, Series, Table};

    #[test]
    fn scalars_render_as_plain_strings() {
        assert_eq!(render_value(&Value::Int(42)), "42\n");
        assert_eq!(render_value(&Value::Float(2.5)), "2.5\n");
        assert_eq!(render_value(&Value::Float(40.0)), "40\n");
        assert_eq!(render_value(&Value::Str("ok".into())), "ok\n");
    }

    #[test]
    fn tables_render_without_an_index_column() {
        let t = Table::new(vec![Series::new("age", vec![Cell::Int(40)])]).unwrap();
        let rendered = render_value(&Value::Table(t));
        assert!(rendered.starts_with("age\n"));
        assert!(!rendered.contains("0 "));
    }

    #[test]
    fn lists_render_one_element_per_line() {
        let v = Value::List(vec![Value::Int(1), Value::Str("two".into())]);
        assert_eq!(render_value(&v), "1\ntwo\n");
    }

    #[test]
    fn chart_scales_bars_to_the_maximum() {
        let spec = ChartSpec {
            title: "hp by name".into(),
            bars: vec![("a".into(), 10.0), ("b".into(), 20.0)],
        };
        let rendered = render_chart(&spec);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "hp by name");
        let a_bars = lines[1].matches('█').count();
        let b_bars = lines[2].matches('█').count();
        assert_eq!(b_bars, CHART_WIDTH);
        assert_eq!(a_bars, CHART_WIDTH / 2);
    }

    #[test]
    fn float_formatting_trims_noise() {
        assert_eq!(format_float(85.0), "85");
        assert_eq!(format_float(1.0 / 3.0), "0.3333");
    }
}
