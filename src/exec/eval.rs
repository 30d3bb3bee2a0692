//! Evaluator: walks the AST against a transient namespace.

use std::collections::HashMap;

use super::ast::{BinOp, Expr, Stmt, StmtKind, UnOp};
use super::{ChartSpec, ExecError, Value};
use crate::table::{Cell, Series, Table};

/// Per-invocation binding environment. Created with the table bound under
/// its conventional name, discarded when the fragment finishes.
#[derive(Debug)]
pub struct Namespace {
    vars: HashMap<String, Value>,
}

impl Namespace {
    pub fn with_table(table: Table) -> Self {
        let mut vars = HashMap::new();
        vars.insert("table".to_string(), Value::Table(table));
        Self { vars }
    }

    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.vars.remove(name)
    }

    pub fn exec(&mut self, stmt: &Stmt) -> Result<(), ExecError> {
        match &stmt.kind {
            StmtKind::Assign { name, expr } => {
                let value = self.eval(expr)?;
                self.vars.insert(name.clone(), value);
            }
            // A bare expression is evaluated for its errors and dropped.
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
        }
        Ok(())
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value, ExecError> {
        match expr {
            Expr::Int(v) => Ok(Value::Int(*v)),
            Expr::Float(v) => Ok(Value::Float(*v)),
            Expr::Str(v) => Ok(Value::Str(v.clone())),
            Expr::Bool(v) => Ok(Value::Bool(*v)),
            Expr::Ident(name) => self
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| ExecError::eval(format!("unknown name '{}'", name))),
            Expr::List(items) => {
                let values = items.iter().map(|e| self.eval(e)).collect::<Result<_, _>>()?;
                Ok(Value::List(values))
            }
            Expr::Unary { op, expr } => apply_unary(*op, self.eval(expr)?),
            Expr::Binary { op, lhs, rhs } => apply_binary(*op, self.eval(lhs)?, self.eval(rhs)?),
            Expr::Index { target, index } => apply_index(self.eval(target)?, self.eval(index)?),
            Expr::Call { target, method, args } => {
                let args = args.iter().map(|e| self.eval(e)).collect::<Result<Vec<_>, _>>()?;
                apply_call(self.eval(target)?, method, args)
            }
        }
    }
}

fn apply_unary(op: UnOp, value: Value) -> Result<Value, ExecError> {
    match (op, value) {
        (UnOp::Neg, Value::Int(v)) => Ok(Value::Int(-v)),
        (UnOp::Neg, Value::Float(v)) => Ok(Value::Float(-v)),
        (UnOp::Neg, Value::Column(s)) => map_cells(&s, |c| match c {
            Cell::Int(v) => Ok(Cell::Int(-v)),
            Cell::Float(v) => Ok(Cell::Float(-v)),
            Cell::Null => Ok(Cell::Null),
            other => Err(ExecError::eval(format!("cannot negate {}", other))),
        }),
        (UnOp::Not, Value::Bool(v)) => Ok(Value::Bool(!v)),
        (UnOp::Not, Value::Column(s)) => map_cells(&s, |c| match c {
            Cell::Bool(v) => Ok(Cell::Bool(!v)),
            Cell::Null => Ok(Cell::Null),
            other => Err(ExecError::eval(format!("'not' needs a boolean, got {}", other))),
        }),
        (UnOp::Neg, v) => Err(ExecError::eval(format!("cannot negate a {}", v.type_name()))),
        (UnOp::Not, v) => Err(ExecError::eval(format!("'not' needs a boolean, got {}", v.type_name()))),
    }
}

fn map_cells(
    series: &Series,
    f: impl Fn(&Cell) -> Result<Cell, ExecError>,
) -> Result<Value, ExecError> {
    let cells = series.cells.iter().map(|c| f(c)).collect::<Result<_, _>>()?;
    Ok(Value::Column(Series::new(series.name.clone(), cells)))
}

fn scalar_to_cell(value: &Value) -> Option<Cell> {
    match value {
        Value::Int(v) => Some(Cell::Int(*v)),
        Value::Float(v) => Some(Cell::Float(*v)),
        Value::Str(v) => Some(Cell::Str(v.clone())),
        Value::Bool(v) => Some(Cell::Bool(*v)),
        _ => None,
    }
}

fn cell_to_value(cell: &Cell) -> Value {
    match cell {
        Cell::Int(v) => Value::Int(*v),
        Cell::Float(v) => Value::Float(*v),
        Cell::Str(v) => Value::Str(v.clone()),
        Cell::Bool(v) => Value::Bool(*v),
        Cell::Null => Value::Str(String::new()),
    }
}

fn apply_binary(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, ExecError> {
    use BinOp::*;
    match op {
        And | Or => apply_logic(op, lhs, rhs),
        Eq | Ne | Lt | Le | Gt | Ge => apply_compare(op, lhs, rhs),
        Add | Sub | Mul | Div => apply_arith(op, lhs, rhs),
    }
}

fn apply_logic(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, ExecError> {
    let combine = |a: bool, b: bool| match op {
        BinOp::And => a && b,
        _ => a || b,
    };
    match (lhs, rhs) {
        (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(combine(a, b))),
        (Value::Column(a), Value::Column(b)) => {
            if a.len() != b.len() {
                return Err(ExecError::eval(format!(
                    "mask length mismatch: {} vs {}",
                    a.len(),
                    b.len()
                )));
            }
            let cells = a
                .cells
                .iter()
                .zip(&b.cells)
                .map(|(x, y)| match (x, y) {
                    (Cell::Bool(x), Cell::Bool(y)) => Ok(Cell::Bool(combine(*x, *y))),
                    // Null in a mask fails the row rather than the program.
                    (Cell::Null, _) | (_, Cell::Null) => Ok(Cell::Bool(false)),
                    _ => Err(ExecError::eval("mask operators need boolean columns")),
                })
                .collect::<Result<_, _>>()?;
            Ok(Value::Column(Series::new(a.name.clone(), cells)))
        }
        (lhs, rhs) => Err(ExecError::eval(format!(
            "cannot combine {} and {} with a mask operator",
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn compare_cells(op: BinOp, a: &Cell, b: &Cell) -> bool {
    if a.is_null() || b.is_null() {
        // Comparisons against null never match, so masks drop those rows.
        return false;
    }
    let ord = a.compare(b);
    match op {
        BinOp::Eq => ord == std::cmp::Ordering::Equal,
        BinOp::Ne => ord != std::cmp::Ordering::Equal,
        BinOp::Lt => ord == std::cmp::Ordering::Less,
        BinOp::Le => ord != std::cmp::Ordering::Greater,
        BinOp::Gt => ord == std::cmp::Ordering::Greater,
        BinOp::Ge => ord != std::cmp::Ordering::Less,
        _ => false,
    }
}

fn apply_compare(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, ExecError> {
    match (&lhs, &rhs) {
        (Value::Column(a), Value::Column(b)) => {
            if a.len() != b.len() {
                return Err(ExecError::eval(format!(
                    "column length mismatch: {} vs {}",
                    a.len(),
                    b.len()
                )));
            }
            let cells = a
                .cells
                .iter()
                .zip(&b.cells)
                .map(|(x, y)| Cell::Bool(compare_cells(op, x, y)))
                .collect();
            Ok(Value::Column(Series::new(a.name.clone(), cells)))
        }
        (Value::Column(a), _) => {
            let rhs_cell = scalar_to_cell(&rhs)
                .ok_or_else(|| ExecError::eval(format!("cannot compare a column with a {}", rhs.type_name())))?;
            let cells = a
                .cells
                .iter()
                .map(|c| Cell::Bool(compare_cells(op, c, &rhs_cell)))
                .collect();
            Ok(Value::Column(Series::new(a.name.clone(), cells)))
        }
        (_, Value::Column(b)) => {
            let lhs_cell = scalar_to_cell(&lhs)
                .ok_or_else(|| ExecError::eval(format!("cannot compare a {} with a column", lhs.type_name())))?;
            let cells = b
                .cells
                .iter()
                .map(|c| Cell::Bool(compare_cells(op, &lhs_cell, c)))
                .collect();
            Ok(Value::Column(Series::new(b.name.clone(), cells)))
        }
        _ => {
            let a = scalar_to_cell(&lhs);
            let b = scalar_to_cell(&rhs);
            match (a, b) {
                (Some(a), Some(b)) => Ok(Value::Bool(compare_cells(op, &a, &b))),
                _ => Err(ExecError::eval(format!(
                    "cannot compare {} with {}",
                    lhs.type_name(),
                    rhs.type_name()
                ))),
            }
        }
    }
}

fn arith_cells(op: BinOp, a: &Cell, b: &Cell) -> Result<Cell, ExecError> {
    if a.is_null() || b.is_null() {
        return Ok(Cell::Null);
    }
    if let (Cell::Str(x), Cell::Str(y), BinOp::Add) = (a, b, op) {
        return Ok(Cell::Str(format!("{}{}", x, y)));
    }
    let to_f = |c: &Cell| match c {
        Cell::Int(v) => Some(*v as f64),
        Cell::Float(v) => Some(*v),
        _ => None,
    };
    let (x, y) = match (to_f(a), to_f(b)) {
        (Some(x), Some(y)) => (x, y),
        _ => {
            return Err(ExecError::eval(format!(
                "arithmetic needs numbers, got {} and {}",
                a, b
            )))
        }
    };
    // Integer inputs keep integer results except for division.
    let both_int = matches!((a, b), (Cell::Int(_), Cell::Int(_)));
    let result = match op {
        BinOp::Add => x + y,
        BinOp::Sub => x - y,
        BinOp::Mul => x * y,
        BinOp::Div => {
            if y == 0.0 {
                return Err(ExecError::eval("division by zero"));
            }
            return Ok(Cell::Float(x / y));
        }
        _ => unreachable!(),
    };
    if both_int {
        Ok(Cell::Int(result as i64))
    } else {
        Ok(Cell::Float(result))
    }
}

fn apply_arith(op: BinOp, lhs: Value, rhs: Value) -> Result<Value, ExecError> {
    match (&lhs, &rhs) {
        (Value::Column(a), Value::Column(b)) => {
            if a.len() != b.len() {
                return Err(ExecError::eval(format!(
                    "column length mismatch: {} vs {}",
                    a.len(),
                    b.len()
                )));
            }
            let cells = a
                .cells
                .iter()
                .zip(&b.cells)
                .map(|(x, y)| arith_cells(op, x, y))
                .collect::<Result<_, _>>()?;
            Ok(Value::Column(Series::new(a.name.clone(), cells)))
        }
        (Value::Column(a), _) => {
            let b = scalar_to_cell(&rhs)
                .ok_or_else(|| ExecError::eval(format!("cannot mix a column with a {}", rhs.type_name())))?;
            map_cells(a, |c| arith_cells(op, c, &b))
        }
        (_, Value::Column(b)) => {
            let a = scalar_to_cell(&lhs)
                .ok_or_else(|| ExecError::eval(format!("cannot mix a {} with a column", lhs.type_name())))?;
            map_cells(b, |c| arith_cells(op, &a, c))
        }
        _ => {
            let a = scalar_to_cell(&lhs);
            let b = scalar_to_cell(&rhs);
            match (a, b) {
                (Some(a), Some(b)) => Ok(cell_to_value(&arith_cells(op, &a, &b)?)),
                _ => Err(ExecError::eval(format!(
                    "arithmetic needs numbers, got {} and {}",
                    lhs.type_name(),
                    rhs.type_name()
                ))),
            }
        }
    }
}

fn apply_index(target: Value, index: Value) -> Result<Value, ExecError> {
    let Value::Table(table) = target else {
        return Err(ExecError::eval(format!("cannot index a {}", target.type_name())));
    };
    match index {
        Value::Str(name) => table
            .column(&name)
            .cloned()
            .map(Value::Column)
            .ok_or_else(|| ExecError::eval(format!("unknown column '{}'", name))),
        Value::List(items) => {
            let mut names = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Str(name) => names.push(name),
                    other => {
                        return Err(ExecError::eval(format!(
                            "projection list must contain column names, got {}",
                            other.type_name()
                        )))
                    }
                }
            }
            table.select(&names).map(Value::Table).map_err(ExecError::eval)
        }
        Value::Column(mask) => {
            if mask.len() != table.rows() {
                return Err(ExecError::eval(format!(
                    "mask has {} rows but the table has {}",
                    mask.len(),
                    table.rows()
                )));
            }
            let mut bools = Vec::with_capacity(mask.len());
            for cell in &mask.cells {
                match cell {
                    Cell::Bool(b) => bools.push(*b),
                    Cell::Null => bools.push(false),
                    _ => return Err(ExecError::eval("filter mask must be boolean")),
                }
            }
            Ok(Value::Table(table.filter(&bools)))
        }
        other => Err(ExecError::eval(format!(
            "cannot index a table with a {}",
            other.type_name()
        ))),
    }
}

fn apply_call(target: Value, method: &str, args: Vec<Value>) -> Result<Value, ExecError> {
    match target {
        Value::Table(table) => table_method(table, method, args),
        Value::Column(series) => column_method(series, method, args),
        other => Err(ExecError::eval(format!(
            "{} has no methods (called '{}')",
            other.type_name(),
            method
        ))),
    }
}

fn want_int(value: &Value, what: &str) -> Result<i64, ExecError> {
    match value {
        Value::Int(v) => Ok(*v),
        other => Err(ExecError::eval(format!("{} needs an integer, got {}", what, other.type_name()))),
    }
}

fn want_str(value: &Value, what: &str) -> Result<String, ExecError> {
    match value {
        Value::Str(v) => Ok(v.clone()),
        other => Err(ExecError::eval(format!("{} needs a column name, got {}", what, other.type_name()))),
    }
}

fn table_method(table: Table, method: &str, args: Vec<Value>) -> Result<Value, ExecError> {
    match (method, args.as_slice()) {
        ("head", [n]) => {
            let n = want_int(n, "head")?;
            Ok(Value::Table(table.head(n.max(0) as usize)))
        }
        ("head", []) => Ok(Value::Table(table.head(5))),
        ("count", []) => Ok(Value::Int(table.rows() as i64)),
        ("sort_values", [col]) => {
            let col = want_str(col, "sort_values")?;
            table.sort_by(&col, true).map(Value::Table).map_err(ExecError::eval)
        }
        ("sort_values", [col, Value::Bool(ascending)]) => {
            let col = want_str(col, "sort_values")?;
            table.sort_by(&col, *ascending).map(Value::Table).map_err(ExecError::eval)
        }
        ("bar_chart", [labels, values]) => {
            let label_col = want_str(labels, "bar_chart")?;
            let value_col = want_str(values, "bar_chart")?;
            bar_chart(&table, &label_col, &value_col)
        }
        _ => Err(ExecError::eval(format!(
            "table has no method '{}' with {} argument(s)",
            method,
            args.len()
        ))),
    }
}

fn bar_chart(table: &Table, label_col: &str, value_col: &str) -> Result<Value, ExecError> {
    let labels = table
        .column(label_col)
        .ok_or_else(|| ExecError::eval(format!("unknown column '{}'", label_col)))?;
    let values = table
        .column(value_col)
        .ok_or_else(|| ExecError::eval(format!("unknown column '{}'", value_col)))?;
    let mut bars = Vec::new();
    for (label, value) in labels.cells.iter().zip(&values.cells) {
        let v = match value {
            Cell::Int(v) => *v as f64,
            Cell::Float(v) => *v,
            Cell::Null => continue,
            other => {
                return Err(ExecError::eval(format!(
                    "bar_chart values must be numeric, got {}",
                    other
                )))
            }
        };
        bars.push((label.to_string(), v));
    }
    Ok(Value::Chart(ChartSpec {
        title: format!("{} by {}", value_col, label_col),
        bars,
    }))
}

fn numeric_cells(series: &Series) -> Result<(Vec<f64>, bool), ExecError> {
    let mut out = Vec::new();
    let mut all_int = true;
    for cell in &series.cells {
        match cell {
            Cell::Int(v) => out.push(*v as f64),
            Cell::Float(v) => {
                all_int = false;
                out.push(*v);
            }
            Cell::Null => {}
            other => {
                return Err(ExecError::eval(format!(
                    "column '{}' is not numeric (found {})",
                    series.name, other
                )))
            }
        }
    }
    Ok((out, all_int))
}

fn column_method(series: Series, method: &str, args: Vec<Value>) -> Result<Value, ExecError> {
    match (method, args.as_slice()) {
        ("count", []) => {
            let n = series.cells.iter().filter(|c| !c.is_null()).count();
            Ok(Value::Int(n as i64))
        }
        ("sum", []) => {
            let (nums, all_int) = numeric_cells(&series)?;
            let total: f64 = nums.iter().sum();
            if all_int {
                Ok(Value::Int(total as i64))
            } else {
                Ok(Value::Float(total))
            }
        }
        ("mean", []) => {
            let (nums, _) = numeric_cells(&series)?;
            if nums.is_empty() {
                return Err(ExecError::eval(format!(
                    "mean of column '{}' with no values",
                    series.name
                )));
            }
            Ok(Value::Float(nums.iter().sum::<f64>() / nums.len() as f64))
        }
        ("min", []) | ("max", []) => {
            let pick = series
                .cells
                .iter()
                .filter(|c| !c.is_null())
                .reduce(|a, b| {
                    let keep_a = match method {
                        "min" => a.compare(b) != std::cmp::Ordering::Greater,
                        _ => a.compare(b) != std::cmp::Ordering::Less,
                    };
                    if keep_a {
                        a
                    } else {
                        b
                    }
                })
                .ok_or_else(|| {
                    ExecError::eval(format!(
                        "{} of column '{}' with no values",
                        method, series.name
                    ))
                })?;
            Ok(cell_to_value(pick))
        }
        ("head", [n]) => {
            let n = want_int(n, "head")?.max(0) as usize;
            Ok(Value::Column(Series::new(
                series.name.clone(),
                series.cells.iter().take(n).cloned().collect(),
            )))
        }
        ("unique", []) => {
            let mut seen = Vec::new();
            for cell in &series.cells {
                if !seen.contains(cell) {
                    seen.push(cell.clone());
                }
            }
            Ok(Value::Column(Series::new(series.name.clone(), seen)))
        }
        ("value_counts", []) => {
            let mut distinct: Vec<(Cell, i64)> = Vec::new();
            for cell in &series.cells {
                if cell.is_null() {
                    continue;
                }
                match distinct.iter_mut().find(|(c, _)| c == cell) {
                    Some((_, n)) => *n += 1,
                    None => distinct.push((cell.clone(), 1)),
                }
            }
            distinct.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.compare(&b.0)));
            let (values, counts): (Vec<Cell>, Vec<Cell>) = distinct
                .into_iter()
                .map(|(c, n)| (c, Cell::Int(n)))
                .unzip();
            let table = Table::new(vec![
                Series::new(series.name.clone(), values),
                Series::new("count", counts),
            ])
            .map_err(|e| ExecError::eval(e.to_string()))?;
            Ok(Value::Table(table))
        }
        _ => Err(ExecError::eval(format!(
            "column has no method '{}' with {} argument(s)",
            method,
            args.len()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::super::run_fragment;
    use super::*;

    fn pokemon() -> Table {
        Table::new(vec![
            Series::new(
                "name",
                vec![
                    Cell::Str("Pikachu".into()),
                    Cell::Str("Snorlax".into()),
                    Cell::Str("Gengar".into()),
                ],
            ),
            Series::new("hp", vec![Cell::Int(35), Cell::Int(160), Cell::Int(60)]),
            Series::new(
                "type",
                vec![
                    Cell::Str("Electric".into()),
                    Cell::Str("Normal".into()),
                    Cell::Str("Ghost".into()),
                ],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn aggregates_over_a_column() {
        let t = pokemon();
        assert_eq!(run_fragment("ANSWER = table['hp'].sum()", &t), Ok(Value::Int(255)));
        assert_eq!(run_fragment("ANSWER = table['hp'].mean()", &t), Ok(Value::Float(85.0)));
        assert_eq!(run_fragment("ANSWER = table['hp'].max()", &t), Ok(Value::Int(160)));
        assert_eq!(run_fragment("ANSWER = table['hp'].count()", &t), Ok(Value::Int(3)));
    }

    #[test]
    fn sort_then_head_then_project() {
        let code = "top = table.sort_values('hp', False).head(1)\nANSWER = top[['name', 'hp']]";
        match run_fragment(code, &pokemon()).unwrap() {
            Value::Table(t) => {
                assert_eq!(t.column_names(), vec!["name", "hp"]);
                assert_eq!(t.column("name").unwrap().cells[0], Cell::Str("Snorlax".into()));
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn masks_combine_with_and() {
        let code = "ANSWER = table[(table['hp'] > 30) & (table['type'] == 'Electric')]";
        match run_fragment(code, &pokemon()).unwrap() {
            Value::Table(t) => {
                assert_eq!(t.rows(), 1);
                assert_eq!(t.column("name").unwrap().cells[0], Cell::Str("Pikachu".into()));
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn arithmetic_between_columns() {
        let code = "ANSWER = (table['hp'] * 2).sum()";
        assert_eq!(run_fragment(code, &pokemon()), Ok(Value::Int(510)));
    }

    #[test]
    fn value_counts_builds_a_sorted_table() {
        let t = Table::new(vec![Series::new(
            "type",
            vec![
                Cell::Str("Fire".into()),
                Cell::Str("Water".into()),
                Cell::Str("Fire".into()),
            ],
        )])
        .unwrap();
        match run_fragment("ANSWER = table['type'].value_counts()", &t).unwrap() {
            Value::Table(counts) => {
                assert_eq!(counts.column_names(), vec!["type", "count"]);
                assert_eq!(counts.column("type").unwrap().cells[0], Cell::Str("Fire".into()));
                assert_eq!(counts.column("count").unwrap().cells[0], Cell::Int(2));
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn bar_chart_produces_a_spec() {
        let code = "ANSWER = table.bar_chart('name', 'hp')";
        match run_fragment(code, &pokemon()).unwrap() {
            Value::Chart(spec) => {
                assert_eq!(spec.title, "hp by name");
                assert_eq!(spec.bars.len(), 3);
                assert_eq!(spec.bars[1], ("Snorlax".into(), 160.0));
            }
            other => panic!("expected chart, got {:?}", other),
        }
    }

    #[test]
    fn division_by_zero_is_reported_not_panicked() {
        let err = run_fragment("ANSWER = 1 / 0", &pokemon()).unwrap_err();
        assert_eq!(err, ExecError::Eval("division by zero".into()));
    }

    #[test]
    fn unknown_name_mentions_the_identifier() {
        let err = run_fragment("ANSWER = df['hp']", &pokemon()).unwrap_err();
        assert_eq!(err, ExecError::Eval("unknown name 'df'".into()));
    }

    #[test]
    fn namespace_is_discarded_between_fragments() {
        let t = pokemon();
        assert!(run_fragment("leftover = 1\nANSWER = leftover", &t).is_ok());
        let err = run_fragment("ANSWER = leftover", &t).unwrap_err();
        assert_eq!(err, ExecError::Eval("unknown name 'leftover'".into()));
    }
}
