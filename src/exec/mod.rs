//! Restricted query interpreter.
//!
//! Model-generated programs are never handed to a host-language runtime.
//! They are parsed into a small expression AST and evaluated against the
//! table in-process, so a program can at most read the dataset and burn a
//! little CPU. The surface syntax is pandas-flavored because that is what
//! chat models reliably produce for tabular questions.
//!
//! Each invocation gets a fresh namespace seeded with a copy of the table
//! under the name `table`; nothing a program does can leak into later turns.

use thiserror::Error;

use crate::prompt::ANSWER_VAR;
use crate::table::{Series, Table};

mod ast;
mod eval;
mod lexer;
mod parser;

pub use eval::Namespace;

/// What the designated result variable may hold after execution.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Column(Series),
    Table(Table),
    List(Vec<Value>),
    Chart(ChartSpec),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bool(_) => "bool",
            Value::Column(_) => "column",
            Value::Table(_) => "table",
            Value::List(_) => "list",
            Value::Chart(_) => "chart",
        }
    }
}

/// Declarative chart produced by `bar_chart`; rendering decides how to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub bars: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecError {
    #[error("syntax error on line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("{0}")]
    Eval(String),
    #[error("the program ran but never assigned {ANSWER_VAR}")]
    NoAnswer,
}

impl ExecError {
    pub(crate) fn syntax(line: usize, message: impl Into<String>) -> Self {
        ExecError::Syntax { line, message: message.into() }
    }

    pub(crate) fn eval(message: impl Into<String>) -> Self {
        ExecError::Eval(message.into())
    }
}

/// Run one code fragment against the table and return whatever it left in
/// the designated result variable.
pub fn run_fragment(code: &str, table: &Table) -> Result<Value, ExecError> {
    let tokens = lexer::lex(code)?;
    let program = parser::parse(&tokens)?;
    let mut ns = Namespace::with_table(table.clone());
    for stmt in &program {
        ns.exec(stmt)?;
    }
    ns.take(ANSWER_VAR).ok_or(ExecError::NoAnswer)
}
