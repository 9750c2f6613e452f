//! Table formatting utilities for CLI list commands
//!
//! Every list command builds a [`TableOutput`] and prints it in the format
//! selected with `--format`. Terminal and markdown tables are rendered with
//! `tabled`; TSV and CSV stay single-line per row for pipability.

use console::style;
use serde_json::{Map, Value};
use tabled::{builder::Builder, settings::Style, Table};

use crate::cli::helpers::{escape_csv, json_key, truncate_str};
use crate::cli::OutputFormat;

/// Maximum width of text columns in terminal output
const TEXT_WIDTH: usize = 48;

/// A typed cell value
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Numeric record id
    Id(i64),
    /// Count of something
    Number(usize),
    /// Plain text, truncated in terminal output
    Text(String),
    /// Missing value
    Empty,
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Text, or [`CellValue::Empty`] when absent or blank
    pub fn optional(s: Option<&str>) -> Self {
        match s {
            Some(s) if !s.trim().is_empty() => CellValue::Text(s.to_string()),
            _ => CellValue::Empty,
        }
    }

    /// Unformatted value (empty string for missing values)
    pub fn raw(&self) -> String {
        match self {
            CellValue::Id(id) => id.to_string(),
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Empty => String::new(),
        }
    }

    fn format_terminal(&self) -> String {
        match self {
            CellValue::Text(s) => truncate_str(s, TEXT_WIDTH),
            CellValue::Empty => "-".to_string(),
            other => other.raw(),
        }
    }

    fn format_tsv(&self) -> String {
        self.raw().replace(['\t', '\n'], " ")
    }

    fn format_md(&self) -> String {
        match self {
            CellValue::Empty => "-".to_string(),
            other => other.raw().replace('|', "\\|"),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            CellValue::Id(id) => Value::from(*id),
            CellValue::Number(n) => Value::from(*n),
            CellValue::Text(s) => Value::from(s.as_str()),
            CellValue::Empty => Value::Null,
        }
    }
}

/// Rows of typed cells under fixed headers
pub struct TableOutput {
    noun: &'static str,
    headers: Vec<&'static str>,
    rows: Vec<Vec<CellValue>>,
}

impl TableOutput {
    /// `noun` is used in the summary line ("3 location(s) found")
    pub fn new(noun: &'static str, headers: &[&'static str]) -> Self {
        Self {
            noun,
            headers: headers.to_vec(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<CellValue>) {
        debug_assert_eq!(row.len(), self.headers.len());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render the table body in the given format
    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Auto => self
                .build_tabled(CellValue::format_terminal)
                .with(Style::psql())
                .to_string(),
            OutputFormat::Md => self
                .build_tabled(CellValue::format_md)
                .with(Style::markdown())
                .to_string(),
            OutputFormat::Tsv => self.render_delimited("\t", |h| h.to_string(), CellValue::format_tsv),
            OutputFormat::Csv => self.render_delimited(",", escape_csv, |c| escape_csv(&c.raw())),
            OutputFormat::Json => self.render_json(),
        }
    }

    /// Print the table, followed by a summary line for terminal output
    pub fn print(&self, format: OutputFormat, quiet: bool) {
        if format == OutputFormat::Auto && self.is_empty() {
            if !quiet {
                println!("{}", style(format!("No {}s found.", self.noun)).dim());
            }
            return;
        }

        println!("{}", self.render(format));

        if format == OutputFormat::Auto && !quiet {
            println!();
            println!("{} {}(s) found.", style(self.len()).cyan(), self.noun);
        }
    }

    fn build_tabled(&self, cell: fn(&CellValue) -> String) -> Table {
        let mut builder = Builder::default();
        builder.push_record(self.headers.iter().copied());
        for row in &self.rows {
            builder.push_record(row.iter().map(cell));
        }
        builder.build()
    }

    fn render_delimited<H, C>(&self, sep: &str, header: H, cell: C) -> String
    where
        H: Fn(&str) -> String,
        C: Fn(&CellValue) -> String,
    {
        let mut lines = Vec::with_capacity(self.rows.len() + 1);
        lines.push(
            self.headers
                .iter()
                .map(|h| header(*h))
                .collect::<Vec<_>>()
                .join(sep),
        );
        for row in &self.rows {
            lines.push(row.iter().map(&cell).collect::<Vec<_>>().join(sep));
        }
        lines.join("\n")
    }

    fn render_json(&self) -> String {
        let records: Vec<Value> = self
            .rows
            .iter()
            .map(|row| {
                let obj: Map<String, Value> = self
                    .headers
                    .iter()
                    .zip(row)
                    .map(|(h, c)| (json_key(h), c.to_json()))
                    .collect();
                Value::Object(obj)
            })
            .collect();
        serde_json::to_string_pretty(&records).unwrap_or_default()
    }
}
