//! Table and JSON rendering

use anyhow::Result;
use serde::Serialize;
use unicode_width::UnicodeWidthStr;

use crate::config::OutputFormat;

const COLUMN_GAP: usize = 3;

/// Left aligned text table, padded by display width
#[derive(Debug, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row<I, S>(&mut self, cells: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rows.push(cells.into_iter().map(Into::into).collect());
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let columns = self
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(self.headers.len()))
            .max()
            .unwrap_or(0);

        let mut widths = vec![0; columns];
        for line in std::iter::once(&self.headers).chain(&self.rows) {
            for (i, cell) in line.iter().enumerate() {
                widths[i] = widths[i].max(cell.width());
            }
        }

        let mut out = String::new();
        for line in std::iter::once(&self.headers).chain(&self.rows) {
            let mut rendered = String::new();
            for (i, cell) in line.iter().enumerate() {
                rendered.push_str(cell);
                if i + 1 < line.len() {
                    let pad = widths[i] - cell.width() + COLUMN_GAP;
                    rendered.extend(std::iter::repeat_n(' ', pad));
                }
            }
            out.push_str(rendered.trim_end());
            out.push('\n');
        }
        out
    }
}

/// Print `value` as pretty JSON, or as the table built by `table`
pub fn emit_table<T, F>(format: OutputFormat, value: &T, table: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce(&T) -> Table,
{
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table => {
            let table = table(value);
            if table.is_empty() {
                eprintln!("No resources found.");
            } else {
                print!("{}", table.render());
            }
        }
    }
    Ok(())
}

/// Print `value` as pretty JSON, or as the text built by `text`
pub fn emit_text<T, F>(format: OutputFormat, value: &T, text: F) -> Result<()>
where
    T: Serialize + ?Sized,
    F: FnOnce(&T) -> String,
{
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table => print!("{}", text(value)),
    }
    Ok(())
}

/// `-` for empty cells
pub fn or_dash(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

/// Comma separated list, `-` when empty
pub fn join_or_dash(values: &[String]) -> String {
    or_dash(&values.join(","))
}
