use std::collections::BTreeSet;
use std::io::{self, Write};

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use serde_json::{Map, Value};
use tabled::builder::Builder;
use tabled::settings::Style;

/// Columns shown for Discord message objects in table and csv output.
const MESSAGE_COLUMNS: [&str; 4] = ["id", "timestamp", "author", "content"];

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
    Csv,
    Quiet,
}

pub struct OutputRenderer {
    format: OutputFormat,
}

impl OutputRenderer {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn render<T: Serialize>(&self, value: &T) -> Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.render_to(value, &mut out)
    }

    pub fn render_to<T: Serialize, W: Write>(&self, value: &T, out: &mut W) -> Result<()> {
        let value = serde_json::to_value(value)?;

        let rendered = match self.format {
            OutputFormat::Table => Self::table(&value),
            OutputFormat::Json => None,
            OutputFormat::Yaml => Some(serde_yaml::to_string(&value)?.trim_end().to_string()),
            OutputFormat::Csv => Self::csv(&value),
            OutputFormat::Quiet => Self::quiet(&value),
        };

        match rendered {
            Some(text) => writeln!(out, "{text}")?,
            None if self.format == OutputFormat::Quiet => {}
            None => writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?,
        }

        Ok(())
    }

    fn table(value: &Value) -> Option<String> {
        let (headers, rows) = match value {
            Value::Object(obj) if !obj.is_empty() => Self::field_rows(obj),
            other => Self::coerce_rows(other)?,
        };

        let mut builder = Builder::default();
        builder.push_record(headers);
        for row in rows {
            builder.push_record(row);
        }

        Some(builder.build().with(Style::rounded()).to_string())
    }

    fn csv(value: &Value) -> Option<String> {
        let (headers, rows) = Self::coerce_rows(value)?;

        let mut lines = Vec::with_capacity(rows.len() + 1);
        lines.push(headers.join(","));
        for row in rows {
            let cells: Vec<String> = row.iter().map(|cell| Self::csv_escape(cell)).collect();
            lines.push(cells.join(","));
        }

        Some(lines.join("\n"))
    }

    /// One id per line, or the bare value for scalars.
    fn quiet(value: &Value) -> Option<String> {
        let lines: Vec<String> = match value {
            Value::Array(rows) => rows.iter().filter_map(Self::quiet_line).collect(),
            Value::Object(obj) => obj
                .get("id")
                .map(Self::value_to_string)
                .into_iter()
                .collect(),
            other => Self::quiet_line(other).into_iter().collect(),
        };

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    fn quiet_line(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::Object(obj) => obj.get("id").map(Self::value_to_string),
            other => Some(Self::value_to_string(other)),
        }
    }

    /// A single object as a two-column field/value table.
    fn field_rows(obj: &Map<String, Value>) -> (Vec<String>, Vec<Vec<String>>) {
        let rows = obj
            .iter()
            .map(|(key, value)| vec![key.clone(), Self::value_to_string(value)])
            .collect();
        (vec!["field".to_string(), "value".to_string()], rows)
    }

    fn coerce_rows(value: &Value) -> Option<(Vec<String>, Vec<Vec<String>>)> {
        let rows = match value {
            Value::Array(rows) if !rows.is_empty() => rows,
            _ => return None,
        };

        let objects: Vec<&Map<String, Value>> = rows.iter().filter_map(Value::as_object).collect();
        if objects.is_empty() {
            return None;
        }

        let headers: Vec<String> = if objects.iter().all(|obj| Self::is_message(obj)) {
            MESSAGE_COLUMNS.iter().map(|c| c.to_string()).collect()
        } else {
            objects
                .iter()
                .flat_map(|obj| obj.keys().cloned())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        };

        let data = objects
            .iter()
            .map(|obj| {
                headers
                    .iter()
                    .map(|header| {
                        obj.get(header)
                            .map(Self::value_to_string)
                            .unwrap_or_default()
                    })
                    .collect()
            })
            .collect();

        Some((headers, data))
    }

    fn is_message(obj: &Map<String, Value>) -> bool {
        obj.contains_key("id") && obj.contains_key("content") && obj.contains_key("author")
    }

    fn value_to_string(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            Value::Object(obj) => match obj.get("username").and_then(Value::as_str) {
                Some(username) => username.to_string(),
                None => serde_json::to_string(value).unwrap_or_default(),
            },
            Value::Array(_) => serde_json::to_string(value).unwrap_or_default(),
        }
    }

    fn csv_escape(cell: &str) -> String {
        if cell.contains([',', '"', '\n', '\r']) {
            format!("\"{}\"", cell.replace('"', "\"\""))
        } else {
            cell.to_string()
        }
    }
}
