use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Print `value` as one compact JSON line.
pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn new_table<I, S>(header: I) -> Table
where
    I: IntoIterator<Item = S>,
    S: Into<comfy_table::Cell>,
{
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

/// Two-column table of a flat JSON object, in field order.
pub fn key_value_table<T: Serialize>(value: &T) -> Table {
    let mut table = new_table(["FIELD", "VALUE"]);
    if let Ok(serde_json::Value::Object(fields)) = serde_json::to_value(value) {
        for (key, value) in fields {
            table.add_row(vec![key, display_value(&value)]);
        }
    }
    table
}

/// `key=value` pairs of a flat JSON object, space-separated.
pub fn key_value_line<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::Object(fields)) => fields
            .iter()
            .map(|(key, value)| format!("{key}={}", display_value(value)))
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
