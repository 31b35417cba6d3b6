use std::io::BufRead;

use chatlane_frame::{decode_line, FrameError};
use chatlane_schema::{RegistryConfig, SchemaRegistry};
use serde::Serialize;
use serde_json::Value;

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, schema_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{new_table, print_json, OutputFormat};

#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
enum TokenStatus {
    Ok,
    Malformed,
    Invalid,
}

#[derive(Debug, Serialize)]
struct TokenRow {
    line: usize,
    sender: Option<String>,
    index: usize,
    tag: Option<String>,
    status: TokenStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let schemas = match &args.schemas {
        Some(dir) => Some(
            SchemaRegistry::from_directory_with_config(
                dir,
                RegistryConfig {
                    require_schema: args.require_schema,
                    ..RegistryConfig::default()
                },
            )
            .map_err(|err| schema_error("schema load failed", err))?,
        ),
        None => None,
    };

    let lines = match args.line {
        Some(line) => vec![line],
        None => read_stdin_lines()?,
    };

    let rows: Vec<TokenRow> = lines
        .iter()
        .enumerate()
        .flat_map(|(at, raw)| decode_rows(at + 1, raw, schemas.as_ref()))
        .collect();

    match format {
        OutputFormat::Json => rows.iter().for_each(print_json),
        OutputFormat::Table => {
            let mut table = new_table(["LINE", "SENDER", "#", "TAG", "STATUS", "DETAIL"]);
            for row in &rows {
                table.add_row(vec![
                    row.line.to_string(),
                    row.sender.clone().unwrap_or_default(),
                    row.index.to_string(),
                    row.tag.clone().unwrap_or_default(),
                    status_name(row.status).to_string(),
                    detail(row),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in &rows {
                println!(
                    "line={} sender={} token={} tag={} status={} {}",
                    row.line,
                    row.sender.as_deref().unwrap_or("-"),
                    row.index,
                    row.tag.as_deref().unwrap_or("-"),
                    status_name(row.status),
                    detail(row)
                );
            }
        }
    }

    if rows.iter().all(|row| row.status == TokenStatus::Ok) {
        Ok(SUCCESS)
    } else {
        Ok(DATA_INVALID)
    }
}

fn read_stdin_lines() -> CliResult<Vec<String>> {
    let mut lines = Vec::new();
    for line in std::io::stdin().lock().lines() {
        let line = line.map_err(|err| io_error("failed reading stdin", err))?;
        if !line.trim().is_empty() {
            lines.push(line);
        }
    }
    Ok(lines)
}

fn decode_rows(line: usize, raw: &str, schemas: Option<&SchemaRegistry>) -> Vec<TokenRow> {
    let frame = match decode_line(raw) {
        Ok(frame) => frame,
        Err(err) => return vec![malformed_row(line, None, 0, &err)],
    };

    frame
        .tokens
        .into_iter()
        .enumerate()
        .map(|(index, token)| match token.message {
            Ok(message) => {
                let check =
                    schemas.map(|schemas| schemas.validate(message.tag(), message.payload()));
                let (tag, payload) = message.into_parts();
                let (status, error) = match check {
                    Some(Err(err)) => (TokenStatus::Invalid, Some(err.to_string())),
                    _ => (TokenStatus::Ok, None),
                };
                TokenRow {
                    line,
                    sender: Some(frame.sender.clone()),
                    index,
                    tag: Some(tag),
                    status,
                    payload: Some(payload),
                    error,
                }
            }
            Err(err) => malformed_row(line, Some(frame.sender.clone()), index, &err),
        })
        .collect()
}

fn malformed_row(line: usize, sender: Option<String>, index: usize, err: &FrameError) -> TokenRow {
    TokenRow {
        line,
        sender,
        index,
        tag: None,
        status: TokenStatus::Malformed,
        payload: None,
        error: Some(err.to_string()),
    }
}

fn status_name(status: TokenStatus) -> &'static str {
    match status {
        TokenStatus::Ok => "ok",
        TokenStatus::Malformed => "malformed",
        TokenStatus::Invalid => "invalid",
    }
}

fn detail(row: &TokenRow) -> String {
    match (&row.error, &row.payload) {
        (Some(error), _) => error.clone(),
        (None, Some(payload)) => payload.to_string(),
        (None, None) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_per_token_with_malformed_sibling() {
        let rows = decode_rows(
            1,
            r#":alice!a@h PRIVMSG #logic :move###{"x":1}%%oops%%say###"hi""#,
            None,
        );
        let statuses: Vec<TokenStatus> = rows.iter().map(|row| row.status).collect();
        assert_eq!(
            statuses,
            [TokenStatus::Ok, TokenStatus::Malformed, TokenStatus::Ok]
        );
        assert_eq!(rows[2].tag.as_deref(), Some("say"));
        assert_eq!(rows[0].sender.as_deref(), Some("alice"));
    }

    #[test]
    fn unparseable_line_is_one_malformed_row() {
        let rows = decode_rows(3, "PING :tmi.example", None);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, TokenStatus::Malformed);
        assert_eq!(rows[0].line, 3);
        assert!(rows[0].sender.is_none());
    }

    #[test]
    fn schema_failures_marked_invalid() {
        let schemas = SchemaRegistry::from_embedded(&[(
            "move",
            r#"{"type":"object","properties":{"x":{"type":"integer","maximum":5}}}"#,
        )])
        .unwrap();
        let rows = decode_rows(
            1,
            r#":bob!b@h PRIVMSG #logic :move###{"x":9}%%move###{"x":2}"#,
            Some(&schemas),
        );
        assert_eq!(rows[0].status, TokenStatus::Invalid);
        assert!(rows[0].error.is_some());
        assert_eq!(rows[1].status, TokenStatus::Ok);
    }

    #[test]
    fn required_schema_marks_unknown_tags_invalid() {
        let mut schemas = SchemaRegistry::with_config(RegistryConfig {
            require_schema: true,
            ..RegistryConfig::default()
        });
        schemas.register("move", r#"{"type":"object"}"#).unwrap();
        let rows = decode_rows(
            1,
            r#":bob!b@h PRIVMSG #logic :move###{"x":1}%%jump###{}"#,
            Some(&schemas),
        );
        assert_eq!(rows[0].status, TokenStatus::Ok);
        assert_eq!(rows[1].status, TokenStatus::Invalid);
        assert!(rows[1].error.as_deref().unwrap().contains("jump"));
    }
}
