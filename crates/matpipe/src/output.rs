use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
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

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvalStatus {
    Ok,
    Error,
}

/// Outcome of one evaluated expression.
#[derive(Debug, Serialize)]
pub struct EvalRecord {
    pub expression: String,
    pub status: EvalStatus,
    pub output: String,
}

pub fn print_eval(records: &[EvalRecord], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for record in records {
                println!(
                    "{}",
                    serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["EXPRESSION", "STATUS", "OUTPUT"]);
            for record in records {
                table.add_row(vec![
                    record.expression.clone(),
                    status_text(record.status).to_string(),
                    record.output.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for record in records {
                println!(">> {}", record.expression);
                if !record.output.is_empty() {
                    println!("{}", record.output);
                }
            }
        }
        OutputFormat::Raw => {
            for record in records {
                print_raw(record.output.as_bytes());
            }
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn status_text(status: EvalStatus) -> &'static str {
    match status {
        EvalStatus::Ok => "ok",
        EvalStatus::Error => "ERROR",
    }
}
