use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
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

/// Which side of the channel produced a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Helper,
    Server,
}

impl Origin {
    fn as_str(self) -> &'static str {
        match self {
            Origin::Helper => "helper",
            Origin::Server => "server",
        }
    }
}

/// One frame of a recorded helper session.
#[derive(Clone, Debug, Serialize)]
pub struct EventRecord {
    pub seq: usize,
    pub elapsed_ms: u64,
    pub from: Origin,
    pub opcode: &'static str,
    pub text: String,
}

/// How a `run` session ended.
#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub command: String,
    pub pid: Option<u32>,
    pub stop: &'static str,
    pub login: Option<bool>,
    pub auth: Option<String>,
    pub events: usize,
}

pub fn print_events(events: &[EventRecord], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for event in events {
                println!(
                    "{}",
                    serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "MS", "FROM", "OPCODE", "TEXT"]);
            for event in events {
                table.add_row(vec![
                    event.seq.to_string(),
                    event.elapsed_ms.to_string(),
                    event.from.as_str().to_string(),
                    event.opcode.to_string(),
                    event.text.clone(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for event in events {
                let arrow = match event.from {
                    Origin::Helper => "<-",
                    Origin::Server => "->",
                };
                println!(
                    "{:>6}ms {arrow} {} {}",
                    event.elapsed_ms, event.opcode, event.text
                );
            }
        }
    }
}

pub fn print_summary(summary: &SessionSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(summary).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["command".to_string(), summary.command.clone()])
                .add_row(vec!["pid".to_string(), optional(summary.pid)])
                .add_row(vec!["stop".to_string(), summary.stop.to_string()])
                .add_row(vec!["login".to_string(), login_text(summary.login).to_string()])
                .add_row(vec!["auth".to_string(), optional(summary.auth.as_deref())])
                .add_row(vec!["events".to_string(), summary.events.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "stop={} login={} auth={} events={}",
                summary.stop,
                login_text(summary.login),
                optional(summary.auth.as_deref()),
                summary.events
            );
        }
    }
}

fn login_text(login: Option<bool>) -> &'static str {
    match login {
        Some(true) => "accepted",
        Some(false) => "rejected",
        None => "undecided",
    }
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
