use std::io::IsTerminal;
use std::net::SocketAddr;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serde_json::Value;
use signalmesh_node::BroadcastReport;
use signalmesh_wire::{signal_name, Message, EMITTED, RECEIVED};

const SCHEMA_BASE: &str = "https://schemas.3leaps.dev/signalmesh/cli/v1";

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

#[derive(Serialize)]
struct MessageOutput<'a> {
    schema_id: String,
    signal: u16,
    signal_name: &'static str,
    version: u16,
    timestamp: u32,
    from: String,
    peer: Option<&'a str>,
    payload: &'a Value,
}

pub fn print_message(message: &Message, from: SocketAddr, peer: Option<&str>, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = MessageOutput {
                schema_id: format!("{SCHEMA_BASE}/message-received.schema.json"),
                signal: message.signal,
                signal_name: signal_name(message.signal),
                version: message.version,
                timestamp: message.timestamp,
                from: from.to_string(),
                peer,
                payload: &message.payload,
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["SIGNAL", "NAME", "FROM", "PAYLOAD"]);
            table.add_row(vec![
                format!("{:#06x}", message.signal),
                signal_name(message.signal).to_string(),
                peer.map_or_else(|| from.to_string(), str::to_string),
                message.payload.to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "signal={:#06x} ({}) from={}{} ts={} payload={}",
                message.signal,
                signal_name(message.signal),
                from,
                peer.map(|name| format!(" ({name})")).unwrap_or_default(),
                message.timestamp,
                message.payload
            );
        }
    }
}

#[derive(Serialize)]
struct BroadcastOutput<'a> {
    schema_id: String,
    signal: u16,
    signal_name: &'static str,
    #[serde(flatten)]
    report: &'a BroadcastReport,
}

pub fn print_broadcast(signal: u16, report: &BroadcastReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&BroadcastOutput {
            schema_id: format!("{SCHEMA_BASE}/broadcast-report.schema.json"),
            signal,
            signal_name: signal_name(signal),
            report,
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["PEER", "RESULT"]);
            for name in &report.delivered {
                table.add_row(vec![name.as_str(), "sent"]);
            }
            for name in &report.failed {
                table.add_row(vec![name.as_str(), "failed"]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "signal={:#06x} ({}) delivered=[{}] failed=[{}]",
                signal,
                signal_name(signal),
                report.delivered.join(","),
                report.failed.join(",")
            );
        }
    }
}

#[derive(Serialize)]
struct SignalRow {
    code: u16,
    hex: String,
    name: &'static str,
    direction: &'static str,
}

#[derive(Serialize)]
struct SignalTable {
    schema_id: String,
    signals: Vec<SignalRow>,
}

pub fn print_signals(signals: impl Iterator<Item = (u16, &'static str)>, format: OutputFormat) {
    let rows: Vec<SignalRow> = signals
        .map(|(code, name)| SignalRow {
            code,
            hex: format!("{code:#06x}"),
            name,
            direction: direction(code),
        })
        .collect();

    match format {
        OutputFormat::Json => print_json(&SignalTable {
            schema_id: format!("{SCHEMA_BASE}/signals.schema.json"),
            signals: rows,
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["CODE", "NAME", "DIRECTION"]);
            for row in &rows {
                table.add_row(vec![row.hex.as_str(), row.name, row.direction]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in &rows {
                println!("{} {} {}", row.hex, row.name, row.direction);
            }
        }
    }
}

fn direction(code: u16) -> &'static str {
    if EMITTED.contains(&code) {
        "emitted"
    } else if RECEIVED.contains(&code) {
        "received"
    } else {
        "-"
    }
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

#[cfg(test)]
mod tests {
    use signalmesh_wire::{BUILD_STARTED, INSPECTION_PASSED, LESSON_EXTRACTED};

    use super::*;

    #[test]
    fn directions_follow_signal_subsets() {
        assert_eq!(direction(BUILD_STARTED), "received");
        assert_eq!(direction(INSPECTION_PASSED), "emitted");
        assert_eq!(direction(LESSON_EXTRACTED), "emitted");
        assert_eq!(direction(0x0001), "-");
    }

    #[test]
    fn message_output_serializes_payload_inline() {
        let message = Message::new(BUILD_STARTED, serde_json::json!({"build_id": "b-1"}));
        let out = MessageOutput {
            schema_id: String::new(),
            signal: message.signal,
            signal_name: signal_name(message.signal),
            version: message.version,
            timestamp: message.timestamp,
            from: "127.0.0.1:41001".into(),
            peer: Some("builder"),
            payload: &message.payload,
        };

        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json["signal_name"], "BUILD_STARTED");
        assert_eq!(json["payload"]["build_id"], "b-1");
        assert_eq!(json["peer"], "builder");
    }
}
