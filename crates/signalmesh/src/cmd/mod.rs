use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use serde_json::Value;
use signalmesh_wire::signal_from_name;

use crate::exit::{io_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod broadcast;
pub mod listen;
pub mod send;
pub mod signals;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a node and print every received message.
    Listen(ListenArgs),
    /// Send one datagram to a port.
    Send(SendArgs),
    /// Send one datagram to every configured peer.
    Broadcast(BroadcastArgs),
    /// List the known signal codes.
    Signals(SignalsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Send(args) => send::run(args),
        Command::Broadcast(args) => broadcast::run(args, format),
        Command::Signals(args) => signals::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Node config file (JSON).
    #[arg(long, value_name = "FILE", conflicts_with = "port", required_unless_present = "port")]
    pub config: Option<PathBuf>,
    /// Loopback port to bind, with no peers and no whitelist.
    #[arg(long, short = 'p')]
    pub port: Option<u16>,
    /// Only admit these signals (comma-separated codes or names).
    #[arg(long, value_delimiter = ',', value_parser = parse_signal)]
    pub allow: Option<Vec<u16>>,
    /// Schema directory for payload validation.
    #[arg(long, value_name = "DIR")]
    pub validate: Option<PathBuf>,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct PayloadArgs {
    /// JSON payload.
    #[arg(long, conflicts_with = "file")]
    pub json: Option<String>,
    /// Read the JSON payload from a file.
    #[arg(long, conflicts_with = "json")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Destination port on 127.0.0.1.
    #[arg(long, short = 'p')]
    pub port: u16,
    /// Signal code (decimal, 0x-hex) or name.
    #[arg(long, short = 's', value_parser = parse_signal)]
    pub signal: u16,
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct BroadcastArgs {
    /// Node config file (JSON) naming the peers.
    #[arg(long, value_name = "FILE")]
    pub config: PathBuf,
    /// Signal code (decimal, 0x-hex) or name.
    #[arg(long, short = 's', value_parser = parse_signal)]
    pub signal: u16,
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug, Default)]
pub struct SignalsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_signal(input: &str) -> Result<u16, String> {
    signal_from_name(input).ok_or_else(|| format!("unknown signal {input:?}"))
}

impl PayloadArgs {
    /// The payload to encode; no payload sends an empty body.
    pub fn resolve(&self) -> CliResult<Value> {
        if let Some(json) = &self.json {
            return serde_json::from_str(json)
                .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")));
        }
        if let Some(path) = &self.file {
            return read_json_file(path);
        }
        Ok(Value::Null)
    }
}

fn read_json_file(path: &Path) -> CliResult<Value> {
    let text = fs::read_to_string(path)
        .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
    serde_json::from_str(&text).map_err(|err| {
        CliError::new(
            USAGE,
            format!("{} is not valid JSON: {err}", path.display()),
        )
    })
}
