//! serialview: a headless serial terminal
//!
//! Received data is rendered to stdout at the refresh cadence; each line typed
//! on stdin is sent to the device. Logs go to stderr (`RUST_LOG`).

mod display;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use serialview_core::highlight::KeywordHighlighter;
use serialview_core::prelude::*;
use serialview_core::throughput::{format_speed, format_total};
use std::io::BufRead;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use display::StdoutDisplay;

#[derive(Parser, Debug)]
#[command(name = "serialview", version, about = "Serial-line terminal")]
struct Cli {
    /// Serial port (e.g. /dev/ttyUSB0 or COM3)
    #[arg(short, long, required_unless_present = "list")]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long, default_value_t = serialview_core::DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Data bits (5-8)
    #[arg(long, default_value_t = 8)]
    data_bits: u8,

    /// Stop bits (1, 1.5 or 2)
    #[arg(long, default_value = "1")]
    stop_bits: StopBits,

    /// Parity (none, odd, even)
    #[arg(long, default_value = "none")]
    parity: Parity,

    /// Show received data as hex
    #[arg(short = 'x', long)]
    hex: bool,

    /// Prefix each read with a timestamp
    #[arg(short, long)]
    timestamp: bool,

    /// Text decoding (latin1, utf8, gbk)
    #[arg(short, long, default_value = "latin1")]
    encoding: Codec,

    /// In hex mode, keep CR/LF inline instead of breaking lines
    #[arg(long)]
    no_hex_newline: bool,

    /// Parse typed lines as hex bytes
    #[arg(long)]
    hex_send: bool,

    /// Do not append CRLF to typed lines
    #[arg(long)]
    no_crlf: bool,

    /// Disable keyword colouring
    #[arg(long)]
    no_highlight: bool,

    /// List serial ports and exit
    #[arg(short, long)]
    list: bool,
}

impl Cli {
    /// Flags in the shape a settings store would persist
    fn preferences(&self) -> Result<TerminalPreferences> {
        Ok(TerminalPreferences {
            last_port: self.port.clone().context("no serial port given")?,
            baud_rate: self.baud,
            data_bits: DataBits::try_from(self.data_bits)?,
            stop_bits: self.stop_bits,
            parity: self.parity,
            hex_display: self.hex,
            timestamp: self.timestamp,
            encoding: self.encoding,
            hex_newline: !self.no_hex_newline,
            hex_send: self.hex_send,
            append_newline: !self.no_crlf,
            clear_after_send: false,
        })
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Stdin lines, read on a detached thread
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::warn!(error = %e, "stdin read failed");
                    break;
                }
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn print_ports() {
    let ports = list_ports();
    if ports.is_empty() {
        println!("No serial ports found");
        return;
    }
    for port in ports {
        println!("{}", port.label());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    if cli.list {
        print_ports();
        return Ok(());
    }

    let prefs = cli.preferences()?;
    let link = prefs.link_config();
    link.validate()?;
    let highlighter = if cli.no_highlight {
        None
    } else {
        Some(KeywordHighlighter::new()?)
    };

    let (events_tx, mut events) = event_channel();
    let session = TerminalSession::new(
        StdoutDisplay::new(highlighter),
        events_tx,
        SessionOptions::from(&prefs),
    )
    .context("failed to start serial I/O worker")?;
    let (commands, command_rx) = command_channel();
    let session_task = tokio::spawn(session.run(command_rx));

    tracing::info!(port = %link.port_identifier, baud = link.baud_rate, "opening");
    commands.send(Command::Open(link))?;

    let mut stdin = spawn_stdin_reader();
    let mut stdin_open = true;
    let mut failure = None;

    loop {
        tokio::select! {
            line = stdin.recv(), if stdin_open => match line {
                Some(line) => commands.send(Command::SendText(line))?,
                None => stdin_open = false,
            },
            event = events.recv() => match event {
                Some(TerminalEvent::Opened) => tracing::info!("connected"),
                Some(TerminalEvent::Stopped) | None => break,
                Some(TerminalEvent::Error { message, kind }) => {
                    tracing::error!(%kind, "{}", message);
                    if matches!(
                        kind,
                        ErrorKind::DeviceNotFound | ErrorKind::PermissionDenied | ErrorKind::OpenFailed
                    ) {
                        failure = Some(anyhow!("{} ({})", message, kind));
                        break;
                    }
                }
                Some(TerminalEvent::ThroughputSample { interval_bytes, total_bytes }) => {
                    tracing::debug!(
                        speed = %format_speed(interval_bytes as f64),
                        total = %format_total(total_bytes),
                        "throughput"
                    );
                }
                Some(_) => {}
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, closing");
                break;
            }
        }
    }

    // Closing the command channel shuts the session down
    drop(commands);
    session_task.await?;

    match failure {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_flags_map_to_session() {
        let cli = Cli::parse_from([
            "serialview", "-p", "/dev/ttyUSB0", "-b", "9600", "--parity", "even", "-x",
            "--no-hex-newline", "--hex-send", "--no-crlf",
        ]);
        let prefs = cli.preferences().unwrap();

        let link = prefs.link_config();
        assert_eq!(link.port_identifier, "/dev/ttyUSB0");
        assert_eq!(link.baud_rate, 9600);
        assert_eq!(link.parity, Parity::Even);
        assert!(link.is_valid());

        let options = SessionOptions::from(&prefs);
        assert_eq!(options.formatter.mode, DisplayMode::Hex);
        assert!(!options.formatter.hex_newline_splitting);
        assert!(options.send.hex);
        assert!(!options.send.append_newline);
    }

    #[test]
    fn test_list_needs_no_port() {
        let cli = Cli::parse_from(["serialview", "--list"]);
        assert!(cli.list);
        assert!(cli.preferences().is_err());
    }

    #[test]
    fn test_bad_data_bits_rejected() {
        let cli = Cli::parse_from(["serialview", "-p", "COM3", "--data-bits", "9"]);
        assert!(cli.preferences().is_err());
    }
}
