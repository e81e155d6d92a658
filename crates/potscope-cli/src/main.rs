//! CLI for potscope: watch a device's raw and filtered ADC readings live.

mod commands;
mod tui;

use clap::{Args, Parser, Subcommand};

use potscope_core::{DEFAULT_BAUD_RATE, DEFAULT_READ_TIMEOUT_MS, DEFAULT_REFRESH_PERIOD_MS};

#[derive(Parser)]
#[command(name = "potscope")]
#[command(about = "potscope: live raw vs filtered ADC telemetry from a serial device")]
#[command(version = potscope_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Where telemetry comes from and how the run is shaped.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Serial port to read from (e.g. /dev/ttyUSB0, COM3)
    #[arg(long, required_unless_present = "input", conflicts_with = "input")]
    pub port: Option<String>,

    /// Replay a captured log file instead of a serial port ("-" for stdin)
    #[arg(long)]
    pub input: Option<String>,

    /// Serial baud rate
    #[arg(long, default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,

    /// Samples kept in the sliding window
    #[arg(long, default_value_t = potscope_core::DEFAULT_WINDOW_CAPACITY)]
    pub window: usize,

    /// Render period in milliseconds
    #[arg(long, default_value_t = DEFAULT_REFRESH_PERIOD_MS)]
    pub refresh_ms: u64,

    /// Per-read timeout in milliseconds
    #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT_MS)]
    pub timeout_ms: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Live dashboard: raw vs filtered signal, detected digit, noise (TUI)
    Monitor {
        #[command(flatten)]
        source: SourceArgs,

        /// Write logs to this file (the dashboard owns the terminal)
        #[arg(long)]
        log_file: Option<String>,
    },

    /// Print accepted records as they arrive (pipe-friendly)
    Stream {
        #[command(flatten)]
        source: SourceArgs,

        /// Output format
        #[arg(long, default_value = "text", value_parser = ["text", "json"])]
        format: String,
    },

    /// List serial ports available on this machine
    Ports,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Monitor { source, log_file } => {
            commands::init_logging(log_file.as_deref(), true);
            commands::monitor::run(&source);
        }
        Commands::Stream { source, format } => {
            commands::init_logging(None, false);
            commands::stream::run(&source, &format);
        }
        Commands::Ports => {
            commands::init_logging(None, false);
            commands::ports::run();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn monitor_defaults() {
        let cli = Cli::try_parse_from(["potscope", "monitor", "--port", "/dev/ttyUSB0"]).unwrap();
        match cli.command {
            Commands::Monitor { source, log_file } => {
                assert_eq!(source.port.as_deref(), Some("/dev/ttyUSB0"));
                assert_eq!(source.baud, 115_200);
                assert_eq!(source.window, 100);
                assert_eq!(source.refresh_ms, 50);
                assert_eq!(source.timeout_ms, 1000);
                assert_eq!(log_file, None);
            }
            _ => panic!("expected monitor"),
        }
    }

    #[test]
    fn stream_from_input_file() {
        let cli = Cli::try_parse_from([
            "potscope", "stream", "--input", "capture.log", "--format", "json", "--window", "20",
        ])
        .unwrap();
        match cli.command {
            Commands::Stream { source, format } => {
                assert_eq!(source.input.as_deref(), Some("capture.log"));
                assert_eq!(source.port, None);
                assert_eq!(source.window, 20);
                assert_eq!(format, "json");
            }
            _ => panic!("expected stream"),
        }
    }

    #[test]
    fn port_or_input_required() {
        assert!(Cli::try_parse_from(["potscope", "monitor"]).is_err());
        assert!(
            Cli::try_parse_from([
                "potscope", "monitor", "--port", "COM3", "--input", "x.log"
            ])
            .is_err()
        );
    }

    #[test]
    fn unknown_format_rejected() {
        assert!(
            Cli::try_parse_from(["potscope", "stream", "--port", "COM3", "--format", "xml"])
                .is_err()
        );
    }
}
