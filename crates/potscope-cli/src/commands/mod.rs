pub mod monitor;
pub mod ports;
pub mod stream;

use std::fs::File;
use std::io;
use std::time::Duration;

use potscope_core::{LineReader, LineSource, Monitor, MonitorConfig, ThreadedSource};

use crate::SourceArgs;

/// Build the run configuration from command-line options.
pub fn build_config(args: &SourceArgs) -> MonitorConfig {
    MonitorConfig::default()
        .with_window_capacity(args.window)
        .with_refresh_period(Duration::from_millis(args.refresh_ms))
        .with_read_timeout(Duration::from_millis(args.timeout_ms))
}

/// Validate the configuration and build a monitor, or exit with a message.
pub fn make_monitor(args: &SourceArgs) -> Monitor {
    match Monitor::new(build_config(args)) {
        Ok(monitor) => monitor,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    }
}

/// Open the telemetry source named on the command line.
///
/// Returns the source with a short label for titles and summaries.
pub fn open_source(args: &SourceArgs) -> io::Result<(Box<dyn LineSource>, String)> {
    if let Some(port) = &args.port {
        let timeout = Duration::from_millis(args.timeout_ms);
        let serial = serialport::new(port, args.baud).timeout(timeout).open()?;
        log::info!("opened {port} at {} baud", args.baud);
        return Ok((
            Box::new(LineReader::new(serial)),
            format!("{port} @ {}", args.baud),
        ));
    }

    match args.input.as_deref() {
        Some("-") => {
            let timeout = Duration::from_millis(args.timeout_ms);
            let stdin = ThreadedSource::spawn(LineReader::new(io::stdin()), timeout)?;
            Ok((Box::new(stdin), "stdin".into()))
        }
        Some(path) => {
            let file = File::open(path)?;
            log::info!("replaying {path}");
            Ok((Box::new(LineReader::new(file)), path.to_string()))
        }
        None => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "either --port or --input is required",
        )),
    }
}

/// Open the source, or exit with a message.
pub fn open_source_or_exit(args: &SourceArgs) -> (Box<dyn LineSource>, String) {
    match open_source(args) {
        Ok(opened) => opened,
        Err(e) => {
            let target = args
                .port
                .as_deref()
                .or(args.input.as_deref())
                .unwrap_or("source");
            eprintln!("Failed to open {target}: {e}");
            std::process::exit(1);
        }
    }
}

/// Install the process logger.
///
/// The dashboard owns the terminal, so interactive runs only log when a
/// `log_file` is given. `RUST_LOG` overrides the default level.
pub fn init_logging(log_file: Option<&str>, interactive: bool) {
    let default_level = match (interactive, log_file) {
        (true, None) => return,
        (true, Some(_)) => "info",
        (false, _) => "warn",
    };

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
    if let Some(path) = log_file {
        match File::create(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => {
                eprintln!("Cannot open log file {path}: {e}");
                std::process::exit(1);
            }
        }
    }
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use potscope_core::ReadEvent;
    use std::io::Write;

    fn args() -> SourceArgs {
        SourceArgs {
            port: None,
            input: None,
            baud: 115_200,
            window: 100,
            refresh_ms: 50,
            timeout_ms: 1000,
        }
    }

    #[test]
    fn config_follows_args() {
        let mut a = args();
        a.window = 7;
        a.refresh_ms = 20;
        a.timeout_ms = 250;
        let config = build_config(&a);
        assert_eq!(config.window_capacity, 7);
        assert_eq!(config.refresh_period, Duration::from_millis(20));
        assert_eq!(config.read_timeout, Duration::from_millis(250));
    }

    #[test]
    fn zero_window_fails_validation() {
        let mut a = args();
        a.window = 0;
        assert!(build_config(&a).validate().is_err());
    }

    #[test]
    fn input_file_is_replayed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "POT: raw=100 filtered=98 digit=2").unwrap();
        let mut a = args();
        a.input = Some(file.path().to_string_lossy().into_owned());

        let (mut source, label) = open_source(&a).unwrap();
        assert_eq!(label, a.input.unwrap());
        assert_eq!(
            source.read_line().unwrap(),
            ReadEvent::Line("POT: raw=100 filtered=98 digit=2".into())
        );
        assert_eq!(source.read_line().unwrap(), ReadEvent::Closed);
    }

    #[test]
    fn missing_input_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut a = args();
        a.input = Some(dir.path().join("nope.log").to_string_lossy().into_owned());
        let err = open_source(&a).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn no_source_is_an_error() {
        let err = open_source(&args()).err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
