use crate::SourceArgs;
use crate::tui::app::App;

pub fn run(args: &SourceArgs) {
    let monitor = super::make_monitor(args);
    let (source, label) = super::open_source_or_exit(args);
    log::info!(
        "potscope {} monitoring {label}, window {}",
        potscope_core::VERSION,
        monitor.config().window_capacity
    );

    let mut app = App::new(monitor, label);
    if let Err(e) = app.run(source) {
        eprintln!("TUI error: {e}");
        std::process::exit(1);
    }
}
