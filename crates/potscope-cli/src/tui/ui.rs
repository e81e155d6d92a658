//! TUI rendering.
//!
//! ┌──────────────────────────────────────────────────────┐
//! │  potscope  /dev/ttyUSB0 @ 115200   LIVE   #412  ...  │
//! ├──────────────────────────────────────────────────────┤
//! │  Signal  raw=2048 filtered=2011  noise=37            │
//! │   ~~ raw (red) ~~ filtered (blue) ~~                 │
//! ├────────────────────────────────┬─────────────────────┤
//! │  Digit  4                      │  Window stats       │
//! │   ▁▁▂▂▄▄▄                      │  mean noise  12.3   │
//! ├────────────────────────────────┴─────────────────────┤
//! │  last rejected: "garbage" (missing field raw)        │
//! ├──────────────────────────────────────────────────────┤
//! │  q: quit   s: export snapshot                        │
//! └──────────────────────────────────────────────────────┘

use super::app::ViewState;
use potscope_core::{IngestStatus, MeasurementRecord, RefreshSnapshot};
use ratatui::{prelude::*, widgets::*};

/// Signal chart y range: a 12-bit ADC with a little headroom.
const SIGNAL_Y_MIN: f64 = -50.0;
const SIGNAL_Y_MAX: f64 = 4200.0;

pub fn draw(f: &mut Frame, snap: &RefreshSnapshot, view: &ViewState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),      // title
            Constraint::Percentage(55), // signal
            Constraint::Min(8),         // digit + stats
            Constraint::Length(3),      // diagnostics
            Constraint::Length(1),      // keys
        ])
        .split(f.area());

    draw_title(f, rows[0], snap, view);
    draw_signal(f, rows[1], snap);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[2]);
    draw_digit(f, cols[0], snap);
    draw_stats(f, cols[1], snap);

    draw_diagnostics(f, rows[3], snap, view);
    draw_keys(f, rows[4]);
}

fn draw_title(f: &mut Frame, area: Rect, snap: &RefreshSnapshot, view: &ViewState) {
    let (status, color) = status_text(snap);
    let c = &snap.counters;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Line::from(vec![
            Span::styled(" potscope ", Style::default().bold().fg(Color::Cyan)),
            Span::raw("  "),
            Span::styled(
                view.source_label.as_str(),
                Style::default().bold().fg(Color::Yellow),
            ),
            Span::raw("  "),
            Span::styled(status, Style::default().bold().fg(color)),
            Span::styled(
                format!(
                    "  #{}  {} records  {} lines  {} bad  {} timeouts ",
                    snap.tick, c.records_accepted, c.lines_read, c.parse_failures, c.read_timeouts
                ),
                Style::default().fg(Color::DarkGray),
            ),
        ]));

    f.render_widget(block, area);
}

fn draw_signal(f: &mut Frame, area: Rect, snap: &RefreshSnapshot) {
    let count = snap.records.len();
    let title = match (snap.latest, snap.noise) {
        (Some(latest), Some(noise)) => format!(
            " Signal  raw={} filtered={}  noise={noise}  n={count}/{} ",
            latest.raw(),
            latest.filtered(),
            snap.window_capacity
        ),
        _ => " Signal  waiting for data ".to_string(),
    };

    let raw: Vec<(f64, f64)> = series(&snap.records, |r| f64::from(r.raw()));
    let filtered: Vec<(f64, f64)> = series(&snap.records, |r| f64::from(r.filtered()));

    let datasets = vec![
        Dataset::default()
            .name("raw")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Red))
            .data(&raw),
        Dataset::default()
            .name("filtered")
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Blue))
            .data(&filtered),
    ];

    let [x_min, x_max] = x_bounds(&snap.records, snap.window_capacity);
    let [y_min, y_max] = signal_bounds(&snap.records);

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(title))
        .x_axis(Axis::default().bounds([x_min, x_max]).labels(vec![
            Line::from(format!("{x_min:.0}")),
            Line::from(format!("{x_max:.0}")),
        ]))
        .y_axis(Axis::default().bounds([y_min, y_max]).labels(vec![
            Line::from("0"),
            Line::from("2048"),
            Line::from(format!("{y_max:.0}")),
        ]));

    f.render_widget(chart, area);
}

fn draw_digit(f: &mut Frame, area: Rect, snap: &RefreshSnapshot) {
    let title = match snap.latest {
        Some(latest) => format!(" Digit  {} ", latest.digit()),
        None => " Digit ".to_string(),
    };
    let digits: Vec<(f64, f64)> = series(&snap.records, |r| f64::from(r.digit()));

    let datasets = vec![
        Dataset::default()
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(Color::Green))
            .data(&digits),
    ];
    let [x_min, x_max] = x_bounds(&snap.records, snap.window_capacity);

    let chart = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(title))
        .x_axis(Axis::default().bounds([x_min, x_max]))
        .y_axis(
            Axis::default()
                .bounds([-0.5, 9.5])
                .labels(digit_labels()),
        );

    f.render_widget(chart, area);
}

/// One tick per digit, 0 through 9.
fn digit_labels() -> Vec<Line<'static>> {
    (0..=9).map(|d| Line::from(d.to_string())).collect()
}

fn draw_stats(f: &mut Frame, area: Rect, snap: &RefreshSnapshot) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Window stats ");

    let Some(stats) = snap.stats else {
        let p = Paragraph::new("waiting for data")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        f.render_widget(p, area);
        return;
    };

    let reduction = match stats.noise_reduction {
        Some(ratio) => format!("{:.0}%", (1.0 - ratio) * 100.0),
        None => "—".into(),
    };
    let lines = vec![
        stat_line(
            "samples",
            format!("{}/{}", stats.count, snap.window_capacity),
        ),
        stat_line("mean raw", format!("{:.1}", stats.mean_raw)),
        stat_line("mean filtered", format!("{:.1}", stats.mean_filtered)),
        stat_line("mean noise", format!("{:.1}", stats.mean_noise)),
        stat_line("peak noise", stats.peak_noise.to_string()),
        stat_line(
            "raw range",
            format!("{}..{}", stats.raw_min, stats.raw_max),
        ),
        stat_line(
            "σ raw/filt",
            format!("{:.1} / {:.1}", stats.raw_std, stats.filtered_std),
        ),
        stat_line("smoothing", reduction),
        stat_line("digit changes", stats.digit_transitions.to_string()),
    ];

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn stat_line(label: &'static str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!(" {label:<14}"), Style::default().fg(Color::DarkGray)),
        Span::styled(value, Style::default().fg(Color::White)),
    ])
}

fn draw_diagnostics(f: &mut Frame, area: Rect, snap: &RefreshSnapshot, view: &ViewState) {
    let line = if let Some(err) = &view.export_error {
        Line::styled(
            format!("export failed: {err}"),
            Style::default().fg(Color::Red),
        )
    } else if let Some(rejected) = &snap.last_rejected {
        Line::from(vec![
            Span::styled("last rejected: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                format!("{:?}", rejected.text),
                Style::default().fg(Color::Yellow),
            ),
            Span::styled(
                format!(" ({})", rejected.reason),
                Style::default().fg(Color::DarkGray),
            ),
        ])
    } else if let Some(path) = &view.last_export {
        Line::styled(
            format!("snapshot saved to {}", path.display()),
            Style::default().fg(Color::Green),
        )
    } else {
        Line::styled("no rejected lines", Style::default().fg(Color::DarkGray))
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Diagnostics ");
    f.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_keys(f: &mut Frame, area: Rect) {
    let bar = Paragraph::new(" q/esc: quit   s: export snapshot (JSON)")
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));
    f.render_widget(bar, area);
}

fn series(
    records: &[MeasurementRecord],
    value: impl Fn(&MeasurementRecord) -> f64,
) -> Vec<(f64, f64)> {
    records
        .iter()
        .map(|r| (r.sequence() as f64, value(r)))
        .collect()
}

/// X range in sequence numbers. Spans a full window even before it fills, so
/// the trace grows left to right and then scrolls.
pub fn x_bounds(records: &[MeasurementRecord], capacity: usize) -> [f64; 2] {
    let span = capacity.saturating_sub(1).max(1) as u64;
    let start = records.first().map_or(0, MeasurementRecord::sequence);
    let end = records
        .last()
        .map_or(start, MeasurementRecord::sequence)
        .max(start + span);
    [start as f64, end as f64]
}

/// Y range for the raw/filtered chart. Fixed to the ADC range, widened if a
/// reading lands above it.
pub fn signal_bounds(records: &[MeasurementRecord]) -> [f64; 2] {
    let peak = records
        .iter()
        .map(|r| r.raw().max(r.filtered()))
        .max()
        .map_or(0.0, f64::from);
    [SIGNAL_Y_MIN, SIGNAL_Y_MAX.max(peak + 50.0)]
}

/// Status word for the title bar.
pub fn status_text(snap: &RefreshSnapshot) -> (String, Color) {
    match &snap.status {
        None if snap.latest.is_none() => ("WAITING".into(), Color::Yellow),
        None => ("LIVE".into(), Color::Green),
        Some(IngestStatus::Cancelled) => ("CANCELLED".into(), Color::DarkGray),
        Some(status) => (status.to_string().to_uppercase(), Color::Red),
    }
}
