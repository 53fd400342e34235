use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style, Modifier},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use mobhunt_core::types::Telemetry;
use crate::App;

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = if app.log_visible {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
            .split(f.area())
    } else {
        Layout::default()
            .constraints([Constraint::Percentage(100)])
            .split(f.area())
    };

    let t = app.snapshot();

    let (banner_label, banner_bg) = if t.state.paused {
        ("PAUSED (Press P to hunt)", Color::Red)
    } else {
        ("RUNNING (Press P to pause)", Color::Green)
    };

    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(chunks[0]);

    let banner_width = left_chunks[0].width as usize;
    let pad_total = banner_width.saturating_sub(banner_label.len());
    let pad_left = pad_total / 2;
    let pad_right = pad_total - pad_left;
    let centered_banner = format!("{}{}{}", " ".repeat(pad_left), banner_label, " ".repeat(pad_right));
    let banner = Paragraph::new(Line::from(Span::styled(
        centered_banner,
        Style::default().fg(Color::Black).bg(banner_bg).add_modifier(Modifier::BOLD),
    )));
    f.render_widget(banner, left_chunks[0]);

    let stats = Paragraph::new(stat_lines(&t)).block(
        Block::default()
            .borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    f.render_widget(stats, left_chunks[1]);

    if app.log_visible && chunks.len() > 1 {
        let visible_height = chunks[1].height.saturating_sub(2) as usize;
        let total = app.log_messages.len();
        let max_scroll = total.saturating_sub(visible_height);
        let scroll = app.log_scroll.min(max_scroll);
        let start = total.saturating_sub(visible_height + scroll);
        let end = total.saturating_sub(scroll);
        let log_lines: Vec<Line> = app.log_messages[start..end]
            .iter()
            .map(|m| parse_log_line(m))
            .collect();

        let log_panel = Paragraph::new(log_lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Logs ")
                    .border_style(Style::default().fg(Color::Yellow)),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(log_panel, chunks[1]);
    }
}

fn key(k: &'static str) -> Span<'static> {
    Span::styled(k, Style::default().fg(Color::Yellow))
}

fn row(label: &str, value: String, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!(" {:<14}", label), Style::default().fg(Color::DarkGray)),
        Span::styled(value, Style::default().fg(color)),
    ])
}

fn stat_lines(t: &Telemetry) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(vec![
            Span::raw(" "),
            key("p"),
            Span::raw(" pause, "),
            key("v"),
            Span::raw(" overlay, "),
            key("l"),
            Span::raw(" logs, "),
            key("q"),
            Span::raw(" quit"),
        ]),
        Line::from(""),
        row("action", t.current_action.clone(), Color::White),
        row("uptime", fmt_duration(t.uptime), Color::White),
        row("cycles", t.state.cycle_count.to_string(), Color::White),
        row("kills", t.kills.to_string(), Color::Green),
        row("deaths", t.deaths.to_string(), Color::Magenta),
        row(
            "recoveries",
            if t.state.in_recovery_mode {
                format!("{} (stuck, attempt {})", t.stuck_recoveries, t.state.consecutive_recoveries)
            } else {
                t.stuck_recoveries.to_string()
            },
            if t.state.in_recovery_mode { Color::Yellow } else { Color::White },
        ),
        row(
            "skills",
            format!("{} used, {} saved, {} early stops", t.skills_used, t.skills_saved, t.early_stops),
            Color::White,
        ),
        row("stalls", t.stalls.to_string(), Color::White),
        row(
            "errors",
            t.errors.to_string(),
            if t.errors > 0 { Color::Red } else { Color::White },
        ),
        row(
            "cache",
            format!("{} entries, {} hits, {} misses", t.cache_size, t.cache_hits, t.cache_misses),
            Color::White,
        ),
        row(
            "next buff",
            t.next_buff_in.map_or_else(|| "-".to_string(), fmt_duration),
            Color::White,
        ),
        row(
            "target health",
            t.target_health_pct.map_or_else(|| "-".to_string(), |p| format!("{:.0}%", p)),
            Color::Red,
        ),
        Line::from(""),
    ];

    let mut classes: Vec<Span<'static>> = vec![Span::styled(
        format!(" {:<14}", "targets"),
        Style::default().fg(Color::DarkGray),
    )];
    if t.class_counts.is_empty() {
        classes.push(Span::raw("-"));
    }
    // highest class first
    for (tag, n) in t.class_counts.iter().rev() {
        classes.push(Span::styled(format!("{} {}  ", tag, n), Style::default().fg(Color::Cyan)));
    }
    lines.push(Line::from(classes));
    lines.push(row("pets skipped", t.pets_skipped.to_string(), Color::White));

    if t.overlay_visible {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" detections ({})", t.detections.len()),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )));
        for d in &t.detections {
            lines.push(Line::from(Span::styled(
                format!(
                    "   ({:>4}, {:>4})  {}x{}  {:.0}px from center",
                    d.center.x, d.center.y, d.region.w, d.region.h, d.distance_from_center
                ),
                Style::default().fg(Color::Gray),
            )));
        }
    }
    lines
}

fn fmt_duration(d: Duration) -> String {
    let s = d.as_secs();
    if s >= 3600 {
        format!("{}h{:02}m{:02}s", s / 3600, s % 3600 / 60, s % 60)
    } else if s >= 60 {
        format!("{}m{:02}s", s / 60, s % 60)
    } else {
        format!("{}s", s)
    }
}

/// Parse a structured log line (level\x1fprefix\x1fcolor\x1ftimestamp\x1fmessage)
/// into a colored Line for TUI rendering.
fn parse_log_line(raw: &str) -> Line<'_> {
    let parts: Vec<&str> = raw.splitn(5, '\x1f').collect();
    if parts.len() < 5 {
        return Line::from(raw);
    }

    let level = parts[0];
    let prefix = parts[1];
    let color_idx: u8 = parts[2].parse().unwrap_or(0);
    let timestamp = parts[3];
    let message = parts[4];

    let prefix_color = match color_idx {
        1 => Color::DarkGray,  // COLOR_GRAY
        2 => Color::LightBlue, // COLOR_BLUE
        3 => Color::LightRed,
        4 => Color::Yellow,
        5 => Color::Green,
        6 => Color::Magenta,
        _ => Color::White,
    };

    let mut spans = vec![
        Span::styled(timestamp, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
    ];

    // level tag only for warn/error
    match level {
        "ERROR" => spans.push(Span::styled("error ", Style::default().fg(Color::Red))),
        "WARN" => spans.push(Span::styled("warn ", Style::default().fg(Color::Yellow))),
        _ => {}
    }

    if !prefix.is_empty() {
        spans.push(Span::styled(prefix, Style::default().fg(prefix_color).add_modifier(Modifier::BOLD)));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(message, Style::default().fg(prefix_color)));

    Line::from(spans)
}
