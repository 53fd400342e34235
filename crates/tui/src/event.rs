use std::io;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, MouseEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::App;
use crate::ui;

/// TUI loop on the main thread. Key presses are the pause/overlay toggles.
pub fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> anyhow::Result<()> {
    loop {
        if app.should_quit {
            return Ok(());
        }

        app.drain_logs();

        terminal.draw(|f| ui::draw(f, app))?;

        // 100ms poll keeps telemetry fresh
        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => app.quit(),
                        KeyCode::Char('p') | KeyCode::Char('P') | KeyCode::Char(' ') => {
                            app.toggle_pause();
                        }
                        KeyCode::Char('v') | KeyCode::Char('V') => app.toggle_overlay(),
                        KeyCode::Char('l') | KeyCode::Char('L') => app.toggle_log(),
                        KeyCode::Up => app.scroll_log_up(1),
                        KeyCode::Down => app.scroll_log_down(1),
                        _ => {}
                    }
                }
                Event::Mouse(mouse) => match mouse.kind {
                    MouseEventKind::ScrollUp => app.scroll_log_up(3),
                    MouseEventKind::ScrollDown => app.scroll_log_down(3),
                    _ => {}
                },
                _ => {}
            }
        }
    }
}
