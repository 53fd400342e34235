use std::sync::{Arc, Mutex, mpsc};
use mobhunt_core::types::{Command, Telemetry};

/// Log records kept for the log panel; older ones are dropped.
pub const MAX_LOG_LINES: usize = 5_000;

pub struct App {
    pub telemetry: Arc<Mutex<Telemetry>>,
    pub log_visible: bool,
    pub log_messages: Vec<String>,
    pub log_scroll: usize, // scroll offset from bottom (0 = latest)
    pub log_rx: mpsc::Receiver<String>,
    pub cmd_tx: mpsc::Sender<Command>,
    pub should_quit: bool,
}

impl App {
    pub fn new(
        telemetry: Arc<Mutex<Telemetry>>,
        log_rx: mpsc::Receiver<String>,
        cmd_tx: mpsc::Sender<Command>,
    ) -> Self {
        Self {
            telemetry,
            log_visible: true,
            log_messages: Vec::new(),
            log_scroll: 0,
            log_rx,
            cmd_tx,
            should_quit: false,
        }
    }

    pub fn drain_logs(&mut self) {
        while let Ok(msg) = self.log_rx.try_recv() {
            self.log_messages.push(msg);
        }
        if self.log_messages.len() > MAX_LOG_LINES {
            let excess = self.log_messages.len() - MAX_LOG_LINES;
            self.log_messages.drain(..excess);
        }
    }

    /// Copy of the latest snapshot, so drawing never holds the lock.
    pub fn snapshot(&self) -> Telemetry {
        self.telemetry.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn scroll_log_up(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_add(n);
    }

    pub fn scroll_log_down(&mut self, n: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(n);
    }

    pub fn toggle_pause(&mut self) {
        self.send(Command::TogglePause);
    }

    pub fn toggle_overlay(&mut self) {
        self.send(Command::ToggleOverlay);
    }

    pub fn toggle_log(&mut self) {
        self.log_visible = !self.log_visible;
    }

    pub fn quit(&mut self) {
        self.send(Command::Quit);
        self.should_quit = true;
    }

    // the hunt thread is gone once it has quit; nothing left to tell it
    fn send(&self, cmd: Command) {
        self.cmd_tx.send(cmd).ok();
    }
}
