use crate::logger;
use crate::types::*;
use super::GameWindow;

/// Logs every input and never produces a frame.
pub struct StubWindow {
    width: u32,
    height: u32,
}

impl StubWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl GameWindow for StubWindow {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn capture(&mut self) -> Option<Frame> {
        None
    }

    fn press(&mut self, key: &str) {
        logger::info_p("stub", &format!("press(\"{}\")", key));
    }

    fn key_down(&mut self, key: &str) {
        logger::info_p("stub", &format!("key_down(\"{}\")", key));
    }

    fn key_up(&mut self, key: &str) {
        logger::info_p("stub", &format!("key_up(\"{}\")", key));
    }

    fn click(&mut self, p: Point) {
        logger::info_p("stub", &format!("click({}, {})", p.x, p.y));
    }

    fn move_to(&mut self, p: Point) {
        logger::info_p("stub", &format!("move_to({}, {})", p.x, p.y));
    }

    fn mouse_down(&mut self, button: MouseButton) {
        logger::info_p("stub", &format!("mouse_down({:?})", button));
    }

    fn mouse_up(&mut self, button: MouseButton) {
        logger::info_p("stub", &format!("mouse_up({:?})", button));
    }
}
