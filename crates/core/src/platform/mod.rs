pub mod replay;
pub mod scripted;
pub mod stub;

use std::path::Path;

use anyhow::Result;

use crate::logger;
use crate::types::*;

/// The game window as the control loop sees it: a frame source plus
/// fire-and-forget input. Coordinates are relative to the captured region.
pub trait GameWindow: Send {
    /// Size of the captured region
    fn size(&self) -> (u32, u32);
    /// `None` means no frame this tick, never a fatal error.
    fn capture(&mut self) -> Option<Frame>;
    fn press(&mut self, key: &str);
    fn key_down(&mut self, key: &str);
    fn key_up(&mut self, key: &str);
    fn click(&mut self, p: Point);
    fn move_to(&mut self, p: Point);
    fn mouse_down(&mut self, button: MouseButton);
    fn mouse_up(&mut self, button: MouseButton);
}

/// Create the window backend: PNG replay when a directory is given, else the logging stub.
pub fn create_window(replay_dir: Option<&Path>) -> Result<Box<dyn GameWindow>> {
    match replay_dir {
        Some(dir) => {
            logger::register_prefix("replay", logger::COLOR_BLUE);
            Ok(Box::new(replay::ReplayWindow::load(dir)?))
        }
        None => {
            logger::register_prefix("stub", logger::COLOR_GRAY);
            Ok(Box::new(stub::StubWindow::new(1920, 1080)))
        }
    }
}
