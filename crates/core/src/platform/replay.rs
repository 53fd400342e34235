use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::logger;
use crate::types::*;
use super::GameWindow;

/// Plays back a directory of PNG screenshots in name order, looping.
/// Inputs are only logged. Useful for tuning thresholds offline.
pub struct ReplayWindow {
    files: Vec<PathBuf>,
    next: usize,
    size: (u32, u32),
}

impl ReplayWindow {
    pub fn load(dir: &Path) -> Result<Self> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("reading replay dir {}", dir.display()))?
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .map_or(false, |ext| ext.eq_ignore_ascii_case("png"))
            })
            .collect();
        files.sort();

        let Some(first) = files.first() else {
            bail!("no .png frames in {}", dir.display());
        };
        let size = image::image_dimensions(first)
            .with_context(|| format!("reading {}", first.display()))?;

        logger::info_p("replay", &format!("{} frame(s) from {}", files.len(), dir.display()));
        Ok(Self { files, next: 0, size })
    }
}

impl GameWindow for ReplayWindow {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn capture(&mut self) -> Option<Frame> {
        let path = &self.files[self.next];
        self.next = (self.next + 1) % self.files.len();
        match image::open(path) {
            Ok(img) => Some(Frame::new(img.to_rgb8())),
            Err(e) => {
                logger::error_p("replay", &format!("{}: {}", path.display(), e));
                None
            }
        }
    }

    fn press(&mut self, key: &str) {
        logger::info_p("replay", &format!("press(\"{}\")", key));
    }

    fn key_down(&mut self, key: &str) {
        logger::info_p("replay", &format!("key_down(\"{}\")", key));
    }

    fn key_up(&mut self, key: &str) {
        logger::info_p("replay", &format!("key_up(\"{}\")", key));
    }

    fn click(&mut self, p: Point) {
        logger::info_p("replay", &format!("click({}, {})", p.x, p.y));
    }

    fn move_to(&mut self, p: Point) {
        logger::info_p("replay", &format!("move_to({}, {})", p.x, p.y));
    }

    fn mouse_down(&mut self, button: MouseButton) {
        logger::info_p("replay", &format!("mouse_down({:?})", button));
    }

    fn mouse_up(&mut self, button: MouseButton) {
        logger::info_p("replay", &format!("mouse_up({:?})", button));
    }
}
