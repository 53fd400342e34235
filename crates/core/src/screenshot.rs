use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::types::{Frame, ScreenshotEvent};

/// Where notable frames (deaths, loop errors) end up.
pub trait ScreenshotSink: Send {
    /// `Ok(None)` when nothing was written.
    fn save(&mut self, event: ScreenshotEvent, frame: Option<&Frame>) -> Result<Option<PathBuf>>;
}

/// Writes `<event>_<timestamp>.png` files into a directory.
pub struct DirSink {
    dir: PathBuf,
}

impl DirSink {
    pub fn new(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create screenshot dir {}", dir.display()))?;
        Ok(Self { dir: dir.to_path_buf() })
    }
}

impl ScreenshotSink for DirSink {
    fn save(&mut self, event: ScreenshotEvent, frame: Option<&Frame>) -> Result<Option<PathBuf>> {
        let Some(frame) = frame else { return Ok(None) };
        let name = format!("{}_{}.png", event, Local::now().format("%Y%m%d_%H%M%S_%3f"));
        let path = self.dir.join(name);
        let img = frame.image();
        image::save_buffer(&path, img.as_raw(), img.width(), img.height(), image::ColorType::Rgb8)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(Some(path))
    }
}

pub struct NoScreenshots;

impl ScreenshotSink for NoScreenshots {
    fn save(&mut self, _event: ScreenshotEvent, _frame: Option<&Frame>) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}
