use std::sync::{Arc, Mutex};

use crate::types::*;
use super::GameWindow;

type Render = Box<dyn FnMut(&[InputEvent]) -> Option<Frame> + Send>;

/// Test double: records every input, and renders each captured frame from
/// the inputs seen so far. Lets tests model "health drops per skill press".
pub struct ScriptedWindow {
    size: (u32, u32),
    inputs: Arc<Mutex<Vec<InputEvent>>>,
    render: Render,
    captures: Arc<Mutex<u32>>,
}

impl ScriptedWindow {
    pub fn new<F>(width: u32, height: u32, render: F) -> Self
    where
        F: FnMut(&[InputEvent]) -> Option<Frame> + Send + 'static,
    {
        Self {
            size: (width, height),
            inputs: Arc::new(Mutex::new(Vec::new())),
            render: Box::new(render),
            captures: Arc::new(Mutex::new(0)),
        }
    }

    /// Shared view of the input log, still readable after the window is boxed away.
    pub fn inputs(&self) -> Arc<Mutex<Vec<InputEvent>>> {
        Arc::clone(&self.inputs)
    }

    pub fn capture_count(&self) -> Arc<Mutex<u32>> {
        Arc::clone(&self.captures)
    }

    fn record(&mut self, ev: InputEvent) {
        self.inputs.lock().unwrap_or_else(|e| e.into_inner()).push(ev);
    }
}

impl GameWindow for ScriptedWindow {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn capture(&mut self) -> Option<Frame> {
        *self.captures.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        let inputs = self.inputs.lock().unwrap_or_else(|e| e.into_inner()).clone();
        (self.render)(&inputs)
    }

    fn press(&mut self, key: &str) {
        self.record(InputEvent::Press(key.to_string()));
    }

    fn key_down(&mut self, key: &str) {
        self.record(InputEvent::KeyDown(key.to_string()));
    }

    fn key_up(&mut self, key: &str) {
        self.record(InputEvent::KeyUp(key.to_string()));
    }

    fn click(&mut self, p: Point) {
        self.record(InputEvent::Click(p));
    }

    fn move_to(&mut self, p: Point) {
        self.record(InputEvent::MoveTo(p));
    }

    fn mouse_down(&mut self, button: MouseButton) {
        self.record(InputEvent::MouseDown(button));
    }

    fn mouse_up(&mut self, button: MouseButton) {
        self.record(InputEvent::MouseUp(button));
    }
}

/// Presses of `keys` recorded after the most recent click.
pub fn presses_since_last_click(inputs: &[InputEvent], keys: &[String]) -> usize {
    let start = inputs
        .iter()
        .rposition(|e| matches!(e, InputEvent::Click(_)))
        .map_or(0, |i| i + 1);
    inputs[start..]
        .iter()
        .filter(|e| matches!(e, InputEvent::Press(k) if keys.contains(k)))
        .count()
}

pub fn last_click(inputs: &[InputEvent]) -> Option<Point> {
    inputs.iter().rev().find_map(|e| match e {
        InputEvent::Click(p) => Some(*p),
        _ => None,
    })
}
