//! Display adapter that replays scripted input and records frames

use std::collections::VecDeque;
use std::io;
use street_empire::driver::{DisplayAdapter, HudFrame, InputEvent};

#[derive(Debug, Default)]
pub struct ScriptedDisplay {
    /// One batch of events per poll
    script: VecDeque<Vec<InputEvent>>,
    pub frames: Vec<HudFrame>,
    /// Frames rendered successfully before every render fails
    render_budget: Option<usize>,
}

impl ScriptedDisplay {
    pub fn new(script: Vec<Vec<InputEvent>>) -> Self {
        Self {
            script: script.into(),
            frames: Vec::new(),
            render_budget: None,
        }
    }

    pub fn failing_render() -> Self {
        Self::default().fail_after_frames(0)
    }

    /// Render `frames` frames, then fail as a closed terminal would
    pub fn fail_after_frames(mut self, frames: usize) -> Self {
        self.render_budget = Some(frames);
        self
    }

    pub fn last_frame(&self) -> Option<&HudFrame> {
        self.frames.last()
    }
}

impl DisplayAdapter for ScriptedDisplay {
    fn poll_events(&mut self) -> io::Result<Vec<InputEvent>> {
        Ok(self.script.pop_front().unwrap_or_default())
    }

    fn render(&mut self, frame: &HudFrame) -> io::Result<()> {
        if self.render_budget.is_some_and(|budget| self.frames.len() >= budget) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "display closed"));
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn quit_requested(&self) -> bool {
        false
    }
}
