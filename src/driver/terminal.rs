//! Crossterm display adapter: raw-mode keyboard input and a plain-text HUD

use std::io::{self, stdout, Stdout, Write};
use std::time::Duration;
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::Print,
    terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen},
};
use super::input::{InputEvent, InputKind, Key};
use super::{DisplayAdapter, HudFrame};

/// Terminal session that restores the terminal on drop
pub struct TerminalDisplay {
    out: Stdout,
    quit: bool,
}

impl TerminalDisplay {
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;

        let mut out = stdout();
        if let Err(err) = execute!(out, EnterAlternateScreen, Hide) {
            let _ = disable_raw_mode();
            return Err(err);
        }

        Ok(Self { out, quit: false })
    }
}

impl Drop for TerminalDisplay {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.out, Show, LeaveAlternateScreen);
    }
}

fn translate(key: KeyEvent) -> InputEvent {
    // Auto-repeat is not a fresh press
    let kind = match key.kind {
        KeyEventKind::Press => InputKind::KeyDown,
        KeyEventKind::Release | KeyEventKind::Repeat => InputKind::KeyUp,
    };

    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => InputEvent::close(),
        KeyCode::Esc => InputEvent { key: Key::Escape, kind: InputKind::CloseRequested },
        KeyCode::Char(c) => InputEvent { key: Key::Char(c), kind },
        _ => InputEvent { key: Key::Other, kind },
    }
}

impl DisplayAdapter for TerminalDisplay {
    fn poll_events(&mut self) -> io::Result<Vec<InputEvent>> {
        let mut events = Vec::new();
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                let input = translate(key);
                if input.kind == InputKind::CloseRequested {
                    self.quit = true;
                }
                events.push(input);
            }
        }
        Ok(events)
    }

    fn render(&mut self, frame: &HudFrame) -> io::Result<()> {
        queue!(self.out, MoveTo(0, 0), Clear(ClearType::All))?;
        for (row, line) in frame.lines().iter().enumerate() {
            queue!(self.out, MoveTo(2, row as u16 + 1), Print(line))?;
        }
        self.out.flush()
    }

    fn quit_requested(&self) -> bool {
        self.quit
    }
}
