//! Password prompt that does not echo input

use anyhow::{bail, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use std::io::Write;

/// Outcome of feeding one key to the prompt
#[derive(Debug, PartialEq, Eq)]
enum Step {
    Continue,
    Done,
    Cancelled,
}

fn apply_key(buffer: &mut String, key: KeyEvent) -> Step {
    if key.kind == KeyEventKind::Release {
        return Step::Continue;
    }
    match key.code {
        KeyCode::Enter => Step::Done,
        KeyCode::Esc => Step::Cancelled,
        KeyCode::Char('c') | KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Step::Cancelled
        }
        KeyCode::Backspace => {
            buffer.pop();
            Step::Continue
        }
        KeyCode::Char(c) => {
            buffer.push(c);
            Step::Continue
        }
        _ => Step::Continue,
    }
}

/// Restores cooked mode when dropped, even on early return
struct RawMode;

impl RawMode {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Prompt for a password with the terminal echo switched off
pub fn read_password(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    std::io::stdout().flush()?;

    let mut buffer = String::new();
    let step = {
        let _raw = RawMode::enable()?;
        loop {
            if let Event::Key(key) = event::read()? {
                match apply_key(&mut buffer, key) {
                    Step::Continue => continue,
                    step => break step,
                }
            }
        }
    };
    println!();

    if step == Step::Cancelled {
        bail!("Password entry cancelled");
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_typing_and_backspace() {
        let mut buffer = String::new();
        for code in [KeyCode::Char('p'), KeyCode::Char('w'), KeyCode::Char('x'), KeyCode::Backspace] {
            assert_eq!(apply_key(&mut buffer, press(code)), Step::Continue);
        }
        assert_eq!(apply_key(&mut buffer, press(KeyCode::Enter)), Step::Done);
        assert_eq!(buffer, "pw");
    }

    #[test]
    fn test_ctrl_c_cancels() {
        let mut buffer = String::new();
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(apply_key(&mut buffer, key), Step::Cancelled);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_key_release_is_ignored() {
        let mut buffer = String::new();
        let mut key = press(KeyCode::Char('a'));
        key.kind = KeyEventKind::Release;
        assert_eq!(apply_key(&mut buffer, key), Step::Continue);
        assert!(buffer.is_empty());
    }
}
