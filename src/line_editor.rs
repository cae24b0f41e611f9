//! Editable line buffer with cursor, history navigation and two-stage TAB
//! completion, driven by [`Terminal::read_key`] events.

use crate::history::History;
use crate::terminal::{Key, Terminal};

/// What happened after a single call to `handle_key`.
#[derive(Debug, PartialEq, Eq)]
pub enum Action {
  ContinueEditing,
  Submit,
  Eof,
}

/// Supplies the candidate set for TAB completion. Implemented by whatever
/// combines builtin names with [`crate::path_resolver::PathResolver`]
/// results; kept as a trait so the editor doesn't depend on either directly.
pub trait Completer {
  fn complete(&self, prefix: &str) -> Vec<String>;
}

pub struct LineEditor {
  buffer: Vec<u8>,
  cursor: usize,
  history: History,
  history_index: Option<usize>,
  saved_line: Vec<u8>,
  last_key_was_tab: bool,
  is_tty: bool,
}

impl LineEditor {
  pub fn new(is_tty: bool) -> Self {
    Self {
      buffer: Vec::new(),
      cursor: 0,
      history: History::new(),
      history_index: None,
      saved_line: Vec::new(),
      last_key_was_tab: false,
      is_tty,
    }
  }

  pub fn history(&self) -> &History {
    &self.history
  }

  pub fn history_mut(&mut self) -> &mut History {
    &mut self.history
  }

  /// Decode the current buffer as a line of text. Invalid UTF-8 bytes are
  /// replaced rather than rejected.
  pub fn line(&self) -> String {
    String::from_utf8_lossy(&self.buffer).into_owned()
  }

  fn reset(&mut self) {
    self.buffer.clear();
    self.cursor = 0;
    self.history_index = None;
    self.saved_line.clear();
    self.last_key_was_tab = false;
  }

  /// Process one decoded key, returning what the caller should do next.
  /// Call `reset()` is implicit at `Submit`/`Eof` via the caller starting a
  /// fresh `read_line` loop; this method only mutates in-progress state.
  pub fn handle_key(
    &mut self,
    key: Key,
    terminal: &Terminal,
    completer: &dyn Completer,
  ) -> Action {
    let was_tab = matches!(key, Key::Tab);

    let action = match key {
      Key::Char(b) => {
        self.insert_char(b, terminal);
        Action::ContinueEditing
      }
      Key::Backspace => {
        self.backspace(terminal);
        Action::ContinueEditing
      }
      Key::Delete => {
        self.delete(terminal);
        Action::ContinueEditing
      }
      Key::ArrowLeft => {
        if self.cursor > 0 {
          self.cursor -= 1;
          if self.is_tty {
            terminal.move_cursor_left(1);
          }
        } else if self.is_tty {
          terminal.bell();
        }
        Action::ContinueEditing
      }
      Key::ArrowRight => {
        if self.cursor < self.buffer.len() {
          self.cursor += 1;
          if self.is_tty {
            terminal.move_cursor_right(1);
          }
        } else if self.is_tty {
          terminal.bell();
        }
        Action::ContinueEditing
      }
      Key::Home => {
        if self.is_tty {
          terminal.move_cursor_left(self.cursor);
        }
        self.cursor = 0;
        Action::ContinueEditing
      }
      Key::End => {
        let delta = self.buffer.len() - self.cursor;
        if self.is_tty {
          terminal.move_cursor_right(delta);
        }
        self.cursor = self.buffer.len();
        Action::ContinueEditing
      }
      Key::Enter => {
        if self.is_tty {
          terminal.write(b"\n");
        }
        Action::Submit
      }
      Key::CtrlD => {
        if self.buffer.is_empty() {
          Action::Eof
        } else {
          if self.is_tty {
            terminal.bell();
          }
          Action::ContinueEditing
        }
      }
      Key::CtrlC => {
        if self.is_tty {
          terminal.bell();
        }
        Action::ContinueEditing
      }
      Key::ArrowUp => {
        self.history_prev(terminal);
        Action::ContinueEditing
      }
      Key::ArrowDown => {
        self.history_next(terminal);
        Action::ContinueEditing
      }
      Key::Tab => {
        self.complete(terminal, completer);
        Action::ContinueEditing
      }
      Key::Unknown => {
        if self.is_tty {
          terminal.bell();
        }
        Action::ContinueEditing
      }
    };

    if !was_tab {
      self.last_key_was_tab = false;
    }

    if matches!(action, Action::Submit | Action::Eof) {
      self.reset();
    }

    action
  }

  fn insert_char(&mut self, b: u8, terminal: &Terminal) {
    if self.cursor == self.buffer.len() {
      self.buffer.push(b);
      self.cursor += 1;
      if self.is_tty {
        terminal.write(&[b]);
      }
    } else {
      self.buffer.insert(self.cursor, b);
      self.cursor += 1;
      if self.is_tty {
        let tail = &self.buffer[self.cursor - 1..];
        terminal.write(tail);
        terminal.move_cursor_left(self.buffer.len() - self.cursor);
      }
    }
  }

  fn backspace(&mut self, terminal: &Terminal) {
    if self.cursor == 0 {
      if self.is_tty {
        terminal.bell();
      }
      return;
    }
    self.buffer.remove(self.cursor - 1);
    self.cursor -= 1;
    if self.is_tty {
      terminal.write(b"\x08");
      let tail = &self.buffer[self.cursor..];
      terminal.write(tail);
      terminal.write(b" \x08");
      terminal.move_cursor_left(self.buffer.len() - self.cursor);
    }
  }

  fn delete(&mut self, terminal: &Terminal) {
    if self.cursor == self.buffer.len() {
      if self.is_tty {
        terminal.bell();
      }
      return;
    }
    self.buffer.remove(self.cursor);
    if self.is_tty {
      let tail = &self.buffer[self.cursor..];
      terminal.write(tail);
      terminal.write(b" \x08");
      terminal.move_cursor_left(self.buffer.len() - self.cursor);
    }
  }

  fn word_start(&self) -> Option<usize> {
    let head = &self.buffer[..self.cursor];
    if head.contains(&b' ') {
      return None;
    }
    Some(0)
  }

  fn complete(&mut self, terminal: &Terminal, completer: &dyn Completer) {
    let start = match self.word_start() {
      Some(start) => start,
      None => {
        if self.is_tty {
          terminal.bell();
        }
        return;
      }
    };

    let prefix = String::from_utf8_lossy(&self.buffer[start..self.cursor]).into_owned();
    if prefix.is_empty() {
      if self.is_tty {
        terminal.bell();
      }
      return;
    }

    let mut candidates = completer.complete(&prefix);
    candidates.sort();
    candidates.dedup();

    match candidates.len() {
      0 => {
        if self.is_tty {
          terminal.bell();
        }
      }
      1 => {
        let replacement = format!("{} ", candidates[0]);
        self.replace_word(start, &replacement, terminal);
      }
      _ => {
        let lcp = longest_common_prefix(&candidates);
        if lcp.len() > prefix.len() {
          self.replace_word(start, &lcp, terminal);
          self.last_key_was_tab = false;
          return;
        }

        if !self.last_key_was_tab {
          if self.is_tty {
            terminal.bell();
          }
          self.last_key_was_tab = true;
          return;
        }

        if self.is_tty {
          terminal.write(b"\n");
          terminal.write(candidates.join("  ").as_bytes());
          terminal.write(b"\n");
          terminal.write(b"$ ");
          terminal.write(&self.buffer);
        }
        self.last_key_was_tab = false;
      }
    }
  }

  fn replace_word(&mut self, start: usize, replacement: &str, terminal: &Terminal) {
    let tail = self.buffer[self.cursor..].to_vec();
    self.buffer.truncate(start);
    self.buffer.extend_from_slice(replacement.as_bytes());
    self.buffer.extend_from_slice(&tail);
    self.cursor = start + replacement.len();

    if self.is_tty {
      terminal.clear_line();
      terminal.write(b"$ ");
      terminal.write(&self.buffer);
      terminal.move_cursor_left(self.buffer.len() - self.cursor);
    }
  }

  fn history_prev(&mut self, terminal: &Terminal) {
    if self.history.is_empty() {
      if self.is_tty {
        terminal.bell();
      }
      return;
    }

    match self.history_index {
      None => {
        self.saved_line = self.buffer.clone();
        self.history_index = Some(0);
        self.set_buffer_from_history(0, terminal);
      }
      Some(idx) if idx + 1 < self.history.len() => {
        self.history_index = Some(idx + 1);
        self.set_buffer_from_history(idx + 1, terminal);
      }
      Some(_) => {
        if self.is_tty {
          terminal.bell();
        }
      }
    }
  }

  fn history_next(&mut self, terminal: &Terminal) {
    match self.history_index {
      None => {
        if self.is_tty {
          terminal.bell();
        }
      }
      Some(idx) if idx > 0 => {
        self.history_index = Some(idx - 1);
        self.set_buffer_from_history(idx - 1, terminal);
      }
      Some(_) => {
        self.history_index = None;
        let saved = std::mem::take(&mut self.saved_line);
        self.set_buffer(saved, terminal);
      }
    }
  }

  fn set_buffer_from_history(&mut self, index_from_top: usize, terminal: &Terminal) {
    let n = self.history.len();
    let entry = self.history.entries()[n - 1 - index_from_top].clone();
    self.set_buffer(entry.into_bytes(), terminal);
  }

  fn set_buffer(&mut self, new_buffer: Vec<u8>, terminal: &Terminal) {
    if self.is_tty {
      terminal.move_cursor_left(self.cursor);
      terminal.write(b"\x1B[K");
    }
    self.buffer = new_buffer;
    self.cursor = self.buffer.len();
    if self.is_tty {
      terminal.write(&self.buffer);
    }
  }
}

fn longest_common_prefix(candidates: &[String]) -> String {
  if candidates.is_empty() {
    return String::new();
  }
  let first = &candidates[0];
  let mut len = first.len();
  for candidate in &candidates[1..] {
    let common = first
      .bytes()
      .zip(candidate.bytes())
      .take_while(|(a, b)| a == b)
      .count();
    len = len.min(common);
  }
  first[..len].to_string()
}
