//! Raw-mode terminal I/O: termios snapshot/restore, keystroke decoding, and
//! the handful of escape sequences the line editor writes.

use std::io::{self, IsTerminal, Read, Write};
use std::os::unix::io::AsFd;

use nix::sys::termios::{
  self, ControlFlags, InputFlags, LocalFlags, OutputFlags, SpecialCharacterIndices, Termios,
};

/// A single decoded keystroke. Closed set, matched exhaustively everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
  Char(u8),
  Enter,
  Backspace,
  Delete,
  Tab,
  ArrowUp,
  ArrowDown,
  ArrowLeft,
  ArrowRight,
  Home,
  End,
  CtrlC,
  CtrlD,
  Unknown,
}

/// Owns the original termios snapshot and restores it on drop.
pub struct Terminal {
  original: Option<Termios>,
  raw: Option<Termios>,
  is_tty: bool,
}

impl Terminal {
  /// Snapshot the current terminal attributes and enter raw mode, iff stdin
  /// is a tty. In non-tty mode (batch/pipe input) nothing is touched.
  pub fn new() -> io::Result<Self> {
    let stdin_fd = io::stdin().as_fd();
    let is_tty = io::stdin().is_terminal();

    if !is_tty {
      return Ok(Self {
        original: None,
        raw: None,
        is_tty: false,
      });
    }

    let original = termios::tcgetattr(stdin_fd)
      .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    let raw = make_raw(&original);

    let mut term = Self {
      original: Some(original),
      raw: Some(raw),
      is_tty: true,
    };
    term.enter_raw()?;
    Ok(term)
  }

  pub fn is_tty(&self) -> bool {
    self.is_tty
  }

  /// Idempotent: applies the raw-mode attributes, no-op in non-tty mode.
  pub fn enter_raw(&mut self) -> io::Result<()> {
    if let Some(raw) = &self.raw {
      let fd = io::stdin().as_fd();
      termios::tcsetattr(fd, termios::SetArg::TCSANOW, raw)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    }
    Ok(())
  }

  /// Idempotent: restores the original (cooked) attributes, no-op in
  /// non-tty mode. Called around external-program execution.
  pub fn restore_cooked(&mut self) -> io::Result<()> {
    if let Some(original) = &self.original {
      let fd = io::stdin().as_fd();
      termios::tcsetattr(fd, termios::SetArg::TCSANOW, original)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    }
    Ok(())
  }

  /// Read and decode one key. Blocks on a single byte when interactive
  /// (VMIN=1, VTIME=0); reads one byte from stdin in non-tty mode too, but
  /// only distinguishes Enter/EOF from ordinary bytes there.
  pub fn read_key(&self) -> io::Result<Key> {
    let mut stdin = io::stdin();
    let mut buf = [0u8; 1];

    if !self.is_tty {
      return match stdin.read(&mut buf)? {
        0 => Ok(Key::CtrlD),
        _ => Ok(match buf[0] {
          0x0A => Key::Enter,
          b => Key::Char(b),
        }),
      };
    }

    if stdin.read(&mut buf)? == 0 {
      return Ok(Key::CtrlD);
    }

    Ok(match buf[0] {
      0x03 => Key::CtrlC,
      0x04 => Key::CtrlD,
      0x09 => Key::Tab,
      0x0A | 0x0D => Key::Enter,
      0x08 | 0x7F => Key::Backspace,
      0x1B => self.read_escape_sequence()?,
      b => Key::Char(b),
    })
  }

  fn read_escape_sequence(&self) -> io::Result<Key> {
    let mut stdin = io::stdin();
    let mut buf = [0u8; 1];

    if stdin.read(&mut buf)? == 0 {
      return Ok(Key::Unknown);
    }
    if buf[0] != b'[' {
      return Ok(Key::Unknown);
    }

    if stdin.read(&mut buf)? == 0 {
      return Ok(Key::Unknown);
    }

    Ok(match buf[0] {
      b'A' => Key::ArrowUp,
      b'B' => Key::ArrowDown,
      b'C' => Key::ArrowRight,
      b'D' => Key::ArrowLeft,
      b'H' => Key::Home,
      b'F' => Key::End,
      b'3' => {
        // "ESC [ 3 ~": discard the trailing '~'.
        let _ = stdin.read(&mut buf)?;
        Key::Delete
      }
      _ => Key::Unknown,
    })
  }

  pub fn write(&self, bytes: &[u8]) {
    let _ = io::stdout().write_all(bytes);
    let _ = io::stdout().flush();
  }

  pub fn bell(&self) {
    self.write(&[0x07]);
  }

  pub fn clear_line(&self) {
    self.write(b"\r\x1B[K");
  }

  pub fn move_cursor_left(&self, n: usize) {
    if n == 0 {
      return;
    }
    self.write(format!("\x1B[{}D", n).as_bytes());
  }

  pub fn move_cursor_right(&self, n: usize) {
    if n == 0 {
      return;
    }
    self.write(format!("\x1B[{}C", n).as_bytes());
  }
}

impl Drop for Terminal {
  fn drop(&mut self) {
    let _ = self.restore_cooked();
  }
}

fn make_raw(original: &Termios) -> Termios {
  let mut raw = original.clone();

  raw.input_flags &= !(InputFlags::BRKINT
    | InputFlags::ICRNL
    | InputFlags::INPCK
    | InputFlags::ISTRIP
    | InputFlags::IXON);
  raw.output_flags &= !(OutputFlags::OPOST);
  raw.control_flags |= ControlFlags::CS8;
  raw.local_flags &=
    !(LocalFlags::ECHO | LocalFlags::ICANON | LocalFlags::IEXTEN | LocalFlags::ISIG);

  raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 1;
  raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 0;

  raw
}
