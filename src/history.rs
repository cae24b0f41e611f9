//! In-memory command history plus the four file-persistence operations the
//! `history` builtin delegates to (`-a`, `-r`, `-w`, and load-on-startup).

use std::fs;
use std::io::{self, Write};
use std::path::Path;

#[derive(Default, Clone)]
pub struct History {
  entries: Vec<String>,
  /// Index into `entries` up to which `append_to_file` has already written.
  last_appended: usize,
}

impl History {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn entries(&self) -> &[String] {
    &self.entries
  }

  /// Trim trailing whitespace, skip empty lines, skip exact duplicates of
  /// the immediately previous entry.
  pub fn push(&mut self, line: &str) {
    let trimmed = line.trim_end();
    if trimmed.is_empty() {
      return;
    }
    if self.entries.last().map(String::as_str) == Some(trimmed) {
      return;
    }
    self.entries.push(trimmed.to_string());
  }

  /// `history -r`: merge entries from `path` into the running session.
  /// Missing file is not an error.
  pub fn read_from_file(&mut self, path: &Path) -> io::Result<()> {
    for line in read_lines(path)? {
      self.push(&line);
    }
    Ok(())
  }

  /// Load history at startup; identical semantics to `read_from_file`,
  /// kept as a distinct name for call-site clarity.
  pub fn load_from_file(&mut self, path: &Path) -> io::Result<()> {
    self.read_from_file(path)
  }

  /// `history -w`: create/truncate `path` and write every entry.
  pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
    let mut file = fs::File::create(path)?;
    for entry in &self.entries {
      writeln!(file, "{}", entry)?;
    }
    Ok(())
  }

  /// `history -a`: write only entries accumulated since the previous append,
  /// then advance the append cursor.
  pub fn append_to_file(&mut self, path: &Path) -> io::Result<()> {
    let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
    for entry in &self.entries[self.last_appended..] {
      writeln!(file, "{}", entry)?;
    }
    self.last_appended = self.entries.len();
    Ok(())
  }
}

fn read_lines(path: &Path) -> io::Result<Vec<String>> {
  match fs::read_to_string(path) {
    Ok(contents) => Ok(
      contents
        .split('\n')
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect(),
    ),
    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
    Err(e) => Err(e),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn skips_empty_and_duplicate_lines() {
    let mut h = History::new();
    h.push("echo a");
    h.push("");
    h.push("   ");
    h.push("echo a");
    h.push("echo b");
    h.push("echo b");
    assert_eq!(h.entries(), &["echo a", "echo b"]);
  }

  #[test]
  fn trims_trailing_whitespace() {
    let mut h = History::new();
    h.push("echo a   ");
    assert_eq!(h.entries(), &["echo a"]);
  }

  #[test]
  fn write_then_read_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history");

    let mut h = History::new();
    h.push("echo a");
    h.push("echo b");
    h.write_to_file(&path).unwrap();

    let mut h2 = History::new();
    h2.read_from_file(&path).unwrap();
    assert_eq!(h2.entries(), &["echo a", "echo b"]);
  }

  #[test]
  fn load_from_missing_file_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nope");

    let mut h = History::new();
    h.load_from_file(&path).unwrap();
    assert!(h.is_empty());
  }

  #[test]
  fn append_only_writes_new_entries_since_last_append() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history");

    let mut h = History::new();
    h.push("echo a");
    h.append_to_file(&path).unwrap();
    h.push("echo b");
    h.append_to_file(&path).unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "echo a\necho b\n");
  }
}
