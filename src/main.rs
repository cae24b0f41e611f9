//! REPL glue: wires the terminal, line editor, tokenizer, executor and
//! history together into the read-eval-print loop.

use std::path::PathBuf;

use shell_core::completion::ShellCompleter;
use shell_core::executor::{self, Executor, RunOutcome};
use shell_core::line_editor::{Action, LineEditor};
use shell_core::path_resolver::PathResolver;
use shell_core::terminal::{Key, Terminal};

const PROMPT: &[u8] = b"$ ";

fn main() {
  let path_resolver = PathResolver::from_env();
  let mut terminal = match Terminal::new() {
    Ok(terminal) => terminal,
    Err(e) => {
      eprintln!("shell: failed to initialise terminal: {}", e);
      std::process::exit(1);
    }
  };

  let mut editor = LineEditor::new(terminal.is_tty());

  let histfile = histfile_path();
  if let Some(path) = &histfile {
    let _ = editor.history_mut().load_from_file(path);
  }

  let exit_code = run(&mut terminal, &mut editor, &path_resolver);

  if let Some(path) = &histfile {
    let _ = editor.history_mut().write_to_file(path);
  }

  std::process::exit(exit_code);
}

fn run(terminal: &mut Terminal, editor: &mut LineEditor, path_resolver: &PathResolver) -> i32 {
  let completer = ShellCompleter::new(path_resolver);
  let exec = Executor::new(path_resolver);
  let mut last_status = 0;

  loop {
    terminal.write(PROMPT);

    let line = match read_line(terminal, editor, &completer) {
      Some(line) => line,
      None => return last_status,
    };

    if line.trim().is_empty() {
      continue;
    }

    editor.history_mut().push(&line);

    let tokens = match shell_core::token::tokenize(&line) {
      Ok(tokens) => tokens,
      Err(e) => {
        eprintln!("shell: {}", e);
        last_status = 1;
        continue;
      }
    };

    let pipeline = match executor::parse(&tokens) {
      Ok(pipeline) => pipeline,
      Err(e) => {
        eprintln!("shell: {}", e);
        last_status = 1;
        continue;
      }
    };

    match exec.run(&pipeline, terminal, editor.history_mut(), last_status) {
      RunOutcome::Continue(code) => last_status = code,
      RunOutcome::Exit(code) => return code,
    }
  }
}

fn read_line(terminal: &mut Terminal, editor: &mut LineEditor, completer: &ShellCompleter) -> Option<String> {
  loop {
    let key = match terminal.read_key() {
      Ok(key) => key,
      Err(e) => {
        eprintln!("shell: {}", e);
        return None;
      }
    };

    // `handle_key` clears the buffer as soon as it returns Submit, so the
    // finished line has to be snapshotted before the Enter keystroke is
    // actually processed.
    if key == Key::Enter {
      let line = editor.line();
      editor.handle_key(key, terminal, completer);
      return Some(line);
    }

    if let Action::Eof = editor.handle_key(key, terminal, completer) {
      terminal.write(b"\n");
      return None;
    }
  }
}

fn histfile_path() -> Option<PathBuf> {
  std::env::var_os("HISTFILE").map(PathBuf::from)
}
