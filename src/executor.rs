//! Parses tokens into a [`Pipeline`] and runs it: per-stage redirection,
//! fork/exec for external programs, in-process or forked-child dispatch for
//! builtins, and exit-status propagation.

use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::io::{FromRawFd, RawFd};
use std::process::Stdio;

use crate::builtins::{self, Outcome as BuiltinOutcome};
use crate::errno;
use crate::history::History;
use crate::path_resolver::PathResolver;
use crate::terminal::Terminal;
use crate::token::{Token, TokenKind};

/// A single pipeline stage.
#[derive(Debug, Default, Clone)]
pub struct Command {
  pub argv: Vec<String>,
  pub stdout_file: Option<String>,
  pub stdout_append: bool,
  pub stderr_file: Option<String>,
  pub stderr_append: bool,
}

#[derive(Debug, Default)]
pub struct Pipeline {
  pub commands: Vec<Command>,
}

/// What the REPL should do after running one pipeline.
pub enum RunOutcome {
  Continue(i32),
  Exit(i32),
}

/// A stage that was spawned as a separate process (external program, or a
/// builtin with a pipe neighbour), paired with its position in the pipeline
/// so the reap loop can tell whether it was the last stage.
struct SpawnedChild {
  stage_index: usize,
  kind: SpawnedChildKind,
}

enum SpawnedChildKind {
  External(std::process::Child),
  Forked(libc::pid_t),
}

/// Parse a token slice into a [`Pipeline`].
pub fn parse(tokens: &[Token]) -> crate::error::Result<Pipeline> {
  let mut commands = Vec::new();
  let mut current = Command::default();
  let mut i = 0;

  while i < tokens.len() {
    let token = &tokens[i];
    match token.kind {
      TokenKind::Word => {
        current.argv.push(token.value.clone());
        i += 1;
      }
      TokenKind::Pipe => {
        commands.push(std::mem::take(&mut current));
        i += 1;
      }
      TokenKind::RedirectOut | TokenKind::RedirectAppend => {
        let target = next_word(tokens, i)?;
        current.stdout_file = Some(target.clone());
        current.stdout_append = token.kind == TokenKind::RedirectAppend;
        i += 2;
      }
      TokenKind::RedirectErr | TokenKind::RedirectErrAppend => {
        let target = next_word(tokens, i)?;
        current.stderr_file = Some(target.clone());
        current.stderr_append = token.kind == TokenKind::RedirectErrAppend;
        i += 2;
      }
    }
  }
  commands.push(current);

  Ok(Pipeline { commands })
}

fn next_word(tokens: &[Token], redirect_index: usize) -> crate::error::Result<String> {
  match tokens.get(redirect_index + 1) {
    Some(t) if t.kind == TokenKind::Word => Ok(t.value.clone()),
    _ => Err(crate::error::Error::MissingRedirectTarget),
  }
}

pub struct Executor<'a> {
  pub path_resolver: &'a PathResolver,
}

impl<'a> Executor<'a> {
  pub fn new(path_resolver: &'a PathResolver) -> Self {
    Self { path_resolver }
  }

  /// Execute a fully parsed pipeline. Every stage is spawned before any is
  /// waited on, so a multi-stage pipeline's stages run concurrently and
  /// exchange bytes through their pipes rather than serializing one stage's
  /// entire output through its pipe buffer before the next stage starts
  /// reading; the result is the last stage's exit status, or a request to
  /// terminate the REPL if the last stage was `exit`.
  pub fn run(
    &self,
    pipeline: &Pipeline,
    terminal: &mut Terminal,
    history: &mut History,
    last_status: i32,
  ) -> RunOutcome {
    let n = pipeline.commands.len();
    if n == 0 {
      return RunOutcome::Continue(0);
    }

    let mut pipes: Vec<(RawFd, RawFd)> = Vec::with_capacity(n.saturating_sub(1));
    for _ in 0..n.saturating_sub(1) {
      let mut fds = [0i32; 2];
      // CLOEXEC: a stage that forks+execs an external program must not leak
      // pipe ends belonging to *other* boundaries into that program; exec()
      // closes them for us. The fd actually wired to 0/1/2 survives exec
      // because dup2's target descriptor never carries FD_CLOEXEC.
      if unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) } != 0 {
        eprintln!("shell: failed to create pipe: {}", io::Error::last_os_error());
        return RunOutcome::Continue(1);
      }
      pipes.push((fds[0], fds[1]));
    }

    let mut children: Vec<SpawnedChild> = Vec::new();
    let mut last_code = 0;
    let mut exit_requested: Option<i32> = None;
    let mut spawned_external = false;

    for (i, cmd) in pipeline.commands.iter().enumerate() {
      let is_last = i == n - 1;
      let stdin_fd = if i > 0 { Some(pipes[i - 1].0) } else { None };
      let stdout_pipe_fd = if !is_last { Some(pipes[i].1) } else { None };

      // Every pipe end not consumed by *this* stage is irrelevant to it;
      // close it here so a forked child doesn't inherit fds meant for
      // other stages.
      let close_in_child: Vec<RawFd> = pipes
        .iter()
        .flat_map(|(r, w)| {
          let mut fds = Vec::new();
          if Some(*r) != stdin_fd {
            fds.push(*r);
          }
          if Some(*w) != stdout_pipe_fd {
            fds.push(*w);
          }
          fds
        })
        .collect();

      if cmd.argv.is_empty() {
        close_parent_side(stdin_fd, stdout_pipe_fd);
        last_code = 0;
        continue;
      }

      let name = &cmd.argv[0];
      let is_builtin = builtins::is_builtin(name);
      let has_pipe_neighbour = stdin_fd.is_some() || stdout_pipe_fd.is_some();

      if is_builtin && !has_pipe_neighbour {
        let code = self.run_builtin_inline(cmd, history, last_status, &mut exit_requested);
        last_code = code;
        continue;
      }

      if is_builtin {
        match unsafe { libc::fork() } {
          0 => {
            apply_stdio(stdin_fd, stdout_pipe_fd, cmd);
            for fd in &close_in_child {
              unsafe { libc::close(*fd) };
            }
            let code = run_builtin_in_child(cmd, self.path_resolver, history, last_status);
            std::process::exit(code);
          }
          pid if pid > 0 => {
            close_parent_side(stdin_fd, stdout_pipe_fd);
            children.push(SpawnedChild {
              stage_index: i,
              kind: SpawnedChildKind::Forked(pid),
            });
          }
          _ => {
            eprintln!("shell: fork failed: {}", io::Error::last_os_error());
            close_parent_side(stdin_fd, stdout_pipe_fd);
            last_code = 1;
          }
        }
        continue;
      }

      // External stage: spawn now but don't wait yet, so this stage's
      // output drains into the next stage's pipe while that stage is
      // already running instead of blocking behind a full pipe buffer.
      match self.path_resolver.resolve(name) {
        None => {
          write_to_redirect_or(cmd.stderr_file.as_deref(), cmd.stderr_append, |w| {
            writeln!(w, "{}: command not found", name)
          });
          close_parent_side(stdin_fd, stdout_pipe_fd);
          last_code = 127;
        }
        Some(resolved_path) => {
          if !spawned_external {
            terminal.restore_cooked().ok();
            spawned_external = true;
          }
          // spawn_external takes ownership of stdin_fd/stdout_pipe_fd: each is
          // either wrapped into a Stdio (closed when the Command is dropped)
          // or closed directly on an error path. Closing them again here
          // would race with whatever the OS has since reused the fd number
          // for.
          match spawn_external(&resolved_path, cmd, stdin_fd, stdout_pipe_fd) {
            Ok(child) => {
              children.push(SpawnedChild {
                stage_index: i,
                kind: SpawnedChildKind::External(child),
              });
            }
            Err(e) => {
              eprintln!("shell: {}: {}", name, e);
              last_code = 126;
            }
          }
        }
      }
    }

    // Reap every spawned child, in spawn order. The last pipeline stage's
    // status only matters if that stage was itself spawned rather than run
    // inline; the other branches above already set `last_code` directly.
    for spawned in children {
      let is_last_stage = spawned.stage_index == n - 1;
      match spawned.kind {
        SpawnedChildKind::External(mut child) => match child.wait() {
          Ok(status) if is_last_stage => last_code = exit_code_from_status(status),
          Ok(_) => {}
          Err(e) => {
            eprintln!("shell: {}", e);
            if is_last_stage {
              last_code = 1;
            }
          }
        },
        SpawnedChildKind::Forked(pid) => {
          let mut status: libc::c_int = 0;
          unsafe { libc::waitpid(pid, &mut status, 0) };
          if is_last_stage {
            last_code = exit_code_from_wait_status(status);
          }
        }
      }
    }

    if spawned_external {
      terminal.enter_raw().ok();
    }

    match exit_requested {
      Some(code) => RunOutcome::Exit(code),
      None => RunOutcome::Continue(last_code),
    }
  }

  fn run_builtin_inline(
    &self,
    cmd: &Command,
    history: &mut History,
    last_status: i32,
    exit_requested: &mut Option<i32>,
  ) -> i32 {
    let mut stdout_file = match open_redirect_file(cmd.stdout_file.as_deref(), cmd.stdout_append) {
      Ok(f) => f,
      Err((path, e)) => {
        eprintln!("{}: {}", path, errno::message(&e));
        return 1;
      }
    };
    let mut stderr_file = match open_redirect_file(cmd.stderr_file.as_deref(), cmd.stderr_append) {
      Ok(f) => f,
      Err((path, e)) => {
        eprintln!("{}: {}", path, errno::message(&e));
        return 1;
      }
    };

    let mut stdout_writer: Box<dyn Write> = match &mut stdout_file {
      Some(f) => Box::new(f),
      None => Box::new(io::stdout()),
    };
    let mut stderr_writer: Box<dyn Write> = match &mut stderr_file {
      Some(f) => Box::new(f),
      None => Box::new(io::stderr()),
    };

    let outcome = builtins::run(
      &cmd.argv,
      stdout_writer.as_mut(),
      stderr_writer.as_mut(),
      history,
      self.path_resolver,
      last_status,
    );

    let _ = stdout_writer.flush();
    let _ = stderr_writer.flush();

    match outcome {
      Some(BuiltinOutcome::Ran(code)) => code,
      Some(BuiltinOutcome::Exit(code)) => {
        *exit_requested = Some(code);
        code
      }
      None => 0,
    }
  }
}

fn apply_stdio(stdin_fd: Option<RawFd>, stdout_pipe_fd: Option<RawFd>, cmd: &Command) {
  if let Some(fd) = stdin_fd {
    unsafe {
      libc::dup2(fd, 0);
      libc::close(fd);
    }
  }
  if let Some(fd) = stdout_pipe_fd {
    unsafe {
      libc::dup2(fd, 1);
      libc::close(fd);
    }
  }
  if let Some(path) = &cmd.stdout_file {
    redirect_fd_to_file(1, path, cmd.stdout_append);
  }
  if let Some(path) = &cmd.stderr_file {
    redirect_fd_to_file(2, path, cmd.stderr_append);
  }
}

fn redirect_fd_to_file(target_fd: RawFd, path: &str, append: bool) {
  let c_path = match CString::new(path) {
    Ok(p) => p,
    Err(_) => std::process::exit(1),
  };
  let flags = libc::O_WRONLY
    | libc::O_CREAT
    | if append { libc::O_APPEND } else { libc::O_TRUNC };
  let fd = unsafe { libc::open(c_path.as_ptr(), flags, 0o644) };
  if fd < 0 {
    eprintln!("{}: {}", path, io::Error::last_os_error());
    std::process::exit(1);
  }
  unsafe {
    libc::dup2(fd, target_fd);
    libc::close(fd);
  }
}

/// Runs in a forked child: `history` is a snapshot of the real session
/// history as of the fork (fork duplicates the whole address space), so a
/// piped `history` stage still sees every entry recorded so far. Any
/// mutation (`-a`/`-r`) is local to this clone and vanishes when the child
/// exits, matching a subshell's scoping.
fn run_builtin_in_child(
  cmd: &Command,
  path_resolver: &PathResolver,
  history: &History,
  last_status: i32,
) -> i32 {
  let mut history = history.clone();
  let code = match builtins::run(
    &cmd.argv,
    &mut io::stdout(),
    &mut io::stderr(),
    &mut history,
    path_resolver,
    last_status,
  ) {
    Some(BuiltinOutcome::Ran(code)) => code,
    Some(BuiltinOutcome::Exit(code)) => code,
    None => 0,
  };
  // Once fd 1/2 point at a pipe or file, Rust's global Stdout/Stderr decide
  // to block-buffer (they only line-buffer for a tty); std::process::exit
  // skips destructors, so without an explicit flush the builtin's output
  // never reaches the write end.
  let _ = io::stdout().flush();
  let _ = io::stderr().flush();
  code
}

fn close_parent_side(stdin_fd: Option<RawFd>, stdout_pipe_fd: Option<RawFd>) {
  if let Some(fd) = stdin_fd {
    unsafe { libc::close(fd) };
  }
  if let Some(fd) = stdout_pipe_fd {
    unsafe { libc::close(fd) };
  }
}

fn open_redirect_file(path: Option<&str>, append: bool) -> Result<Option<File>, (String, io::Error)> {
  match path {
    None => Ok(None),
    Some(path) => {
      let mut options = OpenOptions::new();
      options.write(true).create(true);
      if append {
        options.append(true);
      } else {
        options.truncate(true);
      }
      options
        .open(path)
        .map(Some)
        .map_err(|e| (path.to_string(), e))
    }
  }
}

fn write_to_redirect_or(path: Option<&str>, append: bool, f: impl FnOnce(&mut dyn Write) -> io::Result<()>) {
  match open_redirect_file(path, append) {
    Ok(Some(mut file)) => {
      let _ = f(&mut file);
    }
    Ok(None) => {
      let _ = f(&mut io::stderr());
    }
    Err((path, e)) => {
      eprintln!("{}: {}", path, errno::message(&e));
    }
  }
}

/// Builds the child's stdio and spawns it. Every raw fd handed in is either
/// consumed into a `Stdio` (closed in the parent once `Command` is dropped)
/// or closed explicitly on every return path, so the caller never touches
/// `stdin_fd`/`stdout_pipe_fd` again after calling this.
fn spawn_external(
  resolved_path: &str,
  cmd: &Command,
  stdin_fd: Option<RawFd>,
  stdout_pipe_fd: Option<RawFd>,
) -> io::Result<std::process::Child> {
  use std::os::unix::process::CommandExt;

  let stdout_stdio = match &cmd.stdout_file {
    Some(path) => match open_redirect_file(Some(path), cmd.stdout_append).map_err(|(_, e)| e) {
      Ok(file) => {
        if let Some(fd) = stdout_pipe_fd {
          unsafe { libc::close(fd) };
        }
        file.map(Stdio::from).unwrap_or_else(Stdio::inherit)
      }
      Err(e) => {
        close_parent_side(stdin_fd, stdout_pipe_fd);
        return Err(e);
      }
    },
    None => match stdout_pipe_fd {
      Some(fd) => Stdio::from(unsafe { File::from_raw_fd(fd) }),
      None => Stdio::inherit(),
    },
  };

  let stderr_stdio = match &cmd.stderr_file {
    Some(path) => match open_redirect_file(Some(path), cmd.stderr_append).map_err(|(_, e)| e) {
      Ok(file) => file.map(Stdio::from).unwrap_or_else(Stdio::inherit),
      Err(e) => {
        if let Some(fd) = stdin_fd {
          unsafe { libc::close(fd) };
        }
        return Err(e);
      }
    },
    None => Stdio::inherit(),
  };

  let stdin_stdio = match stdin_fd {
    Some(fd) => Stdio::from(unsafe { File::from_raw_fd(fd) }),
    None => Stdio::inherit(),
  };

  let mut process = std::process::Command::new(resolved_path);
  process.arg0(&cmd.argv[0]);
  process.args(&cmd.argv[1..]);
  process.stdin(stdin_stdio);
  process.stdout(stdout_stdio);
  process.stderr(stderr_stdio);
  process.spawn()
}

fn exit_code_from_status(status: std::process::ExitStatus) -> i32 {
  use std::os::unix::process::ExitStatusExt;
  match status.code() {
    Some(code) => code,
    None => 128 + status.signal().unwrap_or(0),
  }
}

/// Decodes a raw `waitpid` status for a forked builtin child (reaped
/// directly via `libc::waitpid` rather than `std::process::Child::wait`).
/// Mirrors the `WIFEXITED`/`WEXITSTATUS`/`WTERMSIG` C macros, which the
/// `libc` crate doesn't expose as functions.
fn exit_code_from_wait_status(status: libc::c_int) -> i32 {
  let signal = status & 0x7f;
  if signal == 0 {
    (status >> 8) & 0xff
  } else {
    128 + signal
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::token::tokenize;

  fn parse_str(s: &str) -> Pipeline {
    parse(&tokenize(s).unwrap()).unwrap()
  }

  #[test]
  fn single_command_no_redirects() {
    let pipeline = parse_str("echo hello");
    assert_eq!(pipeline.commands.len(), 1);
    assert_eq!(pipeline.commands[0].argv, vec!["echo", "hello"]);
    assert!(pipeline.commands[0].stdout_file.is_none());
  }

  #[test]
  fn pipeline_splits_on_pipe() {
    let pipeline = parse_str("ls | grep foo | wc -l");
    assert_eq!(pipeline.commands.len(), 3);
    assert_eq!(pipeline.commands[0].argv, vec!["ls"]);
    assert_eq!(pipeline.commands[1].argv, vec!["grep", "foo"]);
    assert_eq!(pipeline.commands[2].argv, vec!["wc", "-l"]);
  }

  #[test]
  fn redirect_out_sets_stdout_file() {
    let pipeline = parse_str("echo hi > out.txt");
    assert_eq!(
      pipeline.commands[0].stdout_file,
      Some("out.txt".to_string())
    );
    assert!(!pipeline.commands[0].stdout_append);
  }

  #[test]
  fn redirect_append_sets_flag() {
    let pipeline = parse_str("echo hi >> out.txt");
    assert!(pipeline.commands[0].stdout_append);
  }

  #[test]
  fn redirect_err_sets_stderr_file() {
    let pipeline = parse_str("ls /nope 2> err.txt");
    assert_eq!(
      pipeline.commands[0].stderr_file,
      Some("err.txt".to_string())
    );
  }

  #[test]
  fn missing_redirect_target_errors() {
    let tokens = tokenize("echo hi >").unwrap();
    assert!(matches!(
      parse(&tokens),
      Err(crate::error::Error::MissingRedirectTarget)
    ));
  }

  #[test]
  fn empty_argv_stage_is_noop() {
    let pipeline = parse_str("");
    assert_eq!(pipeline.commands.len(), 1);
    assert!(pipeline.commands[0].argv.is_empty());
  }
}
