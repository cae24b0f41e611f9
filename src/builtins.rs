//! Builtin dispatch contract: `run(argv, stdout, stderr) -> Option<exit_code>`
//! where `None` means `argv[0]` is not a recognised builtin name.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errno;
use crate::history::History;
use crate::path_resolver::PathResolver;

pub const NAMES: &[&str] = &["cd", "echo", "exit", "history", "pwd", "type"];

pub fn is_builtin(name: &str) -> bool {
  NAMES.contains(&name)
}

/// `exit` is reported out-of-band from the `Some(code)`/`None` builtin
/// contract via this distinguished outcome, so the REPL can tell "ran and
/// produced an exit code" apart from "asked to terminate".
pub enum Outcome {
  Ran(i32),
  Exit(i32),
}

/// Dispatch `argv[0]` against the recognised builtin names. Returns `None`
/// when it isn't one, so the caller falls through to external resolution.
pub fn run(
  argv: &[String],
  stdout: &mut dyn Write,
  stderr: &mut dyn Write,
  history: &mut History,
  path_resolver: &PathResolver,
  last_status: i32,
) -> Option<Outcome> {
  let name = argv.first()?.as_str();
  if !is_builtin(name) {
    return None;
  }

  let outcome = match name {
    "cd" => Outcome::Ran(cd(argv, stderr)),
    "echo" => Outcome::Ran(echo(argv, stdout)),
    "pwd" => Outcome::Ran(pwd(argv, stdout, stderr)),
    "type" => Outcome::Ran(type_(argv, stdout, stderr, path_resolver)),
    "history" => Outcome::Ran(history_cmd(argv, stdout, stderr, history)),
    "exit" => return Some(exit(argv, stderr, last_status)),
    _ => unreachable!("is_builtin guards the match"),
  };

  Some(outcome)
}

fn exit(argv: &[String], stderr: &mut dyn Write, last_status: i32) -> Outcome {
  match argv.len() {
    1 => Outcome::Exit(last_status),
    2 => match argv[1].parse::<i32>() {
      Ok(code) => Outcome::Exit(code),
      Err(_) => {
        let _ = writeln!(stderr, "exit: invalid code: {}", argv[1]);
        Outcome::Ran(1)
      }
    },
    _ => {
      let _ = writeln!(stderr, "exit: too many arguments");
      Outcome::Ran(1)
    }
  }
}

fn echo(argv: &[String], stdout: &mut dyn Write) -> i32 {
  let _ = writeln!(stdout, "{}", argv[1..].join(" "));
  0
}

fn cd(argv: &[String], stderr: &mut dyn Write) -> i32 {
  let home = std::env::var("HOME").ok().map(PathBuf::from);

  let target: PathBuf = match argv.get(1).map(String::as_str) {
    None | Some("~") => match &home {
      Some(home) => home.clone(),
      None => {
        let _ = writeln!(stderr, "cd: HOME not set");
        return 1;
      }
    },
    Some(path) if path == "~" || path.starts_with("~/") => match &home {
      Some(home) => {
        if path == "~" {
          home.clone()
        } else {
          home.join(&path[2..])
        }
      }
      None => {
        let _ = writeln!(stderr, "cd: HOME not set");
        return 1;
      }
    },
    Some(path) => PathBuf::from(path),
  };

  match std::env::set_current_dir(&target) {
    Ok(()) => 0,
    Err(e) => {
      let _ = writeln!(stderr, "cd: {}: {}", target.display(), errno::message(&e));
      1
    }
  }
}

fn pwd(argv: &[String], stdout: &mut dyn Write, stderr: &mut dyn Write) -> i32 {
  if argv.len() > 1 {
    let _ = writeln!(stderr, "pwd: expected 0 args");
    return 1;
  }
  match std::env::current_dir() {
    Ok(dir) => {
      let _ = writeln!(stdout, "{}", dir.display());
      0
    }
    Err(e) => {
      let _ = writeln!(stderr, "pwd: {}", errno::message(&e));
      1
    }
  }
}

fn type_(
  argv: &[String],
  stdout: &mut dyn Write,
  stderr: &mut dyn Write,
  path_resolver: &PathResolver,
) -> i32 {
  let target = match argv.get(1) {
    Some(t) => t,
    None => {
      let _ = writeln!(stderr, "type: expected 1 arg");
      return 1;
    }
  };

  if is_builtin(target) {
    let _ = writeln!(stdout, "{} is a shell builtin", target);
    return 0;
  }

  match path_resolver.resolve(target) {
    Some(path) => {
      let _ = writeln!(stdout, "{} is {}", target, path);
      0
    }
    None => {
      let _ = writeln!(stderr, "{}: not found", target);
      1
    }
  }
}

fn history_cmd(
  argv: &[String],
  stdout: &mut dyn Write,
  stderr: &mut dyn Write,
  history: &mut History,
) -> i32 {
  match argv.get(1).map(String::as_str) {
    Some("-a") | Some("-r") | Some("-w") => {
      let flag = argv[1].as_str();
      let path = match argv.get(2) {
        Some(p) => Path::new(p),
        None => {
          let _ = writeln!(stderr, "history: {} requires a file argument", flag);
          return 1;
        }
      };

      let result = match flag {
        "-a" => history.append_to_file(path),
        "-r" => history.read_from_file(path),
        "-w" => history.write_to_file(path),
        _ => unreachable!(),
      };

      match result {
        Ok(()) => 0,
        Err(e) => {
          let _ = writeln!(stderr, "history: {}: {}", path.display(), errno::message(&e));
          1
        }
      }
    }
    Some(n) => match n.parse::<usize>() {
      Ok(count) => {
        print_entries(stdout, history, history.len().saturating_sub(count));
        0
      }
      Err(_) => {
        let _ = writeln!(stderr, "history: numeric argument required");
        1
      }
    },
    None => {
      print_entries(stdout, history, 0);
      0
    }
  }
}

fn print_entries(stdout: &mut dyn Write, history: &History, skip: usize) {
  for (i, entry) in history.entries().iter().enumerate().skip(skip) {
    let _ = writeln!(stdout, "    {}  {}", i + 1, entry);
  }
}
