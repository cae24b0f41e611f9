//! Translates an `io::Error` arising from a filesystem syscall into the
//! human-readable message bash-family shells print, e.g. `No such file or directory`.

use std::io;

/// Map an `io::Error` to the message a POSIX shell would print for it.
///
/// Falls back to `Display`-ing the underlying OS error when the kind isn't
/// one of the common ones callers (redirect opens, `cd`) are expected to hit.
pub fn message(err: &io::Error) -> String {
  match err.raw_os_error() {
    Some(libc::ENOENT) => "No such file or directory".to_string(),
    Some(libc::ENOTDIR) => "Not a directory".to_string(),
    Some(libc::EACCES) => "Permission denied".to_string(),
    Some(libc::EISDIR) => "Is a directory".to_string(),
    Some(libc::ENOSPC) => "No space left on device".to_string(),
    _ => err.to_string(),
  }
}
