//! Builds the candidate set the line editor's TAB key asks for: builtin
//! names plus every executable name on `PATH`.

use crate::builtins;
use crate::line_editor::Completer;
use crate::path_resolver::PathResolver;
use crate::trie::Trie;

pub struct ShellCompleter<'a> {
  path_resolver: &'a PathResolver,
}

impl<'a> ShellCompleter<'a> {
  pub fn new(path_resolver: &'a PathResolver) -> Self {
    Self { path_resolver }
  }
}

impl<'a> Completer for ShellCompleter<'a> {
  fn complete(&self, prefix: &str) -> Vec<String> {
    let mut trie = Trie::new();
    for name in builtins::NAMES {
      trie.insert(name);
    }
    for name in self.path_resolver.completions(prefix) {
      trie.insert(name);
    }
    trie.get_completions(prefix)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn includes_builtin_names() {
    let resolver = PathResolver::new(String::new());
    let completer = ShellCompleter::new(&resolver);
    let mut candidates = completer.complete("ec");
    candidates.sort();
    assert_eq!(candidates, vec!["echo"]);
  }
}
