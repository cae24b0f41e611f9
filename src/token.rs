//! Splits a raw input line into [`Token`]s, honouring single/double quoting,
//! backslash escapes, and the pipe/redirection operators.

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
  Word,
  Pipe,
  RedirectOut,
  RedirectAppend,
  RedirectErr,
  RedirectErrAppend,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub value: String,
}

impl Token {
  fn word(value: String) -> Self {
    Self {
      kind: TokenKind::Word,
      value,
    }
  }

  fn op(kind: TokenKind) -> Self {
    Self {
      kind,
      value: String::new(),
    }
  }
}

/// Tokenize a raw command line into an ordered sequence of tokens.
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
  let bytes = input.as_bytes();
  let mut pos = 0;
  let mut tokens = Vec::new();
  let mut word = Vec::new();
  let mut in_word = false;

  macro_rules! flush_word {
    () => {
      if in_word {
        tokens.push(Token::word(String::from_utf8_lossy(&word).into_owned()));
        word.clear();
        in_word = false;
      }
    };
  }

  while pos < bytes.len() {
    let b = bytes[pos];

    match b {
      b' ' | b'\t' => {
        flush_word!();
        pos += 1;
      }
      b'|' => {
        flush_word!();
        tokens.push(Token::op(TokenKind::Pipe));
        pos += 1;
      }
      b'>' => {
        flush_word!();
        pos += 1;
        if pos < bytes.len() && bytes[pos] == b'>' {
          tokens.push(Token::op(TokenKind::RedirectAppend));
          pos += 1;
        } else {
          tokens.push(Token::op(TokenKind::RedirectOut));
        }
      }
      b'1' if !in_word && bytes.get(pos + 1) == Some(&b'>') => {
        flush_word!();
        pos += 2;
        if pos < bytes.len() && bytes[pos] == b'>' {
          tokens.push(Token::op(TokenKind::RedirectAppend));
          pos += 1;
        } else {
          tokens.push(Token::op(TokenKind::RedirectOut));
        }
      }
      b'2' if !in_word && bytes.get(pos + 1) == Some(&b'>') => {
        flush_word!();
        pos += 2;
        if pos < bytes.len() && bytes[pos] == b'>' {
          tokens.push(Token::op(TokenKind::RedirectErrAppend));
          pos += 1;
        } else {
          tokens.push(Token::op(TokenKind::RedirectErr));
        }
      }
      b'\'' => {
        in_word = true;
        pos += 1;
        loop {
          if pos >= bytes.len() {
            return Err(Error::UnterminatedSingleQuote);
          }
          if bytes[pos] == b'\'' {
            pos += 1;
            break;
          }
          word.push(bytes[pos]);
          pos += 1;
        }
      }
      b'"' => {
        in_word = true;
        pos += 1;
        loop {
          if pos >= bytes.len() {
            return Err(Error::UnterminatedDoubleQuote);
          }
          match bytes[pos] {
            b'"' => {
              pos += 1;
              break;
            }
            b'\\' if matches!(bytes.get(pos + 1), Some(b'$' | b'`' | b'"' | b'\\' | b'\n')) => {
              let escaped = bytes[pos + 1];
              if escaped != b'\n' {
                word.push(escaped);
              }
              pos += 2;
            }
            other => {
              word.push(other);
              pos += 1;
            }
          }
        }
      }
      b'\\' => {
        in_word = true;
        pos += 1;
        if pos < bytes.len() {
          if bytes[pos] == b'\n' {
            pos += 1;
          } else {
            word.push(bytes[pos]);
            pos += 1;
          }
        }
      }
      other => {
        in_word = true;
        word.push(other);
        pos += 1;
      }
    }
  }

  flush_word!();

  Ok(tokens)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn words(tokens: &[Token]) -> Vec<&str> {
    tokens
      .iter()
      .filter(|t| t.kind == TokenKind::Word)
      .map(|t| t.value.as_str())
      .collect()
  }

  #[test]
  fn single_quoted_span_is_literal() {
    let tokens = tokenize("echo 'hello world'").unwrap();
    assert_eq!(words(&tokens), vec!["echo", "hello world"]);
  }

  #[test]
  fn double_quote_escape_set() {
    let tokens = tokenize(r#"echo "a\"b\\c""#).unwrap();
    assert_eq!(words(&tokens), vec!["echo", "a\"b\\c"]);
  }

  #[test]
  fn double_quote_other_escapes_survive() {
    let tokens = tokenize(r#"echo "a\nb""#).unwrap();
    assert_eq!(words(&tokens), vec!["echo", "a\\nb"]);
  }

  #[test]
  fn double_quote_newline_continuation_vanishes() {
    let tokens = tokenize("echo \"a\\\nb\"").unwrap();
    assert_eq!(words(&tokens), vec!["echo", "ab"]);
  }

  #[test]
  fn unquoted_backslash_escapes_next_byte() {
    let tokens = tokenize(r"echo a\ b").unwrap();
    assert_eq!(words(&tokens), vec!["echo", "a b"]);
  }

  #[test]
  fn unquoted_backslash_newline_is_continuation() {
    let tokens = tokenize("echo a\\\nb").unwrap();
    assert_eq!(words(&tokens), vec!["echo", "ab"]);
  }

  #[test]
  fn pipe_adjacency_needs_no_whitespace() {
    let tokens = tokenize("pwd|grep x").unwrap();
    assert_eq!(tokens[0], Token::word("pwd".into()));
    assert_eq!(tokens[1].kind, TokenKind::Pipe);
    assert_eq!(tokens[2], Token::word("grep".into()));
    assert_eq!(tokens[3], Token::word("x".into()));
  }

  #[test]
  fn redirect_adjacency_needs_no_whitespace() {
    let tokens = tokenize("echo test>out").unwrap();
    assert_eq!(tokens[2].kind, TokenKind::RedirectOut);
    assert_eq!(tokens[3], Token::word("out".into()));
  }

  #[test]
  fn redirect_append_and_synonyms() {
    let t1 = tokenize("echo a>>out").unwrap();
    assert_eq!(t1[2].kind, TokenKind::RedirectAppend);

    let t2 = tokenize("echo a 1> out").unwrap();
    assert_eq!(t2[2].kind, TokenKind::RedirectOut);

    let t3 = tokenize("echo a 1>> out").unwrap();
    assert_eq!(t3[2].kind, TokenKind::RedirectAppend);

    let t4 = tokenize("cmd 2> err").unwrap();
    assert_eq!(t4[1].kind, TokenKind::RedirectErr);

    let t5 = tokenize("cmd 2>> err").unwrap();
    assert_eq!(t5[1].kind, TokenKind::RedirectErrAppend);
  }

  #[test]
  fn digit_prefix_without_angle_bracket_is_a_word() {
    let tokens = tokenize("echo 1 2").unwrap();
    assert_eq!(words(&tokens), vec!["echo", "1", "2"]);
  }

  #[test]
  fn unterminated_single_quote_errors() {
    assert!(matches!(
      tokenize("echo 'oops"),
      Err(Error::UnterminatedSingleQuote)
    ));
  }

  #[test]
  fn unterminated_double_quote_errors() {
    assert!(matches!(
      tokenize("echo \"oops"),
      Err(Error::UnterminatedDoubleQuote)
    ));
  }

  #[test]
  fn trailing_unpaired_backslash_is_noop() {
    let tokens = tokenize("echo a\\").unwrap();
    assert_eq!(words(&tokens), vec!["echo", "a"]);
  }

  #[test]
  fn concatenation_round_trip_for_words_and_operators() {
    let rebuilt = "ls -la | grep foo > out.txt";
    let tokens = tokenize(rebuilt).unwrap();
    let kinds: Vec<&TokenKind> = tokens.iter().map(|t| &t.kind).collect();
    assert_eq!(
      kinds,
      vec![
        &TokenKind::Word,
        &TokenKind::Word,
        &TokenKind::Pipe,
        &TokenKind::Word,
        &TokenKind::Word,
        &TokenKind::RedirectOut,
        &TokenKind::Word,
      ]
    );
  }
}
