use std::{io, result};

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("IO Error: {0}")]
  IoError(#[from] io::Error),

  #[error("UTF8 Error: {0}")]
  Utf8Error(#[from] std::string::FromUtf8Error),

  #[error("unterminated single quote")]
  UnterminatedSingleQuote,

  #[error("unterminated double quote")]
  UnterminatedDoubleQuote,

  #[error("missing redirect target")]
  MissingRedirectTarget,
}

pub type Result<T> = result::Result<T, Error>;
