use thiserror::Error;

use super::token::TextRange;

#[derive(Error, Debug, PartialEq)]
pub enum LexerError {
    #[error("Unexpected character `{1}`")]
    UnexpectedCharacter(TextRange, char),
    #[error("Integer literal `{1}` is out of range")]
    IntegerOutOfRange(TextRange, String),
}

impl LexerError {
    pub fn range(&self) -> TextRange {
        match self {
            LexerError::UnexpectedCharacter(range, _) | LexerError::IntegerOutOfRange(range, _) => *range,
        }
    }
}
