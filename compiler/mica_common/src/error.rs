//! Error handling utilities for the mica compiler

use thiserror::Error;

/// The main error type for the mica compiler
#[derive(Error, Debug, Clone)]
pub enum MicaError {
    #[error("Lexical error: {message}")]
    LexError { message: String },

    #[error("Preprocessor error: {message}")]
    PreprocessError { message: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Semantic error: {message}")]
    SemaError { message: String },

    #[error("IR error: {message}")]
    IrError { message: String },

    #[error("I/O error: {message}")]
    IoError { message: String },
}

/// Result type alias for mica compiler operations
pub type MicaResult<T> = Result<T, MicaError>;

impl MicaError {
    pub fn lex_error(message: impl Into<String>) -> Self {
        Self::LexError { message: message.into() }
    }

    pub fn preprocess_error(message: impl Into<String>) -> Self {
        Self::PreprocessError { message: message.into() }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::ParseError { message: message.into() }
    }

    pub fn sema_error(message: impl Into<String>) -> Self {
        Self::SemaError { message: message.into() }
    }

    pub fn ir_error(message: impl Into<String>) -> Self {
        Self::IrError { message: message.into() }
    }

    pub fn io_error(message: impl Into<String>) -> Self {
        Self::IoError { message: message.into() }
    }
}

impl From<std::io::Error> for MicaError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError { message: err.to_string() }
    }
}
