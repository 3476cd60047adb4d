use std::fmt;

use thiserror::Error;

/// Errors produced while preparing, submitting or recording fiscal documents.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FelError {
    /// Remote service answered with a non-success HTTP status.
    #[error("HTTP {status}: {body}")]
    Transport { status: u16, body: String },

    /// Request could not be sent or the response could not be read.
    #[error("request failed: {0}")]
    Request(String),

    /// Document refused locally before submission.
    #[error("{0}")]
    Policy(String),

    /// Certification authority rejected the document.
    #[error("rejected by the authority: {description}")]
    Rejected {
        description: String,
        diagnostics: Vec<Diagnostic>,
    },

    /// Response payload did not have the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// XML generation error.
    #[error("XML error: {0}")]
    Xml(String),
}

/// One authority diagnostic, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub category: String,
    pub message: String,
}

impl Diagnostic {
    pub fn new(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.category.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "[{}] {}", self.category, self.message)
        }
    }
}

impl From<serde_json::Error> for FelError {
    fn from(error: serde_json::Error) -> Self {
        Self::Parse(error.to_string())
    }
}
