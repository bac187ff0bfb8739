//! Messages exchanged between the overlay controller and the service worker.

use serde::{Deserialize, Serialize};

use crate::error::RefineError;
use crate::model::{OptionsResult, RefinementResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceRequest {
    RefinePrompt { prompt: String },
    RefineOptions { prompt: String },
}

impl ServiceRequest {
    pub fn prompt(&self) -> &str {
        match self {
            Self::RefinePrompt { prompt } | Self::RefineOptions { prompt } => prompt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    EmptyPrompt,
    Configuration,
    Transport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyError {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&RefineError> for ReplyError {
    fn from(err: &RefineError) -> Self {
        let kind = match err {
            RefineError::EmptyPrompt => ErrorKind::EmptyPrompt,
            RefineError::Configuration(_) => ErrorKind::Configuration,
            // The service absorbs malformed replies; anything left is a transport problem
            RefineError::Transport { .. } | RefineError::MalformedResponse(_) => {
                ErrorKind::Transport
            }
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

/// `{"suggestions": {...}}`, `{"options": {"options": [...]}}` or `{"error": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceReply {
    Suggestions(RefinementResult),
    Options(OptionsResult),
    Error(ReplyError),
}
