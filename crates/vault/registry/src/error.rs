//! Registry error types

use crate::journal::JournalError;
use std::fmt;
use thiserror::Error;
use vault_types::{Identity, ScriptId};

/// Caller-supplied text field checked by the input policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputField {
    Title,
    Description,
    Changelog,
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputField::Title => "title",
            InputField::Description => "description",
            InputField::Changelog => "changelog",
        };
        f.write_str(name)
    }
}

/// Registry errors
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Script not found: {0}")]
    NotFound(ScriptId),

    #[error("Unauthorized: {caller} does not own {script_id}")]
    Unauthorized { script_id: ScriptId, caller: Identity },

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: InputField, reason: String },

    #[error("Counter exhausted: {0}")]
    CounterOverflow(&'static str),

    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("Registry lock poisoned")]
    Poisoned,
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;
