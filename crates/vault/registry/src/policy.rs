//! Length bounds for caller-supplied text.
//!
//! The state machine itself accepts any text; these limits belong to the
//! surrounding deployment and are loaded with the rest of [`VaultConfig`].
//!
//! [`VaultConfig`]: crate::config::VaultConfig

use crate::error::{InputField, RegistryError, Result};
use serde::{Deserialize, Serialize};

/// Input policy applied before any state is touched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputPolicy {
    /// Maximum title length in characters
    #[serde(default = "default_max_title_len")]
    pub max_title_len: usize,

    /// Maximum description length in characters
    #[serde(default = "default_max_description_len")]
    pub max_description_len: usize,

    /// Maximum changelog length in characters
    #[serde(default = "default_max_changelog_len")]
    pub max_changelog_len: usize,
}

impl Default for InputPolicy {
    fn default() -> Self {
        Self {
            max_title_len: default_max_title_len(),
            max_description_len: default_max_description_len(),
            max_changelog_len: default_max_changelog_len(),
        }
    }
}

impl InputPolicy {
    /// No length limits; title and description must still be non-empty.
    ///
    /// Journal replay runs under this policy.
    pub fn unbounded() -> Self {
        Self {
            max_title_len: usize::MAX,
            max_description_len: usize::MAX,
            max_changelog_len: usize::MAX,
        }
    }

    pub fn check_title(&self, title: &str) -> Result<()> {
        check_text(InputField::Title, title, self.max_title_len, false)
    }

    pub fn check_description(&self, description: &str) -> Result<()> {
        check_text(
            InputField::Description,
            description,
            self.max_description_len,
            false,
        )
    }

    pub fn check_changelog(&self, changelog: &str) -> Result<()> {
        check_text(InputField::Changelog, changelog, self.max_changelog_len, true)
    }
}

fn check_text(field: InputField, text: &str, max_len: usize, allow_empty: bool) -> Result<()> {
    if !allow_empty && text.is_empty() {
        return Err(RegistryError::InvalidInput {
            field,
            reason: "must not be empty".to_string(),
        });
    }

    let len = text.chars().count();
    if len > max_len {
        return Err(RegistryError::InvalidInput {
            field,
            reason: format!("{} characters exceeds limit of {}", len, max_len),
        });
    }

    Ok(())
}

// Default value helpers
fn default_max_title_len() -> usize {
    100
}

fn default_max_description_len() -> usize {
    500
}

fn default_max_changelog_len() -> usize {
    500
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounds() {
        let policy = InputPolicy::default();
        assert_eq!(policy.max_title_len, 100);
        assert_eq!(policy.max_description_len, 500);
        assert_eq!(policy.max_changelog_len, 500);
    }

    #[test]
    fn test_empty_title_rejected_but_empty_changelog_allowed() {
        let policy = InputPolicy::default();
        assert!(matches!(
            policy.check_title(""),
            Err(RegistryError::InvalidInput {
                field: InputField::Title,
                ..
            })
        ));
        assert!(policy.check_changelog("").is_ok());
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let policy = InputPolicy {
            max_title_len: 3,
            ..Default::default()
        };
        assert!(policy.check_title("äöü").is_ok());
        assert!(policy.check_title("äöüß").is_err());
    }

    #[test]
    fn test_oversized_description_reports_lengths() {
        let policy = InputPolicy {
            max_description_len: 4,
            ..Default::default()
        };
        let error = policy.check_description("hello").unwrap_err();
        assert_eq!(
            error.to_string(),
            "Invalid description: 5 characters exceeds limit of 4"
        );
    }

    #[test]
    fn test_unbounded_keeps_non_empty_rule() {
        let policy = InputPolicy::unbounded();
        assert!(policy.check_title(&"t".repeat(10_000)).is_ok());
        assert!(policy.check_changelog(&"c".repeat(10_000)).is_ok());
        assert!(policy.check_description("").is_err());
    }
}
