//! Search query normalisation.

use crate::DirectoryError;

/// A validated, lowercased search needle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    /// Lowercase `raw`, keeping surrounding whitespace as part of the
    /// needle. Input that is blank after trimming is rejected.
    pub fn parse(raw: &str) -> Result<Self, DirectoryError> {
        if raw.trim().is_empty() {
            return Err(DirectoryError::InvalidArgument(
                "Search query cannot be empty".into(),
            ));
        }
        Ok(Self(raw.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}
