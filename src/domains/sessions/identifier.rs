use serde::Serialize;
use std::fmt;

use crate::errors::WerkError;

const MIN_LENGTH: usize = 2;
const MAX_LENGTH: usize = 50;

/// Normalized session identifier. Raw input is trimmed and lower-cased before
/// validation, so two identifiers are equal iff their normalized forms are.
/// Branch and worktree directory names are derived deterministically from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn parse(raw: &str) -> Result<Self, WerkError> {
        let normalized = raw.trim().to_lowercase();

        if normalized.len() < MIN_LENGTH || normalized.len() > MAX_LENGTH {
            return Err(WerkError::invalid_id(
                raw,
                format!("must be {MIN_LENGTH}-{MAX_LENGTH} characters"),
            ));
        }

        let allowed = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-';
        if !normalized.chars().all(allowed) {
            return Err(WerkError::invalid_id(
                raw,
                "must contain only lowercase letters, numbers, and hyphens",
            ));
        }

        if normalized.starts_with('-') || normalized.ends_with('-') {
            return Err(WerkError::invalid_id(
                raw,
                "must not start or end with a hyphen",
            ));
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn branch_name(&self) -> String {
        format!("session-{}", self.0)
    }

    /// Directory name under the worktree root. Shares the branch derivation.
    pub fn worktree_dir_name(&self) -> String {
        format!("session-{}", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}
