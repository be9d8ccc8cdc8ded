use serde::Serialize;
use std::fmt;

#[derive(Debug, Serialize, Clone)]
#[serde(tag = "type", content = "data")]
pub enum WerkError {
    InvalidSessionId {
        raw: String,
        message: String,
    },
    SessionNotFound {
        session_id: String,
    },
    SessionAlreadyExists {
        session_id: String,
    },
    BranchAlreadyExists {
        branch: String,
    },
    InvalidInput {
        field: String,
        message: String,
    },
    GitOperationFailed {
        operation: String,
        message: String,
    },
    LedgerOperationFailed {
        operation: String,
        message: String,
    },
    OperationCancelled {
        operation: String,
    },
}

impl WerkError {
    pub fn git(operation: &str, error: impl ToString) -> Self {
        WerkError::GitOperationFailed {
            operation: operation.to_string(),
            message: error.to_string(),
        }
    }

    pub fn ledger(operation: &str, error: impl ToString) -> Self {
        WerkError::LedgerOperationFailed {
            operation: operation.to_string(),
            message: error.to_string(),
        }
    }

    pub fn invalid_id(raw: &str, message: impl ToString) -> Self {
        WerkError::InvalidSessionId {
            raw: raw.to_string(),
            message: message.to_string(),
        }
    }

    pub fn invalid_input(field: &str, message: impl ToString) -> Self {
        WerkError::InvalidInput {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn cancelled(operation: &str) -> Self {
        WerkError::OperationCancelled {
            operation: operation.to_string(),
        }
    }
}

impl fmt::Display for WerkError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InvalidSessionId { raw, message } => {
                write!(f, "Invalid session ID '{raw}': {message}")
            }
            Self::SessionNotFound { session_id } => {
                write!(f, "Session '{session_id}' not found")
            }
            Self::SessionAlreadyExists { session_id } => {
                write!(f, "Session '{session_id}' already exists")
            }
            Self::BranchAlreadyExists { branch } => {
                write!(f, "Branch '{branch}' already exists")
            }
            Self::InvalidInput { field, message } => {
                write!(f, "Invalid input for field '{field}': {message}")
            }
            Self::GitOperationFailed { operation, message } => {
                write!(f, "Git operation '{operation}' failed: {message}")
            }
            Self::LedgerOperationFailed { operation, message } => {
                write!(f, "Ledger operation '{operation}' failed: {message}")
            }
            Self::OperationCancelled { operation } => {
                write!(f, "Operation '{operation}' was cancelled before it completed")
            }
        }
    }
}

impl std::error::Error for WerkError {}

impl From<WerkError> for String {
    fn from(error: WerkError) -> Self {
        error.to_string()
    }
}
