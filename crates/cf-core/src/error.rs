// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

/// Errors surfaced by changefinder scorers.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CfError {
    /// Construction-time parameter outside its valid domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// Observation or sample sequence rejected by an update.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Arithmetic left the representable range; the scorer state was not changed.
    #[error("numerical issue: {0}")]
    NumericalIssue(String),
}

impl CfError {
    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        Self::InvalidParameter(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn numerical_issue(msg: impl Into<String>) -> Self {
        Self::NumericalIssue(msg.into())
    }

    /// Stable machine-readable error code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidParameter(_) => "invalid_parameter",
            Self::InvalidInput(_) => "invalid_input",
            Self::NumericalIssue(_) => "numerical_issue",
        }
    }
}
