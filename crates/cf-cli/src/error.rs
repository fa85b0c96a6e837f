// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use cf_core::CfError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Cf(#[from] CfError),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    InvalidInput(String),
}

impl CliError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    /// Stable machine-readable code for the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Cf(err) => err.code(),
            Self::InvalidInput(_) => "invalid_input",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CliError;
    use cf_core::CfError;
    use std::error::Error;

    #[test]
    fn codes_follow_the_wrapped_error() {
        let cases = [
            (
                CliError::from(CfError::invalid_parameter("order")),
                "invalid_parameter",
            ),
            (CliError::from(CfError::invalid_input("nan")), "invalid_input"),
            (
                CliError::from(CfError::numerical_issue("overflow")),
                "numerical_issue",
            ),
            (CliError::invalid_input("bad flag"), "invalid_input"),
            (
                CliError::io(
                    "failed to read 'x.csv'",
                    std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
                ),
                "io_error",
            ),
        ];
        for (err, code) in cases {
            assert_eq!(err.code(), code, "{err}");
        }
    }

    #[test]
    fn wrapped_core_errors_display_transparently() {
        let err = CliError::from(CfError::invalid_input("observation must be finite; got NaN"));
        assert_eq!(
            err.to_string(),
            "invalid input: observation must be finite; got NaN"
        );
    }

    #[test]
    fn io_errors_keep_context_and_source() {
        let err = CliError::io(
            "failed to read 'series.csv'",
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        );
        assert_eq!(err.to_string(), "failed to read 'series.csv': no such file");
        assert!(err.source().is_some());
    }

    #[test]
    fn json_errors_keep_context() {
        let source = serde_json::from_str::<serde_json::Value>("{").expect_err("truncated JSON");
        let err = CliError::json("failed to serialize JSON output", source);
        assert_eq!(err.code(), "json_error");
        assert!(err.to_string().starts_with("failed to serialize JSON output: "));
    }
}
