//! CLI error type separating bad input from operational failures.

use std::fmt::{self, Display, Formatter};

#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn exit_codes_and_messages() {
        let validation = CliError::validation("bad path");
        assert_eq!(validation.exit_code(), 2);
        assert_eq!(validation.display_message(), "bad path");

        let failure = CliError::failure(anyhow!("inner").context("outer"));
        assert_eq!(failure.exit_code(), 3);
        assert_eq!(failure.display_message(), "outer: inner");
        assert_eq!(failure.to_string(), "cli error");
    }
}
