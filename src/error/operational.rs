//! Operational error context propagation with `anyhow`.
//!
//! This module provides extension traits and utilities for enhancing
//! error context and centralized error reporting.

use std::{error::Error as StdError, fmt::Display};

use {
    anyhow::{Context, Result as AnyhowResult},
    tracing::{error, warn},
};

/// Extension trait for enhanced error context.
pub trait ResultExt<T, E> {
    /// Adds context to an error with a static string.
    fn add_context(self, context: &'static str) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static;

    /// Adds context to an error with a formatted string.
    fn add_contextf(self, format: impl Display) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for Result<T, E> {
    fn add_context(self, context: &'static str) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static,
    {
        self.context(context)
    }

    fn add_contextf(self, format: impl Display) -> AnyhowResult<T>
    where
        E: StdError + Send + Sync + 'static,
    {
        self.context(format.to_string())
    }
}

/// Centralized error reporting and logging.
///
/// Accepts any error type so that module errors can be reported without
/// first being converted into `anyhow::Error`.
pub struct ErrorReporter;

impl ErrorReporter {
    /// Reports a recoverable failure.
    pub fn warn(error: &(dyn StdError + 'static), context: &str) {
        let message = Self::to_user_message(error);
        warn!(context = context, error = %message, "Recoverable failure");
    }

    /// Reports a failure the user has to act on.
    pub fn error(error: &(dyn StdError + 'static), context: &str) {
        let message = Self::to_user_message(error);
        error!(context = context, error = %message, "Operation failed");
    }

    /// Formats an error and its sources as one line, outermost first.
    ///
    /// Sources whose text is already part of their parent's message are
    /// skipped, since `thiserror` wrappers usually embed them.
    pub fn to_user_message(error: &(dyn StdError + 'static)) -> String {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            let text = cause.to_string();
            if !message.contains(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            source = cause.source();
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use std::{
        error::Error,
        fmt::{Display, Formatter, Result as FmtResult},
        io::{Error as IoError, ErrorKind::PermissionDenied},
    };

    use crate::{
        config::SettingsError,
        error::operational::{ErrorReporter, ResultExt},
    };

    #[derive(Debug)]
    struct TestError;

    impl Display for TestError {
        fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
            write!(f, "Test error")
        }
    }

    impl Error for TestError {}

    #[derive(Debug)]
    struct Wrapper(TestError);

    impl Display for Wrapper {
        fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
            write!(f, "Could not open device")
        }
    }

    impl Error for Wrapper {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn test_result_ext_with_context() {
        let result: Result<i32, TestError> = Err(TestError);
        let error = result.add_context("Additional context").unwrap_err();
        assert!(error.to_string().contains("Additional context"));
    }

    #[test]
    fn test_result_ext_with_contextf() {
        let result: Result<i32, TestError> = Err(TestError);
        let error = result.add_contextf("Formatted context: test").unwrap_err();
        assert!(error.to_string().contains("Formatted context: test"));
    }

    #[test]
    fn test_user_message_walks_sources() {
        let message = ErrorReporter::to_user_message(&Wrapper(TestError));
        assert_eq!(message, "Could not open device: Test error");
    }

    #[test]
    fn test_user_message_skips_embedded_source() {
        let error = SettingsError::from(IoError::new(PermissionDenied, "read-only"));
        assert_eq!(ErrorReporter::to_user_message(&error), "IO error: read-only");
    }
}
