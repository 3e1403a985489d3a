//! Handler outcome.

use std::fmt;

/// Outcome of a single handler invocation.
///
/// Transient: it decides whether the worker retries, and is never persisted.
pub enum HandlerResult {
    Success,
    Failure(anyhow::Error),
}

impl HandlerResult {
    /// Shorthand for a failure carrying only a message.
    pub fn failure(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        HandlerResult::Failure(anyhow::Error::msg(message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, HandlerResult::Success)
    }
}

impl From<anyhow::Result<()>> for HandlerResult {
    fn from(result: anyhow::Result<()>) -> Self {
        match result {
            Ok(()) => HandlerResult::Success,
            Err(e) => HandlerResult::Failure(e),
        }
    }
}

impl fmt::Debug for HandlerResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerResult::Success => f.write_str("Success"),
            HandlerResult::Failure(cause) => write!(f, "Failure({cause:#})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_anyhow_result() {
        assert!(HandlerResult::from(Ok(())).is_success());

        let failed = HandlerResult::from(Err(anyhow::anyhow!("boom")));
        assert!(!failed.is_success());
        match failed {
            HandlerResult::Failure(cause) => assert_eq!(cause.to_string(), "boom"),
            HandlerResult::Success => panic!("expected failure"),
        }
    }

    #[test]
    fn test_debug_includes_cause_chain() {
        let err = anyhow::anyhow!("connection refused").context("write to store");
        let rendered = format!("{:?}", HandlerResult::Failure(err));
        assert_eq!(rendered, "Failure(write to store: connection refused)");
        assert_eq!(format!("{:?}", HandlerResult::Success), "Success");
    }
}
