//! Log-and-continue handling for operations that are allowed to fail.

use std::fmt::Display;

use tracing::debug;

/// Turns a failure into a debug log line and `None`.
///
/// Use it where a failure is expected on some devices or firmwares and must
/// not reach the caller, e.g. enabling push updates or polling state.
pub trait BestEffort<T> {
    fn best_effort(self, what: &str) -> Option<T>;
}

impl<T, E: Display> BestEffort<T> for Result<T, E> {
    fn best_effort(self, what: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("{} failed (ignored): {}", what, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    #[test]
    fn test_best_effort_swallows_errors() {
        let failed: Result<(), ClientError> = Err(ClientError::NotConnected);
        assert_eq!(failed.best_effort("enable push updates"), None);

        let ok: Result<u8, ClientError> = Ok(3);
        assert_eq!(ok.best_effort("poll volume"), Some(3));
    }
}
