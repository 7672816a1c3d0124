//! Unified error interface for DECK.
//!
//! Every error enum in the workspace implements [`ErrorCode`] so that
//! embedders can branch on a stable machine-readable code instead of
//! matching display strings, and so retry logic can consult
//! [`is_recoverable`](ErrorCode::is_recoverable) uniformly.
//!
//! # Code Convention
//!
//! - UPPER_SNAKE_CASE, prefixed per layer: `INSTANCE_`, `EVENT_`,
//!   `CHANNEL_`, `CONVERT_`, `ENGINE_`
//! - Stable once published; renaming a code is a breaking change
//!
//! # Example
//!
//! ```
//! use deck_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum ExportError {
//!     NotInitialized,
//!     Timeout,
//! }
//!
//! impl ErrorCode for ExportError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::NotInitialized => "EXPORT_NOT_INITIALIZED",
//!             Self::Timeout => "EXPORT_TIMEOUT",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Timeout)
//!     }
//! }
//!
//! assert!(ExportError::Timeout.is_recoverable());
//! ```

/// Machine-readable error code with recoverability classification.
///
/// # Recoverability
///
/// An error is recoverable when retrying the same operation may succeed:
/// a timed-out export may complete on the next attempt, a full transport
/// buffer may drain. Non-recoverable errors (unbound instance, unknown
/// format, closed channel) require the caller to change something first.
pub trait ErrorCode {
    /// Returns the stable UPPER_SNAKE_CASE code for this error.
    fn code(&self) -> &'static str;

    /// Returns whether retrying the operation may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that an error's code follows the workspace conventions.
///
/// # Panics
///
/// Panics if the code is empty, misses the expected prefix, or is not
/// UPPER_SNAKE_CASE.
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "error code '{code}' must start with prefix '{expected_prefix}'"
    );
    assert!(
        is_upper_snake_case(code),
        "error code '{code}' must be UPPER_SNAKE_CASE"
    );
}

/// Asserts every variant of an error enum at once.
///
/// # Example
///
/// ```
/// use deck_types::{assert_error_codes, ErrorCode};
///
/// #[derive(Debug)]
/// enum E { A, B }
///
/// impl ErrorCode for E {
///     fn code(&self) -> &'static str {
///         match self {
///             Self::A => "CACHE_A",
///             Self::B => "CACHE_B",
///         }
///     }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_codes(&[E::A, E::B], "CACHE_");
/// ```
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum SampleError {
        Busy,
        Gone,
    }

    impl ErrorCode for SampleError {
        fn code(&self) -> &'static str {
            match self {
                Self::Busy => "SAMPLE_BUSY",
                Self::Gone => "SAMPLE_GONE",
            }
        }

        fn is_recoverable(&self) -> bool {
            matches!(self, Self::Busy)
        }
    }

    #[test]
    fn code_and_recoverability() {
        assert_eq!(SampleError::Busy.code(), "SAMPLE_BUSY");
        assert!(SampleError::Busy.is_recoverable());
        assert!(!SampleError::Gone.is_recoverable());
    }

    #[test]
    fn all_variants_validate() {
        assert_error_codes(&[SampleError::Busy, SampleError::Gone], "SAMPLE_");
    }

    #[test]
    #[should_panic(expected = "must start with prefix")]
    fn wrong_prefix_panics() {
        assert_error_code(&SampleError::Busy, "OTHER_");
    }

    #[test]
    fn snake_case_rules() {
        assert!(is_upper_snake_case("A_B_1"));
        assert!(!is_upper_snake_case(""));
        assert!(!is_upper_snake_case("lower_case"));
        assert!(!is_upper_snake_case("_LEADING"));
        assert!(!is_upper_snake_case("TRAILING_"));
        assert!(!is_upper_snake_case("DOUBLE__UNDER"));
    }
}
