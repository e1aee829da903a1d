//! Stable error codes shared by every error enum in the crate.

/// Maps an error to a stable `E_*` code for UI display and log filtering.
pub trait ErrorCode {
    fn error_code(&self) -> &'static str;
}
