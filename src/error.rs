//! Shared error plumbing.
//!
//! Every domain error enum maps to a stable, grepable code so HTTP clients
//! can branch on failures without parsing display strings.

/// Map a domain error to a stable wire code.
pub trait ErrorCode {
    /// Grepable error code, e.g. `E_RENDER_PARSE`.
    fn error_code(&self) -> &'static str;
}
