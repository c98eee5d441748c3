//! Domain services used by HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the generate-and-render cycle so route handlers can
//! stay focused on request parsing and status mapping.

pub mod diagram;
pub mod prompts;
