//! Request middleware.
//!
//! Purpose: request lifecycle concerns such as trace identifiers.

pub mod trace;

pub use trace::Trace;
