//! Shared foundation types for the Tarn compiler.
//!
//! Everything here is consumed by both the front-end crates and (eventually)
//! the back-end: source locations and ranges, interned-by-name identifiers,
//! and the append-only diagnostic engine with its renderers.

pub mod diag;
pub mod ident;
pub mod render;
pub mod span;

pub use diag::{Diagnostic, DiagnosticEngine, Severity};
pub use ident::Identifier;
pub use span::{SourceLocation, SourceRange};
