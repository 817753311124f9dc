//! Small shared utilities used across modules.

pub mod interner;

pub use interner::{display, get, intern, Identifier, InternError, MAX_IDENTIFIER_BYTES};
