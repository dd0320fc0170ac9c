//! Lingo Core Library
//!
//! Domain error taxonomy and the store traits (ports) the service layer is
//! written against.

// Re-export pure types from lingo-types
pub use lingo_types::*;

pub mod error;
pub mod ports;

pub use error::{LingoError, Result};
