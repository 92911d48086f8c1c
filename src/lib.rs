//! # Interlinear
//!
//! Translates HTML documents in place by inserting a translated mirror right
//! after each eligible piece of text, leaving the original text untouched.
//! Translating a page twice never duplicates a mirror, and single elements
//! can be toggled on and off through the hover controller.
//!
//! ## Module organization
//!
//! - `core` - top-level error type and the read/translate/write pipeline
//! - `env` - environment variables read before configuration is loaded
//! - `parsers` - HTML parsing, DOM helpers, serialization, inline styles
//! - `translation` - collection, batching, injection, sessions and quota

pub mod core;
pub mod env;
pub mod parsers;
pub mod translation;

pub use crate::core::*;
pub use crate::parsers::*;
