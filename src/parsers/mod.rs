//! # Parsers
//!
//! Everything that reads or writes document markup lives under `html`.

pub mod html;

pub use html::{html_to_dom, serialize_document};
