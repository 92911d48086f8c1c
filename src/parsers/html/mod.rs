//! HTML parsing and DOM manipulation
//!
//! - `dom`: parsing, tree queries and the node mutations used by injection
//! - `metadata`: document charset and base URL
//! - `serializer`: DOM back to bytes
//! - `style`: inline style parsing and the curated resolved style

pub mod dom;
pub mod metadata;
pub mod serializer;
pub mod style;

pub use dom::{
    document_body, find_element_by_id, find_nodes, first_text_descendant, get_node_attr,
    get_node_name, get_parent_element, get_parent_node, html_to_dom, set_node_attr, text_content,
};
pub use metadata::{get_base_url, get_charset};
pub use serializer::serialize_document;
