//! Inline style handling for mirror elements
//!
//! A parsed document has no layout engine behind it, so the "computed" style
//! of an element is resolved from inline `style` attributes only: inherited
//! properties cascade down from ancestors, while box properties come from the
//! element itself. Only a curated set of visually relevant properties is
//! considered.

use std::collections::HashMap;

use cssparser::{Delimiter, ParseError, Parser, ParserInput};
use markup5ever_rcdom::Handle;

use super::dom::{get_node_attr, get_parent_node};

/// Properties that inherit from ancestors in CSS
pub const INHERITED_PROPERTIES: &[&str] = &[
    "color",
    "font-family",
    "font-size",
    "font-style",
    "font-weight",
    "letter-spacing",
    "line-height",
    "text-align",
    "text-transform",
    "white-space",
    "word-spacing",
];

/// Properties only taken from the element itself
pub const BOX_PROPERTIES: &[&str] = &[
    "display",
    "margin",
    "margin-top",
    "margin-right",
    "margin-bottom",
    "margin-left",
    "padding",
    "padding-top",
    "padding-right",
    "padding-bottom",
    "padding-left",
];

/// Splits a `style` attribute value into lowercase-name/value declarations
///
/// Malformed declarations are skipped; a later duplicate wins, as in CSS.
pub fn parse_inline_style(style: &str) -> Vec<(String, String)> {
    let mut input = ParserInput::new(style);
    let mut parser = Parser::new(&mut input);
    let mut declarations: Vec<(String, String)> = Vec::new();

    while !parser.is_exhausted() {
        let declaration: Result<(String, String), ParseError<'_, ()>> = parser
            .parse_until_after(Delimiter::Semicolon, |p| {
                let name = p.expect_ident()?.to_ascii_lowercase();
                p.expect_colon()?;
                let start = p.position();
                while p.next().is_ok() {}
                Ok((name, p.slice_from(start).trim().to_string()))
            });

        if let Ok((name, value)) = declaration {
            if value.is_empty() {
                continue;
            }
            declarations.retain(|(existing, _)| existing != &name);
            declarations.push((name, value));
        }
    }

    declarations
}

pub fn compose_inline_style(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(name, value)| format!("{name}: {value};"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Curated resolved style of `element`, in a stable property order
pub fn computed_style(element: &Handle) -> Vec<(String, String)> {
    let mut resolved: HashMap<String, String> = HashMap::new();

    let mut ancestors = Vec::new();
    let mut current = get_parent_node(element);
    while let Some(node) = current {
        current = get_parent_node(&node);
        ancestors.push(node);
    }

    // Outermost first, so nearer ancestors override
    for ancestor in ancestors.iter().rev() {
        for (name, value) in inline_declarations(ancestor) {
            if INHERITED_PROPERTIES.contains(&name.as_str()) {
                resolved.insert(name, value);
            }
        }
    }

    for (name, value) in inline_declarations(element) {
        if INHERITED_PROPERTIES.contains(&name.as_str()) || BOX_PROPERTIES.contains(&name.as_str())
        {
            resolved.insert(name, value);
        }
    }

    INHERITED_PROPERTIES
        .iter()
        .chain(BOX_PROPERTIES.iter())
        .filter_map(|name| {
            resolved
                .remove(*name)
                .map(|value| (name.to_string(), value))
        })
        .collect()
}

/// Overlays `overrides` on `base`, keeping base order for shared names
pub fn merge_declarations(
    base: Vec<(String, String)>,
    overrides: Vec<(String, String)>,
) -> Vec<(String, String)> {
    let mut merged = base;
    for (name, value) in overrides {
        match merged.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => merged.push((name, value)),
        }
    }
    merged
}

fn inline_declarations(node: &Handle) -> Vec<(String, String)> {
    get_node_attr(node, "style")
        .map(|style| parse_inline_style(&style))
        .unwrap_or_default()
}
