//! Mirror element injection
//!
//! A translation is shown by inserting, right after the text node's
//! container, a shallow copy of that container holding only the translated
//! text. The original node is never touched.

use markup5ever_rcdom::{Handle, NodeData};
use url::Url;

use crate::parsers::html::dom::{
    create_element, detach, get_node_attr, get_node_name, get_parent_element, get_parent_node,
    insert_after, set_node_attr, set_text_content,
};
use crate::parsers::html::style::{
    compose_inline_style, computed_style, merge_declarations, parse_inline_style,
};
use crate::translation::config::constants::MARKER_CLASS;
use crate::translation::registry::TranslatedRegistry;

/// Link attributes re-set explicitly on mirrored hyperlinks
const LINK_ATTRIBUTES: &[&str] = &["target", "rel"];

#[derive(Debug, Clone, Default)]
pub struct InjectOptions {
    /// Relative `href`s on mirrored links are resolved against this
    pub base_url: Option<Url>,
}

/// Inserts a mirror of `text_node`'s container showing `translated`
///
/// Returns `None`, leaving the tree untouched, when the node already has a
/// mirror, has no containing element, the mirror text cannot be set, or the
/// container cannot take a sibling.
pub fn inject_translation(
    registry: &mut TranslatedRegistry,
    text_node: &Handle,
    translated: &str,
    options: &InjectOptions,
) -> Option<Handle> {
    if registry.has(text_node) {
        tracing::debug!("node already has a mirror, skipping");
        return None;
    }

    let container = get_parent_element(text_node)?;
    if get_parent_node(&container).is_none() {
        tracing::debug!("container is detached, skipping");
        return None;
    }

    let mirror = build_mirror(&container, options)?;
    if !set_text_content(&mirror, translated) {
        tracing::warn!("could not set mirror text, skipping");
        return None;
    }

    if !insert_after(&container, &mirror) {
        tracing::warn!(
            "could not insert mirror after <{}>",
            get_node_name(&container).unwrap_or_default()
        );
        return None;
    }

    registry.add(text_node, &mirror);
    Some(mirror)
}

/// Removes the mirror injected for `text_node` and forgets it
pub fn revert_translation(registry: &mut TranslatedRegistry, text_node: &Handle) -> bool {
    let Some(mirror) = registry.mirror_of(text_node) else {
        return false;
    };

    let removed = detach(&mirror);
    registry.remove(text_node);
    removed
}

fn build_mirror(container: &Handle, options: &InjectOptions) -> Option<Handle> {
    let NodeData::Element { name, attrs, .. } = &container.data else {
        return None;
    };

    let copied = match attrs.try_borrow() {
        Ok(attrs) => attrs.clone(),
        Err(_) => {
            tracing::warn!("container attributes are borrowed, mirroring without them");
            Vec::new()
        }
    };
    let mirror = create_element(name.clone(), copied);

    let mut classes = get_node_attr(container, "class").unwrap_or_default();
    if !classes.split_whitespace().any(|class| class == MARKER_CLASS) {
        if !classes.trim().is_empty() {
            classes.push(' ');
        }
        classes.push_str(MARKER_CLASS);
    }
    set_node_attr(&mirror, "class", Some(classes.trim().to_string()));

    let own_style = get_node_attr(container, "style")
        .map(|style| parse_inline_style(&style))
        .unwrap_or_default();
    let style = merge_declarations(own_style, computed_style(container));
    if !style.is_empty() {
        set_node_attr(&mirror, "style", Some(compose_inline_style(&style)));
    }

    if get_node_name(container) == Some("a") {
        mirror_link(container, &mirror, options);
    }

    Some(mirror)
}

fn mirror_link(container: &Handle, mirror: &Handle, options: &InjectOptions) {
    if let Some(href) = get_node_attr(container, "href") {
        let resolved = options
            .base_url
            .as_ref()
            .and_then(|base| base.join(href.trim()).ok())
            .map(|url| url.to_string())
            .unwrap_or(href);
        set_node_attr(mirror, "href", Some(resolved));
    }

    for attribute in LINK_ATTRIBUTES {
        if let Some(value) = get_node_attr(container, attribute) {
            set_node_attr(mirror, attribute, Some(value));
        }
    }
}
