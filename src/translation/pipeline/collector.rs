//! Text node collector
//!
//! Walks a document depth-first and yields the text nodes worth translating,
//! in document order. The acceptance checks look at the node's immediate
//! containing element only, then hand the text to [`TextFilter`].

use std::collections::HashMap;

use markup5ever_rcdom::{Handle, NodeData};

use crate::parsers::html::dom::{attribute_names, get_node_attr, get_node_name, get_parent_element};
use crate::translation::config::constants;
use crate::translation::pipeline::filters::{FilterReason, TextFilter};
use crate::translation::registry::TranslatedRegistry;

/// A collected text node with its trimmed text
#[derive(Debug, Clone)]
pub struct TextItem {
    pub node: Handle,
    pub text: String,
    pub container_tag: String,
    pub depth: usize,
}

impl TextItem {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Why a text node was passed over before the text filter ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    NoContainer,
    SkippedElement,
    TemplateContainer,
    AlreadyTranslated,
    Filtered(FilterReason),
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub skip_elements: Vec<String>,
    pub class_markers: Vec<String>,
    pub directive_prefixes: Vec<String>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();

        let mut class_markers: Vec<String> = owned(constants::TEMPLATE_CLASS_MARKERS);
        class_markers.push(constants::MARKER_CLASS.to_string());

        Self {
            skip_elements: owned(constants::SKIP_ELEMENTS),
            class_markers,
            directive_prefixes: owned(constants::DIRECTIVE_ATTR_PREFIXES),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CollectionStats {
    pub text_nodes: usize,
    pub accepted: usize,
    pub total_chars: usize,
    pub rejected: HashMap<Rejection, usize>,
}

impl CollectionStats {
    pub fn rejected_by(&self, rejection: Rejection) -> usize {
        self.rejected.get(&rejection).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TextCollector {
    config: CollectorConfig,
    filter: TextFilter,
}

impl TextCollector {
    pub fn new(config: CollectorConfig) -> Self {
        Self {
            config,
            filter: TextFilter::new(),
        }
    }

    pub fn collect(&self, root: &Handle, registry: &TranslatedRegistry) -> Vec<TextItem> {
        self.collect_with_stats(root, registry).0
    }

    pub fn collect_with_stats(
        &self,
        root: &Handle,
        registry: &TranslatedRegistry,
    ) -> (Vec<TextItem>, CollectionStats) {
        let mut items = Vec::new();
        let mut stats = CollectionStats::default();

        // Explicit stack: deep documents must not overflow the call stack
        let mut stack: Vec<(Handle, usize)> = vec![(root.clone(), 0)];
        while let Some((node, depth)) = stack.pop() {
            if let NodeData::Text { contents } = &node.data {
                stats.text_nodes += 1;
                let text = contents.borrow().to_string();

                match self.accept(&node, &text, registry) {
                    Ok(container_tag) => {
                        let item = TextItem {
                            node: node.clone(),
                            text: text.trim().to_string(),
                            container_tag,
                            depth,
                        };
                        stats.accepted += 1;
                        stats.total_chars += item.char_count();
                        items.push(item);
                    }
                    Err(rejection) => *stats.rejected.entry(rejection).or_insert(0) += 1,
                }
                continue;
            }

            for child in node.children.borrow().iter().rev() {
                stack.push((child.clone(), depth + 1));
            }
        }

        tracing::debug!(
            "collected {} of {} text nodes ({} chars)",
            stats.accepted,
            stats.text_nodes,
            stats.total_chars
        );

        (items, stats)
    }

    /// Runs every check on one text node; `Ok` carries the container tag
    pub fn accept(
        &self,
        node: &Handle,
        text: &str,
        registry: &TranslatedRegistry,
    ) -> Result<String, Rejection> {
        let container = get_parent_element(node).ok_or(Rejection::NoContainer)?;
        let tag = get_node_name(&container).unwrap_or_default().to_string();

        if self.config.skip_elements.iter().any(|skip| *skip == tag) {
            return Err(Rejection::SkippedElement);
        }

        if self.is_template_container(&container) {
            return Err(Rejection::TemplateContainer);
        }

        if registry.has(node) {
            return Err(Rejection::AlreadyTranslated);
        }

        self.filter.check(text).map_err(Rejection::Filtered)?;

        Ok(tag)
    }

    fn is_template_container(&self, container: &Handle) -> bool {
        if let Some(class) = get_node_attr(container, "class") {
            if self
                .config
                .class_markers
                .iter()
                .any(|marker| class.contains(marker.as_str()))
            {
                return true;
            }
        }

        attribute_names(container).iter().any(|name| {
            self.config
                .directive_prefixes
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str()))
        })
    }
}
