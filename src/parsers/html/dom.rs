use std::cell::RefCell;
use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::interface::{Attribute, QualName};
use html5ever::parse_document;
use html5ever::tendril::{StrTendril, TendrilSink};
use html5ever::{namespace_url, ns, LocalName};
use markup5ever_rcdom::{Handle, Node, NodeData, RcDom};

use crate::core::InterlinearError;

/// Converts HTML bytes into a DOM
pub fn html_to_dom(data: &[u8], document_encoding: &str) -> Result<RcDom, InterlinearError> {
    let s: String = match Encoding::for_label(document_encoding.as_bytes()) {
        Some(encoding) => encoding.decode(data).0.into_owned(),
        None => String::from_utf8_lossy(data).into_owned(),
    };

    parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut s.as_bytes())
        .map_err(|e| InterlinearError::new(&format!("failed to parse HTML: {e}")))
}

/// Finds nodes along a path of tag names, e.g. `["html", "body"]`
pub fn find_nodes(node: &Handle, node_names: &[&str]) -> Vec<Handle> {
    let Some((node_name, rest)) = node_names.split_first() else {
        return Vec::new();
    };

    let mut found_nodes = Vec::new();
    let matches = get_node_name(node) == Some(*node_name);

    if matches && rest.is_empty() {
        found_nodes.push(node.clone());
    }

    if matches && !rest.is_empty() {
        found_nodes.append(&mut find_nodes_in_children(node, rest));
    } else {
        found_nodes.append(&mut find_nodes_in_children(node, node_names));
    }

    found_nodes
}

fn find_nodes_in_children(node: &Handle, node_names: &[&str]) -> Vec<Handle> {
    node.children
        .borrow()
        .iter()
        .flat_map(|child| find_nodes(child, node_names))
        .collect()
}

/// Depth-first search for the element carrying `id`
pub fn find_element_by_id(node: &Handle, id: &str) -> Option<Handle> {
    if get_node_attr(node, "id").as_deref() == Some(id) {
        return Some(node.clone());
    }

    node.children
        .borrow()
        .iter()
        .find_map(|child| find_element_by_id(child, id))
}

/// The `<body>` element, else the document node itself
pub fn document_body(dom: &RcDom) -> Handle {
    find_nodes(&dom.document, &["html", "body"])
        .into_iter()
        .next()
        .unwrap_or_else(|| dom.document.clone())
}

pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .find(|attr| &*attr.name.local == attr_name)
            .map(|attr| attr.value.to_string()),
        _ => None,
    }
}

pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

pub fn is_element(node: &Handle) -> bool {
    matches!(node.data, NodeData::Element { .. })
}

pub fn is_text(node: &Handle) -> bool {
    matches!(node.data, NodeData::Text { .. })
}

/// Parent node, if the node is still attached and the parent alive
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// The immediate containing element of a node
pub fn get_parent_element(child: &Handle) -> Option<Handle> {
    get_parent_node(child).filter(is_element)
}

pub fn child_index(parent: &Handle, child: &Handle) -> Option<usize> {
    parent
        .children
        .try_borrow()
        .ok()?
        .iter()
        .position(|node| Rc::ptr_eq(node, child))
}

pub fn next_sibling(node: &Handle) -> Option<Handle> {
    let parent = get_parent_node(node)?;
    let index = child_index(&parent, node)?;
    let children = parent.children.borrow();
    children.get(index + 1).cloned()
}

/// Inserts `new_node` right after `reference`; nothing changes on failure
pub fn insert_after(reference: &Handle, new_node: &Handle) -> bool {
    let Some(parent) = get_parent_node(reference) else {
        return false;
    };
    let Some(index) = child_index(&parent, reference) else {
        return false;
    };
    let Ok(mut children) = parent.children.try_borrow_mut() else {
        return false;
    };

    new_node.parent.set(Some(Rc::downgrade(&parent)));
    children.insert(index + 1, new_node.clone());
    true
}

/// Removes the node from its parent; false when it was not attached
pub fn detach(node: &Handle) -> bool {
    let Some(parent) = get_parent_node(node) else {
        return false;
    };
    let Some(index) = child_index(&parent, node) else {
        return false;
    };
    let Ok(mut children) = parent.children.try_borrow_mut() else {
        return false;
    };

    children.remove(index);
    node.parent.set(None);
    true
}

/// First text node at or below `node`, in document order
pub fn first_text_descendant(node: &Handle) -> Option<Handle> {
    if is_text(node) {
        return Some(node.clone());
    }

    node.children.borrow().iter().find_map(first_text_descendant)
}

pub fn text_content(node: &Handle) -> String {
    match &node.data {
        NodeData::Text { contents } => contents.borrow().to_string(),
        _ => node
            .children
            .borrow()
            .iter()
            .map(text_content)
            .collect(),
    }
}

pub fn create_element(name: QualName, attrs: Vec<Attribute>) -> Handle {
    Node::new(NodeData::Element {
        name,
        attrs: RefCell::new(attrs),
        template_contents: RefCell::new(None),
        mathml_annotation_xml_integration_point: false,
    })
}

pub fn create_text(text: &str) -> Handle {
    Node::new(NodeData::Text {
        contents: RefCell::new(StrTendril::from_slice(text)),
    })
}

/// Replaces every child with a single text node
pub fn set_text_content(element: &Handle, text: &str) -> bool {
    let Ok(mut children) = element.children.try_borrow_mut() else {
        return false;
    };
    for child in children.drain(..) {
        child.parent.set(None);
    }
    let text_node = create_text(text);
    text_node.parent.set(Some(Rc::downgrade(element)));
    children.push(text_node);
    true
}

pub fn attr_name(name: &str) -> QualName {
    QualName::new(None, ns!(), LocalName::from(name))
}

/// Sets, or with `None` removes, an attribute
pub fn set_node_attr(node: &Handle, name: &str, attr_value: Option<String>) {
    if let NodeData::Element { attrs, .. } = &node.data {
        let Ok(mut attrs) = attrs.try_borrow_mut() else {
            return;
        };

        match attr_value {
            Some(value) => {
                match attrs.iter_mut().find(|attr| &*attr.name.local == name) {
                    Some(existing) => existing.value = StrTendril::from_slice(&value),
                    None => attrs.push(Attribute {
                        name: attr_name(name),
                        value: StrTendril::from_slice(&value),
                    }),
                }
            }
            None => attrs.retain(|attr| &*attr.name.local != name),
        }
    }
}

/// Whitespace-separated class list
pub fn get_class_list(node: &Handle) -> Vec<String> {
    get_node_attr(node, "class")
        .map(|classes| classes.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

pub fn attribute_names(node: &Handle) -> Vec<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => attrs
            .borrow()
            .iter()
            .map(|attr| attr.name.local.to_string())
            .collect(),
        _ => Vec::new(),
    }
}
