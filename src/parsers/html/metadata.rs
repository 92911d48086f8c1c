use markup5ever_rcdom::Handle;

use super::dom::{find_nodes, get_node_attr};

/// The `href` of the first `<base>` element, if any
pub fn get_base_url(handle: &Handle) -> Option<String> {
    find_nodes(handle, &["html", "head", "base"])
        .first()
        .and_then(|base_node| get_node_attr(base_node, "href"))
}

/// Charset declared by `<meta charset>` or `<meta http-equiv="content-type">`
pub fn get_charset(node: &Handle) -> Option<String> {
    for meta_node in find_nodes(node, &["html", "head", "meta"]) {
        if let Some(charset) = get_node_attr(&meta_node, "charset") {
            return Some(charset);
        }

        let is_content_type = get_node_attr(&meta_node, "http-equiv")
            .is_some_and(|value| value.eq_ignore_ascii_case("content-type"));
        if is_content_type {
            if let Some(content) = get_node_attr(&meta_node, "content") {
                return charset_from_content_type(&content);
            }
        }
    }

    None
}

fn charset_from_content_type(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}
