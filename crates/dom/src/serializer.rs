//! HTML serialization of DOM subtrees.

use crate::attributes::html_escape;
use crate::element::ElementData;
use crate::node::{NodeData, NodeId};
use crate::tree::DomTree;

/// Serialize outer HTML of a node. Removed nodes serialize to nothing.
pub fn serialize_outer_html(tree: &DomTree, node: NodeId) -> String {
    let mut output = String::new();
    serialize_node(tree, node, &mut output);
    output
}

fn serialize_node(tree: &DomTree, node: NodeId, output: &mut String) {
    let Some(node_data) = tree.get(node) else {
        return;
    };

    match &node_data.data {
        NodeData::Document => serialize_children(tree, node, output),
        NodeData::Element(elem) => serialize_element(tree, node, elem, output),
        NodeData::Text { content } => output.push_str(&html_escape(content)),
    }
}

fn serialize_element(tree: &DomTree, node: NodeId, elem: &ElementData, output: &mut String) {
    let tag_name = elem.tag_name.as_str();

    output.push('<');
    output.push_str(tag_name);
    if !elem.attributes.is_empty() {
        output.push(' ');
        output.push_str(&elem.attributes.to_html());
    }
    output.push('>');

    if elem.is_void() {
        return;
    }

    serialize_children(tree, node, output);
    output.push_str("</");
    output.push_str(tag_name);
    output.push('>');
}

fn serialize_children(tree: &DomTree, node: NodeId, output: &mut String) {
    for child in tree.children(node) {
        serialize_node(tree, child, output);
    }
}
