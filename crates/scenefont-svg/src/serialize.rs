//! Serialization of the node tree back to SVG text

use crate::{NodeData, NodeId, SvgTree};

/// Serialize every child of the document node
pub(crate) fn to_string(tree: &SvgTree) -> String {
    let mut out = String::with_capacity(tree.len() * 32);
    for (id, _) in tree.children(tree.root()) {
        write_node(tree, id, &mut out);
    }
    out
}

fn write_node(tree: &SvgTree, id: NodeId, out: &mut String) {
    let Some(node) = tree.get(id) else {
        return;
    };

    match &node.data {
        NodeData::Document => {
            for (child, _) in tree.children(id) {
                write_node(tree, child, out);
            }
        }
        NodeData::Element(el) => {
            out.push('<');
            out.push_str(&el.name);
            for attr in &el.attrs {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                escape_into(&attr.value, true, out);
                out.push('"');
            }

            if !node.first_child.is_valid() {
                out.push_str("/>");
                return;
            }

            out.push('>');
            for (child, _) in tree.children(id) {
                write_node(tree, child, out);
            }
            out.push_str("</");
            out.push_str(&el.name);
            out.push('>');
        }
        NodeData::Text(text) => escape_into(text, false, out),
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::ProcessingInstruction { target, data } => {
            out.push_str("<?");
            out.push_str(target);
            if let Some(data) = data {
                out.push(' ');
                out.push_str(data);
            }
            out.push_str("?>");
        }
    }
}

fn escape_into(text: &str, in_attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' if !in_attribute => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        let mut out = String::new();
        escape_into("a < b && c > \"d\"", false, &mut out);
        assert_eq!(out, "a &lt; b &amp;&amp; c &gt; \"d\"");
    }

    #[test]
    fn test_escape_attribute() {
        let mut out = String::new();
        escape_into("\"Virgil\" & <x>", true, &mut out);
        assert_eq!(out, "&quot;Virgil&quot; &amp; &lt;x>");
    }

    #[test]
    fn test_serialize_nested() {
        let mut tree = SvgTree::new();
        let svg = tree.create_element("svg");
        let g = tree.create_element("g");
        let text = tree.create_element("text");
        let content = tree.create_text("1 < 2");
        tree.append_child(tree.root(), svg);
        tree.append_child(svg, g);
        tree.append_child(svg, text);
        tree.append_child(text, content);
        tree.element_mut(text).unwrap().set_attr("x", "4");

        assert_eq!(to_string(&tree), r#"<svg><g/><text x="4">1 &lt; 2</text></svg>"#);
    }
}
