//! Round-trip behaviour of SvgDocument on exported scenes

use scenefont_svg::*;

const SCENE: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="80"><g><text font-family="Virgil, Segoe UI Emoji">Hello</text></g><g><text font-family="Cascadia, Segoe UI Emoji">x &lt; y</text></g></svg>"#;

#[test]
fn test_roundtrip_preserves_markup() {
    let doc = SvgDocument::parse(SCENE).unwrap();
    assert_eq!(doc.to_svg_string(), SCENE);
}

#[test]
fn test_style_inserted_before_existing_content() {
    let mut doc = SvgDocument::parse(SCENE).unwrap();
    doc.insert_style_first("@font-face { font-family: \"Virgil\"; }");
    doc.insert_style_first("@font-face { font-family: \"Cascadia\"; }");

    let out = doc.to_svg_string();
    let cascadia = out.find("\"Cascadia\"; }").unwrap();
    let virgil = out.find("\"Virgil\"; }").unwrap();
    let first_group = out.find("<g>").unwrap();
    assert!(cascadia < virgil);
    assert!(virgil < first_group);
    assert!(out.starts_with(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="200" height="80"><style>"#
    ));
}

#[test]
fn test_text_nodes_in_document_order() {
    let mut doc = SvgDocument::parse(SCENE).unwrap();
    doc.insert_style_first("text { }");

    let texts = doc.text_nodes();
    assert_eq!(texts.len(), 2);
    assert_eq!(doc.tree().text_content(texts[0]), "Hello");
    assert_eq!(doc.tree().text_content(texts[1]), "x < y");
}

#[test]
fn test_rewritten_attribute_serialized() {
    let mut doc = SvgDocument::parse(SCENE).unwrap();
    let second = doc.text_nodes()[1];
    doc.set_attribute(second, "font-family", "Cascadia, Segoe UI Emoji");
    doc.set_attribute(second, "font-family-number", "3");

    let out = doc.to_svg_string();
    assert!(out.contains(
        r#"<text font-family="Cascadia, Segoe UI Emoji" font-family-number="3">x &lt; y</text>"#
    ));
}

#[test]
fn test_from_str() {
    let doc: SvgDocument = SCENE.parse().unwrap();
    assert_eq!(doc.text_nodes().len(), 2);
}
