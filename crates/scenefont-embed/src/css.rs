//! `@font-face` rule text

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

const WOFF2_MEDIA_TYPE: &str = "font/woff2";

/// `data:` URI carrying a WOFF2 binary
pub(crate) fn woff2_data_uri(woff2: &[u8]) -> String {
    format!("data:{WOFF2_MEDIA_TYPE};base64,{}", STANDARD.encode(woff2))
}

/// Escape text for a double-quoted CSS string
pub(crate) fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\a "),
            c if c.is_control() => out.push_str(&format!("\\{:x} ", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Rule pointing a family at an inline font
pub(crate) fn embedded_font_face(family: &str, data_uri: &str) -> String {
    format!(
        "@font-face {{\n  font-family: \"{}\";\n  src: url(\"{}\") format(\"woff2\");\n}}",
        escape_string(family),
        data_uri
    )
}

/// Rule pointing a family at installed fonts
pub(crate) fn local_font_face(family: &str, local_fallback: &str) -> String {
    format!(
        "@font-face {{\n  font-family: \"{0}\";\n  src: local(\"{0}\"), local(\"{1}\");\n}}",
        escape_string(family),
        escape_string(local_fallback)
    )
}
