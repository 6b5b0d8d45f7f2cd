//! WOFF2 encode/decode over synthetic fonts

use scenefont_font::fixtures::{glyph_outline, FixtureFont};
use scenefont_font::*;

fn sample_font() -> FixtureFont {
    FixtureFont::with_chars("Hello, World! 0123")
        .with_composite('Ĥ', &['H', 'e'])
        .with_empty_glyph()
        .with_dsig()
        .with_table(*b"Zzzz", vec![1, 2, 3, 4, 5])
}

/// head without its checksum adjustment
fn head_body(font: &[u8]) -> Vec<u8> {
    let mut head = Sfnt::parse(font).unwrap().table(b"head").unwrap().to_vec();
    head[8..12].fill(0);
    head
}

fn assert_same_outlines(a: &[u8], b: &[u8], num_glyphs: u16) {
    for gid in 0..num_glyphs {
        assert_eq!(glyph_outline(a, gid), glyph_outline(b, gid), "glyph {gid}");
    }
}

#[test]
fn test_roundtrip_with_glyf_transform() {
    let fixture = sample_font();
    let original = fixture.build();
    let codec = Woff2Codec::new();

    let woff2 = codec.encode(&original).unwrap();
    assert!(is_woff2(&woff2));
    assert_eq!(woff2.len() % 4, 0);

    let decoded = codec.decode(&woff2).unwrap();
    let before = Sfnt::parse(&original).unwrap();
    let after = Sfnt::parse(&decoded).unwrap();

    for (tag, data) in before.tables() {
        match &tag {
            b"DSIG" => assert!(!after.has_table(&tag)),
            b"glyf" | b"loca" | b"head" => assert!(after.has_table(&tag)),
            _ => assert_eq!(after.table(&tag), Some(data), "table {}", sfnt::tag_name(&tag)),
        }
    }
    assert_eq!(head_body(&original), head_body(&decoded));
    assert_same_outlines(&original, &decoded, fixture.num_glyphs());
}

#[test]
fn test_transformed_decode_is_stable() {
    let codec = Woff2Codec::new();
    let first = codec.decode(&codec.encode(&sample_font().build()).unwrap()).unwrap();
    let second = codec.decode(&codec.encode(&first).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_roundtrip_without_glyf_transform() {
    let fixture = sample_font();
    let original = fixture.build();
    let codec = Woff2Codec::new().with_glyf_transform(false);

    let decoded = codec.decode(&codec.encode(&original).unwrap()).unwrap();
    let before = Sfnt::parse(&original).unwrap();
    let after = Sfnt::parse(&decoded).unwrap();

    for (tag, data) in before.tables() {
        match &tag {
            b"DSIG" => assert!(!after.has_table(&tag)),
            b"head" => assert_eq!(head_body(&original), head_body(&decoded)),
            _ => assert_eq!(after.table(&tag), Some(data), "table {}", sfnt::tag_name(&tag)),
        }
    }
}

#[test]
fn test_long_loca_preserved() {
    let fixture = FixtureFont::with_chars("abc").with_long_loca();
    let original = fixture.build();
    let codec = Woff2Codec::new();
    let decoded = codec.decode(&codec.encode(&original).unwrap()).unwrap();

    let loca = Sfnt::parse(&decoded).unwrap().table(b"loca").unwrap().len();
    assert_eq!(loca, (fixture.num_glyphs() as usize + 1) * 4);
    assert_same_outlines(&original, &decoded, fixture.num_glyphs());
}

#[test]
fn test_decoded_font_maps_characters() {
    let codec = Woff2Codec::new().with_quality(5);
    let decoded = codec.decode(&codec.encode(&sample_font().build()).unwrap()).unwrap();

    let face = ttf_parser::Face::parse(&decoded, 0).unwrap();
    assert!(face.glyph_index('W').is_some());
    assert!(face.glyph_index('Ĥ').is_some());
    assert!(face.glyph_index('q').is_none());
}

#[test]
fn test_decode_rejects_truncated_file() {
    let codec = Woff2Codec::new();
    let woff2 = codec.encode(&sample_font().build()).unwrap();
    let truncated = &woff2[..woff2.len() / 2];
    assert!(codec.decode(truncated).is_err());
}

#[test]
fn test_decode_rejects_plain_sfnt() {
    let codec = Woff2Codec::new();
    let err = codec.decode(&sample_font().build()).unwrap_err();
    assert!(matches!(err, CodecError::InvalidSignature));
}

#[test]
fn test_encode_rejects_collection() {
    let data = b"ttcf\x00\x01\x00\x00\x00\x00\x00\x01\x00\x00\x00\x10";
    let err = Woff2Codec::new().encode(data).unwrap_err();
    assert!(matches!(err, CodecError::Sfnt(SfntError::Collection)));
}

#[test]
fn test_encode_rejects_empty_input() {
    assert!(Woff2Codec::new().encode(&[]).is_err());
}
