//! WOFF2 (Web Open Font Format 2.0) codec
//!
//! Decoding rebuilds a standalone sfnt from the container: table directory,
//! one Brotli stream holding every table, and the glyf/loca/hmtx transforms.
//! Encoding produces the same layout from an sfnt, with the glyf transform
//! optional.

use std::io::Read;

use crate::glyf;
use crate::reader::{FontReader, FontWrite};
use crate::sfnt::{tag_name, Sfnt, SfntBuilder, Tag, FLAVOR_COLLECTION};
use crate::transform::{
    glyph_x_mins, reconstruct_glyf, reconstruct_hmtx, transform_glyf, transform_hmtx,
};
use crate::{CodecError, FontCodec};

/// WOFF2 signature 'wOF2'
const WOFF2_SIGNATURE: u32 = 0x774F_4632;

const HEADER_SIZE: usize = 48;

/// Brotli window used for the table stream
const WINDOW_BITS: i32 = 22;

/// Highest Brotli quality level
pub const MAX_QUALITY: u32 = 11;

/// Directory flag value meaning an explicit tag follows
const EXPLICIT_TAG: u8 = 0x3F;

/// Known table tags in WOFF2 (index -> tag)
const KNOWN_TAGS: [Tag; 63] = [
    *b"cmap", *b"head", *b"hhea", *b"hmtx", *b"maxp", *b"name", *b"OS/2", *b"post",
    *b"cvt ", *b"fpgm", *b"glyf", *b"loca", *b"prep", *b"CFF ", *b"VORG", *b"EBDT",
    *b"EBLC", *b"gasp", *b"hdmx", *b"kern", *b"LTSH", *b"PCLT", *b"VDMX", *b"vhea",
    *b"vmtx", *b"BASE", *b"GDEF", *b"GPOS", *b"GSUB", *b"EBSC", *b"JSTF", *b"MATH",
    *b"CBDT", *b"CBLC", *b"COLR", *b"CPAL", *b"SVG ", *b"sbix", *b"acnt", *b"avar",
    *b"bdat", *b"bloc", *b"bsln", *b"cvar", *b"fdsc", *b"feat", *b"fmtx", *b"fvar",
    *b"gvar", *b"hsty", *b"just", *b"lcar", *b"mort", *b"morx", *b"opbd", *b"prop",
    *b"trak", *b"Zapf", *b"Silf", *b"Glat", *b"Gloc", *b"Feat", *b"Sill",
];

/// Check if data is WOFF2 format
pub fn is_woff2(data: &[u8]) -> bool {
    data.len() >= 4 && u32::from_be_bytes([data[0], data[1], data[2], data[3]]) == WOFF2_SIGNATURE
}

/// WOFF2 header (48 bytes)
#[derive(Debug, Default)]
struct Woff2Header {
    flavor: u32,
    length: u32,
    num_tables: u16,
    total_sfnt_size: u32,
    total_compressed_size: u32,
}

impl Woff2Header {
    fn parse(reader: &mut FontReader<'_>) -> Result<Self, CodecError> {
        if reader.read_u32()? != WOFF2_SIGNATURE {
            return Err(CodecError::InvalidSignature);
        }
        let flavor = reader.read_u32()?;
        let length = reader.read_u32()?;
        let num_tables = reader.read_u16()?;
        reader.skip(2)?;
        let total_sfnt_size = reader.read_u32()?;
        let total_compressed_size = reader.read_u32()?;
        // version, metadata and private blocks are not needed to rebuild the font
        reader.skip(4 + 12 + 8)?;

        Ok(Self {
            flavor,
            length,
            num_tables,
            total_sfnt_size,
            total_compressed_size,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.write_u32(WOFF2_SIGNATURE);
        out.write_u32(self.flavor);
        out.write_u32(self.length);
        out.write_u16(self.num_tables);
        out.write_u16(0);
        out.write_u32(self.total_sfnt_size);
        out.write_u32(self.total_compressed_size);
        out.write_u16(1);
        out.write_u16(0);
        // metaOffset, metaLength, metaOrigLength, privOffset, privLength
        for _ in 0..5 {
            out.write_u32(0);
        }
    }
}

/// WOFF2 table directory entry
#[derive(Debug, Clone)]
struct TableEntry {
    tag: Tag,
    /// Transform version (flag bits 6-7)
    version: u8,
    orig_length: u32,
    transform_length: Option<u32>,
}

impl TableEntry {
    fn is_transformed(&self) -> bool {
        is_transformed(&self.tag, self.version)
    }

    /// Bytes this table occupies in the decompressed stream
    fn stream_length(&self) -> u32 {
        self.transform_length.unwrap_or(self.orig_length)
    }

    fn parse(reader: &mut FontReader<'_>) -> Result<Self, CodecError> {
        let flags = reader.read_u8()?;
        let index = flags & EXPLICIT_TAG;
        let tag = if index == EXPLICIT_TAG {
            reader.read_tag()?
        } else {
            KNOWN_TAGS[index as usize]
        };
        let version = flags >> 6;
        let orig_length = reader.read_base128()?;
        let transform_length = if is_transformed(&tag, version) {
            Some(reader.read_base128()?)
        } else {
            None
        };
        Ok(Self {
            tag,
            version,
            orig_length,
            transform_length,
        })
    }

    fn write(&self, out: &mut Vec<u8>) {
        let index = KNOWN_TAGS
            .iter()
            .position(|known| known == &self.tag)
            .map_or(EXPLICIT_TAG, |i| i as u8);
        out.write_u8((self.version << 6) | index);
        if index == EXPLICIT_TAG {
            out.extend_from_slice(&self.tag);
        }
        out.write_base128(self.orig_length);
        if let Some(len) = self.transform_length {
            out.write_base128(len);
        }
    }
}

/// glyf and loca use version 0 for the transform and 3 for none;
/// every other table uses version 0 for none.
fn is_transformed(tag: &Tag, version: u8) -> bool {
    if tag == b"glyf" || tag == b"loca" {
        version == 0
    } else {
        version != 0
    }
}

/// WOFF2 codec with configurable glyf transform and Brotli quality
#[derive(Debug, Clone)]
pub struct Woff2Codec {
    transform_glyf: bool,
    quality: u32,
}

impl Woff2Codec {
    pub fn new() -> Self {
        Self {
            transform_glyf: true,
            quality: MAX_QUALITY,
        }
    }

    /// Enable or disable the glyf/loca (and hmtx) transform when encoding
    pub fn with_glyf_transform(mut self, enabled: bool) -> Self {
        self.transform_glyf = enabled;
        self
    }

    /// Brotli quality, clamped to 0..=11
    pub fn with_quality(mut self, quality: u32) -> Self {
        self.quality = quality.min(MAX_QUALITY);
        self
    }

    pub fn quality(&self) -> u32 {
        self.quality
    }

    pub fn transforms_glyf(&self) -> bool {
        self.transform_glyf
    }

    fn compress(&self, stream: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut params = brotli::enc::BrotliEncoderParams::default();
        params.quality = self.quality as i32;
        params.lgwin = WINDOW_BITS;
        params.size_hint = stream.len();

        let mut input = stream;
        let mut out = Vec::with_capacity(stream.len() / 2);
        brotli::BrotliCompress(&mut input, &mut out, &params)?;
        Ok(out)
    }
}

impl Default for Woff2Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl FontCodec for Woff2Codec {
    fn decode(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let sfnt = decode_woff2(data)?;
        if sfnt.is_empty() {
            return Err(CodecError::EmptyOutput);
        }
        tracing::debug!(woff2 = data.len(), sfnt = sfnt.len(), "decoded WOFF2");
        Ok(sfnt)
    }

    fn encode(&self, sfnt: &[u8]) -> Result<Vec<u8>, CodecError> {
        let woff2 = self.encode_woff2(sfnt)?;
        if woff2.is_empty() {
            return Err(CodecError::EmptyOutput);
        }
        tracing::debug!(sfnt = sfnt.len(), woff2 = woff2.len(), "encoded WOFF2");
        Ok(woff2)
    }
}

// ============================================================================
// Decoding
// ============================================================================

fn decode_woff2(data: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut reader = FontReader::new(data);
    let header = Woff2Header::parse(&mut reader)?;
    if header.flavor == FLAVOR_COLLECTION {
        return Err(CodecError::Collection);
    }
    if header.num_tables == 0 {
        return Err(CodecError::EmptyOutput);
    }
    if header.length as usize > data.len() {
        return Err(CodecError::InvalidTableDirectory(format!(
            "header length {} exceeds file size {}",
            header.length,
            data.len()
        )));
    }

    let mut entries = Vec::with_capacity(header.num_tables as usize);
    for _ in 0..header.num_tables {
        let entry = TableEntry::parse(&mut reader)?;
        if entries.iter().any(|e: &TableEntry| e.tag == entry.tag) {
            return Err(CodecError::InvalidTableDirectory(format!(
                "duplicate table '{}'",
                tag_name(&entry.tag)
            )));
        }
        entries.push(entry);
    }
    validate_transforms(&entries)?;

    let compressed = reader.read_bytes(header.total_compressed_size as usize)?;
    let expected: u64 = entries.iter().map(|e| e.stream_length() as u64).sum();
    let stream = decompress(compressed, expected)?;

    // Slice the stream into per-table data
    let mut offset = 0usize;
    let mut raw: Vec<(&TableEntry, &[u8])> = Vec::with_capacity(entries.len());
    for entry in &entries {
        let len = entry.stream_length() as usize;
        raw.push((entry, &stream[offset..offset + len]));
        offset += len;
    }
    let find = |tag: &Tag| raw.iter().find(|(e, _)| &e.tag == tag).map(|(_, d)| *d);

    let mut builder = SfntBuilder::new(header.flavor);
    let mut x_mins = None;

    if let Some(glyf_entry) = entries.iter().find(|e| &e.tag == b"glyf" && e.is_transformed()) {
        let data = find(&glyf_entry.tag).ok_or(CodecError::MissingTable("glyf"))?;
        let rebuilt =
            reconstruct_glyf(data).map_err(|e| CodecError::Transform(format!("glyf: {e}")))?;
        let num_glyphs = (rebuilt.offsets.len() - 1) as u16;
        x_mins = Some(glyph_x_mins(&rebuilt.glyf, &rebuilt.offsets, num_glyphs));
        builder.insert(*b"glyf", rebuilt.glyf);
        builder.insert(*b"loca", rebuilt.loca);
    }

    for (entry, data) in &raw {
        match (&entry.tag, entry.is_transformed()) {
            (b"glyf" | b"loca", true) => {}
            (b"hmtx", true) if entry.version == 1 => {
                let x_mins = match &x_mins {
                    Some(x_mins) => x_mins.clone(),
                    None => untransformed_x_mins(&raw)?,
                };
                let hhea = find(b"hhea").ok_or(CodecError::MissingTable("hhea"))?;
                let num_h_metrics =
                    glyf::num_h_metrics(hhea).ok_or(CodecError::MissingTable("hhea"))?;
                let hmtx = reconstruct_hmtx(data, &x_mins, num_h_metrics)
                    .map_err(|e| CodecError::Transform(format!("hmtx: {e}")))?;
                builder.insert(entry.tag, hmtx);
            }
            (_, false) => {
                if data.len() != entry.orig_length as usize {
                    return Err(CodecError::InvalidTableDirectory(format!(
                        "table '{}' length mismatch",
                        tag_name(&entry.tag)
                    )));
                }
                builder.insert(entry.tag, data.to_vec());
            }
            (tag, true) => {
                return Err(CodecError::Transform(format!(
                    "unsupported transform version {} for '{}'",
                    entry.version,
                    tag_name(tag)
                )));
            }
        }
    }

    Ok(builder.build())
}

/// xMin values from a glyf table that was stored without transform
fn untransformed_x_mins(raw: &[(&TableEntry, &[u8])]) -> Result<Vec<i16>, CodecError> {
    let find = |tag: &Tag| raw.iter().find(|(e, _)| &e.tag == tag).map(|(_, d)| *d);
    let glyf_data = find(b"glyf").ok_or(CodecError::MissingTable("glyf"))?;
    let loca = find(b"loca").ok_or(CodecError::MissingTable("loca"))?;
    let head = find(b"head").ok_or(CodecError::MissingTable("head"))?;
    let maxp = find(b"maxp").ok_or(CodecError::MissingTable("maxp"))?;
    let num_glyphs = glyf::num_glyphs(maxp).ok_or(CodecError::MissingTable("maxp"))?;
    let long = glyf::long_loca(head).ok_or(CodecError::MissingTable("head"))?;
    let offsets = glyf::read_loca(loca, num_glyphs, long)?;
    Ok(glyph_x_mins(glyf_data, &offsets, num_glyphs))
}

/// glyf and loca must be transformed together, loca carrying no data
fn validate_transforms(entries: &[TableEntry]) -> Result<(), CodecError> {
    let glyf = entries.iter().find(|e| &e.tag == b"glyf");
    let loca = entries.iter().find(|e| &e.tag == b"loca");
    match (glyf, loca) {
        (Some(g), Some(l)) => {
            if g.is_transformed() != l.is_transformed() {
                return Err(CodecError::InvalidTableDirectory(
                    "glyf and loca transforms differ".into(),
                ));
            }
            if l.is_transformed() && l.transform_length != Some(0) {
                return Err(CodecError::InvalidTableDirectory(
                    "transformed loca must be empty".into(),
                ));
            }
            Ok(())
        }
        (None, None) => Ok(()),
        _ => Err(CodecError::InvalidTableDirectory(
            "glyf and loca must appear together".into(),
        )),
    }
}

fn decompress(compressed: &[u8], expected: u64) -> Result<Vec<u8>, CodecError> {
    let mut out = Vec::with_capacity(expected.min(64 << 20) as usize);
    // Read one byte past the expected size to detect oversized streams
    brotli::Decompressor::new(compressed, 4096)
        .take(expected + 1)
        .read_to_end(&mut out)?;
    if out.len() as u64 != expected {
        return Err(CodecError::InvalidTableDirectory(format!(
            "decompressed {} bytes, directory expects {expected}",
            out.len()
        )));
    }
    Ok(out)
}

// ============================================================================
// Encoding
// ============================================================================

impl Woff2Codec {
    fn encode_woff2(&self, data: &[u8]) -> Result<Vec<u8>, CodecError> {
        let sfnt = Sfnt::parse(data)?;

        let mut tables: Vec<(Tag, &[u8])> =
            sfnt.tables().filter(|(tag, _)| tag != b"DSIG").collect();
        if tables.is_empty() {
            return Err(CodecError::EmptyOutput);
        }
        tables.sort_by_key(|(tag, _)| *tag);
        // loca directly follows glyf
        if let Some(loca_pos) = tables.iter().position(|(tag, _)| tag == b"loca") {
            let loca = tables.remove(loca_pos);
            let glyf_pos = tables.iter().position(|(tag, _)| tag == b"glyf");
            match glyf_pos {
                Some(pos) => tables.insert(pos + 1, loca),
                None => tables.insert(loca_pos, loca),
            }
        }

        let transformed = if self.transform_glyf {
            self.transform_tables(&sfnt)?
        } else {
            None
        };

        let mut entries = Vec::with_capacity(tables.len());
        let mut stream = Vec::new();
        for (tag, table) in &tables {
            let entry = match (tag, &transformed) {
                (b"glyf", Some(t)) => {
                    stream.extend_from_slice(&t.glyf);
                    TableEntry {
                        tag: *tag,
                        version: 0,
                        orig_length: table.len() as u32,
                        transform_length: Some(t.glyf.len() as u32),
                    }
                }
                (b"loca", Some(_)) => TableEntry {
                    tag: *tag,
                    version: 0,
                    orig_length: table.len() as u32,
                    transform_length: Some(0),
                },
                (b"hmtx", Some(TransformedTables { hmtx: Some(hmtx), .. })) => {
                    stream.extend_from_slice(hmtx);
                    TableEntry {
                        tag: *tag,
                        version: 1,
                        orig_length: table.len() as u32,
                        transform_length: Some(hmtx.len() as u32),
                    }
                }
                (b"glyf" | b"loca", _) => {
                    stream.extend_from_slice(table);
                    TableEntry {
                        tag: *tag,
                        version: 3,
                        orig_length: table.len() as u32,
                        transform_length: None,
                    }
                }
                _ => {
                    stream.extend_from_slice(table);
                    TableEntry {
                        tag: *tag,
                        version: 0,
                        orig_length: table.len() as u32,
                        transform_length: None,
                    }
                }
            };
            entries.push(entry);
        }

        let compressed = self.compress(&stream)?;

        let mut directory = Vec::new();
        for entry in &entries {
            entry.write(&mut directory);
        }

        let total_sfnt_size = 12
            + 16 * tables.len()
            + tables.iter().map(|(_, t)| (t.len() + 3) & !3).sum::<usize>();
        let length = (HEADER_SIZE + directory.len() + compressed.len() + 3) & !3;

        let header = Woff2Header {
            flavor: sfnt.flavor(),
            length: length as u32,
            num_tables: entries.len() as u16,
            total_sfnt_size: total_sfnt_size as u32,
            total_compressed_size: compressed.len() as u32,
        };

        let mut out = Vec::with_capacity(length);
        header.write(&mut out);
        out.extend_from_slice(&directory);
        out.extend_from_slice(&compressed);
        out.pad4();
        Ok(out)
    }

    /// Transformed glyf (and hmtx when it shrinks); `None` for fonts without
    /// TrueType outlines
    fn transform_tables(&self, sfnt: &Sfnt<'_>) -> Result<Option<TransformedTables>, CodecError> {
        let (Some(glyf_data), Some(loca)) = (sfnt.table(b"glyf"), sfnt.table(b"loca")) else {
            return Ok(None);
        };
        let head = sfnt.table(b"head").ok_or(CodecError::MissingTable("head"))?;
        let maxp = sfnt.table(b"maxp").ok_or(CodecError::MissingTable("maxp"))?;
        let num_glyphs = glyf::num_glyphs(maxp).ok_or(CodecError::MissingTable("maxp"))?;
        let long = glyf::long_loca(head).ok_or(CodecError::MissingTable("head"))?;
        let offsets = glyf::read_loca(loca, num_glyphs, long)?;

        let glyf = transform_glyf(glyf_data, &offsets, num_glyphs, long)
            .map_err(|e| CodecError::Transform(format!("glyf: {e}")))?;

        let hmtx = match (sfnt.table(b"hmtx"), sfnt.table(b"hhea").and_then(glyf::num_h_metrics)) {
            (Some(hmtx), Some(num_h_metrics)) => {
                let x_mins = glyph_x_mins(glyf_data, &offsets, num_glyphs);
                transform_hmtx(hmtx, &x_mins, num_h_metrics)
                    .map_err(|e| CodecError::Transform(format!("hmtx: {e}")))?
            }
            _ => None,
        };

        Ok(Some(TransformedTables { glyf, hmtx }))
    }
}

struct TransformedTables {
    glyf: Vec<u8>,
    hmtx: Option<Vec<u8>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_woff2() {
        assert!(is_woff2(b"wOF2...."));
        assert!(!is_woff2(b"wOFF...."));
        assert!(!is_woff2(b"OTT"));
    }

    #[test]
    fn test_known_tags() {
        assert_eq!(KNOWN_TAGS[0], *b"cmap");
        assert_eq!(KNOWN_TAGS[10], *b"glyf");
        assert_eq!(KNOWN_TAGS[11], *b"loca");
        assert_eq!(KNOWN_TAGS[62], *b"Sill");
    }

    #[test]
    fn test_directory_entry_known_and_explicit_tags() {
        let entries = [
            TableEntry { tag: *b"glyf", version: 0, orig_length: 1000, transform_length: Some(600) },
            TableEntry { tag: *b"loca", version: 3, orig_length: 40, transform_length: None },
            TableEntry { tag: *b"Xtra", version: 0, orig_length: 5, transform_length: None },
        ];
        let mut buf = Vec::new();
        for e in &entries {
            e.write(&mut buf);
        }
        assert_eq!(buf[0], 10);

        let mut reader = FontReader::new(&buf);
        let glyf = TableEntry::parse(&mut reader).unwrap();
        assert_eq!(glyf.transform_length, Some(600));
        assert!(glyf.is_transformed());

        let loca = TableEntry::parse(&mut reader).unwrap();
        assert!(!loca.is_transformed());
        assert_eq!(loca.stream_length(), 40);

        let extra = TableEntry::parse(&mut reader).unwrap();
        assert_eq!(extra.tag, *b"Xtra");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_rejects_bad_signature() {
        let codec = Woff2Codec::new();
        assert!(matches!(codec.decode(&[0u8; 48]), Err(CodecError::InvalidSignature)));
    }

    #[test]
    fn test_rejects_truncated_header() {
        let codec = Woff2Codec::new();
        assert!(matches!(codec.decode(b"wOF2\x00\x01"), Err(CodecError::Read(_))));
    }

    #[test]
    fn test_rejects_collection_flavor() {
        let mut data = Vec::new();
        Woff2Header {
            flavor: FLAVOR_COLLECTION,
            length: 48,
            num_tables: 1,
            ..Default::default()
        }
        .write(&mut data);
        assert!(matches!(Woff2Codec::new().decode(&data), Err(CodecError::Collection)));
    }

    #[test]
    fn test_rejects_empty_directory() {
        let mut data = Vec::new();
        Woff2Header {
            flavor: 0x0001_0000,
            length: 48,
            ..Default::default()
        }
        .write(&mut data);
        assert!(matches!(Woff2Codec::new().decode(&data), Err(CodecError::EmptyOutput)));
    }

    #[test]
    fn test_rejects_reserved_hmtx_transform() {
        let codec = Woff2Codec::new();
        for version in [2u8, 3] {
            let entry = TableEntry {
                tag: *b"hmtx",
                version,
                orig_length: 8,
                transform_length: Some(4),
            };
            let compressed = codec.compress(&[0; 4]).unwrap();

            let mut directory = Vec::new();
            entry.write(&mut directory);
            let length = HEADER_SIZE + directory.len() + compressed.len();

            let mut data = Vec::new();
            Woff2Header {
                flavor: 0x0001_0000,
                length: length as u32,
                num_tables: 1,
                total_sfnt_size: 12 + 16 + 8,
                total_compressed_size: compressed.len() as u32,
            }
            .write(&mut data);
            data.extend_from_slice(&directory);
            data.extend_from_slice(&compressed);

            let err = codec.decode(&data).unwrap_err();
            assert!(
                matches!(&err, CodecError::Transform(msg) if msg.contains("unsupported transform version")),
                "version {version}: {err}"
            );
        }
    }

    #[test]
    fn test_quality_clamped() {
        assert_eq!(Woff2Codec::new().with_quality(40).quality(), MAX_QUALITY);
        assert_eq!(Woff2Codec::new().with_quality(4).quality(), 4);
    }
}
