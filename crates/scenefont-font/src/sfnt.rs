//! sfnt container - table directory reader and writer
//!
//! The uncompressed TrueType/OpenType wrapper shared by the WOFF2 codec and
//! the subsetter. Reading borrows the input; writing always emits a sorted
//! directory with fresh checksums and `head.checksumAdjustment`.

use std::collections::BTreeMap;

use crate::reader::{FontReader, FontWrite, ReadError};

/// Four-byte table tag
pub type Tag = [u8; 4];

/// TrueType outlines
pub const FLAVOR_TRUETYPE: u32 = 0x0001_0000;
/// Apple TrueType
pub const FLAVOR_TRUE: u32 = u32::from_be_bytes(*b"true");
/// CFF outlines
pub const FLAVOR_CFF: u32 = u32::from_be_bytes(*b"OTTO");
/// Font collection header
pub const FLAVOR_COLLECTION: u32 = u32::from_be_bytes(*b"ttcf");

const CHECKSUM_MAGIC: u32 = 0xB1B0_AFBA;

/// sfnt error types
#[derive(Debug, thiserror::Error)]
pub enum SfntError {
    #[error("Font collections are not supported")]
    Collection,

    #[error("Unknown sfnt version 0x{0:08X}")]
    UnknownFlavor(u32),

    #[error("Font has no tables")]
    NoTables,

    #[error("Table '{0}' lies outside the font data")]
    TableOutOfBounds(String),

    #[error(transparent)]
    Read(#[from] ReadError),
}

/// Table directory record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableRecord {
    pub tag: Tag,
    pub checksum: u32,
    pub offset: u32,
    pub length: u32,
}

/// Parsed sfnt borrowing the font data
#[derive(Debug, Clone)]
pub struct Sfnt<'a> {
    data: &'a [u8],
    flavor: u32,
    records: Vec<TableRecord>,
}

impl<'a> Sfnt<'a> {
    /// Parse the offset table and table directory
    pub fn parse(data: &'a [u8]) -> Result<Self, SfntError> {
        let mut reader = FontReader::new(data);
        let flavor = reader.read_u32()?;
        match flavor {
            FLAVOR_TRUETYPE | FLAVOR_TRUE | FLAVOR_CFF => {}
            FLAVOR_COLLECTION => return Err(SfntError::Collection),
            other => return Err(SfntError::UnknownFlavor(other)),
        }

        let num_tables = reader.read_u16()?;
        if num_tables == 0 {
            return Err(SfntError::NoTables);
        }
        reader.skip(6)?;

        let mut records = Vec::with_capacity(num_tables as usize);
        for _ in 0..num_tables {
            let record = TableRecord {
                tag: reader.read_tag()?,
                checksum: reader.read_u32()?,
                offset: reader.read_u32()?,
                length: reader.read_u32()?,
            };
            let end = record.offset as u64 + record.length as u64;
            if end > data.len() as u64 {
                return Err(SfntError::TableOutOfBounds(tag_name(&record.tag)));
            }
            records.push(record);
        }

        Ok(Self {
            data,
            flavor,
            records,
        })
    }

    /// sfnt version tag of the font
    pub fn flavor(&self) -> u32 {
        self.flavor
    }

    /// Directory records in file order
    pub fn records(&self) -> &[TableRecord] {
        &self.records
    }

    /// Raw bytes of a table
    pub fn table(&self, tag: &Tag) -> Option<&'a [u8]> {
        let record = self.records.iter().find(|r| &r.tag == tag)?;
        let start = record.offset as usize;
        self.data.get(start..start + record.length as usize)
    }

    /// Whether a table is present
    pub fn has_table(&self, tag: &Tag) -> bool {
        self.records.iter().any(|r| &r.tag == tag)
    }

    /// All tables as (tag, bytes), in directory order
    pub fn tables(&self) -> impl Iterator<Item = (Tag, &'a [u8])> + '_ {
        self.records.iter().filter_map(|r| {
            let start = r.offset as usize;
            self.data
                .get(start..start + r.length as usize)
                .map(|bytes| (r.tag, bytes))
        })
    }
}

/// Assembles an sfnt from owned tables
#[derive(Debug, Clone)]
pub struct SfntBuilder {
    flavor: u32,
    tables: BTreeMap<Tag, Vec<u8>>,
}

impl SfntBuilder {
    pub fn new(flavor: u32) -> Self {
        Self {
            flavor,
            tables: BTreeMap::new(),
        }
    }

    /// Start from every table of an existing font
    pub fn from_sfnt(sfnt: &Sfnt<'_>) -> Self {
        let mut builder = Self::new(sfnt.flavor());
        for (tag, data) in sfnt.tables() {
            builder.insert(tag, data.to_vec());
        }
        builder
    }

    /// Add or replace a table
    pub fn insert(&mut self, tag: Tag, data: Vec<u8>) {
        self.tables.insert(tag, data);
    }

    /// Remove a table
    pub fn remove(&mut self, tag: &Tag) -> Option<Vec<u8>> {
        self.tables.remove(tag)
    }

    pub fn get(&self, tag: &Tag) -> Option<&[u8]> {
        self.tables.get(tag).map(Vec::as_slice)
    }

    pub fn get_mut(&mut self, tag: &Tag) -> Option<&mut Vec<u8>> {
        self.tables.get_mut(tag)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Serialized size including directory and table padding
    pub fn total_size(&self) -> usize {
        let header = 12 + 16 * self.tables.len();
        header + self.tables.values().map(|t| (t.len() + 3) & !3).sum::<usize>()
    }

    /// Write the font. Tables are sorted by tag and 4-byte aligned.
    pub fn build(&self) -> Vec<u8> {
        let num_tables = self.tables.len() as u16;
        let (search_range, entry_selector, range_shift) = search_params(num_tables, 16);

        let mut out = Vec::with_capacity(self.total_size());
        out.write_u32(self.flavor);
        out.write_u16(num_tables);
        out.write_u16(search_range);
        out.write_u16(entry_selector);
        out.write_u16(range_shift);

        let mut offset = 12 + 16 * self.tables.len();
        let mut head_offset = None;
        for (tag, data) in &self.tables {
            if tag == b"head" && data.len() >= 12 {
                head_offset = Some(offset);
            }
            out.extend_from_slice(tag);
            out.write_u32(checksum(&table_for_checksum(tag, data)));
            out.write_u32(offset as u32);
            out.write_u32(data.len() as u32);
            offset += (data.len() + 3) & !3;
        }

        for data in self.tables.values() {
            out.extend_from_slice(data);
            out.pad4();
        }

        if let Some(head) = head_offset {
            out[head + 8..head + 12].fill(0);
            let adjustment = CHECKSUM_MAGIC.wrapping_sub(checksum(&out));
            out[head + 8..head + 12].copy_from_slice(&adjustment.to_be_bytes());
        }

        out
    }
}

/// `head` is checksummed with its adjustment field zeroed
fn table_for_checksum<'t>(tag: &Tag, data: &'t [u8]) -> std::borrow::Cow<'t, [u8]> {
    if tag == b"head" && data.len() >= 12 {
        let mut copy = data.to_vec();
        copy[8..12].fill(0);
        std::borrow::Cow::Owned(copy)
    } else {
        std::borrow::Cow::Borrowed(data)
    }
}

/// Table checksum: sum of big-endian u32 words, zero-padded
pub fn checksum(data: &[u8]) -> u32 {
    let mut chunks = data.chunks_exact(4);
    let mut sum = chunks
        .by_ref()
        .fold(0u32, |acc, c| acc.wrapping_add(u32::from_be_bytes([c[0], c[1], c[2], c[3]])));

    let rest = chunks.remainder();
    if !rest.is_empty() {
        let mut last = [0u8; 4];
        last[..rest.len()].copy_from_slice(rest);
        sum = sum.wrapping_add(u32::from_be_bytes(last));
    }
    sum
}

/// Binary-search header fields: (searchRange, entrySelector, rangeShift)
pub(crate) fn search_params(count: u16, unit: u16) -> (u16, u16, u16) {
    if count == 0 {
        return (0, 0, 0);
    }
    let entry_selector = 15 - count.leading_zeros() as u16;
    let search_range = (1u16 << entry_selector).wrapping_mul(unit);
    let range_shift = count.wrapping_mul(unit).wrapping_sub(search_range);
    (search_range, entry_selector, range_shift)
}

/// Printable form of a tag
pub fn tag_name(tag: &Tag) -> String {
    String::from_utf8_lossy(tag).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head_table() -> Vec<u8> {
        let mut head = vec![0u8; 54];
        head[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        head[8..12].copy_from_slice(&0xDEAD_BEEFu32.to_be_bytes());
        head[12..16].copy_from_slice(&0x5F0F_3CF5u32.to_be_bytes());
        head
    }

    #[test]
    fn test_checksum() {
        assert_eq!(checksum(&[0, 0, 0, 1, 0, 0, 0, 2]), 3);
        assert_eq!(checksum(&[0, 0, 0, 1, 0xFF]), 1 + 0xFF00_0000);
    }

    #[test]
    fn test_search_params() {
        assert_eq!(search_params(1, 16), (16, 0, 0));
        assert_eq!(search_params(9, 16), (128, 3, 16));
        assert_eq!(search_params(16, 16), (256, 4, 0));
    }

    #[test]
    fn test_build_sorted_and_parse_back() {
        let mut builder = SfntBuilder::new(FLAVOR_TRUETYPE);
        builder.insert(*b"maxp", vec![0, 0, 0x50, 0, 0, 3]);
        builder.insert(*b"head", head_table());
        builder.insert(*b"cmap", vec![1, 2, 3]);

        let font = builder.build();
        assert_eq!(font.len(), builder.total_size());

        let sfnt = Sfnt::parse(&font).unwrap();
        let tags: Vec<Tag> = sfnt.records().iter().map(|r| r.tag).collect();
        assert_eq!(tags, vec![*b"cmap", *b"head", *b"maxp"]);
        assert_eq!(sfnt.table(b"cmap").unwrap(), &[1, 2, 3]);
        assert_eq!(sfnt.table(b"maxp").unwrap(), &[0, 0, 0x50, 0, 0, 3]);
    }

    #[test]
    fn test_checksum_adjustment() {
        let mut builder = SfntBuilder::new(FLAVOR_TRUETYPE);
        builder.insert(*b"head", head_table());
        builder.insert(*b"name", vec![7; 10]);
        let font = builder.build();

        assert_eq!(checksum(&font), CHECKSUM_MAGIC);
        let sfnt = Sfnt::parse(&font).unwrap();
        let head = sfnt.records().iter().find(|r| &r.tag == b"head").unwrap();
        let mut zeroed = head_table();
        zeroed[8..12].fill(0);
        assert_eq!(head.checksum, checksum(&zeroed));
    }

    #[test]
    fn test_rejects_collection() {
        let data = b"ttcf\x00\x01\x00\x00";
        assert!(matches!(Sfnt::parse(data), Err(SfntError::Collection)));
    }

    #[test]
    fn test_rejects_out_of_bounds_table() {
        let mut font = SfntBuilder::new(FLAVOR_TRUETYPE);
        font.insert(*b"cmap", vec![0; 8]);
        let mut data = font.build();
        data.truncate(data.len() - 4);
        assert!(matches!(Sfnt::parse(&data), Err(SfntError::TableOutOfBounds(t)) if t == "cmap"));
    }
}
