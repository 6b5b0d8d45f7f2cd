//! TrueType glyph data helpers shared by the codec and the subsetter

use crate::reader::{FontReader, FontWrite, ReadError};

// Simple glyph flags
pub(crate) const ON_CURVE: u8 = 0x01;
pub(crate) const X_SHORT: u8 = 0x02;
pub(crate) const Y_SHORT: u8 = 0x04;
pub(crate) const REPEAT: u8 = 0x08;
pub(crate) const X_SAME_OR_POSITIVE: u8 = 0x10;
pub(crate) const Y_SAME_OR_POSITIVE: u8 = 0x20;
pub(crate) const OVERLAP_SIMPLE: u8 = 0x40;

// Composite glyph flags
pub(crate) const ARG_1_AND_2_ARE_WORDS: u16 = 0x0001;
pub(crate) const WE_HAVE_A_SCALE: u16 = 0x0008;
pub(crate) const MORE_COMPONENTS: u16 = 0x0020;
pub(crate) const WE_HAVE_AN_X_AND_Y_SCALE: u16 = 0x0040;
pub(crate) const WE_HAVE_A_TWO_BY_TWO: u16 = 0x0080;
pub(crate) const WE_HAVE_INSTRUCTIONS: u16 = 0x0100;

/// Glyph bounding box
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct BBox {
    pub x_min: i16,
    pub y_min: i16,
    pub x_max: i16,
    pub y_max: i16,
}

impl BBox {
    pub fn read(reader: &mut FontReader<'_>) -> Result<Self, ReadError> {
        Ok(Self {
            x_min: reader.read_i16()?,
            y_min: reader.read_i16()?,
            x_max: reader.read_i16()?,
            y_max: reader.read_i16()?,
        })
    }

    pub fn write(&self, out: &mut Vec<u8>) {
        out.write_i16(self.x_min);
        out.write_i16(self.y_min);
        out.write_i16(self.x_max);
        out.write_i16(self.y_max);
    }

    /// Tight box around absolute points; zero box for no points
    pub fn of_points(points: &[Point]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        let mut bbox = Self {
            x_min: first.x,
            y_min: first.y,
            x_max: first.x,
            y_max: first.y,
        };
        for p in &points[1..] {
            bbox.x_min = bbox.x_min.min(p.x);
            bbox.y_min = bbox.y_min.min(p.y);
            bbox.x_max = bbox.x_max.max(p.x);
            bbox.y_max = bbox.y_max.max(p.y);
        }
        bbox
    }
}

/// Outline point in absolute font units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Point {
    pub x: i16,
    pub y: i16,
    pub on_curve: bool,
}

/// Decoded simple glyph
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SimpleGlyph {
    pub bbox: BBox,
    pub end_points: Vec<u16>,
    pub instructions: Vec<u8>,
    pub points: Vec<Point>,
    pub overlap: bool,
}

/// Composite glyph with its component records kept verbatim
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CompositeGlyph {
    pub bbox: BBox,
    pub components: Vec<u8>,
    pub component_ids: Vec<u16>,
    pub instructions: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Glyph {
    Empty,
    Simple(SimpleGlyph),
    Composite(CompositeGlyph),
}

/// Why glyph data could not be read
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum GlyphError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error("unsupported contour count {0}")]
    ContourCount(i16),
    #[error("contour end points are not increasing")]
    EndPoints,
}

/// Size in bytes of one component record with the given flags
pub(crate) fn component_size(flags: u16) -> usize {
    let mut size = 4;
    size += if flags & ARG_1_AND_2_ARE_WORDS != 0 { 4 } else { 2 };
    if flags & WE_HAVE_A_SCALE != 0 {
        size += 2;
    } else if flags & WE_HAVE_AN_X_AND_Y_SCALE != 0 {
        size += 4;
    } else if flags & WE_HAVE_A_TWO_BY_TWO != 0 {
        size += 8;
    }
    size
}

/// Read component records until MORE_COMPONENTS is clear.
/// Returns (raw records, component glyph ids, WE_HAVE_INSTRUCTIONS seen).
pub(crate) fn read_components(
    reader: &mut FontReader<'_>,
) -> Result<(Vec<u8>, Vec<u16>, bool), ReadError> {
    let mut raw = Vec::new();
    let mut ids = Vec::new();
    let mut have_instructions = false;
    loop {
        let flags = reader.read_u16()?;
        let glyph_id = reader.read_u16()?;
        let rest = reader.read_bytes(component_size(flags) - 4)?;
        raw.write_u16(flags);
        raw.write_u16(glyph_id);
        raw.extend_from_slice(rest);
        ids.push(glyph_id);
        have_instructions |= flags & WE_HAVE_INSTRUCTIONS != 0;
        if flags & MORE_COMPONENTS == 0 {
            return Ok((raw, ids, have_instructions));
        }
    }
}

/// Component glyph ids of a raw glyph (empty for simple or empty glyphs)
pub(crate) fn component_ids(data: &[u8]) -> Result<Vec<u16>, GlyphError> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let mut reader = FontReader::new(data);
    let contours = reader.read_i16()?;
    if contours >= 0 {
        return Ok(Vec::new());
    }
    reader.skip(8)?;
    let (_, ids, _) = read_components(&mut reader)?;
    Ok(ids)
}

/// Horizontal minimum of a raw glyph's bounding box; 0 for glyphs without
/// contours
pub(crate) fn x_min(data: &[u8]) -> i16 {
    match data.get(..4) {
        Some(b) if b[0..2] != [0, 0] => i16::from_be_bytes([b[2], b[3]]),
        _ => 0,
    }
}

/// Parse one raw glyph record
pub(crate) fn parse_glyph(data: &[u8]) -> Result<Glyph, GlyphError> {
    if data.is_empty() {
        return Ok(Glyph::Empty);
    }
    let mut reader = FontReader::new(data);
    let contours = reader.read_i16()?;
    let bbox = BBox::read(&mut reader)?;

    if contours == -1 {
        let (components, component_ids, have_instructions) = read_components(&mut reader)?;
        let instructions = if have_instructions {
            let len = reader.read_u16()? as usize;
            Some(reader.read_bytes(len)?.to_vec())
        } else {
            None
        };
        return Ok(Glyph::Composite(CompositeGlyph {
            bbox,
            components,
            component_ids,
            instructions,
        }));
    }
    if contours < 0 {
        return Err(GlyphError::ContourCount(contours));
    }

    let mut end_points = Vec::with_capacity(contours as usize);
    for _ in 0..contours {
        let end = reader.read_u16()?;
        if end_points.last().is_some_and(|&prev| end <= prev) {
            return Err(GlyphError::EndPoints);
        }
        end_points.push(end);
    }
    let num_points = end_points.last().map_or(0, |&e| e as usize + 1);

    let instruction_len = reader.read_u16()? as usize;
    let instructions = reader.read_bytes(instruction_len)?.to_vec();

    let mut flags = Vec::with_capacity(num_points);
    while flags.len() < num_points {
        let flag = reader.read_u8()?;
        flags.push(flag);
        if flag & REPEAT != 0 {
            let count = reader.read_u8()?;
            for _ in 0..count {
                flags.push(flag);
            }
        }
    }
    flags.truncate(num_points);

    let xs = read_coordinates(&mut reader, &flags, X_SHORT, X_SAME_OR_POSITIVE)?;
    let ys = read_coordinates(&mut reader, &flags, Y_SHORT, Y_SAME_OR_POSITIVE)?;

    let points = flags
        .iter()
        .zip(xs.into_iter().zip(ys))
        .map(|(&flag, (x, y))| Point {
            x,
            y,
            on_curve: flag & ON_CURVE != 0,
        })
        .collect();

    Ok(Glyph::Simple(SimpleGlyph {
        bbox,
        end_points,
        instructions,
        points,
        overlap: flags.first().is_some_and(|f| f & OVERLAP_SIMPLE != 0),
    }))
}

fn read_coordinates(
    reader: &mut FontReader<'_>,
    flags: &[u8],
    short: u8,
    same_or_positive: u8,
) -> Result<Vec<i16>, ReadError> {
    let mut value = 0i16;
    let mut out = Vec::with_capacity(flags.len());
    for &flag in flags {
        let delta = if flag & short != 0 {
            let v = reader.read_u8()? as i16;
            if flag & same_or_positive != 0 { v } else { -v }
        } else if flag & same_or_positive != 0 {
            0
        } else {
            reader.read_i16()?
        };
        value = value.wrapping_add(delta);
        out.push(value);
    }
    Ok(out)
}

/// Write a simple glyph without flag repetition
pub(crate) fn write_simple(glyph: &SimpleGlyph, out: &mut Vec<u8>) {
    out.write_i16(glyph.end_points.len() as i16);
    glyph.bbox.write(out);
    for &end in &glyph.end_points {
        out.write_u16(end);
    }
    out.write_u16(glyph.instructions.len() as u16);
    out.extend_from_slice(&glyph.instructions);

    let mut xs = Vec::new();
    let mut ys = Vec::new();
    let mut prev = (0i16, 0i16);
    for (i, p) in glyph.points.iter().enumerate() {
        let mut flag = if p.on_curve { ON_CURVE } else { 0 };
        if i == 0 && glyph.overlap {
            flag |= OVERLAP_SIMPLE;
        }
        flag |= encode_delta(p.x.wrapping_sub(prev.0), X_SHORT, X_SAME_OR_POSITIVE, &mut xs);
        flag |= encode_delta(p.y.wrapping_sub(prev.1), Y_SHORT, Y_SAME_OR_POSITIVE, &mut ys);
        out.push(flag);
        prev = (p.x, p.y);
    }
    out.extend_from_slice(&xs);
    out.extend_from_slice(&ys);
}

fn encode_delta(delta: i16, short: u8, same_or_positive: u8, out: &mut Vec<u8>) -> u8 {
    if delta == 0 {
        same_or_positive
    } else if delta.unsigned_abs() < 256 {
        out.push(delta.unsigned_abs() as u8);
        if delta > 0 { short | same_or_positive } else { short }
    } else {
        out.write_i16(delta);
        0
    }
}

/// Write a composite glyph
pub(crate) fn write_composite(glyph: &CompositeGlyph, out: &mut Vec<u8>) {
    out.write_i16(-1);
    glyph.bbox.write(out);
    out.extend_from_slice(&glyph.components);
    if let Some(instructions) = &glyph.instructions {
        out.write_u16(instructions.len() as u16);
        out.extend_from_slice(instructions);
    }
}

/// Glyph offsets from a loca table (`num_glyphs + 1` entries)
pub(crate) fn read_loca(loca: &[u8], num_glyphs: u16, long: bool) -> Result<Vec<u32>, ReadError> {
    let mut reader = FontReader::new(loca);
    let mut offsets = Vec::with_capacity(num_glyphs as usize + 1);
    for _ in 0..=num_glyphs {
        let offset = if long {
            reader.read_u32()?
        } else {
            reader.read_u16()? as u32 * 2
        };
        offsets.push(offset);
    }
    Ok(offsets)
}

/// Serialize loca offsets; `None` if short format cannot hold them
pub(crate) fn write_loca(offsets: &[u32], long: bool) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(offsets.len() * if long { 4 } else { 2 });
    for &offset in offsets {
        if long {
            out.write_u32(offset);
        } else {
            if offset % 2 != 0 || offset / 2 > u16::MAX as u32 {
                return None;
            }
            out.write_u16((offset / 2) as u16);
        }
    }
    Some(out)
}

/// Raw bytes of one glyph
pub(crate) fn glyph_data<'a>(glyf: &'a [u8], offsets: &[u32], gid: u16) -> Option<&'a [u8]> {
    let start = *offsets.get(gid as usize)? as usize;
    let end = *offsets.get(gid as usize + 1)? as usize;
    if start > end {
        return None;
    }
    glyf.get(start..end)
}

/// `numGlyphs` from maxp
pub(crate) fn num_glyphs(maxp: &[u8]) -> Option<u16> {
    maxp.get(4..6).map(|b| u16::from_be_bytes([b[0], b[1]]))
}

/// `indexToLocFormat` from head (true = long offsets)
pub(crate) fn long_loca(head: &[u8]) -> Option<bool> {
    head.get(50..52).map(|b| i16::from_be_bytes([b[0], b[1]]) != 0)
}

/// `numberOfHMetrics` from hhea
pub(crate) fn num_h_metrics(hhea: &[u8]) -> Option<u16> {
    hhea.get(34..36).map(|b| u16::from_be_bytes([b[0], b[1]]))
}
