//! WOFF2 Table Transformations
//!
//! - glyf/loca: split into streams, point deltas as triplets
//! - hmtx: left side bearings dropped where they equal the glyph xMin

use crate::glyf::{self, BBox, CompositeGlyph, Glyph, GlyphError, Point, SimpleGlyph};
use crate::reader::{FontReader, FontWrite, ReadError};

/// WOFF2 transform error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum TransformError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error("glyph {0}: {1}")]
    Glyph(u16, GlyphError),
    #[error("composite glyph {0} has no explicit bounding box")]
    CompositeBBox(u16),
    #[error("glyph data does not fit the loca format")]
    LocaOverflow,
    #[error("hmtx transform flags 0x{0:02X} are invalid")]
    HmtxFlags(u8),
}

pub(crate) type TransformResult<T> = Result<T, TransformError>;

const HEADER_SIZE: usize = 36;
const OVERLAP_BITMAP_PRESENT: u16 = 0x0001;

// ============================================================================
// Triplet Encoding
// ============================================================================

fn with_sign(flag: u8, value: i32) -> i32 {
    if flag & 1 != 0 { value } else { -value }
}

/// Number of data bytes following a triplet flag
fn triplet_data_len(flag: u8) -> usize {
    match flag & 0x7F {
        0..=83 => 1,
        84..=119 => 2,
        120..=123 => 3,
        _ => 4,
    }
}

/// Decode one (flag, data) triplet into (dx, dy, on_curve)
fn decode_triplet(flag: u8, data: &[u8]) -> (i32, i32, bool) {
    let on_curve = flag & 0x80 == 0;
    let f = flag & 0x7F;
    let b = |i: usize| data[i] as i32;

    let (dx, dy) = match f {
        0..=9 => (0, with_sign(f, (((f as i32) & 14) << 7) + b(0))),
        10..=19 => (with_sign(f, ((((f - 10) as i32) & 14) << 7) + b(0)), 0),
        20..=83 => {
            let b0 = (f - 20) as i32;
            let b1 = b(0);
            (
                with_sign(f, 1 + (b0 & 0x30) + (b1 >> 4)),
                with_sign(f >> 1, 1 + ((b0 & 0x0C) << 2) + (b1 & 0x0F)),
            )
        }
        84..=119 => {
            let b0 = (f - 84) as i32;
            (
                with_sign(f, 1 + ((b0 / 12) << 8) + b(0)),
                with_sign(f >> 1, 1 + (((b0 % 12) >> 2) << 8) + b(1)),
            )
        }
        120..=123 => (
            with_sign(f, (b(0) << 4) + (b(1) >> 4)),
            with_sign(f >> 1, ((b(1) & 0x0F) << 8) + b(2)),
        ),
        _ => (
            with_sign(f, (b(0) << 8) + b(1)),
            with_sign(f >> 1, (b(2) << 8) + b(3)),
        ),
    };
    (dx, dy, on_curve)
}

/// Encode a point delta; flag goes to the flag stream, data to the glyph stream
fn encode_triplet(dx: i32, dy: i32, on_curve: bool, flags: &mut Vec<u8>, data: &mut Vec<u8>) {
    let on_curve_bit: u8 = if on_curve { 0 } else { 128 };
    let x = dx.unsigned_abs();
    let y = dy.unsigned_abs();
    let x_sign: u8 = if dx < 0 { 0 } else { 1 };
    let y_sign: u8 = if dy < 0 { 0 } else { 1 };
    let xy_sign = x_sign + 2 * y_sign;

    if x == 0 && y < 1280 {
        flags.push(on_curve_bit + ((y & 0xF00) >> 7) as u8 + y_sign);
        data.push((y & 0xFF) as u8);
    } else if y == 0 && x < 1280 {
        flags.push(on_curve_bit + 10 + ((x & 0xF00) >> 7) as u8 + x_sign);
        data.push((x & 0xFF) as u8);
    } else if x < 65 && y < 65 {
        let (xm, ym) = (x - 1, y - 1);
        flags.push(on_curve_bit + 20 + (xm & 0x30) as u8 + ((ym & 0x30) >> 2) as u8 + xy_sign);
        data.push((((xm & 0x0F) << 4) | (ym & 0x0F)) as u8);
    } else if x < 769 && y < 769 {
        let (xm, ym) = (x - 1, y - 1);
        flags.push(
            on_curve_bit + 84 + 12 * ((xm & 0x300) >> 8) as u8 + ((ym & 0x300) >> 6) as u8 + xy_sign,
        );
        data.push((xm & 0xFF) as u8);
        data.push((ym & 0xFF) as u8);
    } else if x < 4096 && y < 4096 {
        flags.push(on_curve_bit + 120 + xy_sign);
        data.push((x >> 4) as u8);
        data.push((((x & 0x0F) << 4) | (y >> 8)) as u8);
        data.push((y & 0xFF) as u8);
    } else {
        flags.push(on_curve_bit + 124 + xy_sign);
        data.push((x >> 8) as u8);
        data.push((x & 0xFF) as u8);
        data.push((y >> 8) as u8);
        data.push((y & 0xFF) as u8);
    }
}

// ============================================================================
// Glyf Table Transform
// ============================================================================

fn bitmap_len(num_glyphs: u16, bits_per_word: usize) -> usize {
    if bits_per_word == 32 {
        ((num_glyphs as usize + 31) >> 5) << 2
    } else {
        (num_glyphs as usize + 7) >> 3
    }
}

fn set_bit(bitmap: &mut [u8], index: usize) {
    bitmap[index >> 3] |= 0x80 >> (index & 7);
}

fn bit(bitmap: &[u8], index: usize) -> bool {
    bitmap.get(index >> 3).is_some_and(|b| b & (0x80 >> (index & 7)) != 0)
}

/// Streams of a transformed glyf table
#[derive(Default)]
struct GlyfStreams {
    n_contour: Vec<u8>,
    n_points: Vec<u8>,
    flags: Vec<u8>,
    glyphs: Vec<u8>,
    composites: Vec<u8>,
    bbox_bitmap: Vec<u8>,
    bboxes: Vec<u8>,
    instructions: Vec<u8>,
    overlap_bitmap: Vec<u8>,
}

/// Apply the glyf transform. `loca` is consumed through `offsets`.
pub(crate) fn transform_glyf(
    glyf: &[u8],
    offsets: &[u32],
    num_glyphs: u16,
    long_loca: bool,
) -> TransformResult<Vec<u8>> {
    let mut s = GlyfStreams {
        bbox_bitmap: vec![0; bitmap_len(num_glyphs, 32)],
        overlap_bitmap: vec![0; bitmap_len(num_glyphs, 8)],
        ..Default::default()
    };
    let mut has_overlap = false;

    for gid in 0..num_glyphs {
        let data = glyf::glyph_data(glyf, offsets, gid).ok_or(ReadError(glyf.len()))?;
        let glyph = glyf::parse_glyph(data).map_err(|e| TransformError::Glyph(gid, e))?;
        match glyph {
            Glyph::Empty => s.n_contour.write_i16(0),
            Glyph::Simple(simple) if simple.end_points.is_empty() => s.n_contour.write_i16(0),
            Glyph::Simple(simple) => {
                if simple.overlap {
                    set_bit(&mut s.overlap_bitmap, gid as usize);
                    has_overlap = true;
                }
                write_simple_streams(gid, &simple, &mut s);
            }
            Glyph::Composite(composite) => {
                s.n_contour.write_i16(-1);
                s.composites.extend_from_slice(&composite.components);
                if let Some(instructions) = &composite.instructions {
                    s.glyphs.write_255_u16(instructions.len() as u16);
                    s.instructions.extend_from_slice(instructions);
                }
                set_bit(&mut s.bbox_bitmap, gid as usize);
                composite.bbox.write(&mut s.bboxes);
            }
        }
    }

    let bbox_len = s.bbox_bitmap.len() + s.bboxes.len();
    let mut out = Vec::with_capacity(
        HEADER_SIZE
            + s.n_contour.len()
            + s.n_points.len()
            + s.flags.len()
            + s.glyphs.len()
            + s.composites.len()
            + bbox_len
            + s.instructions.len(),
    );
    out.write_u16(0);
    out.write_u16(if has_overlap { OVERLAP_BITMAP_PRESENT } else { 0 });
    out.write_u16(num_glyphs);
    out.write_u16(long_loca as u16);
    for len in [
        s.n_contour.len(),
        s.n_points.len(),
        s.flags.len(),
        s.glyphs.len(),
        s.composites.len(),
        bbox_len,
        s.instructions.len(),
    ] {
        out.write_u32(len as u32);
    }
    out.extend_from_slice(&s.n_contour);
    out.extend_from_slice(&s.n_points);
    out.extend_from_slice(&s.flags);
    out.extend_from_slice(&s.glyphs);
    out.extend_from_slice(&s.composites);
    out.extend_from_slice(&s.bbox_bitmap);
    out.extend_from_slice(&s.bboxes);
    out.extend_from_slice(&s.instructions);
    if has_overlap {
        out.extend_from_slice(&s.overlap_bitmap);
    }
    Ok(out)
}

fn write_simple_streams(gid: u16, glyph: &SimpleGlyph, s: &mut GlyfStreams) {
    s.n_contour.write_i16(glyph.end_points.len() as i16);

    let mut start = 0u32;
    for &end in &glyph.end_points {
        let end = end as u32;
        s.n_points.write_255_u16((end + 1 - start) as u16);
        start = end + 1;
    }

    let (mut x, mut y) = (0i32, 0i32);
    for p in &glyph.points {
        let (px, py) = (p.x as i32, p.y as i32);
        encode_triplet(px - x, py - y, p.on_curve, &mut s.flags, &mut s.glyphs);
        x = px;
        y = py;
    }

    s.glyphs.write_255_u16(glyph.instructions.len() as u16);
    s.instructions.extend_from_slice(&glyph.instructions);

    if BBox::of_points(&glyph.points) != glyph.bbox {
        set_bit(&mut s.bbox_bitmap, gid as usize);
        glyph.bbox.write(&mut s.bboxes);
    }
}

/// Reconstructed glyf table
pub(crate) struct Reconstructed {
    pub glyf: Vec<u8>,
    pub loca: Vec<u8>,
    pub offsets: Vec<u32>,
}

/// Reverse the glyf transform, producing glyf and loca
pub(crate) fn reconstruct_glyf(data: &[u8]) -> TransformResult<Reconstructed> {
    let mut header = FontReader::new(data);
    header.skip(2)?;
    let option_flags = header.read_u16()?;
    let num_glyphs = header.read_u16()?;
    let long_loca = header.read_u16()? != 0;

    let mut sizes = [0usize; 7];
    for size in &mut sizes {
        *size = header.read_u32()? as usize;
    }
    let mut body = FontReader::new(data);
    body.skip(HEADER_SIZE)?;
    let mut n_contour = FontReader::new(body.read_bytes(sizes[0])?);
    let mut n_points = FontReader::new(body.read_bytes(sizes[1])?);
    let mut flags = FontReader::new(body.read_bytes(sizes[2])?);
    let mut glyphs = FontReader::new(body.read_bytes(sizes[3])?);
    let mut composites = FontReader::new(body.read_bytes(sizes[4])?);
    let bbox_stream = body.read_bytes(sizes[5])?;
    let mut instructions = FontReader::new(body.read_bytes(sizes[6])?);
    let overlap_bitmap = if option_flags & OVERLAP_BITMAP_PRESENT != 0 {
        body.read_bytes(bitmap_len(num_glyphs, 8))?
    } else {
        &[]
    };

    let bbox_bitmap_len = bitmap_len(num_glyphs, 32);
    let bbox_bitmap = bbox_stream.get(..bbox_bitmap_len).ok_or(ReadError(bbox_stream.len()))?;
    let mut bboxes = FontReader::new(&bbox_stream[bbox_bitmap_len..]);

    let mut glyf = Vec::new();
    let mut offsets = Vec::with_capacity(num_glyphs as usize + 1);
    for gid in 0..num_glyphs {
        offsets.push(glyf.len() as u32);
        let explicit_bbox = bit(bbox_bitmap, gid as usize);
        let contours = n_contour.read_i16()?;

        match contours {
            0 => continue,
            -1 => {
                if !explicit_bbox {
                    return Err(TransformError::CompositeBBox(gid));
                }
                let bbox = BBox::read(&mut bboxes)?;
                let (components, component_ids, have_instructions) =
                    glyf::read_components(&mut composites)?;
                let instructions = if have_instructions {
                    let len = glyphs.read_255_u16()? as usize;
                    Some(instructions.read_bytes(len)?.to_vec())
                } else {
                    None
                };
                glyf::write_composite(
                    &CompositeGlyph {
                        bbox,
                        components,
                        component_ids,
                        instructions,
                    },
                    &mut glyf,
                );
            }
            n if n > 0 => {
                let mut end_points = Vec::with_capacity(n as usize);
                let mut total = 0u32;
                for _ in 0..n {
                    total += n_points.read_255_u16()? as u32;
                    let end = total
                        .checked_sub(1)
                        .and_then(|e| u16::try_from(e).ok())
                        .ok_or(TransformError::Glyph(gid, GlyphError::EndPoints))?;
                    end_points.push(end);
                }

                let mut points = Vec::with_capacity(total as usize);
                let (mut x, mut y) = (0i32, 0i32);
                for _ in 0..total {
                    let flag = flags.read_u8()?;
                    let triplet = glyphs.read_bytes(triplet_data_len(flag))?;
                    let (dx, dy, on_curve) = decode_triplet(flag, triplet);
                    x += dx;
                    y += dy;
                    points.push(Point {
                        x: x as i16,
                        y: y as i16,
                        on_curve,
                    });
                }

                let instruction_len = glyphs.read_255_u16()? as usize;
                let glyph_instructions = instructions.read_bytes(instruction_len)?.to_vec();
                let bbox = if explicit_bbox {
                    BBox::read(&mut bboxes)?
                } else {
                    BBox::of_points(&points)
                };

                glyf::write_simple(
                    &SimpleGlyph {
                        bbox,
                        end_points,
                        instructions: glyph_instructions,
                        points,
                        overlap: bit(overlap_bitmap, gid as usize),
                    },
                    &mut glyf,
                );
            }
            n => return Err(TransformError::Glyph(gid, GlyphError::ContourCount(n))),
        }
        glyf.pad4();
    }
    offsets.push(glyf.len() as u32);

    let loca = glyf::write_loca(&offsets, long_loca).ok_or(TransformError::LocaOverflow)?;
    Ok(Reconstructed {
        glyf,
        loca,
        offsets,
    })
}

// ============================================================================
// Hmtx Table Transform
// ============================================================================

const HMTX_NO_PROPORTIONAL_LSB: u8 = 0x01;
const HMTX_NO_MONOSPACE_LSB: u8 = 0x02;

/// xMin of every glyph
pub(crate) fn glyph_x_mins(glyf: &[u8], offsets: &[u32], num_glyphs: u16) -> Vec<i16> {
    (0..num_glyphs)
        .map(|gid| glyf::glyph_data(glyf, offsets, gid).map_or(0, glyf::x_min))
        .collect()
}

/// Apply the hmtx transform; `None` when no side bearing array can be dropped
pub(crate) fn transform_hmtx(
    hmtx: &[u8],
    x_mins: &[i16],
    num_h_metrics: u16,
) -> TransformResult<Option<Vec<u8>>> {
    let num_glyphs = x_mins.len();
    let num_h_metrics = (num_h_metrics as usize).min(num_glyphs);
    let mut reader = FontReader::new(hmtx);

    let mut advances = Vec::with_capacity(num_h_metrics);
    let mut lsbs = Vec::with_capacity(num_glyphs);
    for _ in 0..num_h_metrics {
        advances.push(reader.read_u16()?);
        lsbs.push(reader.read_i16()?);
    }
    for _ in num_h_metrics..num_glyphs {
        lsbs.push(reader.read_i16()?);
    }
    if reader.remaining() != 0 {
        return Ok(None);
    }

    let proportional_omitted =
        num_h_metrics > 0 && lsbs[..num_h_metrics] == x_mins[..num_h_metrics];
    let monospace_omitted =
        num_glyphs > num_h_metrics && lsbs[num_h_metrics..] == x_mins[num_h_metrics..];
    if !proportional_omitted && !monospace_omitted {
        return Ok(None);
    }

    let mut flags = 0u8;
    if proportional_omitted {
        flags |= HMTX_NO_PROPORTIONAL_LSB;
    }
    if monospace_omitted {
        flags |= HMTX_NO_MONOSPACE_LSB;
    }

    let mut out = Vec::with_capacity(hmtx.len());
    out.write_u8(flags);
    for &advance in &advances {
        out.write_u16(advance);
    }
    if !proportional_omitted {
        for &lsb in &lsbs[..num_h_metrics] {
            out.write_i16(lsb);
        }
    }
    if !monospace_omitted {
        for &lsb in &lsbs[num_h_metrics..] {
            out.write_i16(lsb);
        }
    }
    Ok(Some(out))
}

/// Reverse the hmtx transform
pub(crate) fn reconstruct_hmtx(
    data: &[u8],
    x_mins: &[i16],
    num_h_metrics: u16,
) -> TransformResult<Vec<u8>> {
    let num_glyphs = x_mins.len();
    let num_h_metrics = (num_h_metrics as usize).min(num_glyphs);
    let mut reader = FontReader::new(data);

    let flags = reader.read_u8()?;
    if flags & !(HMTX_NO_PROPORTIONAL_LSB | HMTX_NO_MONOSPACE_LSB) != 0
        || flags & (HMTX_NO_PROPORTIONAL_LSB | HMTX_NO_MONOSPACE_LSB) == 0
    {
        return Err(TransformError::HmtxFlags(flags));
    }

    let mut advances = Vec::with_capacity(num_h_metrics);
    for _ in 0..num_h_metrics {
        advances.push(reader.read_u16()?);
    }

    let mut lsbs = Vec::with_capacity(num_glyphs);
    for gid in 0..num_h_metrics {
        lsbs.push(if flags & HMTX_NO_PROPORTIONAL_LSB != 0 {
            x_mins[gid]
        } else {
            reader.read_i16()?
        });
    }
    for gid in num_h_metrics..num_glyphs {
        lsbs.push(if flags & HMTX_NO_MONOSPACE_LSB != 0 {
            x_mins[gid]
        } else {
            reader.read_i16()?
        });
    }

    let mut out = Vec::with_capacity(num_h_metrics * 4 + (num_glyphs - num_h_metrics) * 2);
    for (gid, &lsb) in lsbs.iter().enumerate() {
        if let Some(&advance) = advances.get(gid) {
            out.write_u16(advance);
        }
        out.write_i16(lsb);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triplet_data_lengths() {
        assert_eq!(triplet_data_len(0), 1);
        assert_eq!(triplet_data_len(83), 1);
        assert_eq!(triplet_data_len(84), 2);
        assert_eq!(triplet_data_len(120), 3);
        assert_eq!(triplet_data_len(124 | 0x80), 4);
    }

    #[test]
    fn test_triplet_roundtrip_across_classes() {
        let deltas = [
            (0, 5),
            (0, -1279),
            (300, 0),
            (-1, 0),
            (1, 1),
            (-64, 64),
            (65, -3),
            (-768, 700),
            (769, 1),
            (-4095, 4095),
            (4096, 0),
            (-20000, 32767),
            (0, 1280),
        ];
        for (dx, dy) in deltas {
            for on_curve in [true, false] {
                let mut flags = Vec::new();
                let mut data = Vec::new();
                encode_triplet(dx, dy, on_curve, &mut flags, &mut data);
                assert_eq!(flags.len(), 1);
                assert_eq!(data.len(), triplet_data_len(flags[0]), "({dx}, {dy})");
                assert_eq!(decode_triplet(flags[0], &data), (dx, dy, on_curve));
            }
        }
    }

    #[test]
    fn test_known_triplet() {
        // flag 20 (dx, dy both negative) with data 0x00 is (-1, -1)
        assert_eq!(decode_triplet(20, &[0x00]), (-1, -1, true));
        // flag 11 is +x only
        assert_eq!(decode_triplet(11, &[0x2A]), (42, 0, true));
    }

    #[test]
    fn test_bitmaps() {
        assert_eq!(bitmap_len(1, 32), 4);
        assert_eq!(bitmap_len(33, 32), 8);
        assert_eq!(bitmap_len(9, 8), 2);

        let mut bitmap = vec![0u8; 2];
        set_bit(&mut bitmap, 0);
        set_bit(&mut bitmap, 9);
        assert_eq!(bitmap, [0x80, 0x40]);
        assert!(bit(&bitmap, 9));
        assert!(!bit(&bitmap, 8));
    }

    #[test]
    fn test_hmtx_transform_roundtrip() {
        // three long metrics, one trailing lsb
        let x_mins = [0i16, 12, -5, 40];
        let mut hmtx = Vec::new();
        for (advance, lsb) in [(500u16, 0i16), (600, 12), (550, -5)] {
            hmtx.write_u16(advance);
            hmtx.write_i16(lsb);
        }
        hmtx.write_i16(7);

        let transformed = transform_hmtx(&hmtx, &x_mins, 3).unwrap().unwrap();
        assert_eq!(transformed[0], HMTX_NO_PROPORTIONAL_LSB);
        assert_eq!(transformed.len(), 1 + 6 + 2);
        assert_eq!(reconstruct_hmtx(&transformed, &x_mins, 3).unwrap(), hmtx);
    }

    #[test]
    fn test_hmtx_untransformable() {
        let x_mins = [3i16];
        let mut hmtx = Vec::new();
        hmtx.write_u16(500);
        hmtx.write_i16(9);
        assert_eq!(transform_hmtx(&hmtx, &x_mins, 1).unwrap(), None);
    }

    #[test]
    fn test_hmtx_rejects_bad_flags() {
        assert_eq!(
            reconstruct_hmtx(&[0x00], &[0], 1),
            Err(TransformError::HmtxFlags(0))
        );
    }
}
