//! cmap table writer (formats 4 and 12)

use std::collections::BTreeMap;

use crate::reader::FontWrite;
use crate::sfnt::search_params;

/// Run of consecutive codepoints mapped to consecutive glyphs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Run {
    start: u32,
    end: u32,
    glyph: u16,
}

fn runs(mapping: &BTreeMap<char, u16>, bmp_only: bool) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();
    for (&c, &gid) in mapping {
        let cp = c as u32;
        if bmp_only && cp > 0xFFFF {
            break;
        }
        if let Some(last) = runs.last_mut() {
            let step = cp - last.start;
            if cp == last.end + 1 && last.glyph as u32 + step == gid as u32 {
                last.end = cp;
                continue;
            }
        }
        runs.push(Run {
            start: cp,
            end: cp,
            glyph: gid,
        });
    }
    runs
}

/// Format 4 subtable for the BMP part of the mapping; `None` when it would
/// not fit the 16-bit length field
fn format4(mapping: &BTreeMap<char, u16>) -> Option<Vec<u8>> {
    let mut segments = runs(mapping, true);
    // U+FFFF itself would collide with the terminator segment
    segments.retain(|r| r.end < 0xFFFF);
    segments.push(Run {
        start: 0xFFFF,
        end: 0xFFFF,
        glyph: 0,
    });

    let seg_count = u16::try_from(segments.len()).ok()?;
    let length = 16 + 8 * segments.len();
    let length = u16::try_from(length).ok()?;
    let (search_range, entry_selector, range_shift) = search_params(seg_count, 2);

    let mut out = Vec::with_capacity(length as usize);
    out.write_u16(4);
    out.write_u16(length);
    out.write_u16(0);
    out.write_u16(seg_count * 2);
    out.write_u16(search_range);
    out.write_u16(entry_selector);
    out.write_u16(range_shift);
    for r in &segments {
        out.write_u16(r.end as u16);
    }
    out.write_u16(0);
    for r in &segments {
        out.write_u16(r.start as u16);
    }
    for r in &segments {
        let delta = if r.start == 0xFFFF {
            1
        } else {
            r.glyph.wrapping_sub(r.start as u16)
        };
        out.write_u16(delta);
    }
    for _ in &segments {
        out.write_u16(0);
    }
    Some(out)
}

fn format12(mapping: &BTreeMap<char, u16>) -> Vec<u8> {
    let groups = runs(mapping, false);
    let mut out = Vec::with_capacity(16 + 12 * groups.len());
    out.write_u16(12);
    out.write_u16(0);
    out.write_u32((16 + 12 * groups.len()) as u32);
    out.write_u32(0);
    out.write_u32(groups.len() as u32);
    for g in &groups {
        out.write_u32(g.start);
        out.write_u32(g.end);
        out.write_u32(g.glyph as u32);
    }
    out
}

/// Build a Windows Unicode cmap: (3,1) format 4, plus (3,10) format 12 when
/// the mapping leaves the BMP or the BMP part overflows format 4
pub(crate) fn build_cmap(mapping: &BTreeMap<char, u16>) -> Vec<u8> {
    let needs_full = mapping.keys().next_back().is_some_and(|&c| c as u32 > 0xFFFF);
    let bmp = format4(mapping);

    let mut subtables: Vec<(u16, Vec<u8>)> = Vec::new();
    if let Some(bmp) = bmp.as_ref() {
        subtables.push((1, bmp.clone()));
    }
    if needs_full || bmp.is_none() {
        subtables.push((10, format12(mapping)));
    }

    let mut out = Vec::new();
    out.write_u16(0);
    out.write_u16(subtables.len() as u16);
    let mut offset = 4 + 8 * subtables.len() as u32;
    for (encoding, data) in &subtables {
        out.write_u16(3);
        out.write_u16(*encoding);
        out.write_u32(offset);
        offset += data.len() as u32;
    }
    for (_, data) in subtables {
        out.extend_from_slice(&data);
    }
    out
}
