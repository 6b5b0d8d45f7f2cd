//! Synthetic TrueType fonts for tests
//!
//! Builds small but complete glyf-flavoured fonts: every glyph outline is
//! derived from its character so different glyphs have different data, and
//! the encoding deliberately differs from the codec's own writer (repeated
//! flags, word coordinates, two-byte glyph padding).

use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::cmap::build_cmap;
use crate::glyf::{
    ARG_1_AND_2_ARE_WORDS, MORE_COMPONENTS, ON_CURVE, REPEAT, WE_HAVE_INSTRUCTIONS,
    X_SAME_OR_POSITIVE, Y_SAME_OR_POSITIVE,
};
use crate::reader::FontWrite;
use crate::sfnt::{SfntBuilder, Tag, FLAVOR_TRUETYPE};

const ARGS_ARE_XY_VALUES: u16 = 0x0002;
const ADVANCE_BASE: u16 = 500;

/// Point as (x, y, on_curve)
pub type FixturePoint = (i16, i16, bool);

/// One glyph of a fixture font
#[derive(Debug, Clone)]
pub enum FixtureGlyph {
    Empty,
    Outline {
        contours: Vec<Vec<FixturePoint>>,
        instructions: Vec<u8>,
        /// Header box; computed from the points when `None`
        bbox: Option<[i16; 4]>,
    },
    /// Components as (glyph id, dx, dy)
    Composite {
        components: Vec<(u16, i16, i16)>,
        instructions: Vec<u8>,
    },
}

impl FixtureGlyph {
    /// Two-contour outline derived from a character
    pub fn for_char(c: char) -> Self {
        let k = c as u32;
        let left = (k % 50) as i16 + 10;
        let top = 700 + (k % 13) as i16;
        let far = 1200 + (k % 300) as i16;
        let instructions = if k % 2 == 0 {
            vec![0xB0, (k & 0xFF) as u8, 0x2F]
        } else {
            Vec::new()
        };
        FixtureGlyph::Outline {
            contours: vec![
                vec![
                    (left, 0, true),
                    (left + 500, 0, true),
                    (left + 500, top, true),
                    (left + 250, top + 40, false),
                    (left, top, true),
                ],
                vec![(-1500, far, true), (2000, -300, false), (30, 40, true)],
            ],
            instructions,
            bbox: None,
        }
    }

    fn bbox(&self, glyphs: &[FixtureGlyph]) -> Option<[i16; 4]> {
        match self {
            FixtureGlyph::Empty => None,
            FixtureGlyph::Outline { contours, bbox, .. } => {
                if let Some(bbox) = bbox {
                    return Some(*bbox);
                }
                let mut points = contours.iter().flatten();
                let &(x, y, _) = points.next()?;
                Some(points.fold([x, y, x, y], |b, &(x, y, _)| {
                    [b[0].min(x), b[1].min(y), b[2].max(x), b[3].max(y)]
                }))
            }
            FixtureGlyph::Composite { components, .. } => components
                .iter()
                .filter_map(|&(gid, dx, dy)| {
                    let b = glyphs.get(gid as usize)?.bbox(glyphs)?;
                    Some([b[0] + dx, b[1] + dy, b[2] + dx, b[3] + dy])
                })
                .reduce(|a, b| [a[0].min(b[0]), a[1].min(b[1]), a[2].max(b[2]), a[3].max(b[3])]),
        }
    }

    fn write(&self, glyphs: &[FixtureGlyph], out: &mut Vec<u8>) {
        let Some(bbox) = self.bbox(glyphs) else {
            return;
        };
        match self {
            FixtureGlyph::Empty => {}
            FixtureGlyph::Outline {
                contours,
                instructions,
                ..
            } => {
                out.write_i16(contours.len() as i16);
                for v in bbox {
                    out.write_i16(v);
                }
                let mut end = 0u16;
                for contour in contours {
                    end += contour.len() as u16;
                    out.write_u16(end - 1);
                }
                out.write_u16(instructions.len() as u16);
                out.extend_from_slice(instructions);

                let points: Vec<FixturePoint> = contours.iter().flatten().copied().collect();
                let mut flags = Vec::with_capacity(points.len());
                let mut xs = Vec::new();
                let mut ys = Vec::new();
                let mut prev = (0i16, 0i16);
                for &(x, y, on_curve) in &points {
                    let mut flag = if on_curve { ON_CURVE } else { 0 };
                    let (dx, dy) = (x - prev.0, y - prev.1);
                    if dx == 0 {
                        flag |= X_SAME_OR_POSITIVE;
                    } else {
                        xs.write_i16(dx);
                    }
                    if dy == 0 {
                        flag |= Y_SAME_OR_POSITIVE;
                    } else {
                        ys.write_i16(dy);
                    }
                    flags.push(flag);
                    prev = (x, y);
                }
                write_repeated_flags(&flags, out);
                out.extend_from_slice(&xs);
                out.extend_from_slice(&ys);
            }
            FixtureGlyph::Composite {
                components,
                instructions,
            } => {
                out.write_i16(-1);
                for v in bbox {
                    out.write_i16(v);
                }
                for (i, &(gid, dx, dy)) in components.iter().enumerate() {
                    let last = i + 1 == components.len();
                    let mut flags = ARG_1_AND_2_ARE_WORDS | ARGS_ARE_XY_VALUES;
                    if !last {
                        flags |= MORE_COMPONENTS;
                    } else if !instructions.is_empty() {
                        flags |= WE_HAVE_INSTRUCTIONS;
                    }
                    out.write_u16(flags);
                    out.write_u16(gid);
                    out.write_i16(dx);
                    out.write_i16(dy);
                }
                if !instructions.is_empty() {
                    out.write_u16(instructions.len() as u16);
                    out.extend_from_slice(instructions);
                }
            }
        }
        if out.len() % 2 != 0 {
            out.push(0);
        }
    }

    fn point_count(&self) -> usize {
        match self {
            FixtureGlyph::Outline { contours, .. } => contours.iter().map(Vec::len).sum(),
            _ => 0,
        }
    }
}

fn write_repeated_flags(flags: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < flags.len() {
        let flag = flags[i];
        let run = flags[i..].iter().take_while(|&&f| f == flag).count().min(256);
        if run > 1 {
            out.push(flag | REPEAT);
            out.push((run - 1) as u8);
        } else {
            out.push(flag);
        }
        i += run;
    }
}

/// Builder for a synthetic TrueType font
#[derive(Debug, Clone)]
pub struct FixtureFont {
    glyphs: Vec<FixtureGlyph>,
    cmap: BTreeMap<char, u16>,
    long_loca: bool,
    extra_tables: Vec<(Tag, Vec<u8>)>,
}

impl FixtureFont {
    /// Font with only a `.notdef` box whose header bbox is wider than its points
    pub fn new() -> Self {
        let notdef = FixtureGlyph::Outline {
            contours: vec![vec![(50, 0, true), (450, 0, true), (450, 700, true), (50, 700, true)]],
            instructions: Vec::new(),
            bbox: Some([0, 0, 500, 750]),
        };
        Self {
            glyphs: vec![notdef],
            cmap: BTreeMap::new(),
            long_loca: false,
            extra_tables: Vec::new(),
        }
    }

    /// One mapped outline glyph per distinct character, in order
    pub fn with_chars(chars: &str) -> Self {
        let mut font = Self::new();
        for c in chars.chars() {
            if !font.cmap.contains_key(&c) {
                let gid = font.push_glyph(FixtureGlyph::for_char(c));
                font.cmap.insert(c, gid);
            }
        }
        font
    }

    /// Append a glyph, returning its id
    pub fn push_glyph(&mut self, glyph: FixtureGlyph) -> u16 {
        self.glyphs.push(glyph);
        (self.glyphs.len() - 1) as u16
    }

    /// Map a character to a glyph
    pub fn map(mut self, c: char, gid: u16) -> Self {
        self.cmap.insert(c, gid);
        self
    }

    /// Append a composite of the glyphs mapped from `parts` and map it to `c`
    pub fn with_composite(mut self, c: char, parts: &[char]) -> Self {
        let components = parts
            .iter()
            .enumerate()
            .filter_map(|(i, p)| Some((*self.cmap.get(p)?, (i as i16) * 600, 20)))
            .collect();
        let gid = self.push_glyph(FixtureGlyph::Composite {
            components,
            instructions: vec![0x01, 0x02],
        });
        self.map(c, gid)
    }

    /// Append an unmapped empty glyph
    pub fn with_empty_glyph(mut self) -> Self {
        self.push_glyph(FixtureGlyph::Empty);
        self
    }

    pub fn with_long_loca(mut self) -> Self {
        self.long_loca = true;
        self
    }

    /// Add a digital signature table
    pub fn with_dsig(self) -> Self {
        self.with_table(*b"DSIG", vec![0, 0, 0, 1, 0, 0, 0, 0])
    }

    /// Add an arbitrary table
    pub fn with_table(mut self, tag: Tag, data: Vec<u8>) -> Self {
        self.extra_tables.push((tag, data));
        self
    }

    pub fn num_glyphs(&self) -> u16 {
        self.glyphs.len() as u16
    }

    /// Glyph id mapped from a character
    pub fn glyph_id(&self, c: char) -> Option<u16> {
        self.cmap.get(&c).copied()
    }

    pub fn build(&self) -> Vec<u8> {
        let num_glyphs = self.num_glyphs();
        let mut glyf = Vec::new();
        let mut offsets = Vec::with_capacity(self.glyphs.len() + 1);
        let mut x_mins = Vec::with_capacity(self.glyphs.len());
        for glyph in &self.glyphs {
            offsets.push(glyf.len() as u32);
            glyph.write(&self.glyphs, &mut glyf);
            x_mins.push(glyph.bbox(&self.glyphs).map_or(0, |b| b[0]));
        }
        offsets.push(glyf.len() as u32);

        let mut loca = Vec::new();
        for &offset in &offsets {
            if self.long_loca {
                loca.write_u32(offset);
            } else {
                loca.write_u16((offset / 2) as u16);
            }
        }

        // Last glyph shares the previous advance
        let num_h_metrics = num_glyphs.saturating_sub(1).max(1);
        let mut hmtx = Vec::new();
        for (gid, &lsb) in x_mins.iter().enumerate() {
            if gid < num_h_metrics as usize {
                hmtx.write_u16(ADVANCE_BASE + gid as u16 * 10);
            }
            hmtx.write_i16(lsb);
        }

        let mut builder = SfntBuilder::new(FLAVOR_TRUETYPE);
        builder.insert(*b"head", self.head());
        builder.insert(*b"hhea", hhea(num_h_metrics, num_glyphs));
        builder.insert(*b"maxp", self.maxp());
        builder.insert(*b"cmap", build_cmap(&self.cmap));
        builder.insert(*b"hmtx", hmtx);
        builder.insert(*b"glyf", glyf);
        builder.insert(*b"loca", loca);
        builder.insert(*b"post", post_v2(num_glyphs));
        for (tag, data) in &self.extra_tables {
            builder.insert(*tag, data.clone());
        }
        builder.build()
    }

    fn head(&self) -> Vec<u8> {
        let mut head = Vec::with_capacity(54);
        head.write_u32(0x0001_0000);
        head.write_u32(0x0001_0000);
        head.write_u32(0);
        head.write_u32(0x5F0F_3CF5);
        head.write_u16(0x000B);
        head.write_u16(1000);
        head.extend_from_slice(&[0; 16]);
        for v in [-2000i16, -1000, 3000, 2000] {
            head.write_i16(v);
        }
        head.write_u16(0);
        head.write_u16(8);
        head.write_i16(2);
        head.write_i16(self.long_loca as i16);
        head.write_i16(0);
        head
    }

    fn maxp(&self) -> Vec<u8> {
        let max_points = self.glyphs.iter().map(FixtureGlyph::point_count).max().unwrap_or(0);
        let max_components = self
            .glyphs
            .iter()
            .map(|g| match g {
                FixtureGlyph::Composite { components, .. } => components.len(),
                _ => 0,
            })
            .max()
            .unwrap_or(0);

        let mut maxp = Vec::with_capacity(32);
        maxp.write_u32(0x0001_0000);
        maxp.write_u16(self.num_glyphs());
        maxp.write_u16(max_points as u16);
        maxp.write_u16(2);
        maxp.write_u16(max_points as u16 * 2);
        maxp.write_u16(4);
        maxp.write_u16(2);
        for _ in 0..6 {
            maxp.write_u16(0);
        }
        maxp.write_u16(max_components as u16);
        maxp.write_u16(1);
        maxp
    }
}

impl Default for FixtureFont {
    fn default() -> Self {
        Self::new()
    }
}

fn hhea(num_h_metrics: u16, num_glyphs: u16) -> Vec<u8> {
    let mut hhea = Vec::with_capacity(36);
    hhea.write_u32(0x0001_0000);
    hhea.write_i16(800);
    hhea.write_i16(-200);
    hhea.write_i16(0);
    hhea.write_u16(ADVANCE_BASE + num_glyphs * 10);
    hhea.write_i16(-1500);
    hhea.write_i16(-1500);
    hhea.write_i16(2000);
    hhea.write_i16(1);
    hhea.write_i16(0);
    hhea.write_i16(0);
    for _ in 0..5 {
        hhea.write_i16(0);
    }
    hhea.write_u16(num_h_metrics);
    hhea
}

/// post 2.0 naming every glyph `.notdef`
fn post_v2(num_glyphs: u16) -> Vec<u8> {
    let mut post = Vec::with_capacity(34 + 2 * num_glyphs as usize);
    post.write_u32(0x0002_0000);
    post.extend_from_slice(&[0; 28]);
    post.write_u16(num_glyphs);
    for _ in 0..num_glyphs {
        post.write_u16(0);
    }
    post
}

/// Outline of a glyph as path commands; `None` for empty glyphs
pub fn glyph_outline(font: &[u8], gid: u16) -> Option<String> {
    struct PathWriter(String);

    impl ttf_parser::OutlineBuilder for PathWriter {
        fn move_to(&mut self, x: f32, y: f32) {
            let _ = write!(self.0, "M{x} {y} ");
        }
        fn line_to(&mut self, x: f32, y: f32) {
            let _ = write!(self.0, "L{x} {y} ");
        }
        fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
            let _ = write!(self.0, "Q{x1} {y1} {x} {y} ");
        }
        fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
            let _ = write!(self.0, "C{x1} {y1} {x2} {y2} {x} {y} ");
        }
        fn close(&mut self) {
            self.0.push_str("Z ");
        }
    }

    let face = ttf_parser::Face::parse(font, 0).ok()?;
    let mut writer = PathWriter(String::new());
    face.outline_glyph(ttf_parser::GlyphId(gid), &mut writer)?;
    Some(writer.0)
}
