//! Glyph subsetting with retained glyph ids
//!
//! Glyphs outside the subset are emptied rather than removed, so every
//! table indexed by glyph id (hmtx, GSUB, GPOS, kern) stays valid without
//! rewriting. The subset keeps `.notdef`, the glyphs mapped from the
//! requested codepoints and every component they reference.

use std::collections::{BTreeMap, BTreeSet};

use crate::cmap::build_cmap;
use crate::glyf;
use crate::reader::FontWrite;
use crate::sfnt::{Sfnt, SfntBuilder};
use crate::{SubsetError, Subsetter};

/// Codepoints resolved per cmap pass
pub const DEFAULT_BATCH_SIZE: usize = 1000;

const POST_FORMAT_3: u32 = 0x0003_0000;
const POST_HEADER_LEN: usize = 32;

/// Glyphs and mappings accumulated across batches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsetPlan {
    glyphs: BTreeSet<u16>,
    mapping: BTreeMap<char, u16>,
}

impl SubsetPlan {
    /// Empty plan holding only `.notdef`
    pub fn new() -> Self {
        Self {
            glyphs: BTreeSet::from([0]),
            mapping: BTreeMap::new(),
        }
    }

    /// Resolve one batch of codepoints; returns how many mapped to a glyph
    pub fn add_codepoints(&mut self, face: &ttf_parser::Face<'_>, batch: &[char]) -> usize {
        let mut mapped = 0;
        for &c in batch {
            if let Some(gid) = face.glyph_index(c) {
                if gid.0 != 0 {
                    self.mapping.insert(c, gid.0);
                    self.glyphs.insert(gid.0);
                    mapped += 1;
                }
            }
        }
        mapped
    }

    /// Pull in the components of every composite glyph in the plan
    pub fn close_over_components(
        &mut self,
        glyf_data: &[u8],
        offsets: &[u32],
    ) -> Result<(), SubsetError> {
        let mut pending: Vec<u16> = self.glyphs.iter().copied().collect();
        while let Some(gid) = pending.pop() {
            let data =
                glyf::glyph_data(glyf_data, offsets, gid).ok_or(SubsetError::InvalidGlyph(gid))?;
            let components =
                glyf::component_ids(data).map_err(|_| SubsetError::InvalidGlyph(gid))?;
            for component in components {
                if self.glyphs.insert(component) {
                    pending.push(component);
                }
            }
        }
        Ok(())
    }

    /// Glyph ids kept by the subset
    pub fn glyphs(&self) -> &BTreeSet<u16> {
        &self.glyphs
    }

    /// Retained codepoint mappings
    pub fn mapping(&self) -> &BTreeMap<char, u16> {
        &self.mapping
    }

    pub fn contains(&self, gid: u16) -> bool {
        self.glyphs.contains(&gid)
    }
}

impl Default for SubsetPlan {
    fn default() -> Self {
        Self::new()
    }
}

/// Subsetter for TrueType-outline fonts
#[derive(Debug, Clone)]
pub struct GlyfSubsetter {
    batch_size: usize,
}

impl GlyfSubsetter {
    pub fn new() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Codepoints per batch (at least one)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Resolve codepoints into a plan, batch by batch
    pub fn plan(
        &self,
        face: &ttf_parser::Face<'_>,
        codepoints: &BTreeSet<char>,
    ) -> SubsetPlan {
        let codepoints: Vec<char> = codepoints.iter().copied().collect();
        let batches = codepoints.len().div_ceil(self.batch_size);
        let mut plan = SubsetPlan::new();
        for (index, batch) in codepoints.chunks(self.batch_size).enumerate() {
            let mapped = plan.add_codepoints(face, batch);
            tracing::debug!(
                batch = index + 1,
                batches,
                requested = batch.len(),
                mapped,
                glyphs = plan.glyphs.len(),
                "subset batch resolved"
            );
        }
        plan
    }
}

impl Default for GlyfSubsetter {
    fn default() -> Self {
        Self::new()
    }
}

impl Subsetter for GlyfSubsetter {
    fn subset(&self, font: &[u8], codepoints: &BTreeSet<char>) -> Result<Vec<u8>, SubsetError> {
        let sfnt = Sfnt::parse(font)?;
        let (Some(glyf_data), Some(loca)) = (sfnt.table(b"glyf"), sfnt.table(b"loca")) else {
            return Err(SubsetError::UnsupportedOutlines);
        };
        let head = sfnt.table(b"head").ok_or(SubsetError::MissingTable("head"))?;
        let maxp = sfnt.table(b"maxp").ok_or(SubsetError::MissingTable("maxp"))?;
        let num_glyphs = glyf::num_glyphs(maxp).ok_or(SubsetError::MissingTable("maxp"))?;
        let long = glyf::long_loca(head).ok_or(SubsetError::MissingTable("head"))?;
        let offsets = glyf::read_loca(loca, num_glyphs, long)?;

        let face = ttf_parser::Face::parse(font, 0)?;
        let mut plan = self.plan(&face, codepoints);
        plan.close_over_components(glyf_data, &offsets)?;

        // Kept glyphs copied, the rest emptied
        let mut new_glyf = Vec::with_capacity(glyf_data.len());
        let mut new_offsets = Vec::with_capacity(offsets.len());
        for gid in 0..num_glyphs {
            new_offsets.push(new_glyf.len() as u32);
            if plan.contains(gid) {
                let data = glyf::glyph_data(glyf_data, &offsets, gid)
                    .ok_or(SubsetError::InvalidGlyph(gid))?;
                new_glyf.extend_from_slice(data);
                new_glyf.pad4();
            }
        }
        new_offsets.push(new_glyf.len() as u32);

        let mut builder = SfntBuilder::from_sfnt(&sfnt);
        let (new_loca, long) = match glyf::write_loca(&new_offsets, long) {
            Some(loca) => (loca, long),
            None => (
                glyf::write_loca(&new_offsets, true).ok_or(SubsetError::LocaOverflow)?,
                true,
            ),
        };
        if let Some(head) = builder.get_mut(b"head").filter(|h| h.len() >= 52) {
            head[50..52].copy_from_slice(&(long as i16).to_be_bytes());
        }
        builder.insert(*b"glyf", new_glyf);
        builder.insert(*b"loca", new_loca);
        builder.insert(*b"cmap", build_cmap(plan.mapping()));
        builder.remove(b"DSIG");

        if let Some(post) = builder.get_mut(b"post") {
            if post.len() >= POST_HEADER_LEN {
                post.truncate(POST_HEADER_LEN);
                post[0..4].copy_from_slice(&POST_FORMAT_3.to_be_bytes());
            }
        }

        let out = builder.build();
        tracing::debug!(
            glyphs = plan.glyphs().len(),
            of = num_glyphs,
            codepoints = plan.mapping().len(),
            bytes_in = font.len(),
            bytes_out = out.len(),
            "subset font"
        );
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_starts_with_notdef() {
        let plan = SubsetPlan::new();
        assert!(plan.contains(0));
        assert_eq!(plan.glyphs().len(), 1);
        assert!(plan.mapping().is_empty());
    }

    #[test]
    fn test_batch_size_floor() {
        assert_eq!(GlyfSubsetter::new().with_batch_size(0).batch_size(), 1);
        assert_eq!(GlyfSubsetter::default().batch_size(), DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_rejects_non_sfnt() {
        let err = GlyfSubsetter::new().subset(b"not a font", &BTreeSet::new()).unwrap_err();
        assert!(matches!(err, SubsetError::Sfnt(_)));
    }
}
