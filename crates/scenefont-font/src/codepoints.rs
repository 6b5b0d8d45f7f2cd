//! Codepoint policy for subsets
//!
//! Every subset carries printable Basic Latin on top of the characters a
//! scene uses, so later edits of plain text still render. The CJK Unified
//! Ideographs block is opt-in because it multiplies the subset size.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

/// Always included
pub const BASIC_LATIN: RangeInclusive<char> = '\u{0020}'..='\u{007F}';

/// Included when [`CodepointPolicy::include_cjk_unified`] is set
pub const CJK_UNIFIED: RangeInclusive<char> = '\u{4E00}'..='\u{9FFF}';

/// Which safety ranges join the used characters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodepointPolicy {
    pub include_cjk_unified: bool,
}

impl CodepointPolicy {
    pub fn with_cjk_unified(include: bool) -> Self {
        Self {
            include_cjk_unified: include,
        }
    }
}

/// Used characters plus the policy's safety ranges
pub fn codepoints_for<'a, I>(used: I, policy: CodepointPolicy) -> BTreeSet<char>
where
    I: IntoIterator<Item = &'a char>,
{
    let mut set: BTreeSet<char> = used.into_iter().copied().collect();
    set.extend(BASIC_LATIN);
    if policy.include_cjk_unified {
        set.extend(CJK_UNIFIED);
    }
    set
}
