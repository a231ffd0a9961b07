// Tracepad - Interactive Code Tracing Service
// Copyright (C) 2024 Zhuo Zhang and Wuqi Zhang
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Offset-keyed source edits.
//!
//! Rewrites are collected as insert/replace actions keyed by their byte
//! offset in the original source and applied back-to-front so earlier
//! offsets stay valid. Inserts at the same offset are ordered by priority,
//! higher first; an insert at a replace's offset lands before the
//! replacement text.

use std::collections::BTreeMap;

/// Used for the opening bracket when a single-statement body is blockified.
pub const LEFT_BRACKET_PRIORITY: u8 = 255;
/// Used for the `__trace` probe in front of a statement.
pub const TRACE_PROBE_PRIORITY: u8 = 63;
/// Used for sandbox seeding statements injected before a loop.
pub const SEED_PRIORITY: u8 = 31;
/// Used for the opening of a sandbox mirror wrap around an initializer.
pub const MIRROR_OPEN_PRIORITY: u8 = 127;
/// Used for the closing parenthesis of a sandbox mirror wrap.
pub const MIRROR_CLOSE_PRIORITY: u8 = 16;
/// Used for the closing bracket when a single-statement body is blockified.
pub const RIGHT_BRACKET_PRIORITY: u8 = 0;

/// Edits anchored at a single byte offset.
#[derive(Debug, Default)]
struct OffsetEdits {
    /// `(priority, text)` pairs; applied in priority order, higher first.
    inserts: Vec<(u8, String)>,
    /// Replacement of `[offset, end)` with new text.
    replace: Option<(usize, String)>,
}

/// The collection of edits on one source file.
#[derive(Debug, Default)]
pub struct SourceModifications {
    edits: BTreeMap<usize, OffsetEdits>,
}

impl SourceModifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `content` before the text at `loc`.
    pub fn insert(&mut self, loc: usize, content: impl Into<String>, priority: u8) {
        self.edits.entry(loc).or_default().inserts.push((priority, content.into()));
    }

    /// Replaces `[start, end)` with `content`.
    ///
    /// # Panics
    ///
    /// Panics if the range overlaps another replacement.
    pub fn replace(&mut self, start: usize, end: usize, content: impl Into<String>) {
        if let Some((prev_start, edits)) = self.edits.range(..start).next_back() {
            if let Some((prev_end, _)) = &edits.replace {
                assert!(*prev_end <= start, "replacement overlaps previous one at {prev_start}");
            }
        }
        let entry = self.edits.entry(start).or_default();
        assert!(entry.replace.is_none(), "duplicate replacement at {start}");
        entry.replace = Some((end, content.into()));
    }

    /// Number of distinct edit offsets.
    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Applies all edits to `source`, back to front so offsets stay stable.
    pub fn apply(&self, source: &str) -> String {
        let mut out = source.to_string();
        for (&loc, edits) in self.edits.iter().rev() {
            if let Some((end, content)) = &edits.replace {
                out.replace_range(loc..*end, content);
            }
            let mut inserts: Vec<&(u8, String)> = edits.inserts.iter().collect();
            inserts.sort_by(|a, b| b.0.cmp(&a.0));
            let combined: String = inserts.into_iter().map(|(_, s)| s.as_str()).collect();
            out.insert_str(loc, &combined);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_keeps_earlier_offsets_valid() {
        let src = "let x = 1; let y = 2;";
        let mut mods = SourceModifications::new();
        mods.replace(0, 3, "var");
        mods.replace(11, 14, "var");
        mods.insert(0, "__trace(1); ", TRACE_PROBE_PRIORITY);
        mods.insert(11, "__trace(1); ", TRACE_PROBE_PRIORITY);
        assert_eq!(
            mods.apply(src),
            "__trace(1); var x = 1; __trace(1); var y = 2;"
        );
    }

    #[test]
    fn test_same_offset_inserts_ordered_by_priority() {
        let src = "x = 1;";
        let mut mods = SourceModifications::new();
        mods.insert(0, "__trace(1); ", TRACE_PROBE_PRIORITY);
        mods.insert(0, "{ ", LEFT_BRACKET_PRIORITY);
        assert_eq!(mods.apply(src), "{ __trace(1); x = 1;");
    }

    #[test]
    fn test_insert_before_replacement_at_same_offset() {
        let src = "const a = 0;";
        let mut mods = SourceModifications::new();
        mods.replace(0, 5, "var");
        mods.insert(0, "__trace(1); ", TRACE_PROBE_PRIORITY);
        assert_eq!(mods.apply(src), "__trace(1); var a = 0;");
    }

    #[test]
    #[should_panic(expected = "duplicate replacement")]
    fn test_duplicate_replacement_panics() {
        let mut mods = SourceModifications::new();
        mods.replace(0, 3, "var");
        mods.replace(0, 3, "var");
    }
}
