//! Identifier interning and the literal spelling pool.

use std::io::{Seek, Write};

use indexmap::{IndexMap, IndexSet};

use crate::emit::Emitter;
use crate::token::IdentId;

/// Assigns dense 1-based persistent IDs to identifiers in first-seen order.
///
/// ID 0 is reserved for "no identifier" and is what literal and synthesized
/// end-of-directive tokens carry in their records.
#[derive(Debug, Default)]
pub struct IdentInterner {
    ids: IndexSet<IdentId>,
}

impl IdentInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// The persistent ID for an identifier handle, assigning the next free
    /// one on first sight.
    pub fn resolve(&mut self, ident: Option<IdentId>) -> u32 {
        match ident {
            None => 0,
            Some(ident) => self.ids.insert_full(ident).0 as u32 + 1,
        }
    }

    /// The number of distinct identifiers seen.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Iterates over all interned handles; position `i` holds persistent ID
    /// `i + 1`.
    pub fn iter(&self) -> impl Iterator<Item = IdentId> + '_ {
        self.ids.iter().copied()
    }
}

/// Deduplicates literal spellings to stable offsets within the spelling
/// section.
///
/// Offsets are assigned while lexing runs ahead of the actual section
/// emission; [`SpellingPool::emit`] later writes the pool in insertion order,
/// which makes the assigned offsets come true.
#[derive(Debug, Default)]
pub struct SpellingPool {
    strings: IndexMap<Box<[u8]>, u32>,
    cur_offset: u32,
}

impl SpellingPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// The section offset for a spelling, frozen on first sight.
    pub fn resolve(&mut self, spelling: &[u8]) -> u32 {
        if let Some(&offset) = self.strings.get(spelling) {
            return offset;
        }

        let offset = self.cur_offset;
        self.strings.insert(spelling.into(), offset);
        self.cur_offset += spelling.len() as u32 + 1;
        offset
    }

    /// Writes all spellings NUL-terminated, in insertion order, and returns
    /// the section's start offset.
    pub fn emit<W: Write + Seek>(&self, out: &mut Emitter<W>) -> std::io::Result<u32> {
        let start = out.offset();
        for (spelling, &offset) in &self.strings {
            debug_assert_eq!(out.offset() - start, offset);
            out.write_all(spelling)?;
            out.emit_u8(0)?;
        }
        debug_assert_eq!(out.offset() - start, self.cur_offset);
        Ok(start)
    }
}
