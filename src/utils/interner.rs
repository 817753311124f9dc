//! Global Identifier Interner
//!
//! Provides the process-wide, deduplicated string-to-integer mapping used as
//! the stable key for node types, pipeline types, and asset-type tags
//! throughout the engine. This is the foundational infrastructure other
//! modules reach for whenever they need a cheap-to-compare, cheap-to-hash
//! type tag instead of carrying a `String` around.
//!
//! # Design
//!
//! A single process-wide table holds `(hash, first-seen spelling, next)`
//! entries behind a [`parking_lot::RwLock`]: lookups take the shared lock,
//! insertions take the exclusive lock and rehash once the load factor
//! exceeds one entry per two buckets. Interned text is copied into
//! fixed-size byte chunks that are never freed and never moved (only the
//! `Vec<Box<[u8]>>` that tracks them grows, and growing it does not move
//! the heap allocations it points at), so a resolved `&'static str` stays
//! valid for the life of the process.
//!
//! Equality between two [`Identifier`]s is index equality; ordering is
//! lexicographic over each identifier's resolved text. A distinguished
//! [`Identifier::NONE`] sentinel compares unequal to every identifier ever
//! produced by [`intern`].

use std::cmp::Ordering;
use std::sync::OnceLock;

use parking_lot::RwLock;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Identifiers longer than this (in UTF-8 bytes) are rejected by [`intern`].
pub const MAX_IDENTIFIER_BYTES: usize = 1000;

const CHUNK_BYTES: usize = 64 * 1024;
const INITIAL_BUCKETS: usize = 256;

/// Interning failed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum InternError {
    /// The input exceeded [`MAX_IDENTIFIER_BYTES`].
    #[error("identifier text exceeds {MAX_IDENTIFIER_BYTES} bytes")]
    TooLong,
}

/// An immutable, process-wide-unique identifier.
///
/// Compares as a 32-bit nonzero index: two identifiers are equal iff they
/// were interned from text that case-folds equal. [`Identifier::NONE`] is a
/// distinct sentinel (index `0`) that never compares equal to a constructed
/// identifier.
///
/// Ordering is lexicographic over the *resolved* text (first-interned
/// spelling), not over the raw index — two identifiers interned in the
/// opposite order to their alphabetical relationship still sort
/// alphabetically.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Identifier(u32);

impl Identifier {
    /// The sentinel identifier. Never equal to any identifier returned by
    /// [`intern`].
    pub const NONE: Identifier = Identifier(0);

    /// Returns `true` if this is the [`Identifier::NONE`] sentinel.
    #[must_use]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Interns `s`, panicking if it exceeds [`MAX_IDENTIFIER_BYTES`].
    ///
    /// Convenience for call sites that treat identifiers as infallible
    /// (per spec: all callers other than the intern operation itself may
    /// do so), e.g. constant node-type tags declared at pipeline
    /// registration time.
    #[must_use]
    pub fn new(s: &str) -> Self {
        intern(s).expect("identifier text exceeds MAX_IDENTIFIER_BYTES")
    }
}

impl Default for Identifier {
    fn default() -> Self {
        Identifier::NONE
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        display(*self).cmp(display(*other))
    }
}

struct Entry {
    hash: u64,
    text: &'static str,
    next: i64,
}

struct Table {
    chunks: Vec<Box<[u8]>>,
    chunk_used: usize,
    entries: Vec<Entry>,
    buckets: Vec<i64>,
}

impl Table {
    fn new() -> Self {
        Self {
            chunks: Vec::new(),
            chunk_used: 0,
            entries: Vec::new(),
            buckets: vec![-1; INITIAL_BUCKETS],
        }
    }

    fn bucket_of(&self, hash: u64) -> usize {
        (hash as usize) & (self.buckets.len() - 1)
    }

    /// Copies `text` into chunk storage and returns a `'static` view of it.
    /// The returned reference is valid for the process lifetime: chunks are
    /// boxed byte slices that are never freed or relocated once allocated.
    fn store(&mut self, text: &str) -> &'static str {
        let bytes = text.as_bytes();
        let need_new_chunk = self.chunks.is_empty() || self.chunk_used + bytes.len() > self.chunks.last().unwrap().len();
        if need_new_chunk {
            let size = CHUNK_BYTES.max(bytes.len());
            self.chunks.push(vec![0u8; size].into_boxed_slice());
            self.chunk_used = 0;
        }
        let chunk = self.chunks.last_mut().unwrap();
        let start = self.chunk_used;
        chunk[start..start + bytes.len()].copy_from_slice(bytes);
        self.chunk_used += bytes.len();

        // SAFETY: `chunk` is a heap allocation owned by `self.chunks`, which
        // is never truncated or cleared (the table lives for the process
        // lifetime and entries are never removed), so the byte range we
        // just wrote stays valid and unmoved for as long as the process
        // runs. The table itself is never dropped (`TABLE` is a
        // process-wide `OnceLock`), so extending this borrow to `'static`
        // is sound.
        let slice: &[u8] = &chunk[start..start + bytes.len()];
        let slice: &'static [u8] = unsafe { std::mem::transmute(slice) };
        std::str::from_utf8(slice).expect("interned bytes are valid utf-8 by construction")
    }

    fn rehash_if_needed(&mut self) {
        if self.entries.len() * 2 <= self.buckets.len() {
            return;
        }
        let new_len = self.buckets.len() * 2;
        self.buckets = vec![-1; new_len];
        for (idx, entry) in self.entries.iter_mut().enumerate() {
            let bucket = (entry.hash as usize) & (new_len - 1);
            entry.next = self.buckets[bucket];
            self.buckets[bucket] = idx as i64;
        }
    }
}

fn fold_hash(case_folded: &str) -> u64 {
    let mut hasher = FxHasher::default();
    case_folded.hash(&mut hasher);
    hasher.finish()
}

static TABLE: OnceLock<RwLock<Table>> = OnceLock::new();

fn table() -> &'static RwLock<Table> {
    TABLE.get_or_init(|| RwLock::new(Table::new()))
}

/// Interns `s` and returns the [`Identifier`] for its case-folded content.
///
/// If text equal under case-folding to `s` was interned before, the
/// existing identifier is returned unchanged (and its display text remains
/// whatever spelling was interned first). Otherwise a new identifier is
/// allocated, storing `s` itself (not the folded form) as its display text.
///
/// Never blocks on I/O. The only failure mode is `s` exceeding
/// [`MAX_IDENTIFIER_BYTES`] UTF-8 bytes.
pub fn intern(s: &str) -> Result<Identifier, InternError> {
    if s.len() > MAX_IDENTIFIER_BYTES {
        return Err(InternError::TooLong);
    }
    let folded = s.to_lowercase();
    let hash = fold_hash(&folded);

    {
        let guard = table().read();
        if let Some(id) = find(&guard, hash, &folded) {
            return Ok(id);
        }
    }

    let mut guard = table().write();
    // Re-check under the exclusive lock: another writer may have inserted
    // the same text between our read-unlock and write-lock.
    if let Some(id) = find(&guard, hash, &folded) {
        return Ok(id);
    }

    let text = guard.store(s);
    let index = guard.entries.len();
    let bucket = guard.bucket_of(hash);
    let head = guard.buckets[bucket];
    guard.entries.push(Entry {
        hash,
        text,
        next: head,
    });
    guard.buckets[bucket] = index as i64;
    guard.rehash_if_needed();

    // Index is 1-based: 0 is reserved for `Identifier::NONE`.
    Ok(Identifier(index as u32 + 1))
}

fn find(table: &Table, hash: u64, folded: &str) -> Option<Identifier> {
    let bucket = (hash as usize) & (table.buckets.len() - 1);
    let mut cursor = table.buckets[bucket];
    while cursor >= 0 {
        let entry = &table.entries[cursor as usize];
        if entry.hash == hash && entry.text.to_lowercase() == folded {
            return Some(Identifier(cursor as u32 + 1));
        }
        cursor = entry.next;
    }
    None
}

/// Attempts to find the [`Identifier`] for text equal to `s` under
/// case-folding, without interning it. Returns `None` if no such identifier
/// has been interned yet.
#[must_use]
pub fn get(s: &str) -> Option<Identifier> {
    if s.len() > MAX_IDENTIFIER_BYTES {
        return None;
    }
    let folded = s.to_lowercase();
    let hash = fold_hash(&folded);
    find(&table().read(), hash, &folded)
}

/// Resolves an [`Identifier`] back to its first-interned spelling.
///
/// Returns `""` for [`Identifier::NONE`].
#[must_use]
pub fn display(id: Identifier) -> &'static str {
    if id.is_none() {
        return "";
    }
    let guard = table().read();
    guard.entries[(id.0 - 1) as usize].text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interns_same_case_folded_text_to_same_identifier() {
        let a = intern("Rectangle").unwrap();
        let b = intern("rectangle").unwrap();
        let c = intern("RECTANGLE").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn display_returns_first_interned_spelling() {
        let a = intern("Sprite").unwrap();
        let _ = intern("SPRITE").unwrap();
        assert_eq!(display(a), "Sprite");
    }

    #[test]
    fn distinct_text_interns_to_distinct_identifiers() {
        let a = intern("alpha-unique-test-marker").unwrap();
        let b = intern("beta-unique-test-marker").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn none_compares_unequal_to_any_constructed_identifier() {
        let a = intern("none-comparison-test-marker").unwrap();
        assert_ne!(a, Identifier::NONE);
        assert!(Identifier::NONE.is_none());
        assert!(!a.is_none());
    }

    #[test]
    fn rejects_text_over_the_byte_limit() {
        let too_long = "x".repeat(MAX_IDENTIFIER_BYTES + 1);
        assert_eq!(intern(&too_long), Err(InternError::TooLong));
    }

    #[test]
    fn get_does_not_insert() {
        assert!(get("never-interned-marker-xyz").is_none());
        let id = intern("now-interned-marker-xyz").unwrap();
        assert_eq!(get("now-interned-marker-xyz"), Some(id));
    }

    #[test]
    fn ordering_is_lexicographic_over_resolved_text() {
        let z = intern("zzz-order-marker").unwrap();
        let a = intern("aaa-order-marker").unwrap();
        assert!(a < z);
    }
}
