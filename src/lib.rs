//! Writes pre-tokenized header (PTH) caches of C preprocessor token streams.
//!
//! After a preprocessor has walked a translation unit, every file it touched
//! sits in its source manager. [`write_pth`] re-lexes those files in raw mode
//! and emits a single binary artifact from which a reader can replay tokens
//! without lexing the sources again.
//!
//! # Structure of the format
//!
//! A PTH file caches four kinds of data per run:
//!
//! 1. per-file token streams with conditional-jump tables
//! 2. an identifier table
//! 3. a literal spelling pool
//! 4. a file map
//!
//! The file opens with the ASCII magic `cfe-pth`, a `u32` format version,
//! and a prologue of four `u32` offsets locating the sections below. The
//! prologue is written as zeros up front and back-patched once all sections
//! have been emitted; everything else is laid down in one forward pass.
//!
//! ## Token streams
//!
//! Each cached file contributes a 4-byte aligned stream of fixed 12-byte
//! records, three little-endian `u32` words each:
//!
//! ```text
//! word0: kind | flags << 8 | length << 16
//! word1: spelling-pool offset (literals) or persistent identifier ID
//! word2: byte offset of the token within its source file
//! ```
//!
//! Identifier IDs are 1-based; 0 means "no identifier" and is what literals
//! and synthesized end-of-directive tokens carry. The fixed record size plus
//! the alignment let a reader index tokens directly by position.
//!
//! Directly after each stream follows its conditional table: a `u32` entry
//! count, then per `#if`/`#ifdef`/`#ifndef`/`#elif`/`#else`/`#endif` a
//! `u32` offset of the directive's `#` record relative to the stream start
//! and the `u32` index of the next entry of the same chain (0 for a terminal
//! `#endif`). A reader skipping a failed branch jumps along this chain
//! instead of lexing the region.
//!
//! ## Identifier table
//!
//! Two coordinated parts: a chained hash table from NUL-terminated names to
//! persistent IDs, and a dense array of `u32` name offsets indexed by
//! `ID - 1`, prefixed with the identifier count.
//!
//! ## Spelling pool
//!
//! The concatenation of all distinct literal spellings, NUL-terminated.
//! Token records reference spellings by their offset into this section.
//!
//! ## File map
//!
//! A chained hash table from file paths to `(token stream offset,
//! conditional table offset)` plus stat metadata used for cache validation.
//! The hash-table image layout is described in [`HashTableBuilder`].
//!
//! # Collaborators
//!
//! Lexing and interning stay with the preprocessor: the writer drives the
//! [`SourceManager`], [`RawLexer`], and [`Preprocessor`] traits and owns
//! nothing but the layout construction. The writer is single-threaded; one
//! [`PthWriter`] owns all state of one generation pass.

#![warn(missing_docs)]

mod emit;
mod error;
mod hash;
mod intern;
pub mod raw;
mod source;
mod token;
mod writer;

pub use emit::Emitter;
pub use error::Error;
pub use hash::{bernstein_hash, HashTableBuilder, HashTableInfo};
pub use source::{FileId, FileStat, Preprocessor, RawLexer, SourceFile, SourceManager};
pub use token::{IdentId, PpKeyword, SourceLocation, Token, TokenFlags, TokenKind};
pub use writer::{write_pth, PthEntry, PthEntryKey, PthWriter};

type Result<T, E = Error> = std::result::Result<T, E>;
