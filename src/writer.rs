//! The PTH writer.
//!
//! [`PthWriter::generate`] performs one forward pass over the byte sink: it
//! reserves the prologue, raw-lexes every cached file into a token stream
//! plus a conditional-jump table, then emits the identifier tables, the
//! spelling pool, and the file map, and finally seeks back to fill in the
//! prologue offsets.

use std::io::{Seek, Write};
use std::path::Path;

use crate::emit::Emitter;
use crate::hash::{bernstein_hash, HashTableBuilder, HashTableInfo};
use crate::intern::{IdentInterner, SpellingPool};
use crate::raw;
use crate::source::{FileStat, Preprocessor, RawLexer, SourceManager};
use crate::token::{PpKeyword, Token, TokenFlags, TokenKind};
use crate::{Error, Result};

/// Offsets of one cached file's token stream and conditional table within
/// the artifact.
#[derive(Debug, Clone, Copy)]
pub struct PthEntry {
    /// Absolute offset of the file's 4-byte aligned token stream.
    pub token_off: u32,
    /// Absolute offset of the file's conditional table.
    pub ppcond_off: u32,
}

/// The key of a file-map entry.
///
/// The on-disk kind tag makes the table self-describing; only the `File`
/// variant carries a data payload.
#[derive(Debug, Clone)]
pub enum PthEntryKey {
    /// A real file with stat metadata.
    File {
        /// The file path, preferentially absolute.
        path: String,
        /// Stat metadata serialized after the entry offsets.
        stat: FileStat,
    },
    /// A directory. Reserved; no metadata is emitted in this version.
    Directory {
        /// The directory path.
        path: String,
    },
    /// A path that did not resolve to a file.
    Missing {
        /// The path as it was looked up.
        path: String,
    },
}

impl PthEntryKey {
    fn path(&self) -> &str {
        match self {
            PthEntryKey::File { path, .. }
            | PthEntryKey::Directory { path }
            | PthEntryKey::Missing { path } => path,
        }
    }

    fn kind_tag(&self) -> u8 {
        match self {
            PthEntryKey::File { .. } => raw::ENTRY_KIND_FILE,
            PthEntryKey::Directory { .. } => raw::ENTRY_KIND_DIRECTORY,
            PthEntryKey::Missing { .. } => raw::ENTRY_KIND_MISSING,
        }
    }

    fn data_len(&self) -> u32 {
        match self {
            // Entry offsets plus the stat payload.
            PthEntryKey::File { .. } => 4 + 4 + raw::FILE_STAT_LEN as u32,
            PthEntryKey::Directory { .. } | PthEntryKey::Missing { .. } => 0,
        }
    }
}

/// File-map table: path keys with a kind tag, offsets plus stat as data.
struct FileMapInfo;

impl HashTableInfo for FileMapInfo {
    type Key = PthEntryKey;
    type Data = PthEntry;

    fn hash(key: &PthEntryKey) -> u32 {
        bernstein_hash(key.path().as_bytes())
    }

    fn emit_key_data_len<W: Write + Seek>(
        out: &mut Emitter<W>,
        key: &PthEntryKey,
        _data: &PthEntry,
    ) -> std::io::Result<(u32, u32)> {
        // Kind tag, path bytes, NUL.
        let n = key.path().len() as u32 + 2;
        out.emit_u16(n)?;
        let m = key.data_len();
        out.emit_u8(m as u8)?;
        Ok((n, m))
    }

    fn emit_key<W: Write + Seek>(
        out: &mut Emitter<W>,
        key: &mut PthEntryKey,
        _key_len: u32,
    ) -> std::io::Result<()> {
        out.emit_u8(key.kind_tag())?;
        out.write_all(key.path().as_bytes())?;
        out.emit_u8(0)
    }

    fn emit_data<W: Write + Seek>(
        out: &mut Emitter<W>,
        key: &PthEntryKey,
        data: &PthEntry,
        _data_len: u32,
    ) -> std::io::Result<()> {
        if let PthEntryKey::File { stat, .. } = key {
            out.emit_u32(data.token_off)?;
            out.emit_u32(data.ppcond_off)?;
            out.emit_u32(stat.inode)?;
            out.emit_u32(stat.device)?;
            out.emit_u16(u32::from(stat.mode))?;
            out.emit_u64(stat.mtime)?;
            out.emit_u64(stat.size)?;
        }
        Ok(())
    }
}

/// Identifier-table key: the name bytes plus the offset they were emitted
/// at, recorded as a side effect of emission and harvested for the ID-to-name
/// table.
struct PthIdKey {
    name: Box<[u8]>,
    name_offset: u32,
}

/// Identifier table: NUL-terminated names as keys, persistent IDs as data.
struct IdentTableInfo;

impl HashTableInfo for IdentTableInfo {
    type Key = PthIdKey;
    type Data = u32;

    fn hash(key: &PthIdKey) -> u32 {
        bernstein_hash(&key.name)
    }

    fn emit_key_data_len<W: Write + Seek>(
        out: &mut Emitter<W>,
        key: &PthIdKey,
        _data: &u32,
    ) -> std::io::Result<(u32, u32)> {
        let n = key.name.len() as u32 + 1;
        out.emit_u16(n)?;
        Ok((n, 4))
    }

    fn emit_key<W: Write + Seek>(
        out: &mut Emitter<W>,
        key: &mut PthIdKey,
        _key_len: u32,
    ) -> std::io::Result<()> {
        key.name_offset = out.offset();
        out.write_all(&key.name)?;
        out.emit_u8(0)
    }

    fn emit_data<W: Write + Seek>(
        out: &mut Emitter<W>,
        _key: &PthIdKey,
        data: &u32,
        _data_len: u32,
    ) -> std::io::Result<()> {
        out.emit_u32(*data)
    }
}

/// Writes one PTH artifact from a completed preprocessor run.
pub struct PthWriter<'a, W, P, S> {
    out: Emitter<W>,
    pp: &'a mut P,
    sm: &'a S,
    idents: IdentInterner,
    spellings: SpellingPool,
    file_map: HashTableBuilder<FileMapInfo>,
}

impl<'a, W, P, S> PthWriter<'a, W, P, S>
where
    W: Write + Seek,
    P: Preprocessor,
    S: SourceManager,
{
    /// Creates a writer over a sink positioned at the start of the artifact.
    pub fn new(out: W, pp: &'a mut P, sm: &'a S) -> Self {
        PthWriter {
            out: Emitter::new(out),
            pp,
            sm,
            idents: IdentInterner::new(),
            spellings: SpellingPool::new(),
            file_map: HashTableBuilder::new(),
        }
    }

    /// Records a directory or unresolved path in the file map.
    ///
    /// [`generate`](Self::generate) adds the entries for real files itself;
    /// keys inserted here are emitted with an empty data payload.
    pub fn insert_entry(&mut self, key: PthEntryKey) {
        self.file_map.insert(
            key,
            PthEntry {
                token_off: 0,
                ppcond_off: 0,
            },
        );
    }

    /// Generates the artifact.
    ///
    /// Files with relative paths or without a loaded buffer are skipped; the
    /// remaining files still produce a valid artifact.
    #[tracing::instrument(skip_all)]
    pub fn generate(mut self) -> Result<()> {
        self.generate_inner().map_err(Error::WriteFailed)
    }

    fn generate_inner(&mut self) -> std::io::Result<()> {
        self.out.write_all(&raw::PTH_MAGIC)?;
        self.out.emit_u32(raw::PTH_VERSION)?;

        // Reserve the prologue; it is back-patched below once every section
        // offset is known.
        let prologue_offset = self.out.position();
        self.out.write_all(&[0u8; raw::PROLOGUE_LEN])?;

        for file in self.sm.entries() {
            if !Path::new(file.path).is_absolute() {
                tracing::debug!(path = file.path, "skipping file with relative path");
                continue;
            }
            if file.buffer.is_none() {
                tracing::debug!(path = file.path, "skipping file without a buffer");
                continue;
            }

            let mut lexer = self.sm.raw_lexer(file.file);
            let entry = self.lex_tokens(&mut lexer)?;
            let key = PthEntryKey::File {
                path: file.path.to_owned(),
                stat: file.stat,
            };
            self.file_map.insert(key, entry);
        }

        let (id_table_off, name_table_off) = self.emit_identifier_table()?;
        let spelling_off = self.spellings.emit(&mut self.out)?;
        let file_table_off = self.file_map.emit(&mut self.out)?;

        tracing::debug!(
            identifiers = self.idents.len(),
            files = self.file_map.len(),
            size = self.out.position(),
            "PTH sections emitted"
        );

        self.out.seek(prologue_offset)?;
        self.out.emit_u32(id_table_off)?;
        self.out.emit_u32(name_table_off)?;
        self.out.emit_u32(file_table_off)?;
        self.out.emit_u32(spelling_off)?;

        Ok(())
    }

    /// Lexes one file into the artifact and returns its section offsets.
    fn lex_tokens<L: RawLexer>(&mut self, lexer: &mut L) -> std::io::Result<PthEntry> {
        // Align the stream so readers can index token records by position.
        self.out.pad(4)?;
        let token_off = self.out.offset();

        // Matching `#if`/`#endif` pairs: `(hash_offset, target_index)`, with
        // 0 marking a target that still awaits back-patching.
        let mut ppcond: Vec<(u32, u32)> = Vec::new();
        let mut open_conds: Vec<usize> = Vec::new();
        let mut in_directive = false;

        let mut tok = lexer.lex();
        loop {
            if in_directive && (tok.is_at_start_of_line() || tok.kind == TokenKind::Eof) {
                // Close the directive with a synthesized end-of-directive
                // token at the position of the first token past it. The
                // token in hand is then processed normally.
                let mut eod = tok;
                eod.kind = TokenKind::Eod;
                eod.flags.remove(TokenFlags::START_OF_LINE);
                eod.ident = None;
                self.emit_token(&eod)?;
                in_directive = false;
            }

            if tok.kind == TokenKind::Identifier {
                tok.ident = Some(self.pp.lookup_identifier(&tok));
                self.emit_token(&tok)?;
                tok = lexer.lex();
                continue;
            }

            if tok.kind == TokenKind::Hash && tok.is_at_start_of_line() {
                debug_assert!(!in_directive);
                let hash_off = self.out.offset();
                self.emit_token(&tok)?;

                tok = lexer.lex();
                debug_assert!(!tok.is_at_start_of_line());

                if tok.kind != TokenKind::Identifier {
                    // Malformed directive; emit it as plain tokens.
                    self.emit_token(&tok)?;
                    if tok.kind == TokenKind::Eof {
                        break;
                    }
                    tok = lexer.lex();
                    continue;
                }

                let ident = self.pp.lookup_identifier(&tok);
                tok.ident = Some(ident);
                let keyword = self.pp.pp_keyword(ident);
                debug_assert!(keyword.is_some());
                in_directive = true;

                match keyword {
                    Some(PpKeyword::Include | PpKeyword::Import | PpKeyword::IncludeNext) => {
                        self.emit_token(&tok)?;
                        // Lex the header name as one token; the directive
                        // flag only brackets this call.
                        lexer.set_in_directive(true);
                        tok = lexer.lex_include_filename();
                        lexer.set_in_directive(false);
                        debug_assert!(!tok.is_at_start_of_line());
                        if tok.kind == TokenKind::Identifier {
                            tok.ident = Some(self.pp.lookup_identifier(&tok));
                        }
                    }
                    Some(PpKeyword::If | PpKeyword::Ifdef | PpKeyword::Ifndef) => {
                        // Opens a block; the target is back-patched by the
                        // matching #elif/#else/#endif.
                        open_conds.push(ppcond.len());
                        ppcond.push((hash_off, 0));
                    }
                    Some(PpKeyword::Elif | PpKeyword::Else) => {
                        // Closes the previous block and opens a new one.
                        let index = ppcond.len();
                        let open = open_conds
                            .pop()
                            .expect("unbalanced preprocessor conditionals");
                        assert_eq!(ppcond[open].1, 0, "conditional target patched twice");
                        ppcond[open].1 = index as u32;
                        ppcond.push((hash_off, 0));
                        open_conds.push(index);
                    }
                    Some(PpKeyword::Endif) => {
                        let index = ppcond.len();
                        let open = open_conds
                            .pop()
                            .expect("unbalanced preprocessor conditionals");
                        assert_eq!(ppcond[open].1, 0, "conditional target patched twice");
                        ppcond[open].1 = index as u32;
                        // The entry references itself until emission rewrites
                        // the target to the end-of-chain marker 0.
                        ppcond.push((hash_off, index as u32));
                        self.emit_token(&tok)?;

                        // Some files have gibberish on the same line as the
                        // #endif; discard it. The token in hand is processed
                        // without lexing a fresh one.
                        loop {
                            tok = lexer.lex();
                            if tok.kind == TokenKind::Eof || tok.is_at_start_of_line() {
                                break;
                            }
                        }
                        continue;
                    }
                    _ => {}
                }
            }

            self.emit_token(&tok)?;
            if tok.kind == TokenKind::Eof {
                break;
            }
            tok = lexer.lex();
        }

        assert!(
            open_conds.is_empty(),
            "unbalanced preprocessor conditionals"
        );

        let ppcond_off = self.out.offset();
        self.out.emit_u32(ppcond.len() as u32)?;
        for (index, &(hash_off, target)) in ppcond.iter().enumerate() {
            self.out.emit_u32(hash_off - token_off)?;
            assert_ne!(target, 0, "conditional target never patched");
            // Terminal #endif entries reference themselves in memory; on
            // disk the reader expects 0 as the end-of-chain marker.
            self.out
                .emit_u32(if target as usize == index { 0 } else { target })?;
        }

        Ok(PthEntry {
            token_off,
            ppcond_off,
        })
    }

    /// Emits one 12-byte token record.
    fn emit_token(&mut self, tok: &Token) -> std::io::Result<()> {
        debug_assert!(tok.len >> 16 == 0);
        self.out.emit_u32(
            tok.kind as u32 | u32::from(tok.flags.bits()) << 8 | tok.len << 16,
        )?;

        if tok.kind.is_literal() {
            // Literals store a spelling-pool offset instead of an identifier.
            let spelling = self.pp.spelling(tok);
            let offset = self.spellings.resolve(&spelling);
            self.out.emit_u32(offset)?;
        } else {
            self.out.emit_u32(self.idents.resolve(tok.ident))?;
        }

        self.out.emit_u32(self.sm.file_offset(tok.loc))?;
        Ok(())
    }

    /// Emits the two identifier tables and returns
    /// `(id_table_off, name_table_off)`.
    ///
    /// The name hash table goes out first: emitting its keys records the
    /// per-name offsets that the ID-indexed table is then built from.
    fn emit_identifier_table(&mut self) -> std::io::Result<(u32, u32)> {
        let mut table = HashTableBuilder::<IdentTableInfo>::new();
        for (index, ident) in self.idents.iter().enumerate() {
            let key = PthIdKey {
                name: self.pp.identifier_name(ident).into(),
                name_offset: 0,
            };
            table.insert(key, index as u32 + 1);
        }

        let name_table_off = table.emit(&mut self.out)?;

        let mut name_offsets = vec![0u32; table.len()];
        for (key, &id) in table.entries() {
            name_offsets[id as usize - 1] = key.name_offset;
        }

        let id_table_off = self.out.offset();
        self.out.emit_u32(self.idents.len() as u32)?;
        for offset in name_offsets {
            self.out.emit_u32(offset)?;
        }

        Ok((id_table_off, name_table_off))
    }
}

/// Writes a PTH artifact for every absolute-path file cached in `sm`.
///
/// The preprocessor must already have walked the translation unit so that the
/// source manager holds every file the artifact should cover. The caller owns
/// opening and closing the sink.
pub fn write_pth<W, P, S>(pp: &mut P, sm: &S, out: W) -> Result<()>
where
    W: Write + Seek,
    P: Preprocessor,
    S: SourceManager,
{
    PthWriter::new(out, pp, sm).generate()
}
