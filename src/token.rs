//! Raw tokens and the identifiers attached to them.

use bitflags::bitflags;

/// The kind of a raw token.
///
/// Discriminants are stable: token records serialize the raw value, and a
/// reader replaying a stream interprets it against this table.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum TokenKind {
    Unknown = 0,
    /// End of file.
    Eof = 1,
    /// End of a preprocessor directive. Never produced by a raw lexer; the
    /// writer synthesizes one at the end of every directive line.
    Eod = 2,
    Comment = 3,
    Identifier = 4,
    NumericConstant = 5,
    CharConstant = 6,
    StringLiteral = 7,
    /// A `<header-name>` lexed in include-filename mode.
    AngleStringLiteral = 8,

    LParen = 9,
    RParen = 10,
    LSquare = 11,
    RSquare = 12,
    LBrace = 13,
    RBrace = 14,
    Period = 15,
    Ellipsis = 16,
    Amp = 17,
    AmpAmp = 18,
    AmpEqual = 19,
    Star = 20,
    StarEqual = 21,
    Plus = 22,
    PlusPlus = 23,
    PlusEqual = 24,
    Minus = 25,
    Arrow = 26,
    MinusMinus = 27,
    MinusEqual = 28,
    Tilde = 29,
    Exclaim = 30,
    ExclaimEqual = 31,
    Slash = 32,
    SlashEqual = 33,
    Percent = 34,
    PercentEqual = 35,
    Less = 36,
    LessLess = 37,
    LessEqual = 38,
    LessLessEqual = 39,
    Greater = 40,
    GreaterGreater = 41,
    GreaterEqual = 42,
    GreaterGreaterEqual = 43,
    Caret = 44,
    CaretEqual = 45,
    Pipe = 46,
    PipePipe = 47,
    PipeEqual = 48,
    Question = 49,
    Colon = 50,
    Semi = 51,
    Equal = 52,
    EqualEqual = 53,
    Comma = 54,
    Hash = 55,
    HashHash = 56,
}

impl TokenKind {
    /// Whether tokens of this kind carry a cached spelling instead of an
    /// identifier reference.
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::NumericConstant
                | TokenKind::CharConstant
                | TokenKind::StringLiteral
                | TokenKind::AngleStringLiteral
        )
    }
}

bitflags! {
    /// Per-token flag bits, serialized as the second byte of a token record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TokenFlags: u8 {
        /// The token is the first on a physical source line.
        const START_OF_LINE = 1 << 0;
        /// The token is preceded by whitespace.
        const LEADING_SPACE = 1 << 1;
        /// Macro expansion is disabled for this token.
        const DISABLE_EXPAND = 1 << 2;
        /// The token spelling contains escaped newlines or trigraphs.
        const NEEDS_CLEANING = 1 << 3;
    }
}

/// An opaque identifier handle minted by the preprocessor.
///
/// The writer compares handles by identity only; the handle's name and
/// keyword classification are queried through
/// [`Preprocessor`](crate::Preprocessor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdentId(u32);

impl IdentId {
    /// Creates a handle from the preprocessor's raw value.
    pub const fn new(raw: u32) -> Self {
        IdentId(raw)
    }

    /// The raw value this handle was created from.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// An opaque source location minted by the source manager.
///
/// The writer never interprets the value; it only passes it back to
/// [`SourceManager::file_offset`](crate::SourceManager::file_offset).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation(u32);

impl SourceLocation {
    /// Creates a location from the source manager's raw encoding.
    pub const fn new(raw: u32) -> Self {
        SourceLocation(raw)
    }

    /// The raw encoding this location was created from.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// A single raw token, as handed out by a [`RawLexer`](crate::RawLexer).
#[derive(Debug, Clone, Copy)]
pub struct Token {
    /// The token kind.
    pub kind: TokenKind,
    /// The token's flag bits.
    pub flags: TokenFlags,
    /// The token length in source bytes. Only 16 bits are serialized.
    pub len: u32,
    /// The location of the token's first byte.
    pub loc: SourceLocation,
    /// The interned identifier, once the writer has looked it up.
    pub ident: Option<IdentId>,
}

impl Token {
    /// Whether the token is the first on its physical source line.
    pub fn is_at_start_of_line(&self) -> bool {
        self.flags.contains(TokenFlags::START_OF_LINE)
    }
}

/// Directive keywords recognized after a `#` at the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum PpKeyword {
    If,
    Ifdef,
    Ifndef,
    Elif,
    Else,
    Endif,
    Include,
    IncludeNext,
    Import,
    Define,
    Undef,
    Line,
    Error,
    Warning,
    Pragma,
}

impl PpKeyword {
    /// Classifies an identifier name as a directive keyword.
    pub fn from_name(name: &[u8]) -> Option<PpKeyword> {
        Some(match name {
            b"if" => PpKeyword::If,
            b"ifdef" => PpKeyword::Ifdef,
            b"ifndef" => PpKeyword::Ifndef,
            b"elif" => PpKeyword::Elif,
            b"else" => PpKeyword::Else,
            b"endif" => PpKeyword::Endif,
            b"include" => PpKeyword::Include,
            b"include_next" => PpKeyword::IncludeNext,
            b"import" => PpKeyword::Import,
            b"define" => PpKeyword::Define,
            b"undef" => PpKeyword::Undef,
            b"line" => PpKeyword::Line,
            b"error" => PpKeyword::Error,
            b"warning" => PpKeyword::Warning,
            b"pragma" => PpKeyword::Pragma,
            _ => return None,
        })
    }
}
