//! Token model: kinds, byte spans, and line/column mapping.
//!
//! Tokens carry only their kind and byte span; text is recovered against the
//! owning source buffer. This keeps the syntax tree free of self-references
//! while still giving every consumer a zero-copy view of the source.

use std::fmt;

/// Half-open byte range `[start, end)` into a source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "inverted byte range {start}..{end}");
        Self { start, end }
    }

    pub fn empty_at(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }

    /// Two ranges overlap if they share at least one byte.
    pub fn overlaps(&self, other: &ByteRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn as_range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{})", self.start, self.end)
    }
}

/// Reserved words recognized by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Keyword {
    Module,
    Endmodule,
    Package,
    Endpackage,
    Class,
    Endclass,
    Interface,
    Endinterface,
    Function,
    Endfunction,
    Task,
    Endtask,
    Typedef,
    Parameter,
    Localparam,
    Wire,
    Reg,
    Logic,
    Int,
    Integer,
    Bit,
    Byte,
    StringType,
    Real,
    Time,
    Void,
    Signed,
    Unsigned,
    Struct,
    Enum,
    Packed,
    Generate,
    Endgenerate,
    Genvar,
    Begin,
    End,
    If,
    Else,
    For,
    Extends,
    Import,
    Input,
    Output,
    Inout,
    Always,
    AlwaysComb,
    AlwaysFf,
    Posedge,
    Negedge,
    Assign,
    Initial,
    Virtual,
    Static,
    Automatic,
    Const,
    Return,
}

impl Keyword {
    pub fn from_ident(text: &str) -> Option<Keyword> {
        use Keyword::*;
        Some(match text {
            "module" => Module,
            "endmodule" => Endmodule,
            "package" => Package,
            "endpackage" => Endpackage,
            "class" => Class,
            "endclass" => Endclass,
            "interface" => Interface,
            "endinterface" => Endinterface,
            "function" => Function,
            "endfunction" => Endfunction,
            "task" => Task,
            "endtask" => Endtask,
            "typedef" => Typedef,
            "parameter" => Parameter,
            "localparam" => Localparam,
            "wire" => Wire,
            "reg" => Reg,
            "logic" => Logic,
            "int" => Int,
            "integer" => Integer,
            "bit" => Bit,
            "byte" => Byte,
            "string" => StringType,
            "real" => Real,
            "time" => Time,
            "void" => Void,
            "signed" => Signed,
            "unsigned" => Unsigned,
            "struct" => Struct,
            "enum" => Enum,
            "packed" => Packed,
            "generate" => Generate,
            "endgenerate" => Endgenerate,
            "genvar" => Genvar,
            "begin" => Begin,
            "end" => End,
            "if" => If,
            "else" => Else,
            "for" => For,
            "extends" => Extends,
            "import" => Import,
            "input" => Input,
            "output" => Output,
            "inout" => Inout,
            "always" => Always,
            "always_comb" => AlwaysComb,
            "always_ff" => AlwaysFf,
            "posedge" => Posedge,
            "negedge" => Negedge,
            "assign" => Assign,
            "initial" => Initial,
            "virtual" => Virtual,
            "static" => Static,
            "automatic" => Automatic,
            "const" => Const,
            "return" => Return,
            _ => return None,
        })
    }

    /// True for keywords that begin a built-in data type.
    pub fn is_data_type(self) -> bool {
        use Keyword::*;
        matches!(
            self,
            Logic | Int | Integer | Bit | Byte | StringType | Real | Time | Void | Reg
        )
    }

    pub fn is_port_direction(self) -> bool {
        matches!(self, Keyword::Input | Keyword::Output | Keyword::Inout)
    }
}

/// Punctuation and operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Punct {
    Semicolon,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Colon,
    ColonColon,
    Dot,
    Hash,
    At,
    Question,
    Eq,
    EqEq,
    BangEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    LtLt,
    GtGt,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Amp,
    AmpAmp,
    Pipe,
    PipePipe,
    Tilde,
    Bang,
    PlusColon,
    MinusColon,
}

impl Punct {
    /// True for tokens usable as a binary operator in the loose expression
    /// grammar (assignment operators included).
    pub fn is_binary_operator(self) -> bool {
        use Punct::*;
        matches!(
            self,
            Eq | EqEq
                | BangEq
                | Lt
                | Gt
                | LtEq
                | GtEq
                | LtLt
                | GtGt
                | Plus
                | Minus
                | Star
                | Slash
                | Percent
                | Caret
                | Amp
                | AmpAmp
                | Pipe
                | PipePipe
                | Question
        )
    }

    pub fn is_unary_operator(self) -> bool {
        use Punct::*;
        matches!(self, Plus | Minus | Tilde | Bang | Amp | Pipe | Caret)
    }
}

/// Lexical classification of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenKind {
    Keyword(Keyword),
    Punct(Punct),

    // Identifiers.
    SymbolIdentifier,
    EscapedIdentifier,
    MacroIdentifier,
    MacroCallId,
    MacroIdItem,
    PpIdentifier,
    SystemTfIdentifier,

    // Literals.
    Number,
    UnbasedNumber,
    TimeLiteral,
    StringLiteral,

    // Preprocessor directives.
    PpIfdef,
    PpIfndef,
    PpElsif,
    PpElse,
    PpEndif,
    PpDefine,
    PpInclude,
    PpUndef,

    // Raw, un-lexed bodies; re-lexed on demand.
    MacroArg,
    PpDefineBody,

    // Trivia.
    EolComment,
    BlockComment,
    Whitespace,
    Newline,
    LineContinuation,

    LexicalError,
    Eof,
}

impl TokenKind {
    /// Whitespace, newlines, continuations, and comments: tokens the parser
    /// skips but the token stream retains.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace
                | TokenKind::Newline
                | TokenKind::LineContinuation
                | TokenKind::EolComment
                | TokenKind::BlockComment
        )
    }

    pub fn is_comment(self) -> bool {
        matches!(self, TokenKind::EolComment | TokenKind::BlockComment)
    }

    pub fn is_identifier_like(self) -> bool {
        matches!(
            self,
            TokenKind::SymbolIdentifier
                | TokenKind::EscapedIdentifier
                | TokenKind::MacroIdentifier
                | TokenKind::MacroCallId
                | TokenKind::MacroIdItem
                | TokenKind::PpIdentifier
                | TokenKind::SystemTfIdentifier
        )
    }

    pub fn is_preprocessor_directive(self) -> bool {
        matches!(
            self,
            TokenKind::PpIfdef
                | TokenKind::PpIfndef
                | TokenKind::PpElsif
                | TokenKind::PpElse
                | TokenKind::PpEndif
                | TokenKind::PpDefine
                | TokenKind::PpInclude
                | TokenKind::PpUndef
        )
    }
}

/// A lexed token: classification plus source byte span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token {
    pub kind: TokenKind,
    pub span: ByteRange,
}

impl Token {
    pub fn new(kind: TokenKind, span: ByteRange) -> Self {
        Self { kind, span }
    }

    /// View of this token's text in `source`. The token must have been lexed
    /// from the same buffer.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.as_range()]
    }

    pub fn offset(&self) -> usize {
        self.span.start
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

/// 1-based line and column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for LineColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Byte-offset to line/column translation, built once per buffer.
#[derive(Debug, Clone)]
pub struct LineColumnMap {
    // Byte offset at which each line starts; line_starts[0] == 0.
    line_starts: Vec<usize>,
}

impl LineColumnMap {
    pub fn new(content: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in content.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// 1-based line number containing `offset`.
    pub fn line_of(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset)
    }

    pub fn line_col(&self, offset: usize) -> LineColumn {
        let line = self.line_of(offset);
        let line_start = self.line_starts[line - 1];
        LineColumn {
            line,
            column: offset - line_start + 1,
        }
    }

    /// Byte offset of the start of a 1-based line, if the line exists.
    pub fn line_start(&self, line: usize) -> Option<usize> {
        self.line_starts.get(line.checked_sub(1)?).copied()
    }
}
