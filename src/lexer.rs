//! Hand-written SystemVerilog scanner.
//!
//! Produces the full token stream, trivia included, so that a lexical
//! re-emit of the stream reproduces the input byte-for-byte. Macro call
//! arguments and ``define` bodies are captured raw (`MacroArg`,
//! `PpDefineBody`) and re-lexed by consumers that need to look inside them.
//! Anything unrecognized becomes a `LexicalError` token; the scanner never
//! fails.

use crate::token::{ByteRange, Keyword, Punct, Token, TokenKind};

/// Lex an entire buffer. The returned stream always ends with a zero-width
/// `Eof` token.
pub fn lex(source: &str) -> Vec<Token> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    loop {
        let tok = lexer.next_token();
        let eof = tok.is_eof();
        tokens.push(tok);
        if eof {
            break;
        }
    }
    tokens
}

/// Lex and drop trivia; keeps the trailing `Eof`.
pub fn lex_significant(source: &str) -> Vec<Token> {
    lex(source)
        .into_iter()
        .filter(|t| !t.kind.is_trivia())
        .collect()
}

/// Classification of a free-standing word, used by the obfuscator to check
/// generated identifiers against the keyword table.
pub fn classify_word(word: &str) -> TokenKind {
    let tokens = lex(word);
    match tokens.as_slice() {
        [only, eof] if eof.is_eof() && only.span.len() == word.len() => only.kind,
        _ => TokenKind::LexicalError,
    }
}

// Directive context: some tokens change how the next words are classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    None,
    // After `define: expecting the macro name.
    DefineName,
    // After the macro name: formal parameter list if '(' is adjacent,
    // otherwise the raw body.
    DefineFormalsOrBody,
    // Inside the formal parameter list; counts unbalanced '('.
    DefineFormals(u32),
    // Raw body capture up to an unescaped newline.
    DefineBody,
    // After `ifdef / `ifndef / `elsif: expecting a PP identifier.
    PpIdent,
    // After `undef: expecting a macro identifier item.
    UndefIdent,
}

struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    pending: Pending,
    // Queued tokens from macro-call argument splitting.
    queue: std::collections::VecDeque<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            pending: Pending::None,
            queue: std::collections::VecDeque::new(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token::new(kind, ByteRange::new(start, self.pos))
    }

    fn next_token(&mut self) -> Token {
        if let Some(tok) = self.queue.pop_front() {
            return tok;
        }

        let start = self.pos;
        let Some(c) = self.peek() else {
            return Token::new(TokenKind::Eof, ByteRange::empty_at(self.pos));
        };

        // Directive-following context.
        match self.pending {
            Pending::None => {}
            Pending::DefineName => {
                if c == b' ' || c == b'\t' {
                    return self.scan_whitespace(start);
                }
                if is_ident_start(c) {
                    self.consume_ident_chars();
                    self.pending = Pending::DefineFormalsOrBody;
                    return self.token(TokenKind::PpIdentifier, start);
                }
                // Malformed directive; fall back to normal scanning.
                self.pending = Pending::None;
            }
            Pending::DefineFormalsOrBody => {
                if c == b'(' {
                    self.pos += 1;
                    self.pending = Pending::DefineFormals(1);
                    return self.token(TokenKind::Punct(Punct::LParen), start);
                }
                self.pending = Pending::DefineBody;
                return self.next_token();
            }
            Pending::DefineFormals(depth) => {
                if c == b'(' {
                    self.pos += 1;
                    self.pending = Pending::DefineFormals(depth + 1);
                    return self.token(TokenKind::Punct(Punct::LParen), start);
                }
                if c == b')' {
                    self.pos += 1;
                    self.pending = if depth <= 1 {
                        Pending::DefineBody
                    } else {
                        Pending::DefineFormals(depth - 1)
                    };
                    return self.token(TokenKind::Punct(Punct::RParen), start);
                }
                if c == b'\n' || c == b'\r' {
                    // Unterminated formal list; give up on the directive.
                    self.pending = Pending::None;
                }
                // Otherwise scan the formal tokens normally.
            }
            Pending::DefineBody => {
                self.pending = Pending::None;
                return self.scan_define_body(start);
            }
            Pending::PpIdent | Pending::UndefIdent => {
                if c == b' ' || c == b'\t' {
                    return self.scan_whitespace(start);
                }
                let kind = if self.pending == Pending::PpIdent {
                    TokenKind::PpIdentifier
                } else {
                    TokenKind::MacroIdItem
                };
                self.pending = Pending::None;
                if is_ident_start(c) {
                    self.consume_ident_chars();
                    return self.token(kind, start);
                }
            }
        }

        match c {
            b' ' | b'\t' => self.scan_whitespace(start),
            b'\r' | b'\n' => self.scan_newline(start),
            b'/' => match self.peek_at(1) {
                Some(b'/') => self.scan_eol_comment(start),
                Some(b'*') => self.scan_block_comment(start),
                _ => self.scan_punct(start),
            },
            b'"' => self.scan_string(start),
            b'`' => self.scan_backtick(start),
            b'\\' => self.scan_backslash(start),
            b'$' => self.scan_dollar(start),
            b'\'' => self.scan_apostrophe(start),
            b'0'..=b'9' => self.scan_number(start),
            c if is_ident_start(c) => self.scan_identifier(start),
            _ => self.scan_punct(start),
        }
    }

    fn scan_whitespace(&mut self, start: usize) -> Token {
        while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            self.pos += 1;
        }
        self.token(TokenKind::Whitespace, start)
    }

    fn scan_newline(&mut self, start: usize) -> Token {
        if self.peek() == Some(b'\r') {
            self.pos += 1;
        }
        if self.peek() == Some(b'\n') {
            self.pos += 1;
        }
        // A newline ends any directive context.
        self.pending = Pending::None;
        self.token(TokenKind::Newline, start)
    }

    fn scan_eol_comment(&mut self, start: usize) -> Token {
        while let Some(c) = self.peek() {
            if c == b'\n' || c == b'\r' {
                break;
            }
            self.pos += 1;
        }
        self.token(TokenKind::EolComment, start)
    }

    fn scan_block_comment(&mut self, start: usize) -> Token {
        self.pos += 2; // "/*"
        while self.pos < self.bytes.len() {
            if self.bytes[self.pos] == b'*' && self.peek_at(1) == Some(b'/') {
                self.pos += 2;
                return self.token(TokenKind::BlockComment, start);
            }
            self.pos += 1;
        }
        // Unterminated comment swallows the rest of the buffer.
        self.token(TokenKind::LexicalError, start)
    }

    fn scan_string(&mut self, start: usize) -> Token {
        self.pos += 1; // opening quote
        while let Some(c) = self.peek() {
            match c {
                b'\\' => {
                    self.pos += 1;
                    if self.peek().is_some() {
                        self.pos += 1;
                    }
                }
                b'"' => {
                    self.pos += 1;
                    return self.token(TokenKind::StringLiteral, start);
                }
                b'\n' => break,
                _ => self.pos += 1,
            }
        }
        self.token(TokenKind::LexicalError, start)
    }

    fn scan_backtick(&mut self, start: usize) -> Token {
        self.pos += 1; // '`'
        if !self.peek().is_some_and(is_ident_start) {
            return self.token(TokenKind::LexicalError, start);
        }
        let word_start = self.pos;
        self.consume_ident_chars();
        let word = &self.src[word_start..self.pos];
        let kind = match word {
            "define" => {
                self.pending = Pending::DefineName;
                TokenKind::PpDefine
            }
            "include" => TokenKind::PpInclude,
            "ifdef" => {
                self.pending = Pending::PpIdent;
                TokenKind::PpIfdef
            }
            "ifndef" => {
                self.pending = Pending::PpIdent;
                TokenKind::PpIfndef
            }
            "elsif" => {
                self.pending = Pending::PpIdent;
                TokenKind::PpElsif
            }
            "else" => TokenKind::PpElse,
            "endif" => TokenKind::PpEndif,
            "undef" => {
                self.pending = Pending::UndefIdent;
                TokenKind::PpUndef
            }
            _ => {
                if self.peek() == Some(b'(') {
                    let call = self.token(TokenKind::MacroCallId, start);
                    self.queue_macro_call_args();
                    return call;
                }
                TokenKind::MacroIdentifier
            }
        };
        self.token(kind, start)
    }

    // After a MacroCallId: queue '(', raw args split on top-level commas, ')'.
    fn queue_macro_call_args(&mut self) {
        let lparen_start = self.pos;
        self.pos += 1;
        self.queue.push_back(Token::new(
            TokenKind::Punct(Punct::LParen),
            ByteRange::new(lparen_start, self.pos),
        ));

        let mut depth: u32 = 0;
        let mut arg_start = self.pos;
        loop {
            let Some(c) = self.peek() else {
                // Unterminated call; emit whatever is left as one argument.
                if self.pos > arg_start {
                    self.queue.push_back(Token::new(
                        TokenKind::MacroArg,
                        ByteRange::new(arg_start, self.pos),
                    ));
                }
                return;
            };
            match c {
                b'(' | b'[' | b'{' => {
                    depth += 1;
                    self.pos += 1;
                }
                b']' | b'}' => {
                    depth = depth.saturating_sub(1);
                    self.pos += 1;
                }
                b')' => {
                    if depth == 0 {
                        if self.pos > arg_start {
                            self.queue.push_back(Token::new(
                                TokenKind::MacroArg,
                                ByteRange::new(arg_start, self.pos),
                            ));
                        }
                        let rparen_start = self.pos;
                        self.pos += 1;
                        self.queue.push_back(Token::new(
                            TokenKind::Punct(Punct::RParen),
                            ByteRange::new(rparen_start, self.pos),
                        ));
                        return;
                    }
                    depth -= 1;
                    self.pos += 1;
                }
                b',' if depth == 0 => {
                    if self.pos > arg_start {
                        self.queue.push_back(Token::new(
                            TokenKind::MacroArg,
                            ByteRange::new(arg_start, self.pos),
                        ));
                    }
                    let comma_start = self.pos;
                    self.pos += 1;
                    self.queue.push_back(Token::new(
                        TokenKind::Punct(Punct::Comma),
                        ByteRange::new(comma_start, self.pos),
                    ));
                    arg_start = self.pos;
                }
                b'"' => {
                    // Skip strings atomically so commas inside them do not split.
                    self.pos += 1;
                    while let Some(sc) = self.peek() {
                        match sc {
                            b'\\' => {
                                self.pos += 1;
                                if self.peek().is_some() {
                                    self.pos += 1;
                                }
                            }
                            b'"' => {
                                self.pos += 1;
                                break;
                            }
                            _ => self.pos += 1,
                        }
                    }
                }
                _ => self.pos += 1,
            }
        }
    }

    // Raw `define body up to an unescaped newline; backslash continuations
    // (and their newlines) are part of the body.
    fn scan_define_body(&mut self, start: usize) -> Token {
        loop {
            match self.peek() {
                None => break,
                Some(b'\n') | Some(b'\r') => break,
                Some(b'\\') => {
                    match self.peek_at(1) {
                        Some(b'\n') => self.pos += 2,
                        Some(b'\r') if self.peek_at(2) == Some(b'\n') => self.pos += 3,
                        _ => self.pos += 1,
                    };
                }
                Some(_) => self.pos += 1,
            }
        }
        if self.pos == start {
            // Empty body: nothing to emit, continue with the newline.
            return self.next_token();
        }
        self.token(TokenKind::PpDefineBody, start)
    }

    fn scan_backslash(&mut self, start: usize) -> Token {
        self.pos += 1;
        match self.peek() {
            Some(b'\n') => {
                self.pos += 1;
                self.token(TokenKind::LineContinuation, start)
            }
            Some(b'\r') if self.peek_at(1) == Some(b'\n') => {
                self.pos += 2;
                self.token(TokenKind::LineContinuation, start)
            }
            Some(c) if !c.is_ascii_whitespace() => {
                // Escaped identifier: backslash plus non-whitespace run.
                while self.peek().is_some_and(|c| !c.is_ascii_whitespace()) {
                    self.pos += 1;
                }
                self.token(TokenKind::EscapedIdentifier, start)
            }
            _ => self.token(TokenKind::LexicalError, start),
        }
    }

    fn scan_dollar(&mut self, start: usize) -> Token {
        self.pos += 1;
        if self.peek().is_some_and(is_ident_start) {
            self.consume_ident_chars();
            self.token(TokenKind::SystemTfIdentifier, start)
        } else {
            self.token(TokenKind::LexicalError, start)
        }
    }

    // Apostrophe begins unsized based literals ('hFF) and unbased numbers ('0).
    fn scan_apostrophe(&mut self, start: usize) -> Token {
        self.pos += 1;
        let mut ahead = 0;
        if matches!(self.peek(), Some(b's') | Some(b'S')) {
            ahead = 1;
        }
        if self.peek_at(ahead).is_some_and(is_base_char) {
            self.pos += ahead + 1;
            self.consume_based_digits();
            return self.token(TokenKind::Number, start);
        }
        if ahead == 0
            && self
                .peek()
                .is_some_and(|c| matches!(c, b'0' | b'1' | b'x' | b'X' | b'z' | b'Z'))
            && !self.peek_at(1).is_some_and(is_ident_char)
        {
            self.pos += 1;
            return self.token(TokenKind::UnbasedNumber, start);
        }
        self.token(TokenKind::LexicalError, start)
    }

    fn scan_number(&mut self, start: usize) -> Token {
        while self.peek().is_some_and(|c| c.is_ascii_digit() || c == b'_') {
            self.pos += 1;
        }
        // Sized based literal: 4'b1010
        if self.peek() == Some(b'\'') {
            let mut ahead = 1;
            if matches!(self.peek_at(1), Some(b's') | Some(b'S')) {
                ahead = 2;
            }
            if self.peek_at(ahead).is_some_and(is_base_char) {
                self.pos += ahead + 1;
                self.consume_based_digits();
                return self.token(TokenKind::Number, start);
            }
        }
        // Fraction and exponent.
        if self.peek() == Some(b'.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit() || c == b'_') {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E'))
            && (self.peek_at(1).is_some_and(|c| c.is_ascii_digit())
                || (matches!(self.peek_at(1), Some(b'+') | Some(b'-'))
                    && self.peek_at(2).is_some_and(|c| c.is_ascii_digit())))
        {
            self.pos += 1;
            if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                self.pos += 1;
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        // Time unit suffix.
        for unit in ["fs", "ps", "ns", "us", "ms", "s"] {
            if self.src[self.pos..].starts_with(unit)
                && !self
                    .peek_at(unit.len())
                    .is_some_and(is_ident_char)
            {
                self.pos += unit.len();
                return self.token(TokenKind::TimeLiteral, start);
            }
        }
        self.token(TokenKind::Number, start)
    }

    fn scan_identifier(&mut self, start: usize) -> Token {
        self.consume_ident_chars();
        let text = &self.src[start..self.pos];
        match Keyword::from_ident(text) {
            Some(kw) => self.token(TokenKind::Keyword(kw), start),
            None => self.token(TokenKind::SymbolIdentifier, start),
        }
    }

    fn scan_punct(&mut self, start: usize) -> Token {
        use Punct::*;
        let two = |l: &Lexer| l.peek_at(1);
        let (punct, len) = match (self.peek().unwrap(), two(self)) {
            (b':', Some(b':')) => (ColonColon, 2),
            (b'<', Some(b'=')) => (LtEq, 2),
            (b'>', Some(b'=')) => (GtEq, 2),
            (b'=', Some(b'=')) => (EqEq, 2),
            (b'!', Some(b'=')) => (BangEq, 2),
            (b'<', Some(b'<')) => (LtLt, 2),
            (b'>', Some(b'>')) => (GtGt, 2),
            (b'&', Some(b'&')) => (AmpAmp, 2),
            (b'|', Some(b'|')) => (PipePipe, 2),
            (b'+', Some(b':')) => (PlusColon, 2),
            (b'-', Some(b':')) => (MinusColon, 2),
            (b';', _) => (Semicolon, 1),
            (b',', _) => (Comma, 1),
            (b'(', _) => (LParen, 1),
            (b')', _) => (RParen, 1),
            (b'[', _) => (LBracket, 1),
            (b']', _) => (RBracket, 1),
            (b'{', _) => (LBrace, 1),
            (b'}', _) => (RBrace, 1),
            (b':', _) => (Colon, 1),
            (b'.', _) => (Dot, 1),
            (b'#', _) => (Hash, 1),
            (b'@', _) => (At, 1),
            (b'?', _) => (Question, 1),
            (b'=', _) => (Eq, 1),
            (b'<', _) => (Lt, 1),
            (b'>', _) => (Gt, 1),
            (b'+', _) => (Plus, 1),
            (b'-', _) => (Minus, 1),
            (b'*', _) => (Star, 1),
            (b'/', _) => (Slash, 1),
            (b'%', _) => (Percent, 1),
            (b'^', _) => (Caret, 1),
            (b'&', _) => (Amp, 1),
            (b'|', _) => (Pipe, 1),
            (b'~', _) => (Tilde, 1),
            (b'!', _) => (Bang, 1),
            _ => {
                // Unknown byte; consume one UTF-8 scalar so we stay on a
                // character boundary.
                let ch_len = self.src[self.pos..]
                    .chars()
                    .next()
                    .map_or(1, |ch| ch.len_utf8());
                self.pos += ch_len;
                return self.token(TokenKind::LexicalError, start);
            }
        };
        self.pos += len;
        self.token(TokenKind::Punct(punct), start)
    }

    fn consume_ident_chars(&mut self) {
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
    }

    fn consume_based_digits(&mut self) {
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_hexdigit() || matches!(c, b'_' | b'x' | b'X' | b'z' | b'Z' | b'?'))
        {
            self.pos += 1;
        }
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_' || c == b'$'
}

fn is_base_char(c: u8) -> bool {
    matches!(c, b'b' | b'B' | b'o' | b'O' | b'd' | b'D' | b'h' | b'H')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Keyword, Punct, TokenKind};

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).into_iter().map(|t| t.kind).collect()
    }

    fn texts(source: &str) -> Vec<(TokenKind, String)> {
        lex(source)
            .into_iter()
            .map(|t| (t.kind, t.text(source).to_string()))
            .collect()
    }

    #[test]
    fn roundtrip_concatenation() {
        // The concatenation of all token texts reproduces the input.
        for src in [
            "module m; wire [1:0] w; endmodule\n",
            "`define FOO(a, b) (a + b)\nlocalparam x = `FOO(1, 2);\n",
            "// comment\n/* block */ assign y = 4'b1010;\n",
            "always @(posedge clk) q <= d;\n",
        ] {
            let joined: String = lex(src).iter().map(|t| t.text(src)).collect();
            assert_eq!(joined, src);
        }
    }

    #[test]
    fn keywords_and_identifiers() {
        let toks = texts("module foo;");
        assert_eq!(toks[0].0, TokenKind::Keyword(Keyword::Module));
        assert_eq!(toks[1].0, TokenKind::Whitespace);
        assert_eq!(toks[2], (TokenKind::SymbolIdentifier, "foo".to_string()));
        assert_eq!(toks[3].0, TokenKind::Punct(Punct::Semicolon));
    }

    #[test]
    fn based_and_unbased_numbers() {
        assert_eq!(kinds("4'b1010")[0], TokenKind::Number);
        assert_eq!(kinds("'hFF")[0], TokenKind::Number);
        assert_eq!(kinds("'0")[0], TokenKind::UnbasedNumber);
        assert_eq!(kinds("13'h0_F")[0], TokenKind::Number);
        assert_eq!(kinds("10ns")[0], TokenKind::TimeLiteral);
        assert_eq!(kinds("1.5e3")[0], TokenKind::Number);
    }

    #[test]
    fn comments() {
        let toks = texts("x // trailing\ny");
        assert_eq!(toks[2], (TokenKind::EolComment, "// trailing".to_string()));
        assert_eq!(toks[3].0, TokenKind::Newline);
        let toks = kinds("/* a\nb */x");
        assert_eq!(toks[0], TokenKind::BlockComment);
        assert_eq!(toks[1], TokenKind::SymbolIdentifier);
    }

    #[test]
    fn system_tf_and_escaped_identifiers() {
        assert_eq!(kinds("$display")[0], TokenKind::SystemTfIdentifier);
        let toks = texts("\\bus+idx rest");
        assert_eq!(
            toks[0],
            (TokenKind::EscapedIdentifier, "\\bus+idx".to_string())
        );
        assert_eq!(toks[2].0, TokenKind::SymbolIdentifier);
    }

    #[test]
    fn macro_definition_with_body() {
        let src = "`define WIDTH 8\n";
        let toks = texts(src);
        assert_eq!(toks[0].0, TokenKind::PpDefine);
        assert_eq!(toks[2], (TokenKind::PpIdentifier, "WIDTH".to_string()));
        assert_eq!(toks[3], (TokenKind::PpDefineBody, " 8".to_string()));
        assert_eq!(toks[4].0, TokenKind::Newline);
    }

    #[test]
    fn macro_definition_with_formals() {
        let src = "`define MAX(a,b) ((a)>(b)?(a):(b))\n";
        let toks = texts(src);
        assert_eq!(toks[0].0, TokenKind::PpDefine);
        assert_eq!(toks[2], (TokenKind::PpIdentifier, "MAX".to_string()));
        assert_eq!(toks[3].0, TokenKind::Punct(Punct::LParen));
        assert_eq!(toks[4], (TokenKind::SymbolIdentifier, "a".to_string()));
        assert_eq!(toks[5].0, TokenKind::Punct(Punct::Comma));
        assert_eq!(toks[6], (TokenKind::SymbolIdentifier, "b".to_string()));
        assert_eq!(toks[7].0, TokenKind::Punct(Punct::RParen));
        assert_eq!(toks[8].0, TokenKind::PpDefineBody);
        assert_eq!(toks[8].1, " ((a)>(b)?(a):(b))");
    }

    #[test]
    fn macro_definition_with_continuation() {
        let src = "`define TWO_LINES first \\\nsecond\nwire w;\n";
        let toks = texts(src);
        let body = toks
            .iter()
            .find(|(k, _)| *k == TokenKind::PpDefineBody)
            .unwrap();
        assert_eq!(body.1, " first \\\nsecond");
    }

    #[test]
    fn macro_call_arguments() {
        let src = "`CHECK(a + b, \"x,y\")";
        let toks = texts(src);
        assert_eq!(toks[0], (TokenKind::MacroCallId, "`CHECK".to_string()));
        assert_eq!(toks[1].0, TokenKind::Punct(Punct::LParen));
        assert_eq!(toks[2], (TokenKind::MacroArg, "a + b".to_string()));
        assert_eq!(toks[3].0, TokenKind::Punct(Punct::Comma));
        assert_eq!(toks[4], (TokenKind::MacroArg, " \"x,y\"".to_string()));
        assert_eq!(toks[5].0, TokenKind::Punct(Punct::RParen));
    }

    #[test]
    fn macro_without_call_is_identifier() {
        let toks = texts("`WIDTH");
        assert_eq!(toks[0], (TokenKind::MacroIdentifier, "`WIDTH".to_string()));
    }

    #[test]
    fn conditional_directives() {
        let toks = texts("`ifdef SIM\n`else\n`endif\n");
        assert_eq!(toks[0].0, TokenKind::PpIfdef);
        assert_eq!(toks[2], (TokenKind::PpIdentifier, "SIM".to_string()));
        assert!(toks.iter().any(|(k, _)| *k == TokenKind::PpElse));
        assert!(toks.iter().any(|(k, _)| *k == TokenKind::PpEndif));
    }

    #[test]
    fn undef_item() {
        let toks = texts("`undef WIDTH\n");
        assert_eq!(toks[0].0, TokenKind::PpUndef);
        assert_eq!(toks[2], (TokenKind::MacroIdItem, "WIDTH".to_string()));
    }

    #[test]
    fn multi_char_punctuation() {
        let toks = kinds("a::b <= c");
        assert_eq!(toks[1], TokenKind::Punct(Punct::ColonColon));
        assert_eq!(toks[4], TokenKind::Punct(Punct::LtEq));
    }

    #[test]
    fn lexical_error_does_not_stop_scanning() {
        let toks = kinds("wire \u{00b5} w;");
        assert!(toks.contains(&TokenKind::LexicalError));
        assert_eq!(*toks.last().unwrap(), TokenKind::Eof);
    }

    #[test]
    fn classify_word_rejects_keywords() {
        assert_eq!(classify_word("mySignal"), TokenKind::SymbolIdentifier);
        assert_eq!(
            classify_word("module"),
            TokenKind::Keyword(Keyword::Module)
        );
        assert_eq!(classify_word("a b"), TokenKind::LexicalError);
    }
}
