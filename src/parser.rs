//! Recursive-descent parser for the supported SystemVerilog subset.
//!
//! Consumes the significant token stream and produces the concrete syntax
//! tree consumed by lint rules and the symbol table builder. Unparseable
//! regions are skipped to a recovery point and preserved as `ErrorNode`
//! subtrees with a recorded diagnostic; a partial tree is always returned.

use crate::syntax::{NodeTag, Symbol, SyntaxTreeNode, leaf, node};
use crate::token::{ByteRange, Keyword, Punct, Token, TokenKind};

/// One parser diagnostic with its source span.
#[derive(Debug, Clone)]
pub struct SyntaxError {
    pub span: ByteRange,
    pub message: String,
}

/// Parse outcome: a `DescriptionList` root plus any recovery diagnostics.
#[derive(Debug)]
pub struct ParseResult {
    pub root: Symbol,
    pub errors: Vec<SyntaxError>,
}

/// Parse a significant token stream (see [`crate::lexer::lex_significant`])
/// lexed from `source`.
pub fn parse(source: &str, tokens: &[Token]) -> ParseResult {
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        errors: Vec::new(),
    };
    let root = parser.parse_description_list();
    ParseResult {
        root,
        errors: parser.errors,
    }
}

// Internal abort marker; recovery happens at item granularity.
struct ParseAbort;

type PResult<T> = Result<T, ParseAbort>;

struct Parser<'s, 't> {
    source: &'s str,
    tokens: &'t [Token],
    pos: usize,
    errors: Vec<SyntaxError>,
}

impl Parser<'_, '_> {
    // ------------------------------------------------------------------
    // Cursor utilities
    // ------------------------------------------------------------------

    fn peek(&self) -> Token {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> Token {
        let index = (self.pos + ahead).min(self.tokens.len().saturating_sub(1));
        self.tokens
            .get(index)
            .copied()
            .unwrap_or(Token::new(TokenKind::Eof, ByteRange::empty_at(0)))
    }

    fn at_eof(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek();
        if !self.at_eof() {
            self.pos += 1;
        }
        tok
    }

    fn text(&self, token: Token) -> &str {
        token.text(self.source)
    }

    fn at_punct(&self, p: Punct) -> bool {
        self.peek().kind == TokenKind::Punct(p)
    }

    fn at_keyword(&self, k: Keyword) -> bool {
        self.peek().kind == TokenKind::Keyword(k)
    }

    fn at_identifier(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::SymbolIdentifier | TokenKind::EscapedIdentifier
        )
    }

    fn eat_punct(&mut self, p: Punct) -> Option<Token> {
        self.at_punct(p).then(|| self.advance())
    }

    fn eat_keyword(&mut self, k: Keyword) -> Option<Token> {
        self.at_keyword(k).then(|| self.advance())
    }

    fn expect_punct(&mut self, p: Punct) -> PResult<Token> {
        match self.eat_punct(p) {
            Some(tok) => Ok(tok),
            None => {
                self.error_here(format!("expected {p:?}"));
                Err(ParseAbort)
            }
        }
    }

    fn expect_keyword(&mut self, k: Keyword) -> PResult<Token> {
        match self.eat_keyword(k) {
            Some(tok) => Ok(tok),
            None => {
                self.error_here(format!("expected keyword {k:?}"));
                Err(ParseAbort)
            }
        }
    }

    fn expect_identifier(&mut self) -> PResult<Token> {
        if self.at_identifier() {
            Ok(self.advance())
        } else {
            self.error_here("expected identifier".to_string());
            Err(ParseAbort)
        }
    }

    fn error_here(&mut self, message: String) {
        let span = self.peek().span;
        self.errors.push(SyntaxError { span, message });
    }

    // ------------------------------------------------------------------
    // Top level
    // ------------------------------------------------------------------

    fn parse_description_list(&mut self) -> Symbol {
        let mut list = SyntaxTreeNode::new(NodeTag::DescriptionList);
        while !self.at_eof() {
            let item = self.parse_item_with_recovery(&[]);
            list.push(item);
        }
        Symbol::Node(list)
    }

    // Parse one item; on failure, skip to a recovery point and wrap the
    // skipped tokens into an ErrorNode. `stop_keywords` are block enders the
    // recovery must not consume.
    fn parse_item_with_recovery(&mut self, stop_keywords: &[Keyword]) -> Symbol {
        let start = self.pos;
        match self.parse_item() {
            Ok(item) => item,
            Err(ParseAbort) => {
                let mut error = SyntaxTreeNode::new(NodeTag::ErrorNode);
                for i in start..self.pos {
                    error.push(leaf(self.tokens[i]));
                }
                loop {
                    if self.at_eof() {
                        break;
                    }
                    if let TokenKind::Keyword(k) = self.peek().kind
                        && (stop_keywords.contains(&k) || is_block_end_keyword(k))
                    {
                        break;
                    }
                    let tok = self.advance();
                    error.push(leaf(tok));
                    if tok.kind == TokenKind::Punct(Punct::Semicolon) {
                        break;
                    }
                }
                if error.children.is_empty() {
                    // Nothing consumed at all: drop one token to move on.
                    error.push(leaf(self.advance()));
                }
                Symbol::Node(error)
            }
        }
    }

    // Item dispatch shared by description level, module bodies, package
    // bodies, class bodies, and generate regions.
    fn parse_item(&mut self) -> PResult<Symbol> {
        match self.peek().kind {
            TokenKind::Keyword(Keyword::Module) => self.parse_module_like(
                Keyword::Module,
                Keyword::Endmodule,
                NodeTag::ModuleDeclaration,
            ),
            TokenKind::Keyword(Keyword::Interface) => self.parse_module_like(
                Keyword::Interface,
                Keyword::Endinterface,
                NodeTag::InterfaceDeclaration,
            ),
            TokenKind::Keyword(Keyword::Package) => self.parse_package(),
            TokenKind::Keyword(Keyword::Class) | TokenKind::Keyword(Keyword::Virtual) => {
                self.parse_class()
            }
            TokenKind::Keyword(Keyword::Function) => self.parse_routine(
                Keyword::Function,
                Keyword::Endfunction,
                NodeTag::FunctionDeclaration,
            ),
            TokenKind::Keyword(Keyword::Task) => {
                self.parse_routine(Keyword::Task, Keyword::Endtask, NodeTag::TaskDeclaration)
            }
            TokenKind::Keyword(Keyword::Typedef) => self.parse_typedef(),
            TokenKind::Keyword(Keyword::Parameter) | TokenKind::Keyword(Keyword::Localparam) => {
                self.parse_param_declaration()
            }
            TokenKind::Keyword(Keyword::Wire)
            | TokenKind::Keyword(Keyword::Genvar) => self.parse_net_declaration(),
            TokenKind::Keyword(Keyword::Assign) => self.parse_continuous_assign(),
            TokenKind::Keyword(Keyword::Always)
            | TokenKind::Keyword(Keyword::AlwaysComb)
            | TokenKind::Keyword(Keyword::AlwaysFf)
            | TokenKind::Keyword(Keyword::Initial) => self.parse_always_construct(),
            TokenKind::Keyword(Keyword::Generate) => self.parse_generate_region(),
            TokenKind::Keyword(Keyword::Begin) => self.parse_generate_block(),
            TokenKind::Keyword(Keyword::If) => self.parse_conditional_generate(),
            TokenKind::Keyword(Keyword::For) => self.parse_loop_generate(),
            TokenKind::Keyword(Keyword::Import) => self.parse_package_import(),
            TokenKind::Keyword(k) if k.is_data_type() || k == Keyword::Reg => {
                self.parse_data_declaration()
            }
            TokenKind::Keyword(Keyword::Enum) | TokenKind::Keyword(Keyword::Struct) => {
                self.parse_data_declaration()
            }
            TokenKind::SymbolIdentifier | TokenKind::EscapedIdentifier => {
                self.parse_identifier_led_item()
            }
            TokenKind::PpInclude => self.parse_include(),
            kind if kind.is_preprocessor_directive() => Ok(self.parse_preprocessor_directive()),
            TokenKind::MacroIdentifier | TokenKind::MacroCallId => {
                Ok(self.parse_macro_item())
            }
            TokenKind::Punct(Punct::Semicolon) => {
                let semi = self.advance();
                Ok(node(NodeTag::Statement, vec![Some(leaf(semi))]))
            }
            _ => {
                self.error_here(format!("unexpected token {:?}", self.peek().kind));
                Err(ParseAbort)
            }
        }
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    // module/interface: header, item list, end keyword, optional label.
    fn parse_module_like(
        &mut self,
        start_kw: Keyword,
        end_kw: Keyword,
        tag: NodeTag,
    ) -> PResult<Symbol> {
        let header = self.parse_module_header(start_kw)?;
        let items = self.parse_item_list(end_kw);
        let end = self.expect_keyword(end_kw)?;
        let label = self.parse_end_label();
        Ok(node(
            tag,
            vec![Some(header), Some(items), Some(leaf(end)), label],
        ))
    }

    fn parse_module_header(&mut self, start_kw: Keyword) -> PResult<Symbol> {
        let kw = self.expect_keyword(start_kw)?;
        let name = self.expect_identifier()?;
        let params = if self.at_punct(Punct::Hash) {
            Some(self.parse_formal_parameter_list()?)
        } else {
            None
        };
        let ports = if self.at_punct(Punct::LParen) {
            Some(self.parse_port_declaration_list()?)
        } else {
            None
        };
        let semi = self.expect_punct(Punct::Semicolon)?;
        Ok(node(
            NodeTag::ModuleHeader,
            vec![
                Some(leaf(kw)),
                Some(leaf(name)),
                params,
                ports,
                Some(leaf(semi)),
            ],
        ))
    }

    // #( [parameter] [type] name [= expr] {, ...} )
    fn parse_formal_parameter_list(&mut self) -> PResult<Symbol> {
        self.expect_punct(Punct::Hash)?;
        self.expect_punct(Punct::LParen)?;
        let mut list = SyntaxTreeNode::new(NodeTag::FormalParameterList);
        while !self.at_punct(Punct::RParen) && !self.at_eof() {
            let _ = self.eat_keyword(Keyword::Parameter);
            let _ = self.parse_optional_data_type_before_name();
            let assign = self.parse_param_assign()?;
            list.push(assign);
            if self.eat_punct(Punct::Comma).is_none() {
                break;
            }
        }
        self.expect_punct(Punct::RParen)?;
        Ok(Symbol::Node(list))
    }

    fn parse_port_declaration_list(&mut self) -> PResult<Symbol> {
        self.expect_punct(Punct::LParen)?;
        let mut list = SyntaxTreeNode::new(NodeTag::PortDeclarationList);
        while !self.at_punct(Punct::RParen) && !self.at_eof() {
            let port = self.parse_port_declaration()?;
            list.push(port);
            if self.eat_punct(Punct::Comma).is_none() {
                break;
            }
        }
        self.expect_punct(Punct::RParen)?;
        Ok(Symbol::Node(list))
    }

    // [direction] [type [packed]] name [unpacked]
    fn parse_port_declaration(&mut self) -> PResult<Symbol> {
        let direction = match self.peek().kind {
            TokenKind::Keyword(k) if k.is_port_direction() => Some(leaf(self.advance())),
            _ => None,
        };
        let data_type = self.parse_optional_data_type_before_name();
        let name = self.expect_identifier()?;
        let unpacked = if self.at_punct(Punct::LBracket) {
            Some(self.parse_dimensions(NodeTag::UnpackedDimensions)?)
        } else {
            None
        };
        Ok(node(
            NodeTag::PortDeclaration,
            vec![direction, data_type, Some(leaf(name)), unpacked],
        ))
    }

    // A data type is present before the name when the next token is a type
    // keyword, or an identifier followed by another identifier (user type).
    fn parse_optional_data_type_before_name(&mut self) -> Option<Symbol> {
        match self.peek().kind {
            TokenKind::Keyword(k) if k.is_data_type() || k == Keyword::Wire => {
                Some(self.parse_data_type().ok()?)
            }
            TokenKind::SymbolIdentifier | TokenKind::EscapedIdentifier => {
                let after_type = self.scan_reference_chain_length();
                match self.peek_at(after_type).kind {
                    TokenKind::SymbolIdentifier | TokenKind::EscapedIdentifier => {
                        Some(self.parse_data_type().ok()?)
                    }
                    _ => None,
                }
            }
            // Packed dimensions without a storage type, e.g. `input [3:0] a`.
            TokenKind::Punct(Punct::LBracket) => {
                let dims = self.parse_dimensions(NodeTag::PackedDimensions).ok()?;
                Some(node(NodeTag::DataType, vec![None, Some(dims)]))
            }
            _ => None,
        }
    }

    // Number of tokens a leading type reference (id or id::id chain) spans.
    fn scan_reference_chain_length(&self) -> usize {
        let mut length = 1;
        while self.peek_at(length).kind == TokenKind::Punct(Punct::ColonColon) {
            length += 2;
        }
        // A packed dimension can follow the type.
        if self.peek_at(length).kind == TokenKind::Punct(Punct::LBracket) {
            let mut depth = 0;
            loop {
                match self.peek_at(length).kind {
                    TokenKind::Punct(Punct::LBracket) => depth += 1,
                    TokenKind::Punct(Punct::RBracket) => {
                        depth -= 1;
                        if depth == 0 {
                            length += 1;
                            break;
                        }
                    }
                    TokenKind::Eof => break,
                    _ => {}
                }
                length += 1;
            }
        }
        length
    }

    // Built-in type keyword or user-defined type reference, with optional
    // packed dimensions.
    fn parse_data_type(&mut self) -> PResult<Symbol> {
        let type_symbol = match self.peek().kind {
            TokenKind::Keyword(k) if k.is_data_type() || k == Keyword::Wire || k == Keyword::Reg => {
                leaf(self.advance())
            }
            TokenKind::SymbolIdentifier | TokenKind::EscapedIdentifier => {
                self.parse_reference(false)?
            }
            _ => {
                self.error_here("expected data type".to_string());
                return Err(ParseAbort);
            }
        };
        let packed = if self.at_punct(Punct::LBracket) {
            Some(self.parse_dimensions(NodeTag::PackedDimensions)?)
        } else {
            None
        };
        Ok(node(NodeTag::DataType, vec![Some(type_symbol), packed]))
    }

    // [ expr [: expr] ] — one bracket group.
    fn parse_dimensions(&mut self, tag: NodeTag) -> PResult<Symbol> {
        let open = self.expect_punct(Punct::LBracket)?;
        let mut dims = SyntaxTreeNode::new(tag);
        dims.push(leaf(open));
        if !self.at_punct(Punct::RBracket) {
            let first = self.parse_expression()?;
            dims.push(first);
            if let Some(colon) = self.eat_punct(Punct::Colon) {
                dims.push(leaf(colon));
                let second = self.parse_expression()?;
                dims.push(second);
            }
        }
        let close = self.expect_punct(Punct::RBracket)?;
        dims.push(leaf(close));
        Ok(Symbol::Node(dims))
    }

    fn parse_package(&mut self) -> PResult<Symbol> {
        let kw = self.expect_keyword(Keyword::Package)?;
        let name = self.expect_identifier()?;
        let semi = self.expect_punct(Punct::Semicolon)?;
        let items = self.parse_item_list(Keyword::Endpackage);
        let end = self.expect_keyword(Keyword::Endpackage)?;
        let label = self.parse_end_label();
        Ok(node(
            NodeTag::PackageDeclaration,
            vec![
                Some(leaf(kw)),
                Some(leaf(name)),
                Some(leaf(semi)),
                Some(items),
                Some(leaf(end)),
                label,
            ],
        ))
    }

    fn parse_class(&mut self) -> PResult<Symbol> {
        let virtual_kw = self.eat_keyword(Keyword::Virtual).map(leaf);
        let kw = self.expect_keyword(Keyword::Class)?;
        let name = self.expect_identifier()?;
        let extends = if self.at_keyword(Keyword::Extends) {
            let ext_kw = self.advance();
            let base = self.parse_reference(false)?;
            Some(node(
                NodeTag::ExtendsClause,
                vec![Some(leaf(ext_kw)), Some(base)],
            ))
        } else {
            None
        };
        let semi = self.expect_punct(Punct::Semicolon)?;
        let items = self.parse_item_list(Keyword::Endclass);
        let end = self.expect_keyword(Keyword::Endclass)?;
        let label = self.parse_end_label();
        Ok(node(
            NodeTag::ClassDeclaration,
            vec![
                virtual_kw,
                Some(leaf(kw)),
                Some(leaf(name)),
                extends,
                Some(leaf(semi)),
                Some(items),
                Some(leaf(end)),
                label,
            ],
        ))
    }

    // function/task declarations, including out-of-line `C::m` names.
    fn parse_routine(
        &mut self,
        start_kw: Keyword,
        end_kw: Keyword,
        tag: NodeTag,
    ) -> PResult<Symbol> {
        let kw = self.expect_keyword(start_kw)?;
        let _ = self.eat_keyword(Keyword::Automatic);
        let _ = self.eat_keyword(Keyword::Static);

        // Disambiguate return type from routine name: parse an optional
        // leading type only when another identifier (the name) follows it.
        let return_type = match self.peek().kind {
            TokenKind::Keyword(k) if k.is_data_type() => Some(self.parse_data_type()?),
            TokenKind::SymbolIdentifier | TokenKind::EscapedIdentifier => {
                let after = self.scan_reference_chain_length();
                if matches!(
                    self.peek_at(after).kind,
                    TokenKind::SymbolIdentifier | TokenKind::EscapedIdentifier
                ) {
                    Some(self.parse_data_type()?)
                } else {
                    None
                }
            }
            _ => None,
        };

        // Name: plain identifier or qualified id for out-of-line bodies.
        let name = if self.peek_at(1).kind == TokenKind::Punct(Punct::ColonColon) {
            self.parse_qualified_id()?
        } else {
            leaf(self.expect_identifier()?)
        };

        let ports = if self.at_punct(Punct::LParen) {
            Some(self.parse_port_declaration_list()?)
        } else {
            None
        };
        self.expect_punct(Punct::Semicolon)?;
        let body = self.parse_statement_list(end_kw);
        let end = self.expect_keyword(end_kw)?;
        let label = self.parse_end_label();
        Ok(node(
            tag,
            vec![
                Some(leaf(kw)),
                return_type,
                Some(name),
                ports,
                Some(body),
                Some(leaf(end)),
                label,
            ],
        ))
    }

    fn parse_typedef(&mut self) -> PResult<Symbol> {
        let kw = self.expect_keyword(Keyword::Typedef)?;
        let base = match self.peek().kind {
            TokenKind::Keyword(Keyword::Enum) => self.parse_enum_type()?,
            TokenKind::Keyword(Keyword::Struct) => self.parse_struct_type()?,
            _ => self.parse_data_type()?,
        };
        let name = self.expect_identifier()?;
        let semi = self.expect_punct(Punct::Semicolon)?;
        Ok(node(
            NodeTag::TypedefDeclaration,
            vec![Some(leaf(kw)), Some(base), Some(leaf(name)), Some(leaf(semi))],
        ))
    }

    fn parse_enum_type(&mut self) -> PResult<Symbol> {
        let kw = self.expect_keyword(Keyword::Enum)?;
        let base = match self.peek().kind {
            TokenKind::Keyword(k) if k.is_data_type() => Some(self.parse_data_type()?),
            _ => None,
        };
        self.expect_punct(Punct::LBrace)?;
        let mut enum_node = SyntaxTreeNode::new(NodeTag::EnumType);
        enum_node.push(leaf(kw));
        enum_node.push_slot(base);
        while !self.at_punct(Punct::RBrace) && !self.at_eof() {
            let name = self.expect_identifier()?;
            let value = if self.eat_punct(Punct::Eq).is_some() {
                Some(self.parse_expression()?)
            } else {
                None
            };
            enum_node.push(node(
                NodeTag::EnumName,
                vec![Some(leaf(name)), value],
            ));
            if self.eat_punct(Punct::Comma).is_none() {
                break;
            }
        }
        self.expect_punct(Punct::RBrace)?;
        Ok(Symbol::Node(enum_node))
    }

    fn parse_struct_type(&mut self) -> PResult<Symbol> {
        let kw = self.expect_keyword(Keyword::Struct)?;
        let packed = self.eat_keyword(Keyword::Packed).map(leaf);
        self.expect_punct(Punct::LBrace)?;
        let mut struct_node = SyntaxTreeNode::new(NodeTag::StructType);
        struct_node.push(leaf(kw));
        struct_node.push_slot(packed);
        while !self.at_punct(Punct::RBrace) && !self.at_eof() {
            let member = self.parse_data_declaration()?;
            struct_node.push(member);
        }
        self.expect_punct(Punct::RBrace)?;
        Ok(Symbol::Node(struct_node))
    }

    // parameter/localparam [type] name = expr {, name = expr} ;
    fn parse_param_declaration(&mut self) -> PResult<Symbol> {
        let kw = self.advance();
        let data_type = self.parse_optional_data_type_before_name();
        let mut decl = SyntaxTreeNode::new(NodeTag::ParamDeclaration);
        decl.push(leaf(kw));
        decl.push_slot(data_type);
        loop {
            let assign = self.parse_param_assign()?;
            decl.push(assign);
            if self.eat_punct(Punct::Comma).is_none() {
                break;
            }
        }
        let semi = self.expect_punct(Punct::Semicolon)?;
        decl.push(leaf(semi));
        Ok(Symbol::Node(decl))
    }

    fn parse_param_assign(&mut self) -> PResult<Symbol> {
        let name = self.expect_identifier()?;
        let (eq, value) = if let Some(eq) = self.eat_punct(Punct::Eq) {
            (Some(leaf(eq)), Some(self.parse_expression()?))
        } else {
            (None, None)
        };
        Ok(node(
            NodeTag::ParamAssign,
            vec![Some(leaf(name)), eq, value],
        ))
    }

    // wire/genvar declarations with packed dimensions before the names.
    fn parse_net_declaration(&mut self) -> PResult<Symbol> {
        let kw = self.advance();
        let packed = if self.at_punct(Punct::LBracket) {
            Some(self.parse_dimensions(NodeTag::PackedDimensions)?)
        } else {
            None
        };
        let mut decl = SyntaxTreeNode::new(NodeTag::NetDeclaration);
        decl.push(leaf(kw));
        decl.push_slot(packed);
        loop {
            let variable = self.parse_declarator(NodeTag::NetVariable)?;
            decl.push(variable);
            if self.eat_punct(Punct::Comma).is_none() {
                break;
            }
        }
        let semi = self.expect_punct(Punct::Semicolon)?;
        decl.push(leaf(semi));
        Ok(Symbol::Node(decl))
    }

    // name [unpacked] [= expr]
    fn parse_declarator(&mut self, tag: NodeTag) -> PResult<Symbol> {
        let name = self.expect_identifier()?;
        let unpacked = if self.at_punct(Punct::LBracket) {
            Some(self.parse_dimensions(NodeTag::UnpackedDimensions)?)
        } else {
            None
        };
        let init = if self.eat_punct(Punct::Eq).is_some() {
            Some(self.parse_expression()?)
        } else {
            None
        };
        Ok(node(tag, vec![Some(leaf(name)), unpacked, init]))
    }

    // type name [unpacked] [= expr] {, ...} ;
    fn parse_data_declaration(&mut self) -> PResult<Symbol> {
        let data_type = self.parse_data_type_allowing_aggregate()?;
        let mut decl = SyntaxTreeNode::new(NodeTag::DataDeclaration);
        decl.push(data_type);
        loop {
            let variable = self.parse_declarator(NodeTag::RegisterVariable)?;
            decl.push(variable);
            if self.eat_punct(Punct::Comma).is_none() {
                break;
            }
        }
        let semi = self.expect_punct(Punct::Semicolon)?;
        decl.push(leaf(semi));
        Ok(Symbol::Node(decl))
    }

    fn parse_data_type_allowing_aggregate(&mut self) -> PResult<Symbol> {
        match self.peek().kind {
            TokenKind::Keyword(Keyword::Enum) => self.parse_enum_type(),
            TokenKind::Keyword(Keyword::Struct) => self.parse_struct_type(),
            _ => self.parse_data_type(),
        }
    }

    // Items that open with an identifier: instantiations, user-typed data
    // declarations, or (rarely) expression statements.
    fn parse_identifier_led_item(&mut self) -> PResult<Symbol> {
        let after_type = self.scan_reference_chain_length();
        match (self.peek_at(after_type).kind, self.peek_at(after_type + 1).kind) {
            // id id ( ... ) ;  — module/interface instantiation
            (
                TokenKind::SymbolIdentifier | TokenKind::EscapedIdentifier,
                TokenKind::Punct(Punct::LParen),
            ) => self.parse_instantiation(),
            // id #( ... ) id ( ... ) ; — parameterized instantiation
            (TokenKind::Punct(Punct::Hash), _) => self.parse_instantiation(),
            // id id ... ; — data declaration of a user-defined type
            (TokenKind::SymbolIdentifier | TokenKind::EscapedIdentifier, _) => {
                self.parse_data_declaration()
            }
            _ => {
                // Fall back to an expression statement.
                let expr = self.parse_expression()?;
                let semi = self.expect_punct(Punct::Semicolon)?;
                Ok(node(
                    NodeTag::Statement,
                    vec![Some(expr), Some(leaf(semi))],
                ))
            }
        }
    }

    fn parse_instantiation(&mut self) -> PResult<Symbol> {
        let type_ref = self.parse_reference(false)?;
        let data_type = node(NodeTag::DataType, vec![Some(type_ref), None]);
        let params = if self.at_punct(Punct::Hash) {
            self.expect_punct(Punct::Hash)?;
            Some(self.parse_port_actual_list()?)
        } else {
            None
        };
        let mut inst = SyntaxTreeNode::new(NodeTag::Instantiation);
        inst.push(data_type);
        inst.push_slot(params);
        loop {
            let name = self.expect_identifier()?;
            let actuals = if self.at_punct(Punct::LParen) {
                Some(self.parse_port_actual_list()?)
            } else {
                None
            };
            inst.push(node(
                NodeTag::GateInstance,
                vec![Some(leaf(name)), actuals],
            ));
            if self.eat_punct(Punct::Comma).is_none() {
                break;
            }
        }
        let semi = self.expect_punct(Punct::Semicolon)?;
        inst.push(leaf(semi));
        Ok(Symbol::Node(inst))
    }

    // ( .name(expr), .name(), expr, ... )
    fn parse_port_actual_list(&mut self) -> PResult<Symbol> {
        self.expect_punct(Punct::LParen)?;
        let mut list = SyntaxTreeNode::new(NodeTag::PortActualList);
        while !self.at_punct(Punct::RParen) && !self.at_eof() {
            if self.eat_punct(Punct::Dot).is_some() {
                let name = self.expect_identifier()?;
                let actual = if self.eat_punct(Punct::LParen).is_some() {
                    let inner = if self.at_punct(Punct::RParen) {
                        None
                    } else {
                        Some(self.parse_expression()?)
                    };
                    self.expect_punct(Punct::RParen)?;
                    inner
                } else {
                    None
                };
                list.push(node(
                    NodeTag::NamedPort,
                    vec![Some(leaf(name)), actual],
                ));
            } else {
                let expr = self.parse_expression()?;
                list.push(expr);
            }
            if self.eat_punct(Punct::Comma).is_none() {
                break;
            }
        }
        self.expect_punct(Punct::RParen)?;
        Ok(Symbol::Node(list))
    }

    fn parse_continuous_assign(&mut self) -> PResult<Symbol> {
        let kw = self.expect_keyword(Keyword::Assign)?;
        let mut assign = SyntaxTreeNode::new(NodeTag::ContinuousAssign);
        assign.push(leaf(kw));
        loop {
            let expr = self.parse_expression()?;
            assign.push(expr);
            if self.eat_punct(Punct::Comma).is_none() {
                break;
            }
        }
        let semi = self.expect_punct(Punct::Semicolon)?;
        assign.push(leaf(semi));
        Ok(Symbol::Node(assign))
    }

    fn parse_always_construct(&mut self) -> PResult<Symbol> {
        let kw = self.advance();
        let event = if self.at_punct(Punct::At) {
            Some(self.parse_event_control()?)
        } else {
            None
        };
        let body = self.parse_statement()?;
        Ok(node(
            NodeTag::AlwaysConstruct,
            vec![Some(leaf(kw)), event, Some(body)],
        ))
    }

    // @* or @(...)
    fn parse_event_control(&mut self) -> PResult<Symbol> {
        let at = self.expect_punct(Punct::At)?;
        let mut event = SyntaxTreeNode::new(NodeTag::EventControl);
        event.push(leaf(at));
        if let Some(star) = self.eat_punct(Punct::Star) {
            event.push(leaf(star));
            return Ok(Symbol::Node(event));
        }
        self.expect_punct(Punct::LParen)?;
        while !self.at_punct(Punct::RParen) && !self.at_eof() {
            match self.peek().kind {
                TokenKind::Keyword(Keyword::Posedge) | TokenKind::Keyword(Keyword::Negedge) => {
                    event.push(leaf(self.advance()));
                }
                TokenKind::Punct(Punct::Star) | TokenKind::Punct(Punct::Comma) => {
                    event.push(leaf(self.advance()));
                }
                // "or" separates event expressions; it is not a reference.
                TokenKind::SymbolIdentifier if self.text(self.peek()) == "or" => {
                    event.push(leaf(self.advance()));
                }
                _ => {
                    let expr = self.parse_expression()?;
                    event.push(expr);
                }
            }
        }
        self.expect_punct(Punct::RParen)?;
        Ok(Symbol::Node(event))
    }

    fn parse_generate_region(&mut self) -> PResult<Symbol> {
        let kw = self.expect_keyword(Keyword::Generate)?;
        let mut region = SyntaxTreeNode::new(NodeTag::GenerateRegion);
        region.push(leaf(kw));
        while !self.at_keyword(Keyword::Endgenerate) && !self.at_eof() {
            let item = self.parse_item_with_recovery(&[Keyword::Endgenerate]);
            region.push(item);
        }
        let end = self.expect_keyword(Keyword::Endgenerate)?;
        region.push(leaf(end));
        Ok(Symbol::Node(region))
    }

    // begin [: label] items end [: label]
    fn parse_generate_block(&mut self) -> PResult<Symbol> {
        let begin = self.expect_keyword(Keyword::Begin)?;
        let label = if self.eat_punct(Punct::Colon).is_some() {
            Some(leaf(self.expect_identifier()?))
        } else {
            None
        };
        let mut block = SyntaxTreeNode::new(NodeTag::GenerateBlock);
        block.push(leaf(begin));
        block.push_slot(label);
        while !self.at_keyword(Keyword::End) && !self.at_eof() {
            let item = self.parse_item_with_recovery(&[Keyword::End]);
            block.push(item);
        }
        let end = self.expect_keyword(Keyword::End)?;
        block.push(leaf(end));
        if self.eat_punct(Punct::Colon).is_some() {
            let trailing = self.expect_identifier()?;
            block.push(leaf(trailing));
        }
        Ok(Symbol::Node(block))
    }

    fn parse_conditional_generate(&mut self) -> PResult<Symbol> {
        let kw = self.expect_keyword(Keyword::If)?;
        self.expect_punct(Punct::LParen)?;
        let condition = self.parse_expression()?;
        self.expect_punct(Punct::RParen)?;
        let then_item = self.parse_item_with_recovery(&[Keyword::Else]);
        let else_item = if self.eat_keyword(Keyword::Else).is_some() {
            Some(self.parse_item_with_recovery(&[]))
        } else {
            None
        };
        Ok(node(
            NodeTag::ConditionalGenerate,
            vec![Some(leaf(kw)), Some(condition), Some(then_item), else_item],
        ))
    }

    fn parse_loop_generate(&mut self) -> PResult<Symbol> {
        let kw = self.expect_keyword(Keyword::For)?;
        self.expect_punct(Punct::LParen)?;
        let init = self.parse_for_init()?;
        let condition = self.parse_expression()?;
        self.expect_punct(Punct::Semicolon)?;
        let step = self.parse_expression()?;
        self.expect_punct(Punct::RParen)?;
        let body = self.parse_item_with_recovery(&[]);
        Ok(node(
            NodeTag::LoopGenerate,
            vec![
                Some(leaf(kw)),
                Some(init),
                Some(condition),
                Some(step),
                Some(body),
            ],
        ))
    }

    // `genvar i = 0;` or `i = 0;` in a for-header.
    fn parse_for_init(&mut self) -> PResult<Symbol> {
        if self.at_keyword(Keyword::Genvar)
            || matches!(self.peek().kind, TokenKind::Keyword(k) if k.is_data_type())
        {
            let kw = self.advance();
            let declarator = self.parse_declarator(NodeTag::RegisterVariable)?;
            let semi = self.expect_punct(Punct::Semicolon)?;
            Ok(node(
                NodeTag::DataDeclaration,
                vec![
                    Some(node(NodeTag::DataType, vec![Some(leaf(kw)), None])),
                    Some(declarator),
                    Some(leaf(semi)),
                ],
            ))
        } else {
            let expr = self.parse_expression()?;
            let semi = self.expect_punct(Punct::Semicolon)?;
            Ok(node(
                NodeTag::Statement,
                vec![Some(expr), Some(leaf(semi))],
            ))
        }
    }

    fn parse_package_import(&mut self) -> PResult<Symbol> {
        let kw = self.expect_keyword(Keyword::Import)?;
        let name = self.expect_identifier()?;
        // Consume the rest of the import item list up to the semicolon.
        let mut import = SyntaxTreeNode::new(NodeTag::PackageImport);
        import.push(leaf(kw));
        import.push(leaf(name));
        while !self.at_punct(Punct::Semicolon) && !self.at_eof() {
            import.push(leaf(self.advance()));
        }
        let semi = self.expect_punct(Punct::Semicolon)?;
        import.push(leaf(semi));
        Ok(Symbol::Node(import))
    }

    fn parse_include(&mut self) -> PResult<Symbol> {
        let kw = self.advance();
        let path = if self.peek().kind == TokenKind::StringLiteral {
            Some(leaf(self.advance()))
        } else {
            None
        };
        Ok(node(
            NodeTag::PreprocessorInclude,
            vec![Some(leaf(kw)), path],
        ))
    }

    // Bundle one directive and its trailing directive-owned tokens.
    fn parse_preprocessor_directive(&mut self) -> Symbol {
        let directive = self.advance();
        let mut pp = SyntaxTreeNode::new(NodeTag::PreprocessorDirective);
        pp.push(leaf(directive));
        loop {
            match self.peek().kind {
                TokenKind::PpIdentifier
                | TokenKind::MacroIdItem
                | TokenKind::PpDefineBody => {
                    pp.push(leaf(self.advance()));
                }
                // `define formal parameter list tokens.
                TokenKind::Punct(Punct::LParen)
                    if directive.kind == TokenKind::PpDefine
                        && pp.children.len() == 2 =>
                {
                    pp.push(leaf(self.advance()));
                    while !self.at_punct(Punct::RParen) && !self.at_eof() {
                        pp.push(leaf(self.advance()));
                    }
                    if let Some(close) = self.eat_punct(Punct::RParen) {
                        pp.push(leaf(close));
                    }
                }
                _ => break,
            }
        }
        Symbol::Node(pp)
    }

    // A free-standing macro call or macro identifier at item level.
    fn parse_macro_item(&mut self) -> Symbol {
        let id = self.advance();
        let mut item = SyntaxTreeNode::new(NodeTag::Statement);
        item.push(leaf(id));
        if id.kind == TokenKind::MacroCallId {
            while !self.at_eof() {
                let tok = self.advance();
                let done = tok.kind == TokenKind::Punct(Punct::RParen);
                item.push(leaf(tok));
                if done {
                    break;
                }
            }
        }
        let _ = self.eat_punct(Punct::Semicolon).map(|t| item.push(leaf(t)));
        Symbol::Node(item)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_item_list(&mut self, end_kw: Keyword) -> Symbol {
        let mut list = SyntaxTreeNode::new(NodeTag::ModuleItemList);
        while !self.at_keyword(end_kw) && !self.at_eof() {
            let item = self.parse_item_with_recovery(&[end_kw]);
            list.push(item);
        }
        Symbol::Node(list)
    }

    fn parse_statement_list(&mut self, end_kw: Keyword) -> Symbol {
        let mut list = SyntaxTreeNode::new(NodeTag::StatementList);
        while !self.at_keyword(end_kw) && !self.at_eof() {
            let start = self.pos;
            match self.parse_statement() {
                Ok(statement) => list.push(statement),
                Err(ParseAbort) => {
                    let mut error = SyntaxTreeNode::new(NodeTag::ErrorNode);
                    for i in start..self.pos {
                        error.push(leaf(self.tokens[i]));
                    }
                    loop {
                        if self.at_eof() || self.at_keyword(end_kw) {
                            break;
                        }
                        let tok = self.advance();
                        error.push(leaf(tok));
                        if tok.kind == TokenKind::Punct(Punct::Semicolon) {
                            break;
                        }
                    }
                    if error.children.is_empty() {
                        error.push(leaf(self.advance()));
                    }
                    list.push(Symbol::Node(error));
                }
            }
        }
        Symbol::Node(list)
    }

    fn parse_statement(&mut self) -> PResult<Symbol> {
        match self.peek().kind {
            TokenKind::Keyword(Keyword::Begin) => self.parse_seq_block(),
            TokenKind::Keyword(Keyword::If) => self.parse_conditional_statement(),
            TokenKind::Keyword(Keyword::For) => self.parse_loop_statement(),
            TokenKind::Keyword(Keyword::Return) => {
                let kw = self.advance();
                let value = if self.at_punct(Punct::Semicolon) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                let semi = self.expect_punct(Punct::Semicolon)?;
                Ok(node(
                    NodeTag::Statement,
                    vec![Some(leaf(kw)), value, Some(leaf(semi))],
                ))
            }
            TokenKind::Keyword(Keyword::Typedef) => self.parse_typedef(),
            TokenKind::Keyword(k) if k.is_data_type() => self.parse_data_declaration(),
            TokenKind::SymbolIdentifier | TokenKind::EscapedIdentifier => {
                let after_type = self.scan_reference_chain_length();
                if matches!(
                    self.peek_at(after_type).kind,
                    TokenKind::SymbolIdentifier | TokenKind::EscapedIdentifier
                ) {
                    self.parse_data_declaration()
                } else {
                    let expr = self.parse_expression()?;
                    let semi = self.expect_punct(Punct::Semicolon)?;
                    Ok(node(
                        NodeTag::Statement,
                        vec![Some(expr), Some(leaf(semi))],
                    ))
                }
            }
            TokenKind::SystemTfIdentifier
            | TokenKind::Number
            | TokenKind::MacroCallId
            | TokenKind::MacroIdentifier => {
                let expr = self.parse_expression()?;
                let semi = self.expect_punct(Punct::Semicolon)?;
                Ok(node(
                    NodeTag::Statement,
                    vec![Some(expr), Some(leaf(semi))],
                ))
            }
            TokenKind::Punct(Punct::Semicolon) => {
                let semi = self.advance();
                Ok(node(NodeTag::Statement, vec![Some(leaf(semi))]))
            }
            _ => {
                self.error_here(format!(
                    "unexpected token {:?} in statement",
                    self.peek().kind
                ));
                Err(ParseAbort)
            }
        }
    }

    fn parse_seq_block(&mut self) -> PResult<Symbol> {
        let begin = self.expect_keyword(Keyword::Begin)?;
        let label = if self.eat_punct(Punct::Colon).is_some() {
            Some(leaf(self.expect_identifier()?))
        } else {
            None
        };
        let mut block = SyntaxTreeNode::new(NodeTag::StatementList);
        block.push(leaf(begin));
        block.push_slot(label);
        while !self.at_keyword(Keyword::End) && !self.at_eof() {
            let statement = self.parse_statement().unwrap_or_else(|_| {
                // Skip one token to guarantee progress, preserving it.
                let tok = self.advance();
                node(NodeTag::ErrorNode, vec![Some(leaf(tok))])
            });
            block.push(statement);
        }
        let end = self.expect_keyword(Keyword::End)?;
        block.push(leaf(end));
        if self.eat_punct(Punct::Colon).is_some() {
            let trailing = self.expect_identifier()?;
            block.push(leaf(trailing));
        }
        Ok(Symbol::Node(block))
    }

    fn parse_conditional_statement(&mut self) -> PResult<Symbol> {
        let kw = self.expect_keyword(Keyword::If)?;
        self.expect_punct(Punct::LParen)?;
        let condition = self.parse_expression()?;
        self.expect_punct(Punct::RParen)?;
        let then_branch = self.parse_statement()?;
        let else_branch = if self.eat_keyword(Keyword::Else).is_some() {
            Some(self.parse_statement()?)
        } else {
            None
        };
        Ok(node(
            NodeTag::ConditionalStatement,
            vec![
                Some(leaf(kw)),
                Some(condition),
                Some(then_branch),
                else_branch,
            ],
        ))
    }

    fn parse_loop_statement(&mut self) -> PResult<Symbol> {
        let kw = self.expect_keyword(Keyword::For)?;
        self.expect_punct(Punct::LParen)?;
        let init = self.parse_for_init()?;
        let condition = self.parse_expression()?;
        self.expect_punct(Punct::Semicolon)?;
        let step = self.parse_expression()?;
        self.expect_punct(Punct::RParen)?;
        let body = self.parse_statement()?;
        Ok(node(
            NodeTag::LoopStatement,
            vec![
                Some(leaf(kw)),
                Some(init),
                Some(condition),
                Some(step),
                Some(body),
            ],
        ))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    // Loose precedence-free expression: operands folded flat with operator
    // leaves. Enough structure for reference extraction and re-emission.
    fn parse_expression(&mut self) -> PResult<Symbol> {
        let first = self.parse_unary()?;
        if !self.at_binary_operator() {
            return Ok(first);
        }
        let mut expr = SyntaxTreeNode::new(NodeTag::Expression);
        expr.push(first);
        while self.at_binary_operator() {
            let op = self.advance();
            expr.push(leaf(op));
            // The ternary's colon arrives as another operand separator.
            if op.kind == TokenKind::Punct(Punct::Question) {
                let then_value = self.parse_unary()?;
                expr.push(then_value);
                if let Some(colon) = self.eat_punct(Punct::Colon) {
                    expr.push(leaf(colon));
                    let else_value = self.parse_unary()?;
                    expr.push(else_value);
                }
                continue;
            }
            let operand = self.parse_unary()?;
            expr.push(operand);
        }
        Ok(Symbol::Node(expr))
    }

    fn at_binary_operator(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Punct(p) if p.is_binary_operator())
    }

    fn parse_unary(&mut self) -> PResult<Symbol> {
        let mut prefix: Vec<Token> = Vec::new();
        while let TokenKind::Punct(p) = self.peek().kind {
            if !p.is_unary_operator() {
                break;
            }
            prefix.push(self.advance());
        }
        let primary = self.parse_primary()?;
        if prefix.is_empty() {
            return Ok(primary);
        }
        let mut expr = SyntaxTreeNode::new(NodeTag::Expression);
        for op in prefix {
            expr.push(leaf(op));
        }
        expr.push(primary);
        Ok(Symbol::Node(expr))
    }

    fn parse_primary(&mut self) -> PResult<Symbol> {
        match self.peek().kind {
            TokenKind::Number
            | TokenKind::UnbasedNumber
            | TokenKind::TimeLiteral
            | TokenKind::StringLiteral
            | TokenKind::MacroIdentifier => Ok(leaf(self.advance())),
            TokenKind::MacroCallId => Ok(self.parse_macro_call_expression()),
            TokenKind::SystemTfIdentifier => self.parse_system_tf_call(),
            TokenKind::Punct(Punct::LParen) => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect_punct(Punct::RParen)?;
                Ok(node(NodeTag::Expression, vec![Some(inner)]))
            }
            TokenKind::Punct(Punct::LBrace) => self.parse_concatenation(),
            TokenKind::SymbolIdentifier | TokenKind::EscapedIdentifier => {
                self.parse_reference(true)
            }
            _ => {
                self.error_here(format!(
                    "unexpected token {:?} in expression",
                    self.peek().kind
                ));
                Err(ParseAbort)
            }
        }
    }

    fn parse_macro_call_expression(&mut self) -> Symbol {
        let id = self.advance();
        let mut call = SyntaxTreeNode::new(NodeTag::Expression);
        call.push(leaf(id));
        // MacroCallId is always followed by its raw argument tokens.
        while !self.at_eof() {
            let tok = self.advance();
            let done = tok.kind == TokenKind::Punct(Punct::RParen);
            call.push(leaf(tok));
            if done {
                break;
            }
        }
        Symbol::Node(call)
    }

    fn parse_system_tf_call(&mut self) -> PResult<Symbol> {
        let id = self.advance();
        let mut call = SyntaxTreeNode::new(NodeTag::SystemTfCall);
        call.push(leaf(id));
        if self.eat_punct(Punct::LParen).is_some() {
            while !self.at_punct(Punct::RParen) && !self.at_eof() {
                let arg = self.parse_expression()?;
                call.push(arg);
                if self.eat_punct(Punct::Comma).is_none() {
                    break;
                }
            }
            self.expect_punct(Punct::RParen)?;
        }
        Ok(Symbol::Node(call))
    }

    fn parse_concatenation(&mut self) -> PResult<Symbol> {
        self.expect_punct(Punct::LBrace)?;
        let mut concat = SyntaxTreeNode::new(NodeTag::Expression);
        while !self.at_punct(Punct::RBrace) && !self.at_eof() {
            let element = self.parse_expression()?;
            concat.push(element);
            if self.eat_punct(Punct::Comma).is_none() {
                break;
            }
        }
        self.expect_punct(Punct::RBrace)?;
        Ok(Symbol::Node(concat))
    }

    fn parse_qualified_id(&mut self) -> PResult<Symbol> {
        let mut qualified = SyntaxTreeNode::new(NodeTag::QualifiedId);
        let first = self.expect_identifier()?;
        qualified.push(leaf(first));
        while self.eat_punct(Punct::ColonColon).is_some() {
            let next = self.expect_identifier()?;
            qualified.push(leaf(next));
        }
        Ok(Symbol::Node(qualified))
    }

    // base[::member...][.member...] with optional call and index suffixes
    // when in expression position.
    fn parse_reference(&mut self, expression_position: bool) -> PResult<Symbol> {
        let base = if self.peek_at(1).kind == TokenKind::Punct(Punct::ColonColon) {
            self.parse_qualified_id()?
        } else {
            leaf(self.expect_identifier()?)
        };
        let mut reference = SyntaxTreeNode::new(NodeTag::Reference);
        reference.push(base);
        while self.at_punct(Punct::Dot)
            && matches!(
                self.peek_at(1).kind,
                TokenKind::SymbolIdentifier | TokenKind::EscapedIdentifier
            )
        {
            self.advance(); // '.'
            let member = self.advance();
            reference.push(node(
                NodeTag::HierarchyExtension,
                vec![Some(leaf(member))],
            ));
        }
        let reference = Symbol::Node(reference);

        if !expression_position {
            return Ok(reference);
        }

        // Call suffix.
        if self.at_punct(Punct::LParen) {
            self.advance();
            let mut call = SyntaxTreeNode::new(NodeTag::FunctionCall);
            call.push(reference);
            while !self.at_punct(Punct::RParen) && !self.at_eof() {
                let arg = self.parse_expression()?;
                call.push(arg);
                if self.eat_punct(Punct::Comma).is_none() {
                    break;
                }
            }
            self.expect_punct(Punct::RParen)?;
            return Ok(Symbol::Node(call));
        }

        // Index suffixes.
        if self.at_punct(Punct::LBracket) {
            let mut indexed = SyntaxTreeNode::new(NodeTag::Expression);
            indexed.push(reference);
            while self.at_punct(Punct::LBracket) {
                let dims = self.parse_dimensions(NodeTag::UnpackedDimensions)?;
                indexed.push(dims);
            }
            return Ok(Symbol::Node(indexed));
        }

        Ok(reference)
    }

    fn parse_end_label(&mut self) -> Option<Symbol> {
        if self.eat_punct(Punct::Colon).is_some() {
            if self.at_identifier() {
                return Some(leaf(self.advance()));
            }
        }
        None
    }
}

fn is_block_end_keyword(k: Keyword) -> bool {
    matches!(
        k,
        Keyword::Endmodule
            | Keyword::Endpackage
            | Keyword::Endclass
            | Keyword::Endinterface
            | Keyword::Endfunction
            | Keyword::Endtask
            | Keyword::Endgenerate
            | Keyword::End
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex_significant;
    use crate::search::{find_all_tagged, get_subtree_as_leaf};

    fn parse_ok(source: &str) -> Symbol {
        let tokens = lex_significant(source);
        let result = parse(source, &tokens);
        assert!(
            result.errors.is_empty(),
            "unexpected parse errors for {source:?}: {:?}",
            result.errors
        );
        result.root
    }

    #[test]
    fn packed_vs_unpacked_dimensions() {
        let root = parse_ok("wire [1:0] w;\n");
        assert_eq!(find_all_tagged(&root, NodeTag::PackedDimensions).len(), 1);
        assert_eq!(find_all_tagged(&root, NodeTag::UnpackedDimensions).len(), 0);

        let root = parse_ok("wire w[4];\n");
        assert_eq!(find_all_tagged(&root, NodeTag::PackedDimensions).len(), 0);
        assert_eq!(find_all_tagged(&root, NodeTag::UnpackedDimensions).len(), 1);
    }

    #[test]
    fn module_with_ports() {
        let source = "module top #(parameter int W = 8) (input logic [7:0] a, output wire b);\n\
                      endmodule : top\n";
        let root = parse_ok(source);
        let modules = find_all_tagged(&root, NodeTag::ModuleDeclaration);
        assert_eq!(modules.len(), 1);
        let headers = find_all_tagged(&root, NodeTag::ModuleHeader);
        let name = get_subtree_as_leaf(headers[0].symbol, NodeTag::ModuleHeader, 1).unwrap();
        assert_eq!(name.text(source), "top");
        assert_eq!(find_all_tagged(&root, NodeTag::PortDeclaration).len(), 2);
        assert_eq!(find_all_tagged(&root, NodeTag::ParamAssign).len(), 1);
    }

    #[test]
    fn package_with_localparam() {
        let source = "package p_pkg;\n  localparam int goo = 1;\nendpackage\n";
        let root = parse_ok(source);
        assert_eq!(find_all_tagged(&root, NodeTag::PackageDeclaration).len(), 1);
        let params = find_all_tagged(&root, NodeTag::ParamDeclaration);
        assert_eq!(params.len(), 1);
        assert_eq!(
            params[0].context,
            vec![
                NodeTag::DescriptionList,
                NodeTag::PackageDeclaration,
                NodeTag::ModuleItemList
            ]
        );
    }

    #[test]
    fn qualified_reference_in_expression() {
        let source = "localparam int baz = p_pkg::goo;\n";
        let root = parse_ok(source);
        let qualified = find_all_tagged(&root, NodeTag::QualifiedId);
        assert_eq!(qualified.len(), 1);
        let ids: Vec<&str> = qualified[0]
            .symbol
            .as_node()
            .unwrap()
            .present_children()
            .map(|c| c.as_leaf().unwrap().text(source))
            .collect();
        assert_eq!(ids, vec!["p_pkg", "goo"]);
    }

    #[test]
    fn named_port_instantiation() {
        let source = "module top;\n  foo inst(.a(x), .b(y));\nendmodule\n";
        let root = parse_ok(source);
        let instantiations = find_all_tagged(&root, NodeTag::Instantiation);
        assert_eq!(instantiations.len(), 1);
        let named = find_all_tagged(&root, NodeTag::NamedPort);
        assert_eq!(named.len(), 2);
        let first_name = get_subtree_as_leaf(named[0].symbol, NodeTag::NamedPort, 0).unwrap();
        assert_eq!(first_name.text(source), "a");
    }

    #[test]
    fn parameterized_instantiation() {
        let source = "module top;\n  fifo #(.DEPTH(4)) u_fifo (.clk(clk));\nendmodule\n";
        let root = parse_ok(source);
        assert_eq!(find_all_tagged(&root, NodeTag::Instantiation).len(), 1);
        assert_eq!(find_all_tagged(&root, NodeTag::NamedPort).len(), 2);
        assert_eq!(find_all_tagged(&root, NodeTag::GateInstance).len(), 1);
    }

    #[test]
    fn class_with_extends() {
        let source = "class derived extends base_pkg::base;\nendclass\n";
        let root = parse_ok(source);
        assert_eq!(find_all_tagged(&root, NodeTag::ClassDeclaration).len(), 1);
        assert_eq!(find_all_tagged(&root, NodeTag::ExtendsClause).len(), 1);
    }

    #[test]
    fn function_with_body() {
        let source = "function int add(input int a, input int b);\n  return a + b;\nendfunction\n";
        let root = parse_ok(source);
        let functions = find_all_tagged(&root, NodeTag::FunctionDeclaration);
        assert_eq!(functions.len(), 1);
        assert_eq!(find_all_tagged(&root, NodeTag::PortDeclaration).len(), 2);
    }

    #[test]
    fn out_of_line_function_name() {
        let source = "function void cls::method;\nendfunction\n";
        let root = parse_ok(source);
        let functions = find_all_tagged(&root, NodeTag::FunctionDeclaration);
        assert_eq!(functions.len(), 1);
        assert_eq!(find_all_tagged(&root, NodeTag::QualifiedId).len(), 1);
    }

    #[test]
    fn typedef_enum_and_struct() {
        let source = "typedef enum logic {A, B = 1} state_t;\n\
                      typedef struct packed { int x; int y; } point_t;\n";
        let root = parse_ok(source);
        assert_eq!(find_all_tagged(&root, NodeTag::TypedefDeclaration).len(), 2);
        assert_eq!(find_all_tagged(&root, NodeTag::EnumName).len(), 2);
        assert_eq!(find_all_tagged(&root, NodeTag::StructType).len(), 1);
        assert_eq!(find_all_tagged(&root, NodeTag::DataDeclaration).len(), 2);
    }

    #[test]
    fn generate_blocks() {
        let source = "module m;\n\
                      generate\n\
                      if (W > 1) begin : wide\n  wire x;\nend\n\
                      else begin\n  wire y;\nend\n\
                      endgenerate\nendmodule\n";
        let root = parse_ok(source);
        assert_eq!(find_all_tagged(&root, NodeTag::GenerateRegion).len(), 1);
        assert_eq!(find_all_tagged(&root, NodeTag::ConditionalGenerate).len(), 1);
        assert_eq!(find_all_tagged(&root, NodeTag::GenerateBlock).len(), 2);
    }

    #[test]
    fn always_with_event_control() {
        let source = "module m;\nalways @(posedge clk or negedge rst_n) q <= d;\nendmodule\n";
        let root = parse_ok(source);
        assert_eq!(find_all_tagged(&root, NodeTag::AlwaysConstruct).len(), 1);
        assert_eq!(find_all_tagged(&root, NodeTag::EventControl).len(), 1);
        // clk, rst_n, q, d (the "or" separator is not a reference)
        assert_eq!(find_all_tagged(&root, NodeTag::Reference).len(), 4);
    }

    #[test]
    fn hierarchical_reference() {
        let source = "assign y = p.x;\n";
        let root = parse_ok(source);
        let refs = find_all_tagged(&root, NodeTag::Reference);
        assert_eq!(refs.len(), 2);
        assert_eq!(find_all_tagged(&root, NodeTag::HierarchyExtension).len(), 1);
    }

    #[test]
    fn error_recovery_produces_error_node_and_partial_tree() {
        let source = "module m;\n???;\nwire ok;\nendmodule\n";
        let tokens = lex_significant(source);
        let result = parse(source, &tokens);
        assert!(!result.errors.is_empty());
        assert!(!find_all_tagged(&result.root, NodeTag::ErrorNode).is_empty());
        // The declaration after the error is still parsed.
        assert_eq!(find_all_tagged(&result.root, NodeTag::NetDeclaration).len(), 1);
        assert_eq!(
            find_all_tagged(&result.root, NodeTag::ModuleDeclaration).len(),
            1
        );
    }

    #[test]
    fn include_directive_item() {
        let source = "`include \"defs.svh\"\nmodule m;\nendmodule\n";
        let root = parse_ok(source);
        let includes = find_all_tagged(&root, NodeTag::PreprocessorInclude);
        assert_eq!(includes.len(), 1);
        let path =
            get_subtree_as_leaf(includes[0].symbol, NodeTag::PreprocessorInclude, 1).unwrap();
        assert_eq!(path.text(source), "\"defs.svh\"");
    }

    #[test]
    fn define_directive_is_bundled() {
        let source = "`define WIDTH 8\nwire w;\n";
        let root = parse_ok(source);
        assert_eq!(
            find_all_tagged(&root, NodeTag::PreprocessorDirective).len(),
            1
        );
        assert_eq!(find_all_tagged(&root, NodeTag::NetDeclaration).len(), 1);
    }
}
