//! Project-scoped hierarchical symbol table with dependent reference chains.
//!
//! Scopes and reference-tree nodes live in append-only arenas addressed by
//! opaque ids, which keeps every cross-link (`user_defined_type`,
//! `resolved_symbol`) valid as the table grows. Identifier keys are
//! substrings of project-owned source buffers; synthesized scope names (for
//! anonymous generate blocks) are the only owned keys.
//!
//! Construction is two-phase: `build` walks each translation unit's syntax
//! tree collecting declarations and reference trees without resolving
//! anything; `resolve_locally_only` optionally prunes references that bind
//! within their own scope; `resolve` performs the full upward search and
//! member-chain resolution with diagnostics.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::diagnostics::Diagnostic;
use crate::project::{VerilogProject, VerilogSourceFile};
use crate::syntax::{NodeTag, Symbol, SyntaxTreeNode};
use crate::token::Token;

/// Index of a scope in the symbol table arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(usize);

/// Index of a reference-tree node in the reference arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RefId(usize);

/// Classify what type of element a particular symbol is defining.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SymbolMetaType {
    Root,
    Class,
    Module,
    Generate,
    Package,
    Parameter,
    TypeAlias,
    DataNetVariableInstance,
    Function,
    Task,
    Struct,
    EnumType,
    EnumConstant,
    Interface,
    // The following represent groups of the above, used only for validating
    // metatypes of symbol references.
    Unspecified,
    Callable,
}

impl SymbolMetaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolMetaType::Root => "root",
            SymbolMetaType::Class => "class",
            SymbolMetaType::Module => "module",
            SymbolMetaType::Generate => "generate",
            SymbolMetaType::Package => "package",
            SymbolMetaType::Parameter => "parameter",
            SymbolMetaType::TypeAlias => "typedef",
            SymbolMetaType::DataNetVariableInstance => "data/net/var/instance",
            SymbolMetaType::Function => "function",
            SymbolMetaType::Task => "task",
            SymbolMetaType::Struct => "struct",
            SymbolMetaType::EnumType => "enum type",
            SymbolMetaType::EnumConstant => "enum constant",
            SymbolMetaType::Interface => "interface",
            SymbolMetaType::Unspecified => "<unspecified>",
            SymbolMetaType::Callable => "<callable>",
        }
    }

    /// Does a symbol of metatype `actual` satisfy this requirement?
    pub fn matches(&self, actual: SymbolMetaType) -> bool {
        match self {
            SymbolMetaType::Unspecified => true,
            SymbolMetaType::Callable => {
                matches!(actual, SymbolMetaType::Function | SymbolMetaType::Task)
            }
            required => *required == actual,
        }
    }
}

/// How a single reference component is to be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceType {
    /// Base of a chain, resolved by searching up-scope from the context.
    Unqualified,
    /// Base of a chain that must resolve in the context scope only, with no
    /// upward search (out-of-line definition bases).
    Immediate,
    /// `::id` — resolved in the parent symbol's own scope.
    DirectMember,
    /// `.id` — resolved in the scope of the parent's declared type.
    MemberOfTypeOfParent,
}

impl ReferenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Unqualified => "unqualified",
            ReferenceType::Immediate => "immediate",
            ReferenceType::DirectMember => "::member",
            ReferenceType::MemberOfTypeOfParent => ".member-of-type",
        }
    }
}

/// Data portion of one reference-tree node.
#[derive(Debug, Clone)]
pub struct ReferenceComponent<'p> {
    /// Identifier substring, owned by a project source buffer.
    pub identifier: &'p str,
    pub ref_type: ReferenceType,
    /// Metatype the resolved symbol must satisfy.
    pub required_metatype: SymbolMetaType,
    /// Set only by resolution; stays `None` on failure.
    pub resolved_symbol: Option<ScopeId>,
    /// Referenced path of the file the identifier came from.
    pub file: &'p str,
    /// Byte offset of the identifier in that file.
    pub offset: usize,
}

/// One node in a tree of dependent references. Members that share a base
/// (named ports, named parameters) are siblings under it.
#[derive(Debug)]
pub struct ReferenceNode<'p> {
    pub component: ReferenceComponent<'p>,
    pub children: Vec<RefId>,
}

/// Information about the type used to declare a symbol.
#[derive(Debug, Default, Clone)]
pub struct DeclarationTypeInfo<'p> {
    /// Port direction text, when applicable.
    pub direction: Option<&'p str>,
    /// Primitive/built-in type text, when applicable.
    pub type_text: Option<&'p str>,
    /// Terminal component of the type's reference chain, for user-defined
    /// types. Member references of instances resolve through this.
    pub user_defined_type: Option<RefId>,
    /// Declaration without an explicit type.
    pub implicit: bool,
}

/// What a symbol is, where it came from, and what it still needs bound.
#[derive(Debug)]
pub struct SymbolInfo<'p> {
    pub metatype: SymbolMetaType,
    /// Referenced path of the defining file.
    pub file_origin: Option<&'p str>,
    pub declared_type: DeclarationTypeInfo<'p>,
    /// Base class, for elements with inheritance (single inheritance only).
    pub parent_type: DeclarationTypeInfo<'p>,
    pub is_port_identifier: bool,
    /// Reference trees to resolve relative to this scope.
    pub local_references_to_bind: Vec<RefId>,
    /// Stable storage for synthesized scope names; the map keys for
    /// anonymous scopes are owned copies of these.
    pub anonymous_scope_names: Vec<String>,
}

impl<'p> SymbolInfo<'p> {
    fn new(metatype: SymbolMetaType, file_origin: Option<&'p str>) -> Self {
        Self {
            metatype,
            file_origin,
            declared_type: DeclarationTypeInfo::default(),
            parent_type: DeclarationTypeInfo::default(),
            is_port_identifier: false,
            local_references_to_bind: Vec::new(),
            anonymous_scope_names: Vec::new(),
        }
    }

    /// Mint a uniquified scope name derived from `base`.
    pub fn create_anonymous_scope(&mut self, base: &str) -> String {
        let name = format!("{}-{}", base, self.anonymous_scope_names.len());
        self.anonymous_scope_names.push(name.clone());
        name
    }
}

/// Scope name: borrowed from a source buffer, or owned for synthesized
/// anonymous scopes.
pub type SymbolName<'p> = Cow<'p, str>;

/// One named element; when it represents a scope it has named children.
#[derive(Debug)]
pub struct Scope<'p> {
    pub key: SymbolName<'p>,
    pub parent: Option<ScopeId>,
    pub children: BTreeMap<SymbolName<'p>, ScopeId>,
    pub info: SymbolInfo<'p>,
}

/// Hierarchical symbol table over all translation units of a project.
/// The project owns all string memory and must outlive the table.
pub struct SymbolTable<'p> {
    project: &'p VerilogProject,
    scopes: Vec<Scope<'p>>,
    refs: Vec<ReferenceNode<'p>>,
}

impl<'p> SymbolTable<'p> {
    pub fn new(project: &'p VerilogProject) -> Self {
        let root = Scope {
            key: Cow::Borrowed("$root"),
            parent: None,
            children: BTreeMap::new(),
            info: SymbolInfo::new(SymbolMetaType::Root, None),
        };
        Self {
            project,
            scopes: vec![root],
            refs: Vec::new(),
        }
    }

    pub fn project(&self) -> &'p VerilogProject {
        self.project
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn scope(&self, id: ScopeId) -> &Scope<'p> {
        &self.scopes[id.0]
    }

    pub fn reference(&self, id: RefId) -> &ReferenceNode<'p> {
        &self.refs[id.0]
    }

    /// All scopes in creation order (parents before children).
    pub fn scopes(&self) -> impl Iterator<Item = (ScopeId, &Scope<'p>)> {
        self.scopes.iter().enumerate().map(|(i, s)| (ScopeId(i), s))
    }

    /// All reference nodes, bases and members alike.
    pub fn references(&self) -> impl Iterator<Item = (RefId, &ReferenceNode<'p>)> {
        self.refs.iter().enumerate().map(|(i, r)| (RefId(i), r))
    }

    /// Absolute path of a scope, e.g. `$root::p_pkg::goo`.
    pub fn scope_full_path(&self, id: ScopeId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(id);
        while let Some(cursor) = current {
            let scope = &self.scopes[cursor.0];
            parts.push(scope.key.as_ref());
            current = scope.parent;
        }
        parts.reverse();
        parts.join("::")
    }

    // ------------------------------------------------------------------
    // Pass A: Build
    // ------------------------------------------------------------------

    /// Build all opened translation units, in project open order.
    pub fn build(&mut self) -> Vec<Diagnostic> {
        let project = self.project;
        let mut diagnostics = Vec::new();
        for file in project.files() {
            self.build_file(file, &mut diagnostics);
        }
        diagnostics
    }

    /// Build one translation unit by referenced path. Safe to repeat:
    /// subsequent builds do not change the structure but re-emit duplicate
    /// symbol diagnostics.
    pub fn build_single_translation_unit(&mut self, referenced_path: &str) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        match self.project.find(referenced_path) {
            Some(file) => self.build_file(file, &mut diagnostics),
            None => diagnostics.push(Diagnostic::semantic(
                referenced_path,
                "translation unit is not opened in this project",
            )),
        }
        diagnostics
    }

    fn build_file(&mut self, file: &'p VerilogSourceFile, diagnostics: &mut Vec<Diagnostic>) {
        let Some(tree) = file.text_structure.syntax_tree.as_ref() else {
            return;
        };
        let ctx = FileContext {
            file: &file.referenced_path,
            content: &file.text_structure.content,
        };
        self.build_symbol(self.root(), tree, &ctx, diagnostics);
    }

    // Unified build dispatch over the syntax tree.
    fn build_symbol(
        &mut self,
        scope: ScopeId,
        symbol: &'p Symbol,
        ctx: &FileContext<'p>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let node = match symbol {
            Symbol::Leaf(_) => return,
            Symbol::Node(n) => n,
        };
        match node.tag {
            NodeTag::ModuleDeclaration => {
                self.build_module_like(scope, node, SymbolMetaType::Module, ctx, diagnostics);
            }
            NodeTag::InterfaceDeclaration => {
                self.build_module_like(scope, node, SymbolMetaType::Interface, ctx, diagnostics);
            }
            NodeTag::PackageDeclaration => {
                let Some(name) = node.child(1).and_then(|c| c.as_leaf()) else {
                    return;
                };
                let package =
                    self.declare(scope, *name, SymbolMetaType::Package, ctx, diagnostics);
                if let Some(items) = node.child(3) {
                    self.build_symbol(package, items, ctx, diagnostics);
                }
            }
            NodeTag::ClassDeclaration => {
                self.build_class(scope, node, ctx, diagnostics);
            }
            NodeTag::FunctionDeclaration => {
                self.build_routine(scope, node, SymbolMetaType::Function, ctx, diagnostics);
            }
            NodeTag::TaskDeclaration => {
                self.build_routine(scope, node, SymbolMetaType::Task, ctx, diagnostics);
            }
            NodeTag::ParamDeclaration => {
                self.build_param_declaration(scope, node, ctx, diagnostics);
            }
            NodeTag::NetDeclaration => {
                self.build_net_declaration(scope, node, ctx, diagnostics);
            }
            NodeTag::DataDeclaration => {
                self.build_data_declaration(scope, node, ctx, diagnostics);
            }
            NodeTag::TypedefDeclaration => {
                self.build_typedef(scope, node, ctx, diagnostics);
            }
            NodeTag::Instantiation => {
                self.build_instantiation(scope, node, ctx, diagnostics);
            }
            NodeTag::GenerateBlock => {
                self.build_generate_block(scope, node, ctx, diagnostics);
            }
            NodeTag::PackageImport => {
                if let Some(name) = node.child(1).and_then(|c| c.as_leaf()) {
                    self.add_single_reference(
                        scope,
                        *name,
                        ReferenceType::Unqualified,
                        SymbolMetaType::Package,
                        ctx,
                    );
                }
            }
            NodeTag::Reference => {
                self.build_reference_tree(
                    scope,
                    node,
                    ReferenceType::Unqualified,
                    SymbolMetaType::Unspecified,
                    ctx,
                );
            }
            NodeTag::FunctionCall => {
                // Callee chain ends in something callable; arguments are
                // independent references.
                if let Some(Symbol::Node(reference)) = node.child(0)
                    && reference.tag == NodeTag::Reference
                {
                    self.build_reference_tree(
                        scope,
                        reference,
                        ReferenceType::Unqualified,
                        SymbolMetaType::Callable,
                        ctx,
                    );
                }
                for child in node.present_children().skip(1) {
                    self.build_symbol(scope, child, ctx, diagnostics);
                }
            }
            // Everything else: recurse, collecting reference trees from
            // expressions along the way.
            _ => {
                for child in node.present_children() {
                    self.build_symbol(scope, child, ctx, diagnostics);
                }
            }
        }
    }

    fn build_module_like(
        &mut self,
        scope: ScopeId,
        node: &'p SyntaxTreeNode,
        metatype: SymbolMetaType,
        ctx: &FileContext<'p>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        // [0]=header, [1]=items
        let Some(Symbol::Node(header)) = node.child(0) else {
            return;
        };
        let Some(name) = header.child(1).and_then(|c| c.as_leaf()) else {
            return;
        };
        let module = self.declare(scope, *name, metatype, ctx, diagnostics);

        // Formal parameters.
        if let Some(Symbol::Node(params)) = header.child(2) {
            for assign in params.present_children() {
                if let Some(assign_node) = assign.as_node()
                    && assign_node.tag == NodeTag::ParamAssign
                {
                    self.build_param_assign(module, assign_node, None, ctx, diagnostics);
                }
            }
        }
        // Ports.
        if let Some(Symbol::Node(ports)) = header.child(3) {
            for port in ports.present_children() {
                if let Some(port_node) = port.as_node()
                    && port_node.tag == NodeTag::PortDeclaration
                {
                    self.build_port_declaration(module, port_node, ctx, diagnostics);
                }
            }
        }
        // Body items.
        if let Some(items) = node.child(1) {
            self.build_symbol(module, items, ctx, diagnostics);
        }
    }

    fn build_class(
        &mut self,
        scope: ScopeId,
        node: &'p SyntaxTreeNode,
        ctx: &FileContext<'p>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        // [0]=virtual?, [1]=class, [2]=name, [3]=extends?, [4]=';', [5]=items
        let Some(name) = node.child(2).and_then(|c| c.as_leaf()) else {
            return;
        };
        let class = self.declare(scope, *name, SymbolMetaType::Class, ctx, diagnostics);

        if let Some(Symbol::Node(extends)) = node.child(3)
            && extends.tag == NodeTag::ExtendsClause
            && let Some(Symbol::Node(base)) = extends.child(1)
            && base.tag == NodeTag::Reference
        {
            // The base class is resolved from the scope enclosing the class.
            let base_ref = self.build_reference_tree(
                scope,
                base,
                ReferenceType::Unqualified,
                SymbolMetaType::Class,
                ctx,
            );
            self.scopes[class.0].info.parent_type.user_defined_type = base_ref;
        }

        if let Some(items) = node.child(5) {
            self.build_symbol(class, items, ctx, diagnostics);
        }
    }

    fn build_routine(
        &mut self,
        scope: ScopeId,
        node: &'p SyntaxTreeNode,
        metatype: SymbolMetaType,
        ctx: &FileContext<'p>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        // [0]=kw, [1]=return type?, [2]=name, [3]=ports?, [4]=body
        let mut return_type_info = DeclarationTypeInfo::default();
        if let Some(Symbol::Node(return_type)) = node.child(1)
            && return_type.tag == NodeTag::DataType
        {
            self.fill_declared_type(scope, return_type, &mut return_type_info, ctx);
        }

        match node.child(2) {
            // Plain name: declare a new callable scope here.
            Some(Symbol::Leaf(name)) => {
                let routine = self.declare(scope, *name, metatype, ctx, diagnostics);
                self.scopes[routine.0].info.declared_type = return_type_info;
                if let Some(Symbol::Node(ports)) = node.child(3) {
                    for port in ports.present_children() {
                        if let Some(port_node) = port.as_node()
                            && port_node.tag == NodeTag::PortDeclaration
                        {
                            self.build_port_declaration(routine, port_node, ctx, diagnostics);
                        }
                    }
                }
                if let Some(body) = node.child(4) {
                    self.build_symbol(routine, body, ctx, diagnostics);
                }
            }
            // Out-of-line definition `C::m`: reference the class immediately
            // in this scope and the method as its direct member; the class
            // declaration owns the method symbol.
            Some(Symbol::Node(qualified)) if qualified.tag == NodeTag::QualifiedId => {
                let ids: Vec<&Token> = qualified
                    .present_children()
                    .filter_map(|c| c.as_leaf())
                    .collect();
                if let [base, members @ ..] = ids.as_slice() {
                    let base_ref = self.new_reference(
                        **base,
                        ReferenceType::Immediate,
                        if members.is_empty() {
                            SymbolMetaType::Callable
                        } else {
                            SymbolMetaType::Unspecified
                        },
                        ctx,
                    );
                    let mut parent = base_ref;
                    for (index, member) in members.iter().enumerate() {
                        let required = if index + 1 == members.len() {
                            SymbolMetaType::Callable
                        } else {
                            SymbolMetaType::Unspecified
                        };
                        parent = self.new_child_reference(
                            parent,
                            **member,
                            ReferenceType::DirectMember,
                            required,
                            ctx,
                        );
                    }
                    self.scopes[scope.0]
                        .info
                        .local_references_to_bind
                        .push(base_ref);
                }
                // Body references bind in the lexical scope of the
                // out-of-line definition.
                if let Some(body) = node.child(4) {
                    self.build_symbol(scope, body, ctx, diagnostics);
                }
            }
            _ => {}
        }
    }

    fn build_port_declaration(
        &mut self,
        scope: ScopeId,
        node: &'p SyntaxTreeNode,
        ctx: &FileContext<'p>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        // [0]=direction?, [1]=type?, [2]=name, [3]=unpacked?
        let Some(name) = node.child(2).and_then(|c| c.as_leaf()) else {
            return;
        };
        let mut declared_type = DeclarationTypeInfo {
            implicit: node.child(1).is_none(),
            ..DeclarationTypeInfo::default()
        };
        if let Some(direction) = node.child(0).and_then(|c| c.as_leaf()) {
            declared_type.direction = Some(direction.text(ctx.content));
        }
        if let Some(Symbol::Node(data_type)) = node.child(1) {
            self.fill_declared_type(scope, data_type, &mut declared_type, ctx);
        }
        let port = self.declare(
            scope,
            *name,
            SymbolMetaType::DataNetVariableInstance,
            ctx,
            diagnostics,
        );
        self.scopes[port.0].info.declared_type = declared_type;
        self.scopes[port.0].info.is_port_identifier = true;

        // Dimension expressions may reference parameters.
        if let Some(dims) = node.child(3) {
            self.build_symbol(scope, dims, ctx, diagnostics);
        }
    }

    fn build_param_declaration(
        &mut self,
        scope: ScopeId,
        node: &'p SyntaxTreeNode,
        ctx: &FileContext<'p>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        // [0]=kw, [1]=type?, [2..]=assigns, last=';'
        let data_type = match node.child(1) {
            Some(Symbol::Node(t)) if t.tag == NodeTag::DataType => Some(t),
            _ => None,
        };
        for child in node.present_children() {
            if let Some(assign) = child.as_node()
                && assign.tag == NodeTag::ParamAssign
            {
                self.build_param_assign(scope, assign, data_type, ctx, diagnostics);
            }
        }
    }

    fn build_param_assign(
        &mut self,
        scope: ScopeId,
        assign: &'p SyntaxTreeNode,
        data_type: Option<&'p SyntaxTreeNode>,
        ctx: &FileContext<'p>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let Some(name) = assign.child(0).and_then(|c| c.as_leaf()) else {
            return;
        };
        let mut declared_type = DeclarationTypeInfo {
            implicit: data_type.is_none(),
            ..DeclarationTypeInfo::default()
        };
        if let Some(data_type) = data_type {
            self.fill_declared_type(scope, data_type, &mut declared_type, ctx);
        }
        let parameter = self.declare(scope, *name, SymbolMetaType::Parameter, ctx, diagnostics);
        self.scopes[parameter.0].info.declared_type = declared_type;

        if let Some(value) = assign.child(2) {
            self.build_symbol(scope, value, ctx, diagnostics);
        }
    }

    fn build_net_declaration(
        &mut self,
        scope: ScopeId,
        node: &'p SyntaxTreeNode,
        ctx: &FileContext<'p>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        // [0]=kw, [1]=packed?, [2..]=variables, last=';'
        let kw_text = node
            .child(0)
            .and_then(|c| c.as_leaf())
            .map(|t| t.text(ctx.content));
        if let Some(dims) = node.child(1) {
            self.build_symbol(scope, dims, ctx, diagnostics);
        }
        for child in node.present_children() {
            if let Some(variable) = child.as_node()
                && variable.tag == NodeTag::NetVariable
            {
                let Some(name) = variable.child(0).and_then(|c| c.as_leaf()) else {
                    continue;
                };
                let net = self.declare(
                    scope,
                    *name,
                    SymbolMetaType::DataNetVariableInstance,
                    ctx,
                    diagnostics,
                );
                self.scopes[net.0].info.declared_type = DeclarationTypeInfo {
                    type_text: kw_text,
                    implicit: true,
                    ..DeclarationTypeInfo::default()
                };
                // Unpacked dimensions and initializer.
                if let Some(dims) = variable.child(1) {
                    self.build_symbol(scope, dims, ctx, diagnostics);
                }
                if let Some(init) = variable.child(2) {
                    self.build_symbol(scope, init, ctx, diagnostics);
                }
            }
        }
    }

    fn build_data_declaration(
        &mut self,
        scope: ScopeId,
        node: &'p SyntaxTreeNode,
        ctx: &FileContext<'p>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        // [0]=type, [1..]=variables, last=';'
        let mut declared_type = DeclarationTypeInfo::default();
        match node.child(0) {
            Some(Symbol::Node(data_type)) if data_type.tag == NodeTag::DataType => {
                self.fill_declared_type(scope, data_type, &mut declared_type, ctx);
            }
            // Anonymous aggregate types declare nothing nameable here.
            Some(Symbol::Node(_)) | Some(Symbol::Leaf(_)) | None => {}
        }
        for child in node.present_children() {
            if let Some(variable) = child.as_node()
                && variable.tag == NodeTag::RegisterVariable
            {
                let Some(name) = variable.child(0).and_then(|c| c.as_leaf()) else {
                    continue;
                };
                let data = self.declare(
                    scope,
                    *name,
                    SymbolMetaType::DataNetVariableInstance,
                    ctx,
                    diagnostics,
                );
                self.scopes[data.0].info.declared_type = declared_type.clone();
                if let Some(dims) = variable.child(1) {
                    self.build_symbol(scope, dims, ctx, diagnostics);
                }
                if let Some(init) = variable.child(2) {
                    self.build_symbol(scope, init, ctx, diagnostics);
                }
            }
        }
    }

    fn build_typedef(
        &mut self,
        scope: ScopeId,
        node: &'p SyntaxTreeNode,
        ctx: &FileContext<'p>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        // [0]=typedef, [1]=base type, [2]=name, [3]=';'
        let Some(name) = node.child(2).and_then(|c| c.as_leaf()) else {
            return;
        };
        let alias = self.declare(scope, *name, SymbolMetaType::TypeAlias, ctx, diagnostics);

        match node.child(1) {
            Some(Symbol::Node(base)) if base.tag == NodeTag::EnumType => {
                // Enum constants are visible in the enclosing scope and as
                // members of the alias (for qualified lookup).
                for member in base.present_children() {
                    if let Some(enum_name) = member.as_node()
                        && enum_name.tag == NodeTag::EnumName
                    {
                        let Some(constant) = enum_name.child(0).and_then(|c| c.as_leaf()) else {
                            continue;
                        };
                        self.declare(
                            scope,
                            *constant,
                            SymbolMetaType::EnumConstant,
                            ctx,
                            diagnostics,
                        );
                        self.declare(
                            alias,
                            *constant,
                            SymbolMetaType::EnumConstant,
                            ctx,
                            diagnostics,
                        );
                        if let Some(value) = enum_name.child(1) {
                            self.build_symbol(scope, value, ctx, diagnostics);
                        }
                    }
                }
            }
            Some(Symbol::Node(base)) if base.tag == NodeTag::StructType => {
                // Struct members become children of the alias scope, which
                // is what `.member` references of typed variables bind to.
                for member in base.present_children() {
                    if let Some(member_node) = member.as_node()
                        && member_node.tag == NodeTag::DataDeclaration
                    {
                        self.build_data_declaration(alias, member_node, ctx, diagnostics);
                    }
                }
            }
            Some(Symbol::Node(base)) if base.tag == NodeTag::DataType => {
                let mut declared_type = DeclarationTypeInfo::default();
                self.fill_declared_type(scope, base, &mut declared_type, ctx);
                self.scopes[alias.0].info.declared_type = declared_type;
            }
            _ => {}
        }
    }

    fn build_instantiation(
        &mut self,
        scope: ScopeId,
        node: &'p SyntaxTreeNode,
        ctx: &FileContext<'p>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        // [0]=type, [1]=parameter actuals?, [2..]=instances, last=';'
        let type_ref = match node.child(0) {
            Some(Symbol::Node(data_type)) if data_type.tag == NodeTag::DataType => {
                match data_type.child(0) {
                    Some(Symbol::Node(reference)) if reference.tag == NodeTag::Reference => self
                        .build_reference_tree(
                            scope,
                            reference,
                            ReferenceType::Unqualified,
                            SymbolMetaType::Unspecified,
                            ctx,
                        ),
                    _ => None,
                }
            }
            _ => None,
        };
        let attach_point = type_ref.map(|base| self.terminal_type_component(base));

        if let Some(Symbol::Node(params)) = node.child(1) {
            self.build_port_actuals(
                scope,
                params,
                attach_point,
                SymbolMetaType::Parameter,
                ctx,
                diagnostics,
            );
        }

        for child in node.present_children() {
            if let Some(instance) = child.as_node()
                && instance.tag == NodeTag::GateInstance
            {
                let Some(name) = instance.child(0).and_then(|c| c.as_leaf()) else {
                    continue;
                };
                let declared = self.declare(
                    scope,
                    *name,
                    SymbolMetaType::DataNetVariableInstance,
                    ctx,
                    diagnostics,
                );
                self.scopes[declared.0].info.declared_type = DeclarationTypeInfo {
                    user_defined_type: attach_point,
                    ..DeclarationTypeInfo::default()
                };
                if let Some(Symbol::Node(actuals)) = instance.child(1) {
                    self.build_port_actuals(
                        scope,
                        actuals,
                        attach_point,
                        SymbolMetaType::Unspecified,
                        ctx,
                        diagnostics,
                    );
                }
            }
        }
    }

    // Named actuals attach as member siblings under the instantiated type;
    // their connected expressions are independent references in `scope`.
    fn build_port_actuals(
        &mut self,
        scope: ScopeId,
        actuals: &'p SyntaxTreeNode,
        attach_point: Option<RefId>,
        member_metatype: SymbolMetaType,
        ctx: &FileContext<'p>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        for actual in actuals.present_children() {
            match actual {
                Symbol::Node(named) if named.tag == NodeTag::NamedPort => {
                    if let Some(name) = named.child(0).and_then(|c| c.as_leaf())
                        && let Some(parent) = attach_point
                    {
                        self.new_child_reference(
                            parent,
                            *name,
                            ReferenceType::DirectMember,
                            member_metatype,
                            ctx,
                        );
                    }
                    if let Some(connected) = named.child(1) {
                        self.build_symbol(scope, connected, ctx, diagnostics);
                    }
                }
                other => self.build_symbol(scope, other, ctx, diagnostics),
            }
        }
    }

    fn build_generate_block(
        &mut self,
        scope: ScopeId,
        node: &'p SyntaxTreeNode,
        ctx: &FileContext<'p>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        // [0]=begin, [1]=label?, [2..]=items
        let key: SymbolName<'p> = match node.child(1).and_then(|c| c.as_leaf()) {
            Some(label) => Cow::Borrowed(label.text(ctx.content)),
            None => Cow::Owned(
                self.scopes[scope.0]
                    .info
                    .create_anonymous_scope("generate"),
            ),
        };
        let block = self.declare_with_key(
            scope,
            key,
            SymbolMetaType::Generate,
            ctx,
            None,
            diagnostics,
        );
        // Slots 0 and 1 are the begin keyword and the optional label.
        for child in node.children.iter().skip(2).filter_map(|c| c.as_ref()) {
            self.build_symbol(block, child, ctx, diagnostics);
        }
    }

    // ------------------------------------------------------------------
    // Declaration and reference helpers
    // ------------------------------------------------------------------

    fn declare(
        &mut self,
        parent: ScopeId,
        name: Token,
        metatype: SymbolMetaType,
        ctx: &FileContext<'p>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> ScopeId {
        let key = Cow::Borrowed(name.text(ctx.content));
        self.declare_with_key(parent, key, metatype, ctx, Some(name), diagnostics)
    }

    fn declare_with_key(
        &mut self,
        parent: ScopeId,
        key: SymbolName<'p>,
        metatype: SymbolMetaType,
        ctx: &FileContext<'p>,
        name: Option<Token>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> ScopeId {
        if let Some(&existing) = self.scopes[parent.0].children.get(key.as_ref()) {
            // First definition wins; collisions are reported every build.
            let previous = self.scopes[existing.0]
                .info
                .file_origin
                .unwrap_or("<unknown>");
            let location = name.map(|t| t.offset());
            diagnostics.push(Diagnostic::semantic(
                ctx.file,
                match location {
                    Some(offset) => format!(
                        "duplicate symbol \"{key}\" at byte {offset}; previously defined in {previous}"
                    ),
                    None => {
                        format!("duplicate symbol \"{key}\"; previously defined in {previous}")
                    }
                },
            ));
            return existing;
        }
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            key: key.clone(),
            parent: Some(parent),
            children: BTreeMap::new(),
            info: SymbolInfo::new(metatype, Some(ctx.file)),
        });
        self.scopes[parent.0].children.insert(key, id);
        id
    }

    fn new_reference(
        &mut self,
        name: Token,
        ref_type: ReferenceType,
        required_metatype: SymbolMetaType,
        ctx: &FileContext<'p>,
    ) -> RefId {
        let id = RefId(self.refs.len());
        self.refs.push(ReferenceNode {
            component: ReferenceComponent {
                identifier: name.text(ctx.content),
                ref_type,
                required_metatype,
                resolved_symbol: None,
                file: ctx.file,
                offset: name.offset(),
            },
            children: Vec::new(),
        });
        id
    }

    fn new_child_reference(
        &mut self,
        parent: RefId,
        name: Token,
        ref_type: ReferenceType,
        required_metatype: SymbolMetaType,
        ctx: &FileContext<'p>,
    ) -> RefId {
        let id = self.new_reference(name, ref_type, required_metatype, ctx);
        self.refs[parent.0].children.push(id);
        id
    }

    /// Single-identifier reference registered in `scope`.
    fn add_single_reference(
        &mut self,
        scope: ScopeId,
        name: Token,
        ref_type: ReferenceType,
        required_metatype: SymbolMetaType,
        ctx: &FileContext<'p>,
    ) -> RefId {
        let id = self.new_reference(name, ref_type, required_metatype, ctx);
        self.scopes[scope.0].info.local_references_to_bind.push(id);
        id
    }

    // Build the reference tree for a `Reference` CST node and register it in
    // `scope`. `last_required` constrains the terminal component.
    fn build_reference_tree(
        &mut self,
        scope: ScopeId,
        reference: &'p SyntaxTreeNode,
        base_type: ReferenceType,
        last_required: SymbolMetaType,
        ctx: &FileContext<'p>,
    ) -> Option<RefId> {
        // Collect the :: chain then the . chain.
        let mut qualified: Vec<Token> = Vec::new();
        match reference.child(0) {
            Some(Symbol::Leaf(base)) => qualified.push(*base),
            Some(Symbol::Node(q)) if q.tag == NodeTag::QualifiedId => {
                qualified.extend(q.present_children().filter_map(|c| c.as_leaf()).copied());
            }
            _ => return None,
        }
        let hierarchy: Vec<Token> = reference
            .present_children()
            .skip(1)
            .filter_map(|c| c.as_node())
            .filter(|n| n.tag == NodeTag::HierarchyExtension)
            .filter_map(|n| n.child(0).and_then(|c| c.as_leaf()))
            .copied()
            .collect();

        let total = qualified.len() + hierarchy.len();
        debug_assert!(total >= 1);
        let mut index = 0;
        let required_for = |index: usize| {
            if index + 1 == total {
                last_required
            } else {
                SymbolMetaType::Unspecified
            }
        };

        let base_ref = self.new_reference(qualified[0], base_type, required_for(0), ctx);
        let mut cursor = base_ref;
        for member in qualified.iter().skip(1) {
            index += 1;
            cursor = self.new_child_reference(
                cursor,
                *member,
                ReferenceType::DirectMember,
                required_for(index),
                ctx,
            );
        }
        for member in hierarchy.iter() {
            index += 1;
            cursor = self.new_child_reference(
                cursor,
                *member,
                ReferenceType::MemberOfTypeOfParent,
                required_for(index),
                ctx,
            );
        }
        self.scopes[scope.0]
            .info
            .local_references_to_bind
            .push(base_ref);
        Some(base_ref)
    }

    // Populate declared-type info from a DataType node; user-defined types
    // register a reference tree and remember its terminal component.
    fn fill_declared_type(
        &mut self,
        scope: ScopeId,
        data_type: &'p SyntaxTreeNode,
        declared_type: &mut DeclarationTypeInfo<'p>,
        ctx: &FileContext<'p>,
    ) {
        match data_type.child(0) {
            Some(Symbol::Leaf(primitive)) => {
                declared_type.type_text = Some(primitive.text(ctx.content));
            }
            Some(Symbol::Node(reference)) if reference.tag == NodeTag::Reference => {
                if let Some(base) = self.build_reference_tree(
                    scope,
                    reference,
                    ReferenceType::Unqualified,
                    SymbolMetaType::Unspecified,
                    ctx,
                ) {
                    declared_type.user_defined_type = Some(self.terminal_type_component(base));
                }
            }
            _ => {}
        }
    }

    // Terminal component of a freshly built type reference chain. Called
    // before any named-port members are attached, so the last link of the
    // linear chain is the type itself.
    fn terminal_type_component(&self, base: RefId) -> RefId {
        let mut cursor = base;
        while let Some(&last) = self.refs[cursor.0].children.last() {
            cursor = last;
        }
        cursor
    }

    // ------------------------------------------------------------------
    // Pass B: ResolveLocallyOnly
    // ------------------------------------------------------------------

    /// Resolve base references against their own context scope only; no
    /// upward search, no diagnostics. Successful bases also resolve their
    /// member chains.
    pub fn resolve_locally_only(&mut self) {
        for scope_index in 0..self.scopes.len() {
            let refs = self.scopes[scope_index].info.local_references_to_bind.clone();
            for base in refs {
                let identifier = self.refs[base.0].component.identifier;
                let required = self.refs[base.0].component.required_metatype;
                let Some(&hit) = self.scopes[scope_index].children.get(identifier) else {
                    continue;
                };
                if !required.matches(self.scopes[hit.0].info.metatype) {
                    continue;
                }
                self.refs[base.0].component.resolved_symbol = Some(hit);
                self.resolve_members_silently(base);
            }
        }
    }

    fn resolve_members_silently(&mut self, parent: RefId) {
        for child in self.refs[parent.0].children.clone() {
            if let Ok(hit) = self.resolve_member(parent, child) {
                self.refs[child.0].component.resolved_symbol = Some(hit);
                self.resolve_members_silently(child);
            }
        }
    }

    // ------------------------------------------------------------------
    // Pass C: Resolve
    // ------------------------------------------------------------------

    /// Resolve every still-unresolved reference, searching upward from its
    /// context scope. Failures and metatype mismatches are reported and
    /// leave the reference unresolved.
    pub fn resolve(&mut self) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for scope_index in 0..self.scopes.len() {
            let refs = self.scopes[scope_index].info.local_references_to_bind.clone();
            for base in refs {
                self.resolve_base_reference(ScopeId(scope_index), base, &mut diagnostics);
            }
        }
        diagnostics
    }

    fn resolve_base_reference(
        &mut self,
        context: ScopeId,
        base: RefId,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        if self.refs[base.0].component.resolved_symbol.is_none() {
            let component = &self.refs[base.0].component;
            let identifier = component.identifier;
            let required = component.required_metatype;
            let ref_type = component.ref_type;
            let file = component.file;

            let hit = match ref_type {
                ReferenceType::Unqualified => self.search_up(context, identifier),
                ReferenceType::Immediate => {
                    self.scopes[context.0].children.get(identifier).copied()
                }
                ReferenceType::DirectMember | ReferenceType::MemberOfTypeOfParent => None,
            };
            match hit {
                Some(found) => {
                    let actual = self.scopes[found.0].info.metatype;
                    if required.matches(actual) {
                        self.refs[base.0].component.resolved_symbol = Some(found);
                    } else {
                        diagnostics.push(Diagnostic::semantic(
                            file,
                            format!(
                                "\"{identifier}\" expected metatype {}, but found {}",
                                required.as_str(),
                                actual.as_str()
                            ),
                        ));
                        return;
                    }
                }
                None => {
                    diagnostics.push(Diagnostic::semantic(
                        file,
                        format!("unable to resolve symbol \"{identifier}\""),
                    ));
                    return;
                }
            }
        }
        self.resolve_members(base, diagnostics);
    }

    fn resolve_members(&mut self, parent: RefId, diagnostics: &mut Vec<Diagnostic>) {
        for child in self.refs[parent.0].children.clone() {
            if self.refs[child.0].component.resolved_symbol.is_none() {
                match self.resolve_member(parent, child) {
                    Ok(hit) => {
                        self.refs[child.0].component.resolved_symbol = Some(hit);
                    }
                    Err(message) => {
                        let file = self.refs[child.0].component.file;
                        diagnostics.push(Diagnostic::semantic(file, message));
                        continue;
                    }
                }
            }
            self.resolve_members(child, diagnostics);
        }
    }

    // Resolve one member component given its resolved parent; returns the
    // scope hit or an error message.
    fn resolve_member(&self, parent: RefId, child: RefId) -> Result<ScopeId, String> {
        let parent_component = &self.refs[parent.0].component;
        let child_component = &self.refs[child.0].component;
        let identifier = child_component.identifier;

        let Some(parent_scope) = parent_component.resolved_symbol else {
            return Err(format!(
                "cannot resolve \"{identifier}\": its base \"{}\" is unresolved",
                parent_component.identifier
            ));
        };

        let search_scope = match child_component.ref_type {
            ReferenceType::DirectMember => parent_scope,
            ReferenceType::MemberOfTypeOfParent => self.type_scope_of(parent_scope).map_err(
                |message| format!("cannot resolve \"{identifier}\": {message}"),
            )?,
            ReferenceType::Unqualified | ReferenceType::Immediate => {
                return Err(format!(
                    "reference \"{identifier}\" is not a member component"
                ));
            }
        };

        let Some(&hit) = self.scopes[search_scope.0].children.get(identifier) else {
            return Err(format!(
                "unable to resolve symbol \"{identifier}\" in scope {}",
                self.scope_full_path(search_scope)
            ));
        };
        let actual = self.scopes[hit.0].info.metatype;
        if !child_component.required_metatype.matches(actual) {
            return Err(format!(
                "\"{identifier}\" expected metatype {}, but found {}",
                child_component.required_metatype.as_str(),
                actual.as_str()
            ));
        }
        Ok(hit)
    }

    // Scope to search for `.member` lookups through `symbol`: the symbol
    // itself when it is scope-like, otherwise the resolved scope of its
    // declared type.
    fn type_scope_of(&self, symbol: ScopeId) -> Result<ScopeId, String> {
        let info = &self.scopes[symbol.0].info;
        match info.metatype {
            SymbolMetaType::Module
            | SymbolMetaType::Class
            | SymbolMetaType::Package
            | SymbolMetaType::Interface
            | SymbolMetaType::Struct
            | SymbolMetaType::EnumType
            | SymbolMetaType::TypeAlias
            | SymbolMetaType::Generate
            | SymbolMetaType::Function
            | SymbolMetaType::Task
            | SymbolMetaType::Root => Ok(symbol),
            SymbolMetaType::DataNetVariableInstance
            | SymbolMetaType::Parameter
            | SymbolMetaType::EnumConstant => {
                let Some(type_ref) = info.declared_type.user_defined_type else {
                    return Err(format!(
                        "\"{}\" has no user-defined type",
                        self.scopes[symbol.0].key
                    ));
                };
                match self.refs[type_ref.0].component.resolved_symbol {
                    Some(type_scope) => Ok(type_scope),
                    None => Err(format!(
                        "type \"{}\" of \"{}\" is unresolved",
                        self.refs[type_ref.0].component.identifier,
                        self.scopes[symbol.0].key
                    )),
                }
            }
            SymbolMetaType::Unspecified | SymbolMetaType::Callable => {
                Err("internal: group metatype in symbol table".to_string())
            }
        }
    }

    fn search_up(&self, context: ScopeId, identifier: &str) -> Option<ScopeId> {
        let mut cursor = Some(context);
        while let Some(scope) = cursor {
            if let Some(&hit) = self.scopes[scope.0].children.get(identifier) {
                return Some(hit);
            }
            cursor = self.scopes[scope.0].parent;
        }
        None
    }

    // ------------------------------------------------------------------
    // Printing
    // ------------------------------------------------------------------

    /// Indented dump of all definitions: name, metatype, file origin.
    pub fn print_symbol_definitions(&self) -> String {
        let mut out = String::new();
        self.print_definitions_recursive(self.root(), 0, &mut out);
        out
    }

    fn print_definitions_recursive(&self, id: ScopeId, indent: usize, out: &mut String) {
        let scope = &self.scopes[id.0];
        let pad = "  ".repeat(indent);
        match scope.info.file_origin {
            Some(file) => {
                let _ = writeln!(
                    out,
                    "{pad}{} [{}] @{file}",
                    scope.key,
                    scope.info.metatype.as_str()
                );
            }
            None => {
                let _ = writeln!(out, "{pad}{} [{}]", scope.key, scope.info.metatype.as_str());
            }
        }
        for &child in scope.children.values() {
            self.print_definitions_recursive(child, indent + 1, out);
        }
    }

    /// Dump of every reference chain and its resolution state.
    pub fn print_symbol_references(&self) -> String {
        let mut out = String::new();
        for (id, scope) in self.scopes() {
            if scope.info.local_references_to_bind.is_empty() {
                continue;
            }
            let _ = writeln!(out, "{}:", self.scope_full_path(id));
            for &base in &scope.info.local_references_to_bind {
                self.print_reference_recursive(base, 1, &mut out);
            }
        }
        out
    }

    fn print_reference_recursive(&self, id: RefId, indent: usize, out: &mut String) {
        let reference = &self.refs[id.0];
        let pad = "  ".repeat(indent);
        let resolution = match reference.component.resolved_symbol {
            Some(scope) => self.scope_full_path(scope),
            None => "<unresolved>".to_string(),
        };
        let _ = writeln!(
            out,
            "{pad}{} ({}) -> {resolution}",
            reference.component.identifier,
            reference.component.ref_type.as_str()
        );
        for &child in &reference.children {
            self.print_reference_recursive(child, indent + 1, out);
        }
    }
}

struct FileContext<'p> {
    file: &'p str,
    content: &'p str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::VerilogProject;

    fn build_project(files: &[(&str, &str)]) -> VerilogProject {
        let mut project = VerilogProject::new(".", vec![]);
        for (name, content) in files {
            project.add_virtual_file(name, content.to_string());
        }
        project
    }

    fn find_child<'a, 'p>(
        table: &'a SymbolTable<'p>,
        scope: ScopeId,
        name: &str,
    ) -> Option<ScopeId> {
        table.scope(scope).children.get(name).copied()
    }

    #[test]
    fn build_declares_hierarchy() {
        let project = build_project(&[(
            "top.sv",
            "package p;\n  localparam int W = 4;\nendpackage\n\
             module top(input logic clk);\n  wire w;\nendmodule\n",
        )]);
        let mut table = SymbolTable::new(&project);
        let diagnostics = table.build();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");

        let p = find_child(&table, table.root(), "p").unwrap();
        assert_eq!(table.scope(p).info.metatype, SymbolMetaType::Package);
        let w_param = find_child(&table, p, "W").unwrap();
        assert_eq!(table.scope(w_param).info.metatype, SymbolMetaType::Parameter);

        let top = find_child(&table, table.root(), "top").unwrap();
        assert_eq!(table.scope(top).info.metatype, SymbolMetaType::Module);
        let clk = find_child(&table, top, "clk").unwrap();
        assert!(table.scope(clk).info.is_port_identifier);
        assert_eq!(
            table.scope(clk).info.declared_type.direction,
            Some("input")
        );
        assert!(find_child(&table, top, "w").is_some());
    }

    #[test]
    fn references_unresolved_after_build() {
        let project = build_project(&[(
            "a.sv",
            "module m;\n  assign y = x + 1;\nendmodule\n",
        )]);
        let mut table = SymbolTable::new(&project);
        table.build();
        assert!(table.references().count() > 0);
        for (_, reference) in table.references() {
            assert!(reference.component.resolved_symbol.is_none());
        }
    }

    #[test]
    fn local_resolution_only_binds_same_scope() {
        let project = build_project(&[(
            "a.sv",
            "localparam int local_one = 1;\n\
             module m;\n  wire inner;\n  assign inner = local_one;\nendmodule\n",
        )]);
        let mut table = SymbolTable::new(&project);
        table.build();
        table.resolve_locally_only();

        let m = find_child(&table, table.root(), "m").unwrap();
        let mut inner_resolved = false;
        let mut outer_resolved = false;
        for &base in &table.scope(m).info.local_references_to_bind {
            let reference = table.reference(base);
            match reference.component.identifier {
                "inner" => inner_resolved = reference.component.resolved_symbol.is_some(),
                "local_one" => outer_resolved = reference.component.resolved_symbol.is_some(),
                _ => {}
            }
        }
        // Same-scope reference binds; the up-scope one must wait for the
        // full resolve pass.
        assert!(inner_resolved);
        assert!(!outer_resolved);

        let diagnostics = table.resolve();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
    }

    #[test]
    fn qualified_reference_resolves_across_files() {
        let project = build_project(&[
            ("x.sv", "package p_pkg;\n  localparam int goo = 1;\nendpackage\n"),
            ("y.sv", "localparam int baz = p_pkg::goo;\n"),
        ]);
        let mut table = SymbolTable::new(&project);
        table.build();
        let diagnostics = table.resolve();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");

        let p_pkg = find_child(&table, table.root(), "p_pkg").unwrap();
        let goo = find_child(&table, p_pkg, "goo").unwrap();
        let root_refs = table
            .scope(table.root())
            .info
            .local_references_to_bind
            .clone();
        let base = root_refs
            .iter()
            .map(|&r| table.reference(r))
            .find(|r| r.component.identifier == "p_pkg")
            .unwrap();
        assert_eq!(base.component.resolved_symbol, Some(p_pkg));
        let member = table.reference(base.children[0]);
        assert_eq!(member.component.ref_type, ReferenceType::DirectMember);
        assert_eq!(member.component.resolved_symbol, Some(goo));
    }

    #[test]
    fn named_ports_are_siblings_under_instance_type() {
        let project = build_project(&[(
            "top.sv",
            "module foo(input logic a, input logic b);\nendmodule\n\
             module top;\n  wire x, y;\n  foo inst(.a(x), .b(y));\nendmodule\n",
        )]);
        let mut table = SymbolTable::new(&project);
        table.build();

        let top = find_child(&table, table.root(), "top").unwrap();
        let base_id = *table
            .scope(top)
            .info
            .local_references_to_bind
            .iter()
            .find(|&&r| table.reference(r).component.identifier == "foo")
            .unwrap();
        let member_ids = table.reference(base_id).children.clone();
        let member_names: Vec<&str> = member_ids
            .iter()
            .map(|&c| table.reference(c).component.identifier)
            .collect();
        assert_eq!(member_names, vec!["a", "b"]);

        let diagnostics = table.resolve();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let foo = find_child(&table, table.root(), "foo").unwrap();
        let a = find_child(&table, foo, "a").unwrap();
        assert_eq!(
            table.reference(member_ids[0]).component.resolved_symbol,
            Some(a)
        );
        // The instance symbol records the type it instantiates.
        let inst = find_child(&table, top, "inst").unwrap();
        let type_ref = table.scope(inst).info.declared_type.user_defined_type.unwrap();
        assert_eq!(
            table.reference(type_ref).component.resolved_symbol,
            Some(foo)
        );
    }

    #[test]
    fn member_of_type_of_parent_through_typedef() {
        let project = build_project(&[(
            "s.sv",
            "typedef struct packed { int x; int y; } point_t;\n\
             module m;\n  point_t p;\n  assign q = p.x;\nendmodule\n",
        )]);
        let mut table = SymbolTable::new(&project);
        table.build();
        let diagnostics = table.resolve();
        // Only `q` is unresolved.
        assert_eq!(diagnostics.len(), 1, "{diagnostics:?}");
        assert!(diagnostics[0].message.contains("\"q\""));

        let point_t = find_child(&table, table.root(), "point_t").unwrap();
        let x = find_child(&table, point_t, "x").unwrap();
        let m = find_child(&table, table.root(), "m").unwrap();
        let p_base = table
            .scope(m)
            .info
            .local_references_to_bind
            .iter()
            .map(|&r| table.reference(r))
            .find(|r| r.component.identifier == "p" && !r.children.is_empty())
            .unwrap();
        let member = table.reference(p_base.children[0]);
        assert_eq!(
            member.component.ref_type,
            ReferenceType::MemberOfTypeOfParent
        );
        assert_eq!(member.component.resolved_symbol, Some(x));
    }

    #[test]
    fn duplicate_symbols_first_wins() {
        let project = build_project(&[
            ("a.sv", "module dup;\nendmodule\n"),
            ("b.sv", "module dup;\nendmodule\n"),
        ]);
        let mut table = SymbolTable::new(&project);
        let diagnostics = table.build();
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("duplicate symbol \"dup\""));
        assert!(diagnostics[0].message.contains("a.sv"));
        assert_eq!(diagnostics[0].file, "b.sv");

        let dup = find_child(&table, table.root(), "dup").unwrap();
        assert_eq!(table.scope(dup).info.file_origin, Some("a.sv"));
    }

    #[test]
    fn rebuilding_same_unit_is_stable_but_rediagnosed() {
        let project = build_project(&[("a.sv", "module m;\n  wire w;\nendmodule\n")]);
        let mut table = SymbolTable::new(&project);
        let first = table.build_single_translation_unit("a.sv");
        assert!(first.is_empty());
        let scope_count = table.scopes().count();

        let second = table.build_single_translation_unit("a.sv");
        // Same structure, but duplicate diagnostics for every declaration.
        assert_eq!(table.scopes().count(), scope_count);
        assert!(!second.is_empty());
        assert!(second.iter().all(|d| d.message.contains("duplicate symbol")));
    }

    #[test]
    fn anonymous_generate_scopes_are_uniquified() {
        let project = build_project(&[(
            "g.sv",
            "module m;\n\
             generate\n\
             if (1) begin\n  wire a;\nend\n\
             if (1) begin\n  wire b;\nend\n\
             if (1) begin : named\n  wire c;\nend\n\
             endgenerate\nendmodule\n",
        )]);
        let mut table = SymbolTable::new(&project);
        let diagnostics = table.build();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");

        let m = find_child(&table, table.root(), "m").unwrap();
        let names: Vec<String> = table
            .scope(m)
            .children
            .keys()
            .map(|k| k.to_string())
            .collect();
        assert!(names.contains(&"generate-0".to_string()));
        assert!(names.contains(&"generate-1".to_string()));
        assert!(names.contains(&"named".to_string()));
        let gen0 = find_child(&table, m, "generate-0").unwrap();
        assert_eq!(table.scope(gen0).info.metatype, SymbolMetaType::Generate);
        assert!(find_child(&table, gen0, "a").is_some());
    }

    #[test]
    fn metatype_mismatch_is_diagnosed_not_resolved() {
        let project = build_project(&[(
            "c.sv",
            "module m;\n  wire w;\n  assign y = w();\nendmodule\n",
        )]);
        let mut table = SymbolTable::new(&project);
        table.build();
        let diagnostics = table.resolve();
        assert!(
            diagnostics
                .iter()
                .any(|d| d.message.contains("expected metatype <callable>")),
            "{diagnostics:?}"
        );
        let m = find_child(&table, table.root(), "m").unwrap();
        let call_base = table
            .scope(m)
            .info
            .local_references_to_bind
            .iter()
            .map(|&r| table.reference(r))
            .find(|r| {
                r.component.identifier == "w"
                    && r.component.required_metatype == SymbolMetaType::Callable
            })
            .unwrap();
        assert!(call_base.component.resolved_symbol.is_none());
    }

    #[test]
    fn out_of_line_definition_uses_immediate_base() {
        let project = build_project(&[(
            "c.sv",
            "class cls;\n  function void method;\n  endfunction\nendclass\n\
             function void cls::method;\nendfunction\n",
        )]);
        let mut table = SymbolTable::new(&project);
        table.build();

        let base_id = *table
            .scope(table.root())
            .info
            .local_references_to_bind
            .iter()
            .find(|&&r| table.reference(r).component.identifier == "cls")
            .unwrap();
        assert_eq!(
            table.reference(base_id).component.ref_type,
            ReferenceType::Immediate
        );
        let method_id = table.reference(base_id).children[0];
        assert_eq!(
            table.reference(method_id).component.required_metatype,
            SymbolMetaType::Callable
        );
        assert!(table.reference(method_id).component.resolved_symbol.is_none());

        let diagnostics = table.resolve();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");
        let cls = find_child(&table, table.root(), "cls").unwrap();
        let method_scope = find_child(&table, cls, "method").unwrap();
        assert_eq!(
            table.reference(method_id).component.resolved_symbol,
            Some(method_scope)
        );
    }

    #[test]
    fn class_inheritance_records_parent_type() {
        let project = build_project(&[(
            "c.sv",
            "class base;\nendclass\nclass derived extends base;\nendclass\n",
        )]);
        let mut table = SymbolTable::new(&project);
        table.build();
        let diagnostics = table.resolve();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");

        let base = find_child(&table, table.root(), "base").unwrap();
        let derived = find_child(&table, table.root(), "derived").unwrap();
        let parent_ref = table
            .scope(derived)
            .info
            .parent_type
            .user_defined_type
            .unwrap();
        assert_eq!(
            table.reference(parent_ref).component.resolved_symbol,
            Some(base)
        );
    }

    #[test]
    fn printing_definitions_and_references() {
        let project = build_project(&[(
            "p.sv",
            "package p;\n  localparam int x = 1;\nendpackage\n\
             localparam int y = p::x;\n",
        )]);
        let mut table = SymbolTable::new(&project);
        table.build();
        table.resolve();

        let defs = table.print_symbol_definitions();
        assert!(defs.contains("$root [root]"));
        assert!(defs.contains("p [package] @p.sv"));
        assert!(defs.contains("x [parameter] @p.sv"));

        let refs = table.print_symbol_references();
        assert!(refs.contains("$root:"));
        assert!(refs.contains("p (unqualified) -> $root::p"));
        assert!(refs.contains("x (::member) -> $root::p::x"));
    }

    #[test]
    fn enum_constants_visible_in_enclosing_scope() {
        let project = build_project(&[(
            "e.sv",
            "package p;\n  typedef enum logic {IDLE, BUSY} state_t;\n\
             localparam state_t RESET_STATE = IDLE;\nendpackage\n",
        )]);
        let mut table = SymbolTable::new(&project);
        table.build();
        let diagnostics = table.resolve();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");

        let p = find_child(&table, table.root(), "p").unwrap();
        assert!(find_child(&table, p, "IDLE").is_some());
        let state_t = find_child(&table, p, "state_t").unwrap();
        assert!(find_child(&table, state_t, "IDLE").is_some());
        assert_eq!(
            table.scope(state_t).info.metatype,
            SymbolMetaType::TypeAlias
        );
    }
}
