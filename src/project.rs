//! Project file model: source files, translation units, and file lists.
//!
//! A `VerilogProject` owns every opened source buffer; all identifier
//! substrings held by the symbol table and dependency graph point into these
//! buffers, so the project must outlive both. Files are boxed so views into
//! them stay stable as more files are opened.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::diagnostics::{Diagnostic, Phase, Severity};
use crate::error::{Error, Result};
use crate::lexer;
use crate::parser::{self, SyntaxError};
use crate::search::find_all_tagged;
use crate::syntax::{NodeTag, Symbol};
use crate::token::{LineColumnMap, Token, TokenKind};

/// Lexed and parsed form of one source buffer.
#[derive(Debug)]
pub struct TextStructure {
    pub content: String,
    /// Full token stream, trivia included, terminated by `Eof`.
    pub tokens: Vec<Token>,
    pub line_map: LineColumnMap,
    /// Parse tree; present even when `syntax_errors` is non-empty (partial
    /// trees are allowed).
    pub syntax_tree: Option<Symbol>,
    pub syntax_errors: Vec<SyntaxError>,
}

impl TextStructure {
    /// Lex and parse a buffer.
    pub fn analyze(content: String) -> Self {
        let tokens = lexer::lex(&content);
        let significant: Vec<Token> = tokens
            .iter()
            .copied()
            .filter(|t| !t.kind.is_trivia())
            .collect();
        let parse_result = parser::parse(&content, &significant);
        let line_map = LineColumnMap::new(&content);
        Self {
            content,
            tokens,
            line_map,
            syntax_tree: Some(parse_result.root),
            syntax_errors: parse_result.errors,
        }
    }

    pub fn has_lex_errors(&self) -> bool {
        self.tokens.iter().any(|t| t.kind == TokenKind::LexicalError)
    }

    /// Paths referenced by `include directives in this buffer.
    pub fn included_files(&self) -> Vec<String> {
        let Some(tree) = &self.syntax_tree else {
            return Vec::new();
        };
        find_all_tagged(tree, NodeTag::PreprocessorInclude)
            .iter()
            .filter_map(|m| {
                let node = m.symbol.as_node()?;
                let path = node.child(1)?.as_leaf()?;
                let text = path.text(&self.content);
                Some(text.trim_matches('"').to_string())
            })
            .collect()
    }

    /// Diagnostics for lexical errors and parser recovery points.
    pub fn diagnostics(&self, file: &str) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        for token in &self.tokens {
            if token.kind == TokenKind::LexicalError {
                out.push(Diagnostic::new(
                    Severity::Error,
                    Phase::Lex,
                    file,
                    Some(self.line_map.line_col(token.offset())),
                    format!("unrecognized text \"{}\"", token.text(&self.content)),
                ));
            }
        }
        for error in &self.syntax_errors {
            out.push(Diagnostic::syntax_error(
                file,
                self.line_map.line_col(error.span.start),
                error.message.clone(),
            ));
        }
        out
    }
}

/// One opened source file.
#[derive(Debug)]
pub struct VerilogSourceFile {
    /// Path as referenced (project-relative); used as the file's identity.
    pub referenced_path: String,
    /// Path the content was actually read from.
    pub resolved_path: PathBuf,
    /// Whether this file was pulled in through an `include directive.
    pub is_include: bool,
    pub text_structure: TextStructure,
}

impl VerilogSourceFile {
    pub fn content(&self) -> &str {
        &self.text_structure.content
    }
}

/// A set of source files opened against a root directory plus include
/// search directories.
#[derive(Debug, Default)]
pub struct VerilogProject {
    root: PathBuf,
    include_dirs: Vec<PathBuf>,
    // Boxed so &VerilogSourceFile stays stable while this vector grows.
    files: Vec<Box<VerilogSourceFile>>,
    by_referenced_path: BTreeMap<String, usize>,
}

impl VerilogProject {
    pub fn new(root: impl Into<PathBuf>, include_dirs: Vec<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include_dirs,
            files: Vec::new(),
            by_referenced_path: BTreeMap::new(),
        }
    }

    /// Files in the order they were opened; this is the symbol-table build
    /// order.
    pub fn files(&self) -> impl Iterator<Item = &VerilogSourceFile> {
        self.files.iter().map(|f| f.as_ref())
    }

    pub fn find(&self, referenced_path: &str) -> Option<&VerilogSourceFile> {
        self.by_referenced_path
            .get(referenced_path)
            .map(|&i| self.files[i].as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Open a translation unit by project-relative path, then recursively
    /// open every file it `include`s (searched through the include dirs).
    /// Missing includes are reported as diagnostics, not errors.
    pub fn open_translation_unit(
        &mut self,
        referenced_path: &str,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<&VerilogSourceFile> {
        let resolved = self.root.join(referenced_path);
        let index = self.open_file(referenced_path, &resolved, false)?;
        self.open_includes_of(index, diagnostics);
        Ok(self.files[index].as_ref())
    }

    /// Register an in-memory buffer as a translation unit (stdin, tests).
    pub fn add_virtual_file(
        &mut self,
        referenced_path: &str,
        content: String,
    ) -> &VerilogSourceFile {
        if let Some(&i) = self.by_referenced_path.get(referenced_path) {
            return self.files[i].as_ref();
        }
        let index = self.push_file(referenced_path, PathBuf::from(referenced_path), false, content);
        self.files[index].as_ref()
    }

    fn open_file(
        &mut self,
        referenced_path: &str,
        resolved: &Path,
        is_include: bool,
    ) -> Result<usize> {
        if let Some(&i) = self.by_referenced_path.get(referenced_path) {
            return Ok(i);
        }
        let content = std::fs::read_to_string(resolved)
            .map_err(|e| Error::input(resolved.to_path_buf(), e))?;
        Ok(self.push_file(referenced_path, resolved.to_path_buf(), is_include, content))
    }

    fn push_file(
        &mut self,
        referenced_path: &str,
        resolved_path: PathBuf,
        is_include: bool,
        content: String,
    ) -> usize {
        let file = VerilogSourceFile {
            referenced_path: referenced_path.to_string(),
            resolved_path,
            is_include,
            text_structure: TextStructure::analyze(content),
        };
        let index = self.files.len();
        self.files.push(Box::new(file));
        self.by_referenced_path
            .insert(referenced_path.to_string(), index);
        index
    }

    // Recursively open includes referenced by files[index].
    fn open_includes_of(&mut self, index: usize, diagnostics: &mut Vec<Diagnostic>) {
        let includes = self.files[index].text_structure.included_files();
        let including = self.files[index].referenced_path.clone();
        for include in includes {
            if self.by_referenced_path.contains_key(include.as_str()) {
                continue;
            }
            match self.resolve_include(&include) {
                Some(resolved) => match self.open_file(&include, &resolved, true) {
                    Ok(child) => self.open_includes_of(child, diagnostics),
                    Err(e) => diagnostics.push(Diagnostic::new(
                        Severity::Error,
                        Phase::Semantic,
                        including.clone(),
                        None,
                        e.to_string(),
                    )),
                },
                None => diagnostics.push(Diagnostic::new(
                    Severity::Error,
                    Phase::Semantic,
                    including.clone(),
                    None,
                    format!("included file not found: \"{include}\""),
                )),
            }
        }
    }

    fn resolve_include(&self, name: &str) -> Option<PathBuf> {
        let direct = self.root.join(name);
        if direct.is_file() {
            return Some(direct);
        }
        for dir in &self.include_dirs {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        None
    }

    /// Referenced path of the file whose content owns `text`, if any.
    /// Identifier views handed out by the symbol table resolve this way.
    pub fn lookup_file_origin(&self, text: &str) -> Option<&VerilogSourceFile> {
        let start = text.as_ptr() as usize;
        let end = start + text.len();
        self.files().find(|f| {
            let content = f.content();
            let base = content.as_ptr() as usize;
            start >= base && end <= base + content.len()
        })
    }
}

// ============================================================================
// File lists
// ============================================================================

/// `+define+NAME[=VALUE]` entry from a file list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextMacroDefinition {
    pub name: String,
    pub value: String,
}

/// Preprocessing information carried by a file list.
#[derive(Debug, Clone, Default)]
pub struct FileListPreprocessing {
    pub include_dirs: Vec<String>,
    pub defines: Vec<TextMacroDefinition>,
}

/// Ordered list of files to compile, with preprocessor directives.
#[derive(Debug, Default)]
pub struct FileList {
    pub file_list_path: String,
    pub file_paths: Vec<String>,
    pub preprocessing: FileListPreprocessing,
}

impl FileList {
    /// Parse the line-oriented file-list format: `#` comments, `+incdir+`
    /// and `+define+` directives, and whitespace-trimmed file paths.
    pub fn parse(path: &str, content: &str) -> Result<FileList> {
        let mut list = FileList {
            file_list_path: path.to_string(),
            ..FileList::default()
        };
        for (index, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(dir) = line.strip_prefix("+incdir+") {
                if dir.is_empty() {
                    return Err(Error::FileList {
                        path: PathBuf::from(path),
                        line: index + 1,
                        message: "+incdir+ requires a directory".to_string(),
                    });
                }
                list.preprocessing.include_dirs.push(dir.to_string());
            } else if let Some(define) = line.strip_prefix("+define+") {
                if define.is_empty() {
                    return Err(Error::FileList {
                        path: PathBuf::from(path),
                        line: index + 1,
                        message: "+define+ requires a macro name".to_string(),
                    });
                }
                let (name, value) = match define.split_once('=') {
                    Some((name, value)) => (name, value),
                    None => (define, ""),
                };
                list.preprocessing.defines.push(TextMacroDefinition {
                    name: name.to_string(),
                    value: value.to_string(),
                });
            } else if line.starts_with('+') {
                return Err(Error::FileList {
                    path: PathBuf::from(path),
                    line: index + 1,
                    message: format!("unknown directive \"{line}\""),
                });
            } else {
                list.file_paths.push(line.to_string());
            }
        }
        Ok(list)
    }

    /// Read and parse a file list from disk.
    pub fn read(path: &Path) -> Result<FileList> {
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::input(path.to_path_buf(), e))?;
        Self::parse(&path.display().to_string(), &content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn analyze_produces_tokens_and_tree() {
        let text = TextStructure::analyze("module m;\nendmodule\n".to_string());
        assert!(text.syntax_tree.is_some());
        assert!(text.syntax_errors.is_empty());
        assert!(!text.has_lex_errors());
        assert_eq!(text.line_map.line_count(), 3);
    }

    #[test]
    fn diagnostics_carry_locations() {
        let text = TextStructure::analyze("module m;\n???\nendmodule\n".to_string());
        let diags = text.diagnostics("m.sv");
        assert!(!diags.is_empty());
        assert!(diags.iter().all(|d| d.file == "m.sv"));
    }

    #[test]
    fn virtual_files_and_lookup() {
        let mut project = VerilogProject::new(".", vec![]);
        project.add_virtual_file("a.sv", "wire a;\n".to_string());
        project.add_virtual_file("b.sv", "wire b;\n".to_string());
        assert_eq!(project.files().count(), 2);
        assert!(project.find("a.sv").is_some());
        assert!(project.find("c.sv").is_none());

        let content_view = &project.find("b.sv").unwrap().content()[5..6];
        let origin = project.lookup_file_origin(content_view).unwrap();
        assert_eq!(origin.referenced_path, "b.sv");
    }

    #[test]
    fn open_translation_unit_with_includes() {
        let dir = tempfile::tempdir().unwrap();
        let inc_dir = dir.path().join("inc");
        std::fs::create_dir(&inc_dir).unwrap();
        let mut f = std::fs::File::create(dir.path().join("top.sv")).unwrap();
        writeln!(f, "`include \"defs.svh\"").unwrap();
        writeln!(f, "module top;\nendmodule").unwrap();
        let mut f = std::fs::File::create(inc_dir.join("defs.svh")).unwrap();
        writeln!(f, "`define WIDTH 8").unwrap();

        let mut project = VerilogProject::new(dir.path(), vec![inc_dir]);
        let mut diagnostics = Vec::new();
        project
            .open_translation_unit("top.sv", &mut diagnostics)
            .unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(project.files().count(), 2);
        let include = project.find("defs.svh").unwrap();
        assert!(include.is_include);
    }

    #[test]
    fn missing_include_is_diagnostic_not_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("top.sv"), "`include \"nope.svh\"\n").unwrap();

        let mut project = VerilogProject::new(dir.path(), vec![]);
        let mut diagnostics = Vec::new();
        let result = project.open_translation_unit("top.sv", &mut diagnostics);
        assert!(result.is_ok());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("nope.svh"));
    }

    #[test]
    fn missing_file_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut project = VerilogProject::new(dir.path(), vec![]);
        let mut diagnostics = Vec::new();
        let err = project
            .open_translation_unit("ghost.sv", &mut diagnostics)
            .unwrap_err();
        assert!(matches!(err, Error::Input { .. }));
    }

    #[test]
    fn file_list_directives() {
        let content = "# sources\n\
                       +incdir+rtl/inc\n\
                       +define+SIM\n\
                       +define+WIDTH=8\n\
                       \n\
                       rtl/top.sv\n\
                       rtl/alu.sv\n";
        let list = FileList::parse("files.f", content).unwrap();
        assert_eq!(list.file_paths, vec!["rtl/top.sv", "rtl/alu.sv"]);
        assert_eq!(list.preprocessing.include_dirs, vec!["rtl/inc"]);
        assert_eq!(
            list.preprocessing.defines,
            vec![
                TextMacroDefinition {
                    name: "SIM".to_string(),
                    value: String::new()
                },
                TextMacroDefinition {
                    name: "WIDTH".to_string(),
                    value: "8".to_string()
                },
            ]
        );
    }

    #[test]
    fn file_list_rejects_bad_directives() {
        let err = FileList::parse("files.f", "+incdir+\n").unwrap_err();
        assert!(matches!(err, Error::FileList { line: 1, .. }));
        let err = FileList::parse("files.f", "ok.sv\n+bogus+x\n").unwrap_err();
        assert!(matches!(err, Error::FileList { line: 2, .. }));
    }
}
