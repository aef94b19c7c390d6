//! Cross-file dependency graph derived from a built symbol table.
//!
//! Only root-scope definitions participate as dependency targets; the first
//! file to define a symbol is its definer. Unqualified base references from
//! every scope act as uses, since upward search ultimately lands at root.
//! The table only needs `build()`; resolution is not required. Once
//! constructed, all fields are immutable.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use itertools::Itertools;

use crate::symbol_table::{ReferenceType, SymbolTable};

/// Where one root symbol is defined and from which files it is referenced.
#[derive(Debug, Default)]
pub struct SymbolData<'p> {
    /// First-seen defining file, by project open order.
    pub definer: Option<&'p str>,
    pub referencers: BTreeSet<&'p str>,
}

/// Set of symbol names carried by one dependency edge.
pub type SymbolNameSet<'p> = BTreeSet<&'p str>;

/// Inter-file dependency graph. The outer key is the referencing file, the
/// inner key the defining file, the value the symbols the referencing file
/// expects from it.
pub struct FileDependencies<'p> {
    pub root_symbols_index: BTreeMap<&'p str, SymbolData<'p>>,
    pub file_deps: BTreeMap<&'p str, BTreeMap<&'p str, SymbolNameSet<'p>>>,
}

impl<'p> FileDependencies<'p> {
    pub fn new(table: &SymbolTable<'p>) -> Self {
        let mut root_symbols_index: BTreeMap<&'p str, SymbolData<'p>> = BTreeMap::new();

        // Root-scope definitions claim their definer.
        let root = table.scope(table.root());
        for (key, &child) in &root.children {
            // Synthesized scope names are not referencable symbols.
            let Cow::Borrowed(name) = *key else {
                continue;
            };
            let data = root_symbols_index.entry(name).or_default();
            if data.definer.is_none() {
                data.definer = table.scope(child).info.file_origin;
            }
        }

        // Unqualified base references from every scope are candidate uses.
        for (_, scope) in table.scopes() {
            for &base in &scope.info.local_references_to_bind {
                let component = &table.reference(base).component;
                if component.ref_type != ReferenceType::Unqualified {
                    continue;
                }
                root_symbols_index
                    .entry(component.identifier)
                    .or_default()
                    .referencers
                    .insert(component.file);
            }
        }

        // Edge: referencer -> definer, carrying the symbol name. Self-edges
        // are not emitted.
        let mut file_deps: BTreeMap<&'p str, BTreeMap<&'p str, SymbolNameSet<'p>>> =
            BTreeMap::new();
        for (&name, data) in &root_symbols_index {
            let Some(definer) = data.definer else {
                continue;
            };
            for &referencer in &data.referencers {
                if referencer == definer {
                    continue;
                }
                file_deps
                    .entry(referencer)
                    .or_default()
                    .entry(definer)
                    .or_default()
                    .insert(name);
            }
        }

        Self {
            root_symbols_index,
            file_deps,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.file_deps.is_empty()
    }

    /// Visit every edge: (referencing file, defining file, symbols).
    pub fn traverse_dependency_edges(
        &self,
        mut edge_fn: impl FnMut(&'p str, &'p str, &SymbolNameSet<'p>),
    ) {
        for (&referencer, targets) in &self.file_deps {
            for (&definer, symbols) in targets {
                edge_fn(referencer, definer, symbols);
            }
        }
    }
}

impl fmt::Display for FileDependencies<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "(no dependencies)");
        }
        for (referencer, targets) in &self.file_deps {
            for (definer, symbols) in targets {
                writeln!(
                    f,
                    "\"{referencer}\" depends on \"{definer}\" for {{ {} }}",
                    symbols.iter().join(", ")
                )?;
            }
        }
        Ok(())
    }
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

    #[test]
    fn single_file_has_no_dependencies() {
        let project = build_project(&[(
            "a.sv",
            "localparam int zzz = 0;\nlocalparam int yyy = zzz + 1;\n",
        )]);
        let mut table = SymbolTable::new(&project);
        table.build();
        let deps = FileDependencies::new(&table);
        // Self-dependencies are not emitted.
        assert!(deps.is_empty(), "{deps}");
    }

    #[test]
    fn two_files_with_param_dep_at_root_scope() {
        let project = build_project(&[
            ("f1.sv", "localparam int zzz = 0;\n"),
            ("f2.sv", "localparam int yyy = zzz * 2;\n"),
        ]);
        let mut table = SymbolTable::new(&project);
        let diagnostics = table.build();
        assert!(diagnostics.is_empty(), "{diagnostics:?}");

        let deps = FileDependencies::new(&table);
        assert!(!deps.is_empty());
        assert_eq!(deps.file_deps.len(), 1);
        let symbols: Vec<&str> = deps.file_deps["f2.sv"]["f1.sv"].iter().copied().collect();
        assert_eq!(symbols, vec!["zzz"]);
    }

    #[test]
    fn package_and_param_deps() {
        let project = build_project(&[
            (
                "f1.sv",
                "localparam int foo = 0;\n\
                 package p_pkg;\n  localparam int goo = 1;\nendpackage\n",
            ),
            (
                "f2.sv",
                "localparam int bar = foo - 2;\n\
                 localparam int baz = p_pkg::goo;\n",
            ),
        ]);
        let mut table = SymbolTable::new(&project);
        table.build();
        let deps = FileDependencies::new(&table);
        let symbols: Vec<&str> = deps.file_deps["f2.sv"]["f1.sv"].iter().copied().collect();
        // The qualified base resolves cross-file; `goo` resolves inside
        // p_pkg's scope and does not appear as its own edge symbol.
        assert_eq!(symbols, vec!["foo", "p_pkg"]);
        assert_eq!(deps.file_deps.len(), 1);
    }

    #[test]
    fn cyclic_dependencies_are_legal() {
        let project = build_project(&[
            (
                "f1.sv",
                "localparam int foo = 0;\n\
                 package p_pkg;\n  localparam int goo = bar;\nendpackage\n",
            ),
            (
                "f2.sv",
                "localparam int bar = foo - 2;\n\
                 localparam int baz = p_pkg::goo;\n",
            ),
        ]);
        let mut table = SymbolTable::new(&project);
        table.build();
        let deps = FileDependencies::new(&table);

        // f2 -> f1 carries foo and p_pkg.
        let forward: Vec<&str> = deps.file_deps["f2.sv"]["f1.sv"].iter().copied().collect();
        assert_eq!(forward, vec!["foo", "p_pkg"]);
        // f1 -> f2 carries bar (referenced from inside p_pkg's scope).
        let backward: Vec<&str> = deps.file_deps["f1.sv"]["f2.sv"].iter().copied().collect();
        assert_eq!(backward, vec!["bar"]);
    }

    #[test]
    fn module_instantiation_dependency() {
        let project = build_project(&[
            ("leaf.sv", "module leaf(input logic a);\nendmodule\n"),
            (
                "top.sv",
                "module top;\n  wire x;\n  leaf u_leaf(.a(x));\nendmodule\n",
            ),
        ]);
        let mut table = SymbolTable::new(&project);
        table.build();
        let deps = FileDependencies::new(&table);
        let symbols: Vec<&str> = deps.file_deps["top.sv"]["leaf.sv"].iter().copied().collect();
        assert_eq!(symbols, vec!["leaf"]);
    }

    #[test]
    fn traversal_and_display() {
        let project = build_project(&[
            ("def.sv", "localparam int shared = 1;\n"),
            ("use.sv", "localparam int local_copy = shared;\n"),
        ]);
        let mut table = SymbolTable::new(&project);
        table.build();
        let deps = FileDependencies::new(&table);

        let mut edges = Vec::new();
        deps.traverse_dependency_edges(|from, to, symbols| {
            edges.push((from.to_string(), to.to_string(), symbols.len()));
        });
        assert_eq!(edges, vec![("use.sv".to_string(), "def.sv".to_string(), 1)]);

        let rendered = deps.to_string();
        assert!(rendered.contains("\"use.sv\" depends on \"def.sv\""));
        assert!(rendered.contains("shared"));
    }

    #[test]
    fn index_tracks_definers_and_referencers() {
        let project = build_project(&[
            ("a.sv", "module m;\nendmodule\n"),
            ("b.sv", "module t;\n  m inst();\nendmodule\n"),
        ]);
        let mut table = SymbolTable::new(&project);
        table.build();
        let deps = FileDependencies::new(&table);
        let m_data = &deps.root_symbols_index["m"];
        assert_eq!(m_data.definer, Some("a.sv"));
        assert!(m_data.referencers.contains("b.sv"));
    }
}
