//! Project-level symbol table and dependency graph tests, driven through
//! real files, file lists, and include directories.

use std::path::PathBuf;

use svtools::dependencies::FileDependencies;
use svtools::project::{FileList, VerilogProject};
use svtools::symbol_table::{ReferenceType, SymbolMetaType, SymbolTable};

fn write_file(dir: &std::path::Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

#[test]
fn file_list_driven_project_resolution() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "p_pkg.sv",
        "package p_pkg;\n  localparam int goo = 1;\nendpackage\n",
    );
    write_file(
        dir.path(),
        "consumer.sv",
        "localparam int baz = p_pkg::goo;\n",
    );
    write_file(dir.path(), "files.f", "# project\np_pkg.sv\nconsumer.sv\n");

    let list = FileList::read(&dir.path().join("files.f")).unwrap();
    assert_eq!(list.file_paths, vec!["p_pkg.sv", "consumer.sv"]);

    let mut project = VerilogProject::new(dir.path(), vec![]);
    let mut diagnostics = Vec::new();
    for path in &list.file_paths {
        project.open_translation_unit(path, &mut diagnostics).unwrap();
    }
    assert!(diagnostics.is_empty());

    let mut table = SymbolTable::new(&project);
    let build_diagnostics = table.build();
    assert!(build_diagnostics.is_empty(), "{build_diagnostics:?}");

    // Every reference is unresolved after Build.
    assert!(
        table
            .references()
            .all(|(_, r)| r.component.resolved_symbol.is_none())
    );

    table.resolve_locally_only();
    let resolve_diagnostics = table.resolve();
    assert!(resolve_diagnostics.is_empty(), "{resolve_diagnostics:?}");

    // file_deps[consumer][p_pkg file] == { p_pkg }: the base resolves
    // cross-file while goo resolves inside p_pkg's scope.
    let deps = FileDependencies::new(&table);
    let symbols: Vec<&str> = deps.file_deps["consumer.sv"]["p_pkg.sv"]
        .iter()
        .copied()
        .collect();
    assert_eq!(symbols, vec!["p_pkg"]);
}

#[test]
fn local_resolution_is_a_pure_pruning_pass() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "m.sv",
        "module m;\n  wire a;\n  wire b;\n  assign a = b;\n  assign c = missing;\nendmodule\n",
    );
    let mut project = VerilogProject::new(dir.path(), vec![]);
    let mut diagnostics = Vec::new();
    project.open_translation_unit("m.sv", &mut diagnostics).unwrap();

    let mut table = SymbolTable::new(&project);
    table.build();

    // Pass B: silent, resolves only what lives in the same scope.
    table.resolve_locally_only();
    let resolved_now: Vec<&str> = table
        .references()
        .filter(|(_, r)| r.component.resolved_symbol.is_some())
        .map(|(_, r)| r.component.identifier)
        .collect();
    assert_eq!(resolved_now, vec!["a", "b"]);

    // Pass C: reports what stays unresolved.
    let diagnostics = table.resolve();
    let unresolved: Vec<String> = diagnostics.iter().map(|d| d.message.clone()).collect();
    assert_eq!(unresolved.len(), 2, "{unresolved:?}");
    assert!(unresolved.iter().any(|m| m.contains("\"c\"")));
    assert!(unresolved.iter().any(|m| m.contains("\"missing\"")));
}

#[test]
fn includes_are_opened_through_include_dirs() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "inc/common_defs.svh",
        "localparam int SHARED_WIDTH = 8;\n",
    );
    write_file(
        dir.path(),
        "top.sv",
        "`include \"common_defs.svh\"\nmodule top;\n  wire [7:0] bus;\nendmodule\n",
    );

    let mut project = VerilogProject::new(dir.path(), vec![dir.path().join("inc")]);
    let mut diagnostics = Vec::new();
    project.open_translation_unit("top.sv", &mut diagnostics).unwrap();
    assert!(diagnostics.is_empty(), "{diagnostics:?}");

    let mut table = SymbolTable::new(&project);
    let build_diagnostics = table.build();
    assert!(build_diagnostics.is_empty());

    // The included file's declarations land at root scope.
    let root = table.scope(table.root());
    assert!(root.children.contains_key("SHARED_WIDTH"));
    assert!(root.children.contains_key("top"));
}

#[test]
fn instance_ports_resolve_into_module_scope() {
    let dir = tempfile::tempdir().unwrap();
    write_file(
        dir.path(),
        "design.sv",
        "module leaf(input logic clk, input logic d, output logic q);\n\
         endmodule\n\
         module top(input logic clk);\n\
           wire d_sig, q_sig;\n\
           leaf u_leaf(.clk(clk), .d(d_sig), .q(q_sig));\n\
         endmodule\n",
    );
    let mut project = VerilogProject::new(dir.path(), vec![]);
    let mut diagnostics = Vec::new();
    project
        .open_translation_unit("design.sv", &mut diagnostics)
        .unwrap();

    let mut table = SymbolTable::new(&project);
    table.build();
    table.resolve_locally_only();
    let diagnostics = table.resolve();
    assert!(diagnostics.is_empty(), "{diagnostics:?}");

    let root = table.root();
    let leaf = table.scope(root).children["leaf"];
    let top = table.scope(root).children["top"];
    assert_eq!(table.scope(leaf).info.metatype, SymbolMetaType::Module);

    // The named ports resolved as members of leaf.
    let top_scope = table.scope(top);
    let instance_base = top_scope
        .info
        .local_references_to_bind
        .iter()
        .map(|&r| table.reference(r))
        .find(|r| r.component.identifier == "leaf")
        .expect("type reference for the instantiation");
    assert_eq!(instance_base.component.resolved_symbol, Some(leaf));
    assert_eq!(instance_base.children.len(), 3);
    for &port_ref in &instance_base.children {
        let port = table.reference(port_ref);
        assert_eq!(port.component.ref_type, ReferenceType::DirectMember);
        let resolved = port.component.resolved_symbol.expect("port resolves");
        assert!(table.scope(resolved).info.is_port_identifier);
    }
}

#[test]
fn missing_files_in_list_do_not_abort_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "present.sv", "module present;\nendmodule\n");
    write_file(dir.path(), "files.f", "present.sv\nghost.sv\n");

    let list = FileList::read(&dir.path().join("files.f")).unwrap();
    let mut project = VerilogProject::new(dir.path(), vec![]);
    let mut diagnostics = Vec::new();
    let mut failures = Vec::new();
    for path in &list.file_paths {
        if let Err(err) = project.open_translation_unit(path, &mut diagnostics) {
            failures.push(err.to_string());
        }
    }
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("ghost.sv"));

    let mut table = SymbolTable::new(&project);
    table.build();
    assert!(table.scope(table.root()).children.contains_key("present"));
}

#[test]
fn file_list_include_dirs_feed_the_project() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "inc/w.svh", "localparam int FROM_INC = 1;\n");
    write_file(
        dir.path(),
        "u.sv",
        "`include \"w.svh\"\nlocalparam int use_it = FROM_INC;\n",
    );
    write_file(dir.path(), "files.f", "+incdir+inc\nu.sv\n");

    let list = FileList::read(&dir.path().join("files.f")).unwrap();
    let include_dirs: Vec<PathBuf> = list
        .preprocessing
        .include_dirs
        .iter()
        .map(|d| dir.path().join(d))
        .collect();

    let mut project = VerilogProject::new(dir.path(), include_dirs);
    let mut diagnostics = Vec::new();
    for path in &list.file_paths {
        project.open_translation_unit(path, &mut diagnostics).unwrap();
    }
    assert!(diagnostics.is_empty(), "{diagnostics:?}");

    let mut table = SymbolTable::new(&project);
    table.build();
    let resolve_diagnostics = table.resolve();
    assert!(resolve_diagnostics.is_empty(), "{resolve_diagnostics:?}");
}
