use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use svtools::cli::{
    Args, AutofixMode, Command, LintArgs, ObfuscateArgs, OutputFormat, ProjectAction,
    ProjectCommand, RuleSetArg,
};
use svtools::config::{self, LinterConfiguration, RuleBundle, RuleSet};
use svtools::dependencies::FileDependencies;
use svtools::handler::{
    FixerMode, ViolationFixer, ViolationHandler, ViolationPrinter, ViolationWaiverPrinter,
    render_violation,
};
use svtools::lint::default_registry;
use svtools::linter::lint_one_file;
use svtools::obfuscate::{
    IdentifierObfuscator, obfuscate_code, preserve_builtin_functions, preserve_interface_names,
    random_equal_length_identifier,
};
use svtools::project::{FileList, TextStructure, VerilogProject};
use svtools::symbol_table::SymbolTable;
use svtools::waiver::WaiverSet;

// Exit codes: 0 clean, 1 lint violations, 2 lex/parse or tool failure,
// 3 autofix configuration error.
const EXIT_LINT: u8 = 1;
const EXIT_PARSE: u8 = 2;
const EXIT_AUTOFIX_CONFIG: u8 = 3;

fn main() -> ExitCode {
    svtools::telemetry::init_tracing();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(EXIT_PARSE)
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    match args.command {
        Command::Lint(lint) => lint_command(lint),
        Command::Obfuscate(obfuscate) => obfuscate_command(obfuscate),
        Command::Project(project) => project_command(project),
        Command::ListRules => {
            list_rules();
            Ok(ExitCode::SUCCESS)
        }
        Command::Explain { rule } => {
            explain_rule(&rule)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn list_rules() {
    for descriptor in default_registry().descriptors() {
        let default_marker = if descriptor.default_enabled {
            " [default]"
        } else {
            ""
        };
        println!(
            "{}\t{}\t{}{}",
            descriptor.name,
            descriptor.kind.as_str(),
            descriptor.description,
            default_marker
        );
    }
}

fn explain_rule(rule: &str) -> anyhow::Result<()> {
    let Some(descriptor) = default_registry().descriptor(rule) else {
        anyhow::bail!("unknown rule: {rule}");
    };
    println!("name: {}", descriptor.name);
    println!("kind: {}", descriptor.kind.as_str());
    println!("topic: {}", descriptor.topic);
    println!("description: {}", descriptor.description);
    println!("enabled by default: {}", descriptor.default_enabled);
    println!("see: {}", descriptor.url);
    Ok(())
}

// ============================================================================
// lint
// ============================================================================

fn lint_command(args: LintArgs) -> anyhow::Result<ExitCode> {
    let registry = default_registry();

    // Project config file, explicit or discovered.
    let tool_config = match &args.config {
        Some(path) => Some(config::load_config_file(path)?),
        None => {
            let cwd = std::env::current_dir()?;
            config::find_config_file(&cwd)
                .map(|path| config::load_config_file(&path))
                .transpose()?
        }
    };

    // Ruleset baseline: an explicit CLI choice wins over the config file.
    let rule_set = match (args.ruleset, &tool_config) {
        (RuleSetArg::Default, Some(tool)) => match &tool.lint.ruleset {
            Some(name) => RuleSet::from_name(name)?,
            None => RuleSet::Default,
        },
        (RuleSetArg::All, _) => RuleSet::All,
        (RuleSetArg::None, _) => RuleSet::None,
        (RuleSetArg::Default, None) => RuleSet::Default,
    };
    let mut configuration = LinterConfiguration::from_rule_set(registry, rule_set);

    // Config file rules, then --rules_config, then --rules; later wins.
    if let Some(tool) = &tool_config {
        let bundle_text = tool.lint.rules.join(",");
        report_warnings(configuration.merge_rules_config(registry, &bundle_text)?);
    }
    if let Some(path) = &args.rules_config {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read rules config {}", path.display()))?;
        report_warnings(configuration.merge_rules_config(registry, &text)?);
    }
    if let Some(bundle_text) = &args.rules {
        let (bundle, warnings) = RuleBundle::parse(bundle_text);
        report_warnings(warnings);
        configuration.use_rule_bundle(registry, &bundle)?;
    }

    // Waivers from the config file and the command line.
    let mut waivers = WaiverSet::default();
    if let Some(tool) = &tool_config {
        for path in &tool.lint.waiver_files {
            waivers.load_file(Path::new(path))?;
        }
    }
    for path in &args.waiver_files {
        waivers.load_file(path)?;
    }

    let mut handler = match make_handler(&args)? {
        Ok(handler) => handler,
        Err(exit) => return Ok(exit),
    };

    let paths: Vec<PathBuf> = if args.paths.is_empty() {
        vec![PathBuf::from("-")]
    } else {
        args.paths.clone()
    };

    let mut any_violations = false;
    let mut any_parse_failures = false;

    for path in &paths {
        let file_name = path.display().to_string();
        let content = if file_name == "-" {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        } else {
            match std::fs::read_to_string(path) {
                Ok(content) => content,
                Err(err) => {
                    // Input errors abort the file, not the batch.
                    eprintln!("cannot open {}: {err}", path.display());
                    any_parse_failures = true;
                    continue;
                }
            }
        };

        // Per-file rules config search, when requested.
        let file_configuration = if args.rules_config_search {
            let mut per_file = LinterConfiguration::from_rule_set(registry, rule_set);
            if let Some(found) = search_rules_config(path) {
                let text = std::fs::read_to_string(&found)?;
                report_warnings(per_file.merge_rules_config(registry, &text)?);
            }
            Some(per_file)
        } else {
            None
        };
        let effective = file_configuration.as_ref().unwrap_or(&configuration);

        let text = TextStructure::analyze(content);
        let result = lint_one_file(registry, effective, &text, &file_name, &waivers)?;
        svtools::trace_phase!(
            file = file_name.as_str(),
            violations = result.violations.len(),
            "linted"
        );

        for diagnostic in &result.diagnostics {
            eprintln!("{diagnostic}");
        }
        any_parse_failures |= result.parse_failed;

        if args.check_syntax {
            continue;
        }

        match args.format {
            OutputFormat::Json => print_json_violations(&file_name, &text, &result.violations)?,
            OutputFormat::Pretty => {
                handler.handle_violations(&file_name, &text, &result.violations)?;
            }
        }
        any_violations |= !result.violations.is_empty();
    }

    if any_parse_failures && args.parse_fatal {
        return Ok(ExitCode::from(EXIT_PARSE));
    }
    if any_violations && args.lint_fatal {
        return Ok(ExitCode::from(EXIT_LINT));
    }
    Ok(ExitCode::SUCCESS)
}

// Build the violation handler for the requested autofix mode, or an early
// exit code when the combination is invalid.
fn make_handler(
    args: &LintArgs,
) -> anyhow::Result<Result<Box<dyn ViolationHandler>, ExitCode>> {
    let show_context = args.show_diagnostic_context;

    let output: Box<dyn std::io::Write> = match &args.autofix_output_file {
        Some(path) => {
            let uses_output = matches!(
                args.autofix,
                AutofixMode::Patch | AutofixMode::PatchInteractive | AutofixMode::GenerateWaiver
            );
            if !uses_output {
                eprintln!(
                    "--autofix_output_file is only meaningful with patch or waiver modes"
                );
                return Ok(Err(ExitCode::from(EXIT_AUTOFIX_CONFIG)));
            }
            Box::new(
                std::fs::File::create(path)
                    .with_context(|| format!("cannot create {}", path.display()))?,
            )
        }
        None => Box::new(std::io::stdout()),
    };

    let handler: Box<dyn ViolationHandler> = match args.autofix {
        AutofixMode::No => Box::new(ViolationPrinter::new(output, show_context)),
        AutofixMode::GenerateWaiver => Box::new(ViolationWaiverPrinter::new(output)),
        AutofixMode::Patch => Box::new(ViolationFixer::new_batch(FixerMode::Patch, output)),
        AutofixMode::Inplace => Box::new(ViolationFixer::new_batch(
            FixerMode::Inplace,
            Box::new(std::io::sink()),
        )),
        AutofixMode::PatchInteractive => Box::new(ViolationFixer::new_interactive(
            FixerMode::Patch,
            output,
            Box::new(std::io::stderr()),
            Box::new(read_answer),
        )),
        AutofixMode::InplaceInteractive => Box::new(ViolationFixer::new_interactive(
            FixerMode::Inplace,
            Box::new(std::io::sink()),
            Box::new(std::io::stderr()),
            Box::new(read_answer),
        )),
    };
    Ok(Ok(handler))
}

// Prompt on stderr, read one answer character per line from stdin.
fn read_answer(prompt: &str) -> Option<char> {
    eprint!("{prompt}");
    let mut line = String::new();
    match std::io::stdin().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => line.trim().chars().next(),
    }
}

const RULES_CONFIG_SEARCH_NAME: &str = ".rules.svtools_lint";

fn search_rules_config(start: &Path) -> Option<PathBuf> {
    let mut dir = start.parent();
    while let Some(current) = dir {
        let candidate = current.join(RULES_CONFIG_SEARCH_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

fn report_warnings(warnings: Vec<String>) {
    for warning in warnings {
        eprintln!("warning: {warning}");
    }
}

fn print_json_violations(
    file_name: &str,
    text: &TextStructure,
    violations: &[svtools::linter::ViolationEntry],
) -> anyhow::Result<()> {
    let rendered: Vec<serde_json::Value> = violations
        .iter()
        .map(|entry| {
            let position = text.line_map.line_col(entry.violation.token.offset());
            serde_json::json!({
                "file": file_name,
                "line": position.line,
                "column": position.column,
                "rule": entry.rule_name,
                "reason": entry.violation.reason,
                "url": entry.url,
                "rendered": render_violation(file_name, text, entry, false),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}

// ============================================================================
// obfuscate
// ============================================================================

fn obfuscate_command(args: ObfuscateArgs) -> anyhow::Result<ExitCode> {
    let mut content = String::new();
    std::io::stdin().read_to_string(&mut content)?;

    let mut subst = IdentifierObfuscator::new(Box::new(random_equal_length_identifier));
    if let Some(path) = &args.load_map {
        let saved = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read map {}", path.display()))?;
        subst.load(&saved)?;
    }
    subst.set_decode_mode(args.decode);
    if args.preserve_builtin_functions {
        preserve_builtin_functions(&mut subst)?;
    }
    if args.preserve_interface {
        preserve_interface_names(&mut subst, &content)?;
    }

    let output = obfuscate_code(&content, &mut subst)?;
    print!("{output}");

    if let Some(path) = &args.save_map {
        std::fs::write(path, subst.save())
            .with_context(|| format!("cannot write map {}", path.display()))?;
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// project
// ============================================================================

fn project_command(args: ProjectCommand) -> anyhow::Result<ExitCode> {
    let file_list_path = args
        .file_list_path
        .as_ref()
        .context("--file_list_path is required")?;
    let file_list = FileList::read(file_list_path)?;

    let root = args
        .file_list_root
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let mut include_dirs: Vec<PathBuf> = file_list
        .preprocessing
        .include_dirs
        .iter()
        .map(|dir| root.join(dir))
        .collect();
    include_dirs.extend(args.include_dir_paths.iter().cloned());

    let mut project = VerilogProject::new(&root, include_dirs);
    let mut diagnostics = Vec::new();
    for path in &file_list.file_paths {
        if let Err(err) = project.open_translation_unit(path, &mut diagnostics) {
            // A missing file skips that unit, not the whole project.
            eprintln!("{err}");
        }
    }

    let mut table = SymbolTable::new(&project);
    diagnostics.extend(table.build());

    match args.action {
        ProjectAction::SymbolTableDefs => {
            print!("{}", table.print_symbol_definitions());
        }
        ProjectAction::SymbolTableRefs => {
            table.resolve_locally_only();
            diagnostics.extend(table.resolve());
            print!("{}", table.print_symbol_references());
        }
        ProjectAction::FileDeps => {
            let dependencies = FileDependencies::new(&table);
            print!("{dependencies}");
        }
    }

    for diagnostic in &diagnostics {
        eprintln!("{diagnostic}");
    }
    Ok(ExitCode::SUCCESS)
}
