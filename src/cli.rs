use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// svtools CLI options.
#[derive(Debug, Parser)]
#[command(
    name = "svtools",
    version,
    about = "SystemVerilog developer tools: linter, obfuscator, project analyzer"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Lint SystemVerilog files.
    Lint(LintArgs),

    /// Obfuscate identifiers in SystemVerilog read from stdin.
    Obfuscate(ObfuscateArgs),

    /// Analyze a project: symbol table and file dependencies.
    Project(ProjectCommand),

    /// List available lint rules.
    ListRules,

    /// Explain a lint rule.
    Explain {
        /// Lint rule name.
        rule: String,
    },
}

#[derive(Debug, Clone, ClapArgs)]
pub struct LintArgs {
    /// Files to lint. `-` reads from stdin.
    #[arg(value_name = "FILE")]
    pub paths: Vec<PathBuf>,

    /// Stop after lexing and parsing; report syntax issues only.
    #[arg(long = "check_syntax")]
    pub check_syntax: bool,

    /// Exit nonzero when any file fails to lex or parse.
    #[arg(long = "parse_fatal", default_value_t = true, action = clap::ArgAction::Set)]
    pub parse_fatal: bool,

    /// Exit nonzero when any lint violation survives waivers.
    #[arg(long = "lint_fatal", default_value_t = true, action = clap::ArgAction::Set)]
    pub lint_fatal: bool,

    /// Show the offending line under each violation.
    #[arg(long = "show_diagnostic_context")]
    pub show_diagnostic_context: bool,

    /// Autofix behavior.
    #[arg(long, value_enum, default_value_t = AutofixMode::No)]
    pub autofix: AutofixMode,

    /// Patch or waiver output file; defaults to stdout.
    #[arg(long = "autofix_output_file", value_name = "FILE")]
    pub autofix_output_file: Option<PathBuf>,

    /// Baseline ruleset.
    #[arg(long, value_enum, default_value_t = RuleSetArg::Default)]
    pub ruleset: RuleSetArg,

    /// Rule bundle: comma-separated `[-]rule[=config]` entries.
    #[arg(long, value_name = "BUNDLE", allow_hyphen_values = true)]
    pub rules: Option<String>,

    /// Rules configuration file (bundle syntax, one entry per line).
    #[arg(long = "rules_config", value_name = "FILE")]
    pub rules_config: Option<PathBuf>,

    /// Search upward from each file's directory for a rules config file.
    #[arg(long = "rules_config_search")]
    pub rules_config_search: bool,

    /// Waiver files.
    #[arg(long = "waiver_files", value_delimiter = ',', value_name = "FILES")]
    pub waiver_files: Vec<PathBuf>,

    /// Path to an svtools.toml; if omitted, parent directories are
    /// searched.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format for reported violations.
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AutofixMode {
    /// Report only.
    No,
    /// Interactively choose fixes, emit a patch.
    PatchInteractive,
    /// Apply all fixes, emit a patch.
    Patch,
    /// Interactively choose fixes, rewrite files.
    InplaceInteractive,
    /// Apply all fixes, rewrite files.
    Inplace,
    /// Emit a waiver file entry per violation.
    GenerateWaiver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RuleSetArg {
    All,
    Default,
    None,
}

#[derive(Debug, Clone, ClapArgs)]
pub struct ObfuscateArgs {
    /// Load an existing identifier map before encoding.
    #[arg(long = "load_map", value_name = "FILE")]
    pub load_map: Option<PathBuf>,

    /// Save the resulting identifier map.
    #[arg(long = "save_map", value_name = "FILE")]
    pub save_map: Option<PathBuf>,

    /// Reverse a previous obfuscation using the loaded map.
    #[arg(long)]
    pub decode: bool,

    /// Keep module/interface names, ports, and parameters unchanged.
    #[arg(long = "preserve_interface")]
    pub preserve_interface: bool,

    /// Keep builtin math function names unchanged.
    #[arg(long = "preserve_builtin_functions")]
    pub preserve_builtin_functions: bool,
}

#[derive(Debug, Clone, ClapArgs)]
pub struct ProjectCommand {
    #[command(subcommand)]
    pub action: ProjectAction,

    /// File list describing the project.
    #[arg(long = "file_list_path", value_name = "FILE", global = true)]
    pub file_list_path: Option<PathBuf>,

    /// Root directory the file list's paths are relative to.
    #[arg(long = "file_list_root", value_name = "DIR", global = true)]
    pub file_list_root: Option<PathBuf>,

    /// Additional include directories (comma-separated).
    #[arg(long = "include_dir_paths", value_delimiter = ',', value_name = "DIRS", global = true)]
    pub include_dir_paths: Vec<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ProjectAction {
    /// Print all symbol definitions.
    SymbolTableDefs,
    /// Print all symbol references and their resolution state.
    SymbolTableRefs,
    /// Print the inter-file dependency graph.
    FileDeps,
}
