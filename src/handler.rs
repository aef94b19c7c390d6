//! Violation handlers: printing, interactive/batch fixing, patch emission,
//! and waiver generation.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write;
use std::path::Path;

use itertools::Itertools;

use crate::error::Result;
use crate::fix::AutoFix;
use crate::linter::ViolationEntry;
use crate::project::TextStructure;

/// Consumes the ordered violations of one file.
pub trait ViolationHandler {
    fn handle_violations(
        &mut self,
        path: &str,
        text: &TextStructure,
        violations: &[ViolationEntry],
    ) -> Result<()>;
}

/// Render one violation as `path:line:col: reason [rule]`, optionally with
/// the offending source line and a caret marker.
pub fn render_violation(
    path: &str,
    text: &TextStructure,
    entry: &ViolationEntry,
    show_context: bool,
) -> String {
    let position = text.line_map.line_col(entry.violation.token.offset());
    let mut out = format!(
        "{path}:{position}: {} [{}]",
        entry.violation.reason, entry.rule_name
    );
    if show_context {
        let line_number = position.line;
        if let Some(start) = text.line_map.line_start(line_number) {
            let line = text.content[start..]
                .split(['\n', '\r'])
                .next()
                .unwrap_or("");
            let _ = write!(out, "\n{line}\n{}^", " ".repeat(position.column - 1));
        }
    }
    out
}

// ============================================================================
// Printer
// ============================================================================

/// Prints each violation to a stream.
pub struct ViolationPrinter {
    out: Box<dyn Write>,
    show_context: bool,
}

impl ViolationPrinter {
    pub fn new(out: Box<dyn Write>, show_context: bool) -> Self {
        Self { out, show_context }
    }
}

impl ViolationHandler for ViolationPrinter {
    fn handle_violations(
        &mut self,
        path: &str,
        text: &TextStructure,
        violations: &[ViolationEntry],
    ) -> Result<()> {
        for entry in violations {
            writeln!(
                self.out,
                "{}",
                render_violation(path, text, entry, self.show_context)
            )?;
        }
        Ok(())
    }
}

// ============================================================================
// Waiver printer
// ============================================================================

/// Emits one waiver directive per violation, suitable for `--waiver_files`.
pub struct ViolationWaiverPrinter {
    out: Box<dyn Write>,
}

impl ViolationWaiverPrinter {
    pub fn new(out: Box<dyn Write>) -> Self {
        Self { out }
    }
}

impl ViolationHandler for ViolationWaiverPrinter {
    fn handle_violations(
        &mut self,
        path: &str,
        text: &TextStructure,
        violations: &[ViolationEntry],
    ) -> Result<()> {
        for entry in violations {
            let line = text.line_map.line_of(entry.violation.token.offset());
            writeln!(
                self.out,
                "waive --rule={} --line={line} --location=\"{path}\"",
                entry.rule_name
            )?;
        }
        Ok(())
    }
}

// ============================================================================
// Fixer
// ============================================================================

/// Where accepted fixes go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixerMode {
    /// Rewrite the source file when anything changed.
    Inplace,
    /// Emit a unified diff to the patch stream.
    Patch,
}

/// Per-violation answer in the interactive fix loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixAnswer {
    Apply,
    Reject,
    ApplyAllForRule,
    RejectAllForRule,
    ApplyAll,
    RejectAll,
    PrintFix,
    PrintAppliedFixes,
}

impl FixAnswer {
    fn from_char(c: char) -> Option<FixAnswer> {
        Some(match c {
            'y' => FixAnswer::Apply,
            'n' => FixAnswer::Reject,
            'a' => FixAnswer::ApplyAllForRule,
            'd' => FixAnswer::RejectAllForRule,
            'A' => FixAnswer::ApplyAll,
            'D' => FixAnswer::RejectAll,
            'p' => FixAnswer::PrintFix,
            'P' => FixAnswer::PrintAppliedFixes,
            _ => return None,
        })
    }
}

/// Reads one answer for a rendered prompt; `None` means end of input.
pub type AnswerSource = Box<dyn FnMut(&str) -> Option<char>>;

/// Applies accepted fixes, either in place or as a patch. Per-rule and
/// global answers are remembered across files.
pub struct ViolationFixer {
    mode: FixerMode,
    interactive: bool,
    patch_out: Box<dyn Write>,
    message_out: Box<dyn Write>,
    answers: AnswerSource,
    rule_answers: BTreeMap<String, FixAnswer>,
    ultimate_answer: Option<FixAnswer>,
}

impl ViolationFixer {
    pub fn new_interactive(
        mode: FixerMode,
        patch_out: Box<dyn Write>,
        message_out: Box<dyn Write>,
        answers: AnswerSource,
    ) -> Self {
        Self {
            mode,
            interactive: true,
            patch_out,
            message_out,
            answers,
            rule_answers: BTreeMap::new(),
            ultimate_answer: None,
        }
    }

    /// Non-interactive fixer: every available fix is applied.
    pub fn new_batch(mode: FixerMode, patch_out: Box<dyn Write>) -> Self {
        Self {
            mode,
            interactive: false,
            patch_out,
            message_out: Box::new(std::io::sink()),
            answers: Box::new(|_| None),
            rule_answers: BTreeMap::new(),
            ultimate_answer: None,
        }
    }

    // Decide apply/reject for one violation, consulting remembered answers
    // first and prompting only when still undecided.
    fn decide(
        &mut self,
        path: &str,
        text: &TextStructure,
        entry: &ViolationEntry,
        staged: &AutoFix,
    ) -> Result<FixAnswer> {
        match self.ultimate_answer {
            Some(FixAnswer::ApplyAll) => return Ok(FixAnswer::Apply),
            Some(FixAnswer::RejectAll) => return Ok(FixAnswer::Reject),
            _ => {}
        }
        if let Some(answer) = self.rule_answers.get(&entry.rule_name) {
            return Ok(match answer {
                FixAnswer::ApplyAllForRule => FixAnswer::Apply,
                _ => FixAnswer::Reject,
            });
        }
        if !self.interactive {
            return Ok(FixAnswer::Apply);
        }

        let fix = &entry.violation.autofixes[0];
        loop {
            let prompt = format!(
                "{}\nAutofix available: {}\nApply? [y/n/a/d/A/D/p/P] ",
                render_violation(path, text, entry, true),
                fix.description
            );
            let Some(c) = (self.answers)(&prompt) else {
                // End of input rejects everything from here on.
                self.ultimate_answer = Some(FixAnswer::RejectAll);
                return Ok(FixAnswer::Reject);
            };
            match FixAnswer::from_char(c) {
                Some(FixAnswer::Apply) => return Ok(FixAnswer::Apply),
                Some(FixAnswer::Reject) => return Ok(FixAnswer::Reject),
                Some(FixAnswer::ApplyAllForRule) => {
                    self.rule_answers
                        .insert(entry.rule_name.clone(), FixAnswer::ApplyAllForRule);
                    return Ok(FixAnswer::Apply);
                }
                Some(FixAnswer::RejectAllForRule) => {
                    self.rule_answers
                        .insert(entry.rule_name.clone(), FixAnswer::RejectAllForRule);
                    return Ok(FixAnswer::Reject);
                }
                Some(FixAnswer::ApplyAll) => {
                    self.ultimate_answer = Some(FixAnswer::ApplyAll);
                    return Ok(FixAnswer::Apply);
                }
                Some(FixAnswer::RejectAll) => {
                    self.ultimate_answer = Some(FixAnswer::RejectAll);
                    return Ok(FixAnswer::Reject);
                }
                Some(FixAnswer::PrintFix) => {
                    self.print_edits(fix)?;
                }
                Some(FixAnswer::PrintAppliedFixes) => {
                    self.print_edits(staged)?;
                }
                None => {
                    writeln!(
                        self.message_out,
                        "y=apply n=reject a=apply-all-for-rule d=reject-all-for-rule \
                         A=apply-all D=reject-all p=print-fix P=print-applied"
                    )?;
                }
            }
        }
    }

    fn print_edits(&mut self, fix: &AutoFix) -> Result<()> {
        if fix.is_empty() {
            writeln!(self.message_out, "(no edits)")?;
            return Ok(());
        }
        for edit in fix.edits() {
            writeln!(
                self.message_out,
                "replace {} with \"{}\"",
                edit.fragment, edit.replacement
            )?;
        }
        Ok(())
    }
}

impl ViolationHandler for ViolationFixer {
    fn handle_violations(
        &mut self,
        path: &str,
        text: &TextStructure,
        violations: &[ViolationEntry],
    ) -> Result<()> {
        let mut staged = AutoFix::default();
        staged.description = format!("fixes for {path}");

        for entry in violations {
            if entry.violation.autofixes.is_empty() {
                continue;
            }
            let answer = self.decide(path, text, entry, &staged)?;
            if answer != FixAnswer::Apply {
                continue;
            }
            let edits = entry.violation.autofixes[0].edits().cloned().collect();
            if let Err(conflict) = staged.add_edits(edits) {
                // Conflicting edit: report it and drop the offender.
                writeln!(self.message_out, "skipping fix: {conflict}")?;
            }
        }

        if staged.is_empty() {
            return Ok(());
        }
        let fixed = staged.apply(&text.content);
        if fixed == text.content {
            return Ok(());
        }
        match self.mode {
            FixerMode::Inplace => {
                std::fs::write(path, fixed)?;
            }
            FixerMode::Patch => {
                let diff = format_diff(&text.content, &fixed, Path::new(path));
                write!(self.patch_out, "{diff}")?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Unified diff
// ============================================================================

/// Unified diff between original and fixed source, with three lines of
/// context around each change.
pub fn format_diff(original: &str, fixed: &str, path: &Path) -> String {
    const CONTEXT: usize = 3;

    let original_lines: Vec<&str> = original.lines().collect();
    let fixed_lines: Vec<&str> = fixed.lines().collect();
    let max_len = original_lines.len().max(fixed_lines.len());

    let changed: Vec<usize> = (0..max_len)
        .filter(|&i| original_lines.get(i) != fixed_lines.get(i))
        .collect();
    if changed.is_empty() {
        return String::new();
    }

    let mut out = String::new();
    let path = path.display();
    let _ = writeln!(out, "--- a/{path}");
    let _ = writeln!(out, "+++ b/{path}");

    // Group changed lines into hunks when their context windows touch.
    let mut hunks: Vec<(usize, usize)> = Vec::new();
    for &index in &changed {
        let start = index.saturating_sub(CONTEXT);
        let end = (index + CONTEXT + 1).min(max_len);
        match hunks.last_mut() {
            Some((_, last_end)) if start <= *last_end => *last_end = end,
            _ => hunks.push((start, end)),
        }
    }

    for (start, end) in hunks {
        let original_size = end.min(original_lines.len()).saturating_sub(start);
        let fixed_size = end.min(fixed_lines.len()).saturating_sub(start);
        let _ = writeln!(
            out,
            "@@ -{},{original_size} +{},{fixed_size} @@",
            start + 1,
            start + 1
        );
        for index in start..end {
            if original_lines.get(index) == fixed_lines.get(index) {
                if let Some(line) = original_lines.get(index) {
                    let _ = writeln!(out, " {line}");
                }
            } else {
                if let Some(line) = original_lines.get(index) {
                    let _ = writeln!(out, "-{line}");
                }
                if let Some(line) = fixed_lines.get(index) {
                    let _ = writeln!(out, "+{line}");
                }
            }
        }
    }
    out
}

/// Render a one-line summary of how many violations each rule produced.
pub fn summarize_by_rule(violations: &[ViolationEntry]) -> String {
    let counts = violations.iter().counts_by(|v| v.rule_name.as_str());
    counts
        .into_iter()
        .sorted()
        .map(|(rule, count)| format!("{rule}: {count}"))
        .join(", ")
}
