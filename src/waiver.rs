//! Lint waivers: predicates that silently filter specific violations.
//!
//! Waiver files contain one directive per line:
//! `waive --rule=<name> [--line=<N>|--lines=<N>-<M>] [--location=<regex>]`.
//! Line numbers are 1-based inclusive. The same syntax is emitted by the
//! waiver-generating violation handler, so files round-trip.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::{Error, Result};

/// One parsed waiver directive.
#[derive(Debug)]
pub struct LintWaiver {
    pub rule: String,
    /// Inclusive 1-based line range, when restricted by line.
    pub lines: Option<(usize, usize)>,
    /// Path pattern, when restricted by location.
    pub location: Option<Regex>,
}

impl LintWaiver {
    fn matches(&self, rule: &str, path: &str, line: usize) -> bool {
        if self.rule != rule {
            return false;
        }
        if let Some((first, last)) = self.lines
            && !(first..=last).contains(&line)
        {
            return false;
        }
        if let Some(location) = &self.location
            && !location.is_match(path)
        {
            return false;
        }
        true
    }
}

/// All waivers in effect for a lint run.
#[derive(Debug, Default)]
pub struct WaiverSet {
    waivers: Vec<LintWaiver>,
}

impl WaiverSet {
    pub fn is_empty(&self) -> bool {
        self.waivers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.waivers.len()
    }

    /// True if a violation of `rule` at `path`:`line` is waived.
    pub fn is_waived(&self, rule: &str, path: &str, line: usize) -> bool {
        self.waivers.iter().any(|w| w.matches(rule, path, line))
    }

    /// Parse waiver directives from file content and add them to this set.
    pub fn parse(&mut self, path: &Path, content: &str) -> Result<()> {
        for (index, raw_line) in content.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some(arguments) = line.strip_prefix("waive") else {
                return Err(waiver_error(path, index + 1, "expected `waive` directive"));
            };
            self.waivers
                .push(parse_waiver_arguments(path, index + 1, arguments)?);
        }
        Ok(())
    }

    /// Read and parse one waiver file.
    pub fn load_file(&mut self, path: &Path) -> Result<()> {
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::input(path.to_path_buf(), e))?;
        self.parse(path, &content)
    }
}

fn waiver_error(path: &Path, line: usize, message: impl Into<String>) -> Error {
    Error::Waiver {
        path: path.to_path_buf(),
        line,
        message: message.into(),
    }
}

fn parse_waiver_arguments(path: &Path, line_number: usize, arguments: &str) -> Result<LintWaiver> {
    let mut rule: Option<String> = None;
    let mut lines: Option<(usize, usize)> = None;
    let mut location: Option<Regex> = None;

    for argument in split_arguments(arguments) {
        let Some((flag, value)) = argument.split_once('=') else {
            return Err(waiver_error(
                path,
                line_number,
                format!("malformed argument \"{argument}\""),
            ));
        };
        let value = value.trim_matches('"');
        match flag {
            "--rule" => rule = Some(value.to_string()),
            "--line" => {
                let n: usize = value.parse().map_err(|_| {
                    waiver_error(path, line_number, format!("bad line number \"{value}\""))
                })?;
                lines = Some((n, n));
            }
            "--lines" => {
                let Some((first, last)) = value.split_once('-') else {
                    return Err(waiver_error(
                        path,
                        line_number,
                        format!("expected N-M range, got \"{value}\""),
                    ));
                };
                let first: usize = first.parse().map_err(|_| {
                    waiver_error(path, line_number, format!("bad line range \"{value}\""))
                })?;
                let last: usize = last.parse().map_err(|_| {
                    waiver_error(path, line_number, format!("bad line range \"{value}\""))
                })?;
                lines = Some((first, last));
            }
            "--location" => {
                let pattern = Regex::new(value).map_err(|e| {
                    waiver_error(path, line_number, format!("bad location regex: {e}"))
                })?;
                location = Some(pattern);
            }
            other => {
                return Err(waiver_error(
                    path,
                    line_number,
                    format!("unknown argument \"{other}\""),
                ));
            }
        }
    }

    let Some(rule) = rule else {
        return Err(waiver_error(path, line_number, "missing --rule"));
    };
    Ok(LintWaiver {
        rule,
        lines,
        location,
    })
}

// Split on whitespace, keeping double-quoted spans intact.
fn split_arguments(text: &str) -> Vec<String> {
    let mut arguments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in text.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    arguments.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        arguments.push(current);
    }
    arguments
}

/// Convenience: load several waiver files into one set.
pub fn load_waiver_files(paths: &[PathBuf]) -> Result<WaiverSet> {
    let mut set = WaiverSet::default();
    for path in paths {
        set.load_file(path)?;
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_one(content: &str) -> WaiverSet {
        let mut set = WaiverSet::default();
        set.parse(Path::new("waivers.txt"), content).unwrap();
        set
    }

    #[test]
    fn waive_by_rule_line_and_location() {
        let set = parse_one("waive --rule=R --line=17 --location=\"mod.sv\"\n");
        assert!(set.is_waived("R", "mod.sv", 17));
        assert!(set.is_waived("R", "rtl/mod.sv", 17));
        assert!(!set.is_waived("R", "mod.sv", 18));
        assert!(!set.is_waived("other-rule", "mod.sv", 17));
        assert!(!set.is_waived("R", "different.sv", 17));
    }

    #[test]
    fn waive_line_range() {
        let set = parse_one("waive --rule=no-tabs --lines=5-9\n");
        assert!(!set.is_waived("no-tabs", "any.sv", 4));
        assert!(set.is_waived("no-tabs", "any.sv", 5));
        assert!(set.is_waived("no-tabs", "any.sv", 9));
        assert!(!set.is_waived("no-tabs", "any.sv", 10));
    }

    #[test]
    fn waive_without_restrictions_matches_everywhere() {
        let set = parse_one("# comment\n\nwaive --rule=line-length\n");
        assert_eq!(set.len(), 1);
        assert!(set.is_waived("line-length", "a.sv", 1));
        assert!(set.is_waived("line-length", "b.sv", 9999));
    }

    #[test]
    fn malformed_directives_are_errors() {
        let mut set = WaiverSet::default();
        let path = Path::new("w.txt");
        assert!(set.parse(path, "waiver --rule=R\n").is_err());
        assert!(set.parse(path, "waive --line=3\n").is_err());
        assert!(set.parse(path, "waive --rule=R --line=abc\n").is_err());
        assert!(set.parse(path, "waive --rule=R --lines=9\n").is_err());
        assert!(set.parse(path, "waive --rule=R --bogus=1\n").is_err());
        assert!(set.parse(path, "waive --rule=R --location=\"(\"\n").is_err());
    }

    #[test]
    fn quoted_location_may_contain_spaces() {
        let set = parse_one("waive --rule=R --location=\"dir with space/mod\"\n");
        assert!(set.is_waived("R", "dir with space/mod.sv", 1));
    }
}
