//! Linter configuration: rulesets, rule bundles, and the project config
//! file.
//!
//! A configuration is the set of enabled rules with their per-rule
//! configuration strings. It starts from a ruleset (all, none, or the
//! default-enabled rules), then rule bundles layer enables/disables on top;
//! later sources override earlier ones.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::lint::LintRuleRegistry;

/// Baseline rule selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleSet {
    All,
    #[default]
    Default,
    None,
}

impl RuleSet {
    pub fn from_name(name: &str) -> Result<RuleSet> {
        match name {
            "all" => Ok(RuleSet::All),
            "default" => Ok(RuleSet::Default),
            "none" => Ok(RuleSet::None),
            other => Err(Error::other(format!(
                "unknown ruleset \"{other}\"; expected all, default, or none"
            ))),
        }
    }
}

/// One `[-]name[=config]` entry of a rule bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSetting {
    pub name: String,
    pub enabled: bool,
    pub configuration: String,
}

/// Parsed rule bundle, preserving entry order.
#[derive(Debug, Default)]
pub struct RuleBundle {
    pub settings: Vec<RuleSetting>,
}

impl RuleBundle {
    /// Parse a comma- or newline-separated bundle. Tolerated oddities come
    /// back as warnings: empty entries (including a stray trailing comma)
    /// are skipped, duplicate entries win-last.
    pub fn parse(text: &str) -> (RuleBundle, Vec<String>) {
        let mut bundle = RuleBundle::default();
        let mut warnings = Vec::new();
        let mut seen: BTreeMap<String, usize> = BTreeMap::new();

        let text = text.trim();
        if text.is_empty() {
            return (bundle, warnings);
        }
        let raw_entries: Vec<&str> = text.split([',', '\n']).map(str::trim).collect();
        // Empty entries are tolerated but warned about, so config typos
        // stay visible.
        for (index, entry) in raw_entries.iter().enumerate() {
            let entry = entry.trim();
            if entry.is_empty() {
                warnings.push(if index + 1 == raw_entries.len() {
                    "ignoring empty rule entry (trailing comma)".to_string()
                } else {
                    "ignoring empty rule entry".to_string()
                });
                continue;
            }
            if entry.starts_with('#') {
                continue;
            }
            let (name_part, configuration) = match entry.split_once('=') {
                Some((name, config)) => (name.trim(), config.trim().to_string()),
                None => (entry, String::new()),
            };
            let (enabled, name) = match name_part.strip_prefix('-') {
                Some(name) => (false, name.trim()),
                None => (true, name_part),
            };
            let setting = RuleSetting {
                name: name.to_string(),
                enabled,
                configuration,
            };
            if let Some(&previous) = seen.get(name) {
                warnings.push(format!(
                    "rule \"{name}\" appears multiple times; the last entry wins"
                ));
                bundle.settings[previous] = setting;
            } else {
                seen.insert(name.to_string(), bundle.settings.len());
                bundle.settings.push(setting);
            }
        }
        (bundle, warnings)
    }
}

/// Enabled rules with their configuration strings.
#[derive(Debug, Default)]
pub struct LinterConfiguration {
    enabled: BTreeMap<String, String>,
}

impl LinterConfiguration {
    /// Start from a baseline ruleset.
    pub fn from_rule_set(registry: &LintRuleRegistry, rule_set: RuleSet) -> Self {
        let mut config = Self::default();
        config.use_rule_set(registry, rule_set);
        config
    }

    /// Replace the selection with a baseline ruleset.
    pub fn use_rule_set(&mut self, registry: &LintRuleRegistry, rule_set: RuleSet) {
        self.enabled.clear();
        for descriptor in registry.descriptors() {
            let enable = match rule_set {
                RuleSet::All => true,
                RuleSet::Default => descriptor.default_enabled,
                RuleSet::None => false,
            };
            if enable {
                self.enabled.insert(descriptor.name.to_string(), String::new());
            }
        }
    }

    /// Layer a rule bundle on top of the current selection.
    pub fn use_rule_bundle(
        &mut self,
        registry: &LintRuleRegistry,
        bundle: &RuleBundle,
    ) -> Result<()> {
        for setting in &bundle.settings {
            if !registry.contains(&setting.name) {
                return Err(Error::unknown_rule(&setting.name));
            }
            if setting.enabled {
                self.enabled
                    .insert(setting.name.clone(), setting.configuration.clone());
            } else {
                self.enabled.remove(&setting.name);
            }
        }
        Ok(())
    }

    /// Apply a rules-config file body (bundle syntax, one entry per line or
    /// comma-separated). Later calls override earlier ones.
    pub fn merge_rules_config(
        &mut self,
        registry: &LintRuleRegistry,
        text: &str,
    ) -> Result<Vec<String>> {
        let (bundle, warnings) = RuleBundle::parse(text);
        self.use_rule_bundle(registry, &bundle)?;
        Ok(warnings)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.contains_key(name)
    }

    pub fn configuration_of(&self, name: &str) -> Option<&str> {
        self.enabled.get(name).map(String::as_str)
    }

    /// Enabled rules in name order.
    pub fn enabled_rules(&self) -> impl Iterator<Item = (&str, &str)> {
        self.enabled.iter().map(|(n, c)| (n.as_str(), c.as_str()))
    }

    pub fn len(&self) -> usize {
        self.enabled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }
}

// ============================================================================
// Project configuration file (svtools.toml)
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ToolConfig {
    #[serde(default)]
    pub lint: LintSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct LintSection {
    /// Baseline ruleset: all, default, or none.
    #[serde(default)]
    pub ruleset: Option<String>,

    /// Rule bundle entries applied on top of the ruleset.
    #[serde(default)]
    pub rules: Vec<String>,

    /// Waiver files applied to every lint run.
    #[serde(default)]
    pub waiver_files: Vec<String>,
}

pub const DEFAULT_CONFIG_FILE_NAME: &str = "svtools.toml";

/// Search upward from `start_dir` for the nearest project config file.
pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut cur = Some(start_dir);
    while let Some(dir) = cur {
        let candidate = dir.join(DEFAULT_CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Some(candidate);
        }
        cur = dir.parent();
    }
    None
}

pub fn load_config_file(path: &Path) -> Result<ToolConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| Error::input(path.to_path_buf(), e))?;
    let config: ToolConfig = toml::from_str(&raw)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::default_registry;

    #[test]
    fn rule_bundle_enable_disable_configure() {
        let (bundle, warnings) = RuleBundle::parse("no-tabs,-line-length,endif-comment=strict");
        assert!(warnings.is_empty());
        assert_eq!(bundle.settings.len(), 3);
        assert_eq!(
            bundle.settings[0],
            RuleSetting {
                name: "no-tabs".to_string(),
                enabled: true,
                configuration: String::new(),
            }
        );
        assert!(!bundle.settings[1].enabled);
        assert_eq!(bundle.settings[2].configuration, "strict");
    }

    #[test]
    fn rule_bundle_duplicates_win_last_with_warning() {
        let (bundle, warnings) =
            RuleBundle::parse("line-length=length:80,line-length=length:120");
        assert_eq!(bundle.settings.len(), 1);
        assert_eq!(bundle.settings[0].configuration, "length:120");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("last entry wins"));
    }

    #[test]
    fn rule_bundle_trailing_comma_warns() {
        let (bundle, warnings) = RuleBundle::parse("no-tabs,");
        assert_eq!(bundle.settings.len(), 1);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("trailing comma"));
    }

    #[test]
    fn rulesets_select_expected_rules() {
        let registry = default_registry();
        let all = LinterConfiguration::from_rule_set(registry, RuleSet::All);
        assert_eq!(all.len(), registry.descriptors().count());

        let none = LinterConfiguration::from_rule_set(registry, RuleSet::None);
        assert!(none.is_empty());

        let default = LinterConfiguration::from_rule_set(registry, RuleSet::Default);
        assert!(default.is_enabled("no-tabs"));
        assert!(!default.is_enabled("forbid-unpacked-dimensions"));
        assert!(default.len() < all.len());
    }

    #[test]
    fn bundle_layers_on_ruleset() {
        let registry = default_registry();
        let mut config = LinterConfiguration::from_rule_set(registry, RuleSet::Default);
        let (bundle, _) =
            RuleBundle::parse("forbid-unpacked-dimensions,-no-tabs,line-length=length:80");
        config.use_rule_bundle(registry, &bundle).unwrap();
        assert!(config.is_enabled("forbid-unpacked-dimensions"));
        assert!(!config.is_enabled("no-tabs"));
        assert_eq!(config.configuration_of("line-length"), Some("length:80"));
    }

    #[test]
    fn unknown_rule_is_rejected() {
        let registry = default_registry();
        let mut config = LinterConfiguration::default();
        let (bundle, _) = RuleBundle::parse("no-such-rule");
        let err = config.use_rule_bundle(registry, &bundle).unwrap_err();
        assert!(matches!(err, Error::UnknownRule(_)));
    }

    #[test]
    fn rules_config_files_merge_later_wins() {
        let registry = default_registry();
        let mut config = LinterConfiguration::from_rule_set(registry, RuleSet::None);
        config
            .merge_rules_config(registry, "no-tabs\nline-length=length:80\n")
            .unwrap();
        config
            .merge_rules_config(registry, "line-length=length:120\n-no-tabs\n")
            .unwrap();
        assert!(!config.is_enabled("no-tabs"));
        assert_eq!(config.configuration_of("line-length"), Some("length:120"));
    }

    #[test]
    fn ruleset_names() {
        assert_eq!(RuleSet::from_name("all").unwrap(), RuleSet::All);
        assert_eq!(RuleSet::from_name("default").unwrap(), RuleSet::Default);
        assert_eq!(RuleSet::from_name("none").unwrap(), RuleSet::None);
        assert!(RuleSet::from_name("bogus").is_err());
    }

    #[test]
    fn tool_config_parses() {
        let config: ToolConfig = toml::from_str(
            "[lint]\nruleset = \"all\"\nrules = [\"-no-tabs\"]\nwaiver_files = [\"w.txt\"]\n",
        )
        .unwrap();
        assert_eq!(config.lint.ruleset.as_deref(), Some("all"));
        assert_eq!(config.lint.rules, vec!["-no-tabs"]);
        assert_eq!(config.lint.waiver_files, vec!["w.txt"]);
    }
}
