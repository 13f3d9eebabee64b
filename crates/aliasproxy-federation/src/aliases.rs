//! Alias rewriting.
//!
//! An incoming alias is first looked up in the static table (exact match).
//! Failing that, the regex rules are tried in declaration order and the first
//! rule whose pattern matches anywhere in the alias rewrites it. Patterns are
//! not implicitly anchored; anchor them with `^…$` in config when needed.

use std::collections::HashMap;

use aliasproxy_common::config::PatternConfig;
use regex::Regex;

use crate::error::FederationError;

/// A compiled `pattern → replacement` rule. The replacement may reference
/// capture groups as `$1`, `${1}` or `${name}`.
#[derive(Debug, Clone)]
pub struct AliasRule {
    pub pattern: Regex,
    pub replacement: String,
}

/// Maps public aliases to the aliases that the homeserver actually knows.
#[derive(Debug, Clone, Default)]
pub struct AliasMapper {
    aliases: HashMap<String, String>,
    rules: Vec<AliasRule>,
}

impl AliasMapper {
    pub fn new(aliases: HashMap<String, String>, rules: Vec<AliasRule>) -> Self {
        Self { aliases, rules }
    }

    /// Compile the configured patterns, keeping their order.
    pub fn from_config(
        aliases: &HashMap<String, String>,
        patterns: &[PatternConfig],
    ) -> Result<Self, FederationError> {
        let rules = patterns
            .iter()
            .map(|p| {
                let pattern = Regex::new(&p.pattern).map_err(|source| {
                    FederationError::InvalidPattern { pattern: p.pattern.clone(), source }
                })?;
                Ok(AliasRule { pattern, replacement: p.replacement.clone() })
            })
            .collect::<Result<Vec<_>, FederationError>>()?;
        Ok(Self::new(aliases.clone(), rules))
    }

    /// Return the target alias for `alias`, or `None` if nothing maps it.
    pub fn resolve(&self, alias: &str) -> Option<String> {
        if let Some(target) = self.aliases.get(alias) {
            return Some(target.clone());
        }
        self.rules
            .iter()
            .find(|rule| rule.pattern.is_match(alias))
            .map(|rule| rule.pattern.replace_all(alias, rule.replacement.as_str()).into_owned())
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}
