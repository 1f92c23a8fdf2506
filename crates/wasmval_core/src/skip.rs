//! Skip registry: entries and modules excluded from execution and comparison.
//!
//! A key either names a single entry (`module:entry`) or a whole module (`module`). Matching is exact string
//! equality; there are no wildcards.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SkipListError {
    #[error("malformed skip list: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid skip key `{0}`: expected `module` or `module:entry`")]
    InvalidKey(String),
}

/// What a skip rule excludes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SkipKey {
    Entry { module: String, entry: String },
    Module { module: String },
}

impl SkipKey {
    pub fn entry(module: impl Into<String>, entry: impl Into<String>) -> Self {
        SkipKey::Entry {
            module: module.into(),
            entry: entry.into(),
        }
    }

    pub fn module(module: impl Into<String>) -> Self {
        SkipKey::Module { module: module.into() }
    }
}

impl fmt::Display for SkipKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipKey::Entry { module, entry } => write!(f, "{}:{}", module, entry),
            SkipKey::Module { module } => f.write_str(module),
        }
    }
}

impl FromStr for SkipKey {
    type Err = SkipListError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((module, entry)) if !module.is_empty() && !entry.is_empty() && !entry.contains(':') => {
                Ok(SkipKey::entry(module, entry))
            }
            None if !s.is_empty() => Ok(SkipKey::module(s)),
            _ => Err(SkipListError::InvalidKey(s.to_string())),
        }
    }
}

/// One record of a skip-list file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SkipEntry {
    pub module: String,
    /// Omit to skip every entry of the module
    #[serde(default)]
    pub entry: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl SkipEntry {
    pub fn key(&self) -> SkipKey {
        match &self.entry {
            Some(entry) => SkipKey::entry(&self.module, entry),
            None => SkipKey::module(&self.module),
        }
    }
}

/// The configured set of skip rules, with optional reasons.
#[derive(Debug, Clone, Default)]
pub struct SkipSet {
    rules: HashMap<SkipKey, Option<String>>,
}

impl SkipSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON skip list: `[{ "module": "m", "entry": "f", "reason": "..." }]`.
    pub fn from_json(source: &str) -> Result<Self, SkipListError> {
        let records: Vec<SkipEntry> = serde_json::from_str(source)?;
        let mut set = SkipSet::new();
        for record in records {
            if record.module.is_empty() || record.entry.as_deref() == Some("") {
                return Err(SkipListError::InvalidKey(record.key().to_string()));
            }
            set.insert(record.key(), record.reason);
        }
        Ok(set)
    }

    /// Add a rule. A later rule for the same key replaces the reason.
    pub fn insert(&mut self, key: SkipKey, reason: Option<String>) {
        self.rules.insert(key, reason);
    }

    pub fn extend(&mut self, other: SkipSet) {
        self.rules.extend(other.rules);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// The rule matching this entry, checking the entry key before the module key.
    fn matching(&self, module: &str, entry: &str) -> Option<(&SkipKey, &Option<String>)> {
        self.rules
            .get_key_value(&SkipKey::entry(module, entry))
            .or_else(|| self.rules.get_key_value(&SkipKey::module(module)))
    }

    pub fn is_skipped(&self, module: &str, entry: &str) -> bool {
        self.matching(module, entry).is_some()
    }

    /// Reason recorded for the matching rule, if any.
    pub fn reason(&self, module: &str, entry: &str) -> Option<&str> {
        self.matching(module, entry).and_then(|(_, reason)| reason.as_deref())
    }
}

impl FromIterator<SkipKey> for SkipSet {
    fn from_iter<I: IntoIterator<Item = SkipKey>>(iter: I) -> Self {
        let mut set = SkipSet::new();
        for key in iter {
            set.insert(key, None);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keys() {
        assert_eq!("any_box_null:boxNull".parse::<SkipKey>().unwrap(), SkipKey::entry("any_box_null", "boxNull"));
        assert_eq!("rec_types".parse::<SkipKey>().unwrap(), SkipKey::module("rec_types"));
        assert!("".parse::<SkipKey>().is_err());
        assert!(":f".parse::<SkipKey>().is_err());
        assert!("m:".parse::<SkipKey>().is_err());
        assert!("a:b:c".parse::<SkipKey>().is_err());
    }

    #[test]
    fn test_key_display_round_trips_through_parse() {
        for key in [SkipKey::entry("m", "f"), SkipKey::module("m")] {
            assert_eq!(key.to_string().parse::<SkipKey>().unwrap(), key);
        }
    }

    #[test]
    fn test_entry_skip_only_matches_that_entry() {
        let set: SkipSet = [SkipKey::entry("m", "f")].into_iter().collect();
        assert!(set.is_skipped("m", "f"));
        assert!(!set.is_skipped("m", "g"));
        assert!(!set.is_skipped("other", "f"));
    }

    #[test]
    fn test_module_skip_matches_every_entry() {
        let set: SkipSet = [SkipKey::module("exception_throw_error")].into_iter().collect();
        assert!(set.is_skipped("exception_throw_error", "a"));
        assert!(set.is_skipped("exception_throw_error", "b"));
        assert!(!set.is_skipped("exception_throw", "a"));
    }

    #[test]
    fn test_matching_is_exact() {
        let set: SkipSet = [SkipKey::module("exception_throw_error.ts")].into_iter().collect();
        assert!(!set.is_skipped("exception_throw_error", "a"));
    }

    #[test]
    fn test_from_json_with_reasons() {
        let set = SkipSet::from_json(
            r#"[
                { "module": "declare_class", "entry": "classDecl", "reason": "require host API" },
                { "module": "exception_try_structure", "reason": "exception handling not supported yet" },
                { "module": "rec_types", "entry": "recursiveType1" }
            ]"#,
        )
        .unwrap();
        assert_eq!(set.len(), 3);
        assert_eq!(set.reason("declare_class", "classDecl"), Some("require host API"));
        assert_eq!(
            set.reason("exception_try_structure", "anything"),
            Some("exception handling not supported yet")
        );
        assert!(set.is_skipped("rec_types", "recursiveType1"));
        assert_eq!(set.reason("rec_types", "recursiveType1"), None);
    }

    #[test]
    fn test_entry_reason_wins_over_module_reason() {
        let mut set = SkipSet::new();
        set.insert(SkipKey::module("m"), Some("module".into()));
        set.insert(SkipKey::entry("m", "f"), Some("entry".into()));
        assert_eq!(set.reason("m", "f"), Some("entry"));
        assert_eq!(set.reason("m", "g"), Some("module"));
    }

    #[test]
    fn test_from_json_rejects_empty_names() {
        assert!(SkipSet::from_json(r#"[{ "module": "" }]"#).is_err());
        assert!(SkipSet::from_json(r#"[{ "module": "m", "entry": "" }]"#).is_err());
        assert!(SkipSet::from_json(r#"[{ "entry": "f" }]"#).is_err());
    }
}
