//! Validation manifest: the ordered list of modules and the entries to judge in each.
//!
//! The on-disk format is a JSON array:
//!
//! ```json
//! [
//!   { "module": "basicMath", "entries": [ { "name": "add", "args": [2, 3], "result": "5" } ] }
//! ]
//! ```
//!
//! `ret` is optional and defaults to `0`. Every other field is required; a manifest with a missing or mistyped
//! field is rejected as a whole.

use std::collections::HashSet;
use std::fmt;

use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("malformed manifest: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("manifest item #{index} has an empty module name")]
    EmptyModuleName { index: usize },

    #[error("entry #{index} of module `{module}` has an empty name")]
    EmptyEntryName { module: String, index: usize },

    #[error("module `{module}` is declared more than once")]
    DuplicateModule { module: String },
}

/// A primitive argument passed to an exported function on the runtime command line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Integer(i64),
    Float(f64),
    Bool(bool),
    String(String),
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgValue::Integer(n) => write!(f, "{}", n),
            ArgValue::Float(x) => write_number(f, *x),
            ArgValue::Bool(b) => write!(f, "{}", b),
            ArgValue::String(s) => f.write_str(s),
        }
    }
}

/// Shortest round-trip text of a number, in the form the sample programs print it.
///
/// Integral values have no fractional part (`3.0` -> `3`), zero has no sign, and magnitudes from `1e21` up or
/// below `1e-6` use exponent notation with an explicit sign (`1e+21`, `1.5e-7`).
fn write_number(f: &mut fmt::Formatter<'_>, x: f64) -> fmt::Result {
    if x.is_nan() {
        return f.write_str("NaN");
    }
    if x.is_infinite() {
        return f.write_str(if x > 0.0 { "Infinity" } else { "-Infinity" });
    }
    if x == 0.0 {
        return f.write_str("0");
    }
    if (1e-6..1e21).contains(&x.abs()) {
        return write!(f, "{}", x);
    }
    let exp = format!("{:e}", x);
    match exp.split_once('e') {
        Some((mantissa, power)) if !power.starts_with('-') => write!(f, "{}e+{}", mantissa, power),
        _ => f.write_str(&exp),
    }
}

/// One exported function to invoke, with its expected result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntryCase {
    /// Exported function name passed to the runtime via `-f`
    pub name: String,
    pub args: Vec<ArgValue>,
    /// Expected stdout, compared after trimming
    pub result: String,
    /// Expected process exit code
    #[serde(default)]
    pub ret: i32,
}

impl EntryCase {
    /// Arguments in the textual form handed to the runtime.
    pub fn arg_strings(&self) -> Vec<String> {
        self.args.iter().map(ToString::to_string).collect()
    }
}

/// One source module and its entries.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModuleCase {
    /// Source file stem
    pub module: String,
    pub entries: Vec<EntryCase>,
}

/// The full manifest, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationManifest {
    modules: Vec<ModuleCase>,
}

impl ValidationManifest {
    /// Parse and validate a JSON manifest.
    pub fn from_json(source: &str) -> Result<Self, ManifestError> {
        let modules: Vec<ModuleCase> = serde_json::from_str(source)?;
        Self::new(modules)
    }

    /// Build a manifest from already-parsed modules, applying the same validation as [`Self::from_json`].
    pub fn new(modules: Vec<ModuleCase>) -> Result<Self, ManifestError> {
        let mut seen = HashSet::new();
        for (index, module) in modules.iter().enumerate() {
            if module.module.trim().is_empty() {
                return Err(ManifestError::EmptyModuleName { index });
            }
            if !seen.insert(module.module.as_str()) {
                return Err(ManifestError::DuplicateModule {
                    module: module.module.clone(),
                });
            }
            if let Some(index) = module.entries.iter().position(|e| e.name.trim().is_empty()) {
                return Err(ManifestError::EmptyEntryName {
                    module: module.module.clone(),
                    index,
                });
            }
        }
        Ok(Self { modules })
    }

    pub fn modules(&self) -> &[ModuleCase] {
        &self.modules
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Number of entries across all modules.
    pub fn total_entries(&self) -> usize {
        self.modules.iter().map(|m| m.entries.len()).sum()
    }

    /// Keep only entries whose `module:entry` id contains `keyword`.
    ///
    /// Modules left without entries are dropped; order is preserved.
    pub fn filtered(&self, keyword: &str) -> ValidationManifest {
        let modules = self
            .modules
            .iter()
            .filter_map(|m| {
                let entries: Vec<EntryCase> = m
                    .entries
                    .iter()
                    .filter(|e| format!("{}:{}", m.module, e.name).contains(keyword))
                    .cloned()
                    .collect();
                if entries.is_empty() {
                    None
                } else {
                    Some(ModuleCase {
                        module: m.module.clone(),
                        entries,
                    })
                }
            })
            .collect();
        ValidationManifest { modules }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = r#"[
        { "module": "basicMath", "entries": [
            { "name": "add", "args": [2, 3], "result": "5" },
            { "name": "fail", "args": [], "result": "", "ret": 1 }
        ] },
        { "module": "strings", "entries": [
            { "name": "concat", "args": ["a", "b"], "result": "ab" }
        ] }
    ]"#;

    #[test]
    fn test_parse_preserves_declaration_order() {
        let manifest = ValidationManifest::from_json(BASIC).unwrap();
        let names: Vec<_> = manifest.modules().iter().map(|m| m.module.as_str()).collect();
        assert_eq!(names, ["basicMath", "strings"]);
        assert_eq!(manifest.modules()[0].entries[0].name, "add");
        assert_eq!(manifest.modules()[0].entries[1].name, "fail");
        assert_eq!(manifest.total_entries(), 3);
    }

    #[test]
    fn test_ret_defaults_to_zero() {
        let manifest = ValidationManifest::from_json(BASIC).unwrap();
        assert_eq!(manifest.modules()[0].entries[0].ret, 0);
        assert_eq!(manifest.modules()[0].entries[1].ret, 1);
    }

    #[test]
    fn test_missing_result_is_fatal() {
        let err = ValidationManifest::from_json(r#"[{ "module": "m", "entries": [{ "name": "f", "args": [] }] }]"#)
            .unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
        assert!(err.to_string().contains("result"));
    }

    #[test]
    fn test_missing_entries_is_fatal() {
        let err = ValidationManifest::from_json(r#"[{ "module": "m" }]"#).unwrap_err();
        assert!(err.to_string().contains("entries"));
    }

    #[test]
    fn test_missing_args_is_fatal() {
        let err =
            ValidationManifest::from_json(r#"[{ "module": "m", "entries": [{ "name": "f", "result": "" }] }]"#)
                .unwrap_err();
        assert!(matches!(err, ManifestError::Parse(_)));
    }

    #[test]
    fn test_duplicate_module_is_fatal() {
        let source = r#"[
            { "module": "m", "entries": [] },
            { "module": "m", "entries": [] }
        ]"#;
        let err = ValidationManifest::from_json(source).unwrap_err();
        assert!(matches!(err, ManifestError::DuplicateModule { module } if module == "m"));
    }

    #[test]
    fn test_empty_names_are_fatal() {
        let err = ValidationManifest::from_json(r#"[{ "module": " ", "entries": [] }]"#).unwrap_err();
        assert!(matches!(err, ManifestError::EmptyModuleName { index: 0 }));

        let err = ValidationManifest::from_json(
            r#"[{ "module": "m", "entries": [{ "name": "", "args": [], "result": "" }] }]"#,
        )
        .unwrap_err();
        assert!(matches!(err, ManifestError::EmptyEntryName { index: 0, .. }));
    }

    #[test]
    fn test_arg_textual_form() {
        let source = r#"[{ "module": "m", "entries": [
            { "name": "f", "args": [1, -7, 2.5, 3.0, true, "hi there"], "result": "" }
        ] }]"#;
        let manifest = ValidationManifest::from_json(source).unwrap();
        assert_eq!(
            manifest.modules()[0].entries[0].arg_strings(),
            ["1", "-7", "2.5", "3", "true", "hi there"]
        );
    }

    #[test]
    fn test_float_args_match_number_printing() {
        let text = |x: f64| ArgValue::Float(x).to_string();
        assert_eq!(text(-0.0), "0");
        assert_eq!(text(0.0), "0");
        assert_eq!(text(-3.0), "-3");
        assert_eq!(text(0.1), "0.1");
        assert_eq!(text(0.000001), "0.000001");
        assert_eq!(text(1e-7), "1e-7");
        assert_eq!(text(1.5e-7), "1.5e-7");
        assert_eq!(text(1e20), "100000000000000000000");
        assert_eq!(text(1e21), "1e+21");
        assert_eq!(text(-2.5e22), "-2.5e+22");
    }

    #[test]
    fn test_negative_zero_from_manifest() {
        let source = r#"[{ "module": "m", "entries": [{ "name": "f", "args": [-0.0, 1e21], "result": "" }] }]"#;
        let manifest = ValidationManifest::from_json(source).unwrap();
        assert_eq!(manifest.modules()[0].entries[0].arg_strings(), ["0", "1e+21"]);
    }

    #[test]
    fn test_filtered_keeps_matching_entries_only() {
        let manifest = ValidationManifest::from_json(BASIC).unwrap();

        let by_module = manifest.filtered("basicMath");
        assert_eq!(by_module.modules().len(), 1);
        assert_eq!(by_module.total_entries(), 2);

        let by_pair = manifest.filtered("basicMath:add");
        assert_eq!(by_pair.total_entries(), 1);

        assert!(manifest.filtered("nothing").is_empty());
    }
}
