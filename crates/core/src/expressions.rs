//! Named regular expressions that locate UI elements in a `uiautomator` dump.
//!
//! Every expression has exactly one capturing group, and that group captures
//! the element's `bounds` literal (`[x1,y1][x2,y2]`).

use std::collections::BTreeMap;

use regex::Regex;
use thiserror::Error;

/// "Pagar" row on the home screen.
pub const BUTTON_ROW: &str = "buttonRow";
/// "Pagar um boleto" entry on the pay screen.
pub const INVOICE_BUTTON: &str = "invoiceButton";

const BUILTIN: &[(&str, &str)] = &[
    (BUTTON_ROW, r"Pagar.+?(\[\d+,\d+\]\[\d+,\d+\])"),
    (INVOICE_BUTTON, r#"Pagar.um.boleto".*?(\[\d+,\d+\]\[\d+,\d+\])"#),
];

#[derive(Debug, Error)]
pub enum ExpressionError {
    #[error("expression {name}: invalid regex: {source}")]
    Invalid {
        name: String,
        #[source]
        source: regex::Error,
    },

    #[error("expression {name}: expected exactly one capturing group, found {groups}")]
    CaptureGroups { name: String, groups: usize },
}

/// Immutable name -> pattern table. Built once and handed to the flow.
#[derive(Debug, Clone)]
pub struct ExpressionRegistry {
    patterns: BTreeMap<String, Regex>,
}

impl ExpressionRegistry {
    /// Built-in expressions for the banking app.
    pub fn builtin() -> Self {
        let patterns = BUILTIN
            .iter()
            .map(|(name, pat)| {
                // constant patterns, see test_builtin_patterns_have_one_group
                let re = Regex::new(pat).unwrap_or_else(|e| panic!("builtin expression {}: {}", name, e));
                (name.to_string(), re)
            })
            .collect();
        Self { patterns }
    }

    /// Only the given expressions, no built-ins.
    pub fn from_patterns(patterns: &BTreeMap<String, String>) -> Result<Self, ExpressionError> {
        let patterns = patterns
            .iter()
            .map(|(name, pat)| Ok((name.clone(), compile(name, pat)?)))
            .collect::<Result<_, ExpressionError>>()?;
        Ok(Self { patterns })
    }

    /// Built-ins plus `overrides`. An override replaces the built-in entry
    /// of the same name.
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Result<Self, ExpressionError> {
        let mut registry = Self::builtin();
        registry.patterns.extend(Self::from_patterns(overrides)?.patterns);
        Ok(registry)
    }

    /// Pattern for `name`. `None` is the empty pattern: callers treat it as
    /// a no-match.
    pub fn lookup(&self, name: &str) -> Option<&Regex> {
        self.patterns.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.patterns.keys().map(String::as_str)
    }
}

fn compile(name: &str, pat: &str) -> Result<Regex, ExpressionError> {
    let re = Regex::new(pat).map_err(|source| ExpressionError::Invalid {
        name: name.to_string(),
        source,
    })?;
    // captures_len counts the implicit whole-match group
    let groups = re.captures_len() - 1;
    if groups != 1 {
        return Err(ExpressionError::CaptureGroups {
            name: name.to_string(),
            groups,
        });
    }
    Ok(re)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_patterns_have_one_group() {
        for (name, pat) in BUILTIN {
            assert!(compile(name, pat).is_ok(), "{} failed validation", name);
        }
        let registry = ExpressionRegistry::builtin();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec![BUTTON_ROW, INVOICE_BUTTON]);
    }

    #[test]
    fn test_lookup_missing_is_none() {
        let registry = ExpressionRegistry::builtin();
        assert!(registry.lookup("noSuchElement").is_none());
        assert!(registry.lookup(BUTTON_ROW).is_some());
    }

    #[test]
    fn test_override_replaces_builtin() {
        let mut overrides = BTreeMap::new();
        overrides.insert(BUTTON_ROW.to_string(), r"Pix.+?(\[\d+,\d+\]\[\d+,\d+\])".to_string());
        overrides.insert("transferButton".to_string(), r"Transferir.+?(\[\d+,\d+\]\[\d+,\d+\])".to_string());

        let registry = ExpressionRegistry::with_overrides(&overrides).unwrap();
        assert!(registry.lookup(BUTTON_ROW).unwrap().as_str().starts_with("Pix"));
        assert!(registry.lookup("transferButton").is_some());
        assert!(registry.lookup(INVOICE_BUTTON).is_some());
    }

    #[test]
    fn test_override_rejects_bad_group_count() {
        let mut overrides = BTreeMap::new();
        overrides.insert("noGroup".to_string(), r"Pagar\s+\[\d+,\d+\]".to_string());
        let err = ExpressionRegistry::with_overrides(&overrides).unwrap_err();
        assert!(matches!(err, ExpressionError::CaptureGroups { groups: 0, .. }));

        let mut overrides = BTreeMap::new();
        overrides.insert("twoGroups".to_string(), r"(Pagar).+?(\[\d+,\d+\]\[\d+,\d+\])".to_string());
        let err = ExpressionRegistry::with_overrides(&overrides).unwrap_err();
        assert!(matches!(err, ExpressionError::CaptureGroups { groups: 2, .. }));
    }

    #[test]
    fn test_from_patterns_has_no_builtins() {
        let mut patterns = BTreeMap::new();
        patterns.insert(INVOICE_BUTTON.to_string(), r"Boleto.+?(\[\d+,\d+\]\[\d+,\d+\])".to_string());

        let registry = ExpressionRegistry::from_patterns(&patterns).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec![INVOICE_BUTTON]);
        assert!(registry.lookup(BUTTON_ROW).is_none());

        let empty = ExpressionRegistry::from_patterns(&BTreeMap::new()).unwrap();
        assert_eq!(empty.names().count(), 0);
    }

    #[test]
    fn test_override_rejects_invalid_regex() {
        let mut overrides = BTreeMap::new();
        overrides.insert("broken".to_string(), r"Pagar(\[".to_string());
        let err = ExpressionRegistry::with_overrides(&overrides).unwrap_err();
        assert!(matches!(err, ExpressionError::Invalid { .. }));
        assert!(err.to_string().contains("broken"));
    }
}
