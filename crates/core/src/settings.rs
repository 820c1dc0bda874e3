use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::Value;

use crate::logger;
use crate::types::AppTarget;

/// Contents of `config.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub enel: ProviderSettings,
    pub comgas: ProviderSettings,
    #[serde(rename = "hookURL")]
    pub hook_url: String,
    pub automation: AutomationSettings,
}

/// Credentials and scraper command for one utility provider. `user` is
/// handed to the scraper untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub user: Value,
    pub scraper: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutomationSettings {
    pub package: String,
    pub activity: String,
    pub home_marker: String,
    pub pay_bill_marker: String,
    pub wait_timeout_secs: u64,
    pub tap_hold_ms: u64,
    pub settle_units: u32,
    /// Extra or replacement UI expressions, by element name.
    pub expressions: BTreeMap<String, String>,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        let app = AppTarget::default();
        Self {
            package: app.package,
            activity: app.activity,
            home_marker: "Olá".into(),
            pay_bill_marker: "Pagar um boleto".into(),
            wait_timeout_secs: 10,
            tap_hold_ms: 10,
            settle_units: 5,
            expressions: BTreeMap::new(),
        }
    }
}

impl AutomationSettings {
    pub fn app(&self) -> AppTarget {
        AppTarget {
            package: self.package.clone(),
            activity: self.activity.clone(),
        }
    }
}

impl Settings {
    /// Read settings from `path`. A missing file yields defaults; an empty
    /// path or malformed JSON is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if path.as_os_str().is_empty() {
            bail!("invalid config path; cannot be empty");
        }

        let text = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                logger::warn(&format!("{} not found, using defaults", path.display()));
                return Ok(Self::default());
            }
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };

        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("config.json")).unwrap();
        assert!(settings.hook_url.is_empty());
        assert_eq!(settings.automation.home_marker, "Olá");
        assert_eq!(settings.automation.wait_timeout_secs, 10);
        assert_eq!(settings.automation.app(), AppTarget::default());
    }

    #[test]
    fn test_empty_path_is_error() {
        let err = Settings::load(Path::new("")).unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_malformed_json_is_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"hookURL\": ").unwrap();
        let err = Settings::load(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("parsing"));
    }

    #[test]
    fn test_full_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "enel": {{"user": {{"email": "a@b.c", "pwd": "x", "installation": 42}}, "scraper": ["enel-invoice", "--verbose"]}},
                "comgas": {{"user": {{"cpf": "000"}}}},
                "hookURL": "https://hooks.example/T0",
                "automation": {{
                    "homeMarker": "Oi",
                    "waitTimeoutSecs": 3,
                    "expressions": {{"buttonRow": "Pix.+?(\\[\\d+,\\d+\\]\\[\\d+,\\d+\\])"}}
                }}
            }}"#
        )
        .unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.hook_url, "https://hooks.example/T0");
        assert_eq!(settings.enel.user["installation"], 42);
        assert_eq!(
            settings.enel.scraper,
            Some(vec!["enel-invoice".to_string(), "--verbose".to_string()])
        );
        assert!(settings.comgas.scraper.is_none());
        assert_eq!(settings.automation.home_marker, "Oi");
        assert_eq!(settings.automation.wait_timeout_secs, 3);
        // untouched fields keep defaults
        assert_eq!(settings.automation.pay_bill_marker, "Pagar um boleto");
        assert_eq!(settings.automation.expressions.len(), 1);
    }
}
