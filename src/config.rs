//! Configuration types for tablesnap
//!
//! Two layers: [`Config`] is the on-disk document naming the credential and the
//! tables to back up, and [`BackupOptions`] holds the runtime knobs (endpoints,
//! download concurrency) that are set by the caller rather than the file.

use crate::error::{Error, Result};
use crate::id::{API_KEY_PREFIX, is_valid_id, is_valid_prefixed_id};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use url::Url;

/// Default root of the record listing API
pub const DEFAULT_API_ROOT: &str = "https://api.airtable.com/v0/";

/// Every attachment link must start with this prefix
pub const DEFAULT_ATTACHMENT_LINK_PREFIX: &str = "https://dl.airtable.com/.attachments/";

/// Mapping from base ID to the ordered list of table IDs to back up
///
/// This is the part of the configuration that is copied into the backup file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableSelection {
    /// Base ID -> table IDs, listed in the order they will be fetched
    #[serde(rename = "app-tables")]
    pub app_tables: BTreeMap<String, Vec<String>>,
}

impl TableSelection {
    /// Total number of configured tables across all bases
    pub fn table_count(&self) -> usize {
        self.app_tables.values().map(Vec::len).sum()
    }
}

/// The configuration document
///
/// ```json
/// {
///   "token": "keyXXXXXXXXXXXXXX",
///   "app-tables": { "appXXXXXXXXXXXXXX": ["tblXXXXXXXXXXXXXX"] }
/// }
/// ```
///
/// Unknown top-level fields are rejected.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Bearer credential for the listing API
    pub token: String,

    /// Base ID -> table IDs
    #[serde(rename = "app-tables")]
    pub app_tables: BTreeMap<String, Vec<String>>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("token", &"<redacted>")
            .field("app_tables", &self.app_tables)
            .finish()
    }
}

impl Config {
    /// Read and parse a configuration file
    ///
    /// Parsing is strict: unknown fields and type mismatches are errors.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(
                format!("failed to read {}: {}", path.display(), e),
                None,
            )
        })?;
        Self::from_json(&content)
    }

    /// Parse a configuration document
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::config(format!("failed to parse configuration: {e}"), None))
    }

    /// Check the credential and identifier shapes, and that no table is listed twice
    ///
    /// Runs before any network call. Extraction results are keyed by table ID,
    /// so a table may only appear once across all bases.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_prefixed_id(&self.token, API_KEY_PREFIX) {
            return Err(Error::config("invalid API key", Some("token")));
        }
        let mut owners: HashMap<&str, &str> = HashMap::new();
        for (base, tables) in &self.app_tables {
            if !is_valid_id(base) {
                return Err(Error::InvalidId {
                    kind: "base ID",
                    value: base.clone(),
                });
            }
            for table in tables {
                if !is_valid_id(table) {
                    return Err(Error::InvalidId {
                        kind: "table ID",
                        value: table.clone(),
                    });
                }
                if let Some(previous) = owners.insert(table, base) {
                    return Err(Error::config(
                        format!("table {table} is listed under both {previous} and {base}"),
                        Some("app-tables"),
                    ));
                }
            }
        }
        Ok(())
    }

    /// The table selection, without the credential
    pub fn table_selection(&self) -> TableSelection {
        TableSelection {
            app_tables: self.app_tables.clone(),
        }
    }
}

/// Runtime options for a backup run
#[derive(Clone, Debug)]
pub struct BackupOptions {
    /// Root URL of the listing API; `<base>/<table>` is appended
    pub api_root: Url,

    /// Prefix every attachment link must carry
    pub attachment_link_prefix: String,

    /// Number of attachments downloaded at once (default: 1, sequential)
    pub download_workers: usize,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            api_root: default_api_root(),
            attachment_link_prefix: DEFAULT_ATTACHMENT_LINK_PREFIX.to_string(),
            download_workers: default_download_workers(),
        }
    }
}

fn default_api_root() -> Url {
    // Constant input; a failure here would be a typo in DEFAULT_API_ROOT.
    #[allow(clippy::expect_used)]
    Url::parse(DEFAULT_API_ROOT).expect("DEFAULT_API_ROOT is a valid URL")
}

fn default_download_workers() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "appABCDEFGHIJKLMN";
    const TABLE: &str = "tblABCDEFGHIJKLMN";
    const TOKEN: &str = "keyABCDEFGHIJKLMN";

    #[test]
    fn parses_minimal_document() {
        let config = Config::from_json(&format!(
            r#"{{"token": "keyABCDEFGHIJKLMN", "app-tables": {{"{BASE}": ["{TABLE}"]}}}}"#
        ))
        .unwrap();

        assert_eq!(config.token, "keyABCDEFGHIJKLMN");
        assert_eq!(config.app_tables[BASE], vec![TABLE.to_string()]);
        config.validate().unwrap();
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = Config::from_json(r#"{"token": "k", "app-tables": {}, "extra": 1}"#).unwrap_err();
        match err {
            Error::Config { message, .. } => assert!(message.contains("extra")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_token() {
        assert!(Config::from_json(r#"{"app-tables": {}}"#).is_err());
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            format!(r#"{{"token": "t", "app-tables": {{"{BASE}": []}}}}"#),
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.app_tables[BASE].is_empty());
    }

    #[test]
    fn validate_rejects_malformed_ids() {
        let mut config = Config {
            token: TOKEN.into(),
            app_tables: BTreeMap::new(),
        };
        config
            .app_tables
            .insert("app/../../x".into(), vec![TABLE.into()]);
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidId { kind: "base ID", .. })
        ));

        config.app_tables.clear();
        config.app_tables.insert(BASE.into(), vec!["tbl?x".into()]);
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidId { kind: "table ID", .. })
        ));
    }

    #[test]
    fn validate_rejects_malformed_token() {
        let mut app_tables = BTreeMap::new();
        app_tables.insert(BASE.to_string(), vec![TABLE.to_string()]);
        for token in ["patABCDEFGHIJKLMN", "keyABC", "", "keyABCDEFGHIJKLM!"] {
            let config = Config {
                token: token.into(),
                app_tables: app_tables.clone(),
            };
            match config.validate() {
                Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("token")),
                other => panic!("expected Config error for {token:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn validate_rejects_table_listed_under_two_bases() {
        let mut config = Config {
            token: TOKEN.into(),
            app_tables: BTreeMap::new(),
        };
        config.app_tables.insert(BASE.into(), vec![TABLE.into()]);
        config
            .app_tables
            .insert("appZZZZZZZZZZZZZZ".into(), vec![TABLE.into()]);

        match config.validate() {
            Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("app-tables")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn debug_redacts_token() {
        let config = Config {
            token: "keySECRETSECRET12".into(),
            app_tables: BTreeMap::new(),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("SECRET"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn table_selection_serializes_with_dashed_key() {
        let mut app_tables = BTreeMap::new();
        app_tables.insert(BASE.to_string(), vec![TABLE.to_string()]);
        let selection = TableSelection { app_tables };

        let json = serde_json::to_value(&selection).unwrap();
        assert_eq!(json["app-tables"][BASE][0], TABLE);
        assert_eq!(selection.table_count(), 1);
    }

    #[test]
    fn default_options() {
        let options = BackupOptions::default();
        assert_eq!(options.api_root.as_str(), DEFAULT_API_ROOT);
        assert_eq!(options.download_workers, 1);
        assert!(options.attachment_link_prefix.starts_with("https://"));
    }
}
