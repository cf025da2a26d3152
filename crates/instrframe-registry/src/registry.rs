use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::kind::{ErrorKind, Severity, Status};

/// Size of the codes a table holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeWidth {
    /// One-byte codes (operation results, response characters).
    Byte,
    /// Two-byte status words.
    Word,
}

impl CodeWidth {
    pub fn bits(self) -> u8 {
        match self {
            CodeWidth::Byte => 8,
            CodeWidth::Word => 16,
        }
    }

    fn fits(self, code: u16) -> bool {
        match self {
            CodeWidth::Byte => code <= u16::from(u8::MAX),
            CodeWidth::Word => true,
        }
    }
}

fn default_severity() -> Severity {
    Severity::Fatal
}

/// One row of a vendor code table.
///
/// An entry without a `kind` marks a success code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableEntry {
    pub code: u16,
    #[serde(default)]
    pub kind: Option<ErrorKind>,
    #[serde(default = "default_severity")]
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
}

/// A vendor code table prior to validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorTable {
    pub name: String,
    pub width: CodeWidth,
    pub entries: Vec<TableEntry>,
}

impl ErrorTable {
    pub fn new(name: impl Into<String>, width: CodeWidth) -> Self {
        Self {
            name: name.into(),
            width,
            entries: Vec::new(),
        }
    }

    /// Add a success code.
    pub fn ok(mut self, code: u16, description: &str) -> Self {
        self.entries.push(TableEntry {
            code,
            kind: None,
            severity: Severity::Warning,
            description: description.to_string(),
        });
        self
    }

    /// Add an error or warning code.
    pub fn entry(mut self, code: u16, kind: ErrorKind, severity: Severity, description: &str) -> Self {
        self.entries.push(TableEntry {
            code,
            kind: Some(kind),
            severity,
            description: description.to_string(),
        });
        self
    }
}

#[derive(Debug, Clone)]
struct Resolved {
    status: Status,
    description: String,
}

/// Immutable lookup from vendor codes to [`Status`].
///
/// Built once from an [`ErrorTable`]; every code the table lists resolves to
/// its declared outcome and every other code resolves to
/// [`ErrorKind::Unknown`] with [`Severity::Fatal`].
#[derive(Debug, Clone)]
pub struct ErrorRegistry {
    name: String,
    width: CodeWidth,
    codes: BTreeMap<u16, Resolved>,
}

impl ErrorRegistry {
    /// Validate `table` and build a registry with default limits.
    pub fn register_error_table(table: ErrorTable) -> Result<Self> {
        Self::register_error_table_with_config(table, &RegistryConfig::default())
    }

    /// Validate `table` against `config` and build a registry.
    pub fn register_error_table_with_config(table: ErrorTable, config: &RegistryConfig) -> Result<Self> {
        if table.entries.len() > config.max_entries {
            return Err(RegistryError::TooManyEntries {
                count: table.entries.len(),
                max: config.max_entries,
            });
        }

        let mut codes = BTreeMap::new();
        for entry in table.entries {
            if !table.width.fits(entry.code) {
                return Err(RegistryError::CodeTooWide {
                    code: entry.code,
                    width: table.width.bits(),
                });
            }
            let status = match entry.kind {
                None => Status::Ok,
                Some(ErrorKind::Unknown(_)) => {
                    return Err(RegistryError::InvalidEntry {
                        code: entry.code,
                        reason: "the unknown kind is reserved for unlisted codes".to_string(),
                    });
                }
                Some(kind) => Status::Error {
                    kind,
                    severity: entry.severity,
                },
            };
            let resolved = Resolved {
                status,
                description: entry.description,
            };
            if codes.insert(entry.code, resolved).is_some() {
                return Err(RegistryError::DuplicateCode(entry.code));
            }
        }

        debug!(table = %table.name, entries = codes.len(), "error table registered");
        Ok(Self {
            name: table.name,
            width: table.width,
            codes,
        })
    }

    /// Build a registry from a JSON-encoded [`ErrorTable`].
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_json_with_config(json, &RegistryConfig::default())
    }

    pub fn from_json_with_config(json: &str, config: &RegistryConfig) -> Result<Self> {
        let table: ErrorTable = serde_json::from_str(json)?;
        Self::register_error_table_with_config(table, config)
    }

    /// Load a JSON table file, refusing files above the configured size.
    pub fn from_path(path: &Path, config: &RegistryConfig) -> Result<Self> {
        let metadata = std::fs::metadata(path)
            .map_err(|e| RegistryError::LoadFailed(format!("{}: {e}", path.display())))?;
        if metadata.len() > config.max_table_file_size as u64 {
            warn!(path = %path.display(), size = metadata.len(), "error table file too large");
            return Err(RegistryError::LoadFailed(format!(
                "{}: {} bytes exceeds limit of {}",
                path.display(),
                metadata.len(),
                config.max_table_file_size
            )));
        }
        let json = std::fs::read_to_string(path)
            .map_err(|e| RegistryError::LoadFailed(format!("{}: {e}", path.display())))?;
        Self::from_json_with_config(&json, config)
    }

    /// Classify `code`. Unlisted codes are never `Ok`.
    pub fn get(&self, code: u16) -> Status {
        match self.codes.get(&code) {
            Some(resolved) => resolved.status,
            None => Status::Error {
                kind: ErrorKind::Unknown(code),
                severity: Severity::Fatal,
            },
        }
    }

    /// Vendor description of a listed code.
    pub fn describe(&self, code: u16) -> Option<&str> {
        self.codes.get(&code).map(|r| r.description.as_str())
    }

    pub fn contains(&self, code: u16) -> bool {
        self.codes.contains_key(&code)
    }

    /// Listed codes in ascending order.
    pub fn codes(&self) -> impl Iterator<Item = u16> + '_ {
        self.codes.keys().copied()
    }

    /// Listed codes with their status and description, ascending.
    pub fn entries(&self) -> impl Iterator<Item = (u16, Status, &str)> + '_ {
        self.codes
            .iter()
            .map(|(code, r)| (*code, r.status, r.description.as_str()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> CodeWidth {
        self.width
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_table() -> ErrorTable {
        ErrorTable::new("test", CodeWidth::Byte)
            .ok(0x00, "ok")
            .entry(0x01, ErrorKind::ReadOnly, Severity::Fatal, "read only")
            .entry(0x02, ErrorKind::OutOfRange, Severity::Warning, "clipped")
    }

    #[test]
    fn listed_codes_resolve() {
        let registry = ErrorRegistry::register_error_table(small_table()).unwrap();
        assert_eq!(registry.get(0x00), Status::Ok);
        assert_eq!(
            registry.get(0x01),
            Status::Error {
                kind: ErrorKind::ReadOnly,
                severity: Severity::Fatal
            }
        );
        assert!(!registry.get(0x02).is_fatal());
        assert_eq!(registry.describe(0x02), Some("clipped"));
        assert_eq!(registry.codes().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(registry.name(), "test");
    }

    #[test]
    fn unlisted_codes_are_unknown_and_fatal() {
        let registry = ErrorRegistry::register_error_table(small_table()).unwrap();
        let status = registry.get(0x7F);
        assert_eq!(status.kind(), Some(ErrorKind::Unknown(0x7F)));
        assert!(status.is_fatal());
        assert_eq!(registry.describe(0x7F), None);
    }

    #[test]
    fn duplicate_codes_rejected() {
        let table = small_table().entry(0x01, ErrorKind::LocalMode, Severity::Fatal, "again");
        assert!(matches!(
            ErrorRegistry::register_error_table(table),
            Err(RegistryError::DuplicateCode(0x01))
        ));
    }

    #[test]
    fn unknown_kind_cannot_be_registered() {
        let table = small_table().entry(0x03, ErrorKind::Unknown(3), Severity::Fatal, "x");
        assert!(matches!(
            ErrorRegistry::register_error_table(table),
            Err(RegistryError::InvalidEntry { code: 3, .. })
        ));
    }

    #[test]
    fn byte_table_rejects_wide_codes() {
        let table = small_table().entry(0x0100, ErrorKind::ReadOnly, Severity::Fatal, "x");
        assert!(matches!(
            ErrorRegistry::register_error_table(table),
            Err(RegistryError::CodeTooWide { code: 0x0100, width: 8 })
        ));
    }

    #[test]
    fn entry_limit_enforced() {
        let config = RegistryConfig {
            max_entries: 2,
            ..RegistryConfig::default()
        };
        assert!(matches!(
            ErrorRegistry::register_error_table_with_config(small_table(), &config),
            Err(RegistryError::TooManyEntries { count: 3, max: 2 })
        ));
    }

    #[test]
    fn loads_from_json() {
        let json = r#"{
            "name": "custom",
            "width": "word",
            "entries": [
                { "code": 0, "description": "ok" },
                { "code": 513, "kind": "out_of_range", "severity": "warning" },
                { "code": 514, "kind": "local_mode" }
            ]
        }"#;
        let registry = ErrorRegistry::from_json(json).unwrap();
        assert_eq!(registry.width(), CodeWidth::Word);
        assert!(registry.get(0).is_ok());
        assert!(!registry.get(513).is_fatal());
        assert_eq!(
            registry.get(514),
            Status::Error {
                kind: ErrorKind::LocalMode,
                severity: Severity::Fatal
            }
        );
    }

    #[test]
    fn malformed_json_rejected() {
        assert!(matches!(
            ErrorRegistry::from_json("{ not json"),
            Err(RegistryError::InvalidJson(_))
        ));
    }

    #[test]
    fn from_path_enforces_size_limit() {
        let dir = std::env::temp_dir().join(format!("instrframe-registry-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("table.json");
        let json = serde_json::to_string(&small_table()).unwrap();
        std::fs::write(&path, &json).unwrap();

        let registry = ErrorRegistry::from_path(&path, &RegistryConfig::default()).unwrap();
        assert_eq!(registry.len(), 3);

        let tight = RegistryConfig {
            max_table_file_size: 8,
            ..RegistryConfig::default()
        };
        assert!(matches!(
            ErrorRegistry::from_path(&path, &tight),
            Err(RegistryError::LoadFailed(_))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_file_is_load_failure() {
        let err = ErrorRegistry::from_path(Path::new("/nonexistent/table.json"), &RegistryConfig::default())
            .unwrap_err();
        assert!(matches!(err, RegistryError::LoadFailed(_)));
    }
}
