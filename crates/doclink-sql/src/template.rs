//! SQL template stores
//!
//! A template is looked up by key. On disk the key maps to
//! `<dir>/<key>.sqldat`, which may be UTF-8 or UTF-16 with a byte order mark.

use doclink_core::ErrorCode;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// File extension of stored templates
pub const TEMPLATE_EXTENSION: &str = "sqldat";

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("Template '{name}' not found at {}", .path.display())]
    NotFound { name: String, path: PathBuf },

    #[error("Template '{name}' not found")]
    Missing { name: String },

    #[error("Template '{name}' is not valid {encoding} text")]
    Encoding { name: String, encoding: &'static str },

    #[error("Failed to read template {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TemplateError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } | Self::Missing { .. } => ErrorCode::TemplateNotFound,
            Self::Encoding { .. } => ErrorCode::TemplateRenderError,
            Self::Io { .. } => ErrorCode::IoError,
        }
    }
}

/// Source of template text by key
pub trait TemplateStore: Send + Sync {
    fn load(&self, name: &str) -> Result<String, TemplateError>;
}

/// Templates stored as `.sqldat` files in one directory
#[derive(Debug, Clone)]
pub struct DirTemplateStore {
    dir: PathBuf,
}

impl DirTemplateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", name, TEMPLATE_EXTENSION))
    }
}

impl TemplateStore for DirTemplateStore {
    fn load(&self, name: &str) -> Result<String, TemplateError> {
        let path = self.path_for(name);
        tracing::debug!(template = name, path = %path.display(), "loading template");

        let bytes = std::fs::read(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                TemplateError::NotFound {
                    name: name.to_string(),
                    path: path.clone(),
                }
            } else {
                TemplateError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;

        decode_template(name, &bytes)
    }
}

/// Decode template bytes, honouring a UTF-8 or UTF-16 byte order mark
///
/// The mark itself never reaches the returned text.
pub fn decode_template(name: &str, bytes: &[u8]) -> Result<String, TemplateError> {
    let encoding_error = |encoding| TemplateError::Encoding {
        name: name.to_string(),
        encoding,
    };

    let text = match bytes {
        [0xFF, 0xFE, rest @ ..] => {
            decode_utf16(rest, u16::from_le_bytes).ok_or_else(|| encoding_error("UTF-16LE"))?
        }
        [0xFE, 0xFF, rest @ ..] => {
            decode_utf16(rest, u16::from_be_bytes).ok_or_else(|| encoding_error("UTF-16BE"))?
        }
        _ => String::from_utf8(bytes.to_vec()).map_err(|_| encoding_error("UTF-8"))?,
    };

    Ok(text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text))
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]])).collect();
    String::from_utf16(&units).ok()
}

/// Templates held in memory, for tests and embedded defaults
#[derive(Debug, Clone, Default)]
pub struct MemoryTemplateStore {
    templates: HashMap<String, String>,
}

impl MemoryTemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.templates.insert(name.into(), text.into());
        self
    }
}

impl TemplateStore for MemoryTemplateStore {
    fn load(&self, name: &str) -> Result<String, TemplateError> {
        self.templates
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateError::Missing { name: name.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn utf16le_with_bom(text: &str) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        let text = decode_template("t", b"\xEF\xBB\xBF{{ ACTION }} PROCEDURE").unwrap();
        assert_eq!(text, "{{ ACTION }} PROCEDURE");
    }

    #[test]
    fn test_utf16_le_and_be() {
        let le = utf16le_with_bom("SELECT 1");
        assert_eq!(decode_template("t", &le).unwrap(), "SELECT 1");

        let mut be = vec![0xFE, 0xFF];
        for unit in "SELECT 2".encode_utf16() {
            be.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_template("t", &be).unwrap(), "SELECT 2");
    }

    #[test]
    fn test_invalid_bytes() {
        let err = decode_template("t", &[0xC3, 0x28]).unwrap_err();
        assert!(matches!(err, TemplateError::Encoding { encoding: "UTF-8", .. }));

        let err = decode_template("t", &[0xFF, 0xFE, 0x41]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TemplateRenderError);
    }

    #[test]
    fn test_dir_store_reads_sqldat_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("spExport.sqldat"), utf16le_with_bom("{{ ACTION }} PROCEDURE spExport")).unwrap();

        let store = DirTemplateStore::new(dir.path());
        assert_eq!(store.load("spExport").unwrap(), "{{ ACTION }} PROCEDURE spExport");

        let err = store.load("spMissing").unwrap_err();
        assert_eq!(err.code(), ErrorCode::TemplateNotFound);
        assert!(err.to_string().contains("spMissing.sqldat"));
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryTemplateStore::new().with_template("StagingFromProp", "CREATE TABLE x");
        assert_eq!(store.load("StagingFromProp").unwrap(), "CREATE TABLE x");
        assert!(matches!(store.load("Other"), Err(TemplateError::Missing { .. })));
    }
}
