//! # Library Kinds and Script Resources
//!
//! Asset categories a client library can contain, and the readable script
//! bodies handed to the processor.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Asset category of a client library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    Script,
    Style,
}

impl LibraryKind {
    /// Infer the kind from a file extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "js" | "mjs" | "cjs" => Some(Self::Script),
            "css" | "less" => Some(Self::Style),
            _ => None,
        }
    }
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Script => write!(f, "JS"),
            Self::Style => write!(f, "CSS"),
        }
    }
}

/// A named script body that can be read on demand
pub trait ScriptResource {
    /// Identifier used in diagnostics and as the engine's source name
    fn name(&self) -> &str;

    /// Read the full script body
    fn read_to_string(&self) -> impl std::future::Future<Output = std::io::Result<String>> + Send;
}

/// Script stored on disk
#[derive(Debug, Clone)]
pub struct FileScript {
    path: PathBuf,
    name: String,
}

impl FileScript {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScriptResource for FileScript {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_to_string(&self) -> std::io::Result<String> {
        tokio::fs::read_to_string(&self.path).await
    }
}

/// Script held in memory
#[derive(Debug, Clone)]
pub struct InlineScript {
    name: String,
    source: String,
}

impl InlineScript {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
        }
    }
}

impl ScriptResource for InlineScript {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_to_string(&self) -> std::io::Result<String> {
        Ok(self.source.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_kind_from_path() {
        assert_eq!(LibraryKind::from_path(Path::new("a/b/app.js")), Some(LibraryKind::Script));
        assert_eq!(LibraryKind::from_path(Path::new("APP.MJS")), Some(LibraryKind::Script));
        assert_eq!(LibraryKind::from_path(Path::new("site.css")), Some(LibraryKind::Style));
        assert_eq!(LibraryKind::from_path(Path::new("README")), None);
        assert_eq!(LibraryKind::from_path(Path::new("logo.png")), None);
    }

    #[tokio::test]
    async fn test_file_script() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("main.js");
        std::fs::write(&path, "var a = 1;").unwrap();

        let script = FileScript::new(&path);
        assert_eq!(script.name(), "main.js");
        assert_eq!(script.read_to_string().await.unwrap(), "var a = 1;");
    }

    #[tokio::test]
    async fn test_missing_file_is_an_io_error() {
        let script = FileScript::new("/definitely/not/here.js");
        assert!(script.read_to_string().await.is_err());
    }
}
