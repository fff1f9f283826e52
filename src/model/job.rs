//! Jobs and the per-file settings that can travel with them

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Source language, inferred from the file extension when not given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    #[default]
    Cpp,
}

impl Language {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "c" => Some(Language::C),
            "cpp" | "cc" | "cxx" | "c++" | "h" | "hpp" | "hh" | "hxx" | "tpp" | "txx" => {
                Some(Language::Cpp)
            }
            _ => None,
        }
    }
}

/// A file handed to the executor without any compile settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub language: Language,
    pub size: u64,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, language: Language, size: u64) -> Self {
        Self {
            path: path.into(),
            language,
            size,
        }
    }

    /// Build from a path on disk, reading the size from metadata
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        let language = Language::from_path(&path).unwrap_or_default();
        Self {
            path,
            language,
            size,
        }
    }
}

/// Pre-resolved per-file settings, typically from a compile database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FileSettings {
    pub file: PathBuf,
    pub language: Language,
    pub size: u64,
    /// Directory the compiler was invoked from
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default)]
    pub include_paths: Vec<String>,
    #[serde(default)]
    pub standard: Option<String>,
}

impl FileSettings {
    pub fn new(file: impl Into<PathBuf>, language: Language, size: u64) -> Self {
        Self {
            file: file.into(),
            language,
            size,
            ..Self::default()
        }
    }
}

/// One unit of work: a file plus whatever settings were resolved for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Position in submission order, unique within one run
    pub index: usize,
    pub file: PathBuf,
    pub language: Language,
    pub size: u64,
    #[serde(default)]
    pub settings: Option<FileSettings>,
}

impl Job {
    pub fn from_source(index: usize, source: SourceFile) -> Self {
        Self {
            index,
            file: source.path,
            language: source.language,
            size: source.size,
            settings: None,
        }
    }

    pub fn from_settings(index: usize, settings: FileSettings) -> Self {
        Self {
            index,
            file: settings.file.clone(),
            language: settings.language,
            size: settings.size,
            settings: Some(settings),
        }
    }
}
