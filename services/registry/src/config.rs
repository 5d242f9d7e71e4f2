//! Source file configuration from environment variables
//!
//! | Variable       | Default                                   |
//! |----------------|-------------------------------------------|
//! | `DATA_DIR`     | `data` (then `app/data`)                  |
//! | `USERS_FILE`   | `UE PLIEGOS Y UE LIMA Y REGIONES.xlsx`    |
//! | `USERS_SHEET`  | `usuarios`                                |
//! | `IPRESS_FILE`  | `IPRESS.xlsx`, then `IPRESS.xls`          |
//! | `IPRESS_SHEET` | autodetect                                |
//! | `SIGA_FILE`    | `siga DLS 4.25.xlsx`                      |
//! | `SIGA_SHEET`   | autodetect                                |

use std::path::{Path, PathBuf};

const USERS_FILES: &[&str] = &["UE PLIEGOS Y UE LIMA Y REGIONES.xlsx"];
const IPRESS_FILES: &[&str] = &["IPRESS.xlsx", "IPRESS.xls", "IPRESS.csv"];
const SIGA_FILES: &[&str] = &["siga DLS 4.25.xlsx", "siga.xlsx", "siga.csv"];
const DEFAULT_USERS_SHEET: &str = "usuarios";

/// A source file plus an optional pinned sheet name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub sheet: Option<String>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sheet: None,
        }
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub users: SourceFile,
    pub facilities: SourceFile,
    pub assets: SourceFile,
}

impl Config {
    /// Read from the process environment (call `dotenvy::dotenv()` first)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any variable lookup; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dirs: Vec<PathBuf> = match var("DATA_DIR") {
            Some(dir) => vec![PathBuf::from(dir)],
            None => vec![PathBuf::from("data"), Path::new("app").join("data")],
        };

        let source = |file_var: &str, sheet_var: &str, candidates: &[&str]| SourceFile {
            path: var(file_var)
                .map(PathBuf::from)
                .unwrap_or_else(|| find_first(&data_dirs, candidates)),
            sheet: var(sheet_var),
        };

        let mut users = source("USERS_FILE", "USERS_SHEET", USERS_FILES);
        if users.sheet.is_none() {
            users.sheet = Some(DEFAULT_USERS_SHEET.to_string());
        }

        Self {
            users,
            facilities: source("IPRESS_FILE", "IPRESS_SHEET", IPRESS_FILES),
            assets: source("SIGA_FILE", "SIGA_SHEET", SIGA_FILES),
        }
    }
}

/// First existing `dir/name` (directories outer, names inner), else the very
/// first candidate so the "not found" error names a sensible path
pub fn find_first(dirs: &[PathBuf], names: &[&str]) -> PathBuf {
    let candidates: Vec<PathBuf> = dirs
        .iter()
        .flat_map(|dir| names.iter().map(move |name| dir.join(name)))
        .collect();

    candidates
        .iter()
        .find(|p| p.exists())
        .or_else(|| candidates.first())
        .cloned()
        .unwrap_or_default()
}
