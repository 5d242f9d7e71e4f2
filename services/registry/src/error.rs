//! Ingestion and lookup error types

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::headers::Role;

/// Which source a failure belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dataset {
    Units,
    Facilities,
    Assets,
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Dataset::Units => "units",
            Dataset::Facilities => "facilities",
            Dataset::Assets => "assets",
        })
    }
}

/// Fatal problems found while loading a source file at startup
#[derive(Debug, Error)]
pub enum IngestError {
    /// The configured file does not exist
    #[error("{dataset} source file not found: {path}")]
    SourceMissing { dataset: Dataset, path: PathBuf },

    /// calamine could not open or read the workbook
    #[error("failed to read workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    /// The CSV export could not be parsed
    #[error("failed to read CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{dataset} source {path} has no sheets")]
    NoSheets { dataset: Dataset, path: PathBuf },

    /// Required columns could not be matched on the selected sheet
    #[error(
        "{dataset} source {path}, sheet '{sheet}': missing required columns {}; expected one of: {}",
        describe_roles(.missing),
        describe_aliases(.missing)
    )]
    MissingColumns {
        dataset: Dataset,
        path: PathBuf,
        sheet: String,
        missing: Vec<Role>,
    },
}

/// Caller-input violations at query time ("not found" is never an error)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("patrimonial code is required")]
    MissingCode,
    #[error("site is required")]
    MissingSite,
}

fn describe_roles(roles: &[Role]) -> String {
    roles
        .iter()
        .map(|r| r.label())
        .collect::<Vec<_>>()
        .join(", ")
}

fn describe_aliases(roles: &[Role]) -> String {
    roles
        .iter()
        .map(|r| format!("{} = [{}]", r.label(), r.aliases().join(" | ")))
        .collect::<Vec<_>>()
        .join("; ")
}
