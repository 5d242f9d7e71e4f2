//! Unit registry: executing units (UE) with their parent organization (pliego)

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::config::SourceFile;
use crate::error::{Dataset, IngestError};
use crate::headers::{ColumnMap, Role};
use crate::sheets::{cell_text, read_sheets, select_sheet, Sheet};

pub const REQUIRED_ROLES: &[Role] = &[
    Role::UnitCode,
    Role::UnitName,
    Role::ParentOrgCode,
    Role::ParentOrgName,
    Role::TempPassword,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitRecord {
    pub unit_code: String,
    pub unit_name: String,
    pub parent_org_code: String,
    pub parent_org_name: String,
    #[serde(skip_serializing)]
    pub temp_password: String,
}

/// Units keyed by the raw (trimmed) unit code, no key normalization
#[derive(Debug, Clone, Default)]
pub struct UnitDirectory {
    by_code: HashMap<String, UnitRecord>,
}

impl UnitDirectory {
    pub fn load(source: &SourceFile) -> Result<Self, IngestError> {
        let sheets = read_sheets(&source.path, Dataset::Units)?;
        Self::from_sheets(&sheets, source.sheet.as_deref(), &source.path)
    }

    pub fn from_sheets(sheets: &[Sheet], pinned: Option<&str>, path: &Path) -> Result<Self, IngestError> {
        let selection = select_sheet(sheets, pinned, REQUIRED_ROLES).ok_or_else(|| IngestError::NoSheets {
            dataset: Dataset::Units,
            path: path.to_path_buf(),
        })?;
        let sheet = &sheets[selection.index];

        let columns = ColumnMap::resolve(&sheet.headers, REQUIRED_ROLES);
        let missing = columns.missing(REQUIRED_ROLES);
        if !missing.is_empty() {
            return Err(IngestError::MissingColumns {
                dataset: Dataset::Units,
                path: path.to_path_buf(),
                sheet: sheet.name.clone(),
                missing,
            });
        }

        let mut by_code = HashMap::new();
        for row in sheet.data_rows() {
            let unit_code = cell_text(row, columns.get(Role::UnitCode));
            if unit_code.is_empty() {
                continue;
            }
            by_code.insert(
                unit_code.clone(),
                UnitRecord {
                    unit_code,
                    unit_name: cell_text(row, columns.get(Role::UnitName)),
                    parent_org_code: cell_text(row, columns.get(Role::ParentOrgCode)),
                    parent_org_name: cell_text(row, columns.get(Role::ParentOrgName)),
                    temp_password: cell_text(row, columns.get(Role::TempPassword)),
                },
            );
        }

        info!(sheet = %sheet.name, units = by_code.len(), "unit registry built");
        Ok(Self { by_code })
    }

    /// Exact lookup; only surrounding whitespace is ignored
    pub fn get(&self, unit_code: &str) -> Option<&UnitRecord> {
        self.by_code.get(unit_code.trim())
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}
