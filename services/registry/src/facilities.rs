//! Facility directory: unit key -> facilities (IPRESS master file)

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::SourceFile;
use crate::error::{Dataset, IngestError};
use crate::headers::{ColumnMap, Role};
use crate::keys::unit_key;
use crate::sheets::{cell_text, read_sheets, select_sheet, Sheet};

/// Bucket for rows whose unit code has no digits
pub const NO_UNIT_KEY: &str = "sin-ue";

/// Columns a sheet must expose to be loaded as the facility dataset
pub const REQUIRED_ROLES: &[Role] = &[Role::UnitCode, Role::FacilityCode, Role::FacilityName];

/// A health facility as listed in the master file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacilityRecord {
    pub facility_code: String,
    pub facility_name: String,
    /// Empty when the source has no category column or cell
    pub category: String,
}

/// Directory summary for diagnostics
#[derive(Debug, Clone, Serialize)]
pub struct DirectorySummary {
    pub keys: usize,
    pub records: usize,
    pub sample_keys: Vec<String>,
}

/// One-to-many unit key -> facilities, rows kept in source order.
/// Keys iterate in ascending order.
#[derive(Debug, Clone, Default)]
pub struct FacilityDirectory {
    by_unit: BTreeMap<String, Vec<FacilityRecord>>,
}

impl FacilityDirectory {
    /// Load from the configured file
    pub fn load(source: &SourceFile) -> Result<Self, IngestError> {
        let sheets = read_sheets(&source.path, Dataset::Facilities)?;
        Self::from_sheets(&sheets, source.sheet.as_deref(), &source.path)
    }

    /// Select the facility sheet among `sheets` and index it
    pub fn from_sheets(sheets: &[Sheet], pinned: Option<&str>, path: &Path) -> Result<Self, IngestError> {
        let selection = select_sheet(sheets, pinned, REQUIRED_ROLES).ok_or_else(|| IngestError::NoSheets {
            dataset: Dataset::Facilities,
            path: path.to_path_buf(),
        })?;
        let sheet = &sheets[selection.index];

        let columns = ColumnMap::resolve(&sheet.headers, &[REQUIRED_ROLES, &[Role::Category]].concat());
        let missing = columns.missing(REQUIRED_ROLES);
        if !missing.is_empty() {
            return Err(IngestError::MissingColumns {
                dataset: Dataset::Facilities,
                path: path.to_path_buf(),
                sheet: sheet.name.clone(),
                missing,
            });
        }
        for (role, idx) in columns.iter() {
            debug!(role = role.label(), column = %sheet.headers[idx], "column resolved");
        }

        let mut directory = Self::default();
        let mut unkeyed = 0usize;
        for row in sheet.data_rows() {
            let key = unit_key(&cell_text(row, columns.get(Role::UnitCode)));
            if key.is_empty() {
                unkeyed += 1;
            }
            directory.insert(
                &key,
                FacilityRecord {
                    facility_code: cell_text(row, columns.get(Role::FacilityCode)),
                    facility_name: cell_text(row, columns.get(Role::FacilityName)),
                    category: cell_text(row, columns.get(Role::Category)),
                },
            );
        }

        info!(
            sheet = %sheet.name,
            verified = selection.verified,
            units = directory.key_count(),
            facilities = directory.record_count(),
            without_unit = unkeyed,
            "facility directory built"
        );
        Ok(directory)
    }

    /// Append under `key`, or under [`NO_UNIT_KEY`] when it is empty
    pub fn insert(&mut self, key: &str, record: FacilityRecord) {
        let key = if key.is_empty() { NO_UNIT_KEY } else { key };
        self.by_unit.entry(key.to_string()).or_default().push(record);
    }

    pub fn get(&self, key: &str) -> &[FacilityRecord] {
        self.by_unit.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Buckets in ascending key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FacilityRecord])> {
        self.by_unit.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn key_count(&self) -> usize {
        self.by_unit.len()
    }

    pub fn record_count(&self) -> usize {
        self.by_unit.values().map(Vec::len).sum()
    }

    pub fn summary(&self, samples: usize) -> DirectorySummary {
        DirectorySummary {
            keys: self.key_count(),
            records: self.record_count(),
            sample_keys: self.by_unit.keys().take(samples).cloned().collect(),
        }
    }
}
