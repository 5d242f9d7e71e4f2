//! Asset index: (site key, patrimonial code) -> asset (SIGA inventory export)

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SourceFile;
use crate::dates::{age_years, parse_cell};
use crate::error::{Dataset, IngestError, LookupError};
use crate::headers::{ColumnMap, Role};
use crate::keys::{patrimonial_key, site_key};
use crate::sheets::{cell_text, read_sheets, select_sheet, Cell, Sheet};

/// Columns a sheet must expose to be loaded as the asset dataset
pub const REQUIRED_ROLES: &[Role] = &[Role::Site, Role::PatrimonialCode];

const OPTIONAL_ROLES: &[Role] = &[
    Role::Denomination,
    Role::Brand,
    Role::Model,
    Role::Serial,
    Role::AcquisitionDate,
    Role::Age,
];

/// Upper bound, in characters, for descriptive fields
pub const MAX_FIELD_CHARS: usize = 200;

/// Dashes that decorate a site with a discriminator ("Name — code").
/// A plain hyphen belongs to the site name and is never a separator.
const SITE_DECORATIONS: &[char] = &['—', '–'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRecord {
    pub denomination: String,
    pub brand: String,
    pub model: String,
    pub serial: String,
    /// Whole years, a verbatim literal age, or empty
    pub age_years: String,
}

/// Lookup response: `found` plus the asset fields when found
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetLookup {
    pub found: bool,
    #[serde(flatten)]
    pub asset: Option<AssetRecord>,
}

impl From<Option<&AssetRecord>> for AssetLookup {
    fn from(asset: Option<&AssetRecord>) -> Self {
        Self {
            found: asset.is_some(),
            asset: asset.cloned(),
        }
    }
}

/// One-to-one composite key -> asset, later rows overwrite earlier ones
#[derive(Debug, Clone, Default)]
pub struct AssetIndex {
    by_key: HashMap<(String, String), AssetRecord>,
}

/// Counters from one ingestion pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub rows: usize,
    pub skipped: usize,
    pub overwritten: usize,
}

impl AssetIndex {
    /// Load from the configured file; ages are computed against `today`
    pub fn load(source: &SourceFile, today: NaiveDate) -> Result<Self, IngestError> {
        let sheets = read_sheets(&source.path, Dataset::Assets)?;
        Self::from_sheets(&sheets, source.sheet.as_deref(), &source.path, today).map(|(index, _)| index)
    }

    pub fn from_sheets(
        sheets: &[Sheet],
        pinned: Option<&str>,
        path: &Path,
        today: NaiveDate,
    ) -> Result<(Self, LoadReport), IngestError> {
        let selection = select_sheet(sheets, pinned, REQUIRED_ROLES).ok_or_else(|| IngestError::NoSheets {
            dataset: Dataset::Assets,
            path: path.to_path_buf(),
        })?;
        let sheet = &sheets[selection.index];

        let columns = ColumnMap::resolve(&sheet.headers, &[REQUIRED_ROLES, OPTIONAL_ROLES].concat());
        let missing = columns.missing(REQUIRED_ROLES);
        if !missing.is_empty() {
            return Err(IngestError::MissingColumns {
                dataset: Dataset::Assets,
                path: path.to_path_buf(),
                sheet: sheet.name.clone(),
                missing,
            });
        }
        for (role, idx) in columns.iter() {
            debug!(role = role.label(), column = %sheet.headers[idx], "column resolved");
        }

        let mut index = Self::default();
        let mut report = LoadReport::default();
        for row in sheet.data_rows() {
            report.rows += 1;

            let site = site_key(&cell_text(row, columns.get(Role::Site)));
            let code = patrimonial_key(&cell_text(row, columns.get(Role::PatrimonialCode)));
            if site.is_empty() || code.is_empty() {
                report.skipped += 1;
                continue;
            }

            let record = AssetRecord {
                denomination: bounded(cell_text(row, columns.get(Role::Denomination))),
                brand: bounded(cell_text(row, columns.get(Role::Brand))),
                model: bounded(cell_text(row, columns.get(Role::Model))),
                serial: bounded(cell_text(row, columns.get(Role::Serial))),
                age_years: row_age(row, &columns, today),
            };

            if index.insert(site, code, record).is_some() {
                report.overwritten += 1;
            }
        }

        if report.overwritten > 0 {
            warn!(
                overwritten = report.overwritten,
                "duplicate (site, code) rows found, later rows kept"
            );
        }
        info!(
            sheet = %sheet.name,
            verified = selection.verified,
            assets = index.len(),
            rows = report.rows,
            skipped = report.skipped,
            "asset index built"
        );
        Ok((index, report))
    }

    /// Insert under already-normalized keys, returning the replaced record
    pub fn insert(&mut self, site_key: String, code: String, record: AssetRecord) -> Option<AssetRecord> {
        self.by_key.insert((site_key, code), record)
    }

    /// Exact lookup by site text (decorations removed) and patrimonial code.
    /// `Ok(None)` is "not found"; `Err` is reserved for missing input.
    pub fn lookup(&self, site: &str, code: &str) -> Result<Option<&AssetRecord>, LookupError> {
        let code = patrimonial_key(code);
        if code.is_empty() {
            return Err(LookupError::MissingCode);
        }
        let site = site_key(undecorated_site(site));
        if site.is_empty() {
            return Err(LookupError::MissingSite);
        }
        Ok(self.by_key.get(&(site, code)))
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// "C.S. SAN ROQUE — 9999" -> "C.S. SAN ROQUE"
pub fn undecorated_site(site: &str) -> &str {
    site.rfind(SITE_DECORATIONS)
        .map_or(site, |pos| &site[..pos])
        .trim()
}

/// Computed age from the acquisition date, else the literal age column
fn row_age(row: &[Cell], columns: &ColumnMap, today: NaiveDate) -> String {
    let acquired = columns
        .get(Role::AcquisitionDate)
        .and_then(|col| row.get(col))
        .and_then(parse_cell);

    match acquired {
        Some(date) => age_years(date, today).to_string(),
        None => cell_text(row, columns.get(Role::Age)),
    }
}

fn bounded(mut value: String) -> String {
    if let Some((idx, _)) = value.char_indices().nth(MAX_FIELD_CHARS) {
        value.truncate(idx);
    }
    value
}
