//! Registry - In-memory facility and asset indices built from spreadsheet exports
//!
//! Responsibilities:
//! - Read XLS/XLSX/ODS workbooks and CSV exports into sheets
//! - Detect the right sheet and columns despite inconsistent headers
//! - Derive canonical unit, site and patrimonial-code keys
//! - Build the unit registry, facility directory and asset index once
//! - Answer fuzzy facility searches and exact asset lookups
//!
//! Everything is loaded by [`Registry::load`] at startup and never mutated
//! afterwards, so a `Registry` can be shared freely between request handlers.

pub mod assets;
pub mod config;
pub mod dates;
pub mod error;
pub mod facilities;
pub mod headers;
pub mod keys;
pub mod search;
pub mod sheets;
pub mod units;

pub use assets::{AssetIndex, AssetLookup, AssetRecord};
pub use config::{Config, SourceFile};
pub use error::{Dataset, IngestError, LookupError};
pub use facilities::{FacilityDirectory, FacilityRecord, NO_UNIT_KEY};
pub use units::{UnitDirectory, UnitRecord};

use chrono::{Local, NaiveDate};
use tracing::info;

/// The three immutable indices held for the lifetime of the process
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub units: UnitDirectory,
    pub facilities: FacilityDirectory,
    pub assets: AssetIndex,
}

impl Registry {
    /// Load every configured source. Any failure aborts the whole load.
    pub fn load(config: &Config) -> Result<Self, IngestError> {
        Self::load_at(config, Local::now().date_naive())
    }

    /// Same as [`Registry::load`] with an explicit reference date for asset ages
    pub fn load_at(config: &Config, today: NaiveDate) -> Result<Self, IngestError> {
        let units = UnitDirectory::load(&config.users)?;
        let facilities = FacilityDirectory::load(&config.facilities)?;
        let assets = AssetIndex::load(&config.assets, today)?;

        info!(
            units = units.len(),
            facility_keys = facilities.key_count(),
            facilities = facilities.record_count(),
            assets = assets.len(),
            "registry loaded"
        );

        Ok(Self {
            units,
            facilities,
            assets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    fn write(dir: &Path, name: &str, content: &str) -> SourceFile {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        SourceFile::new(path)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn test_load_all_sources_from_csv() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            users: write(
                dir.path(),
                "usuarios.csv",
                "ue_codigo;ue_nombre;pliego_codigo;pliego_nombre;password_temp\n\
                 145-1685;RED SAN ROQUE;145;GOB. REGIONAL;x1\n",
            ),
            facilities: write(
                dir.path(),
                "IPRESS.csv",
                "Código UE,Código Único,Nombre del Establecimiento,Categoría\n\
                 1685,00001234,C.S. SAN ROQUE,I-3\n\
                 1685,00001235,SAN MARTIN CLINIC,I-1\n",
            ),
            assets: write(
                dir.path(),
                "siga.csv",
                "Sede,Código Patrimonial,Denominación,Marca,Modelo,Serie,Fecha de Adquisición\n\
                 C.S. SAN ROQUE,0012345678901,MONITOR,LG,24MK,SN-1,15/05/2020\n",
            ),
        };

        let registry = Registry::load_at(&config, today()).unwrap();

        let unit = registry.units.get("145-1685").unwrap();
        assert_eq!(unit.parent_org_name, "GOB. REGIONAL");

        let hits = registry.facilities.search(&unit.unit_code, "san roque");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].facility_code, "00001234");

        let asset = registry
            .assets
            .lookup("C.S. SAN ROQUE — 00001234", "0012345678901")
            .unwrap()
            .unwrap();
        assert_eq!(asset.age_years, "5");
    }

    #[test]
    fn test_load_fails_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            users: SourceFile::new(dir.path().join("missing.xlsx")),
            facilities: SourceFile::new(dir.path().join("IPRESS.xlsx")),
            assets: SourceFile::new(dir.path().join("siga.xlsx")),
        };
        let err = Registry::load_at(&config, today()).unwrap_err();
        assert!(matches!(err, IngestError::SourceMissing { dataset: Dataset::Units, .. }));
        assert!(err.to_string().contains("missing.xlsx"));
    }

    #[test]
    fn test_load_fails_on_unresolvable_columns() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            users: write(
                dir.path(),
                "usuarios.csv",
                "ue_codigo,ue_nombre,pliego_codigo,pliego_nombre,password_temp\n1,a,b,c,d\n",
            ),
            facilities: write(dir.path(), "IPRESS.csv", "region,total\nLIMA,3\n"),
            assets: write(dir.path(), "siga.csv", "sede,codigo patrimonial\nLIMA,1\n"),
        };
        let err = Registry::load_at(&config, today()).unwrap_err();
        assert!(matches!(err, IngestError::MissingColumns { dataset: Dataset::Facilities, .. }));
    }
}
