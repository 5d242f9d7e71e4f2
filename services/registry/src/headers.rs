//! Header resolution: map inconsistent spreadsheet headers to semantic roles
//!
//! The alias catalog is data. Every role lists the header spellings it
//! accepts, in priority order; [`resolve`] compares them against the actual
//! headers after [`normalize_header`].

use crate::keys::strip_accents;

/// Semantic column roles recognized across the three datasets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    UnitCode,
    UnitName,
    ParentOrgCode,
    ParentOrgName,
    TempPassword,
    FacilityCode,
    FacilityName,
    Category,
    Site,
    PatrimonialCode,
    Denomination,
    Brand,
    Model,
    Serial,
    AcquisitionDate,
    Age,
}

/// Known header spellings per role (matched after normalization)
const ALIASES: &[(Role, &[&str])] = &[
    (
        Role::UnitCode,
        &[
            "ue_codigo",
            "ue",
            "unidad ejecutora",
            "ue cod",
            "uecodigo",
            "código ue",
            "codigo ue",
            "codigoue",
            "unit code",
            "unit",
            "executing unit",
        ],
    ),
    (Role::UnitName, &["ue_nombre", "nombre ue", "unit name"]),
    (
        Role::ParentOrgCode,
        &["pliego_codigo", "codigo pliego", "pliego", "parent org code"],
    ),
    (
        Role::ParentOrgName,
        &["pliego_nombre", "nombre pliego", "parent org name"],
    ),
    (
        Role::TempPassword,
        &["password_temp", "password", "contraseña", "temp password"],
    ),
    (
        Role::FacilityCode,
        &[
            "ipress_codigo",
            "codigo ipress",
            "ipress",
            "codipress",
            "codigo_ipress",
            "código único",
            "codigo unico",
            "codigounico",
            "facility code",
        ],
    ),
    (
        Role::FacilityName,
        &[
            "eess_nombre",
            "establecimiento de salud",
            "establecimiento",
            "nombre establecimiento",
            "nombre del establecimiento",
            "nombredelestablecimiento",
            "facility name",
            "facility",
        ],
    ),
    (
        Role::Category,
        &[
            "eess_categoria",
            "categoria eess",
            "categoria",
            "categoría",
            "nivel",
            "category",
        ],
    ),
    (
        Role::Site,
        &[
            "sede",
            "nombre sede",
            "nombre de sede",
            "local",
            "nombre local",
            "establecimiento",
            "nombre del establecimiento",
            "site",
            "site name",
        ],
    ),
    (
        Role::PatrimonialCode,
        &[
            "codigo patrimonial",
            "código patrimonial",
            "cod patrimonial",
            "cod. patrimonial",
            "codigo_patrimonial",
            "patrimonial",
            "patrimonio",
            "patrimonial code",
            "asset tag",
        ],
    ),
    (
        Role::Denomination,
        &[
            "denominacion",
            "denominación",
            "denominacion del bien",
            "nombre del bien",
            "descripcion",
            "descripción",
            "denomination",
            "description",
        ],
    ),
    (Role::Brand, &["marca", "brand"]),
    (Role::Model, &["modelo", "model"]),
    (
        Role::Serial,
        &[
            "serie",
            "numero de serie",
            "número de serie",
            "nro serie",
            "n° serie",
            "nro. serie",
            "serial",
            "serial number",
        ],
    ),
    (
        Role::AcquisitionDate,
        &[
            "fecha de adquisicion",
            "fecha adquisicion",
            "fecha_adquisicion",
            "fecha de compra",
            "fecha compra",
            "fecha alta",
            "acquisition date",
        ],
    ),
    (
        Role::Age,
        &[
            "antiguedad",
            "antigüedad",
            "antiguedad anos",
            "antigüedad (años)",
            "edad",
            "anos",
            "años",
            "age",
        ],
    ),
];

impl Role {
    /// Aliases accepted for this role, highest priority first
    pub fn aliases(self) -> &'static [&'static str] {
        ALIASES
            .iter()
            .find(|(role, _)| *role == self)
            .map(|(_, aliases)| *aliases)
            .unwrap_or(&[])
    }

    /// Human readable name used in diagnostics
    pub fn label(self) -> &'static str {
        match self {
            Role::UnitCode => "unit code",
            Role::UnitName => "unit name",
            Role::ParentOrgCode => "parent org code",
            Role::ParentOrgName => "parent org name",
            Role::TempPassword => "temp password",
            Role::FacilityCode => "facility code",
            Role::FacilityName => "facility name",
            Role::Category => "category",
            Role::Site => "site",
            Role::PatrimonialCode => "patrimonial code",
            Role::Denomination => "denomination",
            Role::Brand => "brand",
            Role::Model => "model",
            Role::Serial => "serial",
            Role::AcquisitionDate => "acquisition date",
            Role::Age => "age",
        }
    }
}

/// Lowercase, accent-free, alphanumerics only: "Código Único" -> "codigounico"
pub fn normalize_header(header: &str) -> String {
    strip_accents(header)
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Index of the first header matching any candidate, candidates tried in order
pub fn resolve<S: AsRef<str>>(headers: &[S], candidates: &[&str]) -> Option<usize> {
    let normalized: Vec<String> = headers
        .iter()
        .map(|h| normalize_header(h.as_ref()))
        .collect();

    candidates
        .iter()
        .map(|cand| normalize_header(cand))
        .filter(|cand| !cand.is_empty())
        .find_map(|cand| normalized.iter().position(|h| *h == cand))
}

/// Column positions resolved for a set of roles on one sheet
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    columns: Vec<(Role, usize)>,
}

impl ColumnMap {
    /// Resolve every role in `roles`; unresolved roles are simply absent
    pub fn resolve<S: AsRef<str>>(headers: &[S], roles: &[Role]) -> Self {
        let columns = roles
            .iter()
            .filter_map(|role| resolve(headers, role.aliases()).map(|idx| (*role, idx)))
            .collect();
        Self { columns }
    }

    pub fn get(&self, role: Role) -> Option<usize> {
        self.columns
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, idx)| *idx)
    }

    /// Roles from `required` that did not resolve
    pub fn missing(&self, required: &[Role]) -> Vec<Role> {
        required
            .iter()
            .copied()
            .filter(|role| self.get(*role).is_none())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Role, usize)> + '_ {
        self.columns.iter().copied()
    }
}

/// True when every role in `required` resolves against `headers`
pub fn satisfies<S: AsRef<str>>(headers: &[S], required: &[Role]) -> bool {
    required
        .iter()
        .all(|role| resolve(headers, role.aliases()).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // NORMALIZATION
    // -------------------------------------------------------------------------

    #[test]
    fn test_normalize_header_accents_and_punctuation() {
        assert_eq!(normalize_header("Código Único"), "codigounico");
        assert_eq!(normalize_header("  UE_Codigo "), "uecodigo");
        assert_eq!(normalize_header("Cod. Patrimonial"), "codpatrimonial");
        assert_eq!(normalize_header("N° Serie"), "nserie");
    }

    // -------------------------------------------------------------------------
    // RESOLVER
    // -------------------------------------------------------------------------

    #[test]
    fn test_resolve_matches_spelling_variants() {
        let headers = ["Código UE", "Código Único", "Nombre del Establecimiento"];
        assert_eq!(resolve(&headers, Role::UnitCode.aliases()), Some(0));
        assert_eq!(resolve(&headers, Role::FacilityCode.aliases()), Some(1));
        assert_eq!(resolve(&headers, Role::FacilityName.aliases()), Some(2));
        assert_eq!(resolve(&headers, Role::Category.aliases()), None);
    }

    #[test]
    fn test_resolve_candidate_priority_beats_column_order() {
        // "establecimiento" appears first but "eess_nombre" has priority
        let headers = ["Establecimiento", "EESS Nombre"];
        assert_eq!(resolve(&headers, Role::FacilityName.aliases()), Some(1));
    }

    #[test]
    fn test_resolve_compacted_and_english_variants() {
        assert_eq!(resolve(&["codigoue"], Role::UnitCode.aliases()), Some(0));
        assert_eq!(resolve(&["Executing Unit"], Role::UnitCode.aliases()), Some(0));
        assert_eq!(resolve(&["Unit-Code"], Role::UnitCode.aliases()), Some(0));
    }

    #[test]
    fn test_resolve_ignores_empty_candidates() {
        let headers = ["", "x"];
        assert_eq!(resolve(&headers, &["", "---"]), None);
    }

    #[test]
    fn test_every_role_has_aliases() {
        for (role, aliases) in ALIASES {
            assert!(!aliases.is_empty(), "{:?} has no aliases", role);
            assert_eq!(role.aliases().len(), aliases.len());
        }
    }

    // -------------------------------------------------------------------------
    // COLUMN MAP
    // -------------------------------------------------------------------------

    #[test]
    fn test_column_map_reports_missing_roles() {
        let headers = ["Sede", "Marca"];
        let map = ColumnMap::resolve(&headers, &[Role::Site, Role::PatrimonialCode, Role::Brand]);
        assert_eq!(map.get(Role::Site), Some(0));
        assert_eq!(map.get(Role::Brand), Some(1));
        assert_eq!(
            map.missing(&[Role::Site, Role::PatrimonialCode]),
            vec![Role::PatrimonialCode]
        );
    }

    #[test]
    fn test_satisfies() {
        let headers = ["ue", "ipress", "establecimiento"];
        assert!(satisfies(
            &headers,
            &[Role::UnitCode, Role::FacilityCode, Role::FacilityName]
        ));
        assert!(!satisfies(&headers, &[Role::Site, Role::PatrimonialCode]));
    }

    #[test]
    fn test_generic_date_column_is_not_acquisition_date() {
        let headers = ["Sede", "Fecha", "Fecha de Registro"];
        let map = ColumnMap::resolve(&headers, &[Role::AcquisitionDate]);
        assert_eq!(map.get(Role::AcquisitionDate), None);

        let headers = ["Fecha", "Fecha de Adquisición"];
        let map = ColumnMap::resolve(&headers, &[Role::AcquisitionDate]);
        assert_eq!(map.get(Role::AcquisitionDate), Some(1));
    }
}
