//! Ranked fuzzy facility search over the facility directory

use tracing::debug;

use crate::facilities::{FacilityDirectory, FacilityRecord};
use crate::keys::{collapse_whitespace, strip_accents, unit_key};

/// Maximum number of hits returned by a search
pub const MAX_RESULTS: usize = 10;

/// Lowercase, accent-free, `[a-z0-9 ]` only, single spaces
pub fn normalize_for_tokens(s: &str) -> String {
    let replaced: String = strip_accents(s)
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == ' ' {
                c
            } else {
                ' '
            }
        })
        .collect();
    collapse_whitespace(&replaced)
}

/// Normalized views of the query, computed once per search
#[derive(Debug, Clone)]
struct Query<'a> {
    raw: &'a str,
    raw_lower: String,
    tokens: Vec<String>,
    compact: String,
}

impl<'a> Query<'a> {
    fn new(raw: &'a str) -> Self {
        let normalized = normalize_for_tokens(raw);
        Self {
            raw,
            raw_lower: collapse_whitespace(&raw.to_lowercase()),
            compact: normalized.replace(' ', ""),
            tokens: normalized.split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect(),
        }
    }
}

/// Normalized views of one facility name
struct NameViews {
    tokens: String,
    compact: String,
    raw_lower: String,
}

impl NameViews {
    fn new(name: &str) -> Self {
        let tokens = normalize_for_tokens(name);
        Self {
            compact: tokens.replace(' ', ""),
            raw_lower: collapse_whitespace(&name.to_lowercase()),
            tokens,
        }
    }
}

impl Query<'_> {
    fn all_tokens_in(&self, name: &NameViews) -> bool {
        !self.tokens.is_empty() && self.tokens.iter().all(|t| name.tokens.contains(t.as_str()))
    }

    fn prefixes(&self, name: &NameViews) -> bool {
        !self.compact.is_empty() && name.compact.starts_with(&self.compact)
    }

    fn in_code(&self, code: &str) -> bool {
        code.contains(self.raw)
    }

    fn matches(&self, record: &FacilityRecord, name: &NameViews) -> bool {
        self.all_tokens_in(name)
            || self.prefixes(name)
            || (!self.raw_lower.is_empty() && name.raw_lower.contains(&self.raw_lower))
            || self.in_code(&record.facility_code)
    }

    /// Sort key: (tier, length of the compared string), lower first
    fn rank(&self, record: &FacilityRecord, name: &NameViews) -> (u8, usize) {
        if self.prefixes(name) {
            (0, name.compact.len())
        } else if self.all_tokens_in(name) {
            (1, name.tokens.len())
        } else if self.in_code(&record.facility_code) {
            (2, record.facility_code.len())
        } else {
            (9, name.raw_lower.len())
        }
    }
}

impl FacilityDirectory {
    /// Candidate records for a unit key: the exact bucket, else the first
    /// bucket whose key ends with it, else every record.
    pub fn candidate_pool(&self, unit_key: &str) -> Vec<&FacilityRecord> {
        let exact = self.get(unit_key);
        if !exact.is_empty() {
            return exact.iter().collect();
        }

        if !unit_key.is_empty() {
            if let Some((_, records)) = self
                .iter()
                .find(|(key, records)| key.ends_with(unit_key) && !records.is_empty())
            {
                return records.iter().collect();
            }
        }

        self.iter().flat_map(|(_, records)| records.iter()).collect()
    }

    /// Ranked search within the caller's unit. An empty query yields no hits.
    pub fn search(&self, unit_code: &str, query: &str) -> Vec<&FacilityRecord> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let key = unit_key(unit_code);
        let pool = self.candidate_pool(&key);
        let pool_size = pool.len();
        let q = Query::new(query);

        let mut hits: Vec<((u8, usize), &FacilityRecord)> = pool
            .into_iter()
            .filter_map(|record| {
                let name = NameViews::new(&record.facility_name);
                q.matches(record, &name).then(|| (q.rank(record, &name), record))
            })
            .collect();
        let total = hits.len();

        // stable: equal ranks keep directory order
        hits.sort_by_key(|(rank, _)| *rank);
        hits.truncate(MAX_RESULTS);

        debug!(unit_code, unit_key = %key, pool_size, query, hits = total, "facility search");
        hits.into_iter().map(|(_, record)| record).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, code: &str) -> FacilityRecord {
        FacilityRecord {
            facility_code: code.to_string(),
            facility_name: name.to_string(),
            category: String::new(),
        }
    }

    fn directory(entries: &[(&str, &str, &str)]) -> FacilityDirectory {
        let mut dir = FacilityDirectory::default();
        for (unit, name, code) in entries {
            dir.insert(&unit_key(unit), record(name, code));
        }
        dir
    }

    fn names<'a>(hits: &[&'a FacilityRecord]) -> Vec<&'a str> {
        hits.iter().map(|r| r.facility_name.as_str()).collect()
    }

    fn sample() -> FacilityDirectory {
        directory(&[
            ("1685", "SAN ROQUE HEALTH CENTER", "001"),
            ("1685", "SAN MARTIN CLINIC", "002"),
        ])
    }

    // -------------------------------------------------------------------------
    // MATCHING RULES
    // -------------------------------------------------------------------------

    #[test]
    fn test_search_by_tokens() {
        let dir = sample();
        let hits = dir.search("1685", "san roque");
        assert_eq!(names(&hits), vec!["SAN ROQUE HEALTH CENTER"]);
    }

    #[test]
    fn test_search_empty_query() {
        let dir = sample();
        assert!(dir.search("1685", "").is_empty());
        assert!(dir.search("1685", "   ").is_empty());
    }

    #[test]
    fn test_search_by_code_substring() {
        let dir = sample();
        let hits = dir.search("1685", "002");
        assert_eq!(names(&hits), vec!["SAN MARTIN CLINIC"]);
    }

    #[test]
    fn test_search_ignores_accents_and_case() {
        let dir = directory(&[("1685", "Posta Médica Ñaña", "7")]);
        assert_eq!(dir.search("1685", "MEDICA nana").len(), 1);
        assert_eq!(dir.search("1685", "posta-médica").len(), 1);
    }

    #[test]
    fn test_search_token_order_does_not_matter() {
        let dir = sample();
        assert_eq!(names(&dir.search("1685", "roque san")), vec!["SAN ROQUE HEALTH CENTER"]);
    }

    #[test]
    fn test_search_compact_prefix() {
        let dir = directory(&[("1685", "C.S. SAN ROQUE", "1")]);
        // "cssan" is a prefix of the compact name "cssanroque"
        assert_eq!(dir.search("1685", "cs san").len(), 1);
        assert_eq!(dir.search("1685", "cssan").len(), 1);
    }

    #[test]
    fn test_search_raw_substring_with_punctuation() {
        let dir = directory(&[("1685", "C.S. SAN ROQUE", "1")]);
        assert_eq!(dir.search("1685", "c.s.").len(), 1);
        assert!(dir.search("1685", "zzz").is_empty());
    }

    // -------------------------------------------------------------------------
    // RANKING
    // -------------------------------------------------------------------------

    #[test]
    fn test_prefix_ranks_before_tokens_before_code() {
        let dir = directory(&[
            ("1685", "CLINICA 21", "900"),
            ("1685", "HOSPITAL SAN JUAN 21", "100"),
            ("1685", "POSTA EL CARMEN", "021"),
            ("1685", "21 DE MAYO", "500"),
        ]);
        let hits = dir.search("1685", "21");
        assert_eq!(
            names(&hits),
            vec!["21 DE MAYO", "CLINICA 21", "HOSPITAL SAN JUAN 21", "POSTA EL CARMEN"]
        );
    }

    #[test]
    fn test_shorter_names_rank_first_within_tier() {
        let dir = directory(&[
            ("1685", "SAN ROQUE DE LAS PALMAS", "1"),
            ("1685", "SAN ROQUE", "2"),
        ]);
        assert_eq!(
            names(&dir.search("1685", "san roque")),
            vec!["SAN ROQUE", "SAN ROQUE DE LAS PALMAS"]
        );
    }

    #[test]
    fn test_results_capped_at_ten() {
        let entries: Vec<(String, String)> = (0..25)
            .map(|i| (format!("CENTRO {i}"), format!("{i:03}")))
            .collect();
        let mut dir = FacilityDirectory::default();
        for (name, code) in &entries {
            dir.insert("1685", record(name, code));
        }
        assert_eq!(dir.search("1685", "centro").len(), MAX_RESULTS);
    }

    // -------------------------------------------------------------------------
    // CANDIDATE POOL
    // -------------------------------------------------------------------------

    #[test]
    fn test_pool_exact_unit_only() {
        let dir = directory(&[
            ("145-1685", "SAN ROQUE", "1"),
            ("400-0731", "SAN ROQUE II", "2"),
        ]);
        assert_eq!(names(&dir.search("145-1685", "san roque")), vec!["SAN ROQUE"]);
    }

    #[test]
    fn test_pool_suffix_fallback() {
        let mut dir = FacilityDirectory::default();
        dir.insert("0685", record("SAN ROQUE", "1"));
        dir.insert("0731", record("SAN ROQUE II", "2"));
        // "85" has no bucket of its own but "0685" ends with it
        assert_eq!(names(&dir.search("85", "san")), vec!["SAN ROQUE"]);
    }

    #[test]
    fn test_pool_global_fallback() {
        let dir = directory(&[
            ("1685", "SAN ROQUE", "1"),
            ("0731", "SAN MARTIN", "2"),
            ("", "SAN JOSE", "3"),
        ]);
        assert_eq!(dir.search("9999", "san").len(), 3);
        assert_eq!(dir.search("", "san").len(), 3);
    }

    #[test]
    fn test_normalize_for_tokens() {
        assert_eq!(normalize_for_tokens("  C.S.  San-Roque (Ñ) "), "c s san roque n");
        assert_eq!(normalize_for_tokens("***"), "");
    }
}
