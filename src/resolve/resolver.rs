//! Ordered matching rules.
//!
//! Rule order (first hit wins):
//!
//! 1. dataset-scoped or global overrides on the squashed name
//! 2. exact squashed-name match against localized names and aliases
//! 3. exact code match (ISO2 / ISO3 / NUTS / alternate codes)
//! 4. code in parentheses (`"Comunidad (ES51) Cataluña"`)
//! 5. a known spelling contained in the original input as whole words
//!
//! Within a rule, ties go to the entity declared first in the table. That is
//! deterministic but arbitrary (e.g. an input containing two region names);
//! it is kept as-is so outputs do not shift under a "smarter" tiebreak.
//!
//! Containment cannot tell a qualified name from the entity it mentions:
//! "Hong Kong, China" resolves to CN and "Democratic People's Republic of
//! Korea" to KR. Datasets carrying such rows need a scoped override.

use std::collections::BTreeMap;

use crate::domain::CanonicalEntity;
use crate::resolve::table::EntityTable;
use crate::text::{parenthetical_codes, squash};

/// Spellings shorter than this are not used for containment matching.
const MIN_CONTAINS_LEN: usize = 4;

/// Which rule produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    Override,
    Alias,
    Code,
    ParentheticalCode,
    Contains,
}

impl MatchRule {
    pub fn label(self) -> &'static str {
        match self {
            MatchRule::Override => "override",
            MatchRule::Alias => "alias",
            MatchRule::Code => "code",
            MatchRule::ParentheticalCode => "parenthetical code",
            MatchRule::Contains => "contains",
        }
    }
}

impl EntityTable {
    /// Resolve a raw name or code as found in `dataset_hint` (may be empty).
    ///
    /// Never panics; `None` means "omit from the chart", never zero.
    pub fn resolve(&self, name_or_code: &str, dataset_hint: &str) -> Option<&CanonicalEntity> {
        self.resolve_with_rule(name_or_code, dataset_hint)
            .map(|(entity, _)| entity)
    }

    pub fn resolve_with_rule(
        &self,
        name_or_code: &str,
        dataset_hint: &str,
    ) -> Option<(&CanonicalEntity, MatchRule)> {
        let raw = name_or_code.trim();
        let key = squash(raw);
        if key.is_empty() {
            return None;
        }

        let hit = self
            .match_override(&key, dataset_hint)
            .map(|idx| (idx, MatchRule::Override))
            .or_else(|| self.aliases.get(&key).map(|&idx| (idx, MatchRule::Alias)))
            .or_else(|| {
                self.codes
                    .get(&raw.to_ascii_uppercase())
                    .map(|&idx| (idx, MatchRule::Code))
            })
            .or_else(|| {
                parenthetical_codes(raw)
                    .iter()
                    .find_map(|code| self.codes.get(code))
                    .map(|&idx| (idx, MatchRule::ParentheticalCode))
            })
            .or_else(|| self.match_contains(raw).map(|idx| (idx, MatchRule::Contains)));

        match hit {
            Some((idx, rule)) => Some((&self.entities[idx], rule)),
            None => {
                tracing::debug!(input = raw, dataset = dataset_hint, "entity not resolved");
                None
            }
        }
    }

    fn match_override(&self, key: &str, dataset_hint: &str) -> Option<usize> {
        // Dataset-scoped overrides take precedence over global ones.
        let scoped = self
            .overrides
            .iter()
            .find(|o| o.dataset.as_deref() == Some(dataset_hint) && o.pattern == key);
        let global = || {
            self.overrides
                .iter()
                .find(|o| o.dataset.is_none() && o.pattern == key)
        };
        scoped.or_else(global).map(|o| o.entity)
    }

    fn match_contains(&self, raw: &str) -> Option<usize> {
        self.entities.iter().position(|entity| {
            entity
                .spellings()
                .filter(|s| s.chars().count() >= MIN_CONTAINS_LEN)
                .any(|s| contains_word(raw, s))
        })
    }
}

/// `needle` occurs in `haystack` with no letter or digit on either side.
fn contains_word(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

/// Distinct resolution misses, for diagnostics.
///
/// A miss is never an error: the row is simply left out of the chart.
#[derive(Debug, Clone, Default)]
pub struct ResolutionLog {
    misses: BTreeMap<(String, String), usize>,
}

impl ResolutionLog {
    pub fn record_miss(&mut self, dataset: &str, input: &str) {
        *self
            .misses
            .entry((dataset.to_string(), input.trim().to_string()))
            .or_default() += 1;
    }

    pub fn merge(&mut self, other: &ResolutionLog) {
        for (key, count) in &other.misses {
            *self.misses.entry(key.clone()).or_default() += count;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.misses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.misses.len()
    }

    /// `(dataset, input, occurrences)` sorted by dataset then input.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, usize)> {
        self.misses
            .iter()
            .map(|((dataset, input), count)| (dataset.as_str(), input.as_str(), *count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> EntityTable {
        EntityTable::builtin().unwrap()
    }

    #[test]
    fn parenthetical_region_code_resolves() {
        let table = table();
        let (entity, rule) = table
            .resolve_with_rule("Comunidad (ES51) Cataluña", "ine_regional")
            .unwrap();
        assert_eq!(entity.names.es, "Cataluña");
        assert_eq!(entity.names.en, "Catalonia");
        assert_eq!(entity.code, "ES51");
        assert_eq!(rule, MatchRule::ParentheticalCode);
    }

    #[test]
    fn spellings_resolve_to_the_same_entity() {
        let table = table();
        for input in ["Cataluña", "CATALUNA", "Catalunya", "catalonia", "ES51"] {
            assert_eq!(table.resolve(input, "").map(|e| e.code.as_str()), Some("ES51"), "{input}");
        }
    }

    #[test]
    fn codes_cross_map() {
        let table = table();
        assert_eq!(table.resolve("ESP", "").unwrap().code, "ES");
        assert_eq!(table.resolve("EL", "eurostat_gerd").unwrap().code, "GR");
        assert_eq!(table.resolve("UK", "").unwrap().code, "GB");
        let (_, rule) = table.resolve_with_rule("de", "").unwrap();
        assert_eq!(rule, MatchRule::Code);
    }

    #[test]
    fn overrides_apply_before_generic_rules() {
        let table = table();
        let (entity, rule) = table.resolve_with_rule("Madrid", "").unwrap();
        assert_eq!(entity.code, "ES30");
        assert_eq!(rule, MatchRule::Override);

        let (entity, rule) = table
            .resolve_with_rule("Comunidad Autónoma de Madrid", "ine_regional")
            .unwrap();
        assert_eq!(entity.code, "ES30");
        assert_eq!(rule, MatchRule::Override);
    }

    #[test]
    fn containment_uses_original_spelling() {
        let table = table();
        let (entity, rule) = table
            .resolve_with_rule("Total Andalucía (provisional)", "")
            .unwrap();
        assert_eq!(entity.code, "ES61");
        assert_eq!(rule, MatchRule::Contains);
    }

    #[test]
    fn containment_requires_whole_words() {
        let table = table();
        assert!(table.resolve("Franceville", "").is_none());
        assert!(table.resolve("Sub-Saharan Spainish", "").is_none());
        let (entity, rule) = table.resolve_with_rule("France (metropolitan)", "").unwrap();
        assert_eq!(entity.code, "FR");
        assert_eq!(rule, MatchRule::Contains);
        assert!(contains_word("Total Andalucía", "Andalucía"));
        assert!(!contains_word("Andalucíana", "Andalucía"));
    }

    #[test]
    fn eurostat_long_labels_resolve_to_aggregates() {
        let table = table();
        let eu = table
            .resolve("European Union - 27 countries (from 2020)", "eurostat_gerd")
            .unwrap();
        assert_eq!(eu.code, "EU27_2020");
        assert!(table.is_supranational(&eu.code));
    }

    #[test]
    fn misses_return_none_and_are_repeatable() {
        let table = table();
        assert!(table.resolve("Atlantis", "").is_none());
        assert!(table.resolve("", "").is_none());
        assert!(table.resolve("   ", "").is_none());
        let a = table.resolve("Comunitat Valenciana", "x").map(|e| e.code.clone());
        let b = table.resolve("Comunitat Valenciana", "x").map(|e| e.code.clone());
        assert_eq!(a, b);
    }

    #[test]
    fn resolution_log_counts_distinct_misses() {
        let mut log = ResolutionLog::default();
        log.record_miss("ine", "Atlantis");
        log.record_miss("ine", "Atlantis ");
        log.record_miss("eurostat", "Lemuria");
        assert_eq!(log.len(), 2);
        let first = log.iter().next().unwrap();
        assert_eq!(first, ("eurostat", "Lemuria", 1));
    }
}
