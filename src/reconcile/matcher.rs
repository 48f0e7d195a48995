//! Reconciliation matcher — normalizes the guest registry and the payment
//! ledger, cross-references both sides, and classifies the discrepancies.
//!
//! Cost model: normalization is linear; the fuzzy pass is O(U·R) over
//! U unmatched ledger names and R registry names. Fine at hundreds of
//! records, not meant for thousands.

use std::collections::HashMap;

use regex::Regex;

use crate::reconcile::ledger::{LedgerEntry, LedgerSource};
use crate::reconcile::normalize;

/// Fuzzy candidates must score strictly above this bound.
const FUZZY_LOWER_BOUND: u8 = 90;
/// A score of exactly 100 is an exact match, never a fuzzy candidate.
const EXACT_SCORE: u8 = 100;

/// Classification of one name comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    /// Identical normalized names (or a similarity of exactly 100).
    Exact,
    /// Close but not identical; needs manual reconciliation.
    FuzzyCandidate { similarity: u8 },
    /// Registry name with no ledger counterpart.
    MissingInLedger,
    /// Ledger name with no registry counterpart.
    MissingInRegistry,
    /// Ledger-only name containing Latin letters or out-of-alphabet
    /// punctuation — a transliteration or data-entry error candidate.
    AnomalousEncoding,
}

/// One reported discrepancy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    /// The normalized name on the side it was encountered.
    pub name: String,
    /// For fuzzy candidates, the registry name it resembles.
    pub counterpart: Option<String>,
    pub result: MatchResult,
}

/// Categorized output of one reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationReport {
    exceptions: Vec<Exception>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.exceptions.is_empty()
    }

    fn in_category<'a>(
        &'a self,
        pred: impl Fn(&MatchResult) -> bool + 'a,
    ) -> impl Iterator<Item = &'a Exception> {
        self.exceptions.iter().filter(move |e| pred(&e.result))
    }

    pub fn fuzzy_candidates(&self) -> Vec<&Exception> {
        self.in_category(|r| matches!(r, MatchResult::FuzzyCandidate { .. }))
            .collect()
    }

    pub fn missing_in_ledger(&self) -> Vec<&Exception> {
        self.in_category(|r| *r == MatchResult::MissingInLedger)
            .collect()
    }

    pub fn missing_in_registry(&self) -> Vec<&Exception> {
        self.in_category(|r| *r == MatchResult::MissingInRegistry)
            .collect()
    }

    pub fn anomalous(&self) -> Vec<&Exception> {
        self.in_category(|r| *r == MatchResult::AnomalousEncoding)
            .collect()
    }

    /// Render the report for the organizer, categories in fixed order:
    /// fuzzy candidates, missing in ledger, missing in registry, anomalous.
    pub fn render(&self) -> String {
        if self.is_clean() {
            return "Все данные совпадают идеально!".to_string();
        }

        let mut out = String::new();

        let fuzzy = self.fuzzy_candidates();
        if !fuzzy.is_empty() {
            out.push_str("Нечеткие совпадения:\n");
            for e in fuzzy {
                if let MatchResult::FuzzyCandidate { similarity } = e.result {
                    out.push_str(&format!(
                        "«{}» (из таблицы) похоже на «{}» (из базы) — схожесть {}%\n",
                        e.name,
                        e.counterpart.as_deref().unwrap_or(""),
                        similarity
                    ));
                }
            }
            out.push('\n');
        }

        let sections: [(&str, Vec<&Exception>); 3] = [
            ("Отсутствуют в таблице:", self.missing_in_ledger()),
            ("Отсутствуют в базе:", self.missing_in_registry()),
            ("На латинице или со спец. символами:", self.anomalous()),
        ];
        for (heading, entries) in sections {
            if entries.is_empty() {
                continue;
            }
            out.push_str(heading);
            out.push('\n');
            let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
            out.push_str(&names.join(", "));
            out.push_str("\n\n");
        }

        out.trim_end().to_string()
    }
}

/// Edit-distance similarity on a 0–100 scale.
pub fn similarity(a: &str, b: &str) -> u8 {
    (strsim::normalized_levenshtein(a, b) * 100.0).round() as u8
}

/// Compare two normalized names. `None` below the fuzzy threshold.
pub fn compare(a: &str, b: &str) -> Option<MatchResult> {
    match similarity(a, b) {
        EXACT_SCORE => Some(MatchResult::Exact),
        s if s > FUZZY_LOWER_BOUND => Some(MatchResult::FuzzyCandidate { similarity: s }),
        _ => None,
    }
}

/// Reconciliation matcher. Holds the compiled anomaly pattern.
pub struct Matcher {
    anomaly: Regex,
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Matcher {
    pub fn new() -> Self {
        Self {
            // Latin letters or punctuation outside the expected alphabet.
            anomaly: Regex::new(r#"[A-Za-z!$%&/()=?@#^*;:<>~`"{},\[\]\\]"#)
                .expect("anomaly pattern is valid"),
        }
    }

    /// Fetch the ledger and reconcile it against the registry snapshot.
    ///
    /// A failed fetch is logged and degrades to an empty ledger snapshot,
    /// so the report shows everything missing in the ledger instead of the
    /// request failing.
    pub async fn run(
        &self,
        registry: &[(i64, String)],
        source: &dyn LedgerSource,
    ) -> ReconciliationReport {
        let ledger = match source.fetch().await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(error = %e, "Ledger fetch failed; reconciling against empty snapshot");
                Vec::new()
            }
        };
        self.reconcile(registry, &ledger)
    }

    /// Cross-reference the registry (identity + full name) with a ledger
    /// snapshot and classify every discrepancy.
    pub fn reconcile(
        &self,
        registry: &[(i64, String)],
        ledger: &[LedgerEntry],
    ) -> ReconciliationReport {
        // Normalized name → identity, last-write-wins on collision; the
        // order vec keeps first-encounter order for deterministic reports.
        let mut registry_map: HashMap<String, i64> = HashMap::new();
        let mut registry_order: Vec<String> = Vec::new();
        for (user_id, full_name) in registry {
            let key = normalize(full_name);
            if key.is_empty() {
                continue;
            }
            if registry_map.insert(key.clone(), *user_id).is_some() {
                tracing::warn!(name = %key, "Duplicate normalized name in registry; keeping later record");
            } else {
                registry_order.push(key);
            }
        }

        let mut ledger_map: HashMap<String, usize> = HashMap::new();
        let mut ledger_order: Vec<String> = Vec::new();
        for (idx, entry) in ledger.iter().enumerate() {
            let key = normalize(&entry.full_name());
            if key.is_empty() {
                continue;
            }
            if ledger_map.insert(key.clone(), idx).is_some() {
                tracing::warn!(name = %key, "Duplicate normalized name in ledger; keeping later row");
            } else {
                ledger_order.push(key);
            }
        }

        let mut report = ReconciliationReport::default();

        // Fuzzy candidates come first in the report; also collect the two
        // missing sets along the way, all in encounter order.
        for ledger_name in &ledger_order {
            if registry_map.contains_key(ledger_name) {
                continue;
            }
            for registry_name in &registry_order {
                match compare(ledger_name, registry_name) {
                    Some(MatchResult::FuzzyCandidate { similarity }) => {
                        report.exceptions.push(Exception {
                            name: ledger_name.clone(),
                            counterpart: Some(registry_name.clone()),
                            result: MatchResult::FuzzyCandidate { similarity },
                        });
                    }
                    // Exactly 100 under the fuzzy metric is an exact match
                    // and stays out of the candidate list.
                    _ => {}
                }
            }
        }

        for registry_name in &registry_order {
            if !ledger_map.contains_key(registry_name) {
                report.exceptions.push(Exception {
                    name: registry_name.clone(),
                    counterpart: None,
                    result: MatchResult::MissingInLedger,
                });
            }
        }

        for ledger_name in &ledger_order {
            if !registry_map.contains_key(ledger_name) {
                report.exceptions.push(Exception {
                    name: ledger_name.clone(),
                    counterpart: None,
                    result: MatchResult::MissingInRegistry,
                });
            }
        }

        for ledger_name in &ledger_order {
            if !registry_map.contains_key(ledger_name) && self.anomaly.is_match(ledger_name) {
                report.exceptions.push(Exception {
                    name: ledger_name.clone(),
                    counterpart: None,
                    result: MatchResult::AnomalousEncoding,
                });
            }
        }

        tracing::info!(
            registry = registry_order.len(),
            ledger = ledger_order.len(),
            exceptions = report.exceptions.len(),
            "Reconciliation pass complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(surname: &str, given: &str, patronymic: &str) -> LedgerEntry {
        LedgerEntry {
            surname: surname.into(),
            given_name: given.into(),
            patronymic: patronymic.into(),
            institution: String::new(),
            amount: String::new(),
            ticket_tier: String::new(),
            payment_method: String::new(),
            date: String::new(),
        }
    }

    #[test]
    fn identical_normalized_names_match_exactly() {
        let matcher = Matcher::new();
        let registry = vec![(1, "Ёлкин Пётр Сергеевич".to_string())];
        let ledger = vec![entry("елкин", "петр", "сергеевич")];

        let report = matcher.reconcile(&registry, &ledger);
        assert!(report.is_clean(), "report: {}", report.render());
    }

    #[test]
    fn shared_name_appears_in_neither_missing_list() {
        let matcher = Matcher::new();
        let registry = vec![
            (1, "Иванов Иван Иванович".to_string()),
            (2, "Петрова Анна Олеговна".to_string()),
        ];
        let ledger = vec![entry("Иванов", "Иван", "Иванович")];

        let report = matcher.reconcile(&registry, &ledger);
        let missing_ledger: Vec<_> = report
            .missing_in_ledger()
            .iter()
            .map(|e| e.name.clone())
            .collect();
        let missing_registry: Vec<_> = report
            .missing_in_registry()
            .iter()
            .map(|e| e.name.clone())
            .collect();

        assert_eq!(missing_ledger, vec!["петрова анна олеговна"]);
        assert!(missing_registry.is_empty());
        assert!(!missing_ledger.contains(&"иванов иван иванович".to_string()));
    }

    #[test]
    fn fuzzy_candidate_is_strictly_between_90_and_100() {
        let matcher = Matcher::new();
        // One letter off in a long name: similarity well inside (90, 100).
        let registry = vec![(1, "Кузнецова Екатерина Андреевна".to_string())];
        let ledger = vec![entry("Кузнецова", "Екатерина", "Андреевно")];

        let report = matcher.reconcile(&registry, &ledger);
        let fuzzy = report.fuzzy_candidates();
        assert_eq!(fuzzy.len(), 1);
        let MatchResult::FuzzyCandidate { similarity } = fuzzy[0].result else {
            panic!("expected fuzzy candidate");
        };
        assert!(similarity > 90 && similarity < 100, "similarity {similarity}");
        assert_eq!(fuzzy[0].counterpart.as_deref(), Some("кузнецова екатерина андреевна"));
    }

    #[test]
    fn similarity_100_is_never_a_fuzzy_candidate() {
        assert_eq!(compare("иванов иван", "иванов иван"), Some(MatchResult::Exact));
        // compare() maps the exact-100 boundary to Exact, not Fuzzy.
        for (a, b) in [("абв", "абв"), ("x", "x")] {
            assert!(!matches!(
                compare(a, b),
                Some(MatchResult::FuzzyCandidate { .. })
            ));
        }
    }

    #[test]
    fn low_similarity_is_no_match() {
        assert_eq!(compare("иванов иван", "сидорова анна"), None);
    }

    #[test]
    fn latin_ledger_name_is_flagged_anomalous() {
        let matcher = Matcher::new();
        let registry = vec![(1, "Иванов Иван Иванович".to_string())];
        let ledger = vec![entry("Smith", "John", "")];

        let report = matcher.reconcile(&registry, &ledger);
        let anomalous: Vec<_> = report.anomalous().iter().map(|e| e.name.clone()).collect();
        assert_eq!(anomalous, vec!["smith john"]);
        // It is also missing in the registry — the flags are independent.
        assert_eq!(report.missing_in_registry().len(), 1);
    }

    #[test]
    fn anomalous_flag_is_independent_of_fuzzy() {
        let matcher = Matcher::new();
        // Latin transliteration close to a registry name: both flags apply.
        let registry = vec![(1, "artemenko daria sergeevna".to_string())];
        let ledger = vec![entry("artemenko", "daria", "sergeevno")];

        let report = matcher.reconcile(&registry, &ledger);
        assert_eq!(report.fuzzy_candidates().len(), 1);
        assert_eq!(report.anomalous().len(), 1);
    }

    #[test]
    fn empty_ledger_reports_everything_missing() {
        let matcher = Matcher::new();
        let registry = vec![
            (1, "Иванов Иван Иванович".to_string()),
            (2, "Петрова Анна Олеговна".to_string()),
        ];

        let report = matcher.reconcile(&registry, &[]);
        assert_eq!(report.missing_in_ledger().len(), 2);
        assert!(report.missing_in_registry().is_empty());
        assert!(report.fuzzy_candidates().is_empty());
    }

    #[tokio::test]
    async fn failed_fetch_degrades_to_empty_snapshot() {
        struct FailingSource;
        #[async_trait::async_trait]
        impl LedgerSource for FailingSource {
            async fn fetch(&self) -> Result<Vec<LedgerEntry>, crate::error::LedgerError> {
                Err(crate::error::LedgerError::ExternalSourceUnavailable(
                    "connection refused".into(),
                ))
            }
        }

        let matcher = Matcher::new();
        let registry = vec![(1, "Иванов Иван Иванович".to_string())];
        let report = matcher.run(&registry, &FailingSource).await;

        assert_eq!(report.missing_in_ledger().len(), 1);
        assert!(report.missing_in_registry().is_empty());
    }

    #[test]
    fn duplicate_normalized_registry_names_last_write_wins() {
        let matcher = Matcher::new();
        // Two records collapsing to one normalized name; the pass must not
        // report the shared name as missing or duplicate it.
        let registry = vec![
            (1, "Ёлкин Пётр".to_string()),
            (2, "елкин петр".to_string()),
        ];
        let ledger = vec![entry("Елкин", "Петр", "")];

        let report = matcher.reconcile(&registry, &ledger);
        assert!(report.is_clean(), "report: {}", report.render());
    }

    #[test]
    fn clean_report_renders_all_matched_text() {
        let report = ReconciliationReport::default();
        assert_eq!(report.render(), "Все данные совпадают идеально!");
    }

    #[test]
    fn render_orders_categories_fuzzy_ledger_registry_anomalous() {
        let matcher = Matcher::new();
        let registry = vec![
            (1, "Кузнецова Екатерина Андреевна".to_string()),
            (2, "Незаплативший Гость Тестович".to_string()),
        ];
        let ledger = vec![
            entry("Кузнецова", "Екатерина", "Андреевно"),
            entry("Smith", "John", ""),
        ];

        let rendered = matcher.reconcile(&registry, &ledger).render();
        let fuzzy_pos = rendered.find("Нечеткие совпадения:").unwrap();
        let ledger_pos = rendered.find("Отсутствуют в таблице:").unwrap();
        let registry_pos = rendered.find("Отсутствуют в базе:").unwrap();
        let anomalous_pos = rendered.find("На латинице").unwrap();
        assert!(fuzzy_pos < ledger_pos);
        assert!(ledger_pos < registry_pos);
        assert!(registry_pos < anomalous_pos);
    }

    #[test]
    fn blank_registry_names_are_skipped() {
        let matcher = Matcher::new();
        let registry = vec![(1, "   ".to_string())];
        let report = matcher.reconcile(&registry, &[]);
        assert!(report.is_clean());
    }
}
