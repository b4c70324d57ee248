use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ident::{self, IdentError};

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The word sequence was absent entirely, as opposed to present but
    /// empty.
    #[error("words is empty")]
    EmptyWords,
    #[error("generating analysis id: {0}")]
    Ident(#[from] IdentError),
}

/// Word-frequency accumulator for a single analysis run.
///
/// The identifier is assigned once at construction and never changes. A word
/// enters the map on its first increment, so every stored count is at least
/// 1\. `increment_word` takes `&self` and may be called from any number of
/// threads sharing one result; the state between two increments is always a
/// valid partial result.
///
/// Serializes as `{"id": ..., "wordFrequency": {...}}` with the map keys
/// emitted in sorted order.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnalysisResult {
    id: String,
    #[serde(rename = "wordFrequency", with = "frequency_map")]
    word_frequency: Mutex<HashMap<String, u64>>,
}

impl AnalysisResult {
    /// Fresh result with a generated identifier and no counts. Fails only
    /// when identifier generation fails.
    pub fn new() -> Result<Self, AnalysisError> {
        Ok(Self::from_id(ident::new_analysis_id()?))
    }

    /// Fresh result whose identifier carries a caller-supplied label prefix.
    pub fn with_label(label: &str) -> Result<Self, AnalysisError> {
        Ok(Self::from_id(ident::new_analysis_id_with_suffix(label)?))
    }

    fn from_id(id: String) -> Self {
        Self {
            id,
            word_frequency: Mutex::new(HashMap::new()),
        }
    }

    /// Records one occurrence of `word`, inserting it at 1 when absent.
    ///
    /// The lock covers this single read-modify-write only; callers never
    /// hold it across OCR or file work.
    pub fn increment_word(&self, word: &str) {
        let mut map = self.lock_map();
        match map.get_mut(word) {
            Some(count) => *count += 1,
            None => {
                map.insert(word.to_owned(), 1);
            }
        }
    }

    /// The run identifier; callers use it to build `<out_dir>/<id>.json`.
    pub fn name(&self) -> &str {
        &self.id
    }

    /// Snapshot of the counts at the time of the call.
    pub fn word_frequency(&self) -> HashMap<String, u64> {
        self.lock_map().clone()
    }

    /// Count recorded for `word`, 0 if it was never seen.
    pub fn count(&self, word: &str) -> u64 {
        self.lock_map().get(word).copied().unwrap_or(0)
    }

    pub fn unique_words(&self) -> usize {
        self.lock_map().len()
    }

    pub fn total_words(&self) -> u64 {
        self.lock_map().values().sum()
    }

    // Increments never panic mid-update, so the map behind a poisoned lock
    // is still consistent and stays usable.
    fn lock_map(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.word_frequency
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Counts every element of `words` into a fresh result.
///
/// `None` — the absent sequence — is rejected with
/// [`AnalysisError::EmptyWords`]; a present-but-empty slice succeeds and
/// yields a result with an empty map.
pub fn analyze_words_frequency(words: Option<&[String]>) -> Result<AnalysisResult, AnalysisError> {
    let words = words.ok_or(AnalysisError::EmptyWords)?;

    let analysis = AnalysisResult::new()?;
    for word in words {
        analysis.increment_word(word);
    }

    Ok(analysis)
}

mod frequency_map {
    use std::collections::{BTreeMap, HashMap};
    use std::sync::{Mutex, PoisonError};

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(map: &Mutex<HashMap<String, u64>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let map = map.lock().unwrap_or_else(PoisonError::into_inner);
        let ordered: BTreeMap<&String, &u64> = map.iter().collect();
        ordered.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Mutex<HashMap<String, u64>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Mutex::new(HashMap::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_absent_input_rejected() {
        let err = analyze_words_frequency(None).unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyWords));
    }

    #[test]
    fn test_empty_input_yields_empty_map() {
        let analysis = analyze_words_frequency(Some(&[])).unwrap();
        assert!(analysis.word_frequency().is_empty());
        assert_eq!(analysis.total_words(), 0);
    }

    #[test]
    fn test_counts_match_occurrences() {
        let input = words(&["go", "go", "rust", "Go"]);
        let analysis = analyze_words_frequency(Some(&input)).unwrap();

        let map = analysis.word_frequency();
        assert_eq!(map.get("go"), Some(&2));
        assert_eq!(map.get("rust"), Some(&1));
        assert_eq!(map.get("Go"), Some(&1));
        assert_eq!(map.len(), 3, "no keys for words absent from the input");
    }

    #[test]
    fn test_absent_word_has_no_entry() {
        let analysis = AnalysisResult::new().unwrap();
        analysis.increment_word("present");

        assert_eq!(analysis.count("missing"), 0);
        assert!(!analysis.word_frequency().contains_key("missing"));
    }

    #[test]
    fn test_sequential_increments_accumulate() {
        let analysis = AnalysisResult::new().unwrap();
        for _ in 0..5 {
            analysis.increment_word("token");
        }
        assert_eq!(analysis.count("token"), 5);
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let analysis = AnalysisResult::new().unwrap();
        let threads = 8;
        let per_thread = 1_000u64;

        thread::scope(|scope| {
            for _ in 0..threads {
                scope.spawn(|| {
                    for _ in 0..per_thread {
                        analysis.increment_word("shared");
                    }
                });
            }
        });

        assert_eq!(analysis.count("shared"), threads * per_thread);
    }

    #[test]
    fn test_concurrent_mixed_words() {
        let analysis = AnalysisResult::new().unwrap();
        let unique: Vec<String> = (0..4).map(|i| format!("worker-{i}")).collect();

        thread::scope(|scope| {
            for word in &unique {
                scope.spawn(|| {
                    for _ in 0..100 {
                        analysis.increment_word(word);
                        analysis.increment_word("common");
                    }
                });
            }
        });

        for word in &unique {
            assert_eq!(analysis.count(word), 100);
        }
        assert_eq!(analysis.count("common"), 400);
        assert_eq!(analysis.total_words(), 800);
    }

    #[test]
    fn test_json_shape() {
        let analysis = AnalysisResult::new().unwrap();
        analysis.increment_word("go");
        analysis.increment_word("go");

        let value = serde_json::to_value(&analysis).unwrap();
        assert!(value["id"].as_str().unwrap().contains("analysis_"));
        assert_eq!(value["wordFrequency"]["go"], 2);
    }

    #[test]
    fn test_json_round_trip() {
        let analysis = analyze_words_frequency(Some(&words(&["a", "b", "b", "c c"]))).unwrap();

        let encoded = serde_json::to_string(&analysis).unwrap();
        let decoded: AnalysisResult = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded.name(), analysis.name());
        assert_eq!(decoded.word_frequency(), analysis.word_frequency());
    }

    #[test]
    fn test_serializes_keys_in_sorted_order() {
        let analysis = AnalysisResult::new().unwrap();
        analysis.increment_word("zebra");
        analysis.increment_word("apple");
        analysis.increment_word("mango");

        let encoded = serde_json::to_string(&analysis).unwrap();
        let apple = encoded.find("apple").unwrap();
        let mango = encoded.find("mango").unwrap();
        let zebra = encoded.find("zebra").unwrap();
        assert!(apple < mango && mango < zebra, "keys out of order: {encoded}");
    }

    #[test]
    fn test_labelled_result_prefixes_id() {
        let analysis = AnalysisResult::with_label("nightly").unwrap();
        assert!(analysis.name().starts_with("nightly_analysis_"));
    }

    #[test]
    fn test_empty_map_serializes_as_object() {
        let analysis = AnalysisResult::new().unwrap();
        let value = serde_json::to_value(&analysis).unwrap();
        assert_eq!(value["wordFrequency"], serde_json::json!({}));
    }
}
