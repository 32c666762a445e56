//! Prompt history for the Paddock host.
//!
//! Stores every prompt the user submitted, multiline text included, and
//! keeps an incremental in-memory index over it so the picker widget can
//! filter as the user types. The widget itself (editor overlay, selection
//! list, rendering) belongs to the host; this crate owns the records, the
//! index, and the filter flow.
//!
//! Each pushed record is indexed once, in time proportional to its length:
//! a flattened lowercase search key (line breaks and whitespace runs
//! collapsed, so queries match across lines) and a single-line display
//! label. Consecutive duplicate submissions are skipped. Retrieval and
//! filtering are newest-first.
//!
//! # Example
//!
//! ```
//! use paddock_prompt_history::{PromptIndex, PromptRecord};
//!
//! let mut index = PromptIndex::new();
//! index.push(PromptRecord::new("fix the flaky timeout test"));
//! index.push(PromptRecord::new("explain this lifetime error:\n  &mut self"));
//!
//! let matches = index.filter("lifetime");
//! assert_eq!(matches.len(), 1);
//! assert!(matches[0].label.starts_with("explain this lifetime error"));
//! ```

use serde::{Deserialize, Serialize};
use std::time::SystemTime;

// ============================================================================
// Records
// ============================================================================

/// A prompt as submitted, with its full multiline text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRecord {
    /// The submitted text, verbatim.
    pub text: String,

    /// When the prompt was submitted.
    #[serde(with = "system_time_serde")]
    pub timestamp: SystemTime,
}

impl PromptRecord {
    /// Record a prompt submitted now.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            timestamp: SystemTime::now(),
        }
    }

    /// Record a prompt with an explicit timestamp (for restored history).
    pub fn at(text: impl Into<String>, timestamp: SystemTime) -> Self {
        Self {
            text: text.into(),
            timestamp,
        }
    }
}

/// One filter hit, newest-first within equal scores.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptMatch<'a> {
    /// The matched record.
    pub record: &'a PromptRecord,

    /// Single-line display label for the picker.
    pub label: &'a str,

    /// Relative match quality; larger is better. Zero for empty queries.
    pub score: i32,
}

// ============================================================================
// Index
// ============================================================================

#[derive(Debug, Clone)]
struct IndexedPrompt {
    record: PromptRecord,
    /// Lowercased text with whitespace runs collapsed to single spaces.
    key: String,
    /// First non-empty line, whitespace-normalized, `...` when truncated.
    label: String,
}

/// Incremental index over submitted prompts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(into = "Vec<PromptRecord>", from = "Vec<PromptRecord>")]
pub struct PromptIndex {
    entries: Vec<IndexedPrompt>,
}

impl PromptIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append and index one record.
    ///
    /// Returns `false` when the record repeats the previous submission
    /// verbatim and was skipped.
    pub fn push(&mut self, record: PromptRecord) -> bool {
        if let Some(last) = self.entries.last() {
            if last.record.text == record.text {
                log::debug!("skipping consecutive duplicate prompt");
                return false;
            }
        }

        let key = flatten(&record.text);
        let label = label_for(&record.text);
        self.entries.push(IndexedPrompt { record, key, label });
        true
    }

    /// Number of indexed prompts.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been indexed.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All records, newest first.
    pub fn newest_first(&self) -> impl Iterator<Item = &PromptRecord> {
        self.entries.iter().rev().map(|e| &e.record)
    }

    /// Filter by a case-insensitive subsequence query.
    ///
    /// An empty query returns everything newest-first with zero scores.
    /// Otherwise results are ordered by score, ties broken newest-first.
    pub fn filter(&self, query: &str) -> Vec<PromptMatch<'_>> {
        let needle = flatten(query);

        let mut matches: Vec<(usize, PromptMatch<'_>)> = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(position, entry)| {
                subsequence_score(&entry.key, &needle).map(|score| {
                    (
                        position,
                        PromptMatch {
                            record: &entry.record,
                            label: &entry.label,
                            score,
                        },
                    )
                })
            })
            .collect();

        // Higher score first; among equals the more recent submission wins.
        matches.sort_by(|(pos_a, a), (pos_b, b)| {
            b.score.cmp(&a.score).then(pos_b.cmp(pos_a))
        });
        matches.into_iter().map(|(_, m)| m).collect()
    }
}

impl From<Vec<PromptRecord>> for PromptIndex {
    fn from(records: Vec<PromptRecord>) -> Self {
        let mut index = PromptIndex::new();
        for record in records {
            index.push(record);
        }
        index
    }
}

impl From<PromptIndex> for Vec<PromptRecord> {
    fn from(index: PromptIndex) -> Self {
        index.entries.into_iter().map(|e| e.record).collect()
    }
}

// ============================================================================
// Key building and scoring
// ============================================================================

/// Lowercase and collapse all whitespace runs (newlines included) to
/// single spaces.
fn flatten(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            pending_space = true;
        } else {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
        }
    }
    out
}

/// First non-empty line, whitespace-normalized; `...` marks elided
/// continuation lines.
fn label_for(text: &str) -> String {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let first = lines.next().unwrap_or("");
    let mut label = first.split_whitespace().collect::<Vec<_>>().join(" ");
    if lines.next().is_some() {
        label.push_str(" ...");
    }
    label
}

/// Score a subsequence match of `query` within `key`, or `None` when the
/// query is not a subsequence. Both inputs must already be flattened.
///
/// Scoring favors runs of adjacent matches, matches at word starts, and
/// matches near the front of the prompt.
fn subsequence_score(key: &str, query: &str) -> Option<i32> {
    if query.is_empty() {
        return Some(0);
    }

    let key: Vec<char> = key.chars().collect();
    let mut score = 0i32;
    let mut cursor = 0usize;
    let mut previous: Option<usize> = None;
    let mut first: Option<usize> = None;

    for wanted in query.chars() {
        let found = key[cursor..]
            .iter()
            .position(|&c| c == wanted)
            .map(|offset| cursor + offset)?;

        score += 1;
        if previous == Some(found.wrapping_sub(1)) {
            score += 3;
        }
        if found == 0 || key[found - 1] == ' ' {
            score += 2;
        }

        first.get_or_insert(found);
        previous = Some(found);
        cursor = found + 1;
    }

    // Early-position preference: a hit buried deep in the prompt ranks
    // below the same hit near the front.
    score -= first.unwrap_or(0).min(16) as i32;

    Some(score)
}

/// Serde helper for SystemTime (epoch seconds).
mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::from_secs(secs))
    }
}

// ============================================================================
// Tests
// ============================================================================
