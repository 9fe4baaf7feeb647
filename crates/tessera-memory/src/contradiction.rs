// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lexical contradiction heuristic.
//!
//! Two statements contradict when they talk about the same thing (enough
//! shared vocabulary) but disagree on a number or on negation. This catches
//! "The timeout is 30 seconds" vs "The timeout is 60 seconds" and
//! "Alice likes tea" vs "Alice does not like tea" without a model call.

use std::collections::BTreeSet;

use chrono::Utc;
use tessera_core::TesseraError;
use tracing::debug;

use crate::traits::ContradictionDetector;
use crate::types::{ConflictingStatement, Contradiction, StatementMeta};

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "in", "is",
    "it", "its", "of", "on", "or", "that", "the", "this", "to", "was", "were", "will", "with",
    "do", "does", "did",
];

const NEGATIONS: &[&str] = &["not", "no", "never", "none", "nobody", "nothing", "neither", "nor"];

/// Token-overlap and value-mismatch contradiction detector.
#[derive(Debug, Clone)]
pub struct HeuristicDetector {
    min_overlap: f64,
}

impl HeuristicDetector {
    /// `min_overlap` is clamped to `(0, 1]`.
    pub fn new(min_overlap: f64) -> Self {
        let min_overlap = if min_overlap.is_finite() {
            min_overlap.clamp(f64::EPSILON, 1.0)
        } else {
            0.5
        };
        Self { min_overlap }
    }

    pub fn min_overlap(&self) -> f64 {
        self.min_overlap
    }
}

impl Default for HeuristicDetector {
    fn default() -> Self {
        Self::new(0.5)
    }
}

/// A statement split into comparable parts.
#[derive(Debug, Default)]
struct Profile {
    words: BTreeSet<String>,
    numbers: BTreeSet<String>,
    negated: bool,
}

fn profile(statement: &str) -> Profile {
    let mut p = Profile::default();
    let lower = statement.to_lowercase();

    for raw in lower.split_whitespace() {
        let word = raw.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'');
        if word.is_empty() {
            continue;
        }
        if NEGATIONS.contains(&word) || word.ends_with("n't") {
            p.negated = !p.negated;
            continue;
        }

        for token in word
            .split(|c: char| !c.is_alphanumeric() && c != '.')
            .map(|t| t.trim_matches('.'))
            .filter(|t| !t.is_empty())
        {
            if let Ok(n) = token.parse::<f64>() {
                p.numbers.insert(normalize_number(n));
            } else if !STOPWORDS.contains(&token) {
                p.words.insert(token.to_string());
            }
        }
    }
    p
}

/// `30`, `30.0`, and `30.00` compare equal.
fn normalize_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

impl ContradictionDetector for HeuristicDetector {
    fn detect(
        &self,
        existing: &str,
        incoming: &str,
        existing_meta: Option<&StatementMeta>,
        incoming_meta: Option<&StatementMeta>,
    ) -> Result<Option<Contradiction>, TesseraError> {
        let a = profile(existing);
        let b = profile(incoming);

        let overlap = jaccard(&a.words, &b.words).max(strsim::sorensen_dice(
            &existing.to_lowercase(),
            &incoming.to_lowercase(),
        ));
        if overlap < self.min_overlap {
            return Ok(None);
        }

        let numeric_conflict =
            !a.numbers.is_empty() && !b.numbers.is_empty() && a.numbers != b.numbers;
        let polarity_conflict = a.negated != b.negated;
        if !numeric_conflict && !polarity_conflict {
            return Ok(None);
        }

        debug!(
            overlap,
            numeric_conflict, polarity_conflict, "heuristic contradiction"
        );

        Ok(Some(Contradiction {
            id: uuid::Uuid::new_v4().to_string(),
            detected_at: Utc::now(),
            existing_fact: ConflictingStatement::new(existing, existing_meta, "memory"),
            new_fact: ConflictingStatement::new(incoming, incoming_meta, "input"),
            winner: None,
            reasoning: None,
        }))
    }
}
