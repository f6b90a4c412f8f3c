use std::collections::BTreeSet;

use crate::tools::ToolId;

use super::profile::{tokenize, SelectorProfile};

const DEFAULT_THRESHOLD: f64 = 0.5;
const WORD_WEIGHT: f64 = 0.5;
const NEGATIVE_WEIGHT: f64 = 0.5;
const BOOSTER_WEIGHT: f64 = 0.25;

/// A tool's confidence for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolScore {
    pub tool: ToolId,
    /// Clamped to `[0, 1]`.
    pub score: f64,
    pub explanation: String,
}

/// Scores tools against a query using static cue tables.
///
/// Immutable after construction and safe to share between concurrent runs.
#[derive(Debug, Clone)]
pub struct ToolSelector {
    profiles: Vec<SelectorProfile>,
    threshold: f64,
}

impl ToolSelector {
    /// Selector over the built-in profiles with the default threshold (0.5).
    pub fn new() -> Self {
        Self {
            profiles: SelectorProfile::defaults(),
            threshold: DEFAULT_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Replace the cues for `profile.tool`, or add them if absent.
    pub fn with_profile(mut self, profile: SelectorProfile) -> Self {
        match self.profiles.iter_mut().find(|p| p.tool == profile.tool) {
            Some(existing) => *existing = profile,
            None => self.profiles.push(profile),
        }
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Tools at or above the threshold. May be empty; callers fall back to
    /// the full enabled set in that case.
    pub fn select_tools(&self, query: &str) -> BTreeSet<ToolId> {
        self.score(query)
            .into_iter()
            .filter(|scored| scored.score >= self.threshold)
            .map(|scored| scored.tool)
            .collect()
    }

    /// Score every tool with a non-zero confidence, highest first, ties by
    /// tool id.
    pub fn score(&self, query: &str) -> Vec<ToolScore> {
        let tokens = tokenize(query);
        let mut scores: Vec<ToolScore> = self
            .profiles
            .iter()
            .filter_map(|profile| score_profile(profile, &tokens))
            .collect();

        scores.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.tool.cmp(&b.tool))
        });
        scores
    }
}

impl Default for ToolSelector {
    fn default() -> Self {
        Self::new()
    }
}

fn contains_phrase(tokens: &[String], phrase: &[String]) -> bool {
    !phrase.is_empty() && tokens.windows(phrase.len()).any(|window| window == phrase)
}

fn joined(cues: &[&Vec<String>]) -> String {
    cues.iter()
        .map(|cue| cue.join(" "))
        .collect::<Vec<_>>()
        .join(", ")
}

fn score_profile(profile: &SelectorProfile, tokens: &[String]) -> Option<ToolScore> {
    let mut raw = 0.0;
    let mut explanations = Vec::new();

    let matched: Vec<&Vec<String>> = profile
        .phrases
        .iter()
        .filter(|phrase| contains_phrase(tokens, phrase))
        .collect();
    if !matched.is_empty() {
        raw += matched
            .iter()
            .map(|phrase| phrase.len() as f64 * WORD_WEIGHT)
            .sum::<f64>();
        explanations.push(format!("matched: [{}]", joined(&matched)));
    }

    let negated: Vec<&Vec<String>> = profile
        .negatives
        .iter()
        .filter(|phrase| contains_phrase(tokens, phrase))
        .collect();
    if !negated.is_empty() {
        raw -= negated.len() as f64 * NEGATIVE_WEIGHT;
        explanations.push(format!("negated: [{}]", joined(&negated)));
    }

    let boosters: Vec<&Vec<String>> = profile
        .boosters
        .iter()
        .filter(|phrase| contains_phrase(tokens, phrase))
        .collect();
    if !boosters.is_empty() {
        raw += BOOSTER_WEIGHT;
        explanations.push(format!("boosted by: [{}]", joined(&boosters)));
    }

    let score = raw.clamp(0.0, 1.0);
    if score > 0.0 {
        Some(ToolScore {
            tool: profile.tool,
            score,
            explanation: explanations.join("; "),
        })
    } else {
        None
    }
}
