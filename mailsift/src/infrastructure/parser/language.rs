// /////////////////////////////////////////////////////////////////////////////
// Mailsift
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Language Identification
//!
//! Runs a pre-trained statistical language identifier over the decoded text
//! and keeps the top predictions as `(human language name, probability)`
//! pairs for the `Language predictions` attribute.
//!
//! The detector is built lazily once per process; model loading is far more
//! expensive than classification.

use lingua::{LanguageDetector, LanguageDetectorBuilder};
use once_cell::sync::Lazy;

/// How many ranked predictions the parser keeps per email.
pub const NUM_PREDICTIONS: usize = 2;

static DETECTOR: Lazy<LanguageDetector> =
    Lazy::new(|| LanguageDetectorBuilder::from_all_languages().build());

/// Ranked language predictions for a text, best first.
///
/// Returns at most `keep` `(name, probability)` pairs; empty for text the
/// identifier cannot classify (e.g. whitespace only).
pub fn predict_languages(text: &str, keep: usize) -> Vec<(String, f32)> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    DETECTOR
        .compute_language_confidence_values(text)
        .into_iter()
        .take(keep)
        .map(|(language, probability)| (language.to_string(), probability as f32))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_predictions_are_bounded_and_ranked() {
        let predictions = predict_languages("the quick brown fox jumps over the lazy dog", NUM_PREDICTIONS);
        assert!(!predictions.is_empty());
        assert!(predictions.len() <= NUM_PREDICTIONS);
        assert!(predictions[0].1 >= predictions.last().unwrap().1);
        assert_eq!(predictions[0].0, "English");
    }

    #[test]
    fn test_empty_text_yields_no_predictions() {
        assert!(predict_languages("   ", NUM_PREDICTIONS).is_empty());
    }

    #[test]
    fn test_names_are_human_readable() {
        let predictions = predict_languages("das ist ein deutscher satz über wetter", NUM_PREDICTIONS);
        for (name, probability) in &predictions {
            assert!(name.chars().next().unwrap().is_uppercase());
            assert!(*probability >= 0.0 && *probability <= 1.0);
        }
    }
}
