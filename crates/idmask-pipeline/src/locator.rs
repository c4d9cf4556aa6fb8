// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Number locator — find grouped 12-digit numbers in recognised text, validate
// them, and resolve which recognition tokens hold the groups to be masked.

use std::sync::LazyLock;

use idmask_core::checksum;
use idmask_core::config::MatchPolicy;
use idmask_core::error::Result;
use idmask_core::types::{Candidate, PageOutcome, RecognitionResult, RecognitionToken};
use regex::Regex;
use tracing::debug;

/// Three groups of four digits separated by single spaces. Digit boundaries
/// on either side are checked separately.
static GROUPED_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9]{4} [0-9]{4} [0-9]{4}").expect("grouped number pattern is valid")
});

/// A candidate together with its byte span in the page text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateMatch {
    pub start: usize,
    pub end: usize,
    pub candidate: Candidate,
}

/// Every grouped number in `text` not directly preceded or followed by
/// another digit, left to right.
pub fn find_candidates(text: &str) -> Vec<CandidateMatch> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(m) = GROUPED_NUMBER.find_at(text, pos) {
        let preceded = m.start() > 0 && bytes[m.start() - 1].is_ascii_digit();
        let followed = bytes.get(m.end()).is_some_and(u8::is_ascii_digit);
        if preceded || followed {
            // The match starts on an ASCII digit, so start + 1 is a char boundary.
            pos = m.start() + 1;
            continue;
        }

        let literal = m.as_str();
        let groups = [
            literal[0..4].to_string(),
            literal[5..9].to_string(),
            literal[10..14].to_string(),
        ];
        found.push(CandidateMatch {
            start: m.start(),
            end: m.end(),
            candidate: Candidate {
                digits: groups.concat(),
                groups,
            },
        });
        pos = m.end();
    }

    found
}

/// Indices of every token whose trimmed content equals one of `groups`.
pub fn resolve_tokens(tokens: &[RecognitionToken], groups: &[&str]) -> Vec<usize> {
    tokens
        .iter()
        .enumerate()
        .filter(|(_, token)| groups.contains(&token.content.trim()))
        .map(|(index, _)| index)
        .collect()
}

/// What the locator decided for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEvaluation {
    pub outcome: PageOutcome,
    /// Indices into the page's tokens to paint over, ascending.
    pub masked_tokens: Vec<usize>,
    /// Candidates that were checked against the checksum.
    pub candidates_checked: usize,
}

/// Run locate, validate, and resolve over one page's recognition output.
pub fn evaluate_page(result: &RecognitionResult, policy: MatchPolicy) -> Result<PageEvaluation> {
    let mut matches = find_candidates(&result.text);
    if policy == MatchPolicy::First {
        matches.truncate(1);
    }
    if matches.is_empty() {
        return Ok(PageEvaluation {
            outcome: PageOutcome::NoMatch,
            masked_tokens: Vec::new(),
            candidates_checked: 0,
        });
    }

    let mut any_valid = false;
    let mut masked_tokens = Vec::new();
    for m in &matches {
        if !checksum::is_valid(&m.candidate.digits)? {
            continue;
        }
        any_valid = true;
        masked_tokens.extend(resolve_tokens(&result.tokens, &m.candidate.masked_groups()));
    }
    masked_tokens.sort_unstable();
    masked_tokens.dedup();

    let outcome = match (any_valid, masked_tokens.is_empty()) {
        (false, _) => PageOutcome::ChecksumFailed,
        (true, true) => PageOutcome::TokensNotFound,
        (true, false) => PageOutcome::Masked,
    };
    debug!(
        candidates = matches.len(),
        tokens = masked_tokens.len(),
        ?outcome,
        "Page evaluated"
    );

    Ok(PageEvaluation {
        outcome,
        masked_tokens,
        candidates_checked: matches.len(),
    })
}

#[cfg(test)]
mod tests {
    use idmask_core::types::CoordinateUnit;

    use super::*;

    fn token(content: &str) -> RecognitionToken {
        RecognitionToken::from_rect(content, (0.0, 0.0), (1.0, 1.0), CoordinateUnit::Pixel)
    }

    fn words(text: &str) -> RecognitionResult {
        RecognitionResult::from_tokens(
            text.split(' ').map(token).collect(),
            CoordinateUnit::Pixel,
        )
    }

    #[test]
    fn finds_grouped_number_with_offsets() {
        let found = find_candidates("Aadhaar No: 2341 2341 2346 issued");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].start, 12);
        assert_eq!(found[0].end, 26);
        assert_eq!(found[0].candidate.digits, "234123412346");
        assert_eq!(found[0].candidate.groups[2], "2346");
    }

    #[test]
    fn rejects_numbers_embedded_in_longer_digit_runs() {
        assert!(find_candidates("12341 2341 2346").is_empty());
        assert!(find_candidates("2341 2341 23461").is_empty());
        assert!(find_candidates("2341  2341 2346").is_empty());
        assert!(find_candidates("234123412346").is_empty());
    }

    #[test]
    fn finds_every_match_in_order() {
        let found = find_candidates("a 1234 5678 9010 b 4991 1866 5246");
        let digits: Vec<&str> = found.iter().map(|m| m.candidate.digits.as_str()).collect();
        assert_eq!(digits, vec!["123456789010", "499118665246"]);
    }

    #[test]
    fn resolves_tokens_by_trimmed_content() {
        let tokens = vec![token("No:"), token(" 2341"), token("2341 "), token("2346")];
        assert_eq!(resolve_tokens(&tokens, &["2341", "2341"]), vec![1, 2]);
        assert!(resolve_tokens(&tokens, &["9999"]).is_empty());
    }

    #[test]
    fn masks_only_first_two_groups() {
        let eval = evaluate_page(&words("ID 1234 5678 9010"), MatchPolicy::First).unwrap();
        assert_eq!(eval.outcome, PageOutcome::Masked);
        assert_eq!(eval.masked_tokens, vec![1, 2]);
    }

    #[test]
    fn invalid_checksum_is_reported_not_masked() {
        let eval = evaluate_page(&words("1234 5678 9012"), MatchPolicy::First).unwrap();
        assert_eq!(eval.outcome, PageOutcome::ChecksumFailed);
        assert!(eval.masked_tokens.is_empty());
    }

    #[test]
    fn no_pattern_is_no_match() {
        let eval = evaluate_page(&words("nothing to see here"), MatchPolicy::First).unwrap();
        assert_eq!(eval.outcome, PageOutcome::NoMatch);
        assert_eq!(eval.candidates_checked, 0);
    }

    #[test]
    fn line_level_tokens_are_a_granularity_mismatch() {
        let result = RecognitionResult::from_tokens(
            vec![token("2341 2341 2346")],
            CoordinateUnit::Pixel,
        );
        let eval = evaluate_page(&result, MatchPolicy::First).unwrap();
        assert_eq!(eval.outcome, PageOutcome::TokensNotFound);
        assert!(!eval.outcome.is_valid());
    }

    #[test]
    fn policy_controls_how_many_matches_count() {
        // First match fails the checksum; the second is valid.
        let result = words("1234 5678 9012 and 4991 1866 5246");
        let first = evaluate_page(&result, MatchPolicy::First).unwrap();
        assert_eq!(first.outcome, PageOutcome::ChecksumFailed);

        let all = evaluate_page(&result, MatchPolicy::All).unwrap();
        assert_eq!(all.outcome, PageOutcome::Masked);
        assert_eq!(all.candidates_checked, 2);
        assert_eq!(all.masked_tokens, vec![4, 5]);
    }
}
