//! Resource/action target patterns.

use serde::{Deserialize, Serialize};

/// A `/`-separated target pattern.
///
/// `*` as a segment matches exactly one candidate segment; the bare pattern
/// `*` matches any candidate. Anything else matches segment-for-segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pattern(String);

impl Pattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn matches(&self, candidate: &str) -> bool {
        if self.0 == "*" {
            return true;
        }

        let mut pattern_segments = self.0.split('/');
        let mut candidate_segments = candidate.split('/');

        loop {
            match (pattern_segments.next(), candidate_segments.next()) {
                (None, None) => return true,
                (Some(p), Some(c)) if p == "*" || p == c => continue,
                _ => return false,
            }
        }
    }
}

impl core::fmt::Display for Pattern {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match() {
        assert!(Pattern::new("account").matches("account"));
        assert!(!Pattern::new("account").matches("transaction"));
    }

    #[test]
    fn bare_star_matches_everything() {
        let pattern = Pattern::new("*");
        assert!(pattern.matches("account"));
        assert!(pattern.matches("account/balance"));
    }

    #[test]
    fn star_segment_matches_one_segment() {
        let pattern = Pattern::new("account/*");
        assert!(pattern.matches("account/balance"));
        assert!(pattern.matches("account/history"));
        assert!(!pattern.matches("account"));
        assert!(!pattern.matches("account/balance/details"));
    }

    #[test]
    fn segment_count_must_agree() {
        assert!(!Pattern::new("account/balance").matches("account"));
        assert!(!Pattern::new("account").matches("account/balance"));
    }
}
