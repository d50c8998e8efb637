//! Response Interpreter — pulls the `Match: N%` line out of match-percentage output.
//!
//! Best-effort annotation only: a missing line is not an error and the raw text is
//! always returned to the caller untouched.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Model-estimated résumé-to-JD fit, always within 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MatchScore(u8);

impl MatchScore {
    pub const MAX: u32 = 100;

    /// Clamps any parsed value into range.
    pub fn clamped(value: u32) -> Self {
        MatchScore(value.min(Self::MAX) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

fn match_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"Match:\s*([0-9]{1,3})\s*%").expect("match pattern is a valid regex")
    })
}

/// Returns the score from the first `Match: N%` occurrence, if any.
pub fn extract_match_score(text: &str) -> Option<MatchScore> {
    let captures = match_pattern().captures(text)?;
    let value: u32 = captures.get(1)?.as_str().parse().ok()?;
    Some(MatchScore::clamped(value))
}
