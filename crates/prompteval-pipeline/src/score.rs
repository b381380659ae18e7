use std::sync::LazyLock;

use regex::Regex;

static SCORE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)score: ([0-9]+(?:\.[0-9]+)?)").expect("score pattern is valid")
});

/// Best-effort scrape of a `Score: <number>` marker from judge output.
///
/// Returns `0.0` when the marker is missing. Only the first marker counts.
pub fn extract_score(text: &str) -> f64 {
    SCORE_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}
