//! Prohibition detection
//!
//! Rule-based: a unit is prohibitive when it contains one of a fixed list
//! of prohibition-marking substrings (negative requests, explicit
//! "forbidden"/"stop" vocabulary). No model is involved.
//!
//! The list is tuned for precision. A missed prohibition costs less than a
//! prohibition pictogram forced onto harmless text, so ambiguous forms
//! (bare ない, するな which also appears in するなら) are left out, and
//! short words that occur inside unrelated words carry context: ダメ only
//! with a copula or exclamation (not ダメージ), やめて only as a request
//! (not やめてよかった), and "stop" only after a space or before "!"
//! (not "stopwatch" or "nonstop").
//!
//! Matching is plain substring containment on an ASCII-lowercased copy of
//! the unit, so if a unit is prohibitive, every text containing it is too.

use std::sync::LazyLock;

/// Bump when `PROHIBITION_MARKERS` changes
pub const PROHIBITION_MARKERS_VERSION: u32 = 2;

/// Prohibition-marking substrings (ASCII entries are lowercase)
pub const PROHIBITION_MARKERS: &[&str] = &[
    // Negative requests
    "しないで",
    "ないでください",
    "ないで下さい",
    // Must-not forms
    "てはいけ",
    "ではいけ",
    "てはならな",
    "ではならな",
    // Explicit vocabulary
    "はだめ",
    "だめです",
    "だめだよ",
    "だめ!",
    "だめ！",
    "はダメ",
    "ダメです",
    "ダメだよ",
    "ダメ!",
    "ダメ！",
    "は駄目",
    "駄目です",
    "禁止",
    "厳禁",
    "やめてください",
    "やめて下さい",
    "やめて!",
    "やめて！",
    "やめなさい",
    // English
    "don't",
    "don\u{2019}t",
    "do not",
    "must not",
    "not allowed",
    "forbidden",
    "prohibited",
    " stop",
    "stop!",
];

static DEFAULT_DETECTOR: LazyLock<ProhibitionDetector> =
    LazyLock::new(ProhibitionDetector::default);

/// Detects prohibition/negative-command units
#[derive(Debug, Clone)]
pub struct ProhibitionDetector {
    markers: Vec<String>,
}

impl Default for ProhibitionDetector {
    fn default() -> Self {
        Self::with_extra_markers(std::iter::empty::<String>())
    }
}

impl ProhibitionDetector {
    /// Built-in markers plus `extra`. Blank extras are ignored.
    pub fn with_extra_markers<I, S>(extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut markers: Vec<String> = PROHIBITION_MARKERS.iter().map(|m| m.to_string()).collect();
        for marker in extra {
            let marker = marker.as_ref().trim().to_ascii_lowercase();
            if !marker.is_empty() && !markers.contains(&marker) {
                markers.push(marker);
            }
        }
        Self { markers }
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    /// First marker contained in `unit`, if any
    pub fn matched_marker(&self, unit: &str) -> Option<&str> {
        let folded = unit.to_ascii_lowercase();
        self.markers
            .iter()
            .find(|m| folded.contains(m.as_str()))
            .map(|m| m.as_str())
    }

    pub fn is_prohibitive(&self, unit: &str) -> bool {
        self.matched_marker(unit).is_some()
    }
}

/// Check `unit` against the built-in marker list
pub fn is_prohibitive(unit: &str) -> bool {
    DEFAULT_DETECTOR.is_prohibitive(unit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_request() {
        assert!(is_prohibitive("しないでください"));
        assert!(is_prohibitive("さわらないでください"));
        assert!(is_prohibitive("ここで食べてはいけません"));
        assert!(is_prohibitive("飲んではいけない"));
    }

    #[test]
    fn test_explicit_vocabulary() {
        assert!(is_prohibitive("立入禁止"));
        assert!(is_prohibitive("それはだめ"));
        assert!(is_prohibitive("さわってはダメです"));
        assert!(is_prohibitive("タバコはやめてください"));
        assert!(is_prohibitive("Please STOP"));
        assert!(is_prohibitive("Stop! Wait"));
        assert!(is_prohibitive("Do Not enter"));
        assert!(is_prohibitive("don\u{2019}t run"));
    }

    #[test]
    fn test_benign_text() {
        assert!(!is_prohibitive("お茶をのみましょう"));
        assert!(!is_prohibitive("それから病院にいきます"));
        assert!(!is_prohibitive("するなら、いまです"));
        assert!(!is_prohibitive("食べないでしょう"));
        assert!(!is_prohibitive(""));
    }

    #[test]
    fn test_marker_words_inside_other_words() {
        assert!(!is_prohibitive("ダメージをうけました"));
        assert!(!is_prohibitive("バスのstopwatch"));
        assert!(!is_prohibitive("nonstop"));
        assert!(!is_prohibitive("Nonstop flight"));
        assert!(!is_prohibitive("タバコをやめてよかった"));
        assert!(!is_prohibitive("車を止めて待ちます"));
    }

    #[test]
    fn test_matched_marker() {
        let detector = ProhibitionDetector::default();
        assert_eq!(detector.matched_marker("しないでください"), Some("しないで"));
        assert_eq!(detector.matched_marker("おはよう"), None);
    }

    #[test]
    fn test_extra_markers() {
        let detector = ProhibitionDetector::with_extra_markers(["NO ENTRY", "  ", "禁止"]);
        assert!(detector.is_prohibitive("no entry here"));
        assert_eq!(detector.markers().len(), PROHIBITION_MARKERS.len() + 1);
        assert!(!ProhibitionDetector::default().is_prohibitive("no entry here"));
    }

    #[test]
    fn test_markers_are_lowercase() {
        for marker in PROHIBITION_MARKERS {
            assert_eq!(marker.to_ascii_lowercase(), *marker);
        }
    }
}
