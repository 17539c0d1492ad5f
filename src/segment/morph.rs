//! Morphological tokenization for clause-like chunking
//!
//! `LexiconAnalyzer` is a small rule-based analyzer for Japanese text. It
//! does not try to be a full morphological analyzer; chunking only needs
//! to know where function words (particles, auxiliaries, sentence-final
//! particles) sit.
//!
//! ```text
//! お茶をのみましょう。
//! │ │ │ │   │       └ Symbol
//! │ │ │ │   └ Auxiliary  (lexicon, longest match)
//! │ │ │ └ Other          (hiragana content)
//! │ │ └ Particle         (single char, directly after content)
//! │ └ Noun               (kanji run)
//! └ Other
//! ```
//!
//! Text is split into script runs first. Inside a hiragana run, a small
//! list of common content words is matched at word starts so that function
//! words inside them (い|たい) are not split off. Multi-char function words
//! match anywhere else. A single-char particle or auxiliary matches right
//! after content; a single-char case particle also matches after two or
//! more unmatched hiragana, which lets all-hiragana text break at は and に.
//! A single-char sentence-final particle only matches at the end of a run.

use super::is_punctuation;

/// Coarse part-of-speech class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartOfSpeech {
    Noun,
    Particle,
    Auxiliary,
    SentenceFinalParticle,
    Symbol,
    Whitespace,
    Other,
}

impl PartOfSpeech {
    /// Classes after which a long enough chunk may be closed
    pub fn is_chunk_boundary(&self) -> bool {
        matches!(
            self,
            PartOfSpeech::Particle | PartOfSpeech::Auxiliary | PartOfSpeech::SentenceFinalParticle
        )
    }
}

/// One morphological token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorphToken {
    pub surface: String,
    pub pos: PartOfSpeech,
}

impl MorphToken {
    pub fn new(surface: impl Into<String>, pos: PartOfSpeech) -> Self {
        Self {
            surface: surface.into(),
            pos,
        }
    }
}

/// Splits text into a stream of surface/part-of-speech tokens.
///
/// Concatenating all surfaces must reproduce the input.
pub trait MorphAnalyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Vec<MorphToken>;
}

const PARTICLES: &[&str] = &[
    "ながら", "けれど", "から", "まで", "より", "けど", "ので", "のに", "って", "など", "は", "が",
    "を", "に", "で", "と", "へ", "も", "の", "や",
];

const AUXILIARIES: &[&str] = &[
    "ましょう", "ください", "なかった", "ません", "ました", "でした", "だった", "ないで", "られる",
    "させる", "ます", "です", "ない", "たい", "れる", "せる", "よう", "だ", "た", "て", "う",
];

const SENTENCE_FINAL: &[&str] = &["かな", "よね", "ね", "よ", "な", "わ", "ぞ", "か"];

/// Single-char particles that may follow unmatched hiragana
const CASE_PARTICLES: &[&str] = &["は", "が", "を", "に", "で", "へ"];

/// Hiragana content words that contain a function word
const CONTENT_WORDS: &[&str] = &[
    "びょういん", "おくすり", "つめたい", "あぶない", "きたない", "いたい", "あつい", "さむい",
    "あたま", "おなか", "わたし", "あなた", "くすり", "ごはん", "おちゃ", "みず",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Kanji,
    Hiragana,
    Katakana,
    Latin,
    Digit,
    Whitespace,
    Punct,
    Other,
}

impl Script {
    fn of(c: char) -> Self {
        if c.is_whitespace() {
            return Script::Whitespace;
        }
        match c {
            '\u{3041}'..='\u{309F}' => Script::Hiragana,
            // ・ sits inside the katakana block
            '\u{30FB}' => Script::Punct,
            '\u{30A0}'..='\u{30FF}' | '\u{31F0}'..='\u{31FF}' | '\u{FF66}'..='\u{FF9F}' => {
                Script::Katakana
            }
            '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '々' | '〆' => Script::Kanji,
            _ if c.is_numeric() => Script::Digit,
            _ if c.is_alphabetic() => Script::Latin,
            _ if is_punctuation(c) => Script::Punct,
            _ => Script::Other,
        }
    }

    fn is_content(&self) -> bool {
        matches!(
            self,
            Script::Kanji | Script::Katakana | Script::Latin | Script::Digit
        )
    }

    fn content_pos(&self) -> PartOfSpeech {
        match self {
            Script::Kanji | Script::Katakana | Script::Digit => PartOfSpeech::Noun,
            Script::Whitespace => PartOfSpeech::Whitespace,
            Script::Punct => PartOfSpeech::Symbol,
            _ => PartOfSpeech::Other,
        }
    }
}

/// Rule-based analyzer backed by a fixed function-word lexicon
#[derive(Debug, Clone)]
pub struct LexiconAnalyzer {
    /// (word, class), longest words first
    lexicon: Vec<(&'static str, PartOfSpeech)>,
    /// Hiragana content words, longest first
    content_words: Vec<&'static str>,
}

impl Default for LexiconAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconAnalyzer {
    pub fn new() -> Self {
        let mut lexicon: Vec<(&'static str, PartOfSpeech)> = PARTICLES
            .iter()
            .map(|w| (*w, PartOfSpeech::Particle))
            .chain(AUXILIARIES.iter().map(|w| (*w, PartOfSpeech::Auxiliary)))
            .chain(
                SENTENCE_FINAL
                    .iter()
                    .map(|w| (*w, PartOfSpeech::SentenceFinalParticle)),
            )
            .collect();
        // Stable sort keeps particle > auxiliary > final precedence among equals
        lexicon.sort_by_key(|(w, _)| std::cmp::Reverse(w.chars().count()));

        let mut content_words = CONTENT_WORDS.to_vec();
        content_words.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));
        Self {
            lexicon,
            content_words,
        }
    }

    /// Find a function word at the start of `rest`.
    ///
    /// `follows_content` is true when the previous token is content;
    /// `pending_chars` counts unmatched hiragana just before `rest`.
    fn match_function_word(
        &self,
        rest: &str,
        follows_content: bool,
        pending_chars: usize,
    ) -> Option<(&'static str, PartOfSpeech)> {
        let rest_len = rest.chars().count();
        self.lexicon.iter().copied().find(|(word, pos)| {
            if !rest.starts_with(word) {
                return false;
            }
            if word.chars().count() > 1 {
                return true;
            }
            match pos {
                PartOfSpeech::SentenceFinalParticle => rest_len == 1,
                PartOfSpeech::Particle => {
                    follows_content || (pending_chars >= 2 && CASE_PARTICLES.contains(word))
                }
                _ => follows_content,
            }
        })
    }

    fn match_content_word(&self, rest: &str) -> Option<&'static str> {
        self.content_words
            .iter()
            .copied()
            .find(|word| rest.starts_with(word))
    }

    fn analyze_hiragana(&self, run: &str, after_content: bool, out: &mut Vec<MorphToken>) {
        let mut pending = String::new();
        let mut pending_chars = 0;
        let mut prev_is_content = after_content;
        let mut i = 0;
        while i < run.len() {
            let rest = &run[i..];
            // Content words only start where no unmatched hiragana is waiting
            if pending.is_empty() {
                if let Some(word) = self.match_content_word(rest) {
                    out.push(MorphToken::new(word, PartOfSpeech::Other));
                    prev_is_content = true;
                    i += word.len();
                    continue;
                }
            }
            let follows_content = pending.is_empty() && prev_is_content;
            if let Some((word, pos)) = self.match_function_word(rest, follows_content, pending_chars)
            {
                if !pending.is_empty() {
                    out.push(MorphToken::new(
                        std::mem::take(&mut pending),
                        PartOfSpeech::Other,
                    ));
                    pending_chars = 0;
                }
                out.push(MorphToken::new(word, pos));
                prev_is_content = false;
                i += word.len();
                continue;
            }
            // rest is non-empty and i is on a char boundary
            if let Some(c) = rest.chars().next() {
                pending.push(c);
                pending_chars += 1;
                i += c.len_utf8();
            }
        }
        if !pending.is_empty() {
            out.push(MorphToken::new(pending, PartOfSpeech::Other));
        }
    }
}

/// Group text into maximal same-script runs. Punctuation is never grouped.
fn script_runs(text: &str) -> Vec<(Script, &str)> {
    let mut runs = Vec::new();
    let mut start = 0;
    let mut current: Option<Script> = None;

    for (i, c) in text.char_indices() {
        let script = Script::of(c);
        match current {
            Some(prev) if prev == script && script != Script::Punct => {}
            Some(prev) => {
                runs.push((prev, &text[start..i]));
                start = i;
                current = Some(script);
            }
            None => {
                current = Some(script);
            }
        }
    }
    if let Some(prev) = current {
        runs.push((prev, &text[start..]));
    }
    runs
}

impl MorphAnalyzer for LexiconAnalyzer {
    fn analyze(&self, text: &str) -> Vec<MorphToken> {
        let mut tokens = Vec::new();
        let mut after_content = false;

        for (script, run) in script_runs(text) {
            if script == Script::Hiragana {
                self.analyze_hiragana(run, after_content, &mut tokens);
            } else {
                tokens.push(MorphToken::new(run, script.content_pos()));
            }
            after_content = script.is_content();
        }
        tokens
    }
}
