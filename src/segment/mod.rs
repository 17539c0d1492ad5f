//! Text segmentation into short semantic units
//!
//! Three granularity policies:
//!
//! - **Sentence**: split on sentence-final punctuation
//! - **Word**: split on separators (commas, periods, interpunct, whitespace)
//! - **Chunk**: clause-like units built from morphological tokens
//!
//! ## Chunk policy
//!
//! ```text
//! tokens ──► buffer ──┬── sentence terminator ──► flush (terminator dropped)
//!                     └── buffer >= 6 chars AND token is
//!                         particle/auxiliary/final particle ──► flush
//! end of stream ──► flush remainder
//!
//! drop punctuation-only units
//! merge: unit ending in に/を/が/で absorbs the next unit (one pass)
//! ```
//!
//! Empty or whitespace/punctuation-only input yields no units in every
//! mode; segmentation never fails.

pub mod morph;

use crate::MatcherError;
use morph::{LexiconAnalyzer, MorphAnalyzer};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

pub use morph::{MorphToken, PartOfSpeech};

/// How finely text is segmented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GranularityMode {
    Sentence,
    #[default]
    Chunk,
    Word,
}

impl GranularityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GranularityMode::Sentence => "sentence",
            GranularityMode::Chunk => "chunk",
            GranularityMode::Word => "word",
        }
    }
}

impl FromStr for GranularityMode {
    type Err = MatcherError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sentence" | "文" => Ok(GranularityMode::Sentence),
            "chunk" | "clause" | "短文" => Ok(GranularityMode::Chunk),
            "word" | "単語" => Ok(GranularityMode::Word),
            other => Err(MatcherError::InvalidArgument(format!(
                "unknown granularity mode '{}'. Valid values: sentence, chunk, word",
                other
            ))),
        }
    }
}

impl std::fmt::Display for GranularityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Segmentation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Characters that end a sentence
    pub sentence_terminators: String,

    /// Characters that separate words (whitespace always separates)
    pub word_separators: String,

    /// Minimum buffered length (in chars) before a chunk may close
    pub chunk_min_chars: usize,

    /// Case particles that are never left dangling at the end of a chunk
    pub merge_particles: Vec<String>,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            sentence_terminators: "。！？!?.".to_string(),
            word_separators: "、，,。.・".to_string(),
            chunk_min_chars: 6,
            merge_particles: ["に", "を", "が", "で"]
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

/// True for ASCII, CJK and full-width punctuation and symbols
pub fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation()
        || matches!(c,
            '\u{00A1}'..='\u{00BF}'
            | '\u{2010}'..='\u{206F}'
            | '\u{3001}'..='\u{3004}'
            | '\u{3008}'..='\u{3020}'
            | '\u{3030}'
            | '\u{303D}'
            | '\u{30FB}'
            | '\u{FF01}'..='\u{FF0F}'
            | '\u{FF1A}'..='\u{FF20}'
            | '\u{FF3B}'..='\u{FF40}'
            | '\u{FF5B}'..='\u{FF65}'
        )
}

/// Splits raw text into ordered units
#[derive(Clone)]
pub struct Segmenter {
    config: SegmenterConfig,
    analyzer: Arc<dyn MorphAnalyzer>,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self::new(SegmenterConfig::default())
    }
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self::with_analyzer(config, Arc::new(LexiconAnalyzer::new()))
    }

    /// Use a different morphological analyzer for chunk mode
    pub fn with_analyzer(config: SegmenterConfig, analyzer: Arc<dyn MorphAnalyzer>) -> Self {
        Self { config, analyzer }
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Split `text` into units under `mode`
    pub fn segment(&self, text: &str, mode: GranularityMode) -> Vec<String> {
        let units = match mode {
            GranularityMode::Sentence => self.split_sentences(text),
            GranularityMode::Word => self.split_words(text),
            GranularityMode::Chunk => self.split_chunks(text),
        };
        debug!("Segmented into {} units ({})", units.len(), mode);
        units
    }

    fn is_terminator(&self, c: char) -> bool {
        self.config.sentence_terminators.contains(c)
    }

    fn is_separator(&self, c: char) -> bool {
        c.is_whitespace() || self.config.word_separators.contains(c)
    }

    /// Trim whitespace and split characters from both ends; `None` if
    /// nothing meaningful is left
    fn clean_unit(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim_matches(|c: char| {
            c.is_whitespace() || self.is_terminator(c) || self.is_separator(c)
        });
        if trimmed
            .chars()
            .all(|c| c.is_whitespace() || is_punctuation(c))
        {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    fn split_sentences(&self, text: &str) -> Vec<String> {
        text.split(|c: char| self.is_terminator(c))
            .filter_map(|s| self.clean_unit(s))
            .collect()
    }

    fn split_words(&self, text: &str) -> Vec<String> {
        text.split(|c: char| self.is_separator(c))
            .filter_map(|s| self.clean_unit(s))
            .collect()
    }

    fn split_chunks(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut buf = String::new();

        for token in self.analyzer.analyze(text) {
            let is_terminator = {
                let mut chars = token.surface.chars();
                matches!((chars.next(), chars.next()), (Some(c), None) if self.is_terminator(c))
            };

            if is_terminator {
                chunks.extend(self.clean_unit(&buf));
                buf.clear();
                continue;
            }

            buf.push_str(&token.surface);

            if token.pos.is_chunk_boundary()
                && buf.chars().count() >= self.config.chunk_min_chars
            {
                chunks.extend(self.clean_unit(&buf));
                buf.clear();
            }
        }
        chunks.extend(self.clean_unit(&buf));

        self.merge_dangling_particles(chunks)
    }

    /// Single left-to-right pass: a unit ending in a case particle takes
    /// the following unit onto its end.
    fn merge_dangling_particles(&self, chunks: Vec<String>) -> Vec<String> {
        let mut merged: Vec<String> = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            match merged.last_mut() {
                Some(last)
                    if self
                        .config
                        .merge_particles
                        .iter()
                        .any(|p| !p.is_empty() && last.ends_with(p.as_str())) =>
                {
                    last.push_str(&chunk);
                }
                _ => merged.push(chunk),
            }
        }
        merged
    }
}
