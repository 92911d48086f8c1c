//! Text eligibility filter
//!
//! Decides whether a fragment is worth sending to the translation API. The
//! rules run in a fixed order and the first rejection wins.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::translation::config::constants;

/// Why a fragment was not eligible
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterReason {
    Empty,
    AlreadyTarget,
    NoLatinWord,
    TemplateMarker,
}

impl fmt::Display for FilterReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            FilterReason::Empty => "empty",
            FilterReason::AlreadyTarget => "already in target script",
            FilterReason::NoLatinWord => "no latin word",
            FilterReason::TemplateMarker => "template marker",
        };
        f.write_str(reason)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TextFilter;

impl TextFilter {
    pub fn new() -> Self {
        Self
    }

    pub fn should_translate(&self, text: &str) -> bool {
        self.check(text).is_ok()
    }

    pub fn check(&self, text: &str) -> Result<(), FilterReason> {
        let trimmed = text.trim();

        if trimmed.is_empty() {
            return Err(FilterReason::Empty);
        }

        if trimmed.chars().any(is_cjk_ideograph) {
            return Err(FilterReason::AlreadyTarget);
        }

        if !latin_word_regex().is_some_and(|regex| regex.is_match(trimmed)) {
            return Err(FilterReason::NoLatinWord);
        }

        if constants::TEMPLATE_TEXT_MARKERS
            .iter()
            .any(|marker| trimmed.contains(marker))
        {
            return Err(FilterReason::TemplateMarker);
        }

        Ok(())
    }
}

/// CJK Unified Ideographs, U+4E00..=U+9FFF
fn is_cjk_ideograph(c: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&c)
}

fn latin_word_regex() -> Option<&'static Regex> {
    static LATIN_WORD: OnceLock<Option<Regex>> = OnceLock::new();
    LATIN_WORD
        .get_or_init(|| Regex::new(r"[a-zA-Z]{2,}").ok())
        .as_ref()
}
