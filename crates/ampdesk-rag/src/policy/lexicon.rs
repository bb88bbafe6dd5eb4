//! Phrase and pattern tables behind the dialogue policy
//!
//! Bump [`LEXICON_VERSION`] whenever a table changes so classification
//! snapshots can be traced back to the vocabulary that produced them.

use regex::Regex;
use std::collections::BTreeSet;

pub const LEXICON_VERSION: &str = "2024.2";

/// Phrases that mark a message as a problem report
pub const PROBLEM_INDICATORS: &[&str] = &[
    "not working",
    "no sound",
    "no audio",
    "issue",
    "problem",
    "error",
    "broken",
    "failed",
    "failing",
    "doesn't work",
    "won't work",
    "can't",
    "cannot",
    "unable",
    "trouble",
    "help",
    "fix",
    "not responding",
    "no output",
    "distorted",
    "noise",
    "buzzing",
    "crackling",
    "intermittent",
    "cutting out",
    "dropping",
    "not connecting",
    "won't connect",
    "no connection",
    "not getting",
    "stopped working",
    "no signal",
];

/// How an assistant asks for the firmware version
pub const FIRMWARE_PROMPT_PHRASES: &[&str] = &["firmware version", "version of the firmware"];

/// How an assistant asks for the input source
pub const INPUT_SOURCE_PHRASES: &[&str] = &["input source", "source are you using"];

/// Terms showing the user already answered the diagnostic questions
pub const DIAGNOSTIC_ANSWER_TERMS: &[&str] = &[
    "firmware",
    "version",
    "input",
    "source",
    "settings",
    "connected",
];

/// Questions whose answer depends on the crossover behavior setting
pub const CONFIG_PATTERNS: &[&str] = &[
    r"both.*(playing|active|inputs)",
    r"(default|primary).*(secondary|analog)",
    r"(secondary|analog).*(default|primary)",
    r"two inputs",
    r"multiple inputs",
    r"hdmi.*(and|&|\+).*analog",
    r"analog.*(and|&|\+).*hdmi",
];

/// Crossover behavior modes, matched as whole words
pub const CROSSOVER_MODE_PATTERN: &str = r"\b(mute|duck|mix|mixed)\b";

/// Lowercase and fold typographic apostrophes so "can’t" matches "can't"
pub fn normalize(text: &str) -> String {
    text.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'")
}

fn contains_any(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| text.contains(phrase))
}

/// Compiled lexicon; every input is expected to be [`normalize`]d
pub struct Lexicon {
    config_patterns: Vec<Regex>,
    crossover_mode: Option<Regex>,
}

impl Lexicon {
    pub fn new() -> Self {
        let config_patterns = CONFIG_PATTERNS
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();
        let crossover_mode = Regex::new(CROSSOVER_MODE_PATTERN).ok();

        Self {
            config_patterns,
            crossover_mode,
        }
    }

    pub fn reports_problem(&self, text: &str) -> bool {
        contains_any(text, PROBLEM_INDICATORS)
    }

    /// An assistant turn that asked for both firmware and input source
    pub fn asks_for_diagnostics(&self, text: &str) -> bool {
        contains_any(text, FIRMWARE_PROMPT_PHRASES) && contains_any(text, INPUT_SOURCE_PHRASES)
    }

    pub fn answers_diagnostics(&self, text: &str) -> bool {
        contains_any(text, DIAGNOSTIC_ANSWER_TERMS)
    }

    pub fn needs_configuration(&self, text: &str) -> bool {
        self.config_patterns.iter().any(|p| p.is_match(text))
    }

    pub fn names_crossover_mode(&self, text: &str) -> bool {
        self.crossover_mode
            .as_ref()
            .is_some_and(|p| p.is_match(text))
    }

    /// Distinct crossover modes named in `text`; "mixed" counts as MIX
    pub fn crossover_modes_named(&self, text: &str) -> usize {
        let Some(pattern) = self.crossover_mode.as_ref() else {
            return 0;
        };
        pattern
            .find_iter(text)
            .map(|m| match m.as_str() {
                "mixed" => "mix",
                other => other,
            })
            .collect::<BTreeSet<_>>()
            .len()
    }
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new()
    }
}
