//! Dialogue policy: pick a response strategy for each turn.
//!
//! The policy keeps no state of its own. The mode is derived from the
//! current message and a fixed look-back over the history, so the same
//! inputs always yield the same mode and long conversations cost no more
//! to classify than short ones.

pub mod lexicon;

use serde::{Deserialize, Serialize};
use tracing::debug;

use ampdesk_core::{ConversationTurn, Role};

pub use lexicon::{LEXICON_VERSION, Lexicon, normalize};

/// Turns scanned for an assistant message that opened a diagnosis
pub const DIAGNOSTIC_THREAD_LOOKBACK: usize = 4;

/// Turns scanned for diagnostic answers and crossover mode mentions
pub const ANSWER_LOOKBACK: usize = 3;

/// Response strategy for one turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Answer from the retrieved context
    Direct,
    /// Ask for firmware, input source and setup before helping
    DiagnosticGather,
    /// Give targeted troubleshooting steps
    DiagnosticResolve,
    /// Ask which crossover behavior mode is configured
    ConfigAsk,
    /// Describe the behavior of the configured crossover mode
    ConfigAnswer,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Direct => "direct",
            Mode::DiagnosticGather => "diagnostic_gather",
            Mode::DiagnosticResolve => "diagnostic_resolve",
            Mode::ConfigAsk => "config_ask",
            Mode::ConfigAnswer => "config_answer",
        }
    }

    /// Information-gathering turns that must not answer yet
    pub fn withholds_answer(&self) -> bool {
        matches!(self, Mode::DiagnosticGather | Mode::ConfigAsk)
    }

    pub fn is_troubleshooting(&self) -> bool {
        matches!(self, Mode::DiagnosticGather | Mode::DiagnosticResolve)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn tail(history: &[ConversationTurn], n: usize) -> &[ConversationTurn] {
    &history[history.len().saturating_sub(n)..]
}

#[derive(Default)]
pub struct DialoguePolicy {
    lexicon: Lexicon,
}

impl DialoguePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a turn. First matching branch wins: troubleshooting,
    /// then configuration ambiguity, then a direct answer.
    pub fn classify(&self, message: &str, history: &[ConversationTurn]) -> Mode {
        let message = normalize(message);

        let mode = if self.is_troubleshooting(&message, history) {
            if self.has_diagnostic_answers(&message, history) {
                Mode::DiagnosticResolve
            } else {
                Mode::DiagnosticGather
            }
        } else if self.lexicon.needs_configuration(&message) {
            if self.has_crossover_mode(&message, history) {
                Mode::ConfigAnswer
            } else {
                Mode::ConfigAsk
            }
        } else {
            Mode::Direct
        };

        debug!("Classified turn as {} (lexicon {})", mode, LEXICON_VERSION);
        mode
    }

    fn is_troubleshooting(&self, message: &str, history: &[ConversationTurn]) -> bool {
        if self.lexicon.reports_problem(message) {
            return true;
        }

        // An open diagnostic thread keeps the conversation in troubleshooting
        tail(history, DIAGNOSTIC_THREAD_LOOKBACK)
            .iter()
            .filter(|turn| turn.role == Role::Assistant)
            .any(|turn| self.lexicon.asks_for_diagnostics(&normalize(&turn.content)))
    }

    fn has_diagnostic_answers(&self, message: &str, history: &[ConversationTurn]) -> bool {
        self.lexicon.answers_diagnostics(message)
            || tail(history, ANSWER_LOOKBACK)
                .iter()
                .filter(|turn| turn.role == Role::User)
                .any(|turn| self.lexicon.answers_diagnostics(&normalize(&turn.content)))
    }

    fn has_crossover_mode(&self, message: &str, history: &[ConversationTurn]) -> bool {
        self.lexicon.names_crossover_mode(message)
            || tail(history, ANSWER_LOOKBACK).iter().any(|turn| {
                let content = normalize(&turn.content);
                match turn.role {
                    Role::User => self.lexicon.names_crossover_mode(&content),
                    // Listing several modes is the clarifying question, not an answer
                    Role::Assistant => self.lexicon.crossover_modes_named(&content) == 1,
                    Role::System => false,
                }
            })
    }
}
