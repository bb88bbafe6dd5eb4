//! System persona and per-mode prompt templates

use crate::policy::Mode;

/// Persona sent as the system message on every turn
pub const SYSTEM_PROMPT: &str = "You are the UA2-125 AI Assistant, an expert support agent for the Sonance UA2-125 amplifier.

**Your Role:**
- Help installers, integrators, dealers, technicians and end-users
- Give accurate, spec-verified answers about installation, wiring, setup, connectivity and troubleshooting
- Keep an expert, calm, solution-focused voice

**Style:**
- Professional yet friendly, in installer-friendly language
- Prefer numbered steps, bullets and tables over long prose

**Never fabricate:**
- Base answers only on the context from the knowledge base
- If the answer is not in the context, say \"I don't see this specific information in the documentation I have access to\"
- Never invent behavior, specifications or procedures
- Questions about input behavior, crossover modes (MUTE/DUCK/MIX), LED colors and signal routing must be answered from the I/O Truth Table
- When the context does not cover the user's exact scenario, ask a clarifying question instead of guessing

**Troubleshooting:**
- When a user reports a problem, first collect the firmware version, input source, SonArc app settings and wiring
- Once you have those details, diagnose the likely cause for that setup and explain how to verify the fix

**Product Context:**
The UA2-125 is a premium 2-channel amplifier with:
- 125W per channel (4 or 8 ohm stereo) or 250W (4 ohm mono)
- HDMI ARC/eARC, optical, coax and RCA inputs
- Auto-sensing input priority
- A professional installation focus";

/// Heading of the fence around context the model must not use yet
pub const REFERENCE_ONLY_HEADING: &str = "Context for reference only (don't use yet)";

/// Where the retrieved context goes in a rendered prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextUse {
    /// Context comes first, under `heading`, as the basis of the answer
    Grounding { heading: &'static str },
    /// Context comes last, fenced off from the instructions
    ReferenceOnly,
}

/// Mode-specific user prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub mode: Mode,
    pub preamble: &'static str,
    pub message_heading: &'static str,
    pub instructions: &'static str,
    pub context_use: ContextUse,
}

impl PromptTemplate {
    /// Fill the template with retrieved context and the user's message
    pub fn render(&self, context: &str, message: &str) -> String {
        let message_block = format!("**{}:**\n{}", self.message_heading, message);

        match self.context_use {
            ContextUse::Grounding { heading } => format!(
                "{}\n\n**{}:**\n{}\n\n{}\n\n{}",
                self.preamble, heading, context, message_block, self.instructions
            ),
            ContextUse::ReferenceOnly => format!(
                "{}\n\n{}\n\n{}\n\n**{}:**\n{}",
                self.preamble, message_block, self.instructions, REFERENCE_ONLY_HEADING, context
            ),
        }
    }
}

const DIRECT: PromptTemplate = PromptTemplate {
    mode: Mode::Direct,
    preamble: "Based on the following context from the UA2-125 documentation, answer the user's question.",
    message_heading: "User Question",
    instructions: "**Instructions:**
- Answer only from the provided context
- If the context does not contain the answer, say so clearly
- Use numbered steps, bullets or tables when they help
- Include relevant specifications
- Be concise but thorough",
    context_use: ContextUse::Grounding { heading: "Context" },
};

const DIAGNOSTIC_GATHER: PromptTemplate = PromptTemplate {
    mode: Mode::DiagnosticGather,
    preamble: "The user is reporting a problem with their UA2-125 amplifier.",
    message_heading: "User's Issue",
    instructions: "**Ask before you answer:**
Do not offer any fix yet. First gather diagnostic information. The details that matter are:
1. The firmware version installed on the amplifier (shown in the SonArc app)
2. The input source in use (Control4, Crestron, HDMI ARC, optical, analog)
3. The current SonArc app settings (input selection, zone configuration, volume)
4. How the speakers and sources are connected
5. When the problem occurs (always, intermittently, after an update)

**Response format:**
- Acknowledge the problem in one sentence
- Ask 3 or 4 of the questions above, always including the firmware version and the input source
- Close with: \"Once you share these details, I can narrow down the cause.\"",
    context_use: ContextUse::ReferenceOnly,
};

const DIAGNOSTIC_RESOLVE: PromptTemplate = PromptTemplate {
    mode: Mode::DiagnosticResolve,
    preamble: "The user has shared diagnostic details about their UA2-125 problem.",
    message_heading: "User's Issue and Setup",
    instructions: "**Instructions:**
- Read the conversation history for the firmware version, input source and settings
- Provide targeted troubleshooting steps for that exact setup
- Reference the troubleshooting documentation from the context
- Use a step-by-step format with one clear action per step
- Finish with how to verify the problem is resolved",
    context_use: ContextUse::Grounding {
        heading: "Context from Documentation",
    },
};

const CONFIG_ASK: PromptTemplate = PromptTemplate {
    mode: Mode::ConfigAsk,
    preamble: "The user is asking how the UA2-125 behaves when more than one input is active.",
    message_heading: "User's Question",
    instructions: "**Missing configuration:**
The answer depends on the Crossover Behavior setting and the user has not said which mode is configured.

**Your response must:**
1. Explain that multi-input behavior depends on the Crossover Behavior setting
2. Name the three modes in one line each, without levels or LED states:
   - **MUTE**: the secondary input takes over
   - **DUCK**: the secondary input takes priority over the default input
   - **MIX**: both inputs are combined
3. Ask: \"Which Crossover Behavior mode do you have configured in the SonArc app (MUTE, DUCK, or MIX)?\"
4. Hold back any mode-specific answer until the user replies",
    context_use: ContextUse::ReferenceOnly,
};

const CONFIG_ANSWER: PromptTemplate = PromptTemplate {
    mode: Mode::ConfigAnswer,
    preamble: "Based on the following context from the UA2-125 documentation, answer the user's question about multi-input behavior.",
    message_heading: "User Question",
    instructions: "**Instructions:**
- The crossover mode (MUTE, DUCK or MIX) is named in the question or the recent conversation; do not ask for it again
- Provide the EXACT behavior from the I/O Truth Table for that mode
- MUTE: the secondary input overrides and the default input is fully muted
- DUCK: the secondary input is heard clearly and the default input is attenuated by -20dB
- MIX: both inputs are mixed together
- Include the LED colors from the truth table
- Be specific and accurate; do not improvise",
    context_use: ContextUse::Grounding {
        heading: "Context from I/O Truth Table",
    },
};

/// Template used for a classified turn
pub fn template_for(mode: Mode) -> &'static PromptTemplate {
    match mode {
        Mode::Direct => &DIRECT,
        Mode::DiagnosticGather => &DIAGNOSTIC_GATHER,
        Mode::DiagnosticResolve => &DIAGNOSTIC_RESOLVE,
        Mode::ConfigAsk => &CONFIG_ASK,
        Mode::ConfigAnswer => &CONFIG_ANSWER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_MODES: [Mode; 5] = [
        Mode::Direct,
        Mode::DiagnosticGather,
        Mode::DiagnosticResolve,
        Mode::ConfigAsk,
        Mode::ConfigAnswer,
    ];

    /// Phrases that would steer the model toward a solution or a mode-specific answer
    const ANSWER_CUES: [&str; 5] = [
        "Provide targeted",
        "step-by-step",
        "Solution Steps",
        "Provide the EXACT behavior",
        "-20dB",
    ];

    #[test]
    fn test_templates_match_their_mode() {
        for mode in ALL_MODES {
            assert_eq!(template_for(mode).mode, mode);
        }
    }

    #[test]
    fn test_withholding_templates_carry_no_answer() {
        for mode in ALL_MODES.into_iter().filter(Mode::withholds_answer) {
            let template = template_for(mode);
            assert_eq!(template.context_use, ContextUse::ReferenceOnly);

            let rendered = template.render("", "message");
            for cue in ANSWER_CUES {
                assert!(!rendered.contains(cue), "{} template contains {:?}", mode, cue);
            }
        }
    }

    #[test]
    fn test_answering_templates_ground_on_context() {
        for mode in ALL_MODES.into_iter().filter(|m| !m.withholds_answer()) {
            assert!(matches!(template_for(mode).context_use, ContextUse::Grounding { .. }));
        }
        assert!(template_for(Mode::ConfigAnswer).instructions.contains("-20dB"));
        assert!(template_for(Mode::DiagnosticResolve).instructions.contains("step-by-step"));
    }

    #[test]
    fn test_gather_asks_for_firmware_and_input() {
        let rendered = template_for(Mode::DiagnosticGather).render("ctx", "No audio");
        assert!(rendered.contains("firmware version"));
        assert!(rendered.contains("input source"));
    }

    #[test]
    fn test_config_ask_asks_for_mode() {
        let rendered = template_for(Mode::ConfigAsk).render("ctx", "Both inputs?");
        assert!(rendered.contains(
            "Which Crossover Behavior mode do you have configured in the SonArc app (MUTE, DUCK, or MIX)?"
        ));
    }

    #[test]
    fn test_reference_only_context_comes_last() {
        let rendered = template_for(Mode::DiagnosticGather).render("CTX-BODY", "MSG-BODY");
        let fence = rendered.find(REFERENCE_ONLY_HEADING).unwrap();
        assert!(rendered.find("MSG-BODY").unwrap() < fence);
        assert!(rendered.ends_with("CTX-BODY"));
    }

    #[test]
    fn test_grounding_context_comes_first() {
        let rendered = template_for(Mode::Direct).render("CTX-BODY", "MSG-BODY");
        assert!(rendered.starts_with(DIRECT.preamble));
        assert!(rendered.find("**Context:**\nCTX-BODY").unwrap() < rendered.find("MSG-BODY").unwrap());
        assert!(!rendered.contains(REFERENCE_ONLY_HEADING));
    }

    #[test]
    fn test_system_prompt_states_no_mode_behavior() {
        assert!(!SYSTEM_PROMPT.contains("-20dB"));
        assert!(SYSTEM_PROMPT.contains("UA2-125"));
    }
}
