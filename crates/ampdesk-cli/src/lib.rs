//! Terminal interface for Ampdesk
//!
//! Rendering and line input for the interactive support chat.

pub mod ui;


pub use ui::{
    EXIT_COMMAND, confirm, display_banner, format_citation, is_interrupt, print_help, print_reply,
    print_stats, read_input_with_history,
};
